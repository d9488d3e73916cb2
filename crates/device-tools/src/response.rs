use serde::Serialize;
use serde_json::{json, Map, Value};

/// Outcome of one action against the management plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvApiResult {
    action_name: String,
    success: bool,
    changed: bool,
    count: usize,
    task_ids: Vec<String>,
    list_changes: Vec<String>,
}

impl CvApiResult {
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            success: false,
            changed: false,
            count: 0,
            task_ids: Vec::new(),
            list_changes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.action_name
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn set_success(&mut self, success: bool) {
        self.success = success;
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn task_ids(&self) -> &[String] {
        &self.task_ids
    }

    pub fn list_changes(&self) -> &[String] {
        &self.list_changes
    }

    pub fn add_entry(&mut self, entry: impl Into<String>) {
        self.list_changes.push(entry.into());
        self.count += 1;
    }

    pub fn add_tasks<I, S>(&mut self, task_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.task_ids.extend(task_ids.into_iter().map(Into::into));
    }

    pub fn results(&self) -> Value {
        json!({
            "success": self.success,
            "changed": self.changed,
            "taskIds": self.task_ids,
            "diff": self.list_changes,
        })
    }
}

/// Aggregation of [`CvApiResult`]s for one category of change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvManagerResult {
    builder_name: String,
    success: bool,
    changed: bool,
    count: usize,
    list_changes: Vec<String>,
    task_ids: Vec<String>,
}

impl CvManagerResult {
    pub fn new(builder_name: impl Into<String>, default_success: bool) -> Self {
        Self {
            builder_name: builder_name.into(),
            success: default_success,
            changed: false,
            count: 0,
            list_changes: Vec::new(),
            task_ids: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.builder_name
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn task_ids(&self) -> &[String] {
        &self.task_ids
    }

    pub fn list_changes(&self) -> &[String] {
        &self.list_changes
    }

    pub fn add_change(&mut self, change: &CvApiResult) {
        self.success |= change.success();
        self.changed |= change.changed();
        self.count += change.count();
        self.list_changes.extend(change.list_changes().iter().cloned());
        self.task_ids.extend(change.task_ids().iter().cloned());
    }

    pub fn changes(&self) -> Value {
        let mut changes = Map::new();
        changes.insert(format!("{}_count", self.builder_name), json!(self.count));
        changes.insert(format!("{}_list", self.builder_name), json!(self.list_changes));
        changes.insert("success".to_string(), json!(self.success));
        changes.insert("changed".to_string(), json!(self.changed));
        changes.insert("taskIds".to_string(), json!(self.task_ids));
        Value::Object(changes)
    }
}
