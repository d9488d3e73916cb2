use anyhow::{anyhow, Context, Result};
use cv_inventory_core::FIELD_HOSTNAME;
use cv_inventory_device_tools::ApplyMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "cv-inventory.yaml";

pub const ENV_SEARCH_BY: &str = "CV_INVENTORY_SEARCH_BY";
pub const ENV_CHECK_MODE: &str = "CV_INVENTORY_CHECK_MODE";
pub const ENV_APPLY_MODE: &str = "CV_INVENTORY_APPLY_MODE";
pub const ENV_REPORT_BASE: &str = "CV_INVENTORY_REPORT_BASE";

/// Session settings resolved with precedence: CLI > env > file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Raw lookup key; only checked when a lookup runs.
    pub search_by: String,
    pub check_mode: bool,
    pub apply_mode: ApplyMode,
    pub report_base: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub search_by: Option<String>,
    pub check_mode: Option<bool>,
    pub apply_mode: Option<String>,
    pub report_base: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
struct ConfigFile {
    search_by: Option<String>,
    check_mode: Option<bool>,
    apply_mode: Option<String>,
    report_base: Option<PathBuf>,
}

impl Settings {
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let file = load_file(config_path)?;
        Self::resolve(file, |name| std::env::var(name).ok(), overrides)
    }

    fn resolve(
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
        overrides: Overrides,
    ) -> Result<Self> {
        let search_by = overrides
            .search_by
            .or_else(|| env(ENV_SEARCH_BY))
            .or(file.search_by)
            .unwrap_or_else(|| FIELD_HOSTNAME.to_string());

        let check_mode = match overrides.check_mode {
            Some(value) => value,
            None => match env(ENV_CHECK_MODE) {
                Some(raw) => parse_bool(&raw)
                    .ok_or_else(|| anyhow!("{} must be a boolean, got '{}'", ENV_CHECK_MODE, raw))?,
                None => file.check_mode.unwrap_or(false),
            },
        };

        let apply_mode = overrides
            .apply_mode
            .or_else(|| env(ENV_APPLY_MODE))
            .or(file.apply_mode)
            .map(|raw| raw.parse::<ApplyMode>())
            .transpose()?
            .unwrap_or_default();

        let report_base = overrides
            .report_base
            .or_else(|| env(ENV_REPORT_BASE).map(PathBuf::from))
            .or(file.report_base);

        Ok(Self {
            search_by,
            check_mode,
            apply_mode,
            report_base,
        })
    }
}

fn load_file(path: Option<&Path>) -> Result<ConfigFile> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(anyhow!("Config file not found: {}", p.display()));
            }
            p.to_path_buf()
        }
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(ConfigFile::default());
            }
            default
        }
    };

    let data = std::fs::read_to_string(&config_path)
        .with_context(|| format!("read config {}", config_path.display()))?;
    if data.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(&data).with_context(|| format!("parse config {}", config_path.display()))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
