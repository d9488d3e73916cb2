use cv_inventory_core::{
    DeviceInventory, FIELD_FQDN, FIELD_HOSTNAME, FIELD_PARENT_ID, FIELD_PARENT_NAME, FIELD_SYSMAC,
};
use cv_inventory_device_tools::{
    ApplyMode, CvDeviceTools, DeviceToolsError, InMemoryPlane, PlaneSnapshot,
};
use serde_json::{json, Value};

const EOS01_MAC: &str = "50:8d:00:e3:78:aa";

fn snapshot() -> PlaneSnapshot {
    serde_json::from_value(json!({
        "devices": [
            {
                "fqdn": "CV-ANSIBLE-EOS01.eve.emea.lab",
                "systemMacAddress": EOS01_MAC,
                "serialNumber": "79AEA53101E7340AEC9AA4819D5E1F5B",
                "containerName": "ANSIBLE"
            },
            {
                "fqdn": "DC1-LEAF1A.eve.emea.lab",
                "systemMacAddress": "50:8d:00:e3:78:bb",
                "containerName": "Undefined"
            }
        ],
        "containers": [
            {"key": "root", "name": "Tenant"},
            {"key": "undefined_container", "name": "Undefined"},
            {"key": "container_ansible", "name": "ANSIBLE", "parentContainerId": "root"},
            {"key": "container_ansible2", "name": "ANSIBLE2", "parentContainerId": "root"},
            {"key": "container_dc1_leafs", "name": "DC1_LEAFS", "parentContainerId": "root"}
        ],
        "configlets": [
            {"key": "configlet_training", "name": "01TRAINING-01"},
            {"key": "configlet_eos01", "name": "CV-EOS-ANSIBLE01"},
            {"key": "configlet_leaf1a", "name": "AVD_DC1-LEAF1A"},
            {"key": "configlet_legacy", "name": "LEGACY"}
        ],
        "deviceConfiglets": {
            EOS01_MAC: ["01TRAINING-01", "LEGACY"]
        }
    }))
    .unwrap()
}

fn tools() -> CvDeviceTools<InMemoryPlane> {
    CvDeviceTools::new(InMemoryPlane::new(snapshot()))
}

fn cvp_device() -> Value {
    json!({
        "fqdn": "CV-ANSIBLE-EOS01",
        "serialNumber": "79AEA53101E7340AEC9AA4819D5E1F5B",
        "systemMacAddress": EOS01_MAC,
        "parentContainerName": "ANSIBLE",
        "configlets": ["01TRAINING-01", "CV-EOS-ANSIBLE01"]
    })
}

fn inventory(entries: &[Value]) -> DeviceInventory {
    DeviceInventory::from_values(entries).unwrap()
}

#[test]
fn search_by_getter_setter() {
    let mut tools = tools();
    assert_eq!(tools.search_by(), FIELD_HOSTNAME);
    for key in [FIELD_SYSMAC, FIELD_FQDN, FIELD_HOSTNAME] {
        tools.set_search_by(key);
        assert_eq!(tools.search_by(), key);
        assert_eq!(tools.lookup_key().unwrap().as_str(), key);
    }
}

#[test]
fn device_exists_by_hostname() {
    let tools = tools();
    assert!(tools.is_device_exist("CV-ANSIBLE-EOS01").unwrap());
    assert!(tools.is_device_exist("CV-ANSIBLE-EOS01.other.domain").unwrap());
}

#[test]
fn unknown_devices_are_absent() {
    let tools = tools();
    for lookup in ["CV-ANSIBLE-TEST01", "TEST"] {
        assert!(!tools.is_device_exist(lookup).unwrap());
        assert!(!tools.is_in_container(lookup, lookup).unwrap());
        assert!(tools.get_device_configlets(lookup).unwrap().is_empty());
    }
}

#[test]
fn fqdn_search_requires_exact_name() {
    let mut tools = tools();
    tools.set_search_by(FIELD_FQDN);
    assert!(!tools.is_device_exist("CV-ANSIBLE-EOS01").unwrap());
    let facts = tools
        .get_device_facts("CV-ANSIBLE-EOS01.eve.emea.lab")
        .unwrap()
        .unwrap();
    assert_eq!(facts.fqdn, "CV-ANSIBLE-EOS01.eve.emea.lab");
}

#[test]
fn device_facts_by_hostname() {
    let tools = tools();
    let facts = tools.get_device_facts("CV-ANSIBLE-EOS01").unwrap().unwrap();
    assert_eq!(facts.fqdn.split('.').next(), Some("CV-ANSIBLE-EOS01"));
    assert_eq!(facts.hostname, "CV-ANSIBLE-EOS01");
    assert!(tools.is_in_container("CV-ANSIBLE-EOS01", "ANSIBLE").unwrap());
    assert!(!tools.is_in_container("CV-ANSIBLE-EOS01", "ANSIBLE2").unwrap());
}

#[test]
fn device_id_is_system_mac() {
    let tools = tools();
    assert_eq!(
        tools.get_device_id("CV-ANSIBLE-EOS01").unwrap().as_deref(),
        Some(EOS01_MAC)
    );
}

#[test]
fn device_facts_by_system_mac() {
    let mut tools = tools();
    tools.set_search_by(FIELD_SYSMAC);
    let facts = tools.get_device_facts("50:8D:00:E3:78:AA").unwrap().unwrap();
    assert_eq!(facts.short_name(), "CV-ANSIBLE-EOS01");
    assert_eq!(facts.system_mac_address, EOS01_MAC);
}

#[test]
fn device_container_matches_plane() {
    let tools = tools();
    let user_inventory = inventory(&[cvp_device()]);
    for device in &user_inventory {
        let container = tools.get_device_container(device.fqdn()).unwrap().unwrap();
        assert_eq!(container.get(FIELD_PARENT_NAME), Some("ANSIBLE"));
        assert_eq!(container.get(FIELD_PARENT_ID), Some("container_ansible"));

        let info = tools
            .get_container_info(device.container().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(info.key, container.parent_container_id);
    }
}

#[test]
fn device_configlets_are_listed() {
    let tools = tools();
    let names: Vec<String> = tools
        .get_device_configlets("CV-ANSIBLE-EOS01")
        .unwrap()
        .into_iter()
        .map(|configlet| configlet.name)
        .collect();
    assert_eq!(names, vec!["01TRAINING-01", "LEGACY"]);
    assert!(tools.get_configlet_info("LEGACY").unwrap().is_some());
    assert!(tools.get_configlet_info("MISSING").unwrap().is_none());
}

#[test]
fn unsupported_search_by_fails_at_lookup() {
    let mut tools = tools();
    tools.set_search_by("");
    assert_eq!(tools.search_by(), "");
    let err = tools.is_device_exist("CV-ANSIBLE-EOS01").unwrap_err();
    assert!(matches!(err, DeviceToolsError::Inventory(ref inner) if inner.is_configuration()));

    let mut user_inventory = inventory(&[cvp_device()]);
    assert!(tools.move_device(&user_inventory).is_err());
    assert!(tools.refresh_system_mac(&mut user_inventory).is_err());
    assert!(tools.plane().tasks().is_empty());
}

#[test]
fn switching_search_by_affects_next_lookup_only() {
    let mut tools = tools();
    let before = tools.get_device_facts("CV-ANSIBLE-EOS01").unwrap();
    tools.set_search_by(FIELD_FQDN);
    assert!(tools.get_device_facts("CV-ANSIBLE-EOS01").unwrap().is_none());
    assert_eq!(before.unwrap().system_mac_address, EOS01_MAC);
}

#[test]
fn device_move_creates_task() {
    let mut tools = tools();
    let mut entry = cvp_device();
    entry[FIELD_PARENT_NAME] = json!("ANSIBLE2");
    let user_inventory = inventory(&[entry]);

    let resp = tools.move_device(&user_inventory).unwrap();
    assert!(resp[0].success());
    assert!(resp[0].changed());
    assert!(!resp[0].task_ids().is_empty());
    assert!(resp[0].count() > 0);
    assert!(tools.is_in_container("CV-ANSIBLE-EOS01", "ANSIBLE2").unwrap());

    let again = tools.move_device(&user_inventory).unwrap();
    assert!(!again[0].changed());
    assert_eq!(again[0].count(), 0);
    assert_eq!(tools.plane().tasks().len(), 1);
}

#[test]
fn device_move_to_unknown_container_fails() {
    let mut tools = tools();
    let mut entry = cvp_device();
    entry[FIELD_PARENT_NAME] = json!("NOWHERE");
    let err = tools.move_device(&inventory(&[entry])).unwrap_err();
    assert!(matches!(
        err,
        DeviceToolsError::NotFound { entity_type: "container", .. }
    ));
}

#[test]
fn check_mode_does_not_mutate() {
    let mut tools = tools();
    tools.set_check_mode(true);
    let mut entry = cvp_device();
    entry[FIELD_PARENT_NAME] = json!("ANSIBLE2");
    let user_inventory = inventory(&[entry]);

    let moved = tools.move_device(&user_inventory).unwrap();
    assert!(moved[0].changed());
    assert!(moved[0].task_ids().is_empty());

    let applied = tools.apply_configlets(&user_inventory).unwrap();
    assert!(applied[0].changed());
    assert!(applied[0].task_ids().is_empty());

    let pristine = InMemoryPlane::new(snapshot());
    assert!(tools.plane().tasks().is_empty());
    assert_eq!(tools.plane().snapshot(), pristine.snapshot());
}

#[test]
fn configlet_apply_attaches_missing_only() {
    let mut tools = tools();
    let user_inventory = inventory(&[cvp_device()]);

    let resp = tools.apply_configlets(&user_inventory).unwrap();
    assert!(resp[0].success());
    assert!(resp[0].changed());
    assert_eq!(resp[0].count(), 1);
    assert_eq!(resp[0].list_changes(), ["CV-EOS-ANSIBLE01".to_string()]);

    let names: Vec<String> = tools
        .get_device_configlets("CV-ANSIBLE-EOS01")
        .unwrap()
        .into_iter()
        .map(|configlet| configlet.name)
        .collect();
    assert_eq!(names, vec!["01TRAINING-01", "LEGACY", "CV-EOS-ANSIBLE01"]);

    let again = tools.apply_configlets(&user_inventory).unwrap();
    assert!(again[0].success());
    assert!(!again[0].changed());
}

#[test]
fn strict_apply_detaches_unlisted() {
    let mut tools = tools();
    tools.set_apply_mode(ApplyMode::Strict);
    let resp = tools.apply_configlets(&inventory(&[cvp_device()])).unwrap();
    assert_eq!(resp[0].count(), 2);
    assert_eq!(resp[0].task_ids().len(), 2);

    let names: Vec<String> = tools
        .get_device_configlets("CV-ANSIBLE-EOS01")
        .unwrap()
        .into_iter()
        .map(|configlet| configlet.name)
        .collect();
    assert_eq!(names, vec!["01TRAINING-01", "CV-EOS-ANSIBLE01"]);
}

#[test]
fn unknown_configlet_is_reported() {
    let mut tools = tools();
    let mut entry = cvp_device();
    entry["configlets"] = json!(["DOES-NOT-EXIST"]);
    let err = tools.apply_configlets(&inventory(&[entry])).unwrap_err();
    assert!(matches!(
        err,
        DeviceToolsError::NotFound { entity_type: "configlet", .. }
    ));
}

#[test]
fn deploy_provisions_undefined_devices() {
    let mut tools = tools();
    let user_inventory = inventory(&[
        json!({
            "fqdn": "DC1-LEAF1A",
            "parentContainerName": "DC1_LEAFS",
            "configlets": ["AVD_DC1-LEAF1A"],
            "imageBundle": []
        }),
        cvp_device(),
    ]);

    let resp = tools.deploy_device(&user_inventory).unwrap();
    assert!(resp[0].changed());
    assert_eq!(resp[0].task_ids().len(), 1);
    assert!(!resp[1].changed());
    assert!(tools.is_in_container("DC1-LEAF1A", "DC1_LEAFS").unwrap());
    assert_eq!(tools.get_device_configlets("DC1-LEAF1A").unwrap().len(), 1);
}

#[test]
fn refresh_fills_mac_and_container_id() {
    let tools = tools();
    let mut user_inventory = inventory(&[json!({
        "fqdn": "CV-ANSIBLE-EOS01",
        "parentContainerName": "ANSIBLE2"
    })]);
    tools.refresh_system_mac(&mut user_inventory).unwrap();
    let device = &user_inventory.devices()[0];
    assert_eq!(device.system_mac(), Some(EOS01_MAC));
    assert_eq!(device.parent_container_id(), Some("container_ansible2"));
}

#[test]
fn manager_reconciles_inventory() {
    let mut tools = tools();
    let mut existing = cvp_device();
    existing[FIELD_PARENT_NAME] = json!("ANSIBLE2");
    let user_inventory = inventory(&[
        existing,
        json!({
            "fqdn": "DC1-LEAF1A",
            "parentContainerName": "DC1_LEAFS",
            "configlets": ["AVD_DC1-LEAF1A"]
        }),
    ]);

    let output = tools.manager(&user_inventory).unwrap();
    assert!(output.success());
    assert!(output.changed());
    assert_eq!(output.deployed.count(), 1);
    assert_eq!(output.moved.count(), 1);
    assert_eq!(output.attached.count(), 1);
    assert_eq!(output.task_ids().len(), 3);

    let view = output.to_json();
    assert_eq!(view["devices_deployed"]["devices_deployed_count"], 1);
    assert_eq!(view["devices_moved"]["devices_moved_list"][0], "CV-ANSIBLE-EOS01 to ANSIBLE2");
}

#[test]
fn manager_rejects_unknown_device() {
    let mut tools = tools();
    let user_inventory = inventory(&[json!({"fqdn": "TEST", "parentContainerName": "ANSIBLE"})]);
    let err = tools.manager(&user_inventory).unwrap_err();
    assert!(matches!(err, DeviceToolsError::NotFound { entity_type: "device", .. }));
}
