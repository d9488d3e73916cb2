mod config;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use config::{Overrides, Settings};
use cv_inventory_content::{device_entries, load_document, load_value, DocumentFormat};
use cv_inventory_core::{ConfigletRecord, ContainerRecord, DeviceInventory};
use cv_inventory_device_tools::{CvDeviceTools, CvManagerOutput, InMemoryPlane, PlaneSnapshot};
use cv_inventory_report::create_report_bundle;
use cv_inventory_schema::{
    normalize_entries, schema_by_name, validate, validate_cv_inputs, Schema, SCHEMA_CV_DEVICE,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cv-inventory", version, about = "CloudVision device inventory tools")]
struct Cli {
    /// YAML settings file (defaults to ./cv-inventory.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a topology document against its schema
    Validate {
        #[arg(long, value_parser = ["container", "device", "configlet"])]
        kind: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Print plane facts for one device
    Facts {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        lookup: String,
        #[arg(long)]
        search_by: Option<String>,
    },
    /// Deploy, move and attach configlets so the plane matches an inventory
    Reconcile {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        inventory: PathBuf,
        #[arg(long)]
        check: bool,
        #[arg(long)]
        apply_mode: Option<String>,
        #[arg(long)]
        search_by: Option<String>,
        #[arg(long)]
        report_base: Option<PathBuf>,
        /// Write the resulting plane state to this file
        #[arg(long)]
        save_snapshot: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,cv_inventory=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate { kind, file } => run_validate(&kind, &file),
        Command::Facts {
            snapshot,
            lookup,
            search_by,
        } => {
            let settings = Settings::load(
                cli.config.as_deref(),
                Overrides {
                    search_by,
                    ..Overrides::default()
                },
            )?;
            run_facts(&settings, &snapshot, &lookup)
        }
        Command::Reconcile {
            snapshot,
            inventory,
            check,
            apply_mode,
            search_by,
            report_base,
            save_snapshot,
        } => {
            let settings = Settings::load(
                cli.config.as_deref(),
                Overrides {
                    search_by,
                    check_mode: check.then_some(true),
                    apply_mode,
                    report_base,
                },
            )?;
            run_reconcile(&settings, &snapshot, &inventory, save_snapshot.as_deref())
        }
    }
}

fn run_validate(kind: &str, file: &Path) -> Result<()> {
    let schema = schema_by_name(kind).ok_or_else(|| anyhow!("unknown schema '{}'", kind))?;
    let document = load_value(file)?;
    let is_device = schema.name == SCHEMA_CV_DEVICE.name;
    let valid = if is_device {
        validate(&device_entries(&document)?, schema)
    } else {
        validate_cv_inputs(&document, schema)
    };

    if !valid {
        println!("{}", json!({ "kind": kind, "file": file.display().to_string(), "valid": false }));
        bail!("{} does not conform to the {} schema", file.display(), kind);
    }

    let entries = if is_device {
        device_entries(&document)?
    } else {
        normalize_entries(&document, schema)?
    };
    let records = build_records(schema, &entries)
        .with_context(|| format!("build {} records from {}", kind, file.display()))?;
    println!(
        "{}",
        json!({ "kind": kind, "file": file.display().to_string(), "valid": true, "records": records })
    );
    Ok(())
}

/// Typed views of validated entries.
fn build_records(schema: &Schema, entries: &[Value]) -> Result<Vec<Value>> {
    let records = match schema.name {
        "container" => entries
            .iter()
            .map(|entry| Ok(serde_json::to_value(ContainerRecord::from_value(entry)?)?))
            .collect::<Result<Vec<_>>>()?,
        "configlet" => entries
            .iter()
            .map(|entry| Ok(serde_json::to_value(ConfigletRecord::from_value(entry)?)?))
            .collect::<Result<Vec<_>>>()?,
        _ => DeviceInventory::from_values(entries)?
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?,
    };
    Ok(records)
}

fn run_facts(settings: &Settings, snapshot: &Path, lookup: &str) -> Result<()> {
    let mut tools = open_session(settings, snapshot)?;
    tools.set_search_by(settings.search_by.clone());

    let device = tools
        .get_device_facts(lookup)?
        .ok_or_else(|| anyhow!("device '{}' not found by {}", lookup, tools.search_by()))?;
    let configlets: Vec<_> = tools
        .get_device_configlets(lookup)?
        .into_iter()
        .map(|configlet| configlet.name)
        .collect();
    let facts = json!({
        "device": device,
        "container": tools.get_device_container(lookup)?,
        "configlets": configlets,
    });
    println!("{}", serde_json::to_string_pretty(&facts)?);
    Ok(())
}

fn run_reconcile(
    settings: &Settings,
    snapshot: &Path,
    inventory_path: &Path,
    save_snapshot: Option<&Path>,
) -> Result<()> {
    let document = load_value(inventory_path)?;
    let entries = device_entries(&document)?;
    if !validate(&entries, &SCHEMA_CV_DEVICE) {
        bail!("{} does not conform to the device schema", inventory_path.display());
    }
    let inventory = DeviceInventory::from_values(&entries)
        .with_context(|| format!("build device inventory from {}", inventory_path.display()))?;

    let mut tools = open_session(settings, snapshot)?;
    tools.set_search_by(settings.search_by.clone());
    tools.set_check_mode(settings.check_mode);
    tools.set_apply_mode(settings.apply_mode);

    info!(
        devices = inventory.len(),
        check_mode = settings.check_mode,
        apply_mode = %settings.apply_mode,
        "reconciling inventory"
    );
    let output = tools.manager(&inventory)?;
    let result = output.to_json();
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(base) = &settings.report_base {
        let meta = json!({
            "inventory": inventory_path.display().to_string(),
            "snapshot": snapshot.display().to_string(),
            "check_mode": settings.check_mode,
            "apply_mode": settings.apply_mode.to_string(),
            "result": result,
        });
        let report = create_report_bundle(base, &inventory, Some(meta), Some(&change_log(&output)))?;
        eprintln!("report_root: {}", report.root.display());
    }

    if let Some(path) = save_snapshot {
        write_snapshot(path, tools.plane().snapshot())?;
    }
    Ok(())
}

fn open_session(settings: &Settings, snapshot: &Path) -> Result<CvDeviceTools<InMemoryPlane>> {
    let state: PlaneSnapshot = load_document(snapshot)?;
    debug!(
        devices = state.devices.len(),
        containers = state.containers.len(),
        configlets = state.configlets.len(),
        search_by = %settings.search_by,
        "plane snapshot loaded"
    );
    Ok(CvDeviceTools::new(InMemoryPlane::new(state)))
}

fn change_log(output: &CvManagerOutput) -> String {
    let mut lines = Vec::new();
    for result in [&output.deployed, &output.moved, &output.attached] {
        for change in result.list_changes() {
            lines.push(format!("{}: {}", result.name(), change));
        }
    }
    if !output.task_ids().is_empty() {
        lines.push(format!("tasks: {}", output.task_ids().join(",")));
    }
    lines.join("\n")
}

fn write_snapshot(path: &Path, snapshot: &PlaneSnapshot) -> Result<()> {
    let data = match DocumentFormat::from_path(path)? {
        DocumentFormat::Json => serde_json::to_string_pretty(snapshot)?,
        DocumentFormat::Yaml => serde_yaml::to_string(snapshot)?,
    };
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "plane snapshot saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use cv_inventory_schema::SCHEMA_CV_CONTAINER;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn reconcile_flags_parse() {
        let cli = Cli::try_parse_from([
            "cv-inventory",
            "reconcile",
            "--snapshot",
            "plane.json",
            "--inventory",
            "devices.yaml",
            "--check",
            "--apply-mode",
            "strict",
        ])
        .unwrap();
        match cli.command {
            Command::Reconcile {
                check, apply_mode, ..
            } => {
                assert!(check);
                assert_eq!(apply_mode.as_deref(), Some("strict"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn reconcile_moves_device_and_writes_outputs() {
        let dir = tempfile::TempDir::new().unwrap();
        let snapshot = dir.path().join("plane.json");
        let inventory = dir.path().join("devices.yaml");
        let saved = dir.path().join("after.json");
        std::fs::write(
            &snapshot,
            json!({
                "devices": [{
                    "fqdn": "leaf1.lab",
                    "systemMacAddress": "50:8d:00:00:00:01",
                    "containerName": "LEAFS"
                }],
                "containers": [
                    {"key": "c_leafs", "name": "LEAFS"},
                    {"key": "c_spines", "name": "SPINES"}
                ]
            })
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            &inventory,
            "devices:\n  - fqdn: leaf1\n    parentContainerName: SPINES\n",
        )
        .unwrap();

        let settings = Settings {
            search_by: "hostname".to_string(),
            check_mode: false,
            apply_mode: Default::default(),
            report_base: Some(dir.path().to_path_buf()),
        };
        run_reconcile(&settings, &snapshot, &inventory, Some(&saved)).unwrap();

        let after: PlaneSnapshot = load_document(&saved).unwrap();
        assert_eq!(after.devices[0].container_name, "SPINES");
        let reports: Vec<_> = std::fs::read_dir(dir.path().join("reports")).unwrap().collect();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn reconcile_rejects_invalid_inventory() {
        let dir = tempfile::TempDir::new().unwrap();
        let snapshot = dir.path().join("plane.json");
        let inventory = dir.path().join("devices.json");
        std::fs::write(&snapshot, "{}").unwrap();
        std::fs::write(&inventory, r#"[{"serialNumber": "ABC"}]"#).unwrap();

        let settings = Settings {
            search_by: "hostname".to_string(),
            check_mode: true,
            apply_mode: Default::default(),
            report_base: None,
        };
        assert!(run_reconcile(&settings, &snapshot, &inventory, None).is_err());
    }

    #[test]
    fn validate_builds_topology_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let containers = dir.path().join("containers.yaml");
        std::fs::write(
            &containers,
            "DC1_FABRIC:\n  parentContainerName: Tenant\nDC1_SPINES:\n  parentContainerName: DC1_FABRIC\n  configlets: [01TRAINING-01]\n",
        )
        .unwrap();
        run_validate("container", &containers).unwrap();

        let entries = normalize_entries(&load_value(&containers).unwrap(), &SCHEMA_CV_CONTAINER).unwrap();
        let records = build_records(&SCHEMA_CV_CONTAINER, &entries).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["name"], "DC1_SPINES");
        assert_eq!(records[1]["configlets"][0], "01TRAINING-01");

        let configlets = dir.path().join("configlets.json");
        std::fs::write(&configlets, r#"{"01TRAINING-01": "alias a1 show version"}"#).unwrap();
        run_validate("configlet", &configlets).unwrap();

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, r#"{"DC1": {"name": 5}}"#).unwrap();
        assert!(run_validate("container", &broken).is_err());
    }

    #[test]
    fn validate_rejects_unknown_kind() {
        let parsed = Cli::try_parse_from([
            "cv-inventory",
            "validate",
            "--kind",
            "image",
            "--file",
            "x.json",
        ]);
        assert!(parsed.is_err());
    }
}
