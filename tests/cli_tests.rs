//! End-to-end CLI tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn vmforge() -> Command {
    let mut cmd = Command::cargo_bin("vmforge").unwrap();
    cmd.arg("--no-color");
    // keep the suite independent of any config file in the home directory
    cmd.env("HOME", std::env::temp_dir());
    cmd
}

fn fixed_vhd_footer(size: u64) -> [u8; 512] {
    let mut raw = [0u8; 512];
    raw[0..8].copy_from_slice(b"conectix");
    raw[12..16].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    raw[16..24].copy_from_slice(&u64::MAX.to_be_bytes());
    raw[40..48].copy_from_slice(&size.to_be_bytes());
    raw[48..56].copy_from_slice(&size.to_be_bytes());
    raw[60..64].copy_from_slice(&2u32.to_be_bytes());
    let checksum = vmforge::vhd::compute_checksum(&raw);
    raw[64..68].copy_from_slice(&checksum.to_be_bytes());
    raw
}

#[test]
fn list_shows_the_catalog() {
    vmforge()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("availability_set"))
        .stdout(predicate::str::contains("backup_policy"))
        .stdout(predicate::str::contains("autoscale_settings"));
}

#[test]
fn list_json_is_machine_readable() {
    let output = vmforge()
        .args(["--output", "json", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let catalog: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let entries = catalog.as_array().unwrap();
    assert_eq!(entries.len(), 13);
    assert!(entries.iter().all(|e| e["name"].is_string()));
}

#[test]
fn generate_emits_resource_json() {
    let output = vmforge()
        .args([
            "--output",
            "json",
            "generate",
            "availability_set",
            "--param",
            "name=web-avset",
            "--param",
            "location=eastus",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let resource: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(resource["type"], "Microsoft.Compute/availabilitySets");
    assert_eq!(resource["name"], "web-avset");
}

#[test]
fn generate_template_output_wraps_document() {
    let output = vmforge()
        .args([
            "--output",
            "template",
            "generate",
            "availability_set",
            "--param",
            "name=web-avset",
            "--param",
            "location=eastus",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let doc: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(doc["contentVersion"], "1.0.0.0");
    assert_eq!(doc["resources"][0]["name"], "web-avset");
}

#[test]
fn generate_invalid_config_exits_2() {
    vmforge()
        .args([
            "generate",
            "availability_set",
            "--param",
            "name=web-avset",
            "--param",
            "location=eastus",
            "--param",
            "fault_domains=9",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("fault_domains"));
}

#[test]
fn generate_unknown_generator_fails() {
    vmforge()
        .args(["generate", "flux_capacitor"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn validate_vhd_accepts_compliant_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("good.vhd");
    let mut contents = vec![0u8; 4096];
    contents.extend_from_slice(&fixed_vhd_footer(30 * 1024 * 1024 * 1024));
    fs::write(&path, contents).unwrap();

    vmforge()
        .args(["validate-vhd"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Marketplace"));
}

#[test]
fn validate_vhd_rejects_dynamic_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dynamic.vhd");
    let mut raw = fixed_vhd_footer(30 * 1024 * 1024 * 1024);
    raw[60..64].copy_from_slice(&3u32.to_be_bytes());
    let checksum = vmforge::vhd::compute_checksum(&raw);
    raw[64..68].copy_from_slice(&checksum.to_be_bytes());
    let mut contents = vec![0u8; 4096];
    contents.extend_from_slice(&raw);
    fs::write(&path, contents).unwrap();

    vmforge()
        .args(["validate-vhd"])
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("fixed"));
}

#[test]
fn validate_vhd_missing_file_exits_3() {
    vmforge()
        .args(["validate-vhd", "/nonexistent/disk.vhd"])
        .assert()
        .code(3);
}

#[test]
fn configure_backup_emits_vault_policy_and_items() {
    let output = vmforge()
        .args([
            "--output",
            "template",
            "configure-backup",
            "--vault",
            "rsv-prod",
            "--resource-group",
            "rg-prod",
            "--vm",
            "vm0",
            "--vm",
            "vm1",
            "--location",
            "eastus",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let doc: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let resources = doc["resources"].as_array().unwrap();
    // vault + policy + two protected items
    assert_eq!(resources.len(), 4);
    assert_eq!(resources[0]["type"], "Microsoft.RecoveryServices/vaults");
}

#[test]
fn configure_backup_rejects_bad_retention() {
    vmforge()
        .args([
            "configure-backup",
            "--vault",
            "rsv-prod",
            "--resource-group",
            "rg-prod",
            "--vm",
            "vm0",
            "--location",
            "eastus",
            "--daily-retention",
            "3",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("daily"));
}

#[test]
fn cleanup_without_configured_script_exits_6() {
    vmforge()
        .args([
            "cleanup",
            "vault",
            "--vault",
            "rsv-prod",
            "--resource-group",
            "rg-prod",
            "--subscription",
            "sub1",
        ])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("cleanup script"));
}

#[test]
fn config_file_supplies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("vmforge.toml");
    fs::write(&config, "[defaults]\nlocation = \"westeurope\"\n").unwrap();

    let output = vmforge()
        .args(["--output", "json", "-c"])
        .arg(&config)
        .args(["generate", "availability_set", "--param", "name=web-avset"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let resource: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(resource["location"], "westeurope");
}
