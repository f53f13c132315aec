//! Integration tests for the template helper layer.

use minijinja::context;
use std::sync::Arc;
use vmforge::generators::GeneratorRegistry;
use vmforge::helpers;

fn registry() -> Arc<GeneratorRegistry> {
    Arc::new(GeneratorRegistry::with_builtins())
}

#[test]
fn template_assembles_multi_resource_document() {
    let source = r#"{{ arm_template([
        recovery_vault(name="rsv-" ~ env, location=region),
        backup_policy(name="daily", vault="rsv-" ~ env, preset="production"),
        protected_item(vault="rsv-" ~ env, vm_name="vm0", resource_group=rg, policy="daily"),
    ]) | tojson }}"#;

    let out = helpers::render(
        registry(),
        source,
        context! { env => "prod", region => "eastus", rg => "rg-prod" },
    )
    .unwrap();

    let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
    let resources = doc["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 3);
    assert_eq!(resources[0]["name"], "rsv-prod");
    assert_eq!(resources[1]["type"], "Microsoft.RecoveryServices/vaults/backupPolicies");
    assert!(resources[2]["name"]
        .as_str()
        .unwrap()
        .starts_with("rsv-prod/Azure/"));
}

#[test]
fn zone_spanning_disks_render_per_zone() {
    let source = r#"{{ arm_template([
        managed_disk(name="data0", location="eastus", sku="Premium_LRS", size_gb=512, zones=["1"]),
        managed_disk(name="data1", location="eastus", sku="Premium_LRS", size_gb=512, zones=["2"]),
        managed_disk(name="data2", location="eastus", sku="Premium_LRS", size_gb=512, zones=["3"]),
    ]) | tojson }}"#;

    let out = helpers::render(registry(), source, context! {}).unwrap();

    let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
    let resources = doc["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 3);
    assert_eq!(resources[0]["zones"], serde_json::json!(["1"]));
    assert_eq!(resources[2]["name"], "data2");
}

#[test]
fn invalid_generator_call_fails_the_render() {
    let err = helpers::render(
        registry(),
        r#"{{ scale_set(name="vmss", location="eastus", capacity=5000) }}"#,
        context! {},
    )
    .unwrap_err();

    assert!(err.to_string().contains("capacity"));
}

#[test]
fn unknown_function_is_a_template_error() {
    let err = helpers::render(registry(), r#"{{ not_a_generator(name="x") }}"#, context! {})
        .unwrap_err();
    assert!(!err.to_string().is_empty());
}
