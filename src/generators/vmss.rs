//! VM scale set generator.
//!
//! Emits a `Microsoft.Compute/virtualMachineScaleSets` resource.
//!
//! ### Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `name` | Yes | Scale set name |
//! | `location` | Yes | Azure region |
//! | `vm_size` | No | Instance SKU (default: Standard_B2s) |
//! | `capacity` | Yes | Initial instance count |
//! | `upgrade_policy` | No | Manual, Automatic, Rolling (default: Manual) |
//! | `max_batch_percent` | No | Rolling upgrades: max instances per batch, 5-100 (default: 20) |
//! | `max_unhealthy_percent` | No | Rolling upgrades: unhealthy ceiling, 5-100 (default: 20) |
//! | `pause_between_batches` | No | Rolling upgrades: ISO-8601 pause (default: PT0S) |
//! | `overprovision` | No | Overprovision instances during scale-out (default: true) |
//! | `single_placement_group` | No | Constrain to one placement group (default: true) |
//! | `zones` | No | Availability zones to span |
//! | `admin_username` | No | OS profile admin user (default: azureuser) |
//! | `image` | No | Image reference object: publisher/offer/sku/version |
//! | `subnet_id` | No | Subnet for the primary NIC configuration |
//! | `tags` | No | Resource tags |

use crate::arm::{validate_location, validate_resource_name, validate_tags};
use crate::error::{Error, Result};
use crate::generators::availability::extract_tags;
use crate::generators::{Generator, GeneratorParams, ParamExt, ValidationReport};
use serde_json::{json, Map, Value};

const API_VERSION: &str = "2023-03-01";

const MAX_CAPACITY: u64 = 1000;
const MAX_CAPACITY_SINGLE_PLACEMENT_GROUP: u64 = 100;

/// Upgrade policy mode for a scale set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeMode {
    Manual,
    Automatic,
    Rolling,
}

impl UpgradeMode {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "automatic" => Ok(Self::Automatic),
            "rolling" => Ok(Self::Rolling),
            _ => Err(Error::InvalidParameter(format!(
                "Invalid upgrade_policy '{}'. Valid modes: Manual, Automatic, Rolling",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::Automatic => "Automatic",
            Self::Rolling => "Rolling",
        }
    }
}

/// Image reference for scale set instances.
#[derive(Debug, Clone)]
struct ImageReference {
    publisher: String,
    offer: String,
    sku: String,
    version: String,
}

impl ImageReference {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        let obj = match params.get("image") {
            Some(Value::Object(obj)) => obj.clone(),
            Some(_) => {
                return Err(Error::InvalidParameter(
                    "image must be an object with publisher/offer/sku/version".to_string(),
                ))
            }
            None => Map::new(),
        };

        let field = |key: &str, default: &str| -> String {
            obj.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or(default)
                .to_string()
        };

        Ok(Self {
            publisher: field("publisher", "Canonical"),
            offer: field("offer", "0001-com-ubuntu-server-jammy"),
            sku: field("sku", "22_04-lts-gen2"),
            version: field("version", "latest"),
        })
    }
}

/// Parsed scale set configuration.
#[derive(Debug, Clone)]
struct ScaleSetConfig {
    name: String,
    location: String,
    vm_size: String,
    capacity: u64,
    upgrade_mode: UpgradeMode,
    max_batch_percent: u32,
    max_unhealthy_percent: u32,
    pause_between_batches: String,
    overprovision: bool,
    single_placement_group: bool,
    zones: Vec<String>,
    admin_username: String,
    image: ImageReference,
    subnet_id: Option<String>,
    tags: Map<String, Value>,
}

impl ScaleSetConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        let upgrade_mode = match params.get_string("upgrade_policy")? {
            Some(s) => UpgradeMode::from_str(&s)?,
            None => UpgradeMode::Manual,
        };

        Ok(Self {
            name: params.get_string_required("name")?,
            location: params.get_string_required("location")?,
            vm_size: params
                .get_string("vm_size")?
                .unwrap_or_else(|| "Standard_B2s".to_string()),
            capacity: params
                .get_u64("capacity")?
                .ok_or_else(|| Error::MissingParameter("capacity".to_string()))?,
            upgrade_mode,
            max_batch_percent: params.get_u32("max_batch_percent")?.unwrap_or(20),
            max_unhealthy_percent: params.get_u32("max_unhealthy_percent")?.unwrap_or(20),
            pause_between_batches: params
                .get_string("pause_between_batches")?
                .unwrap_or_else(|| "PT0S".to_string()),
            overprovision: params.get_bool_or("overprovision", true)?,
            single_placement_group: params.get_bool_or("single_placement_group", true)?,
            zones: params.get_vec_string("zones")?.unwrap_or_default(),
            admin_username: params
                .get_string("admin_username")?
                .unwrap_or_else(|| "azureuser".to_string()),
            image: ImageReference::from_params(params)?,
            subnet_id: params.get_string("subnet_id")?,
            tags: extract_tags(params),
        })
    }
}

/// Generator for `Microsoft.Compute/virtualMachineScaleSets` resources.
pub struct ScaleSetGenerator;

impl Generator for ScaleSetGenerator {
    fn name(&self) -> &'static str {
        "scale_set"
    }

    fn description(&self) -> &'static str {
        "VM scale set with upgrade policy, placement group, and zone configuration"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name", "location", "capacity"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match ScaleSetConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        validate_resource_name(&config.name, &mut report);
        validate_location(&config.location, &mut report);
        validate_tags(&config.tags, &mut report);

        if config.capacity > MAX_CAPACITY {
            report.error(format!(
                "capacity {} exceeds the scale set maximum of {}",
                config.capacity, MAX_CAPACITY
            ));
        }
        if config.single_placement_group && config.capacity > MAX_CAPACITY_SINGLE_PLACEMENT_GROUP {
            report.error(format!(
                "capacity {} exceeds {} instances; set single_placement_group to false",
                config.capacity, MAX_CAPACITY_SINGLE_PLACEMENT_GROUP
            ));
        }
        if config.capacity == 0 {
            report.warn("capacity 0 deploys an empty scale set");
        }

        if config.upgrade_mode == UpgradeMode::Rolling {
            for (field, value) in [
                ("max_batch_percent", config.max_batch_percent),
                ("max_unhealthy_percent", config.max_unhealthy_percent),
            ] {
                if !(5..=100).contains(&value) {
                    report.error(format!(
                        "{} must be between 5 and 100, got {}",
                        field, value
                    ));
                }
            }
            if config.zones.len() > 1 && config.max_batch_percent > 50 {
                report.warn(
                    "rolling upgrades over half the fleet at once defeat zone redundancy",
                );
            }
        }

        for zone in &config.zones {
            if !matches!(zone.as_str(), "1" | "2" | "3") {
                report.error(format!("zone '{}' is not a valid zone (1, 2, or 3)", zone));
            }
        }

        if config.zones.is_empty() {
            report.recommend("zone-spanning scale sets survive datacenter-level failure");
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = ScaleSetConfig::from_params(params)?;

        let mut upgrade_policy = Map::new();
        upgrade_policy.insert("mode".to_string(), json!(config.upgrade_mode.as_str()));
        if config.upgrade_mode == UpgradeMode::Rolling {
            upgrade_policy.insert(
                "rollingUpgradePolicy".to_string(),
                json!({
                    "maxBatchInstancePercent": config.max_batch_percent,
                    "maxUnhealthyInstancePercent": config.max_unhealthy_percent,
                    "pauseTimeBetweenBatches": config.pause_between_batches,
                }),
            );
        }

        let mut ip_configuration = json!({
            "name": "ipconfig-primary",
            "properties": {},
        });
        if let Some(subnet_id) = &config.subnet_id {
            ip_configuration["properties"]["subnet"] = json!({ "id": subnet_id });
        }

        let mut resource = json!({
            "type": "Microsoft.Compute/virtualMachineScaleSets",
            "apiVersion": API_VERSION,
            "name": config.name,
            "location": config.location,
            "sku": {
                "name": config.vm_size,
                "tier": "Standard",
                "capacity": config.capacity,
            },
            "properties": {
                "overprovision": config.overprovision,
                "singlePlacementGroup": config.single_placement_group,
                "upgradePolicy": Value::Object(upgrade_policy),
                "virtualMachineProfile": {
                    "osProfile": {
                        "computerNamePrefix": config.name,
                        "adminUsername": config.admin_username,
                    },
                    "storageProfile": {
                        "imageReference": {
                            "publisher": config.image.publisher,
                            "offer": config.image.offer,
                            "sku": config.image.sku,
                            "version": config.image.version,
                        },
                        "osDisk": {
                            "createOption": "FromImage",
                            "caching": "ReadWrite",
                            "managedDisk": { "storageAccountType": "Premium_LRS" },
                        },
                    },
                    "networkProfile": {
                        "networkInterfaceConfigurations": [{
                            "name": "nic-primary",
                            "properties": {
                                "primary": true,
                                "ipConfigurations": [ip_configuration],
                            },
                        }],
                    },
                },
            },
            "tags": Value::Object(config.tags),
        });

        if !config.zones.is_empty() {
            resource["zones"] = json!(config.zones);
        }

        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params(capacity: u64) -> GeneratorParams {
        let mut params = GeneratorParams::new();
        params.insert("name".to_string(), json!("web-vmss"));
        params.insert("location".to_string(), json!("eastus2"));
        params.insert("capacity".to_string(), json!(capacity));
        params
    }

    #[test]
    fn test_upgrade_mode_parsing() {
        assert_eq!(UpgradeMode::from_str("rolling").unwrap(), UpgradeMode::Rolling);
        assert_eq!(UpgradeMode::from_str("Manual").unwrap(), UpgradeMode::Manual);
        assert!(UpgradeMode::from_str("canary").is_err());
    }

    #[test]
    fn test_scale_set_defaults() {
        let gen = ScaleSetGenerator;
        let params = base_params(3);

        assert!(gen.validate(&params).is_valid);
        let resource = gen.generate(&params).unwrap();
        assert_eq!(resource["type"], "Microsoft.Compute/virtualMachineScaleSets");
        assert_eq!(resource["sku"]["capacity"], 3);
        assert_eq!(resource["properties"]["upgradePolicy"]["mode"], "Manual");
        assert_eq!(resource["properties"]["overprovision"], true);
        assert_eq!(
            resource["properties"]["virtualMachineProfile"]["osProfile"]["computerNamePrefix"],
            "web-vmss"
        );
    }

    #[test]
    fn test_scale_set_capacity_bounds() {
        let gen = ScaleSetGenerator;

        let params = base_params(1001);
        assert!(!gen.validate(&params).is_valid);

        // 101 is fine once the placement group constraint is lifted
        let mut params = base_params(101);
        assert!(!gen.validate(&params).is_valid);
        params.insert("single_placement_group".to_string(), json!(false));
        let report = gen.validate(&params);
        assert!(report.is_valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_scale_set_rolling_upgrade_policy() {
        let gen = ScaleSetGenerator;
        let mut params = base_params(10);
        params.insert("upgrade_policy".to_string(), json!("Rolling"));
        params.insert("max_batch_percent".to_string(), json!(25));

        let resource = gen.generate(&params).unwrap();
        let rolling = &resource["properties"]["upgradePolicy"]["rollingUpgradePolicy"];
        assert_eq!(rolling["maxBatchInstancePercent"], 25);
        assert_eq!(rolling["pauseTimeBetweenBatches"], "PT0S");
    }

    #[test]
    fn test_scale_set_rolling_batch_bounds() {
        let gen = ScaleSetGenerator;
        let mut params = base_params(10);
        params.insert("upgrade_policy".to_string(), json!("Rolling"));
        params.insert("max_batch_percent".to_string(), json!(3));
        assert!(!gen.validate(&params).is_valid);
    }

    #[test]
    fn test_scale_set_zones() {
        let gen = ScaleSetGenerator;
        let mut params = base_params(6);
        params.insert("zones".to_string(), json!(["1", "2", "3"]));

        assert!(gen.validate(&params).is_valid);
        let resource = gen.generate(&params).unwrap();
        assert_eq!(resource["zones"], json!(["1", "2", "3"]));
    }

    #[test]
    fn test_scale_set_invalid_zone() {
        let gen = ScaleSetGenerator;
        let mut params = base_params(6);
        params.insert("zones".to_string(), json!(["0"]));
        assert!(!gen.validate(&params).is_valid);
    }

    #[test]
    fn test_scale_set_subnet_wiring() {
        let gen = ScaleSetGenerator;
        let mut params = base_params(2);
        params.insert("subnet_id".to_string(), json!("/subscriptions/s/subnets/app"));

        let resource = gen.generate(&params).unwrap();
        let ipcfg = &resource["properties"]["virtualMachineProfile"]["networkProfile"]
            ["networkInterfaceConfigurations"][0]["properties"]["ipConfigurations"][0];
        assert_eq!(ipcfg["properties"]["subnet"]["id"], "/subscriptions/s/subnets/app");
    }

    #[test]
    fn test_scale_set_custom_image() {
        let gen = ScaleSetGenerator;
        let mut params = base_params(2);
        params.insert(
            "image".to_string(),
            json!({
                "publisher": "MicrosoftWindowsServer",
                "offer": "WindowsServer",
                "sku": "2022-datacenter",
            }),
        );

        let resource = gen.generate(&params).unwrap();
        let image = &resource["properties"]["virtualMachineProfile"]["storageProfile"]
            ["imageReference"];
        assert_eq!(image["publisher"], "MicrosoftWindowsServer");
        assert_eq!(image["version"], "latest");
    }
}
