//! Managed disk generator and disk configuration validation.
//!
//! ## ManagedDiskGenerator
//!
//! Emits a `Microsoft.Compute/disks` resource.
//!
//! ### Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `name` | Yes | Disk name |
//! | `location` | Yes | Azure region |
//! | `sku` | Yes | Standard_LRS, StandardSSD_LRS, Premium_LRS, PremiumV2_LRS, UltraSSD_LRS |
//! | `size_gb` | Yes | Disk size in GiB |
//! | `caching` | No | None, ReadOnly, ReadWrite (default: None) |
//! | `create_option` | No | Empty, FromImage, Copy (default: Empty) |
//! | `zones` | No | Availability zones for the disk |
//! | `iops` | No | Provisioned IOPS (Ultra / Premium v2 only) |
//! | `throughput_mbps` | No | Provisioned throughput (Ultra / Premium v2 only) |
//! | `tags` | No | Resource tags |

use crate::arm::{validate_location, validate_resource_name, validate_tags};
use crate::error::{Error, Result};
use crate::generators::availability::extract_tags;
use crate::generators::{Generator, GeneratorParams, ParamExt, ValidationReport};
use serde_json::{json, Map, Value};

const API_VERSION: &str = "2023-04-02";

/// Managed disk storage SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskSku {
    StandardHdd,
    StandardSsd,
    Premium,
    PremiumV2,
    Ultra,
}

impl DiskSku {
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "Standard_LRS" => Ok(Self::StandardHdd),
            "StandardSSD_LRS" => Ok(Self::StandardSsd),
            "Premium_LRS" => Ok(Self::Premium),
            "PremiumV2_LRS" => Ok(Self::PremiumV2),
            "UltraSSD_LRS" => Ok(Self::Ultra),
            _ => Err(Error::InvalidParameter(format!(
                "Invalid disk sku '{}'. Valid skus: Standard_LRS, StandardSSD_LRS, \
                 Premium_LRS, PremiumV2_LRS, UltraSSD_LRS",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StandardHdd => "Standard_LRS",
            Self::StandardSsd => "StandardSSD_LRS",
            Self::Premium => "Premium_LRS",
            Self::PremiumV2 => "PremiumV2_LRS",
            Self::Ultra => "UltraSSD_LRS",
        }
    }

    /// Minimum supported disk size in GiB.
    pub fn min_size_gb(&self) -> u64 {
        match self {
            Self::StandardHdd | Self::StandardSsd | Self::Premium => 4,
            Self::PremiumV2 | Self::Ultra => 1,
        }
    }

    /// Maximum supported disk size in GiB.
    pub fn max_size_gb(&self) -> u64 {
        match self {
            Self::StandardHdd | Self::StandardSsd | Self::Premium => 32_767,
            Self::PremiumV2 | Self::Ultra => 65_536,
        }
    }

    /// Whether the SKU takes provisioned IOPS/throughput.
    pub fn is_provisioned(&self) -> bool {
        matches!(self, Self::PremiumV2 | Self::Ultra)
    }

    /// Whether host caching is supported for this SKU.
    pub fn supports_caching(&self) -> bool {
        !self.is_provisioned()
    }
}

// Provisioned-performance bounds shared by Ultra and Premium v2.
const MIN_IOPS: u64 = 100;
const MAX_IOPS: u64 = 160_000;
const MIN_THROUGHPUT_MBPS: u64 = 1;
const MAX_THROUGHPUT_MBPS: u64 = 4_000;

/// Parsed disk configuration.
#[derive(Debug, Clone)]
struct DiskConfig {
    name: String,
    location: String,
    sku: DiskSku,
    size_gb: u64,
    caching: String,
    create_option: String,
    zones: Vec<String>,
    iops: Option<u64>,
    throughput_mbps: Option<u64>,
    tags: Map<String, Value>,
}

impl DiskConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        let sku = DiskSku::from_str(&params.get_string_required("sku")?)?;
        let size_gb = params
            .get_u64("size_gb")?
            .ok_or_else(|| Error::MissingParameter("size_gb".to_string()))?;

        let caching = params
            .get_string("caching")?
            .unwrap_or_else(|| "None".to_string());
        if !matches!(caching.as_str(), "None" | "ReadOnly" | "ReadWrite") {
            return Err(Error::InvalidParameter(format!(
                "Invalid caching '{}'. Valid values: None, ReadOnly, ReadWrite",
                caching
            )));
        }

        let create_option = params
            .get_string("create_option")?
            .unwrap_or_else(|| "Empty".to_string());
        if !matches!(create_option.as_str(), "Empty" | "FromImage" | "Copy") {
            return Err(Error::InvalidParameter(format!(
                "Invalid create_option '{}'. Valid values: Empty, FromImage, Copy",
                create_option
            )));
        }

        Ok(Self {
            name: params.get_string_required("name")?,
            location: params.get_string_required("location")?,
            sku,
            size_gb,
            caching,
            create_option,
            zones: params.get_vec_string("zones")?.unwrap_or_default(),
            iops: params.get_u64("iops")?,
            throughput_mbps: params.get_u64("throughput_mbps")?,
            tags: extract_tags(params),
        })
    }
}

/// Generator for `Microsoft.Compute/disks` resources.
pub struct ManagedDiskGenerator;

impl Generator for ManagedDiskGenerator {
    fn name(&self) -> &'static str {
        "managed_disk"
    }

    fn description(&self) -> &'static str {
        "Managed data disk with per-SKU size, IOPS, and throughput validation"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name", "location", "sku", "size_gb"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match DiskConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        validate_resource_name(&config.name, &mut report);
        validate_location(&config.location, &mut report);
        validate_tags(&config.tags, &mut report);

        let (min, max) = (config.sku.min_size_gb(), config.sku.max_size_gb());
        if config.size_gb < min {
            report.error(format!(
                "size_gb {} is below the {} GiB minimum for {}",
                config.size_gb,
                min,
                config.sku.as_str()
            ));
        }
        if config.size_gb > max {
            report.error(format!(
                "size_gb {} exceeds the {} GiB maximum for {}",
                config.size_gb,
                max,
                config.sku.as_str()
            ));
        }

        if config.sku.is_provisioned() {
            match config.iops {
                Some(iops) if !(MIN_IOPS..=MAX_IOPS).contains(&iops) => {
                    report.error(format!(
                        "iops {} outside the supported range {}-{}",
                        iops, MIN_IOPS, MAX_IOPS
                    ));
                }
                Some(_) => {}
                None => report.warn(format!(
                    "{} disks take provisioned iops; the platform default will apply",
                    config.sku.as_str()
                )),
            }
            if let Some(tp) = config.throughput_mbps {
                if !(MIN_THROUGHPUT_MBPS..=MAX_THROUGHPUT_MBPS).contains(&tp) {
                    report.error(format!(
                        "throughput_mbps {} outside the supported range {}-{}",
                        tp, MIN_THROUGHPUT_MBPS, MAX_THROUGHPUT_MBPS
                    ));
                }
            }
        } else if config.iops.is_some() || config.throughput_mbps.is_some() {
            report.error(format!(
                "{} does not take provisioned iops/throughput",
                config.sku.as_str()
            ));
        }

        if !config.sku.supports_caching() && config.caching != "None" {
            report.error(format!(
                "host caching is not supported on {}",
                config.sku.as_str()
            ));
        }
        if config.sku == DiskSku::StandardHdd && config.caching == "ReadWrite" {
            report.warn("ReadWrite caching on Standard HDD rarely improves throughput");
        }

        if config.sku == DiskSku::StandardHdd {
            report.recommend(
                "Premium or Standard SSD storage gives an SLA-backed single-VM uptime guarantee",
            );
        }

        for zone in &config.zones {
            if !matches!(zone.as_str(), "1" | "2" | "3") {
                report.error(format!("zone '{}' is not a valid zone (1, 2, or 3)", zone));
            }
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = DiskConfig::from_params(params)?;

        let mut properties = Map::new();
        properties.insert(
            "creationData".to_string(),
            json!({ "createOption": config.create_option }),
        );
        properties.insert("diskSizeGB".to_string(), json!(config.size_gb));
        if let Some(iops) = config.iops {
            properties.insert("diskIOPSReadWrite".to_string(), json!(iops));
        }
        if let Some(tp) = config.throughput_mbps {
            properties.insert("diskMBpsReadWrite".to_string(), json!(tp));
        }

        let mut resource = json!({
            "type": "Microsoft.Compute/disks",
            "apiVersion": API_VERSION,
            "name": config.name,
            "location": config.location,
            "sku": { "name": config.sku.as_str() },
            "properties": Value::Object(properties),
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

    fn base_params(sku: &str, size: u64) -> GeneratorParams {
        let mut params = GeneratorParams::new();
        params.insert("name".to_string(), json!("data-disk-0"));
        params.insert("location".to_string(), json!("westeurope"));
        params.insert("sku".to_string(), json!(sku));
        params.insert("size_gb".to_string(), json!(size));
        params
    }

    #[test]
    fn test_disk_sku_parsing() {
        assert_eq!(DiskSku::from_str("Premium_LRS").unwrap(), DiskSku::Premium);
        assert_eq!(DiskSku::from_str("UltraSSD_LRS").unwrap(), DiskSku::Ultra);
        assert!(DiskSku::from_str("Premium").is_err());
    }

    #[test]
    fn test_disk_below_minimum_size() {
        let gen = ManagedDiskGenerator;
        let params = base_params("Premium_LRS", 2);

        let report = gen.validate(&params);
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("below the 4 GiB minimum")));
    }

    #[test]
    fn test_disk_above_maximum_size() {
        let gen = ManagedDiskGenerator;
        let params = base_params("StandardSSD_LRS", 40_000);
        assert!(!gen.validate(&params).is_valid);
    }

    #[test]
    fn test_disk_generates_resource() {
        let gen = ManagedDiskGenerator;
        let params = base_params("Premium_LRS", 512);

        assert!(gen.validate(&params).is_valid);
        let resource = gen.generate(&params).unwrap();
        assert_eq!(resource["type"], "Microsoft.Compute/disks");
        assert_eq!(resource["sku"]["name"], "Premium_LRS");
        assert_eq!(resource["properties"]["diskSizeGB"], 512);
        assert_eq!(resource["properties"]["creationData"]["createOption"], "Empty");
    }

    #[test]
    fn test_ultra_disk_iops_bounds() {
        let gen = ManagedDiskGenerator;

        let mut params = base_params("UltraSSD_LRS", 1024);
        params.insert("iops".to_string(), json!(200_000));
        assert!(!gen.validate(&params).is_valid);

        let mut params = base_params("UltraSSD_LRS", 1024);
        params.insert("iops".to_string(), json!(4_000));
        params.insert("throughput_mbps".to_string(), json!(200));
        let report = gen.validate(&params);
        assert!(report.is_valid, "errors: {:?}", report.errors);

        let resource = gen.generate(&params).unwrap();
        assert_eq!(resource["properties"]["diskIOPSReadWrite"], 4_000);
        assert_eq!(resource["properties"]["diskMBpsReadWrite"], 200);
    }

    #[test]
    fn test_provisioned_fields_rejected_on_standard() {
        let gen = ManagedDiskGenerator;
        let mut params = base_params("Standard_LRS", 128);
        params.insert("iops".to_string(), json!(500));
        assert!(!gen.validate(&params).is_valid);
    }

    #[test]
    fn test_caching_rejected_on_ultra() {
        let gen = ManagedDiskGenerator;
        let mut params = base_params("UltraSSD_LRS", 64);
        params.insert("caching".to_string(), json!("ReadWrite"));
        assert!(!gen.validate(&params).is_valid);
    }

    #[test]
    fn test_standard_hdd_gets_recommendation() {
        let gen = ManagedDiskGenerator;
        let params = base_params("Standard_LRS", 128);
        let report = gen.validate(&params);
        assert!(report.is_valid);
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn test_disk_zones_emitted() {
        let gen = ManagedDiskGenerator;
        let mut params = base_params("Premium_LRS", 256);
        params.insert("zones".to_string(), json!(["1"]));

        let resource = gen.generate(&params).unwrap();
        assert_eq!(resource["zones"], json!(["1"]));
    }
}
