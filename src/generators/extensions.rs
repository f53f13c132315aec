//! VM extension generator.
//!
//! Emits a `Microsoft.Compute/virtualMachines/extensions` child resource.
//! Three presets cover the common agents; `custom` takes the publisher and
//! type verbatim.
//!
//! Protected settings (command secrets, connection strings) are passed
//! through under `protectedSettings` and never merged into the plain
//! `settings` object.
//!
//! ### Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `vm_name` | Yes | Parent virtual machine name |
//! | `preset` | No | custom_script, azure_monitor, dependency_agent, custom (default: custom) |
//! | `name` | No | Extension name (presets supply one) |
//! | `publisher` | For custom | Extension publisher |
//! | `extension_type` | For custom | Extension type |
//! | `type_handler_version` | No | Handler version (presets supply one) |
//! | `settings` | No | Public settings object |
//! | `protected_settings` | No | Secret settings object |
//! | `auto_upgrade_minor_version` | No | Default: true |

use crate::error::{Error, Result};
use crate::generators::{Generator, GeneratorParams, ParamExt, ValidationReport};
use serde_json::{json, Map, Value};

const API_VERSION: &str = "2023-03-01";

/// Well-known extension presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionPreset {
    CustomScript,
    AzureMonitor,
    DependencyAgent,
    Custom,
}

impl ExtensionPreset {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "custom_script" | "customscript" => Ok(Self::CustomScript),
            "azure_monitor" | "azuremonitor" => Ok(Self::AzureMonitor),
            "dependency_agent" | "dependencyagent" => Ok(Self::DependencyAgent),
            "custom" => Ok(Self::Custom),
            _ => Err(Error::InvalidParameter(format!(
                "Invalid preset '{}'. Valid presets: custom_script, \
                 azure_monitor, dependency_agent, custom",
                s
            ))),
        }
    }

    /// Default identity for the preset: (name, publisher, type, version).
    fn identity(&self) -> Option<(&'static str, &'static str, &'static str, &'static str)> {
        match self {
            Self::CustomScript => Some((
                "CustomScriptExtension",
                "Microsoft.Azure.Extensions",
                "CustomScript",
                "2.1",
            )),
            Self::AzureMonitor => Some((
                "AzureMonitorLinuxAgent",
                "Microsoft.Azure.Monitor",
                "AzureMonitorLinuxAgent",
                "1.0",
            )),
            Self::DependencyAgent => Some((
                "DependencyAgentLinux",
                "Microsoft.Azure.Monitoring.DependencyAgent",
                "DependencyAgentLinux",
                "9.10",
            )),
            Self::Custom => None,
        }
    }
}

#[derive(Debug, Clone)]
struct ExtensionConfig {
    vm_name: String,
    name: String,
    publisher: String,
    extension_type: String,
    type_handler_version: String,
    settings: Option<Map<String, Value>>,
    protected_settings: Option<Map<String, Value>>,
    auto_upgrade_minor_version: bool,
}

impl ExtensionConfig {
    fn from_params(params: &GeneratorParams) -> Result<Self> {
        let preset = match params.get_string("preset")? {
            Some(s) => ExtensionPreset::from_str(&s)?,
            None => ExtensionPreset::Custom,
        };

        let (default_name, default_publisher, default_type, default_version) =
            match preset.identity() {
                Some((n, p, t, v)) => (Some(n), Some(p), Some(t), Some(v)),
                None => (None, None, None, None),
            };

        let pick = |explicit: Option<String>, fallback: Option<&str>, field: &str| {
            explicit
                .or_else(|| fallback.map(str::to_string))
                .ok_or_else(|| Error::MissingParameter(field.to_string()))
        };

        let object_param = |key: &str| -> Result<Option<Map<String, Value>>> {
            match params.get(key) {
                Some(Value::Object(obj)) => Ok(Some(obj.clone())),
                Some(Value::Null) | None => Ok(None),
                Some(_) => Err(Error::InvalidParameter(format!(
                    "{} must be an object",
                    key
                ))),
            }
        };

        Ok(Self {
            vm_name: params.get_string_required("vm_name")?,
            name: pick(params.get_string("name")?, default_name, "name")?,
            publisher: pick(
                params.get_string("publisher")?,
                default_publisher,
                "publisher",
            )?,
            extension_type: pick(
                params.get_string("extension_type")?,
                default_type,
                "extension_type",
            )?,
            type_handler_version: pick(
                params.get_string("type_handler_version")?,
                default_version,
                "type_handler_version",
            )?,
            settings: object_param("settings")?,
            protected_settings: object_param("protected_settings")?,
            auto_upgrade_minor_version: params.get_bool_or("auto_upgrade_minor_version", true)?,
        })
    }
}

/// Generator for `Microsoft.Compute/virtualMachines/extensions` resources.
pub struct VmExtensionGenerator;

impl Generator for VmExtensionGenerator {
    fn name(&self) -> &'static str {
        "vm_extension"
    }

    fn description(&self) -> &'static str {
        "VM extension with custom-script, Azure Monitor, and dependency agent presets"
    }

    fn required_params(&self) -> &[&'static str] {
        &["vm_name"]
    }

    fn validate(&self, params: &GeneratorParams) -> ValidationReport {
        let mut report = ValidationReport::ok();

        let config = match ExtensionConfig::from_params(params) {
            Ok(c) => c,
            Err(e) => {
                report.error(e.to_string());
                return report;
            }
        };

        if config.vm_name.is_empty() {
            report.error("vm_name must not be empty");
        }

        // Secrets in public settings end up readable in the deployment log.
        if let Some(settings) = &config.settings {
            for key in settings.keys() {
                let lowered = key.to_lowercase();
                if lowered.contains("password")
                    || lowered.contains("secret")
                    || lowered.contains("token")
                {
                    report.warn(format!(
                        "settings key '{}' looks secret; move it to protected_settings",
                        key
                    ));
                }
            }
        }

        if config.settings.is_none() && config.protected_settings.is_none() {
            report.recommend("extension has no settings; verify the agent needs none");
        }

        report
    }

    fn generate(&self, params: &GeneratorParams) -> Result<Value> {
        let config = ExtensionConfig::from_params(params)?;

        let mut properties = Map::new();
        properties.insert("publisher".to_string(), json!(config.publisher));
        properties.insert("type".to_string(), json!(config.extension_type));
        properties.insert(
            "typeHandlerVersion".to_string(),
            json!(config.type_handler_version),
        );
        properties.insert(
            "autoUpgradeMinorVersion".to_string(),
            json!(config.auto_upgrade_minor_version),
        );
        if let Some(settings) = config.settings {
            properties.insert("settings".to_string(), Value::Object(settings));
        }
        if let Some(protected) = config.protected_settings {
            properties.insert("protectedSettings".to_string(), Value::Object(protected));
        }

        Ok(json!({
            "type": "Microsoft.Compute/virtualMachines/extensions",
            "apiVersion": API_VERSION,
            "name": format!("{}/{}", config.vm_name, config.name),
            "dependsOn": [
                format!("[resourceId('Microsoft.Compute/virtualMachines', '{}')]", config.vm_name),
            ],
            "properties": Value::Object(properties),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parsing() {
        assert_eq!(
            ExtensionPreset::from_str("azure_monitor").unwrap(),
            ExtensionPreset::AzureMonitor
        );
        assert!(ExtensionPreset::from_str("antivirus").is_err());
    }

    #[test]
    fn test_custom_script_preset() {
        let gen = VmExtensionGenerator;
        let mut params = GeneratorParams::new();
        params.insert("vm_name".to_string(), json!("vm0"));
        params.insert("preset".to_string(), json!("custom_script"));
        params.insert(
            "settings".to_string(),
            json!({ "commandToExecute": "bash install.sh" }),
        );

        let resource = gen.generate(&params).unwrap();
        assert_eq!(resource["name"], "vm0/CustomScriptExtension");
        assert_eq!(resource["properties"]["publisher"], "Microsoft.Azure.Extensions");
        assert_eq!(resource["properties"]["typeHandlerVersion"], "2.1");
        assert_eq!(
            resource["properties"]["settings"]["commandToExecute"],
            "bash install.sh"
        );
        assert!(resource["properties"].get("protectedSettings").is_none());
    }

    #[test]
    fn test_custom_requires_identity() {
        let gen = VmExtensionGenerator;
        let mut params = GeneratorParams::new();
        params.insert("vm_name".to_string(), json!("vm0"));
        params.insert("preset".to_string(), json!("custom"));

        assert!(!gen.validate(&params).is_valid);
        assert!(gen.generate(&params).is_err());
    }

    #[test]
    fn test_custom_identity_full() {
        let gen = VmExtensionGenerator;
        let mut params = GeneratorParams::new();
        params.insert("vm_name".to_string(), json!("vm0"));
        params.insert("name".to_string(), json!("MyAgent"));
        params.insert("publisher".to_string(), json!("Contoso"));
        params.insert("extension_type".to_string(), json!("ContosoAgent"));
        params.insert("type_handler_version".to_string(), json!("1.2"));

        assert!(gen.validate(&params).is_valid);
        let resource = gen.generate(&params).unwrap();
        assert_eq!(resource["name"], "vm0/MyAgent");
        assert_eq!(resource["properties"]["publisher"], "Contoso");
    }

    #[test]
    fn test_protected_settings_kept_separate() {
        let gen = VmExtensionGenerator;
        let mut params = GeneratorParams::new();
        params.insert("vm_name".to_string(), json!("vm0"));
        params.insert("preset".to_string(), json!("custom_script"));
        params.insert(
            "protected_settings".to_string(),
            json!({ "storageAccountKey": "hunter2" }),
        );

        let resource = gen.generate(&params).unwrap();
        assert_eq!(
            resource["properties"]["protectedSettings"]["storageAccountKey"],
            "hunter2"
        );
        assert!(resource["properties"].get("settings").is_none());
    }

    #[test]
    fn test_secret_in_public_settings_warns() {
        let gen = VmExtensionGenerator;
        let mut params = GeneratorParams::new();
        params.insert("vm_name".to_string(), json!("vm0"));
        params.insert("preset".to_string(), json!("custom_script"));
        params.insert("settings".to_string(), json!({ "adminPassword": "x" }));

        let report = gen.validate(&params);
        assert!(report.is_valid);
        assert!(report.warnings[0].contains("protected_settings"));
    }

    #[test]
    fn test_depends_on_parent_vm() {
        let gen = VmExtensionGenerator;
        let mut params = GeneratorParams::new();
        params.insert("vm_name".to_string(), json!("vm0"));
        params.insert("preset".to_string(), json!("dependency_agent"));

        let resource = gen.generate(&params).unwrap();
        assert_eq!(
            resource["dependsOn"][0],
            "[resourceId('Microsoft.Compute/virtualMachines', 'vm0')]"
        );
    }
}
