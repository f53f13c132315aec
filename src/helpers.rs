//! Template helper layer.
//!
//! Exposes every registered generator as a minijinja function, so templates
//! can assemble ARM documents from generator calls:
//!
//! ```jinja
//! {{ arm_template([
//!     availability_set(name="web-avset", location="eastus"),
//!     managed_disk(name="data0", location="eastus", sku="Premium_LRS", size_gb=256),
//! ]) }}
//! ```
//!
//! Generator functions take keyword arguments matching the generator's
//! parameter table. A failing validation surfaces as a template error
//! carrying the report's error lines.

use crate::arm::{self, TemplateBuilder};
use crate::generators::{GeneratorParams, GeneratorRegistry};
use minijinja::value::{Kwargs, Value as TemplateValue};
use minijinja::{Environment, Error as TemplateError, ErrorKind};
use std::sync::Arc;

/// Build a template environment with every generator in `registry` exposed
/// as a function, plus the `arm_template` and `resource_id` helpers.
pub fn environment(registry: Arc<GeneratorRegistry>) -> Environment<'static> {
    let mut env = Environment::new();

    for name in registry.names() {
        let name = name.to_string();
        let registry = Arc::clone(&registry);
        let fn_name = name.clone();
        env.add_function(name, move |kwargs: Kwargs| -> Result<TemplateValue, TemplateError> {
            let params = kwargs_to_params(&kwargs)?;
            kwargs.assert_all_used()?;
            let resource = registry
                .run(&fn_name, &params)
                .map_err(|e| TemplateError::new(ErrorKind::InvalidOperation, e.to_string()))?;
            Ok(TemplateValue::from_serialize(&resource))
        });
    }

    env.add_function(
        "arm_template",
        |resources: Vec<TemplateValue>| -> Result<TemplateValue, TemplateError> {
            let mut builder = TemplateBuilder::new();
            for resource in resources {
                let value = template_to_json(&resource)?;
                builder = builder.resource(value);
            }
            Ok(TemplateValue::from_serialize(builder.build()))
        },
    );

    env.add_function(
        "resource_id",
        |subscription: &str,
         resource_group: &str,
         provider: &str,
         resource_type: &str,
         name: &str| {
            arm::resource_id(subscription, resource_group, provider, resource_type, name)
        },
    );

    env.add_function(
        "resource_id_expression",
        |provider_type: &str, name: &str| arm::resource_id_expression(provider_type, name),
    );

    env
}

/// Render a template source string against the given registry.
pub fn render(
    registry: Arc<GeneratorRegistry>,
    source: &str,
    context: TemplateValue,
) -> Result<String, TemplateError> {
    let mut env = environment(registry);
    env.add_template("inline", source)?;
    let template = env.get_template("inline")?;
    template.render(context)
}

fn kwargs_to_params(kwargs: &Kwargs) -> Result<GeneratorParams, TemplateError> {
    let mut params = GeneratorParams::new();
    for key in kwargs.args() {
        let value: TemplateValue = kwargs.get(key)?;
        params.insert(key.to_string(), template_to_json(&value)?);
    }
    Ok(params)
}

fn template_to_json(value: &TemplateValue) -> Result<serde_json::Value, TemplateError> {
    serde_json::to_value(value).map_err(|e| {
        TemplateError::new(
            ErrorKind::InvalidOperation,
            format!("value is not JSON-serializable: {}", e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    fn registry() -> Arc<GeneratorRegistry> {
        Arc::new(GeneratorRegistry::with_builtins())
    }

    #[test]
    fn test_generator_function_renders_resource() {
        let out = render(
            registry(),
            r#"{{ availability_set(name="web-avset", location="eastus") | tojson }}"#,
            context! {},
        )
        .unwrap();

        let resource: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(resource["type"], "Microsoft.Compute/availabilitySets");
        assert_eq!(resource["name"], "web-avset");
    }

    #[test]
    fn test_arm_template_wraps_resources() {
        let out = render(
            registry(),
            r#"{{ arm_template([
                availability_set(name="web-avset", location="eastus"),
                managed_disk(name="data0", location="eastus", sku="Premium_LRS", size_gb=256),
            ]) | tojson }}"#,
            context! {},
        )
        .unwrap();

        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["contentVersion"], "1.0.0.0");
        assert_eq!(doc["resources"].as_array().unwrap().len(), 2);
        assert_eq!(doc["resources"][1]["type"], "Microsoft.Compute/disks");
    }

    #[test]
    fn test_validation_failure_surfaces_as_template_error() {
        let err = render(
            registry(),
            r#"{{ availability_set(name="web-avset", location="eastus", fault_domains=9) }}"#,
            context! {},
        )
        .unwrap_err();

        assert!(err.to_string().contains("fault_domains"));
    }

    #[test]
    fn test_context_values_flow_into_generators() {
        let out = render(
            registry(),
            r#"{{ availability_set(name=prefix ~ "-avset", location=region) | tojson }}"#,
            context! { prefix => "web", region => "westeurope" },
        )
        .unwrap();

        let resource: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(resource["name"], "web-avset");
        assert_eq!(resource["location"], "westeurope");
    }

    #[test]
    fn test_resource_id_helper() {
        let out = render(
            registry(),
            r#"{{ resource_id("sub1", "rg1", "Microsoft.Compute", "disks", "data0") }}"#,
            context! {},
        )
        .unwrap();
        assert_eq!(
            out,
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Compute/disks/data0"
        );
    }

    #[test]
    fn test_unknown_kwarg_is_passed_to_generator() {
        // Unknown parameters are forwarded; generators ignore what they do
        // not read. The template still renders.
        let out = render(
            registry(),
            r#"{{ availability_set(name="a-set", location="eastus", extra="x") | tojson }}"#,
            context! {},
        );
        assert!(out.is_ok());
    }
}
