//! Provider template rendering
//!
//! Renders a [`Plan`] into a provider template document. The output is parsed
//! back before it is returned, so a template that renders to invalid YAML is
//! caught here and not by the provider.

use serde::Serialize;
use serde_json::Value;
use tera::{Context as TeraContext, Tera};

use crate::error::PlanError;
use crate::plan::{Plan, ResourceKind};

const STACK_TEMPLATE: &str = "stack.yaml";

#[derive(Debug, Serialize)]
struct TemplateResource {
    logical_id: String,
    type_name: &'static str,
    kind: String,
    depends_on: Vec<String>,
    spec: Value,
}

/// Provider type a resource kind renders to
pub fn provider_type(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::AccessGroup => "AWS::EC2::SecurityGroup",
        ResourceKind::FileSystem => "AWS::EFS::FileSystem",
        ResourceKind::AccessPoint => "AWS::EFS::AccessPoint",
        ResourceKind::SecretBundle => "AWS::SecretsManager::Secret",
        ResourceKind::LogSink => "AWS::Logs::LogGroup",
        ResourceKind::Workload => "AWS::ECS::TaskDefinition",
        ResourceKind::Service => "AWS::ECS::Service",
        ResourceKind::ScheduleRule => "AWS::Events::Rule",
    }
}

/// `dev-acme-conduktor-efs-ap` -> `DevAcmeConduktorEfsAp`
pub fn logical_id(id: &str) -> String {
    id.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

pub fn render_template(plan: &Plan) -> Result<String, PlanError> {
    let mut tera = Tera::default();
    tera.add_raw_template(STACK_TEMPLATE, include_str!("templates/stack.yaml"))
        .map_err(|e| PlanError::Render(e.to_string()))?;

    let resources = plan
        .resources
        .iter()
        .map(|resource| {
            let mut tagged = serde_json::to_value(&resource.properties)
                .map_err(|e| PlanError::Encode(e.to_string()))?;
            let spec = tagged.get_mut("spec").map(Value::take).unwrap_or(Value::Null);

            Ok(TemplateResource {
                logical_id: logical_id(&resource.id),
                type_name: provider_type(resource.kind()),
                kind: resource.kind().to_string(),
                depends_on: resource.depends_on.iter().map(|d| logical_id(d)).collect(),
                spec,
            })
        })
        .collect::<Result<Vec<_>, PlanError>>()?;

    let mut template_ctx = TeraContext::new();
    template_ctx.insert("prefix", &plan.prefix);
    template_ctx.insert("description", &format!("Console stack {}", plan.prefix));
    template_ctx.insert("resources", &resources);

    let rendered = tera
        .render(STACK_TEMPLATE, &template_ctx)
        .map_err(|e| PlanError::Render(render_error_chain(&e)))?;

    check_rendered(&rendered, plan)?;
    tracing::debug!(prefix = %plan.prefix, bytes = rendered.len(), "Template rendered");

    Ok(rendered)
}

/// Tera reports the failing expression in the error source, not the top-level message
fn render_error_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn check_rendered(rendered: &str, plan: &Plan) -> Result<(), PlanError> {
    let document: serde_yaml::Value = serde_yaml::from_str(rendered)
        .map_err(|e| PlanError::Render(format!("rendered template is not valid YAML: {e}")))?;

    let count = document
        .get("Resources")
        .and_then(|resources| resources.as_mapping())
        .map(|resources| resources.len())
        .unwrap_or(0);

    if count != plan.resources.len() {
        return Err(PlanError::Render(format!(
            "rendered template has {count} resources, plan has {}",
            plan.resources.len()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PlanBuilder;
    use crate::testing::{sample_config, sample_networks};

    fn rendered() -> serde_yaml::Value {
        let networks = sample_networks();
        let plan = PlanBuilder::new(sample_config(), &networks)
            .with_cluster("shared-cluster")
            .build()
            .unwrap();
        serde_yaml::from_str(&render_template(&plan).unwrap()).unwrap()
    }

    #[test]
    fn test_logical_id() {
        assert_eq!(logical_id("dev-acme-conduktor-efs-ap"), "DevAcmeConduktorEfsAp");
        assert_eq!(logical_id("a--b"), "AB");
    }

    #[test]
    fn test_render_task_definition() {
        let doc = rendered();
        let task = &doc["Resources"]["DevAcmeConduktorTask"];

        assert_eq!(task["Type"].as_str(), Some("AWS::ECS::TaskDefinition"));
        assert_eq!(task["Properties"]["Cpu"].as_str(), Some("1024"));

        let containers = task["Properties"]["ContainerDefinitions"].as_sequence().unwrap();
        assert_eq!(containers.len(), 3);
        assert_eq!(containers[0]["Name"].as_str(), Some("postgresql"));
        assert_eq!(
            containers[1]["DependsOn"][0]["Condition"].as_str(),
            Some("HEALTHY")
        );
        assert_eq!(
            containers[0]["HealthCheck"]["Command"][0].as_str(),
            Some("CMD-SHELL")
        );

        let ports: Vec<u64> = containers[2]["PortMappings"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|p| p["ContainerPort"].as_u64())
            .collect();
        assert_eq!(ports, vec![9090, 9010, 9009]);
    }

    #[test]
    fn test_render_access_group_and_schedule() {
        let doc = rendered();

        let ingress = doc["Resources"]["DevAcmeConduktorSg"]["Properties"]["SecurityGroupIngress"]
            .as_sequence()
            .unwrap();
        assert_eq!(ingress.len(), 12);
        assert!(ingress.iter().any(|rule| {
            rule["IpProtocol"].as_str() == Some("icmp") && rule["FromPort"].as_i64() == Some(-1)
        }));

        let stop = &doc["Resources"]["DevAcmeConduktorScheduleStop"]["Properties"];
        assert_eq!(stop["ScheduleExpression"].as_str(), Some("cron(0 2 * * ? *)"));
        assert_eq!(stop["State"].as_str(), Some("ENABLED"));
        assert_eq!(
            stop["Permission"]["Resource"].as_str(),
            Some("service/shared-cluster/dev-acme-conduktor-service")
        );
    }

    #[test]
    fn test_secret_string_holds_placeholders() {
        let doc = rendered();
        let secret = doc["Resources"]["DevAcmeConduktorSecrets"]["Properties"]["SecretString"]
            .as_str()
            .unwrap();
        let fields: serde_json::Map<String, Value> = serde_json::from_str(secret).unwrap();
        assert_eq!(fields.len(), 10);
        assert!(fields.values().all(|v| v == ""));
    }
}
