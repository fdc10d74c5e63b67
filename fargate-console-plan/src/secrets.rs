//! Secret bundle declaration and field references

use std::collections::BTreeMap;

use fargate_console_models::{RemovalPolicy, SecretBundle, SecretRef};

use crate::error::PlanError;
use crate::names::ResourceNames;

/// Secret field names
pub mod fields {
    pub const POSTGRES_USER: &str = "POSTGRES_USER";
    pub const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
    pub const POSTGRES_DB: &str = "POSTGRES_DB";
    pub const POSTGRES_PORT: &str = "POSTGRES_PORT";
    pub const CDK_ADMIN_EMAIL: &str = "CDK_ADMIN_EMAIL";
    pub const CDK_ADMIN_PASSWORD: &str = "CDK_ADMIN_PASSWORD";
    pub const CDK_DATABASE_NAME: &str = "CDK_DATABASE_NAME";
    pub const CDK_DATABASE_PASSWORD: &str = "CDK_DATABASE_PASSWORD";
    pub const CDK_DATABASE_PORT: &str = "CDK_DATABASE_PORT";
    pub const CDK_DATABASE_USERNAME: &str = "CDK_DATABASE_USERNAME";

    pub const ALL: [&str; 10] = [
        POSTGRES_USER,
        POSTGRES_PASSWORD,
        POSTGRES_DB,
        POSTGRES_PORT,
        CDK_ADMIN_EMAIL,
        CDK_ADMIN_PASSWORD,
        CDK_DATABASE_NAME,
        CDK_DATABASE_PASSWORD,
        CDK_DATABASE_PORT,
        CDK_DATABASE_USERNAME,
    ];
}

/// Declare the bundle with blank placeholders; real values are set after deploy
pub fn secret_bundle(names: &ResourceNames, stack_removal: RemovalPolicy) -> SecretBundle {
    SecretBundle {
        name: names.secret_bundle(),
        fields: fields::ALL
            .iter()
            .map(|field| (field.to_string(), String::new()))
            .collect(),
        removal_policy: stack_removal,
    }
}

/// Resolve `(env var, field)` pairs into references for one container
pub fn resolve_refs(
    bundle: &SecretBundle,
    container: &str,
    wanted: &[(&str, &str)],
) -> Result<BTreeMap<String, SecretRef>, PlanError> {
    wanted
        .iter()
        .map(|(env, field)| {
            let reference = bundle
                .field_ref(field)
                .ok_or_else(|| PlanError::UnknownSecretField {
                    container: container.to_string(),
                    bundle: bundle.name.clone(),
                    field: field.to_string(),
                })?;
            Ok((env.to_string(), reference))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_names as names;

    #[test]
    fn test_bundle_has_placeholder_fields() {
        let bundle = secret_bundle(&names(), RemovalPolicy::Destroy);
        assert_eq!(bundle.name, "dev-acme-conduktor-secrets");
        assert_eq!(bundle.fields.len(), 10);
        assert!(bundle.fields.values().all(String::is_empty));
        for field in fields::ALL {
            assert!(bundle.has_field(field), "{field}");
        }
    }

    #[test]
    fn test_bundle_follows_stack_removal() {
        assert!(secret_bundle(&names(), RemovalPolicy::Destroy)
            .removal_policy
            .is_destructive());
        assert_eq!(
            secret_bundle(&names(), RemovalPolicy::Retain).removal_policy,
            RemovalPolicy::Retain
        );
    }

    #[test]
    fn test_unknown_field_is_plan_error() {
        let bundle = secret_bundle(&names(), RemovalPolicy::Destroy);
        let err = resolve_refs(&bundle, "postgresql", &[("PGPASSWORD", "POSTGRES_PASS")])
            .unwrap_err();
        assert!(matches!(
            err,
            PlanError::UnknownSecretField { ref field, .. } if field == "POSTGRES_PASS"
        ));
    }

    #[test]
    fn test_resolve_keeps_env_names() {
        let bundle = secret_bundle(&names(), RemovalPolicy::Destroy);
        let refs = resolve_refs(
            &bundle,
            "conduktor-console",
            &[("CDK_DATABASE_USERNAME", fields::POSTGRES_USER)],
        )
        .unwrap();
        assert_eq!(refs["CDK_DATABASE_USERNAME"].field, "POSTGRES_USER");
    }
}
