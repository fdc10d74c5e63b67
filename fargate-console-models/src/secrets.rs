//! Secret bundle records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::RemovalPolicy;

/// A named set of credential fields
///
/// Values are placeholders when declared and get filled in out-of-band after
/// deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecretBundle {
    pub name: String,
    pub fields: BTreeMap<String, String>,
    pub removal_policy: RemovalPolicy,
}

impl SecretBundle {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Reference to a field, `None` if the bundle has no such field
    pub fn field_ref(&self, field: &str) -> Option<SecretRef> {
        self.has_field(field).then(|| SecretRef {
            bundle: self.name.clone(),
            field: field.to_string(),
        })
    }
}

/// Pointer to one field of a bundle; containers hold these, never values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretRef {
    pub bundle: String,
    pub field: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_ref() {
        let bundle = SecretBundle {
            name: "dev-acme-conduktor-secrets".to_string(),
            fields: BTreeMap::from([("POSTGRES_USER".to_string(), String::new())]),
            removal_policy: RemovalPolicy::Destroy,
        };

        let reference = bundle.field_ref("POSTGRES_USER").unwrap();
        assert_eq!(reference.bundle, "dev-acme-conduktor-secrets");
        assert_eq!(reference.field, "POSTGRES_USER");
        assert!(bundle.field_ref("postgres_user").is_none());
    }
}
