//! Parameters secret written next to a new service binding

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use serde_json::{Map, Value};

use mobile_catalog::ServiceBinding;
use mobile_common::{PARAMETERS_SECRET_KEY, Result};

pub const OPAQUE_SECRET_TYPE: &str = "Opaque";

/// Secret holding the form data a binding was created from
///
/// Submitted as a core/v1 `Secret`, so it always serializes with
/// `apiVersion: v1`. The service catalog group only appears on the owner
/// reference back to the binding.
#[derive(Debug, Clone, PartialEq)]
pub struct ParametersSecret {
    pub name: String,
    pub owner: OwnerReference,
    pub secret_type: String,
    /// JSON encoded form data
    pub parameters: String,
}

impl ParametersSecret {
    /// Build the secret for `created`, the binding as returned by the catalog.
    ///
    /// Garbage collection through the owner reference stays disabled: with
    /// `blockOwnerDeletion` set the catalog API refuses the secret (403).
    pub fn new(name: &str, created: &ServiceBinding, form_data: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            owner: OwnerReference {
                api_version: ServiceBinding::api_version(&()).to_string(),
                kind: ServiceBinding::kind(&()).to_string(),
                name: created.name_any(),
                uid: created.metadata.uid.clone().unwrap_or_default(),
                controller: Some(false),
                block_owner_deletion: Some(false),
            },
            secret_type: OPAQUE_SECRET_TYPE.to_string(),
            parameters: serde_json::to_string(form_data)?,
        })
    }

    /// Core/v1 secret to submit to the secrets store
    pub fn to_secret(&self) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                owner_references: Some(vec![self.owner.clone()]),
                ..Default::default()
            },
            type_: Some(self.secret_type.clone()),
            string_data: Some(BTreeMap::from([(
                PARAMETERS_SECRET_KEY.to_string(),
                self.parameters.clone(),
            )])),
            ..Default::default()
        }
    }
}
