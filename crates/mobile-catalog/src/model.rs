//! Service catalog and mobile client resource types
//!
//! The service catalog resources live in `servicecatalog.k8s.io/v1beta1`;
//! mobile clients live in `mobile.k8s.io/v1alpha1`. Only the fields the
//! mobile services read or write are modelled, everything else is ignored
//! on deserialization.

use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mobile_common::CONSUMER_ANNOTATION;

/// Condition type reported once a catalog resource is usable
pub const CONDITION_READY: &str = "Ready";

/// Reference to a cluster-scoped catalog object
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterObjectReference {
    pub name: String,
}

/// Reference to an object in the same namespace
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalObjectReference {
    pub name: String,
}

/// Status of a catalog condition
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

/// Condition reported on service instances and service bindings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCondition {
    #[serde(rename = "type")]
    pub type_: String,

    pub status: ConditionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// ServiceInstance
// =============================================================================

/// A provisioned instance of a catalog offering.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ServiceInstance",
    namespaced,
    status = "ServiceInstanceStatus",
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_class_external_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_plan_external_name: Option<String>,

    /// Resolved class; set by the catalog controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_class_ref: Option<ClusterObjectReference>,

    /// Resolved plan; set by the catalog controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_plan_ref: Option<ClusterObjectReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceStatus {
    #[serde(default)]
    pub conditions: Vec<CatalogCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provision_status: Option<String>,
}

impl ServiceInstance {
    /// Name of the cluster service class this instance was provisioned from
    pub fn class_ref_name(&self) -> Option<&str> {
        self.spec
            .cluster_service_class_ref
            .as_ref()
            .map(|r| r.name.as_str())
    }
}

// =============================================================================
// ClusterServiceClass
// =============================================================================

/// A catalog offering.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ClusterServiceClass",
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceClassSpec {
    #[serde(default)]
    pub cluster_service_broker_name: String,

    #[serde(default)]
    pub external_name: String,

    #[serde(default)]
    pub external_id: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub bindable: bool,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Broker supplied metadata (display name, image, icon class)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_metadata: Option<Value>,
}

impl ClusterServiceClass {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.spec.tags.iter().any(|t| t == tag)
    }
}

// =============================================================================
// ClusterServicePlan
// =============================================================================

/// A plan belonging to a cluster service class.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ClusterServicePlan",
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServicePlanSpec {
    #[serde(default)]
    pub cluster_service_broker_name: String,

    #[serde(default)]
    pub external_name: String,

    #[serde(default)]
    pub external_id: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub free: bool,

    pub cluster_service_class_ref: ClusterObjectReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_metadata: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_create_parameter_schema: Option<Value>,

    /// JSON schema of the form a binding is created from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_binding_create_parameter_schema: Option<Value>,
}

// =============================================================================
// ServiceBinding
// =============================================================================

/// Secret key holding binding parameters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretKeyReference {
    pub name: String,
    pub key: String,
}

/// Source of binding parameters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParametersFromSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeyReference>,
}

/// A binding of a consumer to a service instance.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ServiceBinding",
    namespaced,
    status = "ServiceBindingStatus",
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingSpec {
    pub instance_ref: LocalObjectReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_from: Vec<ParametersFromSource>,

    /// Secret the broker writes credentials into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingStatus {
    #[serde(default)]
    pub conditions: Vec<CatalogCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_op_in_progress: Option<bool>,
}

impl ServiceBinding {
    /// True when the Ready condition is in the True state
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|status| {
            status
                .conditions
                .iter()
                .any(|c| c.type_ == CONDITION_READY && c.status == ConditionStatus::True)
        })
    }

    /// Mobile client consuming this binding
    pub fn consumer(&self) -> Option<&str> {
        self.annotations()
            .get(CONSUMER_ANNOTATION)
            .map(String::as_str)
    }

    /// Secret named by the first parametersFrom entry
    pub fn parameters_secret_name(&self) -> Option<&str> {
        self.spec
            .parameters_from
            .first()
            .and_then(|source| source.secret_key_ref.as_ref())
            .map(|r| r.name.as_str())
    }
}

// =============================================================================
// MobileClient
// =============================================================================

/// A mobile application identity.
///
/// Annotations keyed `org.aerogear.binding.<instance>...` carry the
/// configuration each bound service exposes to the app.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "mobile.k8s.io",
    version = "v1alpha1",
    kind = "MobileClient",
    namespaced,
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct MobileClientSpec {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub client_type: String,

    #[serde(default)]
    pub app_identifier: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub dm_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding_with_conditions(conditions: Vec<CatalogCondition>) -> ServiceBinding {
        let mut binding = ServiceBinding::new(
            "sync-binding",
            ServiceBindingSpec {
                instance_ref: LocalObjectReference {
                    name: "sync".to_string(),
                },
                ..Default::default()
            },
        );
        binding.status = Some(ServiceBindingStatus {
            conditions,
            async_op_in_progress: None,
        });
        binding
    }

    #[test]
    fn test_binding_ready_requires_true_ready_condition() {
        let ready = binding_with_conditions(vec![CatalogCondition {
            type_: CONDITION_READY.to_string(),
            status: ConditionStatus::True,
            ..Default::default()
        }]);
        assert!(ready.is_ready());

        let not_ready = binding_with_conditions(vec![CatalogCondition {
            type_: CONDITION_READY.to_string(),
            status: ConditionStatus::False,
            ..Default::default()
        }]);
        assert!(!not_ready.is_ready());

        let other = binding_with_conditions(vec![CatalogCondition {
            type_: "Failed".to_string(),
            status: ConditionStatus::True,
            ..Default::default()
        }]);
        assert!(!other.is_ready());

        let mut no_status = ready.clone();
        no_status.status = None;
        assert!(!no_status.is_ready());
    }

    #[test]
    fn test_binding_deserializes_from_catalog_json() {
        let binding: ServiceBinding = serde_json::from_value(serde_json::json!({
            "apiVersion": "servicecatalog.k8s.io/v1beta1",
            "kind": "ServiceBinding",
            "metadata": {
                "name": "keycloak-x1",
                "namespace": "myproject",
                "annotations": { "binding.aerogear.org/consumer": "myapp" }
            },
            "spec": {
                "instanceRef": { "name": "keycloak" },
                "secretName": "keycloak-credentials-x1",
                "parametersFrom": [
                    { "secretKeyRef": { "name": "keycloak-bind-parameters-x1", "key": "parameters" } }
                ]
            },
            "status": {
                "conditions": [ { "type": "Ready", "status": "True" } ]
            }
        }))
        .unwrap();

        assert_eq!(binding.consumer(), Some("myapp"));
        assert_eq!(
            binding.parameters_secret_name(),
            Some("keycloak-bind-parameters-x1")
        );
        assert_eq!(binding.spec.instance_ref.name, "keycloak");
        assert!(binding.is_ready());
    }

    #[test]
    fn test_class_tags() {
        let class = ClusterServiceClass::new(
            "class-1",
            ClusterServiceClassSpec {
                tags: vec!["sync".to_string(), "mobile-client-enabled".to_string()],
                ..Default::default()
            },
        );
        assert!(class.has_tag("mobile-client-enabled"));
        assert!(!class.has_tag("mobile"));
    }

    #[test]
    fn test_instance_class_ref() {
        let mut instance = ServiceInstance::new("sync", ServiceInstanceSpec::default());
        assert_eq!(instance.class_ref_name(), None);
        instance.spec.cluster_service_class_ref = Some(ClusterObjectReference {
            name: "class-1".to_string(),
        });
        assert_eq!(instance.class_ref_name(), Some("class-1"));
    }
}
