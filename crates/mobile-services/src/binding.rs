//! Binding requests submitted from the mobile console
//!
//! A request names the service instance to bind and carries the form the user
//! filled in from the plan's binding schema. It is turned into a catalog
//! `ServiceBinding` whose parameters come from a secret the aggregator writes
//! right after the binding is accepted.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use mobile_catalog::model::{LocalObjectReference, ParametersFromSource, SecretKeyReference};
use mobile_catalog::{ServiceBinding, ServiceBindingSpec};
use mobile_common::{
    CONSUMER_ANNOTATION, DEFAULT_NAMESPACE, MobileError, PARAMETERS_SECRET_KEY,
    PROVIDER_ANNOTATION, Result, impl_or_default,
};

const NAME_SUFFIX_LEN: usize = 5;

/// Fields that must be present together or not at all, with the message shown otherwise
const PAIRED_FIELDS: &[(&str, &str, &str)] = &[
    (
        "googlekey",
        "projectNumber",
        "FCM requires a Key field and Project Number.",
    ),
    ("cert", "passphrase", "APNS requires a certificate and passphrase."),
];

/// Fields that may be omitted but must not be blank when given
const NON_BLANK_FIELDS: &[&str] = &["CLIENT_ID", "CLIENT_TYPE"];

/// Request to bind a mobile client to a service instance
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRequest {
    #[serde(default)]
    pub namespace: Option<String>,

    pub service_instance_name: String,

    /// Secret the broker writes credentials into; generated when omitted
    #[serde(default)]
    pub credential_secret_name: Option<String>,

    /// Secret holding the form data; generated when omitted
    #[serde(default)]
    pub parameters_secret_name: Option<String>,

    #[serde(default)]
    pub form_data: Map<String, Value>,
}

impl BindingRequest {
    impl_or_default!(pub, namespace_or_default, namespace, DEFAULT_NAMESPACE);

    pub fn validate(&self) -> Result<()> {
        if self.service_instance_name.trim().is_empty() {
            return Err(MobileError::IllegalArgument(
                "serviceInstanceName is required".to_string(),
            ));
        }
        validate_form_data(&self.form_data)
    }

    /// Catalog binding of `mobile_client` to the requested instance
    pub fn to_service_binding(&self, mobile_client: &str) -> ServiceBinding {
        let instance = self.service_instance_name.as_str();
        let credential_secret = self
            .credential_secret_name
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| generate_name(&format!("{}-credentials-", instance)));
        let parameters_secret = self
            .parameters_secret_name
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| generate_name(&format!("{}-bind-parameters-", instance)));

        let mut binding = ServiceBinding::new(
            &generate_name(&format!("{}-", instance)),
            ServiceBindingSpec {
                instance_ref: LocalObjectReference {
                    name: instance.to_string(),
                },
                parameters: None,
                parameters_from: vec![ParametersFromSource {
                    secret_key_ref: Some(SecretKeyReference {
                        name: parameters_secret,
                        key: PARAMETERS_SECRET_KEY.to_string(),
                    }),
                }],
                secret_name: Some(credential_secret),
            },
        );
        binding.metadata.namespace = Some(self.namespace_or_default().to_string());
        binding.metadata.annotations = Some(BTreeMap::from([
            (CONSUMER_ANNOTATION.to_string(), mobile_client.to_string()),
            (PROVIDER_ANNOTATION.to_string(), instance.to_string()),
        ]));
        binding
    }
}

/// `prefix` followed by a short random lowercase suffix
pub fn generate_name(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix.to_lowercase(), &suffix[..NAME_SUFFIX_LEN])
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Check the binding form for the push and identity services' rules.
///
/// All problems are reported together in one error.
pub fn validate_form_data(form_data: &Map<String, Value>) -> Result<()> {
    let mut problems = Vec::new();

    for field in NON_BLANK_FIELDS {
        if form_data.contains_key(*field) && is_blank(form_data.get(*field)) {
            problems.push(format!("{} is a required field.", field));
        }
    }

    for (first, second, message) in PAIRED_FIELDS {
        if is_blank(form_data.get(*first)) != is_blank(form_data.get(*second)) {
            problems.push(message.to_string());
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(MobileError::IllegalArgument(problems.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use kube::ResourceExt;
    use serde_json::json;

    use super::*;

    fn form(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_generate_name() {
        let name = generate_name("Keycloak-Credentials-");
        assert!(name.starts_with("keycloak-credentials-"));
        assert_eq!(name.len(), "keycloak-credentials-".len() + NAME_SUFFIX_LEN);
        assert_ne!(generate_name("a-"), generate_name("a-"));
    }

    #[test]
    fn test_binding_from_request() {
        let request = BindingRequest {
            namespace: Some("myproject".to_string()),
            service_instance_name: "keycloak".to_string(),
            credential_secret_name: Some("keycloak-credentials-abc".to_string()),
            parameters_secret_name: Some("keycloak-bind-parameters-abc".to_string()),
            form_data: form(json!({"CLIENT_ID": "myapp", "CLIENT_TYPE": "public"})),
        };

        let binding = request.to_service_binding("myapp");
        assert!(binding.name_any().starts_with("keycloak-"));
        assert_eq!(binding.namespace().as_deref(), Some("myproject"));
        assert_eq!(binding.consumer(), Some("myapp"));
        assert_eq!(
            binding.annotations().get(PROVIDER_ANNOTATION).map(String::as_str),
            Some("keycloak")
        );
        assert_eq!(binding.spec.instance_ref.name, "keycloak");
        assert_eq!(
            binding.spec.secret_name.as_deref(),
            Some("keycloak-credentials-abc")
        );
        assert_eq!(
            binding.parameters_secret_name(),
            Some("keycloak-bind-parameters-abc")
        );
        assert_eq!(
            binding.spec.parameters_from[0]
                .secret_key_ref
                .as_ref()
                .map(|r| r.key.as_str()),
            Some("parameters")
        );
    }

    #[test]
    fn test_binding_generates_missing_secret_names() {
        let request = BindingRequest {
            service_instance_name: "ups".to_string(),
            ..Default::default()
        };

        let binding = request.to_service_binding("myapp");
        assert_eq!(binding.namespace().as_deref(), Some("default"));
        assert!(
            binding
                .spec
                .secret_name
                .as_deref()
                .unwrap()
                .starts_with("ups-credentials-")
        );
        assert!(
            binding
                .parameters_secret_name()
                .unwrap()
                .starts_with("ups-bind-parameters-")
        );
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: BindingRequest = serde_json::from_value(json!({
            "serviceInstanceName": "ups",
            "formData": {"googlekey": "k", "projectNumber": "1"}
        }))
        .unwrap();
        assert_eq!(request.service_instance_name, "ups");
        assert_eq!(request.form_data.len(), 2);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_requires_instance_name() {
        let request = BindingRequest::default();
        assert!(matches!(
            request.validate(),
            Err(MobileError::IllegalArgument(_))
        ));
    }

    #[test]
    fn test_form_data_rules() {
        assert!(validate_form_data(&Map::new()).is_ok());
        assert!(validate_form_data(&form(json!({"CLIENT_ID": "a", "CLIENT_TYPE": "b"}))).is_ok());
        assert!(validate_form_data(&form(json!({"cert": "c", "passphrase": "p"}))).is_ok());
        assert!(
            validate_form_data(&form(json!({"googlekey": "k", "projectNumber": 123}))).is_ok()
        );

        let err = validate_form_data(&form(json!({"CLIENT_ID": ""}))).unwrap_err();
        assert_eq!(err.to_string(), "caused: CLIENT_ID is a required field.");

        let err = validate_form_data(&form(json!({"googlekey": "k"}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "caused: FCM requires a Key field and Project Number."
        );

        let err =
            validate_form_data(&form(json!({"passphrase": "p", "CLIENT_TYPE": null}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "caused: CLIENT_TYPE is a required field. APNS requires a certificate and passphrase."
        );
    }
}
