//! Display fields derived from a service class's external metadata

use kube::ResourceExt;
use serde::Deserialize;

use mobile_catalog::ClusterServiceClass;
use mobile_common::{DEFAULT_SERVICE_IMAGE_URL, MobileError, Result};

/// The part of a broker's external metadata the mobile views use
#[derive(Debug, Deserialize)]
struct ExternalMetadata {
    #[serde(rename = "displayName")]
    display_name: String,

    #[serde(rename = "imageUrl", default)]
    image_url: Option<String>,

    #[serde(rename = "console.openshift.io/iconClass", default)]
    icon_class: Option<String>,
}

/// Name and artwork shown for a bindable service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDisplay {
    pub name: String,
    pub image_url: String,
    pub icon_class: String,
}

/// Decode the display fields of a class.
///
/// `imageUrl` takes precedence over the icon class; when neither is set the
/// default image is used. A class without metadata yields empty fields.
pub fn service_display(class: &ClusterServiceClass) -> Result<ServiceDisplay> {
    let Some(raw) = class.spec.external_metadata.as_ref() else {
        return Ok(ServiceDisplay::default());
    };

    let metadata =
        ExternalMetadata::deserialize(raw).map_err(|e| MobileError::InvalidMetadata {
            class: class.name_any(),
            reason: e.to_string(),
        })?;

    let mut display = ServiceDisplay {
        name: metadata.display_name,
        ..Default::default()
    };

    match (metadata.image_url, metadata.icon_class) {
        (Some(image_url), _) => display.image_url = image_url,
        (None, Some(icon_class)) => display.icon_class = icon_class,
        (None, None) => display.image_url = DEFAULT_SERVICE_IMAGE_URL.to_string(),
    }

    Ok(display)
}

#[cfg(test)]
mod tests {
    use mobile_catalog::ClusterServiceClassSpec;
    use serde_json::json;

    use super::*;

    fn class_with(metadata: Option<serde_json::Value>) -> ClusterServiceClass {
        ClusterServiceClass::new(
            "keycloak-class",
            ClusterServiceClassSpec {
                external_metadata: metadata,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_image_url() {
        let display =
            service_display(&class_with(Some(json!({"displayName": "X", "imageUrl": "U"}))))
                .unwrap();
        assert_eq!(display.name, "X");
        assert_eq!(display.image_url, "U");
        assert_eq!(display.icon_class, "");
    }

    #[test]
    fn test_icon_class_without_image() {
        let display = service_display(&class_with(Some(
            json!({"displayName": "X", "console.openshift.io/iconClass": "C"}),
        )))
        .unwrap();
        assert_eq!(display.name, "X");
        assert_eq!(display.image_url, "");
        assert_eq!(display.icon_class, "C");
    }

    #[test]
    fn test_image_url_wins_over_icon_class() {
        let display = service_display(&class_with(Some(json!({
            "displayName": "X",
            "imageUrl": "U",
            "console.openshift.io/iconClass": "C"
        }))))
        .unwrap();
        assert_eq!(display.image_url, "U");
        assert_eq!(display.icon_class, "");
    }

    #[test]
    fn test_default_image_when_neither_is_set() {
        let display =
            service_display(&class_with(Some(json!({"displayName": "X"})))).unwrap();
        assert_eq!(display.image_url, DEFAULT_SERVICE_IMAGE_URL);
        assert_eq!(display.icon_class, "");
    }

    #[test]
    fn test_null_image_counts_as_absent() {
        let display = service_display(&class_with(Some(
            json!({"displayName": "X", "imageUrl": null, "console.openshift.io/iconClass": "C"}),
        )))
        .unwrap();
        assert_eq!(display.icon_class, "C");
    }

    #[test]
    fn test_no_metadata_leaves_fields_empty() {
        assert_eq!(
            service_display(&class_with(None)).unwrap(),
            ServiceDisplay::default()
        );
    }

    #[test]
    fn test_malformed_metadata_is_an_error() {
        for metadata in [
            json!({"imageUrl": "U"}),
            json!({"displayName": 42}),
            json!({"displayName": "X", "imageUrl": ["U"]}),
            json!("not an object"),
        ] {
            let err = service_display(&class_with(Some(metadata))).unwrap_err();
            match err {
                MobileError::InvalidMetadata { class, .. } => assert_eq!(class, "keycloak-class"),
                other => panic!("unexpected error {:?}", other),
            }
        }
    }
}
