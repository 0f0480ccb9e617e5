use serde::{Deserialize, Serialize};

use mobile_common::{DEFAULT_NAMESPACE, impl_or_default};

/// `?namespace=` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct NamespaceParam {
    pub namespace: Option<String>,
}

impl NamespaceParam {
    impl_or_default!(pub, namespace_or_default, namespace, DEFAULT_NAMESPACE);
}

/// Line sent on a watch stream when the underlying watch reports an error
#[derive(Debug, Serialize)]
pub struct WatchError {
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub message: String,
}

impl WatchError {
    pub fn new(message: String) -> Self {
        Self {
            type_: "ERROR",
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: String,
    pub mode: String,
    pub namespace: String,
}
