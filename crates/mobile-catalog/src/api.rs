//! Collaborator traits
//!
//! These traits abstract away the cluster, so the bindable service logic can
//! run against Kubernetes or against the in-memory catalog.

use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use serde::Serialize;

use mobile_common::Result;

use crate::model::{
    ClusterServiceClass, ClusterServicePlan, MobileClient, ServiceBinding, ServiceInstance,
};

/// Change observed on a service binding
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
pub enum BindingEvent {
    /// Binding was created or modified
    Applied(ServiceBinding),
    /// Binding was deleted
    Deleted(ServiceBinding),
}

impl BindingEvent {
    pub fn binding(&self) -> &ServiceBinding {
        match self {
            BindingEvent::Applied(binding) | BindingEvent::Deleted(binding) => binding,
        }
    }

    pub fn namespace(&self) -> Option<String> {
        self.binding().namespace()
    }
}

/// Live stream of binding changes; dropping it closes the watch
pub type BindingEventStream = BoxStream<'static, Result<BindingEvent>>;

/// Service catalog API
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_service_instances(&self, namespace: &str) -> Result<Vec<ServiceInstance>>;

    async fn list_cluster_service_plans(&self) -> Result<Vec<ClusterServicePlan>>;

    async fn get_cluster_service_class(&self, name: &str) -> Result<ClusterServiceClass>;

    async fn list_service_bindings(&self, namespace: &str) -> Result<Vec<ServiceBinding>>;

    /// Submit a binding; returns the binding as stored by the catalog
    async fn create_service_binding(
        &self,
        namespace: &str,
        binding: &ServiceBinding,
    ) -> Result<ServiceBinding>;

    async fn delete_service_binding(&self, namespace: &str, name: &str) -> Result<()>;

    /// Open a watch on all service bindings in the namespace
    async fn watch_service_bindings(&self, namespace: &str) -> Result<BindingEventStream>;
}

/// Secret storage
#[async_trait::async_trait]
pub trait SecretsStore: Send + Sync {
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret>;
}

/// Mobile client directory
#[async_trait::async_trait]
pub trait MobileClientRepository: Send + Sync {
    async fn read_by_name(&self, name: &str) -> Result<MobileClient>;
}
