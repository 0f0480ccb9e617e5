//! Mobile Catalog - service catalog access for mobile services
//!
//! This crate provides:
//! - Service catalog and mobile client resource types
//! - Collaborator traits (`CatalogClient`, `SecretsStore`, `MobileClientRepository`)
//! - Kubernetes backed implementations
//! - An in-memory implementation for standalone mode and tests

pub mod api;
pub mod kubernetes;
pub mod memory;
pub mod model;

// Re-export key types
pub use api::{
    BindingEvent, BindingEventStream, CatalogClient, MobileClientRepository, SecretsStore,
};
pub use kubernetes::{KubeCatalogClient, KubeMobileClientRepository, KubeSecretsStore, connect};
pub use memory::{CatalogOperation, CatalogSnapshot, InMemoryCatalog};
pub use model::{
    ClusterServiceClass, ClusterServiceClassSpec, ClusterServicePlan, ClusterServicePlanSpec,
    MobileClient, MobileClientSpec, ServiceBinding, ServiceBindingSpec, ServiceBindingStatus,
    ServiceInstance, ServiceInstanceSpec,
};
