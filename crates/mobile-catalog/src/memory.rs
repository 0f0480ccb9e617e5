//! In-memory catalog
//!
//! Implements every collaborator trait over plain collections. It backs the
//! server's standalone mode (seeded from a YAML snapshot) and the test suites,
//! which use the call counters and failure injection to observe how the
//! aggregator talks to its collaborators.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use futures::{StreamExt, future};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, info};

use mobile_common::{DEFAULT_NAMESPACE, MobileError, Result};

use crate::api::{
    BindingEvent, BindingEventStream, CatalogClient, MobileClientRepository, SecretsStore,
};
use crate::model::{
    ClusterServiceClass, ClusterServicePlan, MobileClient, ServiceBinding, ServiceInstance,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Collaborator operations, used to count calls and inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogOperation {
    ListServiceInstances,
    ListClusterServicePlans,
    GetClusterServiceClass,
    ListServiceBindings,
    CreateServiceBinding,
    DeleteServiceBinding,
    WatchServiceBindings,
    CreateSecret,
    ReadMobileClient,
}

/// Serializable catalog contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub service_instances: Vec<ServiceInstance>,

    #[serde(default)]
    pub cluster_service_classes: Vec<ClusterServiceClass>,

    #[serde(default)]
    pub cluster_service_plans: Vec<ClusterServicePlan>,

    #[serde(default)]
    pub service_bindings: Vec<ServiceBinding>,

    #[serde(default)]
    pub mobile_clients: Vec<MobileClient>,
}

#[derive(Default)]
struct CatalogState {
    // Vecs keep insertion order, which is the listing order
    instances: Vec<ServiceInstance>,
    classes: BTreeMap<String, ClusterServiceClass>,
    plans: Vec<ClusterServicePlan>,
    bindings: Vec<ServiceBinding>,
    mobile_clients: BTreeMap<String, MobileClient>,
    secrets: BTreeMap<(String, String), Secret>,
}

/// In-memory service catalog, secrets store and mobile client directory
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
    calls: Mutex<HashMap<CatalogOperation, usize>>,
    failures: Mutex<HashMap<CatalogOperation, String>>,
    events: broadcast::Sender<BindingEvent>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn namespace_of<K: ResourceExt>(resource: &K) -> String {
    resource
        .namespace()
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(CatalogState::default()),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let catalog = Self::new();
        for instance in snapshot.service_instances {
            catalog.add_service_instance(instance);
        }
        for class in snapshot.cluster_service_classes {
            catalog.add_cluster_service_class(class);
        }
        for plan in snapshot.cluster_service_plans {
            catalog.add_cluster_service_plan(plan);
        }
        for binding in snapshot.service_bindings {
            catalog.add_service_binding(binding);
        }
        for client in snapshot.mobile_clients {
            catalog.add_mobile_client(client);
        }
        catalog
    }

    /// Load a catalog from a YAML snapshot file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MobileError::ConfigError(format!(
                "Failed to read catalog snapshot {}: {}",
                path.display(),
                e
            ))
        })?;
        let snapshot: CatalogSnapshot = serde_yaml::from_str(&content).map_err(|e| {
            MobileError::ConfigError(format!(
                "Failed to parse catalog snapshot {}: {}",
                path.display(),
                e
            ))
        })?;

        info!(
            path = %path.display(),
            instances = snapshot.service_instances.len(),
            classes = snapshot.cluster_service_classes.len(),
            plans = snapshot.cluster_service_plans.len(),
            bindings = snapshot.service_bindings.len(),
            mobile_clients = snapshot.mobile_clients.len(),
            "Loaded catalog snapshot"
        );

        Ok(Self::from_snapshot(snapshot))
    }

    pub fn add_service_instance(&self, mut instance: ServiceInstance) {
        instance.metadata.namespace = Some(namespace_of(&instance));
        self.state.write().instances.push(instance);
    }

    pub fn add_cluster_service_class(&self, class: ClusterServiceClass) {
        self.state.write().classes.insert(class.name_any(), class);
    }

    pub fn add_cluster_service_plan(&self, plan: ClusterServicePlan) {
        self.state.write().plans.push(plan);
    }

    /// Store a binding as-is, without name checks or watch notification
    pub fn add_service_binding(&self, mut binding: ServiceBinding) {
        binding.metadata.namespace = Some(namespace_of(&binding));
        self.state.write().bindings.push(binding);
    }

    pub fn add_mobile_client(&self, client: MobileClient) {
        self.state
            .write()
            .mobile_clients
            .insert(client.name_any(), client);
    }

    pub fn service_bindings(&self, namespace: &str) -> Vec<ServiceBinding> {
        self.state
            .read()
            .bindings
            .iter()
            .filter(|b| namespace_of(*b) == namespace)
            .cloned()
            .collect()
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state
            .read()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn secret_count(&self) -> usize {
        self.state.read().secrets.len()
    }

    /// Number of calls made to the given operation so far
    pub fn call_count(&self, operation: CatalogOperation) -> usize {
        self.calls.lock().get(&operation).copied().unwrap_or(0)
    }

    /// Make the next call to `operation` fail with `message`
    pub fn fail_next(&self, operation: CatalogOperation, message: impl Into<String>) {
        self.failures.lock().insert(operation, message.into());
    }

    /// Count the call and consume an injected failure, if any
    fn enter(&self, operation: CatalogOperation) -> Result<()> {
        *self.calls.lock().entry(operation).or_insert(0) += 1;
        match self.failures.lock().remove(&operation) {
            Some(message) => Err(MobileError::Unavailable(message)),
            None => Ok(()),
        }
    }

    fn publish(&self, event: BindingEvent) {
        // No receivers just means nobody is watching
        let _ = self.events.send(event);
    }
}

#[async_trait::async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn list_service_instances(&self, namespace: &str) -> Result<Vec<ServiceInstance>> {
        self.enter(CatalogOperation::ListServiceInstances)?;
        Ok(self
            .state
            .read()
            .instances
            .iter()
            .filter(|i| namespace_of(*i) == namespace)
            .cloned()
            .collect())
    }

    async fn list_cluster_service_plans(&self) -> Result<Vec<ClusterServicePlan>> {
        self.enter(CatalogOperation::ListClusterServicePlans)?;
        Ok(self.state.read().plans.clone())
    }

    async fn get_cluster_service_class(&self, name: &str) -> Result<ClusterServiceClass> {
        self.enter(CatalogOperation::GetClusterServiceClass)?;
        self.state
            .read()
            .classes
            .get(name)
            .cloned()
            .ok_or_else(|| MobileError::not_found("ClusterServiceClass", name))
    }

    async fn list_service_bindings(&self, namespace: &str) -> Result<Vec<ServiceBinding>> {
        self.enter(CatalogOperation::ListServiceBindings)?;
        Ok(self.service_bindings(namespace))
    }

    async fn create_service_binding(
        &self,
        namespace: &str,
        binding: &ServiceBinding,
    ) -> Result<ServiceBinding> {
        self.enter(CatalogOperation::CreateServiceBinding)?;

        let name = binding
            .metadata
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                MobileError::IllegalArgument("service binding name is required".to_string())
            })?;

        let created = {
            let mut state = self.state.write();
            if state
                .bindings
                .iter()
                .any(|b| namespace_of(b) == namespace && b.name_any() == name)
            {
                return Err(MobileError::already_exists("ServiceBinding", name));
            }

            let mut created = binding.clone();
            created.metadata.namespace = Some(namespace.to_string());
            created.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
            state.bindings.push(created.clone());
            created
        };

        debug!(namespace, name = %name, "Created service binding");
        self.publish(BindingEvent::Applied(created.clone()));
        Ok(created)
    }

    async fn delete_service_binding(&self, namespace: &str, name: &str) -> Result<()> {
        self.enter(CatalogOperation::DeleteServiceBinding)?;

        let removed = {
            let mut state = self.state.write();
            let position = state
                .bindings
                .iter()
                .position(|b| namespace_of(b) == namespace && b.name_any() == name)
                .ok_or_else(|| MobileError::not_found("ServiceBinding", name))?;
            state.bindings.remove(position)
        };

        debug!(namespace, name, "Deleted service binding");
        self.publish(BindingEvent::Deleted(removed));
        Ok(())
    }

    async fn watch_service_bindings(&self, namespace: &str) -> Result<BindingEventStream> {
        self.enter(CatalogOperation::WatchServiceBindings)?;

        let namespace = namespace.to_string();
        let stream = BroadcastStream::new(self.events.subscribe())
            .filter_map(move |item| {
                future::ready(match item {
                    Ok(event) if event.namespace().as_deref() == Some(namespace.as_str()) => {
                        Some(Ok(event))
                    }
                    Ok(_) => None,
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => Some(Err(
                        MobileError::Unavailable(format!("watch lagged by {} events", skipped)),
                    )),
                })
            })
            .boxed();

        Ok(stream)
    }
}

#[async_trait::async_trait]
impl SecretsStore for InMemoryCatalog {
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret> {
        self.enter(CatalogOperation::CreateSecret)?;

        let name = secret.name_any();
        let key = (namespace.to_string(), name.clone());
        let mut state = self.state.write();
        if state.secrets.contains_key(&key) {
            return Err(MobileError::already_exists("Secret", name));
        }

        let mut created = secret.clone();
        created.metadata.namespace = Some(namespace.to_string());
        created.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
        state.secrets.insert(key, created.clone());
        Ok(created)
    }
}

#[async_trait::async_trait]
impl MobileClientRepository for InMemoryCatalog {
    async fn read_by_name(&self, name: &str) -> Result<MobileClient> {
        self.enter(CatalogOperation::ReadMobileClient)?;
        self.state
            .read()
            .mobile_clients
            .get(name)
            .cloned()
            .ok_or_else(|| MobileError::not_found("MobileClient", name))
    }
}
