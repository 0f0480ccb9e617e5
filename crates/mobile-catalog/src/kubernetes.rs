//! Kubernetes backed collaborators
//!
//! Thin adapters from the collaborator traits onto `kube::Api`. Errors from
//! the API server are returned untouched.

use futures::{StreamExt, TryStreamExt, future};
use k8s_openapi::api::core::v1::Secret;
use kube::{
    Api, Client, Config,
    api::{DeleteParams, ListParams, PostParams, WatchEvent, WatchParams},
};
use tracing::{debug, info};

use mobile_common::{MobileError, Result};

use crate::api::{
    BindingEvent, BindingEventStream, CatalogClient, MobileClientRepository, SecretsStore,
};
use crate::model::{
    ClusterServiceClass, ClusterServicePlan, MobileClient, ServiceBinding, ServiceInstance,
};

/// Build a Kubernetes client
///
/// Uses the in-cluster service account when `in_cluster` is set, otherwise
/// infers the configuration from the environment (kubeconfig).
pub async fn connect(in_cluster: bool) -> Result<Client> {
    let config = if in_cluster {
        Config::incluster().map_err(|e| {
            MobileError::ConfigError(format!("Failed to get in-cluster config: {}", e))
        })?
    } else {
        Config::infer()
            .await
            .map_err(|e| MobileError::ConfigError(format!("Failed to load kubeconfig: {}", e)))?
    };

    info!(cluster_url = %config.cluster_url, in_cluster, "Connecting to Kubernetes");

    Ok(Client::try_from(config)?)
}

/// Service catalog client over the `servicecatalog.k8s.io` API group
#[derive(Clone)]
pub struct KubeCatalogClient {
    client: Client,
}

impl KubeCatalogClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn bindings(&self, namespace: &str) -> Api<ServiceBinding> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl CatalogClient for KubeCatalogClient {
    async fn list_service_instances(&self, namespace: &str) -> Result<Vec<ServiceInstance>> {
        let api: Api<ServiceInstance> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        debug!(namespace, count = list.items.len(), "Listed service instances");
        Ok(list.items)
    }

    async fn list_cluster_service_plans(&self) -> Result<Vec<ClusterServicePlan>> {
        let api: Api<ClusterServicePlan> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        debug!(count = list.items.len(), "Listed cluster service plans");
        Ok(list.items)
    }

    async fn get_cluster_service_class(&self, name: &str) -> Result<ClusterServiceClass> {
        let api: Api<ClusterServiceClass> = Api::all(self.client.clone());
        Ok(api.get(name).await?)
    }

    async fn list_service_bindings(&self, namespace: &str) -> Result<Vec<ServiceBinding>> {
        let list = self.bindings(namespace).list(&ListParams::default()).await?;
        debug!(namespace, count = list.items.len(), "Listed service bindings");
        Ok(list.items)
    }

    async fn create_service_binding(
        &self,
        namespace: &str,
        binding: &ServiceBinding,
    ) -> Result<ServiceBinding> {
        Ok(self
            .bindings(namespace)
            .create(&PostParams::default(), binding)
            .await?)
    }

    async fn delete_service_binding(&self, namespace: &str, name: &str) -> Result<()> {
        self.bindings(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn watch_service_bindings(&self, namespace: &str) -> Result<BindingEventStream> {
        debug!(namespace, "Opening service binding watch");

        let stream = self
            .bindings(namespace)
            .watch(&WatchParams::default(), "0")
            .await?
            .map_err(MobileError::from)
            .try_filter_map(|event| future::ready(binding_event(event)))
            .boxed();

        Ok(stream)
    }
}

/// Map a raw watch event; an `ERROR` event from the API server becomes an error item
fn binding_event(event: WatchEvent<ServiceBinding>) -> Result<Option<BindingEvent>> {
    match event {
        WatchEvent::Added(binding) | WatchEvent::Modified(binding) => {
            Ok(Some(BindingEvent::Applied(binding)))
        }
        WatchEvent::Deleted(binding) => Ok(Some(BindingEvent::Deleted(binding))),
        WatchEvent::Bookmark(_) => Ok(None),
        WatchEvent::Error(response) => Err(MobileError::Kube(kube::Error::Api(response))),
    }
}

/// Secrets store over core/v1 secrets
#[derive(Clone)]
pub struct KubeSecretsStore {
    client: Client,
}

impl KubeSecretsStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SecretsStore for KubeSecretsStore {
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.create(&PostParams::default(), secret).await?)
    }
}

/// Mobile client directory bound to one namespace
#[derive(Clone)]
pub struct KubeMobileClientRepository {
    api: Api<MobileClient>,
}

impl KubeMobileClientRepository {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait::async_trait]
impl MobileClientRepository for KubeMobileClientRepository {
    async fn read_by_name(&self, name: &str) -> Result<MobileClient> {
        Ok(self.api.get(name).await?)
    }
}
