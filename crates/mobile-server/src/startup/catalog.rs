//! Catalog backend selection

use std::sync::Arc;

use tracing::info;

use mobile_catalog::{
    InMemoryCatalog, KubeCatalogClient, KubeMobileClientRepository, KubeSecretsStore, connect,
};
use mobile_common::Result;
use mobile_services::BindableServiceManager;

use crate::model::config::{Configuration, ServerMode};

/// Wire the aggregator to the backend named by `mobile.mode`
pub async fn build_bindable_services(
    configuration: &Configuration,
) -> Result<Arc<BindableServiceManager>> {
    let mode = configuration.mode()?;
    let namespace = configuration.namespace();
    info!(%mode, namespace = %namespace, "Initializing catalog backend");

    let manager = match mode {
        ServerMode::Kubernetes => {
            let client = connect(configuration.in_cluster()).await?;
            BindableServiceManager::new(
                Arc::new(KubeCatalogClient::new(client.clone())),
                Arc::new(KubeMobileClientRepository::new(client.clone(), &namespace)),
                Arc::new(KubeSecretsStore::new(client)),
            )
        }
        ServerMode::Standalone => {
            let catalog = Arc::new(InMemoryCatalog::from_yaml_file(
                configuration.snapshot_file(),
            )?);
            BindableServiceManager::new(catalog.clone(), catalog.clone(), catalog)
        }
    };

    Ok(Arc::new(manager))
}
