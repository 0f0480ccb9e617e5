//! Bindable mobile services
//!
//! A bindable mobile service is a service instance whose class is tagged
//! `mobile-client-enabled`, joined with its class, its plan and the binding
//! (if any) a given mobile client holds on it. Views are built fresh on
//! every `list` call.
//!
//! Joins keep the source data's "last match wins" behaviour: when several
//! plans reference the same class, or a client holds several bindings on the
//! same instance, the last one listed is attached.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use kube::ResourceExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use mobile_catalog::{
    BindingEventStream, CatalogClient, ClusterServiceClass, ClusterServicePlan, MobileClient,
    MobileClientRepository, SecretsStore, ServiceBinding, ServiceInstance,
};
use mobile_common::{
    MOBILE_CLIENT_ENABLED_TAG, MobileError, Result, binding_config_annotation,
};

use crate::metadata::service_display;
use crate::secret::ParametersSecret;

/// Denormalized view of one service instance for one mobile client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindableMobileService {
    pub service_instance: ServiceInstance,
    pub service_class: ClusterServiceClass,
    pub service_plan: Option<ClusterServicePlan>,
    pub service_binding: Option<ServiceBinding>,
    pub mobile_client: Option<MobileClient>,
    pub name: String,
    pub image_url: String,
    pub icon_class: String,
    pub is_bound: bool,
    /// Configuration payloads the mobile client carries for this instance
    pub configuration: Vec<String>,
}

/// Opens a binding watch when called
pub type WatchFactory = Box<dyn Fn() -> BoxFuture<'static, Result<BindingEventStream>> + Send + Sync>;

/// Last plan belonging to `class`
fn match_service_plan(plans: &[ClusterServicePlan], class: &ClusterServiceClass) -> Option<ClusterServicePlan> {
    let class_name = class.name_any();
    plans
        .iter()
        .rfind(|plan| plan.spec.cluster_service_class_ref.name == class_name)
        .cloned()
}

/// Aggregates the catalog into bindable mobile services
pub struct BindableServiceManager {
    catalog: Arc<dyn CatalogClient>,
    mobile_clients: Arc<dyn MobileClientRepository>,
    secrets: Arc<dyn SecretsStore>,
}

impl BindableServiceManager {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        mobile_clients: Arc<dyn MobileClientRepository>,
        secrets: Arc<dyn SecretsStore>,
    ) -> Self {
        Self {
            catalog,
            mobile_clients,
            secrets,
        }
    }

    /// List the bindable services in `namespace` as seen by `mobile_client_name`.
    ///
    /// Any failure aborts the whole listing; no partial result is returned.
    pub async fn list(
        &self,
        namespace: &str,
        mobile_client_name: &str,
    ) -> Result<Vec<BindableMobileService>> {
        let instances = self
            .catalog
            .list_service_instances(namespace)
            .await
            .inspect_err(|e| warn!(namespace, error = %e, "Failed to list service instances"))?;

        let plans = self
            .catalog
            .list_cluster_service_plans()
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to list cluster service plans"))?;

        let mut services = Vec::new();

        for instance in instances {
            let instance_name = instance.name_any();
            let class_name = instance.class_ref_name().ok_or_else(|| {
                MobileError::InvalidResource(format!(
                    "service instance '{}' has no clusterServiceClassRef",
                    instance_name
                ))
            })?;

            let class = self
                .catalog
                .get_cluster_service_class(class_name)
                .await
                .inspect_err(|e| {
                    warn!(instance = %instance_name, class = class_name, error = %e, "Failed to get service class")
                })?;

            if !class.has_tag(MOBILE_CLIENT_ENABLED_TAG) {
                debug!(instance = %instance_name, class = class_name, "Skipping service without mobile client tag");
                continue;
            }

            let display = service_display(&class)?;
            let service_plan = match_service_plan(&plans, &class);

            let mut service = BindableMobileService {
                service_instance: instance,
                service_class: class,
                service_plan,
                service_binding: None,
                mobile_client: None,
                name: display.name,
                image_url: display.image_url,
                icon_class: display.icon_class,
                is_bound: false,
                configuration: Vec::new(),
            };

            self.attach_current_binding(namespace, mobile_client_name, &mut service)
                .await?;

            debug!(
                instance = %instance_name,
                bound = service.is_bound,
                configuration = service.configuration.len(),
                "Resolved bindable service"
            );
            services.push(service);
        }

        Ok(services)
    }

    async fn attach_current_binding(
        &self,
        namespace: &str,
        mobile_client_name: &str,
        service: &mut BindableMobileService,
    ) -> Result<()> {
        let bindings = self.catalog.list_service_bindings(namespace).await?;
        let instance_name = service.service_instance.name_any();
        let config_key = binding_config_annotation(&instance_name);

        for binding in bindings {
            if binding.spec.instance_ref.name != instance_name
                || binding.consumer().unwrap_or_default() != mobile_client_name
            {
                continue;
            }

            if binding.is_ready() {
                service.is_bound = true;
            }

            let client = self.mobile_clients.read_by_name(mobile_client_name).await?;

            // Annotations are a sorted map, so payloads come out in key order
            service.configuration.extend(
                client
                    .annotations()
                    .iter()
                    .filter(|(key, _)| key.contains(&config_key))
                    .map(|(_, payload)| payload.clone()),
            );

            service.mobile_client = Some(client);
            service.service_binding = Some(binding);
        }

        Ok(())
    }

    /// Submit `binding` and store `form_data` in its parameters secret.
    ///
    /// The binding must name a parameters secret in its first `parametersFrom`
    /// entry; without one nothing is submitted and no binding is left behind.
    /// The two writes are not atomic: if the secret cannot be created
    /// the binding stays in the catalog and the secret error is returned.
    pub async fn create(
        &self,
        namespace: &str,
        binding: &ServiceBinding,
        form_data: &Map<String, Value>,
    ) -> Result<ServiceBinding> {
        let secret_name = binding
            .parameters_secret_name()
            .ok_or_else(|| MobileError::MissingParametersSource(binding.name_any()))?;

        let created = self
            .catalog
            .create_service_binding(namespace, binding)
            .await
            .inspect_err(|e| {
                warn!(namespace, binding = %binding.name_any(), error = %e, "Service binding rejected")
            })?;

        info!(
            namespace,
            binding = %created.name_any(),
            instance = %created.spec.instance_ref.name,
            consumer = created.consumer().unwrap_or_default(),
            "Created service binding"
        );

        let secret = ParametersSecret::new(secret_name, &created, form_data)?;
        debug!(
            namespace,
            secret = %secret.name,
            "Creating binding parameters secret"
        );

        self.secrets
            .create_secret(namespace, &secret.to_secret())
            .await
            .inspect_err(|e| {
                warn!(
                    namespace,
                    binding = %created.name_any(),
                    secret = %secret.name,
                    error = %e,
                    "Failed to create parameters secret; the service binding was left in place"
                )
            })?;

        Ok(created)
    }

    pub async fn delete(&self, namespace: &str, binding_name: &str) -> Result<()> {
        self.catalog
            .delete_service_binding(namespace, binding_name)
            .await?;
        info!(namespace, binding = binding_name, "Deleted service binding");
        Ok(())
    }

    /// Deferred watch on the service bindings of `namespace`.
    ///
    /// Nothing is opened until the returned factory is called. The stream is
    /// not filtered by mobile client; that is left to the consumer.
    pub fn watch(&self, namespace: &str, mobile_client_name: &str) -> WatchFactory {
        debug!(namespace, mobile_client = mobile_client_name, "Preparing service binding watch");

        let catalog = Arc::clone(&self.catalog);
        let namespace = namespace.to_string();
        Box::new(move || {
            let catalog = Arc::clone(&catalog);
            let namespace = namespace.clone();
            async move { catalog.watch_service_bindings(&namespace).await }.boxed()
        })
    }
}
