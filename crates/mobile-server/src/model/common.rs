use std::sync::Arc;

use mobile_services::BindableServiceManager;

use crate::startup::ShutdownSignal;

pub use super::config::Configuration;

/// Shared state handed to every request handler
pub struct AppState {
    pub configuration: Configuration,
    pub bindable_services: Arc<BindableServiceManager>,
    /// Ends open watch streams when the server stops
    pub shutdown: ShutdownSignal,
}
