//! Main entry point for the mobile server.

use std::sync::Arc;
use std::time::Duration;

use mobile_server::{
    model::common::{AppState, Configuration},
    startup::{self, ShutdownSignal},
};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let configuration = Configuration::new()?;
    let _logging_guard = startup::init_logging(&configuration.logging_config())?;

    let bindable_services = startup::build_bindable_services(&configuration).await?;

    let shutdown = ShutdownSignal::new();
    startup::listen_for_os_signals(shutdown.clone());

    let address = configuration.server_address();
    let port = configuration.server_port();
    let shutdown_timeout = Duration::from_secs(configuration.shutdown_timeout_seconds());

    let app_state = Arc::new(AppState {
        configuration,
        bindable_services,
        shutdown: shutdown.clone(),
    });

    let server = startup::main_server(app_state, address.clone(), port)?;
    let handle = server.handle();
    let mut server_task = actix_rt::spawn(server);
    info!("Mobile server listening on {}:{}", address, port);

    match startup::run_with_shutdown(&mut server_task, &shutdown).await {
        Some(Ok(Ok(()))) => info!("HTTP server stopped"),
        Some(Ok(Err(e))) => {
            error!("HTTP server failed: {}", e);
            return Err(e.into());
        }
        Some(Err(e)) => return Err(e.into()),
        None => {
            let stopping = async move {
                handle.stop(true).await;
                let _ = server_task.await;
            };
            startup::drain(stopping, shutdown_timeout).await;
        }
    }

    Ok(())
}
