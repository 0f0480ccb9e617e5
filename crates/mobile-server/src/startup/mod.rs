//! Application startup utilities module.

mod catalog;
mod http;
mod logging;
mod shutdown;

pub use catalog::build_bindable_services;
pub use http::main_server;
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use shutdown::{ShutdownSignal, drain, listen_for_os_signals, run_with_shutdown};
