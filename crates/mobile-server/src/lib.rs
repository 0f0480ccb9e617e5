// Mobile server library: HTTP API over the bindable mobile services

pub mod api; // API handlers and models
pub mod error; // Error to HTTP response mapping
pub mod model; // Configuration, shared state and response envelope
pub mod startup; // Logging, backend wiring, HTTP server and shutdown

pub use model::common::{AppState, Configuration};
