//! Mobile Common - Shared types, constants, and helpers
//!
//! This crate provides the foundational pieces used across the mobile services crates:
//! - Error types and error codes
//! - Annotation keys, tags and other well-known names
//! - Helper macros

pub mod error;
pub mod macros;

// Re-exports for convenience
pub use error::{ErrorCode, MobileError, Result};

/// Service class tag that marks an offering as bindable from a mobile client
pub const MOBILE_CLIENT_ENABLED_TAG: &str = "mobile-client-enabled";

/// Binding annotation naming the mobile client that consumes the binding
pub const CONSUMER_ANNOTATION: &str = "binding.aerogear.org/consumer";

/// Binding annotation naming the service instance that provides the binding
pub const PROVIDER_ANNOTATION: &str = "binding.aerogear.org/provider";

/// Prefix of mobile client annotations carrying per-binding configuration
pub const BINDING_CONFIG_ANNOTATION_PREFIX: &str = "org.aerogear.binding.";

/// Image shown for services whose class metadata names neither an image nor an icon
pub const DEFAULT_SERVICE_IMAGE_URL: &str =
    "https://avatars1.githubusercontent.com/u/3380462?s=200&v=4";

/// Key under which binding parameters are stored in the parameters secret
pub const PARAMETERS_SECRET_KEY: &str = "parameters";

/// Namespace used when a request does not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Annotation key prefix for configuration belonging to the given service instance
pub fn binding_config_annotation(instance_name: &str) -> String {
    format!("{}{}", BINDING_CONFIG_ANNOTATION_PREFIX, instance_name)
}
