//! Mobile Services - bindable mobile service aggregation
//!
//! Joins service instances, classes, plans, bindings and mobile clients into
//! the per-client view the mobile console works with, and creates or removes
//! the bindings behind it.

pub mod bindable;
pub mod binding;
pub mod metadata;
pub mod secret;

pub use bindable::{BindableMobileService, BindableServiceManager, WatchFactory};
pub use binding::{BindingRequest, generate_name, validate_form_data};
pub use metadata::{ServiceDisplay, service_display};
pub use secret::ParametersSecret;
