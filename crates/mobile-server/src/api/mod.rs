//! HTTP API handlers

pub mod bindable;
pub mod health;
pub mod model;
