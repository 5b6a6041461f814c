//! HTTP request handlers shared by every HackOps service.

pub mod health;

pub use health::{health_check, ComponentHealth, HealthReport};
