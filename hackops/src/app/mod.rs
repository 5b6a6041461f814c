//! Application services coordinating reducers, record stores and effects.

pub mod services;

pub use services::BaggageService;
