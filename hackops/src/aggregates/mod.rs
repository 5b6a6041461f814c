//! Aggregates: reducers holding the business rules.

pub mod baggage;

pub use baggage::{
    BaggageAction, BaggageEnvironment, BaggageError, BaggageReducer, BaggageState,
};
