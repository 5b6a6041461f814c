//! Runtime support for executing reducer effects.

pub mod effects;

pub use effects::EffectRunner;
