#![deny(warnings)]

//! Core domain model for Entropic Threads.
//!
//! This crate defines the numeric adapter, generator configuration, and the
//! serializable game state shared by the simulation runtime and its callers,
//! with tolerant deserialization for persisted payloads.

pub mod config;
pub mod num;
pub mod state;
pub mod stats;

pub use config::{ConfigError, GeneratorConfig, GeneratorSet, NUM_TIERS};
pub use num::Big;
pub use state::{
    new_generator_states, BraidState, FiberState, GameState, GeneratorState,
    SerializedBraidState, SerializedFiberState, SerializedGameState, SerializedGeneratorState,
};
