//! Domain layer: pure types, validation, and text generation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod hardening;
pub mod mesh;
pub mod poll;
pub mod proxy;
pub mod recipe;
pub mod shell;
pub mod state;
pub mod target;

pub use config::BunkrConfig;
pub use error::{
    PromptError, RecipeError, StateError, StepFailure, TimeoutError, TransportError,
    ValidationError,
};
pub use poll::{PollPolicy, Timings};
pub use recipe::Recipe;
pub use state::State;
pub use target::SshTarget;
