//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod hardening;
pub mod install;
pub mod mesh;
pub mod plan;
pub mod proxy;
pub mod runtime;
pub mod self_update;
pub mod state_store;
pub mod status;
pub mod uninstall;
pub mod update;
pub mod wait;
