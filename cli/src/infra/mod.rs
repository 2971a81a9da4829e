//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the local
//! and SSH transports, recipe downloads, terminal prompts, the config file and
//! the release backend.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod local;
pub mod prompt;
pub mod recipes;
pub mod ssh;
pub mod transport;
pub mod update;
