//! Unit tests for bunkr CLI
//!
//! These tests drive the services against scripted ports and run fast without
//! touching a real server.

#![allow(clippy::expect_used)]

mod architecture;
mod hardening_service;
mod helpers;
mod state_store;
mod status_service;
mod update_service;
