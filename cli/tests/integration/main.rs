//! Integration tests for bunkr CLI
//!
//! These tests spawn the actual binary and check end-to-end behavior that
//! needs no server: argument parsing, help, version and early errors.

mod cli_tests;
