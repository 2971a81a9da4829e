//! State document persistence through the transport.

use bunkr_cli::application::services::state_store::{load_state, save_state};
use bunkr_cli::domain::error::StateError;
use bunkr_cli::domain::state::{RecipeState, STATE_PATH, State};
use chrono::{DateTime, Utc};

use crate::helpers::{MockTransport, hardened_state};

fn timestamp(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

#[tokio::test]
async fn test_missing_file_is_empty_state() {
    let transport = MockTransport::new();
    let state = load_state(&transport).await.expect("load");
    assert_eq!(state, State::default());
}

#[tokio::test]
async fn test_saved_state_loads_back() {
    let transport = MockTransport::new();
    let mut state = hardened_state();
    state.mark_step_done("firewall");
    state.hardening.applied_at = Some(timestamp("2026-03-01T09:30:00Z"));
    state.mesh.installed = true;
    state.mesh.connected = true;
    state.mesh.hostname = "vps.tail1234.ts.net".to_string();
    state.recipes.insert(
        "ghost".to_string(),
        RecipeState {
            version: "5.0".to_string(),
            domain: "blog.example.com".to_string(),
            private: false,
            installed_at: Some(timestamp("2026-03-02T14:05:17.250Z")),
            port: 2368,
            container_port: 2368,
        },
    );
    state.recipes.insert(
        "uptime-kuma".to_string(),
        RecipeState {
            version: "1.23".to_string(),
            domain: "vps.tail1234.ts.net".to_string(),
            private: true,
            installed_at: Some(timestamp("2026-03-02T14:07:00Z")),
            port: 3002,
            container_port: 3001,
        },
    );

    save_state(&transport, &state).await.expect("save");
    let loaded = load_state(&transport).await.expect("load");

    assert_eq!(loaded, state);
    let raw = transport.file(STATE_PATH).expect("written");
    assert!(raw.ends_with("}\n"));
    assert!(raw.contains("\"tailscale\""));
    assert!(raw.contains("2026-03-02T14:05:17.250Z"));
}

#[tokio::test]
async fn test_blank_file_is_empty_state() {
    let transport = MockTransport::new().with_file(STATE_PATH, "\n  \n");
    let state = load_state(&transport).await.expect("load");
    assert_eq!(state, State::default());
}

#[tokio::test]
async fn test_partial_document_fills_defaults() {
    let transport = MockTransport::new()
        .with_file(STATE_PATH, r#"{"hardening":{"applied":true,"ssh_port":2200}}"#);
    let state = load_state(&transport).await.expect("load");
    assert!(state.hardening.applied);
    assert_eq!(state.hardening.ssh_port, 2200);
    assert!(state.recipes.is_empty());
}

#[tokio::test]
async fn test_corrupt_file_is_reported() {
    let transport = MockTransport::new().with_file(STATE_PATH, "{not json");
    let err = load_state(&transport).await.expect_err("corrupt");
    assert!(matches!(
        err.downcast_ref::<StateError>(),
        Some(StateError::Corrupt { path, .. }) if path == STATE_PATH
    ));
}

#[tokio::test]
async fn test_write_failure_propagates() {
    let transport = MockTransport::new().fail_write(STATE_PATH);
    let err = save_state(&transport, &State::default())
        .await
        .expect_err("disk full");
    assert!(format!("{err:#}").contains("cannot save state"));
}
