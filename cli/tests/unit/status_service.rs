//! Status collection from state plus live container states.

use bunkr_cli::application::services::status::collect_status;
use bunkr_cli::domain::state::RecipeState;

use crate::helpers::{MockTransport, hardened_state, ok_output};

#[tokio::test]
async fn test_status_combines_state_and_containers() {
    let mut state = hardened_state();
    state.mesh.connected = true;
    state.mesh.hostname = "vps.tail1234.ts.net".to_string();
    for (name, port, private) in [("ghost", 2368, false), ("uptime-kuma", 3001, true)] {
        state.recipes.insert(
            name.to_string(),
            RecipeState {
                version: "1".to_string(),
                port,
                private,
                ..RecipeState::default()
            },
        );
    }
    let transport = MockTransport::new()
        .with_state(&state)
        .on(
            "/opt/bunkr/ghost/docker-compose.yml ps",
            ok_output(b"ghost-ghost-1 running\nghost-ghost-db-1 restarting\n"),
        )
        .fail("/opt/bunkr/uptime-kuma/docker-compose.yml ps");

    let report = collect_status(&transport).await.expect("status");

    assert!(report.hardening.applied);
    assert_eq!(report.tailscale.hostname, "vps.tail1234.ts.net");
    assert_eq!(report.apps.len(), 2);
    assert_eq!(report.apps[0].name, "ghost");
    assert_eq!(report.apps[0].containers.len(), 2);
    assert_eq!(report.apps[0].summary(), "restarting");
    assert_eq!(report.apps[1].name, "uptime-kuma");
    assert!(report.apps[1].containers.is_empty());
    assert_eq!(report.apps[1].summary(), "unknown");

    let json = serde_json::to_value(&report).expect("serialize");
    assert_eq!(json["apps"][0]["port"], 2368);
    assert_eq!(json["apps"][1]["private"], true);
}

#[tokio::test]
async fn test_empty_target() {
    let transport = MockTransport::new();
    let report = collect_status(&transport).await.expect("status");
    assert!(report.apps.is_empty());
    assert!(!report.hardening.applied);
    assert_eq!(transport.count("docker"), 0);
}
