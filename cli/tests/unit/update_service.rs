//! Update use-case: regenerate, pull, restart, keep port and secrets.

use bunkr_cli::application::services::update::{UpdateOutcome, update};
use bunkr_cli::domain::error::StateError;
use bunkr_cli::domain::state::{RecipeState, State};

use crate::helpers::{GHOST_YAML, MockTransport, RecordingReporter, StubRecipeSource, hardened_state};

const COMPOSE: &str = "/opt/bunkr/ghost/docker-compose.yml";
const ENV: &str = "/opt/bunkr/ghost/.env";

const PREVIOUS_COMPOSE: &str = "\
services:
  ghost:
    image: ghost:4
    ports:
    - 127.0.0.1:2369:2368
    environment:
      database__connection__password: keepme
      url: https://blog.example.com
    depends_on:
    - ghost-db
  ghost-db:
    image: mysql:8
    environment:
      MYSQL_ROOT_PASSWORD: rootsecret
";

fn installed(version: &str) -> State {
    let mut state = hardened_state();
    state.recipes.insert(
        "ghost".to_string(),
        RecipeState {
            version: version.to_string(),
            domain: "blog.example.com".to_string(),
            port: 2369,
            container_port: 2368,
            ..RecipeState::default()
        },
    );
    state
}

fn source() -> StubRecipeSource {
    StubRecipeSource::new().with("ghost", GHOST_YAML)
}

#[tokio::test]
async fn test_same_version_is_a_noop() {
    let transport = MockTransport::new().with_state(&installed("5.0"));
    let reporter = RecordingReporter::new();

    let outcome = update(&transport, &source(), &reporter, "ghost")
        .await
        .expect("update");

    assert_eq!(
        outcome,
        UpdateOutcome::UpToDate {
            version: "5.0".to_string()
        }
    );
    assert!(reporter.has("step", "already at version 5.0"));
    assert!(!transport.log().iter().any(|c| c.starts_with("write ")));
    assert_eq!(transport.count("pull"), 0);
}

#[tokio::test]
async fn test_newer_version_keeps_port_and_secrets() {
    let transport = MockTransport::new()
        .with_state(&installed("4.0"))
        .with_file(COMPOSE, PREVIOUS_COMPOSE)
        .with_file(ENV, "DOMAIN=blog.example.com\n");
    let reporter = RecordingReporter::new();

    let outcome = update(&transport, &source(), &reporter, "ghost")
        .await
        .expect("update");

    assert_eq!(
        outcome,
        UpdateOutcome::Updated {
            from: "4.0".to_string(),
            to: "5.0".to_string()
        }
    );

    let compose = transport.file(COMPOSE).expect("compose");
    assert!(compose.contains("ghost:5"));
    assert!(compose.contains("127.0.0.1:2369:2368"));
    assert!(compose.contains("keepme"));
    assert!(compose.contains("rootsecret"));
    assert!(!compose.contains("auto_generate_32"));
    assert_eq!(transport.file(ENV).as_deref(), Some("DOMAIN=blog.example.com\n"));

    let written = transport.position(&format!("write {COMPOSE}")).expect("written");
    let pulled = transport.position("pull").expect("pulled");
    let down = transport.position(" down").expect("stopped");
    let up = transport.position("up -d").expect("started");
    assert!(written < pulled && pulled < down && down < up);

    let saved = transport.saved_state();
    assert_eq!(saved.recipes["ghost"].version, "5.0");
    assert_eq!(saved.recipes["ghost"].port, 2369);
}

#[tokio::test]
async fn test_domain_comes_from_state_without_env_file() {
    let transport = MockTransport::new().with_state(&installed("4.0"));

    update(&transport, &source(), &RecordingReporter::new(), "ghost")
        .await
        .expect("update");

    let compose = transport.file(COMPOSE).expect("compose");
    assert!(compose.contains("https://blog.example.com"));
    assert_eq!(transport.file(ENV).as_deref(), Some("DOMAIN=blog.example.com\n"));
}

#[tokio::test]
async fn test_pull_failure_keeps_recorded_version() {
    let transport = MockTransport::new()
        .with_state(&installed("4.0"))
        .fail("pull");

    let err = update(&transport, &source(), &RecordingReporter::new(), "ghost")
        .await
        .expect_err("pull fails");

    assert!(format!("{err:#}").contains("failed to pull images"));
    assert_eq!(transport.count("up -d"), 0);
    assert_eq!(transport.saved_state().recipes["ghost"].version, "4.0");
}

#[tokio::test]
async fn test_unknown_app_is_an_error() {
    let transport = MockTransport::new().with_state(&hardened_state());
    let source = source();

    let err = update(&transport, &source, &RecordingReporter::new(), "ghost")
        .await
        .expect_err("not installed");

    assert_eq!(
        err.downcast_ref::<StateError>(),
        Some(&StateError::NotInstalled("ghost".to_string()))
    );
    assert!(source.fetched().is_empty());
}
