//! Hardening engine against a scripted server.

use bunkr_cli::application::services::hardening::{harden, run_hardening};
use chrono::{TimeZone, Utc};
use bunkr_cli::domain::error::{StepFailure, TimeoutError};
use bunkr_cli::domain::hardening::{APT_LOCK_HELD, HardeningConfig, STEP_NAMES, steps};
use bunkr_cli::domain::poll::Timings;
use bunkr_cli::domain::state::State;

use crate::helpers::{MockTransport, RecordingReporter, err_output, ok_output};

const LISTEN_2222: &str = "ss -tln | grep -q ':2222 '";
const RESTORE: &str = "cp /etc/ssh/sshd_config.bak /etc/ssh/sshd_config";
const RESTART: &str = "systemctl restart sshd 2>/dev/null || systemctl restart ssh";

#[tokio::test]
async fn test_fresh_server_applies_every_step_in_order() {
    let config = HardeningConfig::default();
    let transport = MockTransport::fresh_server(&config);
    let reporter = RecordingReporter::new();
    let mut state = State::default();

    let outcome = run_hardening(
        &transport,
        &reporter,
        &mut state,
        &config,
        &Timings::immediate(),
    )
    .await
    .expect("hardening succeeds");

    assert_eq!(outcome.applied, STEP_NAMES.to_vec());
    assert!(outcome.skipped.is_empty());
    assert!(state.hardening.applied);
    assert!(state.hardening.applied_at.is_some());
    assert_eq!(state.hardening.ssh_port, 2222);
    for name in STEP_NAMES {
        assert!(state.step_done(name), "{name} not recorded");
    }

    let user = transport.position("adduser").expect("user created");
    let sshd = transport.position("sshd -t").expect("sshd validated");
    let ufw = transport.position("ufw --force enable").expect("ufw enabled");
    let swap = transport.position("swapon /swapfile").expect("swap enabled");
    assert!(user < sshd && sshd < ufw && ufw < swap);
    assert_eq!(reporter.count("success"), STEP_NAMES.len());
}

#[tokio::test]
async fn test_second_run_is_a_noop() {
    let config = HardeningConfig::default();
    let transport = MockTransport::fresh_server(&config);
    let reporter = RecordingReporter::new();
    let mut state = State::default();
    let timings = Timings::immediate();

    run_hardening(&transport, &reporter, &mut state, &config, &timings)
        .await
        .expect("first run");
    let after_first = state.clone();
    let issued = transport.log().len();

    let outcome = run_hardening(&transport, &reporter, &mut state, &config, &timings)
        .await
        .expect("second run");

    assert!(outcome.applied.is_empty());
    assert_eq!(outcome.skipped, STEP_NAMES.to_vec());
    assert_eq!(transport.log().len(), issued, "no command on second run");
    assert_eq!(state, after_first);
}

#[tokio::test]
async fn test_rerun_with_other_port_keeps_recorded_access() {
    let mut state = State::default();
    state.hardening.applied = true;
    state.hardening.ssh_port = 2222;
    state.hardening.applied_at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single();
    for name in STEP_NAMES {
        state.mark_step_done(name);
    }
    let before = state.clone();
    let config = HardeningConfig {
        ssh_port: 2200,
        ..HardeningConfig::default()
    };
    let transport = MockTransport::fresh_server(&config);
    let reporter = RecordingReporter::new();

    let outcome = harden(
        &transport,
        &reporter,
        &mut state,
        &config,
        "203.0.113.10",
        &Timings::immediate(),
    )
    .await
    .expect("hardening");

    assert!(!outcome.changed());
    assert_eq!(transport.count(""), 0, "nothing executed");
    assert_eq!(state, before);
    assert_eq!(state.hardening.ssh_port, 2222);
    assert!(!reporter.has("header", "SSH access has changed"));
    assert!(!reporter.has("step", "2200"));
}

#[tokio::test]
async fn test_check_passing_marks_step_done_without_applying() {
    let config = HardeningConfig::default();
    let sysctl_check = steps(&config)
        .into_iter()
        .find(|s| s.name == "sysctl")
        .expect("sysctl step")
        .check;
    // Everything is already in place on this server.
    let transport = MockTransport::new()
        .fail_exact(APT_LOCK_HELD)
        .on(&sysctl_check, ok_output(b""));
    let reporter = RecordingReporter::new();
    let mut state = State::default();

    let outcome = run_hardening(
        &transport,
        &reporter,
        &mut state,
        &config,
        &Timings::immediate(),
    )
    .await
    .expect("hardening");

    assert!(outcome.applied.is_empty());
    assert!(state.step_done("sysctl"));
    assert_eq!(transport.count(&sysctl_check), 1);
    assert_eq!(transport.count("sysctl --system"), 0);
    assert!(reporter.has("skip", "already configured"));
}

#[tokio::test]
async fn test_step_failure_halts_and_keeps_earlier_steps() {
    let config = HardeningConfig::default();
    let transport = MockTransport::fresh_server(&config).fail("ufw --force enable");
    let reporter = RecordingReporter::new();
    let mut state = State::default();

    let err = harden(
        &transport,
        &reporter,
        &mut state,
        &config,
        "203.0.113.10",
        &Timings::immediate(),
    )
    .await
    .expect_err("firewall fails");

    let failure = err.downcast_ref::<StepFailure>().expect("step failure");
    assert_eq!(failure.step, "firewall");
    assert!(state.step_done("sudo_user"));
    assert!(state.step_done("ssh_hardening"));
    assert!(!state.step_done("firewall"));
    assert!(!state.hardening.applied);
    assert_eq!(transport.count("install -y fail2ban"), 0);
    assert!(reporter.has("error", "Firewall configured failed"));

    // Progress made before the failure is persisted.
    let saved = transport.saved_state();
    assert!(saved.step_done("ssh_hardening"));
    assert!(!saved.hardening.applied);
}

#[tokio::test]
async fn test_ssh_not_listening_restores_backup_and_restarts() {
    let config = HardeningConfig::default();
    let transport = MockTransport::fresh_server(&config).fail_exact(LISTEN_2222);
    let reporter = RecordingReporter::new();
    let mut state = State::default();

    let err = run_hardening(
        &transport,
        &reporter,
        &mut state,
        &config,
        &Timings::immediate(),
    )
    .await
    .expect_err("listen check fails");

    let failure = err.downcast_ref::<StepFailure>().expect("step failure");
    assert_eq!(failure.step, "ssh_hardening");
    assert!(failure.detail.contains("not listening on port 2222"));
    assert_eq!(transport.count(LISTEN_2222), 5);
    assert_eq!(transport.count(RESTORE), 1);
    assert_eq!(transport.count(RESTART), 2);
    assert!(transport.position(RESTORE) < transport.log().iter().rposition(|c| c == RESTART));
    assert!(state.step_done("sudo_user"));
    assert!(!state.step_done("ssh_hardening"));
    assert_eq!(transport.count("ufw"), 0);
}

#[tokio::test]
async fn test_invalid_sshd_config_restores_without_restart() {
    let config = HardeningConfig::default();
    let transport = MockTransport::fresh_server(&config).fail_exact("sshd -t");
    let reporter = RecordingReporter::new();
    let mut state = State::default();

    let err = run_hardening(
        &transport,
        &reporter,
        &mut state,
        &config,
        &Timings::immediate(),
    )
    .await
    .expect_err("validation fails");

    assert!(err.to_string().contains("SSH hardened failed"));
    assert_eq!(transport.count(RESTORE), 1);
    assert_eq!(transport.count(RESTART), 0);
}

#[tokio::test]
async fn test_socket_activation_is_disabled_before_restart() {
    let config = HardeningConfig::default();
    let transport = MockTransport::fresh_server(&config);
    let reporter = RecordingReporter::new();
    let mut state = State::default();

    run_hardening(
        &transport,
        &reporter,
        &mut state,
        &config,
        &Timings::immediate(),
    )
    .await
    .expect("hardening");

    let disable = transport
        .position("systemctl disable --now ssh.socket")
        .expect("socket disabled");
    let restart = transport.position(RESTART).expect("restarted");
    assert!(disable < restart);
}

#[tokio::test]
async fn test_waits_for_apt_lock_once() {
    let config = HardeningConfig::default();
    let mut transport = MockTransport::new().on_seq(
        APT_LOCK_HELD,
        vec![ok_output(b""), ok_output(b""), err_output(1, b"")],
    );
    for step in steps(&config) {
        transport = transport.fail_exact(&step.check);
    }
    let reporter = RecordingReporter::new();
    let mut state = State::default();

    run_hardening(
        &transport,
        &reporter,
        &mut state,
        &config,
        &Timings::immediate(),
    )
    .await
    .expect("hardening");

    assert!(reporter.has("step", "Waiting for package manager"));
    assert_eq!(transport.count(APT_LOCK_HELD), 3);
}

#[tokio::test]
async fn test_apt_lock_never_released_times_out() {
    let config = HardeningConfig::default();
    let mut transport = MockTransport::new().on(APT_LOCK_HELD, ok_output(b""));
    for step in steps(&config) {
        transport = transport.fail_exact(&step.check);
    }
    let reporter = RecordingReporter::new();
    let mut state = State::default();

    let err = run_hardening(
        &transport,
        &reporter,
        &mut state,
        &config,
        &Timings::immediate(),
    )
    .await
    .expect_err("lock held forever");

    let timeout = err.downcast_ref::<TimeoutError>().expect("timeout");
    assert_eq!(timeout.what, "the package manager lock");
    assert_eq!(transport.count("adduser"), 0);
}

#[tokio::test]
async fn test_completed_run_prints_new_login() {
    let config = HardeningConfig {
        ssh_port: 2200,
        admin_user: "ops".to_string(),
    };
    let transport = MockTransport::fresh_server(&config);
    let reporter = RecordingReporter::new();
    let mut state = State::default();

    harden(
        &transport,
        &reporter,
        &mut state,
        &config,
        "203.0.113.10",
        &Timings::immediate(),
    )
    .await
    .expect("hardening");

    assert!(reporter.has("header", "SSH access has changed"));
    assert!(reporter.has("step", "ssh -p 2200 ops@203.0.113.10"));
    assert!(reporter.has("step", "bunkr --on ops@203.0.113.10:2200 status"));
    assert_eq!(state.hardening.ssh_port, 2200);
}
