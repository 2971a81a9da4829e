//! Shared test helpers: a scripted transport and recording port doubles.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::process::{ExitStatus, Output};
use std::sync::Mutex;

use anyhow::Result;
use bunkr_cli::application::ports::{ProgressReporter, Prompter, RecipeSource, Transport};
use bunkr_cli::domain::error::{PromptError, RecipeError};
use bunkr_cli::domain::hardening::{APT_LOCK_HELD, HardeningConfig, steps};
use bunkr_cli::domain::recipe::Prompt;
use bunkr_cli::domain::state::{STATE_PATH, State};

// ── Cross-platform ExitStatus construction ───────────────────────────────────

/// Build an `ExitStatus` from a logical exit code (0 = success, non-zero = failure).
///
/// On Unix the raw wait-status encodes the exit code in bits 8–15, so we shift.
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

// ── Output constructors ──────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── MockTransport ────────────────────────────────────────────────────────────

enum Match {
    Exact(String),
    Contains(String),
}

impl Match {
    fn matches(&self, command: &str) -> bool {
        match self {
            Self::Exact(s) => command == s,
            Self::Contains(s) => command.contains(s.as_str()),
        }
    }
}

struct Rule {
    pattern: Match,
    /// Responses in order; the last one repeats.
    outputs: VecDeque<Output>,
}

/// A target machine driven by rules.
///
/// Commands matching no rule succeed with empty output. `test -f <path>` is
/// answered from the in-memory file map unless a rule matches first.
#[derive(Default)]
pub struct MockTransport {
    rules: Mutex<Vec<Rule>>,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    log: Mutex<Vec<String>>,
    failing_writes: Vec<String>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A server where no hardening step is in place yet and apt is idle.
    pub fn fresh_server(config: &HardeningConfig) -> Self {
        let mut transport = Self::new().fail_exact(APT_LOCK_HELD);
        for step in steps(config) {
            transport = transport.fail_exact(&step.check);
        }
        transport
    }

    fn rule(self, pattern: Match, outputs: Vec<Output>) -> Self {
        self.rules.lock().expect("rules").push(Rule {
            pattern,
            outputs: outputs.into(),
        });
        self
    }

    /// Commands containing `pattern` return `output`.
    pub fn on(self, pattern: &str, output: Output) -> Self {
        self.rule(Match::Contains(pattern.to_string()), vec![output])
    }

    /// Commands containing `pattern` return `outputs` in turn, then repeat the last.
    pub fn on_seq(self, pattern: &str, outputs: Vec<Output>) -> Self {
        self.rule(Match::Contains(pattern.to_string()), outputs)
    }

    /// Commands containing `pattern` exit 1.
    pub fn fail(self, pattern: &str) -> Self {
        self.on(pattern, err_output(1, b"boom"))
    }

    /// Exactly `command` exits 1.
    pub fn fail_exact(self, command: &str) -> Self {
        self.rule(Match::Exact(command.to_string()), vec![err_output(1, b"")])
    }

    /// Writes to `path` fail.
    pub fn fail_write(mut self, path: &str) -> Self {
        self.failing_writes.push(path.to_string());
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files
            .lock()
            .expect("files")
            .insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    pub fn with_state(self, state: &State) -> Self {
        let json = serde_json::to_string_pretty(state).expect("serialize state");
        self.with_file(STATE_PATH, &json)
    }

    /// Every exec'd command and `write <path>` entry, in order.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().expect("log").clone()
    }

    /// Number of exec'd commands containing `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.log()
            .iter()
            .filter(|c| !c.starts_with("write ") && c.contains(pattern))
            .count()
    }

    /// Position of the first log entry containing `pattern`.
    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.log().iter().position(|c| c.contains(pattern))
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .expect("files")
            .get(path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn saved_state(&self) -> State {
        let json = self.file(STATE_PATH).expect("state was saved");
        serde_json::from_str(&json).expect("valid state JSON")
    }
}

impl Transport for MockTransport {
    async fn exec(&self, command: &str) -> Result<Output> {
        self.log.lock().expect("log").push(command.to_string());

        let mut rules = self.rules.lock().expect("rules");
        if let Some(rule) = rules.iter_mut().find(|r| r.pattern.matches(command)) {
            let out = if rule.outputs.len() > 1 {
                rule.outputs.pop_front()
            } else {
                rule.outputs.front().cloned()
            };
            return Ok(out.unwrap_or_else(|| ok_output(b"")));
        }
        drop(rules);

        if let Some(path) = command.strip_prefix("test -f ") {
            if !path.contains(' ') {
                let exists = self.files.lock().expect("files").contains_key(path);
                return Ok(if exists {
                    ok_output(b"")
                } else {
                    err_output(1, b"")
                });
            }
        }
        Ok(ok_output(b""))
    }

    async fn write_file(&self, path: &str, content: &[u8], _mode: u32) -> Result<()> {
        self.log.lock().expect("log").push(format!("write {path}"));
        if self.failing_writes.iter().any(|p| p == path) {
            anyhow::bail!("cannot write {path}: disk full");
        }
        self.files
            .lock()
            .expect("files")
            .insert(path.to_string(), content.to_vec());
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .expect("files")
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("cannot read {path}: no such file"))
    }
}

// ── RecordingReporter ────────────────────────────────────────────────────────

/// Records every progress event as `"<kind>: <message>"`.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("events").clone()
    }

    pub fn has(&self, kind: &str, fragment: &str) -> bool {
        self.events()
            .iter()
            .any(|e| e.starts_with(&format!("{kind}: ")) && e.contains(fragment))
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.starts_with(&format!("{kind}: ")))
            .count()
    }

    fn push(&self, kind: &str, message: &str) {
        self.events
            .lock()
            .expect("events")
            .push(format!("{kind}: {message}"));
    }
}

impl ProgressReporter for RecordingReporter {
    fn header(&self, message: &str) {
        self.push("header", message);
    }
    fn step(&self, message: &str) {
        self.push("step", message);
    }
    fn success(&self, message: &str) {
        self.push("success", message);
    }
    fn skip(&self, message: &str) {
        self.push("skip", message);
    }
    fn warn(&self, message: &str) {
        self.push("warn", message);
    }
    fn error(&self, message: &str) {
        self.push("error", message);
    }
}

// ── StubRecipeSource ─────────────────────────────────────────────────────────

/// Serves recipe manifests from memory.
#[derive(Default)]
pub struct StubRecipeSource {
    recipes: BTreeMap<String, String>,
    index: String,
    fetched: Mutex<Vec<String>>,
}

impl StubRecipeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, yaml: &str) -> Self {
        self.recipes.insert(name.to_string(), yaml.to_string());
        self
    }

    pub fn with_index(mut self, yaml: &str) -> Self {
        self.index = yaml.to_string();
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().expect("fetched").clone()
    }
}

impl RecipeSource for StubRecipeSource {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        self.fetched.lock().expect("fetched").push(name.to_string());
        self.recipes
            .get(name)
            .map(|y| y.as_bytes().to_vec())
            .ok_or_else(|| RecipeError::NotFound(name.to_string()).into())
    }

    async fn fetch_index(&self) -> Result<Vec<u8>> {
        Ok(self.index.as_bytes().to_vec())
    }
}

// ── ScriptedPrompter ─────────────────────────────────────────────────────────

/// Answers prompts from a map; unknown keys are "cannot ask".
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: BTreeMap<String, String>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, key: &str, value: &str) -> Self {
        self.answers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().expect("asked").clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, prompt: &Prompt) -> Result<Option<String>, PromptError> {
        self.asked.lock().expect("asked").push(prompt.key.clone());
        Ok(self.answers.get(&prompt.key).cloned())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// Public blog with a database sidecar and a generated password.
pub const GHOST_YAML: &str = r"
name: ghost
version: '5.0'
description: Blogging platform
image: ghost:5
ports: [2368]
volumes:
  - ghost-content:/var/lib/ghost/content
prompts:
  - key: DOMAIN
    label: Domain
    required: true
environment:
  url: https://${DOMAIN}
  database__connection__password: auto_generate_32
services:
  - name: ghost-db
    image: mysql:8
    environment:
      MYSQL_ROOT_PASSWORD: auto_generate_32
    volumes:
      - ghost-db:/var/lib/mysql
health_check:
  url: http://localhost:2368/
  timeout: 4
  interval: 2
";

/// Private app served on the mesh network.
pub const UPTIME_YAML: &str = r"
name: uptime-kuma
version: '1.23'
description: Uptime monitor
image: louislam/uptime-kuma:1
private: true
ports: [3001]
volumes:
  - kuma-data:/app/data
";

/// `tailscale status --json` for a node that still needs login.
pub const TS_NEEDS_LOGIN: &[u8] = br#"{"BackendState":"NeedsLogin","Self":{"DNSName":""}}"#;

/// `tailscale status --json` for a connected node.
pub const TS_RUNNING: &[u8] =
    br#"{"BackendState":"Running","Self":{"DNSName":"vps.tail1234.ts.net."}}"#;

/// A state document for a server that is already hardened.
pub fn hardened_state() -> State {
    let mut state = State::default();
    state.hardening.applied = true;
    state.hardening.ssh_port = 2222;
    state
}
