//! Application service: load and persist the state document on the target.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};

use crate::application::ports::Transport;
use crate::domain::error::StateError;
use crate::domain::shell::quote;
use crate::domain::state::{STATE_PATH, State};

/// Load the state document, or an empty one if the target has none yet.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load_state(transport: &impl Transport) -> Result<State> {
    if !transport
        .check(&format!("test -f {}", quote(STATE_PATH)))
        .await?
    {
        tracing::debug!(path = STATE_PATH, "no state file, starting empty");
        return Ok(State::default());
    }
    let data = transport
        .read_file(STATE_PATH)
        .await
        .context("cannot read state file")?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(State::default());
    }
    serde_json::from_slice(&data).map_err(|e| {
        StateError::Corrupt {
            path: STATE_PATH.to_string(),
            detail: e.to_string(),
        }
        .into()
    })
}

/// Persist the whole state document, readable by root only.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub async fn save_state(transport: &impl Transport, state: &State) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(state).context("cannot serialize state")?;
    json.push(b'\n');
    transport
        .write_file(STATE_PATH, &json, 0o600)
        .await
        .context("cannot save state")
}
