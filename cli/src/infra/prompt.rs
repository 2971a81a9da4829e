//! `Prompter` on the operator's terminal.

use dialoguer::{Input, Password};

use crate::application::ports::Prompter;
use crate::domain::error::PromptError;
use crate::domain::recipe::Prompt;

/// Asks with `dialoguer`, hiding secret input.
///
/// A non-interactive prompter never asks; resolution then relies on presets
/// and defaults.
#[derive(Debug, Clone, Copy)]
pub struct DialoguerPrompter {
    interactive: bool,
}

impl DialoguerPrompter {
    #[must_use]
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

fn label(prompt: &Prompt) -> &str {
    if prompt.label.is_empty() {
        &prompt.key
    } else {
        &prompt.label
    }
}

impl Prompter for DialoguerPrompter {
    fn ask(&self, prompt: &Prompt) -> Result<Option<String>, PromptError> {
        if !self.interactive {
            return Ok(None);
        }
        let interaction = |e: dialoguer::Error| PromptError::Interaction(e.to_string());

        let answer = if prompt.secret {
            Password::new()
                .with_prompt(label(prompt))
                .allow_empty_password(true)
                .interact()
                .map_err(interaction)?
        } else {
            let mut input = Input::<String>::new()
                .with_prompt(label(prompt))
                .allow_empty(true);
            if !prompt.default.is_empty() {
                input = input.default(prompt.default.clone());
            }
            input.interact_text().map_err(interaction)?
        };
        Ok(Some(answer))
    }
}
