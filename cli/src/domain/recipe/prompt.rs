//! Resolution of prompt answers: presets, defaults and required checks.

use std::collections::BTreeMap;

use super::Prompt;
use crate::domain::error::PromptError;

/// Prompt answers keyed by prompt key.
pub type Answers = BTreeMap<String, String>;

/// Parse `KEY=VALUE` pairs given on the command line.
///
/// # Errors
///
/// Returns [`PromptError::InvalidPreset`] for an entry without `=` or with an
/// empty key.
pub fn parse_presets(pairs: &[String]) -> Result<Answers, PromptError> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
            _ => Err(PromptError::InvalidPreset(pair.clone())),
        })
        .collect()
}

/// Collect an answer for every prompt, in order.
///
/// A preset answer wins over asking. `ask` returns `Ok(None)` when the
/// session cannot ask (non-interactive). Answers are trimmed; an empty answer
/// falls back to the prompt default, and an empty required answer without a
/// default is an error.
///
/// # Errors
///
/// Returns a [`PromptError`] for missing required answers or when `ask` fails.
pub fn resolve_prompts<F>(
    prompts: &[Prompt],
    presets: &Answers,
    mut ask: F,
) -> Result<Answers, PromptError>
where
    F: FnMut(&Prompt) -> Result<Option<String>, PromptError>,
{
    let mut answers = Answers::new();
    for prompt in prompts {
        let (raw, asked) = match presets.get(&prompt.key) {
            Some(v) => (Some(v.clone()), false),
            None => {
                let answer = ask(prompt)?;
                let asked = answer.is_some();
                (answer, asked)
            }
        };

        let mut value = raw.map(|v| v.trim().to_string()).unwrap_or_default();
        if value.is_empty() && !prompt.default.is_empty() {
            value.clone_from(&prompt.default);
        }
        if value.is_empty() && prompt.required {
            let key = prompt.key.clone();
            let label = if prompt.label.is_empty() {
                prompt.key.clone()
            } else {
                prompt.label.clone()
            };
            return Err(if asked || presets.contains_key(&prompt.key) {
                PromptError::Required { key, label }
            } else {
                PromptError::MissingAnswer { key, label }
            });
        }
        answers.insert(prompt.key.clone(), value);
    }
    Ok(answers)
}
