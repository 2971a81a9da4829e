//! Environment values: secret generation, `${KEY}` templating, `.env` files.

use std::collections::BTreeMap;

use rand::RngCore;

/// Sentinel replaced by 32 random hex characters.
pub const AUTO_GENERATE_32: &str = "auto_generate_32";
/// Sentinel replaced by 64 random hex characters.
pub const AUTO_GENERATE_64: &str = "auto_generate_64";

/// Whether `value` is one of the auto-generate sentinels.
#[must_use]
pub fn is_auto_generate(value: &str) -> bool {
    value == AUTO_GENERATE_32 || value == AUTO_GENERATE_64
}

/// Replace sentinel values with fresh random hex strings.
///
/// Only exact matches are replaced; everything else is copied through.
#[must_use]
pub fn expand_auto_generate(env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    env.iter()
        .map(|(k, v)| {
            let value = match v.as_str() {
                AUTO_GENERATE_32 => random_hex(16),
                AUTO_GENERATE_64 => random_hex(32),
                _ => v.clone(),
            };
            (k.clone(), value)
        })
        .collect()
}

/// Reuse values generated by an earlier install.
///
/// A sentinel in `env` whose key has a non-empty value in `previous` takes
/// that value; remaining sentinels are generated fresh.
#[must_use]
pub fn carry_generated(
    env: &BTreeMap<String, String>,
    previous: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let carried = env
        .iter()
        .map(|(k, v)| match previous.get(k) {
            Some(old) if is_auto_generate(v) && !old.is_empty() => (k.clone(), old.clone()),
            _ => (k.clone(), v.clone()),
        })
        .collect();
    expand_auto_generate(&carried)
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Substitute `${KEY}` for every key in `values`.
///
/// Placeholders without a matching key are left verbatim.
#[must_use]
pub fn expand_template(template: &str, values: &BTreeMap<String, String>) -> String {
    values.iter().fold(template.to_string(), |acc, (k, v)| {
        acc.replace(&format!("${{{k}}}"), v)
    })
}

/// Render `KEY=VALUE` lines sorted by key, newline terminated.
#[must_use]
pub fn generate_env(values: &BTreeMap<String, String>) -> String {
    values.iter().fold(String::new(), |mut out, (k, v)| {
        out.push_str(k);
        out.push('=');
        out.push_str(v);
        out.push('\n');
        out
    })
}

/// Read back a file produced by [`generate_env`].
///
/// Blank lines and `#` comments are skipped; values keep everything after
/// the first `=`.
#[must_use]
pub fn parse_env(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .collect()
}
