//! POSIX shell quoting for commands sent to the target.

/// Quote `s` as a single POSIX shell word.
///
/// Plain words made of safe characters are returned as-is.
#[must_use]
pub fn quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
