//! Caddyfile editing.
//!
//! Each app owns one site block fenced by `# bunkr:<name>` and
//! `# /bunkr:<name>` marker lines. Text outside the markers is never touched.

/// Location of the Caddyfile on the target.
pub const CADDYFILE_PATH: &str = "/etc/caddy/Caddyfile";

/// First line of a Caddyfile bunkr has taken over.
pub const MANAGED_HEADER: &str = "# Managed by bunkr\n";

fn start_marker(name: &str) -> String {
    format!("# bunkr:{name}")
}

fn end_marker(name: &str) -> String {
    format!("# /bunkr:{name}")
}

/// Render the site block for one app, without a trailing newline.
#[must_use]
pub fn render_block(name: &str, domain: &str, port: u16) -> String {
    format!(
        "{}\n{domain} {{\n    reverse_proxy localhost:{port}\n}}\n{}",
        start_marker(name),
        end_marker(name)
    )
}

/// Replacement content for a Caddyfile bunkr does not manage yet.
///
/// Returns `None` when `existing` already carries the managed header or a
/// bunkr block. A missing file and the distribution's stock file both get
/// replaced by the bare header.
#[must_use]
pub fn ensure_header(existing: Option<&str>) -> Option<String> {
    match existing {
        Some(content)
            if content.contains(MANAGED_HEADER.trim_end()) || content.contains("# bunkr:") =>
        {
            None
        }
        _ => Some(MANAGED_HEADER.to_string()),
    }
}

/// Whether `content` holds a block for `name`.
#[must_use]
pub fn has_block(content: &str, name: &str) -> bool {
    let marker = start_marker(name);
    content.lines().any(|l| l.trim() == marker)
}

/// Add (or replace) the block for `name`.
#[must_use]
pub fn add_block(existing: &str, name: &str, domain: &str, port: u16) -> String {
    let mut out = remove_block(existing, name);
    let block = render_block(name, domain, port);
    if out.is_empty() || out.ends_with('\n') {
        out.push_str(&block);
        out.push('\n');
    } else {
        out.push('\n');
        out.push_str(&block);
    }
    out
}

/// Drop every line from the start marker of `name` through its end marker.
///
/// Content without the block comes back unchanged.
#[must_use]
pub fn remove_block(existing: &str, name: &str) -> String {
    let start = start_marker(name);
    let end = end_marker(name);
    let mut inside = false;
    let mut kept = Vec::new();
    for line in existing.split('\n') {
        let trimmed = line.trim();
        if trimmed == start {
            inside = true;
        } else if trimmed == end {
            inside = false;
        } else if !inside {
            kept.push(line);
        }
    }
    kept.join("\n")
}
