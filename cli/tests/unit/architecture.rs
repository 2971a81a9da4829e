//! Structural tests for layer boundaries.
//!
//! These scan the source tree so a stray import shows up as a test failure
//! rather than in review.

use std::path::{Path, PathBuf};

fn src(sub: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join(sub)
}

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Non-comment lines outside `#[cfg(test)]` blocks, with their line numbers.
fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut test_start: Option<i32> = None;
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
            test_start = Some(depth);
        }
        let in_test = test_start.is_some();
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if test_start.is_some_and(|start| depth <= start) {
                        test_start = None;
                    }
                }
                _ => {}
            }
        }
        let comment =
            trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*');
        if !in_test && !comment {
            out.push((i + 1, line.to_string()));
        }
    }
    out
}

/// Every production line under `dir` containing one of `forbidden`.
fn violations(dir: &Path, forbidden: &[&str]) -> Vec<String> {
    let mut found = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        for (lineno, line) in production_lines(&file) {
            for pattern in forbidden {
                if line.contains(pattern) {
                    found.push(format!("{rel}:{lineno}: `{pattern}`: {}", line.trim()));
                }
            }
        }
    }
    found
}

#[test]
fn domain_is_pure() {
    let found = violations(
        &src("domain"),
        &[
            "tokio::",
            "std::process",
            "std::fs",
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
        ],
    );
    assert!(
        found.is_empty(),
        "domain/ must not do I/O or depend on outer layers:\n{}",
        found.join("\n")
    );
}

#[test]
fn application_depends_only_on_domain() {
    let found = violations(
        &src("application"),
        &[
            "crate::infra",
            "crate::commands",
            "crate::output",
            "println!",
            "eprintln!",
        ],
    );
    assert!(
        found.is_empty(),
        "application/ must reach the outside world through ports:\n{}",
        found.join("\n")
    );
}

#[test]
fn infra_does_not_render() {
    let found = violations(
        &src("infra"),
        &["crate::commands", "crate::output", "println!"],
    );
    assert!(
        found.is_empty(),
        "infra/ must not print or depend on commands:\n{}",
        found.join("\n")
    );
}

#[test]
fn no_inline_json_branching_in_commands() {
    let mut found = violations(&src("commands"), &["json: bool", "serde_json::"]);
    for file in collect_rs_files(&src("commands")) {
        for (lineno, line) in production_lines(&file) {
            let trimmed = line.trim();
            if trimmed.starts_with("if json") || trimmed.starts_with("if !json") {
                found.push(format!("{}:{lineno}: {trimmed}", file.display()));
            }
        }
    }
    assert!(
        found.is_empty(),
        "commands/ must render through app.renderer():\n{}",
        found.join("\n")
    );
}

#[test]
fn commands_do_not_build_transports() {
    let found = violations(
        &src("commands"),
        &["SshTransport::", "LocalTransport::", "HostTransport::"],
    );
    assert!(
        found.is_empty(),
        "commands/ must get the transport from AppContext:\n{}",
        found.join("\n")
    );
}
