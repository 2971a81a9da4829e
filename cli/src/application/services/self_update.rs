//! Application service: replace the running bunkr binary with the latest release.

use anyhow::Result;

use crate::application::ports::ProgressReporter;

// ── Public types ──────────────────────────────────────────────────────────────

/// Information about an available update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateInfo {
    /// A newer version is available.
    Available {
        /// The new version string (without leading `v`).
        version: String,
        /// Up to 5 bullet-point release notes.
        release_notes: Vec<String>,
        /// Direct download URL for the platform binary.
        download_url: String,
        /// Checksum list published with the release, if any.
        checksums_url: Option<String>,
    },
    /// Already on the latest version.
    UpToDate,
}

/// Checksum verification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumInfo {
    /// Hex-encoded SHA-256 of the downloaded binary.
    pub sha256: String,
    /// False when the release publishes no checksum for it.
    pub verified: bool,
}

/// Abstraction over the update backend, enabling test doubles.
pub trait UpdateChecker {
    /// Check whether a newer version is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the release list cannot be fetched or parsed.
    fn check(&self, current: &str) -> Result<UpdateInfo>;

    /// Download the binary and compare it with the release checksum list.
    ///
    /// # Errors
    ///
    /// Returns an error on a download failure or checksum mismatch.
    fn verify_checksum(&self, download_url: &str, checksums_url: Option<&str>)
    -> Result<ChecksumInfo>;

    /// Download and replace the current binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the download or binary replacement fails.
    fn perform_update(&self, version: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfUpdateOutcome {
    UpToDate,
    /// `--check` found a newer version and left the binary alone.
    Available { version: String },
    Updated { version: String },
}

/// Check for a newer release and, unless `check_only`, install it.
///
/// # Errors
///
/// Returns an error if the check, verification or replacement fails.
pub fn self_update(
    checker: &impl UpdateChecker,
    reporter: &impl ProgressReporter,
    current: &str,
    check_only: bool,
) -> Result<SelfUpdateOutcome> {
    reporter.header("Checking for updates...");
    let UpdateInfo::Available {
        version,
        release_notes,
        download_url,
        checksums_url,
    } = checker.check(current)?
    else {
        reporter.success(&format!("Already at latest version ({current})"));
        return Ok(SelfUpdateOutcome::UpToDate);
    };

    reporter.step(&format!("New version available: {current} → {version}"));
    for note in &release_notes {
        reporter.step(&format!("  • {note}"));
    }
    if check_only {
        reporter.step("Run 'bunkr self-update' to apply the update.");
        return Ok(SelfUpdateOutcome::Available { version });
    }

    reporter.step("Downloading...");
    let checksum = checker.verify_checksum(&download_url, checksums_url.as_deref())?;
    if checksum.verified {
        reporter.success(&format!("SHA-256 verified: {}", checksum.sha256));
    } else {
        reporter.warn("Release publishes no checksum, skipping verification");
    }

    checker.perform_update(&version)?;
    reporter.success(&format!("Updated to {version}"));
    Ok(SelfUpdateOutcome::Updated { version })
}
