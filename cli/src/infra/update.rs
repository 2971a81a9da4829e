//! Update infrastructure: implements `UpdateChecker` using GitHub releases.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::io::Read;

use crate::application::services::self_update::{ChecksumInfo, UpdateChecker, UpdateInfo};

const REPO_OWNER: &str = "pankajbeniwal";
const REPO_NAME: &str = "bunkr";
const BIN_NAME: &str = "bunkr";
const CHECKSUMS_ASSET: &str = "checksums.txt";
const MAX_ASSET_BYTES: u64 = 100 * 1024 * 1024;

/// Uses GitHub releases API to check and apply updates.
pub struct GithubUpdateChecker;

impl UpdateChecker for GithubUpdateChecker {
    fn check(&self, current: &str) -> Result<UpdateInfo> {
        let releases = self_update::backends::github::ReleaseList::configure()
            .repo_owner(REPO_OWNER)
            .repo_name(REPO_NAME)
            .build()
            .context("failed to configure update check")?
            .fetch()
            .context("failed to check for updates")?;

        let Some(latest) = releases.first() else {
            return Ok(UpdateInfo::UpToDate);
        };

        let latest_version = latest.version.trim_start_matches('v');
        let latest_ver = semver::Version::parse(latest_version)
            .with_context(|| format!("invalid release version: {latest_version}"))?;
        let current_ver = semver::Version::parse(current)
            .with_context(|| format!("invalid current version: {current}"))?;
        if latest_ver <= current_ver {
            return Ok(UpdateInfo::UpToDate);
        }

        let asset_name = asset_name(std::env::consts::OS, std::env::consts::ARCH)?;
        let download_url = latest
            .assets
            .iter()
            .find(|a| a.name == asset_name)
            .map(|a| a.download_url.clone())
            .ok_or_else(|| anyhow::anyhow!("no binary found for this platform ({asset_name})"))?;
        let checksums_url = latest
            .assets
            .iter()
            .find(|a| a.name == CHECKSUMS_ASSET)
            .map(|a| a.download_url.clone());

        Ok(UpdateInfo::Available {
            version: latest_version.to_string(),
            release_notes: latest
                .body
                .as_deref()
                .map(parse_release_notes)
                .unwrap_or_default(),
            download_url,
            checksums_url,
        })
    }

    fn verify_checksum(
        &self,
        download_url: &str,
        checksums_url: Option<&str>,
    ) -> Result<ChecksumInfo> {
        let data = download(download_url).context("failed to download release binary")?;
        let actual = hex::encode(Sha256::digest(&data));

        let Some(checksums_url) = checksums_url else {
            return Ok(ChecksumInfo {
                sha256: actual,
                verified: false,
            });
        };
        let listing = download(checksums_url).context("failed to download checksum list")?;
        let listing = String::from_utf8_lossy(&listing);
        let asset = asset_name(std::env::consts::OS, std::env::consts::ARCH)?;
        let expected = expected_checksum(&listing, &asset)
            .ok_or_else(|| anyhow::anyhow!("checksum list has no entry for {asset}"))?;

        anyhow::ensure!(
            actual.eq_ignore_ascii_case(expected),
            "checksum mismatch: expected {expected}, got {actual}"
        );
        Ok(ChecksumInfo {
            sha256: actual,
            verified: true,
        })
    }

    fn perform_update(&self, version: &str) -> Result<()> {
        let target = asset_name(std::env::consts::OS, std::env::consts::ARCH)?;
        let status = self_update::backends::github::Update::configure()
            .repo_owner(REPO_OWNER)
            .repo_name(REPO_NAME)
            .bin_name(BIN_NAME)
            .target(&target)
            .show_download_progress(true)
            .no_confirm(true)
            .current_version(env!("CARGO_PKG_VERSION"))
            .target_version_tag(&format!("v{version}"))
            .build()
            .context("failed to configure update")?
            .update()
            .context("failed to replace binary")?;

        anyhow::ensure!(status.updated(), "update did not complete");
        Ok(())
    }
}

fn download(url: &str) -> Result<Vec<u8>> {
    tracing::debug!(url, "downloading");
    let response = ureq::get(url).call()?;
    let mut data = Vec::new();
    response
        .into_reader()
        .take(MAX_ASSET_BYTES)
        .read_to_end(&mut data)?;
    Ok(data)
}

/// Release asset for a platform, `bunkr_<os>_<arch>` with Go-style names.
pub(crate) fn asset_name(os: &str, arch: &str) -> Result<String> {
    let os = match os {
        "linux" => "linux",
        "macos" => "darwin",
        _ => anyhow::bail!("unsupported platform: {os}-{arch}"),
    };
    let arch = match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        _ => anyhow::bail!("unsupported platform: {os}-{arch}"),
    };
    Ok(format!("{BIN_NAME}_{os}_{arch}"))
}

/// Find `asset` in a `sha256sum`-style listing (`<hex>  <name>` per line).
pub(crate) fn expected_checksum<'a>(listing: &'a str, asset: &str) -> Option<&'a str> {
    listing.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let sum = parts.next()?;
        let name = parts.next()?.trim_start_matches('*');
        (name == asset).then_some(sum)
    })
}

pub(crate) fn parse_release_notes(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim_start)
        .filter_map(|l| l.strip_prefix("- ").or_else(|| l.strip_prefix("* ")))
        .map(str::to_string)
        .take(5)
        .collect()
}
