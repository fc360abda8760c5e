//! Vendor checkout acquisition
//!
//! Ensures `vendor/TripoSR` holds the upstream sources. Primary acquisition
//! is a git clone; if that fails (no network path to the git endpoint,
//! proxy restrictions, libgit2 transport issues) the fallback downloads the
//! fixed branch archive and extracts it, renaming the archive's top-level
//! directory to the expected vendor name. Download, extraction and rename
//! each fail with their own error variant so the operator can tell which
//! step broke.
//!
//! When the checkout already exists, an update is attempted best-effort: a
//! fetch plus fast-forward. Any update failure is a warning, never an abort.

use std::path::{Path, PathBuf};

use git2::Repository;
use tracing::{info, warn};
use tripo_shared::{paths, Result, SetupError};

use crate::fetch;

/// Upstream repository for git acquisition
pub const UPSTREAM_GIT_URL: &str = "https://github.com/VAST-AI-Research/TripoSR.git";

/// Fixed branch archive for the no-git fallback
pub const UPSTREAM_ZIP_URL: &str =
    "https://github.com/VAST-AI-Research/TripoSR/archive/refs/heads/main.zip";

/// Top-level directory name inside the branch archive
const ARCHIVE_TOP_LEVEL: &str = "TripoSR-main";

/// Branch tracked by both acquisition paths
const UPSTREAM_BRANCH: &str = "main";

/// Ensure the vendor directory exists and return its path.
///
/// Existing checkouts are updated best-effort; absent ones are cloned, with
/// the archive fallback behind the clone. With `offline` set, no network is
/// touched: an existing checkout is used as-is, and an absent one is a
/// typed failure instead of a doomed clone attempt.
pub async fn ensure_vendor_dir(root: &Path, offline: bool) -> Result<PathBuf> {
    let vendor = paths::vendor_dir(root);

    if vendor.exists() {
        if offline {
            println!("Offline mode: using existing vendor checkout without updating.");
        } else {
            update_vendor(&vendor);
        }
        return Ok(vendor);
    }

    if offline {
        return Err(SetupError::not_ready(
            format!("vendor checkout missing at {}", vendor.display()),
            "Run `tripo setup` online once to acquire the upstream sources",
        ));
    }

    std::fs::create_dir_all(paths::vendor_parent(root))?;

    info!("cloning {}", UPSTREAM_GIT_URL);
    println!("Cloning upstream TripoSR (this can take a minute)...");
    match Repository::clone(UPSTREAM_GIT_URL, &vendor) {
        Ok(_) => {
            println!("Cloned upstream TripoSR into {}", vendor.display());
            Ok(vendor)
        }
        Err(e) => {
            warn!("git clone failed: {}", e);
            println!("WARNING: git clone failed ({}), falling back to archive download", e);
            // A failed clone can leave a partial directory behind; the
            // rename step requires the target to be absent.
            if vendor.exists() {
                std::fs::remove_dir_all(&vendor)?;
            }
            fetch_archive(root, &vendor).await?;
            Ok(vendor)
        }
    }
}

/// Best-effort update of an existing checkout. Failures are warnings only;
/// the bootstrap continues with whatever is on disk.
fn update_vendor(vendor: &Path) {
    match try_fast_forward(vendor) {
        Ok(summary) => println!("Vendor checkout: {}", summary),
        Err(e) => {
            warn!("vendor update failed: {}", e);
            println!(
                "WARNING: could not update vendor checkout ({}); continuing with existing sources",
                e
            );
        }
    }
}

fn try_fast_forward(vendor: &Path) -> std::result::Result<String, git2::Error> {
    let repo = Repository::open(vendor)?;
    let mut remote = repo.find_remote("origin")?;
    remote.fetch(&[UPSTREAM_BRANCH], None, None)?;

    let fetch_head = repo.find_reference("FETCH_HEAD")?;
    let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _) = repo.merge_analysis(&[&fetch_commit])?;

    if analysis.is_up_to_date() {
        return Ok("already up to date".to_string());
    }
    if analysis.is_fast_forward() {
        let refname = format!("refs/heads/{}", UPSTREAM_BRANCH);
        let mut reference = repo.find_reference(&refname)?;
        reference.set_target(fetch_commit.id(), "fast-forward")?;
        repo.set_head(&refname)?;
        repo.checkout_head(Some(git2::build::CheckoutBuilder::default().force()))?;
        return Ok(format!("fast-forwarded to origin/{}", UPSTREAM_BRANCH));
    }
    Err(git2::Error::from_str(
        "local checkout diverged from upstream",
    ))
}

/// Archive fallback: download the fixed branch zip, extract it next to the
/// vendor directory, and rename the extracted tree into place.
async fn fetch_archive(root: &Path, vendor: &Path) -> Result<()> {
    let staging = paths::vendor_parent(root);
    std::fs::create_dir_all(&staging)?;

    let archive_path = staging.join("triposr-main.zip");
    let client = reqwest::Client::new();
    fetch::download_to(&client, UPSTREAM_ZIP_URL, &archive_path, None).await?;

    extract_archive(&archive_path, &staging)?;
    // The archive served its purpose; its removal failing is immaterial.
    let _ = std::fs::remove_file(&archive_path);

    rename_extracted(&staging.join(ARCHIVE_TOP_LEVEL), vendor)?;
    println!("Extracted upstream TripoSR into {}", vendor.display());
    Ok(())
}

/// Extract a zip archive into `dest`
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file =
        std::fs::File::open(archive).map_err(|e| SetupError::extract(archive, e.to_string()))?;
    let mut zip =
        zip::ZipArchive::new(file).map_err(|e| SetupError::extract(archive, e.to_string()))?;
    zip.extract(dest)
        .map_err(|e| SetupError::extract(archive, e.to_string()))?;
    Ok(())
}

/// Rename the extracted top-level directory to the expected vendor name
pub fn rename_extracted(from: &Path, to: &Path) -> Result<()> {
    std::fs::rename(from, to).map_err(|e| SetupError::rename(from, to, e.to_string()))
}
