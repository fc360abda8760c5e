//! Pretrained weights download
//!
//! Fetches the published TripoSR checkpoint and its config from the Hugging
//! Face repository into the local models directory. Each downloaded file
//! gets a `.sha256` sidecar recording its digest; on later runs a file whose
//! digest still matches its sidecar is skipped, and a mismatch triggers a
//! re-download. A bearer token is taken from the CLI flag or the usual
//! Hugging Face environment variables.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Result as AnyhowResult;
use sha2::{Digest, Sha256};
use tracing::warn;
use tripo_shared::{paths, Result};

use crate::fetch;

/// Hugging Face repository publishing the pretrained checkpoint
pub const WEIGHTS_REPO: &str = "stabilityai/TripoSR";

/// Files the upstream inference pipeline expects locally
const WEIGHT_FILES: [&str; 2] = ["model.ckpt", "config.yaml"];

/// Download the pretrained weights into `<root>/models/TripoSR`
pub async fn download_weights(root: &Path, token: Option<String>) -> Result<()> {
    let dest = paths::models_dir(root);
    tokio::fs::create_dir_all(&dest).await?;

    let token = token.or_else(hf_token_from_env);

    let client = reqwest::Client::new();
    for file in WEIGHT_FILES {
        let target = dest.join(file);
        if target.exists() && verified_by_sidecar(&target) {
            println!("{} already present and verified; skipping download.", file);
            continue;
        }

        let url = format!(
            "https://huggingface.co/{}/resolve/main/{}",
            WEIGHTS_REPO, file
        );
        fetch::download_to(&client, &url, &target, token.as_deref()).await?;
        record_digest(&target);
    }

    println!("Weights ready in {}", dest.display());
    Ok(())
}

/// Token lookup mirroring the Hugging Face tooling conventions
fn hf_token_from_env() -> Option<String> {
    for var in ["HF_TOKEN", "HUGGINGFACE_HUB_TOKEN"] {
        if let Ok(token) = std::env::var(var) {
            let token = token.trim().to_string();
            if !token.is_empty() {
                println!("Using Hugging Face token from {} environment variable", var);
                return Some(token);
            }
        }
    }
    None
}

/// Hex-encoded sha256 of a file's contents
pub fn file_digest(path: &Path) -> AnyhowResult<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

fn sidecar_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Whether the file's digest matches its recorded sidecar
fn verified_by_sidecar(target: &Path) -> bool {
    let recorded = match std::fs::read_to_string(sidecar_path(target)) {
        Ok(recorded) => recorded.trim().to_string(),
        Err(_) => return false,
    };

    match file_digest(target) {
        Ok(actual) if actual == recorded => true,
        Ok(_) => {
            warn!("digest mismatch for {}", target.display());
            println!(
                "WARNING: {} does not match its recorded digest; re-downloading.",
                target.display()
            );
            false
        }
        Err(e) => {
            warn!("could not hash {}: {}", target.display(), e);
            false
        }
    }
}

/// Record the file's digest in its sidecar. Sidecar write failures only
/// cost a skip-check on the next run.
fn record_digest(target: &Path) {
    match file_digest(target) {
        Ok(digest) => {
            if let Err(e) = std::fs::write(sidecar_path(target), format!("{}\n", digest)) {
                warn!("could not write digest sidecar: {}", e);
            }
        }
        Err(e) => warn!("could not hash {}: {}", target.display(), e),
    }
}
