//! Dependency installation
//!
//! Drives the virtual environment's pip through the sequence the upstream
//! project needs. The order is load-bearing: the native `torchmcubes` build
//! must compile against the CPU torch wheels before the CUDA build is
//! swapped in for inference, and numpy has to be pinned below 2.0 last so
//! no later install bumps it back up.
//!
//! Two modes: **online** populates the local wheel cache before installing;
//! **offline** installs exclusively from that cache with `--no-index` and
//! fails fast when the cache is empty. The one package that needs native
//! compilation failing to build is a warning, not an abort; the rest of the
//! environment is still usable through the upstream's fallback
//! implementation.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, warn};
use tripo_shared::{paths, Result, SetupError};
use walkdir::WalkDir;

use crate::interpreter::ResolvedInterpreter;

/// Index serving CPU-only torch wheels, used while torchmcubes compiles
pub const TORCH_CPU_INDEX: &str = "https://download.pytorch.org/whl/cpu";

/// Index serving the CUDA torch wheels used for inference.
///
/// Hardcoded and pinned to cu121 like the rest of the stack; if the index
/// goes stale the CUDA swap degrades to a warning and the CPU build stays.
pub const TORCH_CUDA_INDEX: &str = "https://download.pytorch.org/whl/cu121";

const TORCH_PACKAGES: [&str; 3] = ["torch", "torchvision", "torchaudio"];

/// Known-bad upstream pin: this transformers release pulls a tokenizers
/// version with no prebuilt wheels for Python 3.12.
const BAD_TRANSFORMERS_PIN: &str = "transformers==4.35.0";
const FIXED_TRANSFORMERS_PIN: &str = "transformers>=4.39.0";

/// Packages installed outside requirements.txt that the offline install
/// expects to find in the wheel cache.
pub const CACHE_EXTRA_PACKAGES: [&str; 3] = ["onnxruntime", "gradio", "numpy<2.0"];

/// Install mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// Download into the wheel cache, then install (network required)
    Online,
    /// Install exclusively from the wheel cache (`--no-index`)
    Offline,
}

/// Install the full dependency set into the project's virtual environment
pub async fn install_dependencies(
    root: &Path,
    interpreter: &ResolvedInterpreter,
    mode: InstallMode,
) -> Result<()> {
    let requirements = paths::requirements_file(root);
    if !requirements.exists() {
        return Err(SetupError::install(
            "requirements",
            format!(
                "{} not found; the vendor checkout looks incomplete",
                requirements.display()
            ),
        ));
    }

    ensure_venv(root, interpreter).await?;
    let python = paths::venv_python(root);

    if patch_requirements(&requirements) {
        println!(
            "Patched requirements.txt to use {} instead of {}.",
            FIXED_TRANSFORMERS_PIN, BAD_TRANSFORMERS_PIN
        );
    }

    match mode {
        InstallMode::Offline => install_offline(root, &python, &requirements).await,
        InstallMode::Online => install_online(root, &python, &requirements).await,
    }
}

/// Create `.venv` with the resolved interpreter if it does not exist yet
async fn ensure_venv(root: &Path, interpreter: &ResolvedInterpreter) -> Result<()> {
    let python = paths::venv_python(root);
    if python.exists() {
        debug!("virtual environment already present at {}", python.display());
        return Ok(());
    }

    println!("Creating virtual environment...");
    let status = interpreter
        .command()
        .arg("-m")
        .arg("venv")
        .arg(paths::venv_dir(root))
        .status()
        .await
        .map_err(|e| SetupError::install("venv", e.to_string()))?;
    if !status.success() {
        return Err(SetupError::install(
            "venv",
            format!(
                "`{} -m venv` exited with code {}",
                interpreter.describe(),
                status.code().unwrap_or(1)
            ),
        ));
    }
    Ok(())
}

/// Run the venv's pip with the given arguments, returning whether it
/// exited zero. Spawning failures (pip itself missing) are fatal.
async fn pip(python: &Path, args: &[String]) -> Result<bool> {
    debug!("pip {}", args.join(" "));
    let status = Command::new(python)
        .arg("-m")
        .arg("pip")
        .args(args)
        .status()
        .await
        .map_err(|e| SetupError::install("pip", e.to_string()))?;
    Ok(status.success())
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| (*s).to_string()).collect()
}

async fn install_online(root: &Path, python: &Path, requirements: &Path) -> Result<()> {
    let requirements_arg = requirements.display().to_string();
    let marker = paths::torchmcubes_marker(root);
    let skip_torch_swap = marker.exists();
    if skip_torch_swap {
        println!("torchmcubes marker found; skipping torch CPU/CUDA reinstall steps.");
    }

    if !skip_torch_swap {
        // CPU wheels first so the torchmcubes native build does not link
        // against the CUDA runtime.
        println!("Installing CPU build of torch/torchvision/torchaudio (force reinstall)...");
        let mut args = owned(&["install", "--force-reinstall", "--no-deps"]);
        args.extend(TORCH_PACKAGES.iter().map(|s| (*s).to_string()));
        args.extend(owned(&["--index-url", TORCH_CPU_INDEX]));
        if !pip(python, &args).await? {
            return Err(SetupError::install(
                "torch-cpu",
                "pip returned non-zero installing the CPU torch build",
            ));
        }
    }

    println!("Installing transformers/tokenizers compatible with Python 3.12...");
    if !pip(
        python,
        &owned(&["install", FIXED_TRANSFORMERS_PIN, "tokenizers>=0.15.0"]),
    )
    .await?
    {
        warn!("transformers/tokenizers pre-install failed");
        println!("WARNING: failed to pre-install transformers/tokenizers; continuing anyway.");
    }

    // Populate the wheel cache so a later `tripo setup --offline` can work.
    let cache = paths::wheel_cache_dir(root);
    std::fs::create_dir_all(&cache)?;
    println!("Downloading wheels into {}...", cache.display());
    let args = wheel_download_args(&cache, requirements);
    if !pip(python, &args).await? {
        // torchmcubes ships no prebuilt wheel; a partial cache is expected.
        warn!("wheel download returned non-zero");
        println!("WARNING: some wheels failed to download; offline installs may be incomplete.");
    }

    println!("Installing requirements from requirements.txt...");
    if !pip(python, &owned(&["install", "-r", &requirements_arg])).await? {
        return Err(SetupError::install(
            "requirements",
            "pip returned non-zero installing the upstream requirements",
        ));
    }

    probe_torchmcubes(root, python).await;

    println!("Ensuring onnxruntime is installed (rembg inference backend)...");
    if !pip(python, &owned(&["install", "onnxruntime"])).await? {
        warn!("onnxruntime install failed");
        println!("WARNING: failed to install onnxruntime; background removal may not work.");
    }

    println!("Ensuring gradio is installed (browser GUI)...");
    if !pip(python, &owned(&["install", "gradio"])).await? {
        return Err(SetupError::install(
            "gradio",
            "pip returned non-zero installing gradio",
        ));
    }

    if !skip_torch_swap {
        println!("Re-installing CUDA (cu121) build of torch/torchvision/torchaudio...");
        let mut args = owned(&["install", "--force-reinstall", "--no-deps"]);
        args.extend(TORCH_PACKAGES.iter().map(|s| (*s).to_string()));
        args.extend(owned(&["--index-url", TORCH_CUDA_INDEX]));
        if !pip(python, &args).await? {
            warn!("CUDA torch install failed");
            println!("WARNING: failed to install the CUDA torch build; the CPU build will be used.");
        }
    }

    println!("Pinning numpy below 2.0 (trimesh compatibility)...");
    if !pip(
        python,
        &owned(&["install", "--force-reinstall", "--no-deps", "numpy<2.0"]),
    )
    .await?
    {
        return Err(SetupError::install(
            "numpy",
            "pip returned non-zero pinning numpy below 2.0",
        ));
    }

    Ok(())
}

async fn install_offline(root: &Path, python: &Path, requirements: &Path) -> Result<()> {
    let cache = paths::wheel_cache_dir(root);
    ensure_wheel_cache_populated(&cache)?;

    let cache_arg = cache.display().to_string();
    let requirements_arg = requirements.display().to_string();

    println!("Installing from local wheel cache (no network access)...");
    if !pip(
        python,
        &owned(&[
            "install",
            "--no-index",
            "--find-links",
            &cache_arg,
            "-r",
            &requirements_arg,
        ]),
    )
    .await?
    {
        return Err(SetupError::install(
            "offline-requirements",
            "pip returned non-zero installing the upstream requirements from the wheel cache",
        ));
    }

    if !pip(
        python,
        &owned(&["install", "--no-index", "--find-links", &cache_arg, "onnxruntime"]),
    )
    .await?
    {
        warn!("offline onnxruntime install failed");
        println!("WARNING: onnxruntime not available in the wheel cache; background removal may not work.");
    }

    if !pip(
        python,
        &owned(&["install", "--no-index", "--find-links", &cache_arg, "gradio"]),
    )
    .await?
    {
        return Err(SetupError::install(
            "gradio",
            "gradio not available in the wheel cache",
        ));
    }

    Ok(())
}

/// Probe whether torchmcubes imports; write the marker file on success so
/// later runs skip the torch reinstall steps. Failure is a warning, the
/// upstream fallback implementation takes over.
async fn probe_torchmcubes(root: &Path, python: &Path) {
    let importable = Command::new(python)
        .args(["-c", "import torchmcubes"])
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false);

    if importable {
        match std::fs::write(paths::torchmcubes_marker(root), "ok") {
            Ok(()) => println!("torchmcubes import successful; marker file written."),
            Err(e) => warn!("could not write torchmcubes marker: {}", e),
        }
    } else {
        println!(
            "WARNING: torchmcubes import failed after installation; the fallback implementation will be used."
        );
    }
}

/// Build the `pip download` invocation that populates the wheel cache.
///
/// Covers both the requirements.txt set and the packages installed as
/// separate steps, so an offline install sees the same pinned set the
/// online one installs.
pub fn wheel_download_args(cache: &Path, requirements: &Path) -> Vec<String> {
    let mut args = owned(&[
        "download",
        "--dest",
        &cache.display().to_string(),
        "-r",
        &requirements.display().to_string(),
    ]);
    args.extend(CACHE_EXTRA_PACKAGES.iter().map(|s| (*s).to_string()));
    args
}

/// Offline fast-fail: verify the wheel cache actually holds wheels before
/// any install is attempted.
pub fn ensure_wheel_cache_populated(cache: &Path) -> Result<()> {
    let wheels = WalkDir::new(cache)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "whl")
                .unwrap_or(false)
        })
        .count();

    if wheels == 0 {
        return Err(SetupError::EmptyWheelCache {
            dir: cache.to_path_buf(),
        });
    }
    debug!("wheel cache holds {} wheels", wheels);
    Ok(())
}

/// Rewrite the known-bad transformers pin in the upstream requirements.
///
/// Returns whether the file was changed. Read or write failures keep the
/// upstream file as-is and only warn; a broken patch must not block the
/// install.
pub fn patch_requirements(requirements: &Path) -> bool {
    let text = match std::fs::read_to_string(requirements) {
        Ok(text) => text,
        Err(e) => {
            warn!("could not read {}: {}", requirements.display(), e);
            return false;
        }
    };

    if !text.contains(BAD_TRANSFORMERS_PIN) {
        return false;
    }

    let patched = text.replace(BAD_TRANSFORMERS_PIN, FIXED_TRANSFORMERS_PIN);
    match std::fs::write(requirements, patched) {
        Ok(()) => true,
        Err(e) => {
            warn!("could not write {}: {}", requirements.display(), e);
            println!("WARNING: failed to patch requirements.txt; using the upstream pin.");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_patch_rewrites_only_the_bad_pin() {
        let dir = TempDir::new().unwrap();
        let req = dir.path().join("requirements.txt");
        std::fs::write(&req, "omegaconf==2.3.0\ntransformers==4.35.0\ntrimesh\n").unwrap();

        assert!(patch_requirements(&req));
        let text = std::fs::read_to_string(&req).unwrap();
        assert!(text.contains("transformers>=4.39.0"));
        assert!(!text.contains("transformers==4.35.0"));
        assert!(text.contains("omegaconf==2.3.0"));
        assert!(text.contains("trimesh"));
    }

    #[test]
    fn test_patch_leaves_clean_files_alone() {
        let dir = TempDir::new().unwrap();
        let req = dir.path().join("requirements.txt");
        let original = "transformers>=4.39.0\ntrimesh\n";
        std::fs::write(&req, original).unwrap();

        assert!(!patch_requirements(&req));
        assert_eq!(std::fs::read_to_string(&req).unwrap(), original);
    }

    #[test]
    fn test_patch_missing_file_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        assert!(!patch_requirements(&dir.path().join("nope.txt")));
    }

    #[test]
    fn test_wheel_download_covers_separately_installed_packages() {
        let args = wheel_download_args(Path::new("wheels"), Path::new("requirements.txt"));
        assert_eq!(args[0], "download");
        assert!(args.contains(&"-r".to_string()));
        assert!(args.contains(&"requirements.txt".to_string()));
        // gradio and onnxruntime are not pinned by requirements.txt, and
        // the offline install treats a missing gradio wheel as fatal.
        assert!(args.contains(&"gradio".to_string()));
        assert!(args.contains(&"onnxruntime".to_string()));
        assert!(args.contains(&"numpy<2.0".to_string()));
    }

    #[test]
    fn test_empty_wheel_cache_detected() {
        let dir = TempDir::new().unwrap();
        let err = ensure_wheel_cache_populated(dir.path()).unwrap_err();
        assert!(matches!(err, SetupError::EmptyWheelCache { .. }));
    }

    #[test]
    fn test_populated_wheel_cache_passes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("numpy-1.26.4-cp312-none-any.whl"), b"x").unwrap();
        assert!(ensure_wheel_cache_populated(dir.path()).is_ok());
    }

    #[test]
    fn test_non_wheel_files_do_not_count() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.txt"), b"not a wheel").unwrap();
        let err = ensure_wheel_cache_populated(dir.path()).unwrap_err();
        assert!(matches!(err, SetupError::EmptyWheelCache { .. }));
    }
}
