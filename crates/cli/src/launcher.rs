//! Launching the vendored reconstruction scripts
//!
//! Verifies the prepared environment exists, spawns the upstream CLI or GUI
//! through the virtual environment's interpreter, and mirrors the child's
//! exit code as our own. No retries, no timeouts; the child owns the
//! terminal until it exits.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::info;
use tripo_shared::{paths, Result, SetupError};

/// Mesh output format passed to the upstream CLI
pub const DEFAULT_MESH_FORMAT: &str = "obj";

/// Run single-image reconstruction through `vendor/TripoSR/run.py`.
///
/// Returns the child's exit code; the caller exits the process with it.
pub async fn run_inference(
    root: &Path,
    image: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    mesh_format: &str,
) -> Result<i32> {
    let python = ready_python(root)?;
    let entry = ready_entry_point(root, paths::cli_entry_point(root))?;

    let image = resolve_input_image(root, image);
    let output_dir = output_dir.unwrap_or_else(|| paths::output_dir(root));
    std::fs::create_dir_all(&output_dir)?;

    let mut cmd = Command::new(&python);
    cmd.arg(&entry)
        .arg(&image)
        .arg("--output-dir")
        .arg(&output_dir)
        .arg("--model-save-format")
        .arg(mesh_format);

    // Point the upstream at local weights when they have been downloaded;
    // otherwise it fetches from the hub itself on first run.
    let weights = paths::models_dir(root);
    if weights.join("model.ckpt").exists() {
        cmd.arg("--pretrained-model-name-or-path").arg(&weights);
    }

    println!("Reconstructing {} ...", image.display());
    mirror_child(cmd, "reconstruction").await
}

/// Launch the upstream browser GUI (`gradio_app.py`).
pub async fn run_gui(root: &Path) -> Result<i32> {
    let python = ready_python(root)?;
    let entry = ready_entry_point(root, paths::gui_entry_point(root))?;

    let mut cmd = Command::new(&python);
    cmd.arg(&entry);

    println!("Launching browser GUI (Ctrl-C to stop)...");
    mirror_child(cmd, "GUI").await
}

/// The input image to reconstruct: the operator's, or the bundled example
/// when none was given.
pub fn resolve_input_image(root: &Path, image: Option<PathBuf>) -> PathBuf {
    match image {
        Some(image) => image,
        None => {
            let example = paths::example_image(root);
            println!("No image given; using bundled example {}", example.display());
            example
        }
    }
}

/// Success/failure banner for a child exit code
pub fn exit_banner(what: &str, code: i32) -> String {
    if code == 0 {
        format!("SUCCESS: {} finished", what)
    } else {
        format!("ERROR: {} exited with code {}", what, code)
    }
}

fn ready_python(root: &Path) -> Result<PathBuf> {
    let python = paths::venv_python(root);
    if !python.exists() {
        return Err(SetupError::not_ready(
            format!("virtual environment interpreter {} not found", python.display()),
            "Run `tripo setup` first",
        ));
    }
    Ok(python)
}

fn ready_entry_point(root: &Path, entry: PathBuf) -> Result<PathBuf> {
    if !entry.exists() {
        let vendor = paths::vendor_dir(root);
        return Err(SetupError::not_ready(
            format!(
                "upstream entry point {} not found under {}",
                entry.display(),
                vendor.display()
            ),
            "Run `tripo setup` to acquire the vendor sources",
        ));
    }
    Ok(entry)
}

async fn mirror_child(mut cmd: Command, what: &str) -> Result<i32> {
    info!("spawning {}", what);
    let status = cmd.status().await?;
    // A signal-terminated child has no code; report it as a plain failure.
    let code = status.code().unwrap_or(1);
    println!("{}", exit_banner(what, code));
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omitted_image_uses_bundled_example() {
        let root = Path::new("/p");
        let resolved = resolve_input_image(root, None);
        assert_eq!(
            resolved,
            PathBuf::from("/p/vendor/TripoSR/examples/captured.jpeg")
        );
    }

    #[test]
    fn test_given_image_passes_through() {
        let root = Path::new("/p");
        let resolved = resolve_input_image(root, Some(PathBuf::from("photo.jpg")));
        assert_eq!(resolved, PathBuf::from("photo.jpg"));
    }

    #[test]
    fn test_exit_banner_mirrors_codes() {
        assert_eq!(exit_banner("reconstruction", 0), "SUCCESS: reconstruction finished");
        assert_eq!(
            exit_banner("reconstruction", 3),
            "ERROR: reconstruction exited with code 3"
        );
    }

    #[test]
    fn test_missing_venv_reports_remediation() {
        let err = ready_python(Path::new("/definitely/not/a/project")).unwrap_err();
        assert!(matches!(err, SetupError::NotReady { .. }));
        assert!(err.to_string().contains("tripo setup"));
    }
}
