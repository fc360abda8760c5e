//! Integration tests for the bootstrap control flow
//!
//! Covers the testable properties of the orchestration: interpreter version
//! acceptance, the archive-fallback extraction/rename chain with its
//! distinct error points, offline fast-fail on an empty wheel cache, and
//! the launcher's argument substitution and exit-code banners. Nothing here
//! needs a Python installation or network access.

use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;
use tripo_cli::installer::ensure_wheel_cache_populated;
use tripo_cli::interpreter::{is_accepted, parse_version, PyVersion};
use tripo_cli::launcher::{exit_banner, resolve_input_image, run_inference};
use tripo_cli::vendor::{ensure_vendor_dir, extract_archive, rename_extracted};
use tripo_shared::{paths, SetupError};

/// Build a zip archive laid out like the upstream branch archive: a single
/// top-level directory containing the entry point.
fn write_branch_archive(dir: &std::path::Path) -> PathBuf {
    let archive_path = dir.join("main.zip");
    let file = std::fs::File::create(&archive_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    writer.start_file("TripoSR-main/run.py", options).unwrap();
    writer.write_all(b"print('ok')\n").unwrap();
    writer
        .start_file("TripoSR-main/requirements.txt", options)
        .unwrap();
    writer.write_all(b"transformers==4.35.0\n").unwrap();
    writer.finish().unwrap();

    archive_path
}

#[test]
fn test_archive_fallback_produces_expected_vendor_name() {
    let root = TempDir::new().unwrap();
    let staging = root.path().join("vendor");
    std::fs::create_dir_all(&staging).unwrap();

    let archive = write_branch_archive(&staging);
    extract_archive(&archive, &staging).unwrap();

    let vendor = paths::vendor_dir(root.path());
    rename_extracted(&staging.join("TripoSR-main"), &vendor).unwrap();

    assert!(vendor.join("run.py").exists());
    assert!(paths::cli_entry_point(root.path()).exists());
    assert!(!staging.join("TripoSR-main").exists());
}

#[test]
fn test_corrupt_archive_yields_extract_error() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("broken.zip");
    std::fs::write(&archive, b"this is not a zip file").unwrap();

    let err = extract_archive(&archive, dir.path()).unwrap_err();
    assert!(matches!(err, SetupError::Extract { .. }));
}

#[test]
fn test_missing_extracted_dir_yields_rename_error() {
    let dir = TempDir::new().unwrap();
    let err = rename_extracted(
        &dir.path().join("TripoSR-main"),
        &dir.path().join("TripoSR"),
    )
    .unwrap_err();
    assert!(matches!(err, SetupError::Rename { .. }));
}

#[tokio::test]
async fn test_vendor_update_failure_does_not_halt_setup() {
    let root = TempDir::new().unwrap();
    let vendor = paths::vendor_dir(root.path());
    std::fs::create_dir_all(&vendor).unwrap();
    std::fs::write(vendor.join("run.py"), b"print('ok')\n").unwrap();

    // The checkout is not a git repository, so the fast-forward attempt
    // fails; that downgrades to a warning and keeps the existing sources.
    let resolved = ensure_vendor_dir(root.path(), false).await.unwrap();
    assert_eq!(resolved, vendor);
    assert!(vendor.join("run.py").exists());
}

#[tokio::test]
async fn test_offline_setup_uses_existing_checkout_as_is() {
    let root = TempDir::new().unwrap();
    let vendor = paths::vendor_dir(root.path());
    std::fs::create_dir_all(&vendor).unwrap();

    let resolved = ensure_vendor_dir(root.path(), true).await.unwrap();
    assert_eq!(resolved, vendor);
}

#[tokio::test]
async fn test_offline_setup_fails_fast_without_checkout() {
    let root = TempDir::new().unwrap();
    let err = ensure_vendor_dir(root.path(), true).await.unwrap_err();
    assert!(matches!(err, SetupError::NotReady { .. }));
    assert!(err.to_string().contains("tripo setup"));
}

#[test]
fn test_offline_mode_fails_fast_on_empty_cache() {
    let dir = TempDir::new().unwrap();
    let err = ensure_wheel_cache_populated(dir.path()).unwrap_err();
    match err {
        SetupError::EmptyWheelCache { dir: reported } => {
            assert_eq!(reported, dir.path());
        }
        other => panic!("expected EmptyWheelCache, got {:?}", other),
    }
}

#[test]
fn test_wheel_in_subdirectory_counts() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("torch");
    std::fs::create_dir_all(&sub).unwrap();
    std::fs::write(sub.join("torch-2.3.0-cp312-linux_x86_64.whl"), b"x").unwrap();
    assert!(ensure_wheel_cache_populated(dir.path()).is_ok());
}

#[test]
fn test_resolver_accepts_exactly_the_supported_range() {
    // Candidate output is matched against 3.9 through 3.12.
    for minor in 9..=12 {
        let banner = format!("Python 3.{}.1", minor);
        let version = parse_version(&banner).unwrap();
        assert!(is_accepted(&version), "3.{} should be accepted", minor);
    }

    for banner in ["Python 3.8.10", "Python 3.13.0", "Python 2.7.18"] {
        let version = parse_version(banner).unwrap();
        assert!(!is_accepted(&version), "{} should be rejected", banner);
    }

    assert_eq!(parse_version("pyenv: python: command not found"), None);
}

#[test]
fn test_version_equality_is_major_minor() {
    assert_eq!(
        parse_version("Python 3.12.4").unwrap(),
        PyVersion {
            major: 3,
            minor: 12
        }
    );
}

#[test]
fn test_launcher_substitutes_bundled_example() {
    let root = TempDir::new().unwrap();
    let resolved = resolve_input_image(root.path(), None);
    assert_eq!(resolved, paths::example_image(root.path()));

    let explicit = resolve_input_image(root.path(), Some(PathBuf::from("cat.png")));
    assert_eq!(explicit, PathBuf::from("cat.png"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_inference_mirrors_child_exit_code() {
    use std::os::unix::fs::PermissionsExt;

    let root = TempDir::new().unwrap();

    // Fake interpreter that exits with a distinctive non-zero code.
    let python = paths::venv_python(root.path());
    std::fs::create_dir_all(python.parent().unwrap()).unwrap();
    std::fs::write(&python, "#!/bin/sh\nexit 3\n").unwrap();
    std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o755)).unwrap();

    let entry = paths::cli_entry_point(root.path());
    std::fs::create_dir_all(entry.parent().unwrap()).unwrap();
    std::fs::write(&entry, b"print('ok')\n").unwrap();

    let code = run_inference(root.path(), Some(PathBuf::from("cat.png")), None, "obj")
        .await
        .unwrap();
    assert_eq!(code, 3);
}

#[test]
fn test_launcher_banners_mirror_child_exit_codes() {
    assert_eq!(exit_banner("reconstruction", 0), "SUCCESS: reconstruction finished");
    assert_eq!(exit_banner("GUI", 3), "ERROR: GUI exited with code 3");
    // The banner never changes the code it reports.
    for code in [1, 2, 137] {
        assert!(exit_banner("reconstruction", code).contains(&code.to_string()));
    }
}
