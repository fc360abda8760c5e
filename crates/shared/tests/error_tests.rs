//! Error Tests
//!
//! Tests for the setup error taxonomy: construction, message content, and
//! the uniform exit-code policy.

use std::path::PathBuf;
use tripo_shared::SetupError;

#[test]
fn test_error_construction() {
    let interp_err = SetupError::interpreter_not_found("no candidate matched");
    assert!(matches!(interp_err, SetupError::InterpreterNotFound { .. }));

    let download_err = SetupError::download("https://example.com/main.zip", "HTTP 404");
    assert!(matches!(download_err, SetupError::Download { .. }));

    let extract_err = SetupError::extract("/tmp/main.zip", "invalid central directory");
    assert!(matches!(extract_err, SetupError::Extract { .. }));

    let rename_err = SetupError::rename("/tmp/TripoSR-main", "/tmp/TripoSR", "target exists");
    assert!(matches!(rename_err, SetupError::Rename { .. }));

    let install_err = SetupError::install("gradio", "pip exited with code 1");
    assert!(matches!(install_err, SetupError::Install { .. }));

    let ready_err = SetupError::not_ready("run.py missing", "Run `tripo setup` first");
    assert!(matches!(ready_err, SetupError::NotReady { .. }));
}

#[test]
fn test_messages_name_distinct_failure_points() {
    // Each network/IO failure point must be diagnosable from the message
    // alone: download vs. extraction vs. rename.
    let download = SetupError::download("https://example.com/main.zip", "timed out").to_string();
    let extract = SetupError::extract("/tmp/main.zip", "bad magic").to_string();
    let rename = SetupError::rename("/tmp/a", "/tmp/b", "permission denied").to_string();

    assert!(download.contains("download"));
    assert!(extract.contains("extract"));
    assert!(rename.contains("rename"));
    assert_ne!(download, extract);
    assert_ne!(extract, rename);
}

#[test]
fn test_install_errors_carry_their_step() {
    let err = SetupError::install("offline-requirements", "pip exited with code 2");
    assert!(err.to_string().contains("offline-requirements"));
}

#[test]
fn test_not_ready_carries_remediation() {
    let err = SetupError::not_ready(
        "virtual environment interpreter not found",
        "Run `tripo setup` first",
    );
    let message = err.to_string();
    assert!(message.contains("not ready"));
    assert!(message.contains("tripo setup"));
}

#[test]
fn test_uniform_exit_code_policy() {
    // Every setup failure exits with code 1; only launched children
    // produce other codes, and those bypass SetupError entirely.
    let errors = [
        SetupError::interpreter_not_found("none"),
        SetupError::download("https://example.com", "refused"),
        SetupError::extract("/tmp/a.zip", "truncated"),
        SetupError::rename("/a", "/b", "exists"),
        SetupError::install("venv", "exit 1"),
        SetupError::EmptyWheelCache {
            dir: PathBuf::from("/p/wheels"),
        },
        SetupError::not_ready("interpreter", "install Python"),
        SetupError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
    ];
    for err in errors {
        assert_eq!(err.exit_code(), 1);
    }
}

#[test]
fn test_io_conversion() {
    fn touch(path: &std::path::Path) -> Result<(), SetupError> {
        std::fs::metadata(path)?;
        Ok(())
    }
    let err = touch(std::path::Path::new("/definitely/not/here")).unwrap_err();
    assert!(matches!(err, SetupError::Io(_)));
}
