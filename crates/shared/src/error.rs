//! # Setup Error Handling
//!
//! Error taxonomy for the environment bootstrap procedure. Each variant maps
//! to one distinct failure point of the sequential setup flow so the operator
//! can tell from the message alone which step broke and what to do about it.
//!
//! ## Error Categories
//!
//! - **Precondition errors**: no usable interpreter, environment not prepared
//! - **Network/IO errors**: archive download, extraction, or rename failures
//! - **Installer errors**: package-manager invocations returning non-zero
//!
//! Best-effort failures (vendor update, optional native builds) are never
//! represented here; they are logged as warnings at the call site and
//! execution continues. Child-process exit codes from the launcher are
//! mirrored verbatim rather than wrapped in an error.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bootstrap operations
///
/// This is the standard Result type used throughout the tripo codebase.
pub type Result<T> = std::result::Result<T, SetupError>;

/// Error types for the environment bootstrap procedure
///
/// Every fatal failure of the setup flow is one of these variants. The
/// process-level policy is uniform: any `SetupError` terminates the run with
/// exit code 1 (see [`SetupError::exit_code`]); the distinction between
/// variants exists for diagnosis, not for differentiated recovery. There is
/// no retry logic anywhere.
#[derive(Error, Debug)]
pub enum SetupError {
    /// No candidate interpreter invocation reported an accepted version.
    ///
    /// **Recovery Strategy**: install a supported Python and re-run setup.
    #[error("no usable Python interpreter found: {message}")]
    InterpreterNotFound {
        /// Which candidates were probed and which versions are accepted
        message: String,
    },

    /// An HTTP download failed (archive fallback or model weights).
    #[error("download failed for {url}: {message}")]
    Download {
        /// URL that failed to download
        url: String,
        /// HTTP status or transport error description
        message: String,
    },

    /// A downloaded archive could not be extracted.
    #[error("failed to extract {}: {message}", archive.display())]
    Extract {
        /// Path of the archive that failed to extract
        archive: PathBuf,
        /// Underlying extraction error description
        message: String,
    },

    /// The extracted directory could not be renamed to the expected
    /// vendor directory name.
    #[error("failed to rename {} to {}: {message}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },

    /// A required package-manager invocation returned non-zero.
    ///
    /// `step` names the installer phase (e.g. `venv`, `requirements`,
    /// `gradio`) so a failure can be traced without reading pip's output.
    #[error("dependency install failed during {step}: {message}")]
    Install { step: String, message: String },

    /// Offline install was requested but the wheel cache holds no wheels.
    ///
    /// Raised before any install is attempted, per the offline-mode
    /// fast-fail contract.
    #[error("wheel cache {} is empty; run `tripo setup` online first to populate it", dir.display())]
    EmptyWheelCache { dir: PathBuf },

    /// The launcher was invoked before the environment was prepared.
    #[error("environment not ready: {missing}. {remediation}")]
    NotReady {
        /// What was expected and not found
        missing: String,
        /// What the operator should do about it
        remediation: String,
    },

    /// Filesystem errors from steps that have no more specific variant.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SetupError {
    /// Creates an interpreter-resolution error
    pub fn interpreter_not_found(message: impl Into<String>) -> Self {
        Self::InterpreterNotFound {
            message: message.into(),
        }
    }

    /// Creates a download error for the given URL
    pub fn download(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an archive-extraction error
    pub fn extract(archive: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extract {
            archive: archive.into(),
            message: message.into(),
        }
    }

    /// Creates a directory-rename error
    pub fn rename(
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rename {
            from: from.into(),
            to: to.into(),
            message: message.into(),
        }
    }

    /// Creates an installer error for the named step
    pub fn install(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Install {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Creates a launcher precondition error with a remediation hint
    pub fn not_ready(missing: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self::NotReady {
            missing: missing.into(),
            remediation: remediation.into(),
        }
    }

    /// Process exit code for this error
    ///
    /// Every distinct precondition or step failure exits with code 1; only
    /// a launched child process can produce other non-zero codes, and those
    /// are mirrored directly rather than routed through `SetupError`.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
