//! # Tripo Shared Library
//!
//! Shared types for the `tripo` environment bootstrapper: the error taxonomy
//! used by every setup step and the canonical on-disk layout of a project
//! directory (vendor checkout, virtual environment, wheel cache, model
//! weights, output).
//!
//! The bootstrapper is strictly sequential, so nothing here is concurrency
//! aware; the only shared resource is the file system.

pub mod error;
pub mod paths;

pub use error::{Result, SetupError};
pub use paths::{
    cli_entry_point, example_image, expand_home_dir, gui_entry_point, models_dir, output_dir,
    requirements_file, torchmcubes_marker, vendor_dir, venv_dir, venv_python, wheel_cache_dir,
};
