//! # Tripo CLI
//!
//! Environment bootstrapper and launcher for TripoSR single-image 3D
//! reconstruction. The hard part (the model, the inference pipeline, the
//! mesh extraction) lives entirely in the vendored upstream project; this
//! tool only prepares the environment it needs and runs it.
//!
//! ## Usage
//!
//! ```bash
//! # Prepare everything: interpreter, vendor checkout, dependencies
//! tripo setup
//!
//! # Same, but install exclusively from the local wheel cache
//! tripo setup --offline
//!
//! # Reconstruct a mesh from one image (omits to the bundled example)
//! tripo run photo.jpg
//!
//! # Launch the browser GUI
//! tripo gui
//! ```

pub mod cli_options;
pub mod doctor;
pub mod fetch;
pub mod installer;
pub mod interpreter;
pub mod launcher;
pub mod vendor;
pub mod weights;

pub use cli_options::Cli;
