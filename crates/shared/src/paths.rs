//! Path conventions for a tripo project directory
//!
//! A project directory is any directory the operator runs `tripo` in. All
//! other locations hang off it: the vendor checkout of the upstream TripoSR
//! sources, the virtual environment, the wheel cache for offline installs,
//! the pretrained weights, and the reconstruction output. This module is the
//! single source of truth for that layout; no other code builds these paths
//! by hand.

use std::env;
use std::path::{Path, PathBuf};

/// Directory holding vendored third-party checkouts, relative to the root
const VENDOR_PARENT_NAME: &str = "vendor";

/// Name of the upstream checkout inside the vendor directory.
///
/// The archive fallback extracts under a different top-level name and is
/// renamed to this.
const VENDOR_DIR_NAME: &str = "TripoSR";

/// Virtual environment directory, relative to the root
const VENV_DIR_NAME: &str = ".venv";

/// Wheel cache for offline installs, relative to the root
const WHEEL_CACHE_NAME: &str = "wheels";

/// Reconstruction output directory, relative to the root
const OUTPUT_DIR_NAME: &str = "output";

/// Marker file recording a successful native torchmcubes build, so later
/// runs can skip the expensive CPU/CUDA torch reinstall dance
const TORCHMCUBES_MARKER_NAME: &str = ".torchmcubes_built";

/// Parent directory of vendored checkouts (`<root>/vendor`)
pub fn vendor_parent(root: &Path) -> PathBuf {
    root.join(VENDOR_PARENT_NAME)
}

/// The upstream TripoSR checkout (`<root>/vendor/TripoSR`)
pub fn vendor_dir(root: &Path) -> PathBuf {
    vendor_parent(root).join(VENDOR_DIR_NAME)
}

/// The upstream command-line entry point. Its existence is the only
/// structural validation the vendor directory gets.
pub fn cli_entry_point(root: &Path) -> PathBuf {
    vendor_dir(root).join("run.py")
}

/// The upstream browser GUI entry point
pub fn gui_entry_point(root: &Path) -> PathBuf {
    vendor_dir(root).join("gradio_app.py")
}

/// The upstream dependency manifest
pub fn requirements_file(root: &Path) -> PathBuf {
    vendor_dir(root).join("requirements.txt")
}

/// Bundled example input, used when `tripo run` is given no image
pub fn example_image(root: &Path) -> PathBuf {
    vendor_dir(root).join("examples").join("captured.jpeg")
}

/// The virtual environment directory (`<root>/.venv`)
pub fn venv_dir(root: &Path) -> PathBuf {
    root.join(VENV_DIR_NAME)
}

/// The virtual environment's interpreter
pub fn venv_python(root: &Path) -> PathBuf {
    #[cfg(windows)]
    {
        venv_dir(root).join("Scripts").join("python.exe")
    }
    #[cfg(not(windows))]
    {
        venv_dir(root).join("bin").join("python")
    }
}

/// The wheel cache for offline installs (`<root>/wheels`)
pub fn wheel_cache_dir(root: &Path) -> PathBuf {
    root.join(WHEEL_CACHE_NAME)
}

/// Local pretrained-weights directory (`<root>/models/TripoSR`)
pub fn models_dir(root: &Path) -> PathBuf {
    root.join("models").join(VENDOR_DIR_NAME)
}

/// Default reconstruction output directory (`<root>/output`)
pub fn output_dir(root: &Path) -> PathBuf {
    root.join(OUTPUT_DIR_NAME)
}

/// Marker file written once torchmcubes imports successfully
pub fn torchmcubes_marker(root: &Path) -> PathBuf {
    root.join(TORCHMCUBES_MARKER_NAME)
}

/// Get the user's home directory
///
/// Falls back to current directory if HOME cannot be determined.
fn get_home_dir() -> PathBuf {
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home)
    } else if let Some(home_dir) = dirs::home_dir() {
        home_dir
    } else {
        PathBuf::from(".")
    }
}

/// Expand a path that starts with `~` to use the user's home directory
///
/// # Examples
///
/// ```
/// use tripo_shared::expand_home_dir;
///
/// let path = expand_home_dir("~/projects/triposr");
/// // Returns: /home/user/projects/triposr
/// ```
pub fn expand_home_dir<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            let home = get_home_dir();
            return home.join(stripped);
        } else if path_str == "~" {
            return get_home_dir();
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_layout() {
        let root = Path::new("/work/project");
        assert_eq!(
            vendor_dir(root),
            PathBuf::from("/work/project/vendor/TripoSR")
        );
        assert_eq!(
            cli_entry_point(root),
            PathBuf::from("/work/project/vendor/TripoSR/run.py")
        );
        assert_eq!(
            requirements_file(root),
            PathBuf::from("/work/project/vendor/TripoSR/requirements.txt")
        );
    }

    #[test]
    fn test_venv_python_is_inside_the_venv() {
        let root = Path::new("/work/project");
        let python = venv_python(root);
        assert!(python.starts_with(venv_dir(root)));
        #[cfg(not(windows))]
        assert!(python.ends_with("bin/python"));
        #[cfg(windows)]
        assert!(python.ends_with("Scripts\\python.exe"));
    }

    #[test]
    fn test_auxiliary_dirs() {
        let root = Path::new("/p");
        assert_eq!(wheel_cache_dir(root), PathBuf::from("/p/wheels"));
        assert_eq!(models_dir(root), PathBuf::from("/p/models/TripoSR"));
        assert_eq!(output_dir(root), PathBuf::from("/p/output"));
        assert_eq!(
            torchmcubes_marker(root),
            PathBuf::from("/p/.torchmcubes_built")
        );
    }

    #[test]
    fn test_expand_home_dir() {
        // Tilde expansion
        let expanded = expand_home_dir("~/test");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("test"));

        // Absolute path (should be unchanged)
        let absolute = expand_home_dir("/absolute/path");
        assert_eq!(absolute, PathBuf::from("/absolute/path"));

        // Relative path (should be unchanged)
        let relative = expand_home_dir("relative/path");
        assert_eq!(relative, PathBuf::from("relative/path"));
    }
}
