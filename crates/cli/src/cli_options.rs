//! CLI options and command dispatch
//!
//! The `setup` command runs the bootstrap state machine:
//! `RESOLVE_INTERPRETER → ENSURE_VENDOR_DIR → INSTALL_DEPENDENCIES → READY`,
//! each step either succeeding, downgrading to a warning, or aborting the
//! whole run. `run` and `gui` launch the prepared environment and mirror
//! the child's exit code; everything else exits 0 on success, 1 on any
//! failure.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tripo_shared::{expand_home_dir, Result};

use crate::installer::{self, InstallMode};
use crate::{doctor, interpreter, launcher, vendor, weights};

/// Tripo - bootstrap and launch TripoSR single-image 3D reconstruction
#[derive(Parser, Debug)]
#[command(name = "tripo", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prepare the environment: interpreter, vendor checkout, dependencies
    Setup(SetupOptions),
    /// Reconstruct a 3D mesh from a single image
    Run(RunOptions),
    /// Launch the vendored browser GUI
    Gui(GuiOptions),
    /// Download the pretrained weights ahead of the first run
    Download(DownloadOptions),
    /// Report environment readiness
    Doctor(DoctorOptions),
}

#[derive(Args, Debug)]
pub struct SetupOptions {
    /// Project directory to prepare
    #[arg(long, default_value = ".")]
    pub project_dir: String,

    /// Install exclusively from the local wheel cache, with no network access
    #[arg(long)]
    pub offline: bool,

    /// Also download the pretrained weights after installing
    #[arg(long)]
    pub with_weights: bool,
}

#[derive(Args, Debug)]
pub struct RunOptions {
    /// Input image; omits to the bundled example
    pub image: Option<PathBuf>,

    /// Project directory holding the prepared environment
    #[arg(long, default_value = ".")]
    pub project_dir: String,

    /// Where to write the reconstructed mesh (created if absent)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Mesh output format passed to the upstream CLI
    #[arg(long, default_value = launcher::DEFAULT_MESH_FORMAT)]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct GuiOptions {
    /// Project directory holding the prepared environment
    #[arg(long, default_value = ".")]
    pub project_dir: String,
}

#[derive(Args, Debug)]
pub struct DownloadOptions {
    /// Project directory to download into
    #[arg(long, default_value = ".")]
    pub project_dir: String,

    /// Hugging Face token for gated downloads (falls back to HF_TOKEN)
    #[arg(long)]
    pub hf_token: Option<String>,
}

#[derive(Args, Debug)]
pub struct DoctorOptions {
    /// Project directory to inspect
    #[arg(long, default_value = ".")]
    pub project_dir: String,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl Cli {
    /// Run the selected command, returning the process exit code
    pub async fn run(self) -> Result<i32> {
        match self.command {
            Commands::Setup(opts) => {
                run_setup(opts).await?;
                Ok(0)
            }
            Commands::Run(opts) => {
                let root = resolve_root(&opts.project_dir);
                launcher::run_inference(&root, opts.image, opts.output_dir, &opts.format).await
            }
            Commands::Gui(opts) => {
                let root = resolve_root(&opts.project_dir);
                launcher::run_gui(&root).await
            }
            Commands::Download(opts) => {
                let root = resolve_root(&opts.project_dir);
                weights::download_weights(&root, opts.hf_token).await?;
                Ok(0)
            }
            Commands::Doctor(opts) => {
                let root = resolve_root(&opts.project_dir);
                doctor::run_diagnostics(&root, &opts.format).await?;
                Ok(0)
            }
        }
    }
}

fn resolve_root(project_dir: &str) -> PathBuf {
    expand_home_dir(project_dir)
}

/// The sequential bootstrap. Each step blocks until done; fatal errors
/// abort the run, best-effort steps downgrade to warnings inside the
/// modules themselves.
async fn run_setup(opts: SetupOptions) -> Result<()> {
    let root = resolve_root(&opts.project_dir);
    std::fs::create_dir_all(&root)?;

    println!("Resolving Python interpreter...");
    let interpreter = interpreter::resolve().await?;
    println!("Using {}", interpreter.describe());

    vendor::ensure_vendor_dir(&root, opts.offline).await?;

    let mode = if opts.offline {
        InstallMode::Offline
    } else {
        InstallMode::Online
    };
    installer::install_dependencies(&root, &interpreter, mode).await?;

    if opts.with_weights {
        weights::download_weights(&root, None).await?;
    }

    println!();
    println!("READY: environment prepared. Try `tripo run` or `tripo gui`.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_setup_flags_parse() {
        let cli = Cli::try_parse_from(["tripo", "setup", "--offline", "--with-weights"]).unwrap();
        match cli.command {
            Commands::Setup(opts) => {
                assert!(opts.offline);
                assert!(opts.with_weights);
                assert_eq!(opts.project_dir, ".");
            }
            other => panic!("parsed wrong command: {:?}", other),
        }
    }

    #[test]
    fn test_run_image_is_optional() {
        let cli = Cli::try_parse_from(["tripo", "run"]).unwrap();
        match cli.command {
            Commands::Run(opts) => {
                assert!(opts.image.is_none());
                assert_eq!(opts.format, "obj");
            }
            other => panic!("parsed wrong command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["tripo", "run", "photo.jpg", "--format", "glb"]).unwrap();
        match cli.command {
            Commands::Run(opts) => {
                assert_eq!(opts.image, Some(PathBuf::from("photo.jpg")));
                assert_eq!(opts.format, "glb");
            }
            other => panic!("parsed wrong command: {:?}", other),
        }
    }
}
