//! Environment diagnostics
//!
//! One-shot readiness report: which interpreter would be resolved, whether
//! an NVIDIA GPU and driver are visible (the installer pins cu121 wheels,
//! so this tells the operator whether the CUDA reinstall step buys them
//! anything), and which of the on-disk pieces (vendor checkout, virtual
//! environment, weights, wheel cache) are present. Text or JSON output.

use std::path::Path;
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;
use tripo_shared::{paths, Result};
use walkdir::WalkDir;

use crate::interpreter;

/// Detected NVIDIA GPU
#[derive(Debug, Clone, Serialize)]
pub struct GpuInfo {
    pub name: String,
    pub driver_version: Option<String>,
    pub memory_mb: Option<u64>,
}

/// Full diagnostics report
#[derive(Debug, Serialize)]
pub struct DoctorReport {
    /// Resolved interpreter description, if any candidate matched
    pub interpreter: Option<String>,
    /// Linked libgit2 version backing the vendor acquisition path
    pub libgit2_version: String,
    pub gpu: Option<GpuInfo>,
    pub vendor_present: bool,
    pub venv_present: bool,
    pub weights_present: bool,
    pub wheel_count: usize,
    pub ready: bool,
    pub recommendations: Vec<String>,
}

/// Run the doctor command
pub async fn run_diagnostics(root: &Path, format: &str) -> Result<()> {
    let report = collect_report(root).await;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report).unwrap()),
        _ => display_report(&report),
    }
    Ok(())
}

/// Collect the report without printing anything
pub async fn collect_report(root: &Path) -> DoctorReport {
    let interpreter = interpreter::resolve().await.ok().map(|i| i.describe());
    let (major, minor, rev) = git2::Version::get().libgit2_version();
    let gpu = detect_nvidia_gpu().await;

    let vendor_present = paths::cli_entry_point(root).exists();
    let venv_present = paths::venv_python(root).exists();
    let weights_present = paths::models_dir(root).join("model.ckpt").exists();
    let wheel_count = count_wheels(&paths::wheel_cache_dir(root));

    // Weights and wheel cache are optional; the upstream fetches weights
    // itself on first run, and the cache only matters for offline installs.
    let ready = interpreter.is_some() && vendor_present && venv_present;

    let recommendations = build_recommendations(
        interpreter.is_some(),
        gpu.is_some(),
        vendor_present,
        venv_present,
        weights_present,
        wheel_count,
    );

    DoctorReport {
        interpreter,
        libgit2_version: format!("{}.{}.{}", major, minor, rev),
        gpu,
        vendor_present,
        venv_present,
        weights_present,
        wheel_count,
        ready,
        recommendations,
    }
}

/// Detect the first NVIDIA GPU via nvidia-smi. Absence of the tool or a
/// failing invocation both mean "no usable GPU" here.
async fn detect_nvidia_gpu() -> Option<GpuInfo> {
    let output = Command::new("nvidia-smi")
        .args([
            "--query-gpu=name,driver_version,memory.total",
            "--format=csv,noheader,nounits",
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().find(|l| !l.trim().is_empty())?;
    parse_gpu_line(line)
}

/// Parse one `name, driver_version, memory.total` CSV line
pub fn parse_gpu_line(line: &str) -> Option<GpuInfo> {
    let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
    if parts.len() < 3 {
        return None;
    }
    Some(GpuInfo {
        name: parts[0].to_string(),
        driver_version: Some(parts[1].to_string()).filter(|s| !s.is_empty()),
        memory_mb: parts[2].parse().ok(),
    })
}

fn count_wheels(cache: &Path) -> usize {
    WalkDir::new(cache)
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
        .count()
}

/// Remediation hints derived from the probe results
pub fn build_recommendations(
    interpreter: bool,
    gpu: bool,
    vendor: bool,
    venv: bool,
    weights: bool,
    wheel_count: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if !interpreter {
        recommendations.push("Install Python 3.9-3.12 and ensure it is on PATH".to_string());
    }
    if !vendor || !venv {
        recommendations.push("Run `tripo setup` to prepare the environment".to_string());
    }
    if !gpu {
        recommendations.push(
            "No NVIDIA GPU detected; inference will run on the CPU torch build".to_string(),
        );
    }
    if !weights {
        recommendations
            .push("Run `tripo download` to fetch the pretrained weights ahead of time".to_string());
    }
    if wheel_count == 0 {
        recommendations.push(
            "Run `tripo setup` online once to populate the wheel cache for offline installs"
                .to_string(),
        );
    }
    recommendations
}

fn display_report(report: &DoctorReport) {
    println!("Tripo environment diagnostics");
    println!("=============================");

    match &report.interpreter {
        Some(description) => println!("✅ Interpreter: {}", description),
        None => println!("❌ Interpreter: no accepted Python found"),
    }
    println!("✅ libgit2: {}", report.libgit2_version);

    match &report.gpu {
        Some(gpu) => println!(
            "✅ GPU: {} {}{}",
            gpu.name,
            gpu.driver_version
                .as_deref()
                .map(|d| format!("(driver {})", d))
                .unwrap_or_default(),
            gpu.memory_mb
                .map(|m| format!(" ({} MB)", m))
                .unwrap_or_default()
        ),
        None => println!("❌ GPU: no NVIDIA GPU detected"),
    }

    println!(
        "{} Vendor checkout present",
        if report.vendor_present { "✅" } else { "❌" }
    );
    println!(
        "{} Virtual environment present",
        if report.venv_present { "✅" } else { "❌" }
    );
    println!(
        "{} Pretrained weights present",
        if report.weights_present { "✅" } else { "❌" }
    );
    println!("   Wheel cache: {} wheels", report.wheel_count);

    println!();
    println!(
        "Status: {}",
        if report.ready {
            "✅ ready to run"
        } else {
            "⚠️  setup required"
        }
    );

    if !report.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for (i, rec) in report.recommendations.iter().enumerate() {
            println!("{}. {}", i + 1, rec);
        }
    }
}
