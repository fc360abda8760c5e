//! Python interpreter resolution
//!
//! Probes a fixed list of candidate invocation forms in priority order and
//! selects the first one whose `--version` output matches the accepted
//! version set. One-shot: no retries, no caching across runs. The upstream
//! project's dependency pins assume Python 3.9 through 3.12, so anything
//! outside that range is rejected even if the candidate itself runs.

use std::ops::RangeInclusive;
use std::process::Stdio;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info};
use tripo_shared::{Result, SetupError};

/// Accepted Python 3 minor versions
pub const ACCEPTED_MINORS: RangeInclusive<u32> = 9..=12;

/// A parsed `major.minor` interpreter version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyVersion {
    pub major: u32,
    pub minor: u32,
}

impl std::fmt::Display for PyVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A resolved interpreter: the command to invoke plus the version it
/// reported. Immutable once resolved.
#[derive(Debug, Clone)]
pub struct ResolvedInterpreter {
    pub program: String,
    pub args: Vec<String>,
    pub version: PyVersion,
}

impl ResolvedInterpreter {
    /// Build a [`Command`] invoking this interpreter
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Human-readable form, e.g. `Python 3.12 via \`py -3\``
    pub fn describe(&self) -> String {
        let mut invocation = self.program.clone();
        for arg in &self.args {
            invocation.push(' ');
            invocation.push_str(arg);
        }
        format!("Python {} via `{}`", self.version, invocation)
    }
}

/// Candidate invocation forms, highest priority first.
///
/// `py -3` is the Windows launcher; the plain names cover Unix and PATH
/// installs. Order matters: the first accepted candidate wins.
pub fn candidates() -> &'static [(&'static str, &'static [&'static str])] {
    &[("py", &["-3"]), ("python3", &[]), ("python", &[])]
}

/// Parse a `Python X.Y[.Z]` version banner
pub fn parse_version(output: &str) -> Option<PyVersion> {
    let re = Regex::new(r"Python (\d+)\.(\d+)").ok()?;
    let caps = re.captures(output)?;
    Some(PyVersion {
        major: caps[1].parse().ok()?,
        minor: caps[2].parse().ok()?,
    })
}

/// Whether a reported version is in the accepted set
pub fn is_accepted(version: &PyVersion) -> bool {
    version.major == 3 && ACCEPTED_MINORS.contains(&version.minor)
}

/// Probe the candidates and return the first acceptable interpreter
///
/// Signals an unrecoverable configuration error if none match; the setup
/// flow must not continue past that.
pub async fn resolve() -> Result<ResolvedInterpreter> {
    for (program, args) in candidates() {
        let output = Command::new(program)
            .args(*args)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                // Old interpreters print the banner on stderr; cover both.
                let text = format!(
                    "{}{}",
                    String::from_utf8_lossy(&out.stdout),
                    String::from_utf8_lossy(&out.stderr)
                );
                match parse_version(&text) {
                    Some(version) if is_accepted(&version) => {
                        let resolved = ResolvedInterpreter {
                            program: (*program).to_string(),
                            args: args.iter().map(|a| (*a).to_string()).collect(),
                            version,
                        };
                        info!("resolved interpreter: {}", resolved.describe());
                        return Ok(resolved);
                    }
                    Some(version) => {
                        debug!("candidate `{}` reports unsupported {}", program, version);
                    }
                    None => {
                        debug!("candidate `{}` produced unparsable output", program);
                    }
                }
            }
            Ok(out) => {
                debug!("candidate `{}` exited with {}", program, out.status);
            }
            Err(_) => {
                // Candidate not installed; try the next form.
            }
        }
    }

    Err(SetupError::interpreter_not_found(format!(
        "tried `py -3`, `python3` and `python`; install Python 3.{}-3.{} and ensure it is on PATH",
        ACCEPTED_MINORS.start(),
        ACCEPTED_MINORS.end()
    )))
}
