// src/recipe/kitchen/script.rs

//! Running build and test scripts with a timeout and a cleared environment

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

/// Outcome of a finished (or killed) script
#[derive(Debug)]
pub struct ScriptOutput {
    /// Exit status, `None` if the script was killed on timeout
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    /// True if the script exited with status 0
    pub fn success(&self) -> bool {
        self.status.is_some_and(|s| s.success())
    }

    /// True if the script was killed after exceeding its timeout
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    /// Exit code, if the script exited normally
    pub fn code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

/// Run `script` with `sh -c` from `workdir`
///
/// The child environment is cleared and replaced with `env`. Output goes to
/// `{label}.stdout` and `{label}.stderr` under `log_dir` rather than pipes, so
/// a chatty script cannot block on a full pipe while we wait on it.
pub fn run_script(
    label: &str,
    script: &str,
    workdir: &Path,
    env: &[(String, String)],
    timeout: Duration,
    log_dir: &Path,
) -> Result<ScriptOutput> {
    fs::create_dir_all(log_dir)?;
    let stdout_path = log_dir.join(format!("{}.stdout", label));
    let stderr_path = log_dir.join(format!("{}.stderr", label));

    debug!("Running {} script in {}: {}", label, workdir.display(), script);

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(script)
        .current_dir(workdir)
        .env_clear()
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(File::create(&stdout_path)?)
        .stderr(File::create(&stderr_path)?)
        .spawn()
        .map_err(|e| Error::IoError(format!("Failed to spawn {} script: {}", label, e)))?;

    let status = match child.wait_timeout(timeout)? {
        Some(status) => Some(status),
        None => {
            // Timeout - kill the process
            let _ = child.kill();
            let _ = child.wait();
            None
        }
    };

    Ok(ScriptOutput {
        status,
        stdout: read_lossy(&stdout_path),
        stderr: read_lossy(&stderr_path),
    })
}

fn read_lossy(path: &Path) -> String {
    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Last `n` lines of `text`, for error messages
pub fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
