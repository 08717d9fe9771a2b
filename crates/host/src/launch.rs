//! Deciding how to start the tool host process

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::{HostError, Result};

/// Program and arguments used to start a tool host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl LaunchSpec {
    /// `.py` scripts run under `python`, `.js` under `node`; anything else
    /// must be an executable file and is run directly.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HostError::NotFound(path.to_path_buf()));
        }

        let script = path.to_string_lossy().into_owned();
        let interpreter = match path.extension().and_then(|e| e.to_str()) {
            Some("py") => Some("python"),
            Some("js") => Some("node"),
            _ => None,
        };

        match interpreter {
            Some(program) => Ok(Self {
                program: PathBuf::from(program),
                args: vec![script],
            }),
            None if is_executable(path) => Ok(Self {
                program: path.to_path_buf(),
                args: Vec::new(),
            }),
            None => Err(HostError::NotExecutable(path.to_path_buf())),
        }
    }

    /// Command with piped stdio; stderr is inherited so server logs stay visible
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
