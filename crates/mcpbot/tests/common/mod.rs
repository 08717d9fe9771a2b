//! Common test utilities for mcpbot integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Variables the binary reads; cleared so the host environment can't leak in
const ENV_VARS: &[&str] = &[
    "MCPBOT_PROVIDER",
    "DEEPSEEK_API_KEY",
    "OPENAI_API_KEY",
    "API_BASE",
    "MODEL",
    "OLLAMA_HOST",
    "RUST_LOG",
];

/// Fake MCP server: answers initialize, tools/list and tools/call
pub const FAKE_HOST: &str = r#"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"sh-host","version":"0.0.1"}}}\n' "$id" ;;
    *'"method":"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"list_pods","description":"List pods","inputSchema":{"type":"object"}}]}}\n' "$id" ;;
    *'"method":"tools/call"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"pod-a, pod-b"}]}}\n' "$id" ;;
  esac
done
"#;

/// Fake MCP server that goes away right after the startup tools/list
pub const VANISHING_HOST: &str = r#"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"sh-host","version":"0.0.1"}}}\n' "$id" ;;
    *'"method":"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"list_pods","description":"List pods","inputSchema":{"type":"object"}}]}}\n' "$id"
      exit 0 ;;
  esac
done
"#;

/// Isolated home, working directory and config file
pub struct TestEnv {
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            temp_dir: tempdir()?,
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Config file location passed with `--config`
    pub fn config_file(&self) -> PathBuf {
        self.path("config.json")
    }

    pub fn write_config(&self, json: &str) -> anyhow::Result<()> {
        std::fs::write(self.config_file(), json)?;
        Ok(())
    }

    /// The binary, run inside this environment with `--config` set
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mcpbot"));
        for var in ENV_VARS {
            cmd.env_remove(var);
        }
        cmd.env("HOME", self.temp_dir.path())
            .current_dir(self.temp_dir.path())
            .arg("--config")
            .arg(self.config_file());
        cmd
    }

    /// Write the fake MCP server and make it executable
    #[cfg(unix)]
    pub fn fake_host(&self) -> anyhow::Result<PathBuf> {
        self.host_script("fake-host", FAKE_HOST)
    }

    /// Write an executable server script under `name`
    #[cfg(unix)]
    pub fn host_script(&self, name: &str, script: &str) -> anyhow::Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.path(name);
        std::fs::write(&path, script)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }
}
