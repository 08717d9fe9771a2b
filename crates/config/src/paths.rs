//! Path utilities

use std::path::PathBuf;

/// Data directory (~/.mcpbot), falling back to a relative `.mcpbot`
/// when no home directory can be resolved
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".mcpbot"))
        .unwrap_or_else(|| PathBuf::from(".mcpbot"))
}

/// Default configuration file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}
