//! Config file loading for binaries.

use std::path::Path;

use anyhow::Context;
use avfeed_core::config::FeedConfig;

/// Reads and resolves a TOML config file.
pub fn load(path: &Path) -> anyhow::Result<FeedConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    FeedConfig::from_toml_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))
}

/// `path` when given, built-in defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<FeedConfig> {
    match path {
        Some(path) => load(path),
        None => Ok(FeedConfig::default()),
    }
}
