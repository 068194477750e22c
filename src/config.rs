// src/config.rs
// =============================================================================
// Run configuration.
//
// Values come from three places, later ones winning:
// 1. built-in defaults (MirrorConfig::default)
// 2. an optional TOML file passed with --config
// 3. command-line flags
//
// Rust concepts:
// - #[serde(default)]: missing keys fall back to Default::default()
// - impl Default: one place for every default value
// - anyhow::Context: attaches the file path to read/parse errors
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Root under which `<host>/pages/...` trees are created
    pub output_dir: PathBuf,
    /// Asset downloads in flight per page
    pub concurrency: usize,
    /// Timeout for a single HTTP request, in seconds
    pub request_timeout_secs: u64,
    /// Redirects followed before a request fails
    pub max_redirects: usize,
    /// Optional deadline for mirroring one page, in seconds
    pub page_timeout_secs: Option<u64>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            concurrency: 8,
            request_timeout_secs: 10,
            max_redirects: 10,
            page_timeout_secs: None,
        }
    }
}

impl MirrorConfig {
    /// Loads a config file. Missing keys fall back to the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: MirrorConfig = toml::from_str(text)?;
        Ok(config)
    }

    /// Worker pool size, never zero
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn page_timeout(&self) -> Option<Duration> {
        self.page_timeout_secs.map(Duration::from_secs)
    }
}
