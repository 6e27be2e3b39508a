// Application state module
// Read-only state shared by every connection

use std::path::{Path, PathBuf};

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
    root: PathBuf,
}

impl AppState {
    /// Resolve the serving root and freeze the configuration.
    pub fn new(config: Config) -> std::io::Result<Self> {
        let root = config.resolve_root()?;
        Ok(Self { config, root })
    }

    /// Build state for an already-resolved root.
    pub fn with_root(config: Config, root: PathBuf) -> Self {
        Self { config, root }
    }

    /// Canonical serving root, fixed before the listener exists
    pub fn root(&self) -> &Path {
        &self.root
    }
}
