// Configuration module entry point
// Loads the startup configuration and resolves the serving root

mod state;
mod types;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_FILE: &str = "coi_serve";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Defaults reproduce the plain behavior: all interfaces, port 8000,
    /// files served from the executable's directory.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let settings = config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.access_log", defaults.logging.access_log)?
            .set_default("logging.access_log_format", defaults.logging.access_log_format)?
            .set_default(
                "performance.connection_timeout",
                defaults.performance.connection_timeout,
            )?
            .set_default("performance.keep_alive", defaults.performance.keep_alive)?
            .set_default("http.server_name", defaults.http.server_name)?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("COI")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Resolve the directory files are served from.
    ///
    /// A configured root wins; otherwise the directory containing the
    /// running executable is used. The result is canonical so later
    /// containment checks compare like with like.
    pub fn resolve_root(&self) -> std::io::Result<PathBuf> {
        let root = match &self.server.root {
            Some(root) => root.clone(),
            None => executable_dir()?,
        };
        root.canonicalize()
    }
}

fn executable_dir() -> std::io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("executable has no parent directory: {}", exe.display()),
        )
    })
}
