//! Configuration for the mock backend.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tasking-mock/config.toml`)
//! 4. Compiled defaults

use std::path::PathBuf;

/// Errors that can occur when loading mock server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct MockConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    project_id: Option<u32>,
    grid_columns: Option<u32>,
    grid_rows: Option<u32>,
}

/// CLI arguments for the mock server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Mock Tasking Manager backend")]
pub struct MockCliArgs {
    /// Address to bind the server to.
    #[arg(short, long, env = "TASKING_MOCK_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/tasking-mock/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Id of the served project.
    #[arg(long)]
    pub project_id: Option<u32>,

    /// Grid width in tasks.
    #[arg(long)]
    pub columns: Option<u32>,

    /// Grid height in tasks.
    #[arg(long)]
    pub rows: Option<u32>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKING_MOCK_LOG")]
    pub log_level: String,
}

/// Fully resolved mock server configuration.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Address to bind the server to (e.g., `127.0.0.1:5000`).
    pub bind_addr: String,
    /// Id of the served project.
    pub project_id: u32,
    /// Grid width in tasks.
    pub grid_columns: u32,
    /// Grid height in tasks.
    pub grid_rows: u32,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            project_id: 1,
            grid_columns: 6,
            grid_rows: 4,
            log_level: "info".to_string(),
        }
    }
}

impl MockConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &MockCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &MockCliArgs, file: &MockConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            project_id: cli
                .project_id
                .or(file.server.project_id)
                .unwrap_or(defaults.project_id),
            grid_columns: cli
                .columns
                .or(file.server.grid_columns)
                .unwrap_or(defaults.grid_columns)
                .max(1),
            grid_rows: cli
                .rows
                .or(file.server.grid_rows)
                .unwrap_or(defaults.grid_rows)
                .max(1),
            log_level: cli.log_level.clone(),
        }
    }
}

fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<MockConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(MockConfigFile::default());
        };
        config_dir.join("tasking-mock").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MockConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
