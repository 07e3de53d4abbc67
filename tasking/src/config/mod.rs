//! Configuration for the `tasking` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tasking/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use tasking_proto::task::ProjectId;

use crate::api::http::DEFAULT_REQUEST_TIMEOUT;
use crate::controller::ControllerConfig;
use crate::list::DEFAULT_PAGE_SIZE;
use crate::poll::DEFAULT_POLL_INTERVAL;
use crate::selection::reconcile::LockTieBreak;
use crate::sync::SyncConfig;

/// Errors that can occur when loading configuration.
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

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    poll: PollFileConfig,
    selection: SelectionFileConfig,
    ui: UiFileConfig,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    token: Option<String>,
    project_id: Option<u32>,
    request_timeout_secs: Option<u64>,
}

/// `[poll]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct PollFileConfig {
    interval_secs: Option<u64>,
    channel_capacity: Option<usize>,
}

/// `[selection]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SelectionFileConfig {
    lock_tie_break: Option<LockTieBreak>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
    page_size: Option<usize>,
    timestamp_format: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- API --
    /// Base URL of the REST API, e.g. `https://tasks.example.org/api/v2/`.
    pub base_url: Option<String>,
    /// API token.
    pub token: Option<String>,
    /// Project to open.
    pub project_id: Option<ProjectId>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Run against the built-in demo grid instead of a backend.
    pub offline: bool,

    // -- Poll --
    /// Time between activity polls.
    pub poll_interval: Duration,
    /// Channel capacity for command/event mpsc channels.
    pub channel_capacity: usize,

    // -- Selection --
    /// Which lock picks the resume action when both kinds are held.
    pub lock_tie_break: LockTieBreak,

    // -- UI --
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
    /// Rows per task list page.
    pub page_size: usize,
    /// Timestamp display format string (chrono).
    pub timestamp_format: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            project_id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            offline: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_capacity: 64,
            lock_tie_break: LockTieBreak::default(),
            poll_timeout: Duration::from_millis(50),
            page_size: DEFAULT_PAGE_SIZE,
            timestamp_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            base_url: cli
                .base_url
                .clone()
                .or_else(|| file.api.base_url.clone()),
            token: cli.token.clone().or_else(|| file.api.token.clone()),
            project_id: cli.project.or(file.api.project_id).map(ProjectId::new),
            request_timeout: file
                .api
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            offline: cli.offline,
            poll_interval: cli
                .poll_interval_secs
                .or(file.poll.interval_secs)
                .map_or(defaults.poll_interval, Duration::from_secs),
            channel_capacity: file
                .poll
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            lock_tie_break: cli
                .lock_tie_break
                .or(file.selection.lock_tie_break)
                .unwrap_or(defaults.lock_tie_break),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            page_size: file.ui.page_size.unwrap_or(defaults.page_size).max(1),
            timestamp_format: file
                .ui
                .timestamp_format
                .clone()
                .unwrap_or(defaults.timestamp_format),
        }
    }

    /// Whether to run against the built-in demo data.
    ///
    /// True with `--offline`, or when no base URL is configured.
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        self.offline || self.base_url.is_none()
    }

    /// Settings for the sync coordinator, once a project is known.
    #[must_use]
    pub const fn to_sync_config(&self, project_id: ProjectId) -> SyncConfig {
        SyncConfig {
            project_id,
            poll_interval: self.poll_interval,
            channel_capacity: self.channel_capacity,
        }
    }

    /// Settings for the view controller.
    #[must_use]
    pub const fn to_controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            tie_break: self.lock_tie_break,
            page_size: self.page_size,
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Pick Tasking Manager tasks to map or validate")]
pub struct CliArgs {
    /// Base URL of the Tasking Manager API.
    #[arg(long, env = "TASKING_API_URL")]
    pub base_url: Option<String>,

    /// API token.
    #[arg(long, env = "TASKING_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Project to open.
    #[arg(short, long, env = "TASKING_PROJECT")]
    pub project: Option<u32>,

    /// Seconds between activity polls.
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Which lock picks the resume action when both kinds are held
    /// (first-listed, prefer-mapping, most-recent).
    #[arg(long)]
    pub lock_tie_break: Option<LockTieBreak>,

    /// Use the built-in demo grid instead of a backend.
    #[arg(long)]
    pub offline: bool,

    /// Path to config file (default: `~/.config/tasking/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKING_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/tasking.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist. Otherwise the default
/// path is tried and a missing file is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("tasking").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
