//! Configuration structures for the event server.
//!
//! - [`WatchConfig`] - notifier channel sizing and write suppression
//! - [`ServerConfig`] - root server settings (depth clamp, skip policy,
//!   ignore globs, handler deadline)
//!
//! Both types implement [`Default`] with documented values and deserialize
//! from JSON with missing fields filled from the defaults.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// Errors that can occur while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for the notifier and the event pipeline.
///
/// # Examples
///
/// ```
/// use fsev_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.channel_capacity, 1024);
/// assert_eq!(config.write_suppress_ms, 500);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Capacity of the bounded event channel.
    ///
    /// Bounds memory when handlers fall behind a burst of changes.
    pub channel_capacity: usize,

    /// Capacity of the bounded error channel.
    ///
    /// The error channel is written by the notifier backend, by request
    /// construction failures, and by handler workers; the buffer keeps
    /// those producers from blocking the serve loop.
    pub error_capacity: usize,

    /// Window in milliseconds during which write events on a freshly
    /// created path are suppressed.
    ///
    /// A create on most platforms is followed by one or more writes for
    /// the same logical change; suppressing them avoids re-dispatching the
    /// handler. Writes outside the window are delivered, so genuine
    /// in-place edits still reach handlers. `0` disables suppression.
    pub write_suppress_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            error_capacity: 64,
            write_suppress_ms: 500,
        }
    }
}

/// Configuration for the event server.
///
/// # Examples
///
/// ```
/// use fsev_core::ServerConfig;
///
/// let config = ServerConfig::default();
/// assert!(config.max_depth.is_none());
/// assert!(!config.skip);
/// assert!(config.ignore.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Depth clamp for the initial walk.
    ///
    /// `None` walks the whole tree; `Some(n)` keeps directories at most
    /// `n` parent-steps below the root (the root itself is depth `0`).
    pub max_depth: Option<usize>,

    /// Whether to keep serving when a directory cannot be subscribed.
    ///
    /// When `false`, the first per-path subscribe failure aborts startup.
    pub skip: bool,

    /// Glob patterns excluded from watching.
    ///
    /// `.git` directories are always excluded in addition to this list.
    pub ignore: Vec<String>,

    /// Handler deadline in milliseconds applied to every request.
    ///
    /// `None` lets handlers run unbounded.
    pub handler_timeout_ms: Option<u64>,

    /// Notifier and pipeline settings.
    pub watch: WatchConfig,
}

impl ServerConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not valid JSON.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_std_path())?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.channel_capacity, 1024);
        assert_eq!(config.error_capacity, 64);
        assert_eq!(config.write_suppress_ms, 500);
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert!(config.max_depth.is_none());
        assert!(!config.skip);
        assert!(config.ignore.is_empty());
        assert!(config.handler_timeout_ms.is_none());
    }

    #[test]
    fn test_server_config_round_trip() {
        let config = ServerConfig {
            max_depth: Some(3),
            skip: true,
            ignore: vec!["**/node_modules/**".to_owned()],
            handler_timeout_ms: Some(30_000),
            watch: WatchConfig::default(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_server_config_fills_missing_fields() {
        let json = r#"{"skip": true}"#;
        let config: ServerConfig = serde_json::from_str(json).unwrap();
        assert!(config.skip);
        assert!(config.max_depth.is_none());
        assert_eq!(config.watch.channel_capacity, 1024);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fsev.json");
        std::fs::write(&path, r#"{"max_depth": 2, "ignore": ["**/dist/**"]}"#).unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(path).unwrap();

        let config = ServerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_depth, Some(2));
        assert_eq!(config.ignore, vec!["**/dist/**".to_owned()]);
        assert!(!config.skip);
    }

    #[test]
    fn test_from_json_file_missing_is_io_error() {
        let result = ServerConfig::from_json_file(Utf8Path::new("/nonexistent/fsev.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_from_json_file_malformed_is_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(path).unwrap();

        let result = ServerConfig::from_json_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
