//! Configuration types for kgm2flac

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use utoipa::ToSchema;

/// Fixed slack added on top of `max_files * max_file_size` when capping the
/// request body, to leave room for multipart framing
pub const BODY_OVERHEAD_BYTES: u64 = 10 * 1024 * 1024;

/// API server configuration (bind address, CORS)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ServerConfig {
    /// Address the HTTP server binds to (default: "0.0.0.0:8080")
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Whether to add a CORS layer (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins; "*" or an empty list allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Upload limits for one conversion request
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LimitsConfig {
    /// Maximum number of files per request (default: 50)
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum size of a single file in bytes (default: 1 GiB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl LimitsConfig {
    /// Cap for the whole multipart body:
    /// `max_files * max_file_size + BODY_OVERHEAD_BYTES`
    #[must_use]
    pub fn request_body_limit(&self) -> u64 {
        (self.max_files as u64)
            .saturating_mul(self.max_file_size)
            .saturating_add(BODY_OVERHEAD_BYTES)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// External tool paths (ffmpeg, decryptor) and subprocess limits
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to the container decryptor executable (auto-detected if None)
    #[serde(default)]
    pub decryptor_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set
    /// (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Hard deadline for one transcode invocation, in seconds (default: 300)
    ///
    /// A transcode that exceeds this is killed and recorded as failed, so a
    /// hung encoder cannot hang the request.
    #[serde(default = "default_transcode_timeout")]
    pub transcode_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            decryptor_path: None,
            search_path: true,
            transcode_timeout_secs: default_transcode_timeout(),
        }
    }
}

/// Main configuration for the conversion service
///
/// Fields are organized into logical sub-configs:
/// - [`server`](ServerConfig) - bind address, CORS
/// - [`limits`](LimitsConfig) - per-request file count and size caps
/// - [`tools`](ToolsConfig) - external binary paths, subprocess deadline
///
/// Scratch files (persisted uploads, decoded intermediates) go to
/// `scratch_dir`, falling back to the OS temp directory; request workspaces
/// are created under the same root.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// API server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Upload limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Root directory for scratch files and request workspaces
    /// (default: the OS temp directory)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Config {
    /// Resolved scratch root
    #[must_use]
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.limits.max_files == 0 {
            return Err(crate::error::Error::Config {
                message: "max_files must be at least 1".to_string(),
                key: Some("limits.max_files".to_string()),
            });
        }
        if self.limits.max_file_size == 0 {
            return Err(crate::error::Error::Config {
                message: "max_file_size must be at least 1 byte".to_string(),
                key: Some("limits.max_file_size".to_string()),
            });
        }
        if self.tools.transcode_timeout_secs == 0 {
            return Err(crate::error::Error::Config {
                message: "transcode_timeout_secs must be at least 1".to_string(),
                key: Some("tools.transcode_timeout_secs".to_string()),
            });
        }
        Ok(())
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_files() -> usize {
    50
}

fn default_max_file_size() -> u64 {
    1 << 30 // 1 GiB
}

fn default_transcode_timeout() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.limits.max_files, 50);
        assert_eq!(config.limits.max_file_size, 1 << 30);
        assert_eq!(config.tools.transcode_timeout_secs, 300);
        assert!(config.tools.search_path);
        assert!(config.server.cors_enabled);
        assert_eq!(config.server.bind_address.port(), 8080);
    }

    #[test]
    fn default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn body_limit_is_count_times_size_plus_overhead() {
        let limits = LimitsConfig {
            max_files: 3,
            max_file_size: 100,
        };
        assert_eq!(limits.request_body_limit(), 300 + BODY_OVERHEAD_BYTES);
    }

    #[test]
    fn body_limit_saturates_instead_of_overflowing() {
        let limits = LimitsConfig {
            max_files: usize::MAX,
            max_file_size: u64::MAX,
        };
        assert_eq!(limits.request_body_limit(), u64::MAX);
    }

    #[test]
    fn zero_max_files_is_rejected() {
        let mut config = Config::default();
        config.limits.max_files = 0;

        let err = config.validate().unwrap_err();
        match err {
            crate::error::Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("limits.max_files"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_file_size_is_rejected() {
        let mut config = Config::default();
        config.limits.max_file_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_transcode_timeout_is_rejected() {
        let mut config = Config::default();
        config.tools.transcode_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.limits.max_files, 50);
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config: Config =
            serde_json::from_str(r#"{"limits": {"max_files": 5}}"#).unwrap();
        assert_eq!(config.limits.max_files, 5);
        assert_eq!(config.limits.max_file_size, 1 << 30);
    }

    #[test]
    fn scratch_root_falls_back_to_os_temp() {
        let config = Config::default();
        assert_eq!(config.scratch_root(), std::env::temp_dir());

        let explicit = Config {
            scratch_dir: Some(PathBuf::from("/var/scratch")),
            ..Default::default()
        };
        assert_eq!(explicit.scratch_root(), PathBuf::from("/var/scratch"));
    }
}
