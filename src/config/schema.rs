/// Configuration schema and defaults for the abcxyz client.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[api]`, `[upload]`, `[refresh]`, `[chat]`, `[logging]` and `[web]`.
///
/// Every field has a sensible built-in default. Users only need to set the
/// values they want to override.
use serde::{Deserialize, Serialize};

/// Backend address used when no origin is configured.
pub const DEFAULT_FALLBACK_URL: &str = "http://localhost:5000";

/// Largest workbook accepted for upload (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level abcxyz configuration.
///
/// Maps directly to the `~/.abcxyz/config.toml` and `.abcxyz.toml` file
/// schemas. All sections and fields are optional; missing values fall back
/// to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AbcxyzConfig {
    pub api: ApiConfig,
    pub upload: UploadConfig,
    pub refresh: RefreshConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
    pub web: WebConfig,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Backend API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Origin the backend is served from. Empty or `"null"` means "unknown",
    /// in which case `fallback_url` is used.
    pub origin: String,
    /// Hardcoded local address used when the origin is unavailable.
    pub fallback_url: String,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
    /// Row limit passed to `/api/analysis-data`.
    pub analysis_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            origin: String::new(),
            fallback_url: DEFAULT_FALLBACK_URL.to_string(),
            timeout_ms: 30_000,
            analysis_limit: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// [upload]
// ---------------------------------------------------------------------------

/// Client-side upload validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum file size in bytes.
    pub max_size_bytes: u64,
    /// Accepted extensions, including the leading dot. Compared
    /// case-insensitively.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: vec![".xls".to_string(), ".xlsx".to_string()],
        }
    }
}

// ---------------------------------------------------------------------------
// [refresh]
// ---------------------------------------------------------------------------

/// Auto-refresh polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Interval between stats checks (milliseconds).
    pub interval_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [chat]
// ---------------------------------------------------------------------------

/// Chat widget behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Lower bound of the simulated typing delay (milliseconds).
    pub min_delay_ms: u64,
    /// Upper bound (exclusive) of the simulated typing delay (milliseconds).
    pub max_delay_ms: u64,
    /// Delay before the input is focused after the chat opens.
    pub focus_delay_ms: u64,
    /// Keep the transcript across sessions until the next full reload.
    pub persist_history: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1_000,
            max_delay_ms: 2_000,
            focus_delay_ms: 300,
            persist_history: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append pipeline actions to `~/.abcxyz/activity.jsonl`.
    pub enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Local dashboard server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub addr: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl AbcxyzConfig {
    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `abcxyz config init` to create a starting config file with
    /// all settings documented.
    pub fn default_toml() -> String {
        r#"# abcxyz Configuration
# Client for the ABC/XYZ inventory analysis service
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (ABCXYZ_*)
#   2. Project config (.abcxyz.toml in current directory)
#   3. User global config (~/.abcxyz/config.toml)
#   4. Built-in defaults

[api]
origin = ""                           # Empty -> fallback_url
fallback_url = "http://localhost:5000"
timeout_ms = 30000
analysis_limit = 1000

[upload]
max_size_bytes = 10485760             # 10 MiB
allowed_extensions = [".xls", ".xlsx"]

[refresh]
interval_ms = 30000

[chat]
min_delay_ms = 1000
max_delay_ms = 2000
focus_delay_ms = 300
persist_history = true

[logging]
enabled = true                        # ~/.abcxyz/activity.jsonl

[web]
addr = "127.0.0.1:9747"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = AbcxyzConfig::default();
        assert!(config.api.origin.is_empty());
        assert_eq!(config.api.fallback_url, "http://localhost:5000");
        assert_eq!(config.upload.max_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.upload.allowed_extensions, vec![".xls", ".xlsx"]);
        assert_eq!(config.refresh.interval_ms, 30_000);
        assert_eq!(config.chat.min_delay_ms, 1_000);
        assert_eq!(config.chat.max_delay_ms, 2_000);
        assert!(config.logging.enabled);
    }

    #[test]
    fn deserialize_minimal_toml() {
        let toml_str = r#"
[api]
origin = "http://analytics.local:8080"
"#;
        let config: AbcxyzConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.origin, "http://analytics.local:8080");
        // Unset fields keep their defaults
        assert_eq!(config.api.timeout_ms, 30_000);
        assert_eq!(config.refresh.interval_ms, 30_000);
    }

    #[test]
    fn empty_toml_produces_defaults() {
        let config: AbcxyzConfig = toml::from_str("").unwrap();
        assert_eq!(config.web.addr, "127.0.0.1:9747");
        assert!(config.chat.persist_history);
    }

    #[test]
    fn default_toml_parses_back() {
        let toml_str = AbcxyzConfig::default_toml();
        let config: AbcxyzConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.upload.max_size_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.api.analysis_limit, 1000);
    }
}
