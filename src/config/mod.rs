/// Configuration system for abcxyz.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::AbcxyzConfig::default()`]
/// 2. **User global config**: `~/.abcxyz/config.toml`
/// 3. **Project local config**: `.abcxyz.toml` in the current working directory
/// 4. **Environment variables**: `ABCXYZ_*` overrides (highest precedence)
///
/// Later layers replace earlier ones. Missing sections in a TOML file fall
/// back to the built-in defaults.
///
/// # Usage
///
/// ```rust,ignore
/// use abcxyz::config;
///
/// let cfg = config::load();
/// let client = ApiClient::from_config(&cfg.api);
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::AbcxyzConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved abcxyz configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> AbcxyzConfig {
    let mut config = load_layers(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config);
    config
}

/// Merge the TOML files at `paths` (later wins, key by key) over the
/// built-in defaults.
///
/// Missing files are skipped. A malformed file never stops the client from
/// starting; it is reported on stderr and skipped.
pub fn load_layers(paths: &[Option<PathBuf>]) -> AbcxyzConfig {
    let mut merged = toml::Value::Table(toml::Table::new());
    for path in paths.iter().flatten() {
        if let Some(layer) = load_toml_file(path) {
            merge_toml(&mut merged, layer);
        }
    }
    match merged.try_into() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ignoring config files with invalid values: {e}");
            AbcxyzConfig::default()
        }
    }
}

/// Read a TOML file as a raw value tree.
fn load_toml_file(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            eprintln!("ignoring malformed config {}: {e}", path.display());
            None
        }
    }
}

/// Deep-merge `overlay` into `base`. Tables merge per key; any other value
/// replaces what was there.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Directory holding the global config and the activity log: `~/.abcxyz/`.
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".abcxyz"))
}

/// Path to the user global config: `~/.abcxyz/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    home_dir().map(|dir| dir.join("config.toml"))
}

/// Path to the project local config: `.abcxyz.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".abcxyz.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `ABCXYZ_ORIGIN` / `ABCXYZ_BASE_URL`: backend origin
/// - `ABCXYZ_TIMEOUT_MS`: HTTP request timeout
/// - `ABCXYZ_REFRESH_MS`: auto-refresh interval
/// - `ABCXYZ_LOG`: activity log on/off (`1`/`true`/`yes`/`on`)
/// - `ABCXYZ_WEB_ADDR`: dashboard listen address
fn apply_env_overrides(config: &mut AbcxyzConfig) {
    for key in ["ABCXYZ_BASE_URL", "ABCXYZ_ORIGIN"] {
        if let Ok(val) = std::env::var(key)
            && !val.is_empty()
        {
            config.api.origin = val;
        }
    }
    if let Ok(val) = std::env::var("ABCXYZ_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("ABCXYZ_REFRESH_MS")
        && let Ok(ms) = val.parse::<u64>()
        && ms > 0
    {
        config.refresh.interval_ms = ms;
    }
    if let Ok(val) = std::env::var("ABCXYZ_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("ABCXYZ_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.abcxyz/config.toml`.
///
/// Creates the `~/.abcxyz/` directory if it doesn't exist. Returns an error
/// if the file already exists (use `force = true` to overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.abcxyz/ directory")?;
    }

    fs::write(&path, AbcxyzConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Reads the current global config (or defaults), updates the specified key,
/// and writes the result back. Supports dotted keys like `api.origin`.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&AbcxyzConfig::default())
            .context("failed to serialize default config")?
    };

    let mut value_table: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut value_table, key, value)?;

    // Reject values that would no longer deserialize into the schema.
    let updated = toml::to_string_pretty(&value_table).context("failed to serialize config")?;
    toml::from_str::<AbcxyzConfig>(&updated)
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, updated).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!("empty config key segment in '{key}'");
    }

    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let leaf = parts[parts.len() - 1];

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(toml::Value::Array(_)) => toml::Value::Array(
            raw_value
                .split(',')
                .map(|s| toml::Value::String(s.trim().to_string()))
                .collect(),
        ),
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key: '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
