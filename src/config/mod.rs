/// Configuration system for roadseg.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::RoadsegConfig::default()`]
/// 2. **User global config**: `~/.roadseg/config.toml`
/// 3. **Project local config**: `.roadseg.toml` in the current working directory
/// 4. **Environment variables**: `ROADSEG_*` overrides (highest precedence)
///
/// Later layers override earlier ones at the key level: a file that only
/// sets `backend.base_url` leaves every other value from the layer below
/// untouched.
///
/// # Usage
///
/// ```rust,ignore
/// use roadseg::config;
///
/// let cfg = config::load();
/// let source = HttpSource::from_config(&cfg.backend);
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::RoadsegConfig;

use crate::source::DateRange;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges defaults → global TOML → project TOML → env vars. Malformed files
/// are skipped so a broken config never blocks the map from loading.
pub fn load() -> RoadsegConfig {
    let mut layers = Vec::new();
    if let Some(global) = load_toml_value(global_config_path()) {
        layers.push(global);
    }
    if let Some(project) = load_toml_value(project_config_path()) {
        layers.push(project);
    }

    let mut config = resolve_layers(&layers);
    apply_env_overrides(&mut config);
    sanitize(&mut config);
    config
}

/// Merge TOML layers over the built-in defaults.
///
/// Falls back to the defaults if the merged tree does not deserialize
/// (e.g. a value of the wrong type in one of the files).
pub fn resolve_layers(layers: &[toml::Value]) -> RoadsegConfig {
    let Ok(mut merged) = toml::Value::try_from(RoadsegConfig::default()) else {
        return RoadsegConfig::default();
    };
    for layer in layers {
        merge_values(&mut merged, layer);
    }
    merged.try_into().unwrap_or_default()
}

/// Read a TOML file into an untyped value tree.
fn load_toml_value(path: Option<PathBuf>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key; any
/// other value replaces the base value.
fn merge_values(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Replace values that would make the layer meaningless.
fn sanitize(config: &mut RoadsegConfig) {
    if !config.density.is_valid() {
        config.density = Default::default();
    }
    if !(config.grouping.coord_tolerance_deg.is_finite()
        && config.grouping.coord_tolerance_deg >= 0.0)
    {
        config.grouping.coord_tolerance_deg = crate::segments::grouping::DEFAULT_COORD_TOLERANCE_DEG;
    }
    if !config.grouping.max_gap_secs.is_finite() {
        config.grouping.max_gap_secs = crate::segments::grouping::DEFAULT_MAX_GAP_SECS;
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Directory holding the global config and logs: `~/.roadseg`.
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".roadseg"))
}

fn global_config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".roadseg.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(Path::new(path).to_path_buf()),
    }
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `ROADSEG_BACKEND_URL`: backend base URL
/// - `ROADSEG_TIMEOUT_MS`: request timeout
/// - `ROADSEG_SESSION`: `Cookie` header value
/// - `ROADSEG_DATE_RANGE`: default date range (`all`, `today`, `week`, `month`)
/// - `ROADSEG_WEB_ADDR`: viewer listen address
/// - `ROADSEG_LOGGING`: fetch logging (`1`/`true`/`yes`/`on`)
fn apply_env_overrides(config: &mut RoadsegConfig) {
    if let Ok(val) = std::env::var("ROADSEG_BACKEND_URL")
        && !val.is_empty()
    {
        config.backend.base_url = val;
    }
    if let Ok(val) = std::env::var("ROADSEG_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.backend.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("ROADSEG_SESSION") {
        config.backend.session_cookie = val;
    }
    if let Ok(val) = std::env::var("ROADSEG_DATE_RANGE")
        && let Some(range) = DateRange::parse(&val)
    {
        config.backend.default_date_range = range;
    }
    if let Ok(val) = std::env::var("ROADSEG_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
    if let Ok(val) = std::env::var("ROADSEG_LOGGING") {
        config.logging.enabled = is_truthy(&val);
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

/// Write the default annotated config to `~/.roadseg/config.toml`.
///
/// Returns an error if the file already exists, unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    write_config_file(&path, &RoadsegConfig::default_toml())?;
    Ok(path)
}

/// Set a single config key in the global config file.
///
/// Supports dotted keys like `backend.base_url`. The existing value's TOML
/// type decides how `value` is parsed. If no global file exists yet, the
/// defaults are written out first.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(&path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        toml::Value::try_from(RoadsegConfig::default())
            .context("failed to serialize default config")?
    };

    set_toml_value(&mut root, key, value)?;

    // Reject edits that would no longer load.
    let _: RoadsegConfig = root
        .clone()
        .try_into()
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    write_config_file(&path, &output)
}

fn write_config_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.roadseg/ directory")?;
    }
    fs::write(path, content).context("failed to write config file")
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let Some((section_path, leaf)) = key.rsplit_once('.') else {
        anyhow::bail!("config key must be dotted, e.g. backend.base_url (got '{key}')");
    };

    let mut current = root;
    for part in section_path.split('.') {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{section_path}'"))?;

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
