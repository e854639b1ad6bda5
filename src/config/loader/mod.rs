use crate::config::Config;
use crate::utils::{atomic_write, ensure_dir, get_crm_home, restrict_permissions};
use anyhow::{Context, Result};
use fs2::FileExt;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Overrides `api.baseUrl`.
pub const ENV_API_URL: &str = "CRM_API_URL";
/// Overrides `storage.path`.
pub const ENV_SESSION_PATH: &str = "CRM_SESSION_PATH";

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_crm_home()?.join("config.json"))
}

pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let default_path = get_config_path().unwrap_or_else(|_| PathBuf::from("config.json"));
    let path = config_path.unwrap_or(default_path.as_path());

    let mut config = if path.exists() {
        // Shared lock on the same sibling file save_config locks exclusively
        let lock_file = open_lock_file(path)?;
        FileExt::lock_shared(&lock_file)
            .with_context(|| "Failed to acquire shared lock on config lock file")?;

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let data: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?;

        check_file_permissions(path);
        serde_json::from_value(migrate_config(data))
            .with_context(|| "Failed to deserialize config")?
    } else {
        debug!("no config at {}, using defaults", path.display());
        Config::default()
    };

    apply_env_overrides(&mut config);
    config
        .validate()
        .with_context(|| "Configuration validation failed")?;
    Ok(config)
}

/// Environment variables win over the config file (useful for containers and CI).
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(url) = std::env::var(ENV_API_URL)
        && !url.is_empty()
    {
        config.api.base_url = url;
    }
    if let Ok(path) = std::env::var(ENV_SESSION_PATH)
        && !path.is_empty()
    {
        config.storage.path = Some(path);
    }
}

/// Warn if the config file has overly permissive permissions.
#[cfg(unix)]
fn check_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(meta) = fs::metadata(path) {
        let mode = meta.permissions().mode();
        if mode & 0o077 != 0 {
            warn!(
                "config file {} has permissions {:o}, recommend 0600",
                path.display(),
                mode & 0o777
            );
        }
    }
}

#[cfg(not(unix))]
fn check_file_permissions(_path: &Path) {}

/// Early configs carried a flat `apiUrl`; move it under `api.baseUrl`.
fn migrate_config(data: Value) -> Value {
    if let Value::Object(mut map) = data {
        if let Some(url) = map.remove("apiUrl") {
            let api = map
                .entry("api")
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if let Value::Object(api_map) = api
                && !api_map.contains_key("baseUrl")
            {
                api_map.insert("baseUrl".to_string(), url);
            }
        }
        Value::Object(map)
    } else {
        data
    }
}

pub fn save_config(config: &Config, config_path: Option<&Path>) -> Result<()> {
    let default_path = get_config_path().unwrap_or_else(|_| PathBuf::from("config.json"));
    let path = config_path.unwrap_or(default_path.as_path());

    ensure_dir(path.parent().context("Config path has no parent")?)?;

    // atomic_write() renames over the target, so lock a sibling file instead
    let lock_file = open_lock_file(path)?;
    lock_file
        .lock_exclusive()
        .with_context(|| "Failed to acquire exclusive lock on config lock file")?;

    let content = serde_json::to_string_pretty(config)?;
    atomic_write(path, &content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    restrict_permissions(path);

    Ok(())
}

fn open_lock_file(path: &Path) -> Result<fs::File> {
    let lock_path = path.with_extension("json.lock");
    fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file at {}", lock_path.display()))
}
