//! Configuration Vault – reads/writes `~/.aproam/config.toml`.
//!
//! The `[settings]` table is the device's persisted key/value store; the
//! vault implements [`SettingsStore`] over it so credentials are loaded and
//! provisioned through the same code path the device uses.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use aproam_hal::{KEY_HOSTNAME, KEY_NETWORK_NAME, KEY_PASSPHRASE, SettingsStore};
use aproam_link::RoamPolicy;
use aproam_types::LinkError;
use serde::{Deserialize, Serialize};

/// Persisted configuration stored in `~/.aproam/config.toml`.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Roaming and association tunables.
    #[serde(default)]
    pub policy: RoamPolicy,

    /// Persisted key/value settings (`wifi_ssid`, `wifi_key`, `robot_name`).
    /// Stored as plain text; the file is written owner-only.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settings: BTreeMap<&str, &str> = self
            .settings
            .iter()
            .map(|(k, v)| {
                let shown = if k != KEY_PASSPHRASE {
                    v.as_str()
                } else if v.is_empty() {
                    "<not set>"
                } else {
                    "<redacted>"
                };
                (k.as_str(), shown)
            })
            .collect();
        f.debug_struct("Config")
            .field("policy", &self.policy)
            .field("settings", &settings)
            .finish()
    }
}

impl SettingsStore for Config {
    fn get_string(&self, key: &str) -> Result<Option<String>, LinkError> {
        Ok(self.settings.get(key).cloned())
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), LinkError> {
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Return the path to `~/.aproam/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".aproam").join("config.toml")
}

/// Load the config at `path`, or the defaults when the file is absent.
/// Env overrides are applied in both cases.
pub fn load_or_default(path: &Path) -> Result<Config, LinkError> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.  Env overrides are not applied.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, LinkError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| LinkError::Config(format!("failed to read {}: {e}", path.display())))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| LinkError::Config(format!("failed to parse {}: {e}", path.display())))?;
    cfg.policy.validate()?;
    Ok(Some(cfg))
}

/// Apply `APROAM_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `APROAM_WIFI_SSID` | `settings.wifi_ssid` |
/// | `APROAM_WIFI_KEY` | `settings.wifi_key` |
/// | `APROAM_HOSTNAME` | `settings.robot_name` |
/// | `APROAM_ROAM_INTERVAL_MS` | `policy.roam_check_interval_ms` |
pub fn apply_env_overrides(cfg: &mut Config) {
    for (var, key) in [
        ("APROAM_WIFI_SSID", KEY_NETWORK_NAME),
        ("APROAM_WIFI_KEY", KEY_PASSPHRASE),
        ("APROAM_HOSTNAME", KEY_HOSTNAME),
    ] {
        if let Ok(v) = std::env::var(var) {
            cfg.settings.insert(key.to_string(), v);
        }
    }
    if let Ok(v) = std::env::var("APROAM_ROAM_INTERVAL_MS")
        && let Ok(ms) = v.parse::<u64>()
        && ms > 0
    {
        cfg.policy.roam_check_interval_ms = ms;
    }
}

/// Save the config to a specific path, creating the parent directory if
/// necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), LinkError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| LinkError::Config(format!("failed to create config directory: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                LinkError::Config(format!("failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| LinkError::Config(format!("failed to serialize config: {e}")))?;
    let write_err = |e: std::io::Error| {
        LinkError::Config(format!("failed to write {}: {e}", path.display()))
    };
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}
