//! Persisted key/value configuration (network name, passphrase, hostname).
//!
//! The storage format belongs to the implementation; the connectivity
//! manager only sees opaque strings under the keys below.

use std::collections::BTreeMap;

use aproam_types::LinkError;

/// Key holding the network name (SSID).
pub const KEY_NETWORK_NAME: &str = "wifi_ssid";
/// Key holding the WPA passphrase.
pub const KEY_PASSPHRASE: &str = "wifi_key";
/// Key holding the device hostname.
pub const KEY_HOSTNAME: &str = "robot_name";

/// String-valued persistent settings.
pub trait SettingsStore {
    /// Read `key`.  `Ok(None)` when the key has never been written.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Settings`] if the backing storage is unreadable.
    fn get_string(&self, key: &str) -> Result<Option<String>, LinkError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Settings`] if the backing storage rejects the write.
    fn set_string(&mut self, key: &str, value: &str) -> Result<(), LinkError>;
}

/// In-memory settings store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySettings {
    values: BTreeMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `pairs`.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Borrow every stored pair.
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl SettingsStore for MemorySettings {
    fn get_string(&self, key: &str) -> Result<Option<String>, LinkError> {
        Ok(self.values.get(key).cloned())
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), LinkError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let store = MemorySettings::new();
        assert_eq!(store.get_string(KEY_NETWORK_NAME).unwrap(), None);
    }

    #[test]
    fn set_then_get() {
        let mut store = MemorySettings::new();
        store.set_string(KEY_HOSTNAME, "ada").unwrap();
        store.set_string(KEY_HOSTNAME, "grace").unwrap();
        assert_eq!(store.get_string(KEY_HOSTNAME).unwrap().as_deref(), Some("grace"));
    }

    #[test]
    fn from_pairs_populates_values() {
        let store = MemorySettings::from_pairs([(KEY_NETWORK_NAME, "IOT"), (KEY_PASSPHRASE, "pw")]);
        assert_eq!(store.values().len(), 2);
        assert_eq!(store.get_string(KEY_PASSPHRASE).unwrap().as_deref(), Some("pw"));
    }
}
