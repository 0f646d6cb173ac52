use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum SSID length in bytes (IEEE 802.11).
pub const SSID_MAX_LEN: usize = 32;
/// Maximum WPA2 passphrase length in bytes.
pub const PASSPHRASE_MAX_LEN: usize = 63;
/// Maximum device hostname length in bytes.
pub const HOSTNAME_MAX_LEN: usize = 32;

/// Hardware address of one access point's radio (BSSID).
///
/// Serialises as the usual colon-separated hex form, e.g. `"AA:BB:CC:00:11:22"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bssid(pub [u8; 6]);

impl Bssid {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for Bssid {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for octet in &mut octets {
            let part = parts
                .next()
                .ok_or_else(|| LinkError::InvalidBssid(s.to_string()))?;
            if part.len() != 2 {
                return Err(LinkError::InvalidBssid(s.to_string()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| LinkError::InvalidBssid(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(LinkError::InvalidBssid(s.to_string()));
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for Bssid {
    type Error = LinkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bssid> for String {
    fn from(value: Bssid) -> Self {
        value.to_string()
    }
}

/// Association status as reported by the radio layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Disconnected,
    Connected,
}

/// Snapshot of the current link, owned by the connectivity manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkState {
    pub status: LinkStatus,
    /// Received signal strength of the current association in dBm.
    pub rssi_dbm: i32,
    /// BSSID of the access point we are associated with, if any.
    pub bssid: Option<Bssid>,
}

impl LinkState {
    pub const fn disconnected() -> Self {
        Self {
            status: LinkStatus::Disconnected,
            rssi_dbm: 0,
            bssid: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == LinkStatus::Connected
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// One access point seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub ssid: String,
    pub rssi_dbm: i32,
    pub bssid: Bssid,
    #[serde(default)]
    pub channel: u8,
}

/// Result of a single scan-and-roam pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoamOutcome {
    /// The scan returned nothing usable for the configured network.
    NoCandidates,
    /// Matching access points were seen, none beat the hysteresis margin.
    NoImprovement,
    /// Associated with the selected candidate.
    RoamedToTarget,
    /// Associated with the network, but not with the selected candidate.
    RoamedToFallback,
    /// Both the targeted and the generic association failed.
    RoamFailed,
}

impl fmt::Display for RoamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RoamOutcome::NoCandidates => "no_candidates",
            RoamOutcome::NoImprovement => "no_improvement",
            RoamOutcome::RoamedToTarget => "roamed_to_target",
            RoamOutcome::RoamedToFallback => "roamed_to_fallback",
            RoamOutcome::RoamFailed => "roam_failed",
        };
        f.write_str(label)
    }
}

/// Network name, passphrase and hostname the device joins with.
///
/// Built through [`NetworkCredentials::new`], which enforces the 802.11 length
/// limits. The passphrase never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct NetworkCredentials {
    network_name: String,
    passphrase: String,
    hostname: String,
}

impl NetworkCredentials {
    /// Validate and build a credential set.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidCredentials`] when the network name or
    /// hostname is empty, or any field exceeds its byte limit.
    pub fn new(
        network_name: impl Into<String>,
        passphrase: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Result<Self, LinkError> {
        let network_name = network_name.into();
        let passphrase = passphrase.into();
        let hostname = hostname.into();

        if network_name.is_empty() {
            return Err(LinkError::InvalidCredentials(
                "network name cannot be empty".to_string(),
            ));
        }
        if network_name.len() > SSID_MAX_LEN {
            return Err(LinkError::InvalidCredentials(format!(
                "network name is {} bytes, limit is {SSID_MAX_LEN}",
                network_name.len()
            )));
        }
        if passphrase.len() > PASSPHRASE_MAX_LEN {
            return Err(LinkError::InvalidCredentials(format!(
                "passphrase is {} bytes, limit is {PASSPHRASE_MAX_LEN}",
                passphrase.len()
            )));
        }
        if hostname.is_empty() {
            return Err(LinkError::InvalidCredentials(
                "hostname cannot be empty".to_string(),
            ));
        }
        if hostname.len() > HOSTNAME_MAX_LEN {
            return Err(LinkError::InvalidCredentials(format!(
                "hostname is {} bytes, limit is {HOSTNAME_MAX_LEN}",
                hostname.len()
            )));
        }

        Ok(Self {
            network_name,
            passphrase,
            hostname,
        })
    }

    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

impl fmt::Debug for NetworkCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkCredentials")
            .field("network_name", &self.network_name)
            .field(
                "passphrase",
                if self.passphrase.is_empty() { &"<open>" } else { &"<redacted>" },
            )
            .field("hostname", &self.hostname)
            .finish()
    }
}

/// Error type shared by the radio, settings, service and CLI layers.
///
/// None of these are fatal to the connectivity manager; it logs them and
/// keeps the device in a well-defined link state.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid BSSID: {0:?}")]
    InvalidBssid(String),

    #[error("Radio fault during {operation}: {details}")]
    RadioFault { operation: String, details: String },

    #[error("Settings store error: {0}")]
    Settings(String),

    #[error("Link service {service} failed: {details}")]
    Service { service: String, details: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Scenario error: {0}")]
    Scenario(String),
}
