//! Simulation scenarios: a radio world plus a timeline of changes to it.
//!
//! ```toml
//! duration_ms = 120000
//! tick_ms = 1000
//!
//! [credentials]
//! ssid = "IOT"
//! passphrase = ""
//! hostname = "ada"
//!
//! [[access_point]]
//! ssid = "IOT"
//! bssid = "02:00:00:00:00:01"
//! rssi_dbm = -60
//!
//! [[event]]
//! at_ms = 40000
//! action = "set_rssi"
//! bssid = "02:00:00:00:00:01"
//! rssi_dbm = -88
//! ```

use std::path::Path;

use aproam_hal::sim::{SimAccessPoint, SimClock, SimRadio};
use aproam_types::{Bssid, LinkError, NetworkCredentials};
use serde::Deserialize;
use tracing::{info, warn};

fn default_duration_ms() -> u64 {
    120_000
}
fn default_tick_ms() -> u64 {
    1_000
}
fn default_channel() -> u8 {
    1
}
fn default_accepts() -> bool {
    true
}

/// A whole scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,

    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Overrides the vault's stored credentials for this run.
    #[serde(default)]
    pub credentials: Option<CredentialSpec>,

    #[serde(default, rename = "access_point")]
    pub access_points: Vec<AccessPointSpec>,

    #[serde(default, rename = "event")]
    pub events: Vec<ScenarioEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialSpec {
    pub ssid: String,
    #[serde(default)]
    pub passphrase: String,
    #[serde(default = "default_hostname")]
    pub hostname: String,
}

fn default_hostname() -> String {
    aproam_link::DEFAULT_HOSTNAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessPointSpec {
    pub ssid: String,
    pub bssid: Bssid,
    pub rssi_dbm: i32,
    #[serde(default = "default_channel")]
    pub channel: u8,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub join_latency_ms: u64,
    #[serde(default = "default_accepts")]
    pub accepts_association: bool,
}

impl AccessPointSpec {
    pub fn to_sim(&self) -> SimAccessPoint {
        SimAccessPoint {
            ssid: self.ssid.clone(),
            bssid: self.bssid,
            rssi_dbm: self.rssi_dbm,
            channel: self.channel,
            passphrase: self.passphrase.clone(),
            accepts_association: self.accepts_association,
            join_latency_ms: self.join_latency_ms,
        }
    }
}

/// A change to the world applied once the simulated clock reaches `at_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScenarioEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: EventAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EventAction {
    SetRssi { bssid: Bssid, rssi_dbm: i32 },
    DropLink,
    RemoveAp { bssid: Bssid },
    AddAp { access_point: AccessPointSpec },
    /// Send targeted joins for `from` to `to` instead.
    Redirect { from: Bssid, to: Bssid },
}

impl EventAction {
    pub fn apply(&self, radio: &mut SimRadio) {
        match self {
            EventAction::SetRssi { bssid, rssi_dbm } => {
                if radio.set_rssi(*bssid, *rssi_dbm) {
                    info!(bssid = %bssid, rssi = rssi_dbm, "signal changed");
                } else {
                    warn!(bssid = %bssid, "set_rssi for unknown access point");
                }
            }
            EventAction::DropLink => {
                info!("link dropped");
                radio.drop_link();
            }
            EventAction::RemoveAp { bssid } => {
                info!(bssid = %bssid, "access point removed");
                radio.remove_access_point(*bssid);
            }
            EventAction::AddAp { access_point } => {
                info!(bssid = %access_point.bssid, rssi = access_point.rssi_dbm, "access point added");
                radio.add_access_point(access_point.to_sim());
            }
            EventAction::Redirect { from, to } => {
                info!(from = %from, to = %to, "targeted joins redirected");
                radio.redirect(*from, *to);
            }
        }
    }
}

impl Scenario {
    /// Parse and validate a scenario.  Events are sorted by `at_ms`, keeping
    /// file order for equal times.
    pub fn parse(raw: &str) -> Result<Self, LinkError> {
        let mut scenario: Scenario =
            toml::from_str(raw).map_err(|e| LinkError::Scenario(e.to_string()))?;
        if scenario.tick_ms == 0 {
            return Err(LinkError::Scenario("tick_ms must be positive".to_string()));
        }
        scenario.events.sort_by_key(|e| e.at_ms);
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, LinkError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LinkError::Scenario(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    /// Validated credentials from the `[credentials]` table, if present.
    pub fn credentials(&self) -> Result<Option<NetworkCredentials>, LinkError> {
        self.credentials
            .as_ref()
            .map(|c| NetworkCredentials::new(&c.ssid, &c.passphrase, &c.hostname))
            .transpose()
    }

    /// A radio populated with the initial access points.
    pub fn build_radio(&self, clock: SimClock) -> SimRadio {
        let mut radio = SimRadio::new(clock);
        for ap in &self.access_points {
            radio.add_access_point(ap.to_sim());
        }
        radio
    }

    pub fn timeline(&self) -> Timeline {
        Timeline {
            events: self.events.clone(),
            next: 0,
        }
    }
}

/// Cursor over a scenario's sorted events.
#[derive(Debug, Clone)]
pub struct Timeline {
    events: Vec<ScenarioEvent>,
    next: usize,
}

impl Timeline {
    /// Apply every not-yet-applied event with `at_ms <= now_ms`.  Returns how
    /// many were applied.
    pub fn apply_due(&mut self, now_ms: u64, radio: &mut SimRadio) -> usize {
        let start = self.next;
        while let Some(event) = self.events.get(self.next) {
            if event.at_ms > now_ms {
                break;
            }
            event.action.apply(radio);
            self.next += 1;
        }
        self.next - start
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.next
    }
}
