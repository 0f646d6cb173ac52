//! [`ConnectivityManager`] – owner of the link, the roam timer and the radio.
//!
//! The behaviour lives in sibling modules, each adding an `impl` block:
//!
//! | Module | Operation |
//! |---|---|
//! | [`associator`][crate::associator] | [`associate`][ConnectivityManager::associate] |
//! | [`roam`][crate::roam] | [`maybe_roam`][ConnectivityManager::maybe_roam], [`scan_and_roam`][ConnectivityManager::scan_and_roam] |
//! | [`reconnect`][crate::reconnect] | [`tick`][ConnectivityManager::tick] |
//! | [`bring_up`][crate::bring_up] | [`bring_up`][ConnectivityManager::bring_up] |

use aproam_hal::{Clock, LinkService, Radio, SettingsStore};
use aproam_types::{LinkError, LinkState, LinkStatus, NetworkCredentials};
use tracing::{info, warn};

use crate::bring_up::load_credentials;
use crate::policy::RoamPolicy;
use crate::reconnect::ReconnectBackoff;
use crate::timer::RoamTimer;

pub(crate) struct ServiceSlot {
    pub(crate) service: Box<dyn LinkService>,
    pub(crate) running: bool,
}

/// WiFi connectivity and roaming manager.
///
/// Single-threaded: every operation runs on the caller's thread and the
/// blocking ones (association, roam settle, scan) stall it until they finish.
pub struct ConnectivityManager<R: Radio, C: Clock> {
    pub(crate) radio: R,
    pub(crate) clock: C,
    pub(crate) credentials: NetworkCredentials,
    pub(crate) policy: RoamPolicy,
    pub(crate) link: LinkState,
    pub(crate) timer: RoamTimer,
    pub(crate) backoff: ReconnectBackoff,
    pub(crate) services: Vec<ServiceSlot>,
    pub(crate) services_started: bool,
}

impl<R: Radio, C: Clock> ConnectivityManager<R, C> {
    /// Create a manager.  Nothing touches the radio until
    /// [`bring_up`][Self::bring_up] or [`tick`][Self::tick] is called.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Config`] if `policy` fails validation.
    pub fn new(
        radio: R,
        clock: C,
        credentials: NetworkCredentials,
        policy: RoamPolicy,
    ) -> Result<Self, LinkError> {
        policy.validate()?;
        Ok(Self {
            radio,
            clock,
            credentials,
            backoff: ReconnectBackoff::new(policy.reconnect_backoff),
            policy,
            link: LinkState::disconnected(),
            timer: RoamTimer::new(),
            services: Vec::new(),
            services_started: false,
        })
    }

    /// Create a manager with credentials read from `settings`.
    ///
    /// # Errors
    ///
    /// Propagates settings read errors, invalid stored credentials, and
    /// policy validation errors.
    pub fn from_settings<S: SettingsStore + ?Sized>(
        radio: R,
        clock: C,
        settings: &S,
        policy: RoamPolicy,
    ) -> Result<Self, LinkError> {
        let credentials = load_credentials(settings)?;
        Self::new(radio, clock, credentials, policy)
    }

    /// Register a service to start after bring-up and poll on every tick.
    pub fn with_service(mut self, service: Box<dyn LinkService>) -> Self {
        self.add_service(service);
        self
    }

    pub fn add_service(&mut self, service: Box<dyn LinkService>) {
        self.services.push(ServiceSlot {
            service,
            running: false,
        });
    }

    /// Last observed link state.
    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn credentials(&self) -> &NetworkCredentials {
        &self.credentials
    }

    /// Timestamp of the last roam check or reconnect.
    pub fn last_roam_check_ms(&self) -> u64 {
        self.timer.last_check_ms()
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Mutable access to the radio, for drivers that need out-of-band
    /// configuration.  Changes are picked up on the next tick.
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Re-read status, signal and BSSID from the radio.
    pub(crate) fn refresh_link(&mut self) {
        let status = self.radio.link_status();
        self.link = match status {
            LinkStatus::Connected => LinkState {
                status,
                rssi_dbm: self.radio.rssi(),
                bssid: self.radio.bssid(),
            },
            LinkStatus::Disconnected => LinkState::disconnected(),
        };
    }

    /// Start every registered service.  Runs once; later calls are no-ops.
    pub(crate) fn start_services(&mut self) {
        if self.services_started {
            return;
        }
        self.services_started = true;
        let hostname = self.credentials.hostname();
        for slot in &mut self.services {
            match slot.service.start(hostname) {
                Ok(()) => {
                    info!(service = slot.service.name(), hostname, "link service started");
                    slot.running = true;
                }
                Err(e) => {
                    warn!(service = slot.service.name(), error = %e, "could not start link service");
                }
            }
        }
    }

    pub(crate) fn poll_services(&mut self) {
        for slot in self.services.iter_mut().filter(|s| s.running) {
            slot.service.poll();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aproam_hal::MemorySettings;
    use aproam_hal::sim::{SimClock, SimRadio};

    #[test]
    fn new_manager_starts_disconnected() {
        let clock = SimClock::new();
        let creds = NetworkCredentials::new("IOT", "", "ada").unwrap();
        let manager =
            ConnectivityManager::new(SimRadio::new(clock.clone()), clock, creds, RoamPolicy::default())
                .unwrap();
        assert!(!manager.link_state().is_connected());
        assert_eq!(manager.last_roam_check_ms(), 0);
        assert!(manager.radio().stats().joins.is_empty());
    }

    #[test]
    fn new_rejects_invalid_policy() {
        let clock = SimClock::new();
        let creds = NetworkCredentials::new("IOT", "", "ada").unwrap();
        let policy = RoamPolicy {
            associate_max_polls: 0,
            ..RoamPolicy::default()
        };
        let result = ConnectivityManager::new(SimRadio::new(clock.clone()), clock, creds, policy);
        assert!(matches!(result, Err(LinkError::Config(_))));
    }

    #[test]
    fn from_settings_reads_stored_credentials() {
        let clock = SimClock::new();
        let settings = MemorySettings::from_pairs([
            ("wifi_ssid", "Workshop"),
            ("wifi_key", "s3cret-pass"),
            ("robot_name", "prop-7"),
        ]);
        let manager = ConnectivityManager::from_settings(
            SimRadio::new(clock.clone()),
            clock,
            &settings,
            RoamPolicy::default(),
        )
        .unwrap();
        assert_eq!(manager.credentials().network_name(), "Workshop");
        assert_eq!(manager.credentials().hostname(), "prop-7");
    }
}
