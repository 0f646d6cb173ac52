//! `aproam-link` – Connectivity & Roaming
//!
//! Keeps a device associated with its configured WiFi network and hops to a
//! stronger access point of the same network when the signal degrades.
//!
//! # Modules
//!
//! - [`manager`] – [`ConnectivityManager`][manager::ConnectivityManager]:
//!   owns the radio, the clock, the credentials and the observed link state.
//! - [`bring_up`] – credential loading from a
//!   [`SettingsStore`][aproam_hal::SettingsStore] and the blocking startup
//!   loop that runs until the first association succeeds.
//! - [`associator`] – one bounded association attempt, optionally pinned to
//!   a BSSID.
//! - [`reconnect`] – [`tick`][manager::ConnectivityManager::tick], the
//!   periodic entry point: reconnect when down, evaluate roaming when up.
//! - [`roam`] – the rate-limited roam check and the scan/select/switch
//!   sequence with its fallback.
//! - [`selector`] – pure hysteresis selection over scan results.
//! - [`scan_guard`] – [`ScanGuard`][scan_guard::ScanGuard], which releases
//!   radio scan results exactly once.
//! - [`timer`] – the wrap-safe roam check timer.
//! - [`policy`] – [`RoamPolicy`][policy::RoamPolicy] tunables and defaults.
//!
//! # Example
//!
//! ```
//! use aproam_hal::sim::{SimAccessPoint, SimClock, SimRadio};
//! use aproam_link::{ConnectivityManager, RoamPolicy, TickOutcome};
//! use aproam_types::{Bssid, NetworkCredentials};
//!
//! let clock = SimClock::new();
//! let ap = Bssid::new([0x02, 0, 0, 0, 0, 1]);
//! let radio = SimRadio::new(clock.clone()).with_access_point(SimAccessPoint::new("IOT", ap, -60));
//! let creds = NetworkCredentials::new("IOT", "", "ada").unwrap();
//! let mut manager = ConnectivityManager::new(radio, clock, creds, RoamPolicy::default()).unwrap();
//!
//! manager.bring_up();
//! assert_eq!(manager.link_state().bssid, Some(ap));
//! assert!(matches!(manager.tick(), TickOutcome::Roam(_)));
//! ```

pub mod associator;
pub mod bring_up;
pub mod manager;
pub mod policy;
pub mod reconnect;
pub mod roam;
pub mod scan_guard;
pub mod selector;
pub mod timer;

pub use bring_up::{DEFAULT_HOSTNAME, DEFAULT_NETWORK_NAME, load_credentials, store_credentials};
pub use manager::ConnectivityManager;
pub use policy::{BackoffPolicy, RoamPolicy};
pub use reconnect::{ReconnectBackoff, TickOutcome};
pub use roam::RoamCheck;
pub use scan_guard::ScanGuard;
pub use selector::{CandidateSelection, select_candidate};
pub use timer::RoamTimer;
