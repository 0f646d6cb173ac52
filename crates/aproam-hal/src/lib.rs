//! `aproam-hal` – collaborator interfaces of the connectivity manager.
//!
//! # Modules
//!
//! - [`radio`] – [`Radio`][radio::Radio]: the station-mode WiFi interface
//!   (associate, status, signal, scan).
//! - [`clock`] – [`Clock`][clock::Clock]: monotonic milliseconds and the
//!   blocking delay every wait goes through.
//! - [`settings`] – [`SettingsStore`][settings::SettingsStore]: persisted
//!   string settings for the network name, passphrase and hostname.
//! - [`service`] – [`LinkService`][service::LinkService]: services that start
//!   once the link is up and are polled from the control loop.
//! - [`sim`] – simulation drivers for headless tests.

pub mod clock;
pub mod radio;
pub mod service;
pub mod settings;
pub mod sim;

pub use clock::{Clock, SystemClock};
pub use radio::{CHANNEL_AUTO, JoinRequest, Radio};
pub use service::LinkService;
pub use settings::{KEY_HOSTNAME, KEY_NETWORK_NAME, KEY_PASSPHRASE, MemorySettings, SettingsStore};
