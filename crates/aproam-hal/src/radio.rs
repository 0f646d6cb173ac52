//! Generic `Radio` trait for the station-mode WiFi interface.
//!
//! The radio stack's connection state is global on real hardware; here it is
//! an owned collaborator so the connectivity manager can be driven against a
//! simulated radio in tests.

use aproam_types::{Bssid, LinkError, LinkStatus, ScanEntry};

/// Channel hint meaning "let the radio pick".
pub const CHANNEL_AUTO: u8 = 0;

/// Parameters for one association attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinRequest<'a> {
    pub ssid: &'a str,
    pub passphrase: &'a str,
    /// Channel hint; [`CHANNEL_AUTO`] scans all channels.
    pub channel: u8,
    /// Pin the association to one access point, bypassing the radio's own
    /// best-signal choice.
    pub bssid: Option<Bssid>,
}

/// A station-mode WiFi radio.
///
/// All calls are synchronous. [`Radio::begin`] only starts an association;
/// completion is observed by polling [`Radio::link_status`].
pub trait Radio: Send {
    /// Set the DHCP/mDNS hostname used once associated.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::RadioFault`] if the driver rejects the name.
    fn set_hostname(&mut self, hostname: &str) -> Result<(), LinkError>;

    /// Start an association attempt.  Returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::RadioFault`] if the request cannot be issued.
    fn begin(&mut self, request: &JoinRequest<'_>) -> Result<(), LinkError>;

    /// Current association status.
    fn link_status(&self) -> LinkStatus;

    /// Signal strength of the current association in dBm (0 when
    /// disconnected).
    fn rssi(&self) -> i32;

    /// BSSID of the current association, if any.
    fn bssid(&self) -> Option<Bssid>;

    /// Drop the current association.
    fn disassociate(&mut self);

    /// Enumerate visible access points.  Blocks for the scan duration.
    ///
    /// Results stay allocated in the driver until
    /// [`Radio::release_scan_results`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::RadioFault`] if the scan could not run.
    fn scan(&mut self) -> Result<Vec<ScanEntry>, LinkError>;

    /// Free the driver-side scan result buffer.
    fn release_scan_results(&mut self);
}
