//! Generic `LinkService` trait for network services that ride on the WiFi
//! link (mDNS responder, OTA update listener, …).

use aproam_types::LinkError;

/// A network-facing service started once the link is first up and polled on
/// every control-loop tick afterwards.
pub trait LinkService: Send {
    /// Stable identifier for this service, e.g. `"mdns"`.
    fn name(&self) -> &str;

    /// Start the service under the device `hostname`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Service`] if the service cannot start.  The
    /// manager logs the failure and never polls the service.
    fn start(&mut self, hostname: &str) -> Result<(), LinkError>;

    /// Give the service a slice of the control thread.
    fn poll(&mut self) {}
}
