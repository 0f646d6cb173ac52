//! Associator: one bounded association attempt.

use aproam_hal::{CHANNEL_AUTO, Clock, JoinRequest, Radio};
use aproam_types::{Bssid, LinkStatus};
use tracing::{info, instrument, warn};

use crate::manager::ConnectivityManager;

impl<R: Radio, C: Clock> ConnectivityManager<R, C> {
    /// Join the configured network, optionally pinned to `target`.
    ///
    /// Polls the link every `associate_poll_interval_ms` for at most
    /// `associate_max_polls` polls (10 s with the defaults) and returns
    /// `true` iff the radio reports `Connected` at the end.  Blocks the
    /// caller for the whole wait; there is no cancellation.
    #[instrument(skip(self), fields(network = %self.credentials.network_name()))]
    pub fn associate(&mut self, target: Option<Bssid>) -> bool {
        match target {
            Some(bssid) => info!(bssid = %bssid, "attempting targeted association"),
            None => info!("attempting association"),
        }

        let request = JoinRequest {
            ssid: self.credentials.network_name(),
            passphrase: self.credentials.passphrase(),
            channel: CHANNEL_AUTO,
            bssid: target,
        };
        if let Err(e) = self.radio.begin(&request) {
            warn!(error = %e, "radio rejected association request");
            self.refresh_link();
            return false;
        }

        let mut polls = 0;
        while self.radio.link_status() != LinkStatus::Connected
            && polls < self.policy.associate_max_polls
        {
            self.clock.sleep_millis(self.policy.associate_poll_interval_ms);
            polls += 1;
        }

        self.refresh_link();
        if self.link.is_connected() {
            info!(
                rssi = self.link.rssi_dbm,
                bssid = ?self.link.bssid.map(|b| b.to_string()),
                polls,
                "associated"
            );
            true
        } else {
            warn!(
                timeout_ms = self.policy.association_timeout_ms(),
                "association timed out"
            );
            false
        }
    }
}
