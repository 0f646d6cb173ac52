//! Startup: credential loading and the blocking bring-up loop.

use aproam_hal::{Clock, KEY_HOSTNAME, KEY_NETWORK_NAME, KEY_PASSPHRASE, Radio, SettingsStore};
use aproam_types::{LinkError, LinkStatus, NetworkCredentials};
use tracing::{info, warn};

use crate::manager::ConnectivityManager;

/// Network name used when none has been provisioned.
pub const DEFAULT_NETWORK_NAME: &str = "IOT";
/// Hostname used when none has been provisioned.
pub const DEFAULT_HOSTNAME: &str = "ada";

/// Read credentials from `settings`, falling back to the factory defaults
/// for keys that were never written.
///
/// # Errors
///
/// Propagates settings read errors and [`LinkError::InvalidCredentials`]
/// for stored values that break the length limits.
pub fn load_credentials<S: SettingsStore + ?Sized>(
    settings: &S,
) -> Result<NetworkCredentials, LinkError> {
    let hostname = settings
        .get_string(KEY_HOSTNAME)?
        .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());
    let network_name = settings
        .get_string(KEY_NETWORK_NAME)?
        .unwrap_or_else(|| DEFAULT_NETWORK_NAME.to_string());
    let passphrase = settings.get_string(KEY_PASSPHRASE)?.unwrap_or_default();

    let credentials = NetworkCredentials::new(network_name, passphrase, hostname)?;
    info!(network = credentials.network_name(), "loaded network credentials");
    Ok(credentials)
}

/// Persist `credentials` under the three well-known keys.
///
/// # Errors
///
/// Propagates settings write errors.
pub fn store_credentials<S: SettingsStore + ?Sized>(
    settings: &mut S,
    credentials: &NetworkCredentials,
) -> Result<(), LinkError> {
    settings.set_string(KEY_NETWORK_NAME, credentials.network_name())?;
    settings.set_string(KEY_PASSPHRASE, credentials.passphrase())?;
    settings.set_string(KEY_HOSTNAME, credentials.hostname())?;
    Ok(())
}

impl<R: Radio, C: Clock> ConnectivityManager<R, C> {
    /// Blocking startup: set the hostname, associate until connected, then
    /// start link services.
    ///
    /// Retries forever, pausing `bring_up_retry_delay_ms` after each failed
    /// attempt.  Returns the number of association attempts made.
    pub fn bring_up(&mut self) -> u32 {
        loop {
            if let Some(attempts) = self.bring_up_bounded(u32::MAX) {
                return attempts;
            }
        }
    }

    /// [`bring_up`][Self::bring_up] with at most `max_attempts` association
    /// attempts.  `None` when the link never came up; services are then not
    /// started.
    pub fn bring_up_bounded(&mut self, max_attempts: u32) -> Option<u32> {
        if let Err(e) = self.radio.set_hostname(self.credentials.hostname()) {
            warn!(error = %e, hostname = self.credentials.hostname(), "could not set hostname");
        }

        let mut attempts = 0;
        while self.radio.link_status() != LinkStatus::Connected {
            if attempts == max_attempts {
                warn!(attempts, "bring-up gave up without a link");
                self.refresh_link();
                return None;
            }
            attempts += 1;
            if !self.associate(None) {
                self.clock.sleep_millis(self.policy.bring_up_retry_delay_ms);
            }
        }

        self.refresh_link();
        self.timer.reset(self.clock.now_millis());
        self.backoff.record_success();
        info!(attempts, hostname = self.credentials.hostname(), "WiFi up");
        self.start_services();
        Some(attempts)
    }
}
