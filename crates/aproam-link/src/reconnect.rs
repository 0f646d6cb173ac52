//! Reconnector: the periodic `tick` entry point.
//!
//! A down link is re-associated on the spot, with no delay between failed
//! attempts unless a [`BackoffPolicy`] is configured.  An up link is handed
//! to the roam evaluator.

use std::fmt;

use aproam_hal::{Clock, Radio};
use tracing::{debug, warn};

use crate::manager::ConnectivityManager;
use crate::policy::BackoffPolicy;
use crate::roam::RoamCheck;

/// What one [`ConnectivityManager::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The link was down and is back up.
    Reconnected,
    /// The link was down and the reconnect attempt timed out.
    ReconnectFailed,
    /// The link is down and the backoff delay has not elapsed.
    ReconnectDeferred,
    /// The link was up; the roam evaluator ran.
    Roam(RoamCheck),
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickOutcome::Reconnected => f.write_str("reconnected"),
            TickOutcome::ReconnectFailed => f.write_str("reconnect_failed"),
            TickOutcome::ReconnectDeferred => f.write_str("reconnect_deferred"),
            TickOutcome::Roam(RoamCheck::NotDue) => f.write_str("roam_not_due"),
            TickOutcome::Roam(RoamCheck::LinkDown) => f.write_str("link_down"),
            TickOutcome::Roam(RoamCheck::SignalAdequate) => f.write_str("signal_adequate"),
            TickOutcome::Roam(RoamCheck::Attempted(outcome)) => write!(f, "{outcome}"),
        }
    }
}

/// Delay tracker for the opt-in reconnect backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    policy: Option<BackoffPolicy>,
    delay_ms: u64,
    next_attempt_ms: u64,
}

impl ReconnectBackoff {
    pub fn new(policy: Option<BackoffPolicy>) -> Self {
        Self {
            policy,
            delay_ms: 0,
            next_attempt_ms: 0,
        }
    }

    /// `true` when a reconnect may be attempted at `now_ms`.
    pub fn ready(&self, now_ms: u64) -> bool {
        now_ms >= self.next_attempt_ms
    }

    /// Current delay; zero until the first failure.
    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn record_failure(&mut self, now_ms: u64) {
        let Some(policy) = self.policy else {
            return;
        };
        self.delay_ms = if self.delay_ms == 0 {
            policy.initial_ms
        } else {
            self.delay_ms.saturating_mul(2).min(policy.max_ms)
        };
        self.next_attempt_ms = now_ms.saturating_add(self.delay_ms);
    }

    pub fn record_success(&mut self) {
        self.delay_ms = 0;
        self.next_attempt_ms = 0;
    }
}

impl<R: Radio, C: Clock> ConnectivityManager<R, C> {
    /// One pass of the connectivity state machine.  Call once per control
    /// loop iteration.
    ///
    /// Never blocks when connected and no roam check is due.  A reconnect
    /// blocks for up to the association timeout; a roam blocks for the scan,
    /// the settle delay and up to two association timeouts.
    pub fn tick(&mut self) -> TickOutcome {
        self.refresh_link();
        let outcome = if self.link.is_connected() {
            let now = self.clock.now_millis();
            TickOutcome::Roam(self.maybe_roam(now))
        } else {
            self.reconnect()
        };
        self.poll_services();
        outcome
    }

    fn reconnect(&mut self) -> TickOutcome {
        let now = self.clock.now_millis();
        if !self.backoff.ready(now) {
            debug!(delay_ms = self.backoff.delay_ms(), "reconnect deferred by backoff");
            return TickOutcome::ReconnectDeferred;
        }

        warn!("WiFi lost, attempting to reconnect");
        let connected = self.associate(None);

        // The next roam check is measured from here, not from before the
        // outage.
        let after = self.clock.now_millis();
        self.timer.reset(after);

        if connected {
            self.backoff.record_success();
            TickOutcome::Reconnected
        } else {
            self.backoff.record_failure(after);
            TickOutcome::ReconnectFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aproam_hal::sim::{RecordingService, SimAccessPoint, SimClock, SimRadio};
    use aproam_types::{Bssid, NetworkCredentials, RoamOutcome};

    use crate::policy::RoamPolicy;

    const AP_A: Bssid = Bssid::new([0x02, 0, 0, 0, 0, 0x0A]);
    const AP_B: Bssid = Bssid::new([0x02, 0, 0, 0, 0, 0x0B]);

    fn manager(
        radio: SimRadio,
        clock: &SimClock,
        policy: RoamPolicy,
    ) -> ConnectivityManager<SimRadio, SimClock> {
        let creds = NetworkCredentials::new("IOT", "", "ada").unwrap();
        ConnectivityManager::new(radio, clock.clone(), creds, policy).unwrap()
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut backoff = ReconnectBackoff::new(Some(BackoffPolicy {
            initial_ms: 1_000,
            max_ms: 5_000,
        }));
        assert!(backoff.ready(0));
        backoff.record_failure(0);
        assert_eq!(backoff.delay_ms(), 1_000);
        assert!(!backoff.ready(999));
        assert!(backoff.ready(1_000));
        backoff.record_failure(1_000);
        assert_eq!(backoff.delay_ms(), 2_000);
        backoff.record_failure(3_000);
        assert_eq!(backoff.delay_ms(), 4_000);
        backoff.record_failure(7_000);
        assert_eq!(backoff.delay_ms(), 5_000);
        backoff.record_success();
        assert_eq!(backoff.delay_ms(), 0);
        assert!(backoff.ready(0));
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(TickOutcome::ReconnectDeferred.to_string(), "reconnect_deferred");
        assert_eq!(TickOutcome::Roam(RoamCheck::NotDue).to_string(), "roam_not_due");
        assert_eq!(
            TickOutcome::Roam(RoamCheck::Attempted(RoamOutcome::RoamedToFallback)).to_string(),
            "roamed_to_fallback"
        );
    }

    #[test]
    fn no_policy_means_always_ready() {
        let mut backoff = ReconnectBackoff::new(None);
        backoff.record_failure(10);
        assert!(backoff.ready(10));
        assert_eq!(backoff.delay_ms(), 0);
    }

    #[test]
    fn tick_reconnects_a_dropped_link() {
        let clock = SimClock::new();
        let radio = SimRadio::new(clock.clone())
            .with_access_point(SimAccessPoint::new("IOT", AP_A, -60));
        let mut mgr = manager(radio, &clock, RoamPolicy::default());

        assert_eq!(mgr.tick(), TickOutcome::Reconnected);
        assert!(mgr.link_state().is_connected());

        mgr.radio_mut().drop_link();
        assert_eq!(mgr.tick(), TickOutcome::Reconnected);
        assert_eq!(mgr.radio().stats().joins.len(), 2);
        assert!(mgr.radio().stats().joins.iter().all(|j| j.bssid.is_none()));
    }

    #[test]
    fn failed_reconnects_retry_every_tick_without_backoff() {
        let clock = SimClock::new();
        let mut mgr = manager(SimRadio::new(clock.clone()), &clock, RoamPolicy::default());

        assert_eq!(mgr.tick(), TickOutcome::ReconnectFailed);
        assert_eq!(mgr.tick(), TickOutcome::ReconnectFailed);
        assert_eq!(mgr.tick(), TickOutcome::ReconnectFailed);
        assert_eq!(mgr.radio().stats().joins.len(), 3);
        assert_eq!(clock.now_millis(), 30_000, "only the association waits elapse");
    }

    #[test]
    fn backoff_defers_reconnects_when_enabled() {
        let clock = SimClock::new();
        let policy = RoamPolicy {
            reconnect_backoff: Some(BackoffPolicy {
                initial_ms: 5_000,
                max_ms: 20_000,
            }),
            ..RoamPolicy::default()
        };
        let mut mgr = manager(SimRadio::new(clock.clone()), &clock, policy);

        assert_eq!(mgr.tick(), TickOutcome::ReconnectFailed);
        assert_eq!(mgr.tick(), TickOutcome::ReconnectDeferred);
        clock.advance(5_000);
        mgr.radio_mut()
            .add_access_point(SimAccessPoint::new("IOT", AP_A, -60));
        assert_eq!(mgr.tick(), TickOutcome::Reconnected);
        assert_eq!(mgr.radio().stats().joins.len(), 2);
    }

    #[test]
    fn roam_timer_measures_from_reconnection() {
        let clock = SimClock::new();
        let radio = SimRadio::new(clock.clone())
            .with_access_point(SimAccessPoint::new("IOT", AP_A, -85).with_join_latency(2_000));
        let mut mgr = manager(radio, &clock, RoamPolicy::default());

        clock.set(100_000);
        assert_eq!(mgr.tick(), TickOutcome::Reconnected);
        assert_eq!(mgr.last_roam_check_ms(), 102_000);

        clock.set(131_999);
        assert_eq!(mgr.tick(), TickOutcome::Roam(RoamCheck::NotDue));
        assert_eq!(mgr.radio().stats().scans, 0);

        clock.set(132_000);
        assert!(matches!(mgr.tick(), TickOutcome::Roam(RoamCheck::Attempted(_))));
        assert_eq!(mgr.radio().stats().scans, 1);
    }

    #[test]
    fn timer_resets_even_when_reconnect_fails() {
        let clock = SimClock::starting_at(40_000);
        let mut mgr = manager(SimRadio::new(clock.clone()), &clock, RoamPolicy::default());
        assert_eq!(mgr.tick(), TickOutcome::ReconnectFailed);
        assert_eq!(mgr.last_roam_check_ms(), 50_000);
    }

    #[test]
    fn connected_tick_roams_when_weak_and_due() {
        let clock = SimClock::new();
        let radio = SimRadio::new(clock.clone())
            .with_access_point(SimAccessPoint::new("IOT", AP_A, -82))
            .with_access_point(SimAccessPoint::new("IOT", AP_B, -90));
        let mut mgr = manager(radio, &clock, RoamPolicy::default());
        assert_eq!(mgr.tick(), TickOutcome::Reconnected);
        assert_eq!(mgr.link_state().bssid, Some(AP_A));

        mgr.radio_mut().set_rssi(AP_B, -55);
        clock.advance(30_000);
        assert_eq!(
            mgr.tick(),
            TickOutcome::Roam(RoamCheck::Attempted(RoamOutcome::RoamedToTarget))
        );
        assert_eq!(mgr.link_state().bssid, Some(AP_B));
    }

    #[test]
    fn services_are_polled_only_after_they_start() {
        let clock = SimClock::new();
        let radio = SimRadio::new(clock.clone())
            .with_access_point(SimAccessPoint::new("IOT", AP_A, -60));
        let service = RecordingService::new("ota");
        let log = service.log();
        let mut mgr = manager(radio, &clock, RoamPolicy::default()).with_service(Box::new(service));

        mgr.tick();
        assert_eq!(log.lock().unwrap().polls, 0);

        mgr.bring_up();
        mgr.tick();
        mgr.radio_mut().drop_link();
        mgr.tick();
        assert_eq!(log.lock().unwrap().polls, 2);
    }
}
