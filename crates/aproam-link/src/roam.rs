//! Roam evaluator and scan/select/roam sequence.

use aproam_hal::{Clock, Radio};
use aproam_types::{LinkState, LinkStatus, RoamOutcome};
use tracing::{debug, info, instrument, warn};

use crate::manager::ConnectivityManager;
use crate::scan_guard::ScanGuard;
use crate::selector::select_candidate;

/// What [`ConnectivityManager::maybe_roam`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoamCheck {
    /// The roam-check interval has not elapsed yet.
    NotDue,
    /// The link is down; roaming only applies to a live link.
    LinkDown,
    /// The check ran and the signal was above the weak threshold.
    SignalAdequate,
    /// The check ran a scan.
    Attempted(RoamOutcome),
}

impl<R: Radio, C: Clock> ConnectivityManager<R, C> {
    /// Run a roam check if the interval since the last one has elapsed.
    ///
    /// A due check restarts the interval, then scans only when the current
    /// signal is at or below the weak threshold.
    pub fn maybe_roam(&mut self, now_ms: u64) -> RoamCheck {
        if self.radio.link_status() != LinkStatus::Connected {
            return RoamCheck::LinkDown;
        }
        if !self.timer.is_due(now_ms, self.policy.roam_check_interval_ms) {
            return RoamCheck::NotDue;
        }
        self.timer.reset(now_ms);

        self.refresh_link();
        let rssi = self.link.rssi_dbm;
        if rssi > self.policy.weak_signal_threshold_dbm {
            debug!(rssi, "signal strength good, no roaming needed");
            return RoamCheck::SignalAdequate;
        }

        info!(rssi, "signal weak, scanning for better access points");
        RoamCheck::Attempted(self.scan_and_roam())
    }

    /// Scan, pick a candidate by the hysteresis rule, and roam to it.
    ///
    /// Scan results are released before this returns on every path.  On
    /// `NoCandidates` and `NoImprovement` the link is left untouched.
    #[instrument(skip(self), fields(network = %self.credentials.network_name()))]
    pub fn scan_and_roam(&mut self) -> RoamOutcome {
        let baseline = LinkState {
            status: self.radio.link_status(),
            rssi_dbm: self.radio.rssi(),
            bssid: self.radio.bssid(),
        };
        info!(
            rssi = baseline.rssi_dbm,
            bssid = ?baseline.bssid.map(|b| b.to_string()),
            "current connection"
        );

        let selection = {
            let scan = ScanGuard::scan(&mut self.radio);
            if let Some(e) = scan.fault() {
                warn!(error = %e, "scan failed");
                return RoamOutcome::NoCandidates;
            }
            if scan.entries().is_empty() {
                info!("no networks found during scan");
                return RoamOutcome::NoCandidates;
            }
            select_candidate(
                scan.entries(),
                self.credentials.network_name(),
                baseline.rssi_dbm,
                baseline.bssid,
                self.policy.roam_improvement_db,
            )
        };

        if selection.matching == 0 {
            info!("no other access points carry the configured network name");
            return RoamOutcome::NoCandidates;
        }
        let Some(target) = selection.best_bssid else {
            info!(candidates = selection.matching, "no better access points found for roaming");
            return RoamOutcome::NoImprovement;
        };

        info!(
            from_rssi = baseline.rssi_dbm,
            to_rssi = selection.best_rssi_dbm,
            improvement = selection.best_rssi_dbm - baseline.rssi_dbm,
            from = ?baseline.bssid.map(|b| b.to_string()),
            to = %target,
            "roaming to better access point"
        );

        self.radio.disassociate();
        self.link = LinkState::disconnected();
        self.clock.sleep_millis(self.policy.roam_settle_ms);

        if self.associate(Some(target)) {
            if self.link.bssid == Some(target) {
                info!(bssid = %target, rssi = self.link.rssi_dbm, "roamed to target access point");
                RoamOutcome::RoamedToTarget
            } else {
                info!(
                    bssid = ?self.link.bssid.map(|b| b.to_string()),
                    rssi = self.link.rssi_dbm,
                    "roam landed on a different access point"
                );
                RoamOutcome::RoamedToFallback
            }
        } else {
            warn!(bssid = %target, "targeted roam failed, trying general association");
            if self.associate(None) {
                RoamOutcome::RoamedToFallback
            } else {
                warn!("general association after failed roam also failed");
                RoamOutcome::RoamFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aproam_hal::sim::{SimAccessPoint, SimClock, SimRadio};
    use aproam_types::{Bssid, NetworkCredentials, ScanEntry};

    use crate::policy::RoamPolicy;

    const CURRENT: Bssid = Bssid::new([0x02, 0, 0, 0, 0, 0x01]);
    const BETTER: Bssid = Bssid::new([0x02, 0, 0, 0, 0, 0x02]);
    const FALLBACK: Bssid = Bssid::new([0x02, 0, 0, 0, 0, 0x03]);

    type Mgr = ConnectivityManager<SimRadio, SimClock>;

    /// Manager associated with `CURRENT` at `current_rssi`, plus `others`.
    fn connected(current_rssi: i32, others: Vec<SimAccessPoint>) -> (Mgr, SimClock) {
        let clock = SimClock::new();
        let mut radio = SimRadio::new(clock.clone())
            .with_access_point(SimAccessPoint::new("IOT", CURRENT, current_rssi));
        for ap in others {
            radio.add_access_point(ap);
        }
        let creds = NetworkCredentials::new("IOT", "", "ada").unwrap();
        let mut mgr = ConnectivityManager::new(radio, clock.clone(), creds, RoamPolicy::default())
            .unwrap();
        assert!(mgr.associate(Some(CURRENT)));
        (mgr, clock)
    }

    fn scan_entry(ssid: &str, bssid: Bssid, rssi_dbm: i32) -> ScanEntry {
        ScanEntry {
            ssid: ssid.to_string(),
            rssi_dbm,
            bssid,
            channel: 11,
        }
    }

    #[test]
    fn empty_scan_yields_no_candidates() {
        let (mut mgr, _) = connected(-80, vec![]);
        mgr.radio_mut().script_scan(vec![]);
        let before = mgr.link_state();

        assert_eq!(mgr.scan_and_roam(), RoamOutcome::NoCandidates);
        assert_eq!(mgr.link_state(), before);
        assert_eq!(mgr.radio().stats().releases, 1);
    }

    #[test]
    fn foreign_networks_only_yield_no_candidates() {
        let (mut mgr, _) = connected(
            -80,
            vec![SimAccessPoint::new("Neighbours", BETTER, -30)],
        );
        let before = mgr.link_state();

        assert_eq!(mgr.scan_and_roam(), RoamOutcome::NoCandidates);
        assert_eq!(mgr.link_state(), before);
        assert_eq!(mgr.radio().stats().disassociations, 0);
        assert_eq!(mgr.radio().stats().releases, 1);
    }

    #[test]
    fn scan_fault_yields_no_candidates_and_still_releases() {
        let (mut mgr, _) = connected(-80, vec![]);
        mgr.radio_mut().set_scan_fault(true);
        assert_eq!(mgr.scan_and_roam(), RoamOutcome::NoCandidates);
        assert_eq!(mgr.radio().stats().releases, 1);
        assert!(mgr.link_state().is_connected());
    }

    #[test]
    fn exactly_margin_is_not_an_improvement() {
        let (mut mgr, _) = connected(-80, vec![SimAccessPoint::new("IOT", BETTER, -70)]);
        assert_eq!(mgr.scan_and_roam(), RoamOutcome::NoImprovement);
        assert_eq!(mgr.link_state().bssid, Some(CURRENT));
        assert_eq!(mgr.radio().stats().disassociations, 0);
        assert_eq!(mgr.radio().stats().releases, 1);
    }

    #[test]
    fn one_past_margin_roams() {
        let (mut mgr, _) = connected(-80, vec![SimAccessPoint::new("IOT", BETTER, -69)]);
        assert_eq!(mgr.scan_and_roam(), RoamOutcome::RoamedToTarget);
        assert_eq!(mgr.link_state().bssid, Some(BETTER));
    }

    #[test]
    fn strong_candidate_gets_targeted_association() {
        let (mut mgr, clock) = connected(-80, vec![SimAccessPoint::new("IOT", BETTER, -60)]);
        let started = clock.now_millis();

        assert_eq!(mgr.scan_and_roam(), RoamOutcome::RoamedToTarget);

        let stats = mgr.radio().stats();
        assert_eq!(stats.disassociations, 1);
        assert_eq!(stats.joins.last().and_then(|j| j.bssid), Some(BETTER));
        assert_eq!(stats.releases, 1);
        assert_eq!(clock.now_millis() - started, 1_000, "settle delay only");
        assert_eq!(mgr.link_state().rssi_dbm, -60);
    }

    #[test]
    fn last_qualifying_ap_in_scan_order_is_targeted() {
        let (mut mgr, _) = connected(
            -80,
            vec![
                SimAccessPoint::new("IOT", BETTER, -50),
                SimAccessPoint::new("IOT", FALLBACK, -65),
            ],
        );

        assert_eq!(mgr.scan_and_roam(), RoamOutcome::RoamedToTarget);
        assert_eq!(mgr.radio().stats().joins.last().and_then(|j| j.bssid), Some(FALLBACK));
        assert_eq!(mgr.link_state().bssid, Some(FALLBACK));
        assert_eq!(mgr.link_state().rssi_dbm, -65);
    }

    #[test]
    fn current_ap_in_scan_is_never_a_candidate() {
        let (mut mgr, _) = connected(-80, vec![]);
        mgr.radio_mut()
            .script_scan(vec![scan_entry("IOT", CURRENT, -20)]);
        assert_eq!(mgr.scan_and_roam(), RoamOutcome::NoCandidates);
        assert_eq!(mgr.radio().stats().joins.len(), 1);
    }

    #[test]
    fn redirected_join_reports_fallback() {
        let (mut mgr, _) = connected(
            -80,
            vec![
                SimAccessPoint::new("IOT", BETTER, -60),
                SimAccessPoint::new("IOT", FALLBACK, -75),
            ],
        );
        mgr.radio_mut().redirect(BETTER, FALLBACK);

        assert_eq!(mgr.scan_and_roam(), RoamOutcome::RoamedToFallback);
        assert_eq!(mgr.link_state().bssid, Some(FALLBACK));
    }

    #[test]
    fn refused_target_falls_back_to_general_association() {
        let (mut mgr, _) = connected(
            -80,
            vec![SimAccessPoint::new("IOT", BETTER, -50).refusing()],
        );

        assert_eq!(mgr.scan_and_roam(), RoamOutcome::RoamedToFallback);
        let joins = &mgr.radio().stats().joins;
        assert_eq!(joins[joins.len() - 2].bssid, Some(BETTER));
        assert_eq!(joins[joins.len() - 1].bssid, None);
        assert_eq!(mgr.link_state().bssid, Some(CURRENT));
        assert_eq!(mgr.radio().stats().releases, 1);
    }

    #[test]
    fn both_associations_failing_reports_roam_failed() {
        let (mut mgr, _) = connected(-80, vec![]);
        mgr.radio_mut()
            .script_scan(vec![scan_entry("IOT", BETTER, -50)]);
        // The scripted candidate does not exist, and the old AP stops
        // accepting joins once we leave it.
        mgr.radio_mut()
            .add_access_point(SimAccessPoint::new("IOT", CURRENT, -80).refusing());

        assert_eq!(mgr.scan_and_roam(), RoamOutcome::RoamFailed);
        assert!(!mgr.link_state().is_connected());
        assert_eq!(mgr.radio().stats().releases, 1);
    }

    #[test]
    fn maybe_roam_is_rate_limited() {
        let (mut mgr, _) = connected(-80, vec![]);
        mgr.radio_mut().script_scan(vec![]);

        assert_eq!(mgr.maybe_roam(30_000), RoamCheck::Attempted(RoamOutcome::NoCandidates));
        assert_eq!(mgr.maybe_roam(45_000), RoamCheck::NotDue);
        assert_eq!(mgr.maybe_roam(59_999), RoamCheck::NotDue);
        assert_eq!(mgr.radio().stats().scans, 1);

        assert_eq!(mgr.maybe_roam(60_000), RoamCheck::Attempted(RoamOutcome::NoCandidates));
        assert_eq!(mgr.radio().stats().scans, 2);
    }

    #[test]
    fn maybe_roam_skips_scan_on_adequate_signal() {
        let (mut mgr, _) = connected(-70, vec![SimAccessPoint::new("IOT", BETTER, -30)]);

        assert_eq!(mgr.maybe_roam(30_000), RoamCheck::SignalAdequate);
        assert_eq!(mgr.maybe_roam(90_000), RoamCheck::SignalAdequate);
        assert_eq!(mgr.radio().stats().scans, 0);
        assert_eq!(mgr.last_roam_check_ms(), 90_000);
    }

    #[test]
    fn maybe_roam_scans_at_exactly_weak_threshold() {
        let (mut mgr, _) = connected(-75, vec![]);
        mgr.radio_mut().script_scan(vec![]);
        assert!(matches!(mgr.maybe_roam(30_000), RoamCheck::Attempted(_)));
    }

    #[test]
    fn maybe_roam_ignores_a_down_link() {
        let (mut mgr, _) = connected(-90, vec![]);
        mgr.radio_mut().drop_link();
        assert_eq!(mgr.maybe_roam(30_000), RoamCheck::LinkDown);
        assert_eq!(mgr.last_roam_check_ms(), 0);
    }
}
