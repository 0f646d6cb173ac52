//! Candidate selection over one scan pass.
//!
//! # Hysteresis rule
//!
//! Every entry is measured against the current link's signal strength, never
//! against the best entry seen so far.  An entry qualifies when it is stronger
//! than that baseline by more than the improvement margin, and each qualifying
//! entry replaces the previous choice.  The result is the last qualifying
//! entry in scan order, which need not be the strongest one.

use aproam_types::{Bssid, ScanEntry};
use tracing::debug;

/// Accumulated result of one pass over the scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSelection {
    /// Strength of the chosen candidate, or the baseline when none was found.
    pub best_rssi_dbm: i32,
    /// BSSID of the chosen candidate.
    pub best_bssid: Option<Bssid>,
    /// Entries carrying the configured network name, current AP excluded.
    pub matching: usize,
}

impl CandidateSelection {
    pub fn found(&self) -> bool {
        self.best_bssid.is_some()
    }
}

/// Pick the roam target among `entries`.
///
/// Entries for other networks and the entry for `current_bssid` are never
/// chosen.
pub fn select_candidate(
    entries: &[ScanEntry],
    network_name: &str,
    baseline_rssi_dbm: i32,
    current_bssid: Option<Bssid>,
    margin_db: i32,
) -> CandidateSelection {
    let mut selection = CandidateSelection {
        best_rssi_dbm: baseline_rssi_dbm,
        best_bssid: None,
        matching: 0,
    };

    for entry in entries.iter().filter(|e| e.ssid == network_name) {
        if Some(entry.bssid) == current_bssid {
            debug!(bssid = %entry.bssid, rssi = entry.rssi_dbm, "current access point");
            continue;
        }
        selection.matching += 1;
        if entry.rssi_dbm > baseline_rssi_dbm.saturating_add(margin_db) {
            debug!(
                bssid = %entry.bssid,
                rssi = entry.rssi_dbm,
                improvement = entry.rssi_dbm - baseline_rssi_dbm,
                "better access point"
            );
            selection.best_rssi_dbm = entry.rssi_dbm;
            selection.best_bssid = Some(entry.bssid);
        } else {
            debug!(bssid = %entry.bssid, rssi = entry.rssi_dbm, "not significantly better");
        }
    }

    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: Bssid = Bssid::new([0x02, 0, 0, 0, 0, 0x01]);
    const OTHER: Bssid = Bssid::new([0x02, 0, 0, 0, 0, 0x02]);
    const THIRD: Bssid = Bssid::new([0x02, 0, 0, 0, 0, 0x03]);

    fn entry(ssid: &str, bssid: Bssid, rssi_dbm: i32) -> ScanEntry {
        ScanEntry {
            ssid: ssid.to_string(),
            rssi_dbm,
            bssid,
            channel: 6,
        }
    }

    #[test]
    fn margin_boundary_is_exclusive() {
        let at_margin = [entry("IOT", OTHER, -70)];
        let sel = select_candidate(&at_margin, "IOT", -80, Some(CURRENT), 10);
        assert!(!sel.found());
        assert_eq!(sel.matching, 1);

        let past_margin = [entry("IOT", OTHER, -69)];
        let sel = select_candidate(&past_margin, "IOT", -80, Some(CURRENT), 10);
        assert_eq!(sel.best_bssid, Some(OTHER));
        assert_eq!(sel.best_rssi_dbm, -69);
    }

    #[test]
    fn current_access_point_is_never_selected() {
        let entries = [entry("IOT", CURRENT, -30)];
        let sel = select_candidate(&entries, "IOT", -80, Some(CURRENT), 10);
        assert!(!sel.found());
        assert_eq!(sel.matching, 0);
    }

    #[test]
    fn other_networks_are_ignored() {
        let entries = [entry("Neighbours", OTHER, -20), entry("iot", THIRD, -20)];
        let sel = select_candidate(&entries, "IOT", -80, Some(CURRENT), 10);
        assert!(!sel.found());
        assert_eq!(sel.matching, 0);
    }

    #[test]
    fn later_slightly_stronger_entry_replaces_earlier() {
        let entries = [entry("IOT", OTHER, -60), entry("IOT", THIRD, -55)];
        let sel = select_candidate(&entries, "IOT", -80, Some(CURRENT), 10);
        assert_eq!(sel.best_bssid, Some(THIRD));
        assert_eq!(sel.best_rssi_dbm, -55);
        assert_eq!(sel.matching, 2);
    }

    #[test]
    fn later_much_stronger_entry_displaces() {
        let entries = [entry("IOT", OTHER, -65), entry("IOT", THIRD, -50)];
        let sel = select_candidate(&entries, "IOT", -80, Some(CURRENT), 10);
        assert_eq!(sel.best_bssid, Some(THIRD));
        assert_eq!(sel.best_rssi_dbm, -50);
    }

    #[test]
    fn later_weaker_entry_above_baseline_margin_replaces_earlier() {
        let entries = [entry("IOT", OTHER, -50), entry("IOT", THIRD, -65)];
        let sel = select_candidate(&entries, "IOT", -80, Some(CURRENT), 10);
        assert_eq!(sel.best_bssid, Some(THIRD));
        assert_eq!(sel.best_rssi_dbm, -65);
    }

    #[test]
    fn later_entry_within_baseline_margin_keeps_earlier() {
        let entries = [entry("IOT", OTHER, -50), entry("IOT", THIRD, -75)];
        let sel = select_candidate(&entries, "IOT", -80, Some(CURRENT), 10);
        assert_eq!(sel.best_bssid, Some(OTHER));
        assert_eq!(sel.best_rssi_dbm, -50);
        assert_eq!(sel.matching, 2);
    }

    #[test]
    fn empty_scan_finds_nothing() {
        let sel = select_candidate(&[], "IOT", -80, None, 10);
        assert_eq!(
            sel,
            CandidateSelection {
                best_rssi_dbm: -80,
                best_bssid: None,
                matching: 0
            }
        );
    }
}
