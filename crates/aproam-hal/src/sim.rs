//! In-process simulation drivers for testing without a physical radio.
//!
//! [`SimRadio`] models a small world of access points.  Association requests
//! are resolved against that world the way a station-mode driver would, and
//! the link comes up once the shared [`SimClock`] passes the access point's
//! join latency.  Because every blocking wait in the connectivity manager
//! goes through the clock, a ten-second association timeout costs nothing in
//! a test.
//!
//! # Example
//!
//! ```rust
//! use aproam_hal::radio::{JoinRequest, Radio, CHANNEL_AUTO};
//! use aproam_hal::sim::{SimAccessPoint, SimClock, SimRadio};
//! use aproam_types::{Bssid, LinkStatus};
//!
//! let clock = SimClock::new();
//! let mut radio = SimRadio::new(clock.clone())
//!     .with_access_point(SimAccessPoint::new("IOT", Bssid::new([0, 0, 0, 0, 0, 1]), -60));
//!
//! radio
//!     .begin(&JoinRequest { ssid: "IOT", passphrase: "", channel: CHANNEL_AUTO, bssid: None })
//!     .expect("sim begin must succeed");
//! assert_eq!(radio.link_status(), LinkStatus::Connected);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use aproam_types::{Bssid, LinkError, LinkStatus, ScanEntry};
use tracing::debug;

use crate::clock::Clock;
use crate::radio::{JoinRequest, Radio};
use crate::service::LinkService;

// ────────────────────────────────────────────────────────────────────────────
// SimClock
// ────────────────────────────────────────────────────────────────────────────

/// Virtual millisecond clock.  Clones share the same counter; sleeping
/// advances it instantly.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_ms: Arc<AtomicU64>,
}

impl SimClock {
    /// Create a clock at t = 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock at `ms`.
    pub fn starting_at(ms: u64) -> Self {
        let clock = Self::new();
        clock.set(ms);
        clock
    }

    /// Jump forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Set the absolute time.  Callers are responsible for not moving it
    /// backwards.
    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for SimClock {
    fn now_millis(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn sleep_millis(&self, ms: u64) {
        self.advance(ms);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimAccessPoint
// ────────────────────────────────────────────────────────────────────────────

/// One simulated access point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimAccessPoint {
    pub ssid: String,
    pub bssid: Bssid,
    pub rssi_dbm: i32,
    pub channel: u8,
    /// Required passphrase.  `None` accepts any.
    pub passphrase: Option<String>,
    /// `false` makes the AP visible in scans but refuse every join.
    pub accepts_association: bool,
    /// Delay between `begin` and the link reporting `Connected`.
    pub join_latency_ms: u64,
}

impl SimAccessPoint {
    /// An open, always-accepting access point on channel 1 with no join
    /// latency.
    pub fn new(ssid: impl Into<String>, bssid: Bssid, rssi_dbm: i32) -> Self {
        Self {
            ssid: ssid.into(),
            bssid,
            rssi_dbm,
            channel: 1,
            passphrase: None,
            accepts_association: true,
            join_latency_ms: 0,
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    pub fn with_join_latency(mut self, ms: u64) -> Self {
        self.join_latency_ms = ms;
        self
    }

    /// Visible, but refuses association.
    pub fn refusing(mut self) -> Self {
        self.accepts_association = false;
        self
    }

    fn admits(&self, request: &JoinRequest<'_>) -> bool {
        self.accepts_association
            && self.ssid == request.ssid
            && self
                .passphrase
                .as_deref()
                .is_none_or(|expected| expected == request.passphrase)
    }

    fn scan_entry(&self) -> ScanEntry {
        ScanEntry {
            ssid: self.ssid.clone(),
            rssi_dbm: self.rssi_dbm,
            bssid: self.bssid,
            channel: self.channel,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRadio
// ────────────────────────────────────────────────────────────────────────────

/// A recorded call to [`Radio::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRecord {
    pub at_ms: u64,
    pub ssid: String,
    pub bssid: Option<Bssid>,
}

/// Call counters kept by [`SimRadio`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimRadioStats {
    pub joins: Vec<JoinRecord>,
    pub scans: usize,
    pub releases: usize,
    pub disassociations: usize,
}

#[derive(Debug, Clone, Copy)]
struct SimLink {
    bssid: Bssid,
    ready_at_ms: u64,
}

/// Simulated station-mode radio.
pub struct SimRadio {
    clock: SimClock,
    access_points: Vec<SimAccessPoint>,
    hostname: Option<String>,
    link: Option<SimLink>,
    redirects: HashMap<Bssid, Bssid>,
    scan_override: Option<Vec<ScanEntry>>,
    scan_fault: bool,
    stats: SimRadioStats,
}

impl SimRadio {
    /// Create a radio with no access points in range.
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            access_points: Vec::new(),
            hostname: None,
            link: None,
            redirects: HashMap::new(),
            scan_override: None,
            scan_fault: false,
            stats: SimRadioStats::default(),
        }
    }

    /// Builder form of [`SimRadio::add_access_point`].
    pub fn with_access_point(mut self, ap: SimAccessPoint) -> Self {
        self.add_access_point(ap);
        self
    }

    /// Bring an access point into range.  An AP with the same BSSID is
    /// replaced.
    pub fn add_access_point(&mut self, ap: SimAccessPoint) {
        self.access_points.retain(|existing| existing.bssid != ap.bssid);
        self.access_points.push(ap);
    }

    /// Take an access point out of range.  Drops the link if it was the
    /// current association.
    pub fn remove_access_point(&mut self, bssid: Bssid) {
        self.access_points.retain(|ap| ap.bssid != bssid);
        if self.link.is_some_and(|link| link.bssid == bssid) {
            self.link = None;
        }
    }

    /// Change the signal strength of one access point.  Returns `false` when
    /// no AP carries `bssid`.
    pub fn set_rssi(&mut self, bssid: Bssid, rssi_dbm: i32) -> bool {
        match self.access_points.iter_mut().find(|ap| ap.bssid == bssid) {
            Some(ap) => {
                ap.rssi_dbm = rssi_dbm;
                true
            }
            None => false,
        }
    }

    /// Lose the current association without any call from the station.
    pub fn drop_link(&mut self) {
        self.link = None;
    }

    /// Make targeted joins to `from` land on `to` instead, as a driver may do
    /// when it prefers another BSS of the same network.
    pub fn redirect(&mut self, from: Bssid, to: Bssid) {
        self.redirects.insert(from, to);
    }

    /// Return `entries` from every scan instead of the simulated world.
    pub fn script_scan(&mut self, entries: Vec<ScanEntry>) {
        self.scan_override = Some(entries);
    }

    /// Make every scan fail.
    pub fn set_scan_fault(&mut self, fault: bool) {
        self.scan_fault = fault;
    }

    pub fn access_points(&self) -> &[SimAccessPoint] {
        &self.access_points
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn stats(&self) -> &SimRadioStats {
        &self.stats
    }

    fn access_point(&self, bssid: Bssid) -> Option<&SimAccessPoint> {
        self.access_points.iter().find(|ap| ap.bssid == bssid)
    }

    fn current(&self) -> Option<&SimAccessPoint> {
        let link = self.link?;
        if self.clock.now_millis() < link.ready_at_ms {
            return None;
        }
        self.access_point(link.bssid)
    }
}

impl Radio for SimRadio {
    fn set_hostname(&mut self, hostname: &str) -> Result<(), LinkError> {
        self.hostname = Some(hostname.to_string());
        Ok(())
    }

    fn begin(&mut self, request: &JoinRequest<'_>) -> Result<(), LinkError> {
        let now = self.clock.now_millis();
        self.stats.joins.push(JoinRecord {
            at_ms: now,
            ssid: request.ssid.to_string(),
            bssid: request.bssid,
        });
        self.link = None;

        let chosen = match request.bssid {
            Some(target) => {
                let target = self.redirects.get(&target).copied().unwrap_or(target);
                self.access_point(target).filter(|ap| ap.admits(request))
            }
            None => self
                .access_points
                .iter()
                .filter(|ap| ap.admits(request))
                .max_by_key(|ap| ap.rssi_dbm),
        }
        .map(|ap| (ap.bssid, ap.join_latency_ms));

        match chosen {
            Some((bssid, latency_ms)) => {
                debug!(bssid = %bssid, latency_ms, "sim radio joining");
                self.link = Some(SimLink {
                    bssid,
                    ready_at_ms: now.saturating_add(latency_ms),
                });
            }
            None => debug!(ssid = request.ssid, "sim radio found no admitting access point"),
        }
        Ok(())
    }

    fn link_status(&self) -> LinkStatus {
        if self.current().is_some() {
            LinkStatus::Connected
        } else {
            LinkStatus::Disconnected
        }
    }

    fn rssi(&self) -> i32 {
        self.current().map_or(0, |ap| ap.rssi_dbm)
    }

    fn bssid(&self) -> Option<Bssid> {
        self.current().map(|ap| ap.bssid)
    }

    fn disassociate(&mut self) {
        self.stats.disassociations += 1;
        self.link = None;
    }

    fn scan(&mut self) -> Result<Vec<ScanEntry>, LinkError> {
        self.stats.scans += 1;
        if self.scan_fault {
            return Err(LinkError::RadioFault {
                operation: "scan".to_string(),
                details: "simulated scan fault".to_string(),
            });
        }
        Ok(match &self.scan_override {
            Some(entries) => entries.clone(),
            None => self.access_points.iter().map(SimAccessPoint::scan_entry).collect(),
        })
    }

    fn release_scan_results(&mut self) {
        self.stats.releases += 1;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RecordingService
// ────────────────────────────────────────────────────────────────────────────

/// What a [`RecordingService`] has been asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceLog {
    pub started_with: Option<String>,
    pub polls: usize,
}

/// A [`LinkService`] that records calls into a shared [`ServiceLog`].
pub struct RecordingService {
    name: String,
    fail_start: bool,
    log: Arc<Mutex<ServiceLog>>,
}

impl RecordingService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_start: false,
            log: Arc::new(Mutex::new(ServiceLog::default())),
        }
    }

    /// Make [`LinkService::start`] fail.
    pub fn failing(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Shared handle to the call log; stays valid after the service is boxed.
    pub fn log(&self) -> Arc<Mutex<ServiceLog>> {
        Arc::clone(&self.log)
    }
}

impl LinkService for RecordingService {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self, hostname: &str) -> Result<(), LinkError> {
        if self.fail_start {
            return Err(LinkError::Service {
                service: self.name.clone(),
                details: "simulated start failure".to_string(),
            });
        }
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .started_with = Some(hostname.to_string());
        Ok(())
    }

    fn poll(&mut self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).polls += 1;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
