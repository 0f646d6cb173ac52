//! [`ScanGuard`] – scoped ownership of one scan's results.

use aproam_hal::Radio;
use aproam_types::{LinkError, ScanEntry};

/// Runs a scan and releases the driver's result buffer when dropped.
///
/// The release happens exactly once per guard, whether the scan succeeded,
/// failed, or the caller returned early.
pub struct ScanGuard<'r, R: Radio> {
    radio: &'r mut R,
    entries: Vec<ScanEntry>,
    fault: Option<LinkError>,
}

impl<'r, R: Radio> ScanGuard<'r, R> {
    /// Scan with `radio`, holding it until the guard is dropped.
    pub fn scan(radio: &'r mut R) -> Self {
        let (entries, fault) = match radio.scan() {
            Ok(entries) => (entries, None),
            Err(e) => (Vec::new(), Some(e)),
        };
        Self {
            radio,
            entries,
            fault,
        }
    }

    pub fn entries(&self) -> &[ScanEntry] {
        &self.entries
    }

    pub fn fault(&self) -> Option<&LinkError> {
        self.fault.as_ref()
    }
}

impl<R: Radio> Drop for ScanGuard<'_, R> {
    fn drop(&mut self) {
        self.radio.release_scan_results();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aproam_hal::sim::{SimAccessPoint, SimClock, SimRadio};
    use aproam_types::Bssid;

    #[test]
    fn releases_once_on_drop() {
        let mut radio = SimRadio::new(SimClock::new())
            .with_access_point(SimAccessPoint::new("IOT", Bssid::new([1; 6]), -60));
        {
            let guard = ScanGuard::scan(&mut radio);
            assert_eq!(guard.entries().len(), 1);
            assert!(guard.fault().is_none());
        }
        assert_eq!(radio.stats().scans, 1);
        assert_eq!(radio.stats().releases, 1);
    }

    #[test]
    fn releases_even_when_scan_fails() {
        let mut radio = SimRadio::new(SimClock::new());
        radio.set_scan_fault(true);
        {
            let guard = ScanGuard::scan(&mut radio);
            assert!(guard.entries().is_empty());
            assert!(guard.fault().is_some());
        }
        assert_eq!(radio.stats().releases, 1);
    }
}
