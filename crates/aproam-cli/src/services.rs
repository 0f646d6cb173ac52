//! Link services registered by the simulator.
//!
//! Neither opens a socket; they log what a device would advertise so a
//! simulation run shows when the services come up.

use aproam_hal::LinkService;
use aproam_types::LinkError;
use tracing::{debug, info};

/// One advertised DNS-SD record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub service: &'static str,
    pub protocol: &'static str,
    pub port: u16,
}

/// The records a device advertises once its link is up.
pub const DEVICE_RECORDS: [ServiceRecord; 2] = [
    ServiceRecord {
        service: "_http",
        protocol: "_tcp",
        port: 80,
    },
    ServiceRecord {
        service: "_ws",
        protocol: "_tcp",
        port: 81,
    },
];

/// mDNS responder stand-in: announces `<hostname>.local` and
/// [`DEVICE_RECORDS`].
#[derive(Debug, Default)]
pub struct MdnsAnnouncer {
    fqdn: Option<String>,
}

impl MdnsAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fully qualified name being announced, once started.
    #[cfg(test)]
    pub fn fqdn(&self) -> Option<&str> {
        self.fqdn.as_deref()
    }
}

impl LinkService for MdnsAnnouncer {
    fn name(&self) -> &str {
        "mdns"
    }

    fn start(&mut self, hostname: &str) -> Result<(), LinkError> {
        if hostname.contains('.') {
            return Err(LinkError::Service {
                service: "mdns".to_string(),
                details: format!("hostname {hostname:?} is not a single DNS label"),
            });
        }
        let fqdn = format!("{hostname}.local");
        for record in &DEVICE_RECORDS {
            info!(
                host = %fqdn,
                service = record.service,
                protocol = record.protocol,
                port = record.port,
                "announcing service"
            );
        }
        self.fqdn = Some(fqdn);
        Ok(())
    }
}

/// Firmware update listener stand-in.  Port 3232 is the usual OTA port.
#[derive(Debug)]
pub struct OtaListener {
    port: u16,
    polls: u64,
}

impl OtaListener {
    pub const DEFAULT_PORT: u16 = 3232;

    pub fn new(port: u16) -> Self {
        Self { port, polls: 0 }
    }

    #[cfg(test)]
    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl LinkService for OtaListener {
    fn name(&self) -> &str {
        "ota"
    }

    fn start(&mut self, hostname: &str) -> Result<(), LinkError> {
        info!(hostname, port = self.port, "update listener ready");
        Ok(())
    }

    fn poll(&mut self) {
        self.polls += 1;
        if self.polls % 1_000 == 0 {
            debug!(polls = self.polls, "no update offered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announcer_uses_local_domain() {
        let mut mdns = MdnsAnnouncer::new();
        assert!(mdns.fqdn().is_none());
        mdns.start("ada").unwrap();
        assert_eq!(mdns.fqdn(), Some("ada.local"));
        assert_eq!(mdns.name(), "mdns");
    }

    #[test]
    fn announcer_rejects_dotted_hostname() {
        let mut mdns = MdnsAnnouncer::new();
        assert!(matches!(mdns.start("ada.lab"), Err(LinkError::Service { .. })));
        assert!(mdns.fqdn().is_none());
    }

    #[test]
    fn device_records_cover_http_and_websocket() {
        let ports: Vec<u16> = DEVICE_RECORDS.iter().map(|r| r.port).collect();
        assert_eq!(ports, vec![80, 81]);
    }

    #[test]
    fn ota_counts_polls() {
        let mut ota = OtaListener::new(OtaListener::DEFAULT_PORT);
        ota.start("ada").unwrap();
        ota.poll();
        ota.poll();
        assert_eq!(ota.polls(), 2);
    }
}
