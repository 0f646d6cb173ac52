//! `aproam simulate` – drive the connectivity manager through a scenario on
//! simulated time.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use aproam_hal::Clock;
use aproam_hal::sim::SimClock;
use aproam_link::{ConnectivityManager, RoamCheck, TickOutcome, load_credentials};
use aproam_runtime::ControlLoop;
use aproam_types::{LinkError, LinkState};
use tracing::{info, warn};

use crate::config::Config;
use crate::scenario::Scenario;
use crate::services::{MdnsAnnouncer, OtaListener};

/// Association attempts made during bring-up before handing over to the
/// loop, which keeps retrying on every tick.
pub const BRING_UP_ATTEMPTS: u32 = 5;

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// `None` when bring-up gave up.
    pub bring_up_attempts: Option<u32>,
    pub ticks: u64,
    pub elapsed_ms: u64,
    /// Tick outcome label → count.
    pub outcomes: BTreeMap<String, u64>,
    pub joins: usize,
    pub scans: usize,
    /// Events scheduled after the run ended.
    pub events_pending: usize,
    pub final_link: LinkState,
}

/// `true` for outcomes worth showing to the operator.
pub fn is_notable(outcome: &TickOutcome) -> bool {
    !matches!(
        outcome,
        TickOutcome::Roam(RoamCheck::NotDue | RoamCheck::SignalAdequate)
            | TickOutcome::ReconnectDeferred
    )
}

/// Run `scenario` until its duration elapses or `shutdown` is raised.
///
/// Credentials come from the scenario's `[credentials]` table, or from the
/// vault when it has none.  `on_notable` is called with the tick start time
/// for every outcome [`is_notable`] accepts.
pub fn run(
    scenario: &Scenario,
    cfg: &Config,
    tick_ms: u64,
    shutdown: &AtomicBool,
    mut on_notable: impl FnMut(u64, &TickOutcome, &LinkState),
) -> Result<SimulationReport, LinkError> {
    if tick_ms == 0 {
        return Err(LinkError::Scenario("tick must be positive".to_string()));
    }
    let credentials = match scenario.credentials()? {
        Some(creds) => creds,
        None => load_credentials(cfg)?,
    };

    let clock = SimClock::new();
    let mut radio = scenario.build_radio(clock.clone());
    let mut timeline = scenario.timeline();
    timeline.apply_due(0, &mut radio);

    let manager = ConnectivityManager::new(radio, clock.clone(), credentials, cfg.policy)?
        .with_service(Box::new(MdnsAnnouncer::new()))
        .with_service(Box::new(OtaListener::new(OtaListener::DEFAULT_PORT)));
    let mut control = ControlLoop::new(manager);

    let bring_up_attempts = control.manager_mut().bring_up_bounded(BRING_UP_ATTEMPTS);
    if bring_up_attempts.is_none() {
        warn!(attempts = BRING_UP_ATTEMPTS, "bring-up failed, continuing with reconnects");
    }

    let mut outcomes = BTreeMap::new();
    while clock.now_millis() < scenario.duration_ms && !shutdown.load(Ordering::Acquire) {
        let started = clock.now_millis();
        timeline.apply_due(started, control.manager_mut().radio_mut());

        let outcome = control.run_once();
        *outcomes.entry(outcome.to_string()).or_insert(0) += 1;
        if is_notable(&outcome) {
            on_notable(started, &outcome, &control.manager().link_state());
        }

        clock.advance(tick_ms);
    }

    let manager = control.manager();
    let report = SimulationReport {
        bring_up_attempts,
        ticks: control.iterations(),
        elapsed_ms: clock.now_millis(),
        outcomes,
        joins: manager.radio().stats().joins.len(),
        scans: manager.radio().stats().scans,
        events_pending: timeline.remaining(),
        final_link: manager.link_state(),
    };
    info!(ticks = report.ticks, elapsed_ms = report.elapsed_ms, "simulation finished");
    Ok(report)
}
