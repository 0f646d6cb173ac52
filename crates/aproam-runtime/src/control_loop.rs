//! [`ControlLoop`] – cooperative single-threaded main loop.
//!
//! The connectivity manager is ticked first on every iteration, then each
//! registered [`LoopTask`] in registration order.  Nothing runs concurrently:
//! a reconnect or roam blocks the other tasks for its whole duration.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::AtomicBool;
//!
//! use aproam_hal::sim::{SimAccessPoint, SimClock, SimRadio};
//! use aproam_link::{ConnectivityManager, RoamPolicy};
//! use aproam_runtime::ControlLoop;
//! use aproam_types::{Bssid, NetworkCredentials};
//!
//! let clock = SimClock::new();
//! let radio = SimRadio::new(clock.clone())
//!     .with_access_point(SimAccessPoint::new("IOT", Bssid::new([2, 0, 0, 0, 0, 1]), -60));
//! let creds = NetworkCredentials::new("IOT", "", "ada").unwrap();
//! let manager = ConnectivityManager::new(radio, clock, creds, RoamPolicy::default()).unwrap();
//!
//! let mut control = ControlLoop::new(manager);
//! control.bring_up();
//! let shutdown = AtomicBool::new(true);
//! assert_eq!(control.run(&shutdown, 50), 0);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use aproam_hal::{Clock, Radio};
use aproam_link::{ConnectivityManager, TickOutcome};
use aproam_types::LinkError;
use tracing::{debug, info, warn};

/// A cooperative duty run once per loop iteration after the manager tick.
///
/// Implementations must return promptly; anything that blocks delays the
/// next connectivity tick.
pub trait LoopTask: Send {
    fn name(&self) -> &str;

    /// Do one slice of work at `now_ms`.
    ///
    /// # Errors
    ///
    /// Any error is logged by the loop and the task is called again on the
    /// next iteration.
    fn run(&mut self, now_ms: u64) -> Result<(), LinkError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the [`ConnectivityManager`] and the registered tasks.
pub struct ControlLoop<R: Radio, C: Clock> {
    manager: ConnectivityManager<R, C>,
    tasks: Vec<Box<dyn LoopTask>>,
    iterations: u64,
}

impl<R: Radio, C: Clock> ControlLoop<R, C> {
    pub fn new(manager: ConnectivityManager<R, C>) -> Self {
        Self {
            manager,
            tasks: Vec::new(),
            iterations: 0,
        }
    }

    pub fn with_task(mut self, task: Box<dyn LoopTask>) -> Self {
        self.tasks.push(task);
        self
    }

    /// Blocking startup of the managed link.  See
    /// [`ConnectivityManager::bring_up`].
    pub fn bring_up(&mut self) -> u32 {
        self.manager.bring_up()
    }

    /// One iteration: manager tick, then every task.
    pub fn run_once(&mut self) -> TickOutcome {
        let outcome = self.manager.tick();
        let now = self.manager.clock().now_millis();
        for task in &mut self.tasks {
            if let Err(e) = task.run(now) {
                warn!(task = task.name(), error = %e, "loop task failed");
            }
        }
        self.iterations += 1;
        debug!(iteration = self.iterations, ?outcome, "loop iteration");
        outcome
    }

    /// Iterate until `shutdown` is set, sleeping `period_ms` on the manager's
    /// clock between iterations.  The flag is checked before every iteration.
    /// Returns the number of iterations run by this call.
    pub fn run(&mut self, shutdown: &AtomicBool, period_ms: u64) -> u64 {
        let start = self.iterations;
        info!(period_ms, tasks = self.tasks.len(), "control loop started");
        while !shutdown.load(Ordering::Acquire) {
            self.run_once();
            if shutdown.load(Ordering::Acquire) {
                break;
            }
            self.manager.clock().sleep_millis(period_ms);
        }
        let ran = self.iterations - start;
        info!(iterations = ran, "control loop stopped");
        ran
    }

    /// Total iterations since construction.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn manager(&self) -> &ConnectivityManager<R, C> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ConnectivityManager<R, C> {
        &mut self.manager
    }

    pub fn into_manager(self) -> ConnectivityManager<R, C> {
        self.manager
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
