//! Timing and signal thresholds for association and roaming.

use aproam_types::LinkError;
use serde::{Deserialize, Serialize};

/// Minimum time between two roam checks.
pub const ROAM_CHECK_INTERVAL_MS: u64 = 30_000;
/// A link at or below this strength is considered weak.
pub const WEAK_SIGNAL_THRESHOLD_DBM: i32 = -75;
/// A candidate must beat the current link by more than this to be chosen.
pub const ROAM_IMPROVEMENT_DB: i32 = 10;
/// Cadence of link-status polls while associating.
pub const ASSOCIATE_POLL_INTERVAL_MS: u64 = 500;
/// Number of polls before an association attempt is abandoned.
pub const ASSOCIATE_MAX_POLLS: u32 = 20;
/// Pause between dropping the old AP and joining the new one.
pub const ROAM_SETTLE_MS: u64 = 1_000;
/// Pause between failed association attempts during bring-up.
pub const BRING_UP_RETRY_DELAY_MS: u64 = 2_000;

/// Exponential backoff between failed reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay after the first failed reconnect.
    pub initial_ms: u64,
    /// Ceiling for the doubled delay.
    pub max_ms: u64,
}

/// Tunables of the connectivity manager.
///
/// Every field has a default, so a config file only needs to name the values
/// it changes:
///
/// ```
/// use aproam_link::RoamPolicy;
///
/// let policy: RoamPolicy = serde_json::from_str(r#"{"roam_check_interval_ms": 60000}"#).unwrap();
/// assert_eq!(policy.roam_check_interval_ms, 60_000);
/// assert_eq!(policy.weak_signal_threshold_dbm, -75);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoamPolicy {
    pub roam_check_interval_ms: u64,
    pub weak_signal_threshold_dbm: i32,
    pub roam_improvement_db: i32,
    pub associate_poll_interval_ms: u64,
    pub associate_max_polls: u32,
    pub roam_settle_ms: u64,
    pub bring_up_retry_delay_ms: u64,
    /// `None` retries on every tick with no delay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_backoff: Option<BackoffPolicy>,
}

impl Default for RoamPolicy {
    fn default() -> Self {
        Self {
            roam_check_interval_ms: ROAM_CHECK_INTERVAL_MS,
            weak_signal_threshold_dbm: WEAK_SIGNAL_THRESHOLD_DBM,
            roam_improvement_db: ROAM_IMPROVEMENT_DB,
            associate_poll_interval_ms: ASSOCIATE_POLL_INTERVAL_MS,
            associate_max_polls: ASSOCIATE_MAX_POLLS,
            roam_settle_ms: ROAM_SETTLE_MS,
            bring_up_retry_delay_ms: BRING_UP_RETRY_DELAY_MS,
            reconnect_backoff: None,
        }
    }
}

impl RoamPolicy {
    /// Upper bound on how long one association attempt blocks.
    pub fn association_timeout_ms(&self) -> u64 {
        self.associate_poll_interval_ms
            .saturating_mul(u64::from(self.associate_max_polls))
    }

    /// Reject settings that would spin the control loop or never roam.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.roam_check_interval_ms == 0 {
            return Err(LinkError::Config(
                "roam_check_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.associate_poll_interval_ms == 0 {
            return Err(LinkError::Config(
                "associate_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.associate_max_polls == 0 {
            return Err(LinkError::Config(
                "associate_max_polls must be greater than zero".to_string(),
            ));
        }
        if self.roam_improvement_db < 0 {
            return Err(LinkError::Config(
                "roam_improvement_db cannot be negative".to_string(),
            ));
        }
        if let Some(backoff) = self.reconnect_backoff {
            if backoff.initial_ms == 0 {
                return Err(LinkError::Config(
                    "reconnect_backoff.initial_ms must be greater than zero".to_string(),
                ));
            }
            if backoff.max_ms < backoff.initial_ms {
                return Err(LinkError::Config(format!(
                    "reconnect_backoff.max_ms ({}) is below initial_ms ({})",
                    backoff.max_ms, backoff.initial_ms
                )));
            }
        }
        Ok(())
    }
}
