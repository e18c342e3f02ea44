use crate::cooldown::{CooldownState, CooldownTracker};
use crate::delta;
use crate::error::Result;
use crate::window::QuietHoursWindow;
use baromon_common::types::{Decision, NotificationMemory, PressureDelta, PressureReading};
use chrono::{DateTime, Utc};
use tracing;

pub const DEFAULT_DROP_THRESHOLD_HPA: f64 = 1.0;

/// Tunables for one deployment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPolicy {
    /// A fall strictly larger than this many hPa triggers an alert.
    pub drop_threshold_hpa: f64,
    pub quiet_hours: QuietHoursWindow,
    pub cooldown: CooldownTracker,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            drop_threshold_hpa: DEFAULT_DROP_THRESHOLD_HPA,
            quiet_hours: QuietHoursWindow::default(),
            cooldown: CooldownTracker::default(),
        }
    }
}

/// Result of one decision cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionOutcome {
    pub decision: Decision,
    pub delta: PressureDelta,
    /// Memory to persist. Only `Some` for [`Decision::Send`].
    pub memory: Option<NotificationMemory>,
}

pub struct DecisionEngine {
    policy: AlertPolicy,
}

impl DecisionEngine {
    pub fn new(policy: AlertPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// Decides whether this cycle sends a notification.
    ///
    /// Quiet hours are checked before the cooldown, and neither suppression
    /// touches `last_sent_at`: the cooldown is always measured from the last
    /// actual send.
    pub fn decide(
        &self,
        historical: &PressureReading,
        current: &PressureReading,
        now: DateTime<Utc>,
        memory: &NotificationMemory,
    ) -> Result<DecisionOutcome> {
        let delta = delta::evaluate(historical, current)?;

        let (decision, memory) = if !delta.is_significant_drop(self.policy.drop_threshold_hpa) {
            (Decision::NoTrigger, None)
        } else if self.policy.quiet_hours.is_quiet(now) {
            (Decision::SuppressQuietHours, None)
        } else {
            match self.policy.cooldown.state(now, memory) {
                CooldownState::Cooling { until } => {
                    tracing::debug!(
                        last_sent_at = ?memory.last_sent_at,
                        %until,
                        "Alert suppressed (cooldown)"
                    );
                    (Decision::SuppressCooldown, None)
                }
                CooldownState::Idle => (Decision::Send, Some(memory.recorded(now))),
            }
        };

        tracing::debug!(
            %decision,
            delta_hpa = delta.value,
            historical_hpa = historical.value_hpa,
            current_hpa = current.value_hpa,
            %now,
            "Decision evaluated"
        );

        Ok(DecisionOutcome {
            decision,
            delta,
            memory,
        })
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(AlertPolicy::default())
    }
}
