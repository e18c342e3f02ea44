use crate::error::CycleError;
use baromon_alert::{DecisionEngine, DecisionOutcome};
use baromon_common::clock::Clock;
use baromon_common::types::{Decision, PressureDelta, PressureReading};
use baromon_notify::manager::NotificationManager;
use baromon_notify::message::{render_message, MessageContext};
use baromon_source::ReadingSource;
use baromon_storage::{MemoryStore, PRESSURE_DROP_KEY};
use chrono::{DateTime, Utc};
use tracing;

/// Everything one decision cycle needs.
pub struct Watcher {
    pub engine: DecisionEngine,
    pub historical: Box<dyn ReadingSource>,
    pub current: Box<dyn ReadingSource>,
    pub store: MemoryStore,
    pub notifier: NotificationManager,
    pub clock: Box<dyn Clock>,
    pub message_template: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Evaluate and log only: no memory write, no notification.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub decision: Decision,
    pub delta: PressureDelta,
    pub now: DateTime<Utc>,
    pub delivered: bool,
}

impl Watcher {
    /// Runs one decision cycle.
    ///
    /// The memory lock is held only around read-decide-write; delivery
    /// happens after commit so a failed delivery never rolls back the send.
    pub async fn run_cycle(&self, options: RunOptions) -> Result<CycleReport, CycleError> {
        let now = self.clock.now();
        let (historical, current) = self.fetch_readings(now).await?;

        let outcome = if options.dry_run {
            let memory = self.store.load(PRESSURE_DROP_KEY)?;
            self.engine.decide(&historical, &current, now, &memory)?
        } else {
            self.store.transact(PRESSURE_DROP_KEY, |memory| {
                let outcome = self.engine.decide(&historical, &current, now, memory)?;
                Ok::<_, CycleError>((outcome, outcome.memory))
            })?
        };

        log_outcome(&outcome, &historical, &current, options.dry_run);

        let mut report = CycleReport {
            decision: outcome.decision,
            delta: outcome.delta,
            now,
            delivered: false,
        };

        if outcome.decision.is_send() && !options.dry_run {
            let message = self.render(&historical, &current, &outcome, now);
            let delivery = self.notifier.notify(&message).await?;
            tracing::info!(
                delivered = ?delivery.delivered,
                failed = delivery.failed.len(),
                "Pressure-drop notification sent"
            );
            report.delivered = true;
        }

        Ok(report)
    }

    async fn fetch_readings(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(PressureReading, PressureReading), CycleError> {
        let (historical, current) =
            tokio::try_join!(self.historical.fetch(now), self.current.fetch(now))?;

        let historical = historical.ok_or_else(|| {
            CycleError::InvalidReading(format!(
                "no historical reading found by {}",
                self.historical.name()
            ))
        })?;
        let current = current.ok_or_else(|| {
            CycleError::InvalidReading(format!(
                "no current reading returned by {}",
                self.current.name()
            ))
        })?;

        if historical.timestamp >= current.timestamp {
            tracing::warn!(
                historical_at = %historical.timestamp,
                current_at = %current.timestamp,
                "Historical reading is not older than current reading"
            );
        }
        Ok((historical, current))
    }

    fn render(
        &self,
        historical: &PressureReading,
        current: &PressureReading,
        outcome: &DecisionOutcome,
        now: DateTime<Utc>,
    ) -> String {
        let offset = self.engine.policy().quiet_hours.utc_offset;
        let ctx = MessageContext {
            current_hpa: current.value_hpa,
            historical_hpa: historical.value_hpa,
            delta_hpa: outcome.delta.value,
            timestamp: now.with_timezone(&offset),
        };
        render_message(&self.message_template, &ctx)
    }
}

fn log_outcome(
    outcome: &DecisionOutcome,
    historical: &PressureReading,
    current: &PressureReading,
    dry_run: bool,
) {
    let reason = match outcome.decision {
        Decision::Send => "Pressure falling fast, notifying",
        Decision::SuppressQuietHours => "Pressure falling fast, skipped (quiet hours)",
        Decision::SuppressCooldown => "Pressure falling fast, skipped (notified within cooldown)",
        Decision::NoTrigger => "No significant pressure change",
    };
    tracing::info!(
        decision = %outcome.decision,
        historical_at = %historical.timestamp,
        current_at = %current.timestamp,
        historical_hpa = historical.value_hpa,
        current_hpa = current.value_hpa,
        delta_hpa = outcome.delta.value,
        dry_run,
        "{reason}"
    );
}
