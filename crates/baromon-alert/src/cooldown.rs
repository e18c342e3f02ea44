//! Cooldown between consecutive pressure-drop notifications.
//!
//! ```text
//!            SEND decision
//!   Idle ─────────────────────► Cooling { until }
//!    ▲                                │
//!    └──── now - last_sent_at >= cooldown
//! ```
//!
//! The state is derived entirely from [`NotificationMemory`], so the two
//! transitions can be tested without any I/O. The cooldown is global to
//! the pressure-drop alert; it is not keyed by message content.

use baromon_common::types::NotificationMemory;
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_COOLDOWN_SECS: i64 = 6 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    /// No send on record, or the cooldown has elapsed. Eligible to send.
    Idle,
    /// A send happened less than one cooldown ago. Eligible again at `until`.
    Cooling { until: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownTracker {
    cooldown: Duration,
}

impl CooldownTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn state(&self, now: DateTime<Utc>, memory: &NotificationMemory) -> CooldownState {
        match memory.last_sent_at {
            None => CooldownState::Idle,
            // A last_sent_at ahead of `now` yields a negative elapsed time,
            // which keeps the tracker cooling until the clock catches up.
            Some(last) if now - last >= self.cooldown => CooldownState::Idle,
            Some(last) => CooldownState::Cooling {
                until: last
                    .checked_add_signed(self.cooldown)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            },
        }
    }

    pub fn allow(&self, now: DateTime<Utc>, memory: &NotificationMemory) -> bool {
        self.state(now, memory) == CooldownState::Idle
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_COOLDOWN_SECS))
    }
}
