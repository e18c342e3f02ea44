use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single barometric pressure sample as reported by a data source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureReading {
    pub timestamp: DateTime<Utc>,
    pub value_hpa: f64,
}

impl PressureReading {
    pub fn new(timestamp: DateTime<Utc>, value_hpa: f64) -> Self {
        Self {
            timestamp,
            value_hpa,
        }
    }
}

/// Signed pressure change between two readings, `current - historical`.
///
/// Negative values mean the pressure fell.
///
/// # Examples
///
/// ```
/// use baromon_common::types::PressureDelta;
///
/// assert!(PressureDelta { value: -1.5 }.is_significant_drop(1.0));
/// assert!(!PressureDelta { value: -1.0 }.is_significant_drop(1.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureDelta {
    pub value: f64,
}

impl PressureDelta {
    /// True when the fall is strictly larger than `threshold_hpa`.
    pub fn is_significant_drop(&self, threshold_hpa: f64) -> bool {
        self.value < -threshold_hpa
    }
}

/// Durable memory of the last notification actually sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMemory {
    pub last_sent_at: Option<DateTime<Utc>>,
}

impl NotificationMemory {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn sent_at(at: DateTime<Utc>) -> Self {
        Self {
            last_sent_at: Some(at),
        }
    }

    /// Returns the memory after recording a send at `at`.
    ///
    /// `last_sent_at` never moves backwards: an `at` earlier than the
    /// stored instant leaves the stored instant in place.
    pub fn recorded(&self, at: DateTime<Utc>) -> Self {
        let last_sent_at = match self.last_sent_at {
            Some(prev) if prev > at => prev,
            _ => at,
        };
        Self {
            last_sent_at: Some(last_sent_at),
        }
    }
}

/// Outcome of one decision cycle.
///
/// # Examples
///
/// ```
/// use baromon_common::types::Decision;
///
/// let d: Decision = "suppress_cooldown".parse().unwrap();
/// assert_eq!(d, Decision::SuppressCooldown);
/// assert_eq!(Decision::Send.to_string(), "send");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Send,
    SuppressQuietHours,
    SuppressCooldown,
    NoTrigger,
}

impl Decision {
    pub fn is_send(&self) -> bool {
        matches!(self, Decision::Send)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Send => write!(f, "send"),
            Decision::SuppressQuietHours => write!(f, "suppress_quiet_hours"),
            Decision::SuppressCooldown => write!(f, "suppress_cooldown"),
            Decision::NoTrigger => write!(f, "no_trigger"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "send" => Ok(Decision::Send),
            "suppress_quiet_hours" => Ok(Decision::SuppressQuietHours),
            "suppress_cooldown" => Ok(Decision::SuppressCooldown),
            "no_trigger" => Ok(Decision::NoTrigger),
            _ => Err(format!("unknown decision: {s}")),
        }
    }
}
