use chrono::{DateTime, FixedOffset, NaiveTime, Offset, Utc};

/// JST, the clock the sensor deployment lives on.
const DEFAULT_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// Daily wall-clock interval during which notifications are held back.
///
/// Membership is half-open, `[start, end)`, evaluated in the local time
/// given by `utc_offset`. A window whose `start` is after its `end` wraps
/// past midnight (e.g. 22:00 - 06:00). `start == end` is an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHoursWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub utc_offset: FixedOffset,
}

impl QuietHoursWindow {
    pub fn new(start: NaiveTime, end: NaiveTime, utc_offset: FixedOffset) -> Self {
        Self {
            start,
            end,
            utc_offset,
        }
    }

    pub fn is_quiet(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.utc_offset).time();
        if self.start <= self.end {
            local >= self.start && local < self.end
        } else {
            // Overnight window (e.g., 22:00 - 06:00)
            local >= self.start || local < self.end
        }
    }
}

impl Default for QuietHoursWindow {
    /// 00:00 - 06:00 JST.
    fn default() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or(Utc.fix()),
        }
    }
}

/// Free-function form of [`QuietHoursWindow::is_quiet`].
pub fn is_quiet(at: DateTime<Utc>, window: &QuietHoursWindow) -> bool {
    window.is_quiet(at)
}
