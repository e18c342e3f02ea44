use crate::error::{AlertError, ReadingRole, Result};
use baromon_common::types::{PressureDelta, PressureReading};

/// Computes `current - historical`.
///
/// The time gap between the two readings is not checked here; it is a
/// property of how the historical reading is sourced.
pub fn evaluate(historical: &PressureReading, current: &PressureReading) -> Result<PressureDelta> {
    check_value(historical, ReadingRole::Historical)?;
    check_value(current, ReadingRole::Current)?;

    Ok(PressureDelta {
        value: current.value_hpa - historical.value_hpa,
    })
}

fn check_value(reading: &PressureReading, which: ReadingRole) -> Result<()> {
    if reading.value_hpa.is_finite() {
        Ok(())
    } else {
        Err(AlertError::InvalidReading {
            which,
            reason: format!("pressure value {} is not a finite number", reading.value_hpa),
        })
    }
}
