//! Values that flow through one sampling cycle.

/// Milliseconds since process start.  Wraps at `u32::MAX` like a 32-bit
/// board tick counter, so every elapsed-time computation must use
/// `wrapping_sub`.
pub type Millis = u32;

/// Elapsed time from `since` to `now`, correct across counter wraparound.
pub fn elapsed(now: Millis, since: Millis) -> Millis {
    now.wrapping_sub(since)
}

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Latest logical level of the two nutrient presence inputs.  Updated only
/// from debouncer change events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NutrientPresence {
    pub phosphorus: bool,
    pub potassium: bool,
}

/// One immutable snapshot per sampling cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub timestamp: Millis,
    pub phosphorus_present: bool,
    pub potassium_present: bool,
    /// Clamped to [0, 14], two decimals.
    pub ph: f64,
    /// Percentage in [0, 100].
    pub soil_moisture_percent: f64,
}

impl SensorSample {
    pub fn new(timestamp: Millis, presence: NutrientPresence, ph: f64, moisture: f64) -> Self {
        Self {
            timestamp,
            phosphorus_present: presence.phosphorus,
            potassium_present: presence.potassium,
            ph,
            soil_moisture_percent: moisture,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
