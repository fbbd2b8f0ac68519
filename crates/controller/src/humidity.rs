//! Soil moisture source: passes a real sensor reading through, or falls back
//! to a simulator that swings between a dry and a wet band so the irrigation
//! logic gets exercised in both directions.

use std::ops::RangeInclusive;

use tracing::info;

use crate::state::{elapsed, Millis};

/// How long the simulator stays in one band before switching.
pub const BAND_TOGGLE_MS: Millis = 25_000;

/// Dry band, always below the irrigation start threshold.
pub const LOW_BAND: RangeInclusive<u8> = 15..=28;
/// Wet band, always above the irrigation stop threshold.
pub const HIGH_BAND: RangeInclusive<u8> = 71..=84;

// ---------------------------------------------------------------------------
// Oscillation simulator
// ---------------------------------------------------------------------------

/// Alternates between [`LOW_BAND`] and [`HIGH_BAND`] every
/// [`BAND_TOGGLE_MS`], returning a uniform integer from the active band.
pub struct OscillationSim {
    last_toggle: Millis,
    band_is_low: bool,
    rng: fastrand::Rng,
}

impl OscillationSim {
    /// Starts in the wet band with the toggle timer at zero.
    pub fn new(rng: fastrand::Rng) -> Self {
        Self {
            last_toggle: 0,
            band_is_low: false,
            rng,
        }
    }

    #[cfg(test)]
    fn band_is_low(&self) -> bool {
        self.band_is_low
    }

    pub fn sample(&mut self, now: Millis) -> f64 {
        if elapsed(now, self.last_toggle) > BAND_TOGGLE_MS {
            self.last_toggle = now;
            self.band_is_low = !self.band_is_low;
            info!(
                band = if self.band_is_low { "low" } else { "high" },
                "simulated moisture band switched"
            );
        }

        let band = if self.band_is_low { LOW_BAND } else { HIGH_BAND };
        f64::from(self.rng.u8(band))
    }
}

// ---------------------------------------------------------------------------
// Source adapter
// ---------------------------------------------------------------------------

/// A reading is missing when the sensor returned nothing or NaN.
pub fn is_missing(reading: Option<f64>) -> bool {
    reading.map_or(true, f64::is_nan)
}

pub struct MoistureSource {
    sim: OscillationSim,
}

impl MoistureSource {
    pub fn new(rng: fastrand::Rng) -> Self {
        Self {
            sim: OscillationSim::new(rng),
        }
    }

    /// Moisture percentage for this cycle.  A real reading (`Some`, not NaN)
    /// is returned unchanged; a missing one is replaced by simulated data.
    pub fn next_moisture(&mut self, now: Millis, reading: Option<f64>) -> f64 {
        match reading {
            Some(v) if !is_missing(reading) => v,
            _ => self.sim.sample(now),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn in_band(v: f64, band: &RangeInclusive<u8>) -> bool {
        v >= f64::from(*band.start()) && v <= f64::from(*band.end()) && v.fract() == 0.0
    }

    // -- Simulator --------------------------------------------------------

    #[test]
    fn starts_in_high_band() {
        let mut sim = OscillationSim::new(fastrand::Rng::with_seed(1));
        let v = sim.sample(5_000);
        assert!(!sim.band_is_low());
        assert!(in_band(v, &HIGH_BAND), "expected high band, got {v}");
    }

    #[test]
    fn toggle_requires_strictly_more_than_period() {
        let mut sim = OscillationSim::new(fastrand::Rng::with_seed(2));
        sim.sample(BAND_TOGGLE_MS);
        assert!(!sim.band_is_low(), "exactly one period must not toggle");
        sim.sample(BAND_TOGGLE_MS + 1);
        assert!(sim.band_is_low());
    }

    #[test]
    fn low_band_after_first_toggle() {
        let mut sim = OscillationSim::new(fastrand::Rng::with_seed(3));
        for _ in 0..50 {
            let v = sim.sample(30_000);
            assert!(in_band(v, &LOW_BAND), "expected low band, got {v}");
        }
    }

    #[test]
    fn never_leaves_the_two_bands() {
        let mut sim = OscillationSim::new(fastrand::Rng::with_seed(4));
        for t in (0..600_000).step_by(100) {
            let v = sim.sample(t);
            assert!(
                in_band(v, &LOW_BAND) || in_band(v, &HIGH_BAND),
                "value {v} at {t} outside both bands"
            );
        }
    }

    #[test]
    fn flips_once_per_period_at_most() {
        // Poll every 100 ms for 10 minutes and record flip instants.
        let mut sim = OscillationSim::new(fastrand::Rng::with_seed(5));
        let mut last = sim.band_is_low();
        let mut flips = Vec::new();
        for t in (0..600_000).step_by(100) {
            sim.sample(t);
            if sim.band_is_low() != last {
                flips.push(t);
                last = sim.band_is_low();
            }
        }
        assert_eq!(flips.first(), Some(&25_100));
        for w in flips.windows(2) {
            assert!(w[1] - w[0] > BAND_TOGGLE_MS, "flips too close: {w:?}");
        }
        // 600 s / 25.1 s per flip
        assert_eq!(flips.len(), 23);
    }

    #[test]
    fn toggle_survives_counter_wrap() {
        let mut sim = OscillationSim::new(fastrand::Rng::with_seed(6));
        let near_wrap = u32::MAX - 10_000;
        sim.sample(near_wrap); // > 25 s since 0 → toggles to low
        assert!(sim.band_is_low());
        sim.sample(10_000); // ~20 s after near_wrap
        assert!(sim.band_is_low());
        sim.sample(15_002); // just over 25 s after near_wrap
        assert!(!sim.band_is_low());
    }

    #[test]
    fn seeded_sims_are_reproducible() {
        let mut a = OscillationSim::new(fastrand::Rng::with_seed(42));
        let mut b = OscillationSim::new(fastrand::Rng::with_seed(42));
        for t in (0..100_000).step_by(5_000) {
            assert_eq!(a.sample(t), b.sample(t));
        }
    }

    // -- Adapter ----------------------------------------------------------

    #[test]
    fn real_reading_passes_through() {
        let mut src = MoistureSource::new(fastrand::Rng::with_seed(7));
        assert_eq!(src.next_moisture(5_000, Some(55.3)), 55.3);
        assert_eq!(src.next_moisture(10_000, Some(0.0)), 0.0);
    }

    #[test]
    fn real_reading_ignores_oscillation_state() {
        let mut src = MoistureSource::new(fastrand::Rng::with_seed(8));
        // Drive the simulator into the low band first.
        src.next_moisture(30_000, None);
        assert_eq!(src.next_moisture(35_000, Some(65.0)), 65.0);
    }

    #[test]
    fn missing_reading_is_simulated() {
        let mut src = MoistureSource::new(fastrand::Rng::with_seed(9));
        let v = src.next_moisture(5_000, None);
        assert!(in_band(v, &HIGH_BAND));
    }

    #[test]
    fn nan_reading_is_treated_as_missing() {
        let mut src = MoistureSource::new(fastrand::Rng::with_seed(10));
        let v = src.next_moisture(5_000, Some(f64::NAN));
        assert!(in_band(v, &HIGH_BAND), "NaN must fall back to simulation, got {v}");
    }

    #[test]
    fn missing_covers_none_and_nan_only() {
        assert!(is_missing(None));
        assert!(is_missing(Some(f64::NAN)));
        assert!(!is_missing(Some(0.0)));
        assert!(!is_missing(Some(55.3)));
    }
}
