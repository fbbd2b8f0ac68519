//! Synthetic soil pH signal.
//!
//! There is no pH probe on the board, so the value is a slow sine wave around
//! neutral: `7.0 + 3.5 * sin(elapsed_ms * 0.001)`, giving a 3.5 – 10.5 swing
//! with a period of roughly 6.3 s.

use std::fmt;

use crate::state::{elapsed, Millis};

/// Centre of the waveform (neutral soil).
const PH_BASELINE: f64 = 7.0;
/// Peak deviation from the baseline.
const PH_AMPLITUDE: f64 = 3.5;
/// Phase advance in radians per millisecond.
const PH_FREQUENCY: f64 = 0.001;

pub const PH_MIN: f64 = 0.0;
pub const PH_MAX: f64 = 14.0;

/// Lower bound of the pH window most crops tolerate.
pub const PH_IDEAL_MIN: f64 = 6.0;
/// Upper bound of the pH window most crops tolerate.
pub const PH_IDEAL_MAX: f64 = 7.5;

// ---------------------------------------------------------------------------
// Waveform generator
// ---------------------------------------------------------------------------

/// Sine-wave pH generator anchored at the time the control loop started.
#[derive(Debug, Clone, Copy)]
pub struct PhWaveform {
    start: Millis,
}

impl PhWaveform {
    pub fn new(start: Millis) -> Self {
        Self { start }
    }

    /// pH at `now`, clamped to [0, 14] and rounded to two decimals.
    pub fn next_ph(&self, now: Millis) -> f64 {
        let phase = f64::from(elapsed(now, self.start)) * PH_FREQUENCY;
        let raw = PH_BASELINE + PH_AMPLITUDE * phase.sin();
        round2(raw.clamp(PH_MIN, PH_MAX))
    }
}

/// Round half away from zero to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhClass {
    Acidic,
    Ideal,
    Basic,
}

impl PhClass {
    pub fn of(ph: f64) -> Self {
        if ph < PH_IDEAL_MIN {
            Self::Acidic
        } else if ph > PH_IDEAL_MAX {
            Self::Basic
        } else {
            Self::Ideal
        }
    }
}

impl fmt::Display for PhClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acidic => write!(f, "acidic"),
            Self::Ideal => write!(f, "ideal"),
            Self::Basic => write!(f, "basic"),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
