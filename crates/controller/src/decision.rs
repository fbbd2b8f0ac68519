//! Irrigation decision engine: a three-way threshold comparator over soil
//! moisture and pH.
//!
//! ```text
//! moisture < 30 && pH in [6.0, 7.5]   ─▶ Activate
//! moisture > 70 || pH outside window  ─▶ Deactivate
//! otherwise                           ─▶ Hold (keep previous state)
//! ```
//!
//! The hold branch is a deliberate dead zone: with acceptable pH and moisture
//! in [30, 70] the pump keeps doing whatever it was doing.

use crate::ph::{PH_IDEAL_MAX, PH_IDEAL_MIN};
use crate::state::SensorSample;

/// Below this moisture percentage the soil needs water.
pub const MOISTURE_MIN: f64 = 30.0;
/// Above this moisture percentage irrigation must stop.
pub const MOISTURE_MAX: f64 = 70.0;

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Activate,
    /// At least one of the flags is set.
    Deactivate { too_wet: bool, ph_out_of_range: bool },
    Hold,
}

impl Decision {
    /// Pure threshold evaluation; rules are checked in priority order.
    pub fn evaluate(moisture: f64, ph: f64) -> Self {
        let moisture_low = moisture < MOISTURE_MIN;
        let moisture_high = moisture > MOISTURE_MAX;
        let ph_ok = (PH_IDEAL_MIN..=PH_IDEAL_MAX).contains(&ph);

        if moisture_low && ph_ok {
            Self::Activate
        } else if moisture_high || !ph_ok {
            Self::Deactivate {
                too_wet: moisture_high,
                ph_out_of_range: !ph_ok,
            }
        } else {
            Self::Hold
        }
    }

    pub fn apply(self, previous: bool) -> bool {
        match self {
            Self::Activate => true,
            Self::Deactivate { .. } => false,
            Self::Hold => previous,
        }
    }
}

/// New irrigation state for `sample`, given the state before it.  Stateless
/// form of [`ActuatorState::update`], which the control loop uses.
pub fn decide(sample: &SensorSample, previous: bool) -> bool {
    Decision::evaluate(sample.soil_moisture_percent, sample.ph).apply(previous)
}

// ---------------------------------------------------------------------------
// Actuator state
// ---------------------------------------------------------------------------

/// The irrigation on/off state carried between cycles.  Only
/// [`ActuatorState::update`] can change it.
#[derive(Debug, Default)]
pub struct ActuatorState {
    irrigation_active: bool,
}

impl ActuatorState {
    pub fn is_active(&self) -> bool {
        self.irrigation_active
    }

    /// Run the decision for `sample` and store the result.
    pub fn update(&mut self, sample: &SensorSample) -> Decision {
        let decision = Decision::evaluate(sample.soil_moisture_percent, sample.ph);
        self.irrigation_active = decision.apply(self.irrigation_active);
        decision
    }
}

// ===========================================================================
// Tests
// ===========================================================================
