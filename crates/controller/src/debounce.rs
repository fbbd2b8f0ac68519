//! Change detection for the two nutrient presence buttons.
//!
//! Buttons are wired active-low: an idle input reads HIGH.  There is no
//! time-based filtering; a new level is reported as soon as it differs from
//! the last one seen.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NutrientInput {
    Phosphorus,
    Potassium,
}

impl NutrientInput {
    pub const ALL: [Self; 2] = [Self::Phosphorus, Self::Potassium];
}

impl fmt::Display for NutrientInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phosphorus => write!(f, "phosphorus"),
            Self::Potassium => write!(f, "potassium"),
        }
    }
}

/// Edge detector for a single active-low input.
#[derive(Debug, Default)]
struct EdgeDetector {
    last_level: bool,
}

impl EdgeDetector {
    fn update(&mut self, raw_level: bool) -> Option<bool> {
        let level = !raw_level;
        if level == self.last_level {
            return None;
        }
        self.last_level = level;
        Some(level)
    }
}

#[derive(Debug, Default)]
pub struct Debouncer {
    phosphorus: EdgeDetector,
    potassium: EdgeDetector,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw pin level.  Returns the new presence value when it
    /// differs from the previous one, `None` otherwise.
    pub fn update_edge(&mut self, input: NutrientInput, raw_level: bool) -> Option<bool> {
        match input {
            NutrientInput::Phosphorus => self.phosphorus.update(raw_level),
            NutrientInput::Potassium => self.potassium.update(raw_level),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
