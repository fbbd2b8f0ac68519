//! Board I/O: nutrient buttons, pump relay + indicator LED, and the
//! monotonic millisecond clock.  The `gpio` feature gates the real rppal
//! drivers; without it, mock implementations log state changes.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, InputPin, OutputPin};

use crate::config::Config;
use crate::debounce::NutrientInput;
use crate::dht::Dht22;
use crate::state::Millis;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

pub trait DigitalInputs {
    /// Raw, unfiltered pin level (`true` = HIGH).
    fn read_level(&mut self, input: NutrientInput) -> bool;
}

/// Pump relay and indicator LED.  The controller always drives both to the
/// same state.
pub trait Actuator {
    fn set_relay(&mut self, on: bool);
    fn set_indicator(&mut self, on: bool);
}

pub trait Clock {
    fn now(&self) -> Millis;
}

/// Milliseconds since construction, truncated to 32 bits so the value wraps
/// like a board tick counter.  Backed by the tokio clock so paused-time tests
/// drive it too.
pub struct MonotonicClock {
    origin: tokio::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Pin level that switches an output `on` given its polarity.
fn output_level(on: bool, active_low: bool) -> bool {
    on != active_low
}

fn pin_number(pin: i64) -> Result<u8> {
    u8::try_from(pin).with_context(|| format!("gpio {pin} out of range"))
}

/// Everything the control loop needs from the board.
pub struct Board {
    pub buttons: NutrientButtons,
    pub pump: Pump,
    pub humidity: Dht22,
}

// ---------------------------------------------------------------------------
// Real GPIO board (production, requires rppal + Raspberry Pi hardware)
// ---------------------------------------------------------------------------

#[cfg(feature = "gpio")]
pub fn init(cfg: &Config) -> Result<Board> {
    let gpio = Gpio::new().context("failed to open GPIO")?;
    let pins = &cfg.pins;

    // Buttons pull the line low when pressed.
    let phosphorus = gpio
        .get(pin_number(pins.phosphorus_button)?)
        .context("phosphorus button pin")?
        .into_input_pullup();
    let potassium = gpio
        .get(pin_number(pins.potassium_button)?)
        .context("potassium button pin")?
        .into_input_pullup();

    let relay = gpio
        .get(pin_number(pins.relay)?)
        .context("relay pin")?
        .into_output();
    let indicator = gpio
        .get(pin_number(pins.indicator)?)
        .context("indicator pin")?
        .into_output();

    let mut pump = Pump {
        relay,
        indicator,
        relay_active_low: cfg.actuator.relay_active_low,
        indicator_active_low: cfg.actuator.indicator_active_low,
    };
    // Fail-safe: ensure "OFF" at startup
    pump.set_relay(false);
    pump.set_indicator(false);

    let humidity = Dht22::new(&gpio, pin_number(pins.humidity_sensor)?)?;

    info!(pins = ?cfg.pins, "gpio board initialised");

    Ok(Board {
        buttons: NutrientButtons {
            phosphorus,
            potassium,
        },
        pump,
        humidity,
    })
}

#[cfg(feature = "gpio")]
pub struct NutrientButtons {
    phosphorus: InputPin,
    potassium: InputPin,
}

#[cfg(feature = "gpio")]
impl DigitalInputs for NutrientButtons {
    fn read_level(&mut self, input: NutrientInput) -> bool {
        match input {
            NutrientInput::Phosphorus => self.phosphorus.is_high(),
            NutrientInput::Potassium => self.potassium.is_high(),
        }
    }
}

#[cfg(feature = "gpio")]
pub struct Pump {
    relay: OutputPin,
    indicator: OutputPin,
    relay_active_low: bool,
    indicator_active_low: bool,
}

#[cfg(feature = "gpio")]
fn drive(pin: &mut OutputPin, on: bool, active_low: bool) {
    if output_level(on, active_low) {
        pin.set_high();
    } else {
        pin.set_low();
    }
}

#[cfg(feature = "gpio")]
impl Actuator for Pump {
    fn set_relay(&mut self, on: bool) {
        drive(&mut self.relay, on, self.relay_active_low);
    }

    fn set_indicator(&mut self, on: bool) {
        drive(&mut self.indicator, on, self.indicator_active_low);
    }
}

// ---------------------------------------------------------------------------
// Mock board (development, no hardware, logs state changes)
// ---------------------------------------------------------------------------

#[cfg(not(feature = "gpio"))]
pub fn init(cfg: &Config) -> Result<Board> {
    let pins = &cfg.pins;
    for (name, pin) in [
        ("phosphorus_button", pins.phosphorus_button),
        ("potassium_button", pins.potassium_button),
        ("relay", pins.relay),
        ("indicator", pins.indicator),
    ] {
        info!("[mock-gpio] registered {name} (gpio {}, not wired)", pin_number(pin)?);
    }
    let humidity = Dht22::new(pin_number(pins.humidity_sensor)?);
    info!("[mock-gpio] board initialised (no hardware)");

    Ok(Board {
        buttons: NutrientButtons::default(),
        pump: Pump::new(cfg.actuator.relay_active_low, cfg.actuator.indicator_active_low),
        humidity,
    })
}

/// Both inputs idle HIGH (not pressed).
#[cfg(not(feature = "gpio"))]
pub struct NutrientButtons {
    pub(crate) phosphorus_level: bool,
    pub(crate) potassium_level: bool,
}

#[cfg(not(feature = "gpio"))]
impl Default for NutrientButtons {
    fn default() -> Self {
        Self {
            phosphorus_level: true,
            potassium_level: true,
        }
    }
}

#[cfg(not(feature = "gpio"))]
impl DigitalInputs for NutrientButtons {
    fn read_level(&mut self, input: NutrientInput) -> bool {
        match input {
            NutrientInput::Phosphorus => self.phosphorus_level,
            NutrientInput::Potassium => self.potassium_level,
        }
    }
}

/// Tracks the pin level each output would be driven to.
#[cfg(not(feature = "gpio"))]
pub struct Pump {
    pub(crate) relay_level: bool,
    pub(crate) indicator_level: bool,
    relay_active_low: bool,
    indicator_active_low: bool,
}

#[cfg(not(feature = "gpio"))]
impl Pump {
    fn new(relay_active_low: bool, indicator_active_low: bool) -> Self {
        Self {
            relay_level: output_level(false, relay_active_low),
            indicator_level: output_level(false, indicator_active_low),
            relay_active_low,
            indicator_active_low,
        }
    }
}

#[cfg(not(feature = "gpio"))]
impl Actuator for Pump {
    fn set_relay(&mut self, on: bool) {
        let level = output_level(on, self.relay_active_low);
        if level != self.relay_level {
            info!("[mock-gpio] relay set {}", if on { "ON" } else { "OFF" });
        }
        self.relay_level = level;
    }

    fn set_indicator(&mut self, on: bool) {
        let level = output_level(on, self.indicator_active_low);
        if level != self.indicator_level {
            info!("[mock-gpio] indicator set {}", if on { "ON" } else { "OFF" });
        }
        self.indicator_level = level;
    }
}

// ---------------------------------------------------------------------------
// Startup self-test
// ---------------------------------------------------------------------------

/// Switch relay and indicator on for `duration`, then off again.
pub async fn self_test<A: Actuator>(pump: &mut A, duration: Duration) {
    info!(
        secs = duration.as_secs_f32(),
        "self-test: relay and indicator on"
    );
    pump.set_relay(true);
    pump.set_indicator(true);
    tokio::time::sleep(duration).await;
    pump.set_relay(false);
    pump.set_indicator(false);
    info!("self-test complete, starting normal operation");
}

// ===========================================================================
// Tests
// ===========================================================================


#[cfg(all(test, not(feature = "gpio")))]
mod mock_tests {
    use super::*;

    // -- Mock board -------------------------------------------------------

    #[test]
    fn init_default_config() {
        let board = init(&Config::default()).unwrap();
        assert!(board.buttons.phosphorus_level);
        assert!(board.buttons.potassium_level);
        assert!(!board.pump.relay_level);
    }

    #[test]
    fn buttons_idle_high() {
        let mut buttons = NutrientButtons::default();
        assert!(buttons.read_level(NutrientInput::Phosphorus));
        assert!(buttons.read_level(NutrientInput::Potassium));
    }

    #[test]
    fn pump_starts_off_active_low() {
        let pump = Pump::new(true, false);
        assert!(pump.relay_level, "active-low relay idles HIGH");
        assert!(!pump.indicator_level);
    }

    #[test]
    fn pump_set_on_and_off() {
        let mut pump = Pump::new(false, false);
        pump.set_relay(true);
        pump.set_indicator(true);
        assert!(pump.relay_level);
        assert!(pump.indicator_level);
        pump.set_relay(false);
        pump.set_indicator(false);
        assert!(!pump.relay_level);
        assert!(!pump.indicator_level);
    }

    #[test]
    fn pump_active_low_relay_inverts() {
        let mut pump = Pump::new(true, false);
        pump.set_relay(true);
        assert!(!pump.relay_level);
    }

    // -- Self-test --------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn self_test_turns_outputs_on_then_off() {
        let mut pump = Pump::new(false, false);
        let start = tokio::time::Instant::now();
        self_test(&mut pump, Duration::from_secs(3)).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(!pump.relay_level);
        assert!(!pump.indicator_level);
    }
}
