//! Control loop: polls the nutrient buttons on every tick and, once per
//! sampling interval, reads the sensors, runs the irrigation decision, drives
//! the pump and emits a report line.
//!
//! ```text
//! every 100 ms ──▶ debounce P, K
//!                    │
//!                    └─[now - last_sample >= 5000]──▶ pH ─▶ moisture ─▶ decide ─▶ pump ─▶ report
//! ```
//!
//! The synchronous [`Controller::tick`] holds all the logic and takes the
//! current time as an argument; [`run`] just drives it from a tokio interval.

use anyhow::Result;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::debounce::{Debouncer, NutrientInput};
use crate::decision::{ActuatorState, Decision, MOISTURE_MAX, MOISTURE_MIN};
use crate::dht::HumiditySensor;
use crate::humidity::{self, MoistureSource};
use crate::hw::{Actuator, Clock, DigitalInputs};
use crate::ph::{PhClass, PhWaveform, PH_IDEAL_MAX, PH_IDEAL_MIN};
use crate::report::Reporter;
use crate::state::{elapsed, Millis, NutrientPresence, SensorSample};

/// Minimum time between two sampling cycles.
pub const SAMPLE_INTERVAL_MS: Millis = 5_000;

/// Button poll period.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Controller<I, H, A, R> {
    inputs: I,
    humidity: H,
    actuator: A,
    reporter: R,

    debouncer: Debouncer,
    presence: NutrientPresence,
    ph: PhWaveform,
    moisture: MoistureSource,
    irrigation: ActuatorState,
    last_sample: Millis,
}

impl<I, H, A, R> Controller<I, H, A, R>
where
    I: DigitalInputs,
    H: HumiditySensor,
    A: Actuator,
    R: Reporter,
{
    /// `start` anchors the pH waveform.  The first sampling cycle fires once
    /// the clock reaches [`SAMPLE_INTERVAL_MS`].
    pub fn new(
        inputs: I,
        humidity: H,
        actuator: A,
        reporter: R,
        start: Millis,
        rng: fastrand::Rng,
    ) -> Self {
        Self {
            inputs,
            humidity,
            actuator,
            reporter,
            debouncer: Debouncer::new(),
            presence: NutrientPresence::default(),
            ph: PhWaveform::new(start),
            moisture: MoistureSource::new(rng),
            irrigation: ActuatorState::default(),
            last_sample: 0,
        }
    }

    pub fn irrigation_active(&self) -> bool {
        self.irrigation.is_active()
    }

    /// One loop iteration.  Returns the sample when a sampling cycle ran.
    ///
    /// The sample is stamped and the interval reset before the report is
    /// written, so a failed write surfaces as an error without shifting the
    /// cadence.
    pub fn tick(&mut self, now: Millis) -> Result<Option<SensorSample>> {
        self.poll_inputs();

        if elapsed(now, self.last_sample) < SAMPLE_INTERVAL_MS {
            return Ok(None);
        }
        self.last_sample = now;

        let sample = self.sample(now);
        self.reporter.emit(&sample, self.irrigation.is_active())?;
        Ok(Some(sample))
    }

    fn poll_inputs(&mut self) {
        for input in NutrientInput::ALL {
            let raw = self.inputs.read_level(input);
            if let Some(present) = self.debouncer.update_edge(input, raw) {
                match input {
                    NutrientInput::Phosphorus => self.presence.phosphorus = present,
                    NutrientInput::Potassium => self.presence.potassium = present,
                }
                info!(
                    nutrient = %input,
                    state = if present { "present" } else { "absent" },
                    "nutrient sensor changed"
                );
            }
        }
    }

    /// Read sensors, decide, and apply the result to the outputs.
    fn sample(&mut self, now: Millis) -> SensorSample {
        let ph = self.ph.next_ph(now);
        let reading = self.humidity.read_humidity();
        let moisture = self.moisture.next_moisture(now, reading);

        let sample = SensorSample::new(now, self.presence, ph, moisture);
        let decision = self.irrigation.update(&sample);
        let active = self.irrigation.is_active();

        self.actuator.set_relay(active);
        self.actuator.set_indicator(active);

        debug!(
            moisture,
            simulated = humidity::is_missing(reading),
            moisture_min = MOISTURE_MIN,
            moisture_max = MOISTURE_MAX,
            ph,
            ph_min = PH_IDEAL_MIN,
            ph_max = PH_IDEAL_MAX,
            ph_class = %PhClass::of(ph),
            decision = ?decision,
            irrigation = if active { "on" } else { "off" },
            "irrigation cycle"
        );
        if let Decision::Deactivate {
            too_wet,
            ph_out_of_range,
        } = decision
        {
            debug!(too_wet, ph_out_of_range, "irrigation conditions not met");
        }

        sample
    }
}

// ---------------------------------------------------------------------------
// Async driver
// ---------------------------------------------------------------------------

/// Drive `controller` forever at [`POLL_INTERVAL`].  A failed report write
/// is logged and the loop carries on.
pub async fn run<I, H, A, R, C>(controller: &mut Controller<I, H, A, R>, clock: &C)
where
    I: DigitalInputs,
    H: HumiditySensor,
    A: Actuator,
    R: Reporter,
    C: Clock,
{
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        poll_ms = POLL_INTERVAL.as_millis() as u64,
        sample_ms = SAMPLE_INTERVAL_MS,
        "control loop started"
    );

    loop {
        ticker.tick().await;
        if let Err(e) = controller.tick(clock.now()) {
            error!("report failed: {e:#}");
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
