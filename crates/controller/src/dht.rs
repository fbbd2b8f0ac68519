//! DHT22 humidity sensor over its single-wire protocol.
//!
//! Reads are best-effort: a timeout, a checksum mismatch or an implausible
//! value all come back as "missing", which the moisture source turns into
//! simulated data.
//!
//! Frame layout (40 bits, MSB first):
//!   [0..2]  humidity × 10, big-endian
//!   [2..4]  temperature × 10, big-endian, bit 15 = negative
//!   [4]     checksum = low byte of the sum of bytes 0..4

use anyhow::{bail, ensure, Result};

#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, IoPin, Level, Mode};
#[cfg(feature = "gpio")]
use std::{
    thread,
    time::{Duration, Instant},
};

pub trait HumiditySensor {
    /// Relative humidity in percent, or `None` when no valid reading exists.
    fn read_humidity(&mut self) -> Option<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DhtReading {
    pub humidity: f64,
    pub temperature_c: f64,
}

// ── Frame decoding ──────────────────────────────────────────────────────────

/// High pulses longer than this encode a `1` bit (`0` ≈ 26 µs, `1` ≈ 70 µs).
#[cfg_attr(not(feature = "gpio"), allow(dead_code))]
const ONE_BIT_THRESHOLD_US: u32 = 50;

#[cfg_attr(not(feature = "gpio"), allow(dead_code))]
fn pulses_to_frame(high_us: &[u32; 40]) -> [u8; 5] {
    let mut frame = [0u8; 5];
    for (i, &us) in high_us.iter().enumerate() {
        if us > ONE_BIT_THRESHOLD_US {
            frame[i / 8] |= 0x80 >> (i % 8);
        }
    }
    frame
}

#[cfg_attr(not(feature = "gpio"), allow(dead_code))]
fn decode_frame(frame: [u8; 5]) -> Result<DhtReading> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        bail!("dht22 checksum mismatch: computed {sum:#04x}, got {:#04x}", frame[4]);
    }

    let humidity = f64::from(u16::from_be_bytes([frame[0], frame[1]])) / 10.0;
    ensure!(humidity <= 100.0, "dht22 humidity {humidity} out of range");

    let t_raw = u16::from_be_bytes([frame[2], frame[3]]);
    let magnitude = f64::from(t_raw & 0x7fff) / 10.0;
    let temperature_c = if t_raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    };

    Ok(DhtReading {
        humidity,
        temperature_c,
    })
}

// ── Real driver ─────────────────────────────────────────────────────────────

/// Host start signal: hold the line low for at least 1 ms.
#[cfg(feature = "gpio")]
const START_LOW: Duration = Duration::from_millis(2);
/// Give up on any single edge after this long.
#[cfg(feature = "gpio")]
const EDGE_TIMEOUT: Duration = Duration::from_micros(200);

#[cfg(feature = "gpio")]
pub struct Dht22 {
    pin: IoPin,
    pin_num: u8,
}

#[cfg(feature = "gpio")]
impl Dht22 {
    pub fn new(gpio: &Gpio, pin_num: u8) -> Result<Self> {
        let mut pin = gpio.get(pin_num)?.into_io(Mode::Output);
        pin.set_high(); // idle
        tracing::info!(gpio = pin_num, "dht22 initialised");
        Ok(Self { pin, pin_num })
    }

    fn wait_for(&self, level: Level) -> Result<Duration> {
        let start = Instant::now();
        while self.pin.read() != level {
            if start.elapsed() > EDGE_TIMEOUT {
                bail!("dht22 timeout waiting for {level:?}");
            }
        }
        Ok(start.elapsed())
    }

    pub fn read(&mut self) -> Result<DhtReading> {
        self.pin.set_mode(Mode::Output);
        self.pin.set_low();
        thread::sleep(START_LOW);
        self.pin.set_high();
        self.pin.set_mode(Mode::Input);

        // Sensor response: ~80 µs low, ~80 µs high, then the first bit.
        self.wait_for(Level::Low)?;
        self.wait_for(Level::High)?;
        self.wait_for(Level::Low)?;

        let mut high_us = [0u32; 40];
        for slot in high_us.iter_mut() {
            self.wait_for(Level::High)?;
            *slot = self.wait_for(Level::Low)?.as_micros() as u32;
        }

        decode_frame(pulses_to_frame(&high_us))
    }
}

#[cfg(feature = "gpio")]
impl HumiditySensor for Dht22 {
    fn read_humidity(&mut self) -> Option<f64> {
        match self.read() {
            Ok(r) => {
                tracing::debug!(
                    gpio = self.pin_num,
                    humidity = r.humidity,
                    temperature_c = r.temperature_c,
                    "dht22 reading"
                );
                Some(r.humidity)
            }
            Err(e) => {
                tracing::debug!(gpio = self.pin_num, "dht22 read failed: {e}");
                None
            }
        }
    }
}

// ── Mock driver ─────────────────────────────────────────────────────────────

/// Without hardware there is never a reading, so the simulator always runs.
#[cfg(not(feature = "gpio"))]
pub struct Dht22 {
    pin_num: u8,
}

#[cfg(not(feature = "gpio"))]
impl Dht22 {
    pub fn new(pin_num: u8) -> Self {
        tracing::info!("[mock-gpio] dht22 on gpio {pin_num} not wired, readings will be simulated");
        Self { pin_num }
    }
}

#[cfg(not(feature = "gpio"))]
impl HumiditySensor for Dht22 {
    fn read_humidity(&mut self) -> Option<f64> {
        tracing::trace!(gpio = self.pin_num, "[mock-gpio] dht22 read: no sensor");
        None
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
