//! TOML config file loading and validation: pin assignments, output polarity
//! and the simulation seed.  Agronomic thresholds and timing are compiled in
//! and cannot be changed here.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Used when `CONFIG_PATH` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "controller.toml";

/// Longest startup self-test we allow.
const MAX_SELF_TEST_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pins: PinConfig,
    pub actuator: ActuatorConfig,
    pub simulation: SimulationConfig,
}

/// BCM GPIO numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PinConfig {
    pub phosphorus_button: i64,
    pub potassium_button: i64,
    pub humidity_sensor: i64,
    pub relay: i64,
    pub indicator: i64,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            phosphorus_button: 12,
            potassium_button: 14,
            humidity_sensor: 15,
            relay: 27,
            indicator: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActuatorConfig {
    pub relay_active_low: bool,
    pub indicator_active_low: bool,
    pub self_test_secs: u64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            relay_active_low: false,
            indicator_active_low: false,
            self_test_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seed for the moisture fallback simulator.  Random when absent.
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// GPIO whitelist
// ---------------------------------------------------------------------------

/// BCM GPIO pins available on the Raspberry Pi 40-pin header for general
/// use. GPIO 0-1 are reserved for the ID EEPROM and must never be used.
/// GPIO 28+ are not exposed on the standard header.
const VALID_GPIO_PINS: std::ops::RangeInclusive<i64> = 2..=27;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl PinConfig {
    fn named(&self) -> [(&'static str, i64); 5] {
        [
            ("phosphorus_button", self.phosphorus_button),
            ("potassium_button", self.potassium_button),
            ("humidity_sensor", self.humidity_sensor),
            ("relay", self.relay),
            ("indicator", self.indicator),
        ]
    }
}

impl Config {
    /// Validate all entries. Returns `Ok(())` or an error describing every
    /// violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_pins(&mut errors);

        if self.actuator.self_test_secs > MAX_SELF_TEST_SECS {
            errors.push(format!(
                "actuator: self_test_secs {} exceeds maximum of {MAX_SELF_TEST_SECS}",
                self.actuator.self_test_secs
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    fn validate_pins(&self, errors: &mut Vec<String>) {
        let mut seen: HashMap<i64, &str> = HashMap::new();

        for (name, pin) in self.pins.named() {
            if !VALID_GPIO_PINS.contains(&pin) {
                errors.push(format!(
                    "pins.{name}: {pin} is not a valid BCM GPIO pin (allowed: 2-27)"
                ));
            } else if let Some(other) = seen.insert(pin, name) {
                errors.push(format!("pins.{name}: gpio {pin} is already used by {other}"));
            }
        }
    }

    /// Apply `RELAY_ACTIVE_LOW` and `SIM_SEED` overrides.
    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = get("RELAY_ACTIVE_LOW") {
            self.actuator.relay_active_low = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = get("SIM_SEED") {
            let seed = v
                .trim()
                .parse()
                .with_context(|| format!("invalid SIM_SEED: {v:?}"))?;
            self.simulation.seed = Some(seed);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

pub fn parse(contents: &str) -> Result<Config> {
    toml::from_str(contents).context("failed to parse config")
}

/// Read, parse, and validate a TOML config file.
pub fn load(path: &str) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config: {path}"))?;
    let config = parse(&contents).with_context(|| format!("in config file: {path}"))?;
    config
        .validate()
        .with_context(|| format!("invalid config: {path}"))?;
    Ok(config)
}

/// Resolve the config from the environment.  An explicit `CONFIG_PATH` must
/// exist; the default path is optional and built-in defaults apply without
/// it.  Environment overrides are applied last and re-validated.
pub fn from_env() -> Result<Config> {
    resolve(|key| std::env::var(key).ok())
}

fn resolve(get: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let mut config = match get("CONFIG_PATH") {
        Some(path) => load(&path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => load(DEFAULT_CONFIG_PATH)?,
        None => Config::default(),
    };
    config.apply_env(get)?;
    config.validate().context("invalid config after environment overrides")?;

    tracing::info!(
        pins = ?config.pins,
        relay_active_low = config.actuator.relay_active_low,
        indicator_active_low = config.actuator.indicator_active_low,
        seed = ?config.simulation.seed,
        "config loaded"
    );

    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Assert validation fails and the error message contains `needle`.
    fn assert_validation_err(cfg: &Config, needle: &str) {
        let err = cfg.validate().unwrap_err();
        let msg = format!("{err:#}");
        assert!(
            msg.contains(needle),
            "expected error containing {needle:?}, got: {msg}"
        );
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    // -- Parsing ----------------------------------------------------------

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[pins]
phosphorus_button = 5
potassium_button = 6
humidity_sensor = 4
relay = 17
indicator = 22

[actuator]
relay_active_low = true
self_test_secs = 1

[simulation]
seed = 1234
"#;
        let config = parse(toml_str).unwrap();
        assert_eq!(config.pins.phosphorus_button, 5);
        assert_eq!(config.pins.relay, 17);
        assert!(config.actuator.relay_active_low);
        assert!(!config.actuator.indicator_active_low);
        assert_eq!(config.actuator.self_test_secs, 1);
        assert_eq!(config.simulation.seed, Some(1234));
        config.validate().unwrap();
    }

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.pins.phosphorus_button, 12);
        assert_eq!(config.pins.potassium_button, 14);
        assert_eq!(config.pins.humidity_sensor, 15);
        assert_eq!(config.pins.relay, 27);
        assert_eq!(config.pins.indicator, 2);
        assert_eq!(config.actuator.self_test_secs, 3);
        assert_eq!(config.simulation.seed, None);
    }

    #[test]
    fn parse_partial_section_keeps_other_defaults() {
        let config = parse("[pins]\nrelay = 21\n").unwrap();
        assert_eq!(config.pins.relay, 21);
        assert_eq!(config.pins.indicator, 2);
    }

    #[test]
    fn thresholds_are_not_configurable() {
        let err = parse("[thresholds]\nmoisture_min = 40.0\n").unwrap_err();
        assert!(format!("{err:#}").contains("unknown field"), "{err:#}");
    }

    // -- Validation -------------------------------------------------------

    #[test]
    fn default_config_passes() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn gpio_pin_0_rejected() {
        let mut cfg = Config::default();
        cfg.pins.relay = 0;
        assert_validation_err(&cfg, "pins.relay: 0 is not a valid BCM GPIO pin");
    }

    #[test]
    fn gpio_pin_28_rejected() {
        let mut cfg = Config::default();
        cfg.pins.humidity_sensor = 28;
        assert_validation_err(&cfg, "pins.humidity_sensor: 28 is not a valid");
    }

    #[test]
    fn gpio_boundaries_accepted() {
        let mut cfg = Config::default();
        cfg.pins.indicator = 2;
        cfg.pins.relay = 27;
        cfg.validate().unwrap();
    }

    #[test]
    fn duplicate_pin_rejected() {
        let mut cfg = Config::default();
        cfg.pins.indicator = cfg.pins.relay;
        assert_validation_err(&cfg, "pins.indicator: gpio 27 is already used by relay");
    }

    #[test]
    fn self_test_too_long_rejected() {
        let mut cfg = Config::default();
        cfg.actuator.self_test_secs = 61;
        assert_validation_err(&cfg, "self_test_secs 61 exceeds maximum");
    }

    #[test]
    fn multiple_errors_collected() {
        let mut cfg = Config::default();
        cfg.pins.phosphorus_button = -1;
        cfg.pins.potassium_button = 40;
        cfg.actuator.self_test_secs = 600;
        let err = cfg.validate().unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("3 errors"), "{msg}");
        assert!(msg.contains("pins.phosphorus_button"), "{msg}");
        assert!(msg.contains("pins.potassium_button"), "{msg}");
        assert!(msg.contains("self_test_secs"), "{msg}");
    }

    // -- Environment ------------------------------------------------------

    #[test]
    fn env_overrides_polarity_and_seed() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[("RELAY_ACTIVE_LOW", "TRUE"), ("SIM_SEED", " 99 ")]))
            .unwrap();
        assert!(cfg.actuator.relay_active_low);
        assert_eq!(cfg.simulation.seed, Some(99));
    }

    #[test]
    fn env_relay_active_low_false() {
        let mut cfg = Config::default();
        cfg.actuator.relay_active_low = true;
        cfg.apply_env(env(&[("RELAY_ACTIVE_LOW", "0")])).unwrap();
        assert!(!cfg.actuator.relay_active_low);
    }

    #[test]
    fn env_bad_seed_rejected() {
        let mut cfg = Config::default();
        let err = cfg.apply_env(env(&[("SIM_SEED", "abc")])).unwrap_err();
        assert!(format!("{err:#}").contains("invalid SIM_SEED"));
    }

    #[test]
    fn explicit_missing_config_path_is_error() {
        let err = resolve(env(&[("CONFIG_PATH", "/nonexistent/controller.toml")])).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config"));
    }
}
