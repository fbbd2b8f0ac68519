//! Soil monitoring and irrigation controller.
//!
//! Samples two nutrient presence buttons, a synthetic pH signal and a
//! humidity reading, and switches a pump relay plus indicator LED from fixed
//! agronomic thresholds.  Each sampling cycle is written to stdout as one CSV
//! line.

pub mod config;
pub mod debounce;
pub mod decision;
pub mod dht;
pub mod humidity;
pub mod hw;
pub mod ph;
pub mod report;
pub mod scheduler;
pub mod state;
