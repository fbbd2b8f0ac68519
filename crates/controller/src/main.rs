use anyhow::{Context, Result};
use std::{io, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

use irrigation_controller::hw::{self, Clock, MonotonicClock};
use irrigation_controller::ph::{PH_IDEAL_MAX, PH_IDEAL_MIN};
use irrigation_controller::report::{CsvReporter, Reporter};
use irrigation_controller::scheduler::{self, Controller};
use irrigation_controller::{config, decision};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Counts from process start, like a board's millis().
    let clock = MonotonicClock::new();

    // stdout carries the CSV stream; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    info!("soil irrigation controller starting");

    // ── Config ──────────────────────────────────────────────────────
    let cfg = config::from_env()?;

    // ── Board ───────────────────────────────────────────────────────
    let mut board = hw::init(&cfg).context("failed to initialise board")?;
    hw::self_test(
        &mut board.pump,
        Duration::from_secs(cfg.actuator.self_test_secs),
    )
    .await;

    // ── Report stream ───────────────────────────────────────────────
    let mut reporter = CsvReporter::new(io::stdout());
    reporter.header()?;

    info!("pH simulation started, values will vary between 3.5 and 10.5");
    info!(
        ph_min = PH_IDEAL_MIN,
        ph_max = PH_IDEAL_MAX,
        moisture_min = decision::MOISTURE_MIN,
        moisture_max = decision::MOISTURE_MAX,
        "irrigation thresholds"
    );

    let rng = match cfg.simulation.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };

    let mut controller = Controller::new(
        board.buttons,
        board.humidity,
        board.pump,
        reporter,
        clock.now(),
        rng,
    );

    scheduler::run(&mut controller, &clock).await;
    Ok(())
}
