//! # SBUS Bridge
//!
//! Decode the Futaba S.bus RC receiver protocol and republish channel data.
//!
//! This application opens the receiver's serial port, recovers S.bus frames
//! from the byte stream, and publishes decoded channel reports while logging
//! link statistics.

use anyhow::Result;
use std::path::Path;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use tracing_subscriber;

use sbus_bridge::clock::StdClock;
use sbus_bridge::config::Config;
use sbus_bridge::sbus::receiver::SbusReceiver;
use sbus_bridge::serial::SbusSerial;
use sbus_bridge::telemetry::{LinkStats, LinkStatsLogger};

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for SBUS Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (optional file, first CLI argument)
///    - Open the serial port, falling back to auto-detection
///
/// 2. **Main Loop**
///    - Poll the S.bus stream at the configured cadence
///    - Log link acquired/lost transitions
///    - Append link statistics records at the telemetry interval
///    - Handle Ctrl+C for graceful shutdown
///
/// A spawned consumer task subscribes to the channel reports and logs them
/// at debug level; rendering channel data to actuators is out of scope.
///
/// # Errors
///
/// Returns error if:
/// - The configuration file exists but is invalid
/// - No serial port can be opened
/// - The telemetry log file cannot be created
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("SBUS Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = if Path::new(&config_path).exists() {
        Config::load(&config_path)?
    } else {
        info!("No config file at {}, using defaults", config_path);
        Config::default()
    };

    // Prefer the configured port, fall back to auto-detection
    let serial = match SbusSerial::open_with_paths(&[config.serial.port.as_str()]) {
        Ok(serial) => serial,
        Err(e) => {
            warn!("{}; trying default device paths", e);
            SbusSerial::open()?
        }
    };
    info!("S.bus port opened at: {}", serial.device_path());

    let mut receiver = SbusReceiver::new(
        serial.into_source(),
        StdClock::new(),
        config.link.max_channels,
    );

    // Consumer side: log each fresh report as it is published
    let mut reports = receiver.subscribe();
    tokio::spawn(async move {
        while reports.changed().await.is_ok() {
            let report = *reports.borrow_and_update();
            if report.failsafe {
                warn!("Failsafe active, publishing zero channels");
            } else {
                debug!(
                    count = report.channel_count,
                    ch1 = report.channels[0],
                    ch2 = report.channels[1],
                    ch3 = report.channels[2],
                    ch4 = report.channels[3],
                    "channels updated"
                );
            }
        }
    });

    let mut stats_logger = if config.telemetry.enabled {
        let logger = LinkStatsLogger::create(&config.telemetry.log_dir)?;
        info!("Logging link statistics to {}", logger.path().display());
        Some(logger)
    } else {
        None
    };

    let mut poll_interval = interval(Duration::from_micros(config.serial.poll_interval_us));
    let mut stats_interval = interval(Duration::from_millis(config.telemetry.log_interval_ms));
    let mut link_up = false;

    info!(
        "Polling S.bus stream every {}us ({} channel capacity)",
        config.serial.poll_interval_us, config.link.max_channels
    );
    info!("Press Ctrl+C to exit");

    // Main poll loop
    loop {
        tokio::select! {
            _ = poll_interval.tick() => {
                let now_up = receiver.poll().await;

                if now_up != link_up {
                    if now_up {
                        info!("RC link acquired");
                    } else {
                        warn!("RC link lost");
                    }
                    link_up = now_up;
                }
            }

            _ = stats_interval.tick() => {
                if let Some(logger) = stats_logger.as_mut() {
                    let stats = LinkStats::capture(
                        receiver.frames_decoded(),
                        receiver.frame_drops(),
                        link_up,
                    );

                    if let Err(e) = logger.log(&stats) {
                        debug!("Failed to write link stats: {}", e);
                    }
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!(
                    "Frames decoded: {}, frames dropped: {}",
                    receiver.frames_decoded(),
                    receiver.frame_drops()
                );
                break;
            }
        }
    }

    Ok(())
}
