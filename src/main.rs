/*
 *  main.rs
 *
 *  LcdMonS - host status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use anyhow::Context;
use env_logger::Env;
use log::{error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use lcdmons::config;
use lcdmons::dashboard::DashboardScheduler;
use lcdmons::display::{CharacterDisplay, Hd44780, I2cBus, LinuxLcd};
use lcdmons::glyphs::GlyphTable;
use lcdmons::metrics::SystemMetrics;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

#[cfg(unix)]
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Initiating graceful shutdown.");
    Ok(())
}

fn open_display(cfg: &config::Config) -> anyhow::Result<LinuxLcd> {
    let bus_path = cfg.i2c_bus();
    let bus = I2cBus::open(&bus_path).with_context(|| format!("opening {}", bus_path))?;
    let mut lcd = Hd44780::new(bus, linux_embedded_hal::Delay, cfg.address()).with_backlight(cfg.backlight());

    lcd.init()
        .with_context(|| format!("initializing LCD at 0x{:02X}", cfg.address()))?;
    GlyphTable::load(&mut lcd).context("loading custom glyphs")?;
    Ok(lcd)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (cfg, cli) = config::load()?;

    if cli.dump_config {
        print!("{}", config::to_yaml(&cfg)?);
        return Ok(());
    }

    let level = if cli.debug {
        "debug".to_string()
    } else {
        cfg.log_level.clone().unwrap_or_else(|| "info".to_string())
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} - host status at a glance", env!("CARGO_PKG_NAME"));
    info!("v.{} built {} ({})", env!("CARGO_PKG_VERSION"), BUILD_DATE, BUILD_PROFILE);

    let mut lcd = match open_display(&cfg) {
        Ok(lcd) => lcd,
        Err(e) => {
            error!("Display unavailable: {:#}", e);
            return Err(e);
        }
    };
    info!("LCD ready on {} at 0x{:02X}", cfg.i2c_bus(), lcd.address());

    let mut metrics = SystemMetrics::new(&cfg.telemetry());
    let mut dashboard = DashboardScheduler::new();

    info!("Dashboard started");
    let shutdown = async {
        if let Err(e) = signal_handler().await {
            warn!("Signal handling unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };
    dashboard
        .run(&mut lcd, &mut metrics, cfg.update_interval(), shutdown)
        .await;

    // leave a dark, blank panel behind
    if let Err(e) = lcd.clear().and_then(|_| lcd.set_backlight(false)) {
        warn!("Unable to blank display on exit: {}", e);
    }
    info!("Shutdown complete");
    Ok(())
}
