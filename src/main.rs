/*
 *  main.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	TODO:
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use env_logger::Env;
use log::{error, info};
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use smeters::config::{self, Overrides};
use smeters::host::HostEvent;
use smeters::placement::MeterLocation;
use smeters::simhost::SimHost;
use smeters::updates;
use smeters::widget::{SMeter, WidgetOptions};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal, then
/// returns so the main loop can shut down gracefully.
#[cfg(unix)]
async fn signal_handler() -> Result<()> {
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
async fn signal_handler() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Initiating graceful shutdown.");
    Ok(())
}

/// Scripted dashboard activity so the widget has something to meter:
/// a deterministic signal sweep plus periodic graph-panel toggles.
async fn drive_simulated_host(host: SimHost, events: mpsc::Sender<HostEvent>) {
    host.set_unit("dbm");
    host.set_frequency("98.1");

    let mut tick: u64 = 0;
    let mut peak_db: f32 = -120.0;
    let mut graph_shown = false;

    loop {
        // Triangle sweep between -120 and -40 dBm, 0.5 dB per step
        let phase = (tick % 320) as f32;
        let db = if phase < 160.0 { -120.0 + phase * 0.5 } else { -40.0 - (phase - 160.0) * 0.5 };
        peak_db = peak_db.max(db);

        let whole = db.trunc();
        let fraction = (db - whole).abs();
        host.set_signal(
            &format!("{whole:.0}"),
            &format!("{fraction:.2}"),
            &format!("{peak_db:.1}"),
        );

        // Flip the graph panel every five seconds to exercise placement
        if tick % 50 == 0 && tick > 0 {
            graph_shown = !graph_shown;
            host.set_graph_panel(if graph_shown { 1.0 } else { 0.0 }, graph_shown);
            if events
                .send(HostEvent::Mutation(host.observation()))
                .await
                .is_err()
            {
                return;
            }
        }

        tick += 1;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let matches = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(Arg::new("debug")
        .action(ArgAction::SetTrue)
        .long("debug")
        .short('v')
        .alias("verbose")
        .help("Enable debug log level")
        .required(false))
        .arg(Arg::new("config")
        .short('c')
        .long("config")
        .value_parser(clap::value_parser!(PathBuf))
        .help("widget config file")
        .required(false))
        .arg(Arg::new("location")
        .short('L')
        .long("location")
        .help("Meter placement mode")
        .value_parser(
            ["auto",
            "signal",
            "sdr-graph",
            "sdr-graph-only",
            "peakmeter",
            "auto-rotator"]
            )
        .required(false))
        .arg(Arg::new("noise-floor")
        .short('n')
        .long("noise-floor")
        .value_parser(clap::value_parser!(f32))
        .help("Calibrated no-antenna dBm reading (0 disables interpolation)")
        .required(false))
        .arg(Arg::new("am-offset")
        .long("am-offset")
        .help("Apply the below-27 MHz AM correction")
        .action(ArgAction::SetTrue)
        .required(false))
        .arg(Arg::new("no-squelch")
        .long("no-squelch")
        .help("Disable the squelch marker entirely")
        .action(ArgAction::SetTrue)
        .required(false))
        .arg(Arg::new("no-theme")
        .long("no-theme")
        .help("Use the fixed palette instead of host theme colors")
        .action(ArgAction::SetTrue)
        .required(false))
        .arg(Arg::new("inside")
        .long("inside")
        .help("Keep the meter inside the signal panel's field")
        .action(ArgAction::SetTrue)
        .required(false))
        .arg(Arg::new("check-updates")
        .short('u')
        .long("check-updates")
        .help("Check the published source for a newer version at startup")
        .action(ArgAction::SetTrue)
        .required(false))
        .after_help("SMeterS:\
            \nS-meter widget\
            \n\n\tDraws the dBm scale, peak, and needle\
            \n\tSquelch marker, adaptive placement\
            \n\n\
            CONTROLS:\
            \n\tdrag/wheel the marker, double-click 'S' to hide.")
        .get_matches();

    let debug_enabled = matches.get_flag("debug");

    // Initialize the logger with the appropriate level based on debug flag
    env_logger::Builder::from_env(Env::default().default_filter_or(if debug_enabled {"debug"}else{"info"}))
        .format_timestamp_secs()
        .init();

    info!("{} - every dB counts", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let overrides = Overrides {
        log_level: None,
        outside_field: matches.get_flag("inside").then_some(false),
        enable_squelch: matches.get_flag("no-squelch").then_some(false),
        use_theme_colors: matches.get_flag("no-theme").then_some(false),
        noise_floor_dbm: matches.get_one::<f32>("noise-floor").copied(),
        am_offset: matches.get_flag("am-offset").then_some(true),
        location: matches
            .get_one::<String>("location")
            .and_then(|l| parse_location(l)),
        check_updates: matches.get_flag("check-updates").then_some(true),
    };

    let cfg = config::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path), &overrides)?;

    // Preference persistence mirrors a real host's store surviving reloads
    let pref_file = dirs_next::config_dir().map(|d| d.join("smeters/prefs.json"));
    let host = match pref_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            SimHost::new().with_pref_file(path)
        }
        None => SimHost::new(),
    };

    if cfg.check_updates() {
        if let Some(url) = cfg.update_url().map(str::to_string) {
            let mut check_host = host.clone();
            tokio::spawn(async move {
                updates::check_for_update(&url, &mut check_host).await;
            });
        } else {
            error!("update check enabled but no updates.url configured");
        }
    }

    let (event_tx, event_rx) = mpsc::channel::<HostEvent>(64);

    let driver_host = host.clone();
    let driver = tokio::spawn(drive_simulated_host(driver_host, event_tx));

    let widget = SMeter::new(WidgetOptions::from(&cfg), host);

    tokio::select! {
        _ = signal_handler() => {
            // Fall through to shutdown; the widget loop ends with the task.
        }
        _ = widget.run(event_rx) => {
            info!("Closed widget loop.");
        }
    }

    info!("Main application exiting.");
    driver.abort();

    Ok(())
}

fn parse_location(value: &str) -> Option<MeterLocation> {
    match value {
        "auto" => Some(MeterLocation::Auto),
        "signal" => Some(MeterLocation::Signal),
        "sdr-graph" => Some(MeterLocation::SdrGraph),
        "sdr-graph-only" => Some(MeterLocation::SdrGraphOnly),
        "peakmeter" => Some(MeterLocation::Peakmeter),
        "auto-rotator" => Some(MeterLocation::AutoRotator),
        _ => None,
    }
}
