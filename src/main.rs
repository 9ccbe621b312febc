// SkyTrack — aiming a telescope at aircraft and celestial targets
// Copyright (C) 2025 SkyTrack developers
//
// This file is part of SkyTrack
//
// SkyTrack is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3
// as published by the Free Software Foundation.
//
// SkyTrack is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with SkyTrack.  If not, see <http://www.gnu.org/licenses/>.
//

use skytrack::aircraft::{sbs1::Sbs1Source, AircraftManager};
use skytrack::celestial::AlpacaServer;
use skytrack::config::Configuration;
use skytrack::data::{Tick, TickTimer};
use skytrack::mount::{ScopeDriver, SimScope, WebScope};
use skytrack::mount_model::MountModel;
use skytrack::trackable::{Trackable, TrackableAircraft, TrackableCelestial, TrackableSatellite};
use skytrack::tracker::ObjectTracker;
use skytrack::transformer::LocalCoordinateTransformer;
use std::cell::RefCell;
use std::rc::Rc;
use std::task::Poll;

const TRACKING_INTERVAL: std::time::Duration = std::time::Duration::from_millis(200);
const STATUS_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);

const DEFAULT_FEED_ADDRESS: &str = "127.0.0.1:30003";
const DEFAULT_SCOPE_ENDPOINT: &str = "http://127.0.0.1:5000/api/v1/telescope/0";
const ALPACA_BIND: &str = "0.0.0.0:5001";

struct Options {
    feed_address: String,
    scope_endpoint: Option<String>,
    icao_address: Option<String>,
    satellite_uri: Option<String>,
}

fn parse_args() -> Options {
    let mut options = Options {
        feed_address: DEFAULT_FEED_ADDRESS.to_string(),
        scope_endpoint: Some(DEFAULT_SCOPE_ENDPOINT.to_string()),
        icao_address: None,
        satellite_uri: None,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--feed" => options.feed_address = args.next().unwrap_or_else(|| usage()),
            "--scope" => options.scope_endpoint = Some(args.next().unwrap_or_else(|| usage())),
            "--sim-scope" => options.scope_endpoint = None,
            "--icao" => options.icao_address = Some(args.next().unwrap_or_else(|| usage())),
            "--satellite" => options.satellite_uri = Some(args.next().unwrap_or_else(|| usage())),
            _ => usage(),
        }
    }

    options
}

fn usage() -> ! {
    eprintln!(
        "usage: skytrack [--feed ADDR] [--scope URL | --sim-scope] [--icao HEX | --satellite URI]"
    );
    std::process::exit(2);
}

fn init_logging() {
    let loggers: Vec<Box<dyn simplelog::SharedLogger>> = match std::fs::File::create("skytrack.log") {
        Ok(file) => vec![
            simplelog::TermLogger::new(
                log::LevelFilter::Info,
                simplelog::Config::default(),
                simplelog::TerminalMode::Mixed,
                simplelog::ColorChoice::Auto,
            ),
            simplelog::WriteLogger::new(log::LevelFilter::Debug, simplelog::Config::default(), file),
        ],
        Err(_) => vec![simplelog::TermLogger::new(
            log::LevelFilter::Info,
            simplelog::Config::default(),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )],
    };
    if simplelog::CombinedLogger::init(loggers).is_err() {
        eprintln!("failed to initialize logging");
    }
}

struct ProgramState {
    timers: Vec<TickTimer>,
    tracker: Rc<RefCell<ObjectTracker>>,
    manager: AircraftManager,
}

fn on_timer(state: &mut ProgramState, idx_tick: (usize, Tick)) -> Poll<()> {
    match idx_tick.1 {
        Tick::Tracking => {
            if let Err(e) = state.tracker.borrow_mut().run() {
                log::error!("tracking error: {}", e);
            }
        }
        Tick::Status => {
            let (alt, az) = state.tracker.borrow().get_last_motor_angle();
            log::info!(
                "{} aircraft known; last motor command alt {:.2}°, az {:.2}°",
                state.manager.get_plane_list().len(),
                alt,
                az
            );
        }
    }

    Poll::Pending
}

async fn event_loop(mut state: ProgramState) {
    pasts::Loop::new(&mut state)
        .on(|s| &mut s.timers[..], on_timer)
        .await;
}

fn main() {
    init_logging();
    log::info!("SkyTrack {}", env!("CARGO_PKG_VERSION"));

    let options = parse_args();
    let config = Configuration::load();
    let [lat, lon, height] = config.location;

    let alpaca_server = AlpacaServer::start(
        ALPACA_BIND.parse().expect("invalid Alpaca bind address"),
    );

    let manager = AircraftManager::start(Sbs1Source::new(&options.feed_address));

    let scope_driver: Box<dyn ScopeDriver> = match &options.scope_endpoint {
        Some(endpoint) => match WebScope::new(endpoint, false) {
            Ok(scope) => Box::new(scope),
            Err(e) => {
                log::error!("cannot set up the mount driver: {}", e);
                std::process::exit(1);
            }
        },
        None => Box::new(SimScope::new()),
    };
    log::info!("mount: {}", scope_driver.get_info());

    let mut mount_model = MountModel::default();
    if let Some(dir) = dirs::config_dir() {
        let model_path = dir.join("skytrack_model.json");
        if model_path.exists() {
            if let Err(e) = mount_model.load_from_file(&model_path) {
                log::warn!("could not read {}: {}", model_path.display(), e);
            }
        }
    }

    let tracker = Rc::new(RefCell::new(ObjectTracker::new(
        LocalCoordinateTransformer::new(lat, lon, height),
        scope_driver,
        mount_model,
    )));

    let trackable: Box<dyn Trackable> = if let Some(icao) = &options.icao_address {
        match icao.parse() {
            Ok(address) => Box::new(TrackableAircraft::new(manager.clone(), address)),
            Err(e) => {
                log::error!("invalid ICAO address {}: {}", icao, e);
                std::process::exit(1);
            }
        }
    } else if let Some(uri) = &options.satellite_uri {
        Box::new(TrackableSatellite::new(uri))
    } else {
        Box::new(TrackableCelestial::new(alpaca_server.clone()))
    };
    tracker.borrow_mut().set_tracked_object(Some(trackable));

    let state = ProgramState {
        timers: vec![
            TickTimer::new(Tick::Tracking, TRACKING_INTERVAL),
            TickTimer::new(Tick::Status, STATUS_INTERVAL),
        ],
        tracker,
        manager,
    };

    pasts::Executor::default().block_on(event_loop(state));
}
