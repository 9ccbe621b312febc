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

use nalgebra::Vector3;
use rand::prelude::*;
use skytrack::aircraft::{sbs1::Sbs1Source, AircraftManager};
use skytrack::celestial::AlpacaServer;
use skytrack::data::Position;
use skytrack::mount::SimScope;
use skytrack::mount_model::MountModel;
use skytrack::solver::{CalibrationSolver, PointingSolver};
use skytrack::trackable::{Trackable, TrackableAircraft, TrackableCelestial};
use skytrack::tracker::ObjectTracker;
use skytrack::transformer::LocalCoordinateTransformer;
use std::io::Write;
use std::time::Duration;

/// Serves a canned SBS-1 transcript on a local socket and keeps the
/// connection open.
fn spawn_feed(lines: &'static [&'static str]) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            for line in lines {
                let _ = writeln!(stream, "{}", line);
            }
            let _ = stream.flush();
            std::thread::sleep(Duration::from_secs(5));
        }
    });
    address
}

#[test]
fn aircraft_feed_to_motor_command() {
    const FEED: &[&str] = &[
        "MSG,3,1,1,ABCDEF,1,2024/01/01,00:00:00.000,2024/01/01,00:00:00.000,,10000,,,51.5,0.0,,,,,0",
        "MSG,4,1,1,ABCDEF,1,2024/01/01,00:00:01.000,2024/01/01,00:00:01.000,,,0,0,,,0,,,,0",
        "not an sbs line",
        "MSG,1,1,1,ABCDEF,1,2024/01/01,00:00:02.000,2024/01/01,00:00:02.000,BAW123,,,,,,,,,,0",
    ];
    let address = spawn_feed(FEED);

    let manager = AircraftManager::start(Sbs1Source::new(&address));
    std::thread::sleep(Duration::from_millis(400));

    let icao = "ABCDEF".parse().unwrap();
    let plane = manager.get_plane(icao).expect("aircraft not ingested");
    assert_eq!(plane.callsign.as_deref(), Some("BAW123"));
    assert!(plane.can_calc_update());

    // observer half a degree south of the aircraft
    let mut tracker = ObjectTracker::new(
        LocalCoordinateTransformer::new(51.0, 0.0, 0.0),
        Box::new(SimScope::new()),
        MountModel::default(),
    );
    tracker.set_tracked_object(Some(Box::new(TrackableAircraft::new(manager.clone(), icao))));
    assert!(tracker.is_tracking());
    tracker.run().unwrap();

    let (alt, az) = tracker.get_last_motor_angle();
    // ~55 km north at ~3 km altitude: a low-elevation due-north pointing
    assert!(alt > 1.0 && alt < 5.0, "alt {alt}");
    assert!(az < 1.0 || az > 359.0, "az {az}");

    manager.stop();
}

#[test]
fn calibration_recovers_a_misaligned_mount() {
    let mut rng = StdRng::seed_from_u64(20240101);
    let truth = MountModel {
        az_rot_x: 3.2,
        az_rot_y: -4.1,
        az_rot_z: rng.gen_range(-180.0..180.0),
        dec_roll: 2.4,
        dec_offset: rng.gen_range(-180.0..180.0),
        scope_yaw: -3.7,
    };
    let truth_solver = PointingSolver::new(truth.clone());

    let random_point = |rng: &mut StdRng| {
        let alt = rng.gen_range(2.0..85.0f64).to_radians();
        let az = rng.gen_range(-180.0..180.0f64).to_radians();
        let range = rng.gen_range(0.4..1000.0);
        Vector3::new(
            az.cos() * alt.cos() * range,
            az.sin() * alt.cos() * range,
            alt.sin() * range,
        )
    };

    let mut positions = Vec::new();
    let mut rotations = Vec::new();
    while positions.len() < 20 {
        let pos = random_point(&mut rng);
        let solution = truth_solver.solve(&pos);
        if solution.objective < 1.0e-9 {
            positions.push(pos);
            rotations.push([solution.alt, solution.az]);
        }
    }

    let fit = CalibrationSolver::new()
        .solve(&MountModel::default(), &positions, &rotations, true)
        .unwrap();
    assert!(fit.converged);

    let mut fitted = MountModel::default();
    fitted.unpack_parameters(&fit.params);
    let fitted_solver = PointingSolver::new(fitted);

    let mut total_error = 0.0;
    for _ in 0..100 {
        let pos = random_point(&mut rng);
        let reference = truth_solver.solve(&pos);
        total_error += fitted_solver.scope_error([reference.alt, reference.az], &pos);
    }
    let mean_error = total_error / 100.0;
    assert!(mean_error < 0.01, "mean scope error {mean_error:.4}°");
}

#[test]
fn alpaca_surface_feeds_the_celestial_trackable() {
    let bind: std::net::SocketAddr = "127.0.0.1:58231".parse().unwrap();
    let server = AlpacaServer::start(bind);
    std::thread::sleep(Duration::from_millis(300));

    let client = reqwest::blocking::Client::new();
    let base = format!("http://{}/api/v1/telescope/0", bind);

    let response: serde_json::Value = client
        .put(format!("{}/slewtocoordinatesasync", base))
        .form(&[
            ("RightAscension", "5.0"),
            ("Declination", "20.0"),
            ("ClientTransactionID", "17"),
        ])
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(response["ClientTransactionID"], 17);
    assert_eq!(response["ErrorNumber"], 0);
    assert!(response["ServerTransactionID"].is_number());

    let ra: serde_json::Value = client
        .get(format!("{}/rightascension", base))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(ra["Value"], 5.0);
    let dec: serde_json::Value = client
        .get(format!("{}/declination", base))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(dec["Value"], 20.0);

    // hours on the wire, degrees inside
    let (ra_deg, dec_deg) = server.get_ra_dec();
    assert!((ra_deg - 75.0).abs() < 1.0e-9);
    assert!((dec_deg - 20.0).abs() < 1.0e-9);

    // the commanded coordinates drive the tracker through the sub-point
    let mut tracker = ObjectTracker::new(
        LocalCoordinateTransformer::new(51.0, 0.0, 0.0),
        Box::new(SimScope::new()),
        MountModel::default(),
    );
    let trackable = TrackableCelestial::new(server.clone());
    let position = trackable.get_position().unwrap();
    match position {
        Position::LatLong { lat, height, .. } => {
            assert!((lat - 20.0).abs() < 1.0e-9);
            assert!(height >= 1.0e10);
        }
        other => panic!("unexpected position {other:?}"),
    }
    tracker.set_tracked_object(Some(Box::new(trackable)));
    tracker.run().unwrap();
    let (alt, az) = tracker.get_last_motor_angle();
    assert!((-90.0..=90.0).contains(&alt));
    assert!((0.0..360.0).contains(&az));
}
