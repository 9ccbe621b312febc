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

use crate::aircraft::AircraftManager;
use crate::celestial::{AlpacaServer, CelestialCoordinateTransformer};
use crate::data::{IcaoAddress, Position};
use std::cell::RefCell;
use std::time::Duration;

/// Far enough that the observer's own ECEF offset no longer moves the
/// apparent direction.
const CELESTIAL_HEIGHT_M: f64 = 1.0e11;

/// Anything the tracker can follow: a position source with a name.
pub trait Trackable {
    /// Current target position, or `None` when the source has nothing yet.
    fn get_position(&self) -> Option<Position>;

    fn get_name(&self) -> String {
        "No Name".to_string()
    }

    fn is_tracking(&self) -> bool;
}

/// An aircraft followed through the manager's table by its ICAO address.
pub struct TrackableAircraft {
    manager: AircraftManager,
    icao_address: IcaoAddress,
}

impl TrackableAircraft {
    pub fn new(manager: AircraftManager, icao_address: IcaoAddress) -> TrackableAircraft {
        TrackableAircraft { manager, icao_address }
    }
}

impl Trackable for TrackableAircraft {
    fn get_position(&self) -> Option<Position> {
        let plane = self.manager.get_plane(self.icao_address)?;
        plane.last_pos_update?;
        let (lat, lon, height) = plane.get_metric_pos()?;
        Some(Position::LatLong { lat, lon, height })
    }

    fn get_name(&self) -> String {
        self.icao_address.to_string()
    }

    fn is_tracking(&self) -> bool {
        self.manager.get_plane(self.icao_address).is_some()
    }
}

/// A celestial object commanded through the local Alpaca surface; the
/// apparent RA/Dec is mapped to its sub-point so the downstream local
/// transformer applies unchanged.
pub struct TrackableCelestial {
    server: AlpacaServer,
    transformer: CelestialCoordinateTransformer,
}

impl TrackableCelestial {
    pub fn new(server: AlpacaServer) -> TrackableCelestial {
        TrackableCelestial {
            server,
            transformer: CelestialCoordinateTransformer::new(0.0, 0.0),
        }
    }
}

impl Trackable for TrackableCelestial {
    fn get_position(&self) -> Option<Position> {
        let (ra, dec) = self.server.get_ra_dec();
        let (lat, lon) = self.transformer.apparent_to_latlong(ra, dec, None);
        Some(Position::LatLong { lat, lon, height: CELESTIAL_HEIGHT_M })
    }

    fn get_name(&self) -> String {
        "Celestial".to_string()
    }

    fn is_tracking(&self) -> bool {
        true
    }
}

/// A satellite whose alt/az an external prediction bridge reports as JSON
/// (`{"SN": name, "EL": degrees, "AZ": degrees}`); the solver is bypassed
/// for these.
pub struct TrackableSatellite {
    uri: String,
    name: RefCell<String>,
    client: reqwest::blocking::Client,
}

impl TrackableSatellite {
    pub fn new(uri: &str) -> TrackableSatellite {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        TrackableSatellite {
            uri: uri.to_string(),
            name: RefCell::new("Unknown".to_string()),
            client,
        }
    }
}

impl Trackable for TrackableSatellite {
    fn get_position(&self) -> Option<Position> {
        let data: serde_json::Value = match self.client.get(self.uri.as_str()).send().and_then(|r| r.error_for_status()) {
            Ok(response) => match response.json() {
                Ok(json) => json,
                Err(e) => {
                    log::warn!("satellite bridge returned invalid JSON: {}", e);
                    return None;
                }
            },
            Err(e) => {
                log::warn!("satellite bridge request failed: {}", e);
                return None;
            }
        };

        if let Some(name) = data.get("SN").and_then(|v| v.as_str()) {
            *self.name.borrow_mut() = name.to_string();
        }

        let parse = |key: &str| {
            let value = data.get(key)?;
            value.as_f64().or_else(|| value.as_str()?.parse().ok())
        };
        let alt = parse("EL")?;
        let az = parse("AZ")?;
        Some(Position::AltAz { alt, az })
    }

    fn get_name(&self) -> String {
        self.name.borrow().clone()
    }

    fn is_tracking(&self) -> bool {
        true
    }
}
