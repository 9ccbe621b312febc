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

mod manager;
pub mod sbs1;

pub use manager::{AircraftManager, AircraftSource, ClearRequest};

use crate::data::{avg_angle, IcaoAddress};

const FT_TO_M: f64 = 0.3048;
const ARCMIN: f64 = 1.0 / 60.0;

/// Dead-reckoned aircraft state assembled from transponder reports.
///
/// Wire units are kept: altitude in feet, ground speed in knots, vertical
/// speed in ft/min, headings in degrees. Times are UTC epoch seconds.
#[derive(Clone, Debug)]
pub struct Aircraft {
    pub icao_address: IcaoAddress,
    pub callsign: Option<String>,
    /// Latest (possibly dead-reckoned) latitude/longitude, degrees.
    pub position: Option<(f64, f64)>,
    /// Barometric altitude, feet.
    pub altitude: Option<f64>,
    /// Knots.
    pub ground_speed: Option<f64>,
    /// Degrees clockwise from north.
    pub ground_heading: Option<f64>,
    /// Feet per minute.
    pub vertical_speed: Option<f64>,
    /// Time of the last fresh position report.
    pub last_pos_update: Option<f64>,
    /// Time the state vector was last propagated.
    pub last_vector_update: Option<f64>,
}

impl Aircraft {
    pub fn new(icao_address: IcaoAddress) -> Aircraft {
        Aircraft {
            icao_address,
            callsign: None,
            position: None,
            altitude: None,
            ground_speed: None,
            ground_heading: None,
            vertical_speed: None,
            last_pos_update: None,
            last_vector_update: None,
        }
    }

    /// True when the state vector is complete enough for motion propagation.
    pub fn can_calc_update(&self) -> bool {
        self.last_pos_update.is_some()
            && self.ground_speed.is_some()
            && self.ground_heading.is_some()
            && self.altitude.is_some()
            && self.vertical_speed.is_some()
    }

    /// Folds a new report into this aircraft.
    ///
    /// When the report carries no fresher position, the existing state is
    /// propagated to `now` with speed and heading averaged between old and
    /// new (circular average for the heading). Otherwise the report's
    /// position, altitude and timestamps are adopted. The report's velocity
    /// vector and callsign are adopted afterwards either way.
    pub fn merge(&mut self, other: &Aircraft, now: f64) {
        let report_is_stale = match (self.last_pos_update, other.last_pos_update) {
            (Some(ours), Some(theirs)) => ours >= theirs,
            (Some(_), None) => true,
            _ => false,
        };

        if self.can_calc_update() && report_is_stale {
            let avg_gs = match other.ground_speed {
                Some(gs) => (self.ground_speed.unwrap() + gs) / 2.0,
                None => self.ground_speed.unwrap(),
            };
            let avg_heading = match other.ground_heading {
                Some(hdg) => avg_angle(self.ground_heading.unwrap(), hdg),
                None => self.ground_heading.unwrap(),
            };
            log::debug!(
                "merging {}: gs {:?} -> {:.1}, hdg {:?} -> {:.1}",
                self.icao_address, other.ground_speed, avg_gs, other.ground_heading, avg_heading
            );

            self.ground_speed = Some(avg_gs);
            self.ground_heading = Some(avg_heading);
            self.update(now);
        } else if other.last_pos_update.is_some() {
            log::debug!(
                "{}: adopting reported position {:?} over {:?}",
                self.icao_address, other.position, self.position
            );
            self.position = other.position;
            self.altitude = other.altitude;
            self.last_pos_update = other.last_pos_update;
            self.last_vector_update = other.last_pos_update;
        }

        if other.ground_speed.is_some() {
            self.ground_speed = other.ground_speed;
        }
        if other.ground_heading.is_some() {
            self.ground_heading = other.ground_heading;
        }
        if other.vertical_speed.is_some() {
            self.vertical_speed = other.vertical_speed;
        }
        if other.callsign.is_some() {
            self.callsign = other.callsign.clone();
        }
    }

    /// Propagates the state vector to `now` assuming constant ground speed,
    /// heading and vertical speed. A flat-earth arcminute step is accurate
    /// to well under a meter at the 10 ms propagation cadence.
    pub fn update(&mut self, now: f64) {
        let (Some((lat, lon)), Some(gs), Some(heading), Some(vs), Some(last_update)) = (
            self.position,
            self.ground_speed,
            self.ground_heading,
            self.vertical_speed,
            self.last_vector_update,
        ) else {
            return;
        };

        let dt = now - last_update;
        let heading_rad = heading.to_radians();

        // knots are arcminutes of great circle per hour
        let d_lat = gs * heading_rad.cos() * ARCMIN * dt / 3600.0;
        let d_lon = gs * heading_rad.sin() * ARCMIN * dt / 3600.0 / lat.to_radians().cos();

        let mut new_lat = lat + d_lat;
        let mut new_lon = lon + d_lon;

        if new_lat > 90.0 {
            new_lat = 180.0 - new_lat;
            new_lon += 180.0;
        } else if new_lat < -90.0 {
            new_lat = -180.0 - new_lat;
            new_lon += 180.0;
        }

        if new_lon <= -180.0 {
            new_lon += 360.0;
        } else if new_lon > 180.0 {
            new_lon -= 360.0;
        }

        self.position = Some((new_lat, new_lon));
        self.altitude = Some(self.altitude.unwrap() + vs * dt / 60.0);
        self.last_vector_update = Some(now);
    }

    /// Position with the altitude converted to meters, for the geometry
    /// stack.
    pub fn get_metric_pos(&self) -> Option<(f64, f64, f64)> {
        let (lat, lon) = self.position?;
        Some((lat, lon, self.altitude? * FT_TO_M))
    }
}

impl std::fmt::Display for Aircraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}): pos {:?}, alt {:?} ft, gs {:?} kt, track {:?}°, vs {:?} ft/min",
            self.icao_address,
            self.callsign.as_deref().unwrap_or("-"),
            self.position,
            self.altitude,
            self.ground_speed,
            self.ground_heading,
            self.vertical_speed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn aircraft(icao: &str) -> Aircraft {
        Aircraft::new(icao.parse().unwrap())
    }

    fn moving_aircraft(t0: f64) -> Aircraft {
        let mut a = aircraft("ABC123");
        a.position = Some((51.5, 0.0));
        a.altitude = Some(10000.0);
        a.ground_speed = Some(300.0);
        a.ground_heading = Some(0.0);
        a.vertical_speed = Some(0.0);
        a.last_pos_update = Some(t0);
        a.last_vector_update = Some(t0);
        a
    }

    #[test]
    fn stationary_aircraft_update_is_idempotent() {
        let mut a = moving_aircraft(1000.0);
        a.ground_speed = Some(0.0);
        a.vertical_speed = Some(0.0);
        a.update(1060.0);
        assert_eq!(a.position, Some((51.5, 0.0)));
        assert_eq!(a.altitude, Some(10000.0));
        assert_eq!(a.last_vector_update, Some(1060.0));
    }

    #[test]
    fn northbound_track_advances_latitude() {
        let mut a = moving_aircraft(0.0);
        // 300 kt due north for one minute is 5 arcminutes of latitude
        a.update(60.0);
        let (lat, lon) = a.position.unwrap();
        assert_abs_diff_eq!(lat, 51.5 + 5.0 / 60.0, epsilon = 1.0e-9);
        assert_abs_diff_eq!(lon, 0.0, epsilon = 1.0e-9);
    }

    #[test]
    fn eastbound_track_scales_with_latitude() {
        let mut a = moving_aircraft(0.0);
        a.ground_heading = Some(90.0);
        a.update(60.0);
        let (lat, lon) = a.position.unwrap();
        assert_abs_diff_eq!(lat, 51.5, epsilon = 1.0e-9);
        assert_abs_diff_eq!(
            lon,
            (300.0 / 60.0) * (1.0 / 60.0) / 51.5f64.to_radians().cos(),
            epsilon = 1.0e-9
        );
    }

    #[test]
    fn vertical_speed_integrates_altitude() {
        let mut a = moving_aircraft(0.0);
        a.vertical_speed = Some(600.0);
        a.update(30.0);
        assert_abs_diff_eq!(a.altitude.unwrap(), 10300.0, epsilon = 1.0e-9);
    }

    #[test]
    fn crossing_the_pole_reflects() {
        let mut a = moving_aircraft(0.0);
        a.position = Some((89.999, 10.0));
        // fast enough to overshoot the pole within the step
        a.ground_speed = Some(3600.0);
        a.update(60.0);
        let (lat, lon) = a.position.unwrap();
        assert!(lat <= 90.0);
        assert_abs_diff_eq!(lon, -170.0, epsilon = 1.0e-6);
    }

    #[test]
    fn merge_averages_headings_circularly() {
        let t = 1000.0;
        let mut ours = moving_aircraft(t);
        ours.ground_heading = Some(350.0);

        let mut report = moving_aircraft(t - 10.0);
        report.ground_heading = Some(10.0);
        report.ground_speed = None;
        report.vertical_speed = None;

        ours.merge(&report, t + 1.0);
        assert_abs_diff_eq!(ours.ground_heading.unwrap(), 0.0, epsilon = 1.0e-9);
    }

    #[test]
    fn merge_adopts_fresher_position() {
        let mut ours = moving_aircraft(1000.0);
        let mut report = moving_aircraft(1010.0);
        report.position = Some((52.0, 1.0));
        report.altitude = Some(11000.0);
        report.callsign = Some("TEST123".into());

        ours.merge(&report, 1011.0);
        assert_eq!(ours.position, Some((52.0, 1.0)));
        assert_eq!(ours.altitude, Some(11000.0));
        assert_eq!(ours.last_pos_update, Some(1010.0));
        assert_eq!(ours.last_vector_update, Some(1010.0));
        assert_eq!(ours.callsign.as_deref(), Some("TEST123"));
    }

    #[test]
    fn merge_propagates_when_report_is_stale() {
        let mut ours = moving_aircraft(1000.0);
        let report = moving_aircraft(990.0);
        ours.merge(&report, 1060.0);
        // position was dead-reckoned, not taken from the stale report
        let (lat, _) = ours.position.unwrap();
        assert!(lat > 51.5);
        assert_eq!(ours.last_pos_update, Some(1000.0));
        assert_eq!(ours.last_vector_update, Some(1060.0));
    }

    #[test]
    fn incomplete_aircraft_cannot_propagate() {
        let mut a = aircraft("C0FFEE");
        a.position = Some((10.0, 10.0));
        assert!(!a.can_calc_update());
        a.update(100.0);
        assert_eq!(a.position, Some((10.0, 10.0)));
    }

    #[test]
    fn metric_position_converts_feet() {
        let a = moving_aircraft(0.0);
        let (lat, lon, height) = a.get_metric_pos().unwrap();
        assert_abs_diff_eq!(lat, 51.5, epsilon = 1.0e-12);
        assert_abs_diff_eq!(lon, 0.0, epsilon = 1.0e-12);
        assert_abs_diff_eq!(height, 3048.0, epsilon = 1.0e-9);
    }
}
