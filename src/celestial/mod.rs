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

mod alpaca;

pub use alpaca::AlpacaServer;

use crate::data::{wrap_180, wrap_360};
use chrono::{Datelike, Timelike, Utc};

/// Converts apparent equatorial coordinates to observer-relative ones.
///
/// Right ascension and declination are taken in degrees. The hour-angle
/// computation uses Greenwich mean sidereal time without the equation of the
/// equinoxes; the residual is sub-arcminute.
pub struct CelestialCoordinateTransformer {
    /// Observer latitude, longitude (degrees).
    local_pos: (f64, f64),
    /// TAI − UTC.
    leap_seconds: f64,
    local_temp_c: f64,
    local_press_mbar: f64,
}

/// Julian Date of a UTC wall-clock instant (Meeus, ch. 7).
pub fn julian_date(utc: chrono::DateTime<Utc>) -> f64 {
    let day_fraction =
        (utc.hour() as f64 + utc.minute() as f64 / 60.0 + utc.second() as f64 / 3600.0) / 24.0;

    let mut year = utc.year() as f64;
    let mut month = utc.month() as f64;
    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }

    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();

    // the formula yields the JD at 0h
    let jd0h = (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor()
        + utc.day() as f64 + b - 1524.5;

    jd0h + day_fraction
}

impl CelestialCoordinateTransformer {
    pub fn new(lat: f64, lon: f64) -> CelestialCoordinateTransformer {
        CelestialCoordinateTransformer {
            local_pos: (lat, lon),
            leap_seconds: 37.0,
            local_temp_c: 10.0,
            local_press_mbar: 1010.0,
        }
    }

    pub fn set_leap_seconds(&mut self, leap_seconds: f64) {
        self.leap_seconds = leap_seconds;
    }

    pub fn set_local_conditions(&mut self, temp_c: f64, press_mbar: f64) {
        self.local_temp_c = temp_c;
        self.local_press_mbar = press_mbar;
    }

    /// Julian Ephemeris Date; 32 s separate the TAI epoch from the ephemeris
    /// time scale.
    pub fn julian_ephemeris_date(&self, jd: f64) -> f64 {
        jd + (self.leap_seconds + 32.0) / 86400.0
    }

    /// Greenwich hour angle of an object at the given apparent right
    /// ascension (degrees), at `jd` or now.
    pub fn gha(&self, apparent_ra: f64, jd: Option<f64>) -> f64 {
        let jd = jd.unwrap_or_else(|| julian_date(Utc::now()));
        let t = (jd - 2451545.0) / 36525.0;

        let gmst = wrap_360(
            280.46061837 + 360.98564736629 * (jd - 2451545.0) + 0.000387933 * t * t
                - t * t * t / 38710000.0,
        );

        wrap_360(gmst - apparent_ra)
    }

    /// Sub-point of the object: the geodetic latitude/longitude it is at the
    /// zenith of.
    pub fn apparent_to_latlong(&self, apparent_ra: f64, apparent_dec: f64, jd: Option<f64>) -> (f64, f64) {
        let gha = self.gha(apparent_ra, jd);
        (apparent_dec, wrap_180(-gha))
    }

    /// Observer-relative altitude/azimuth, with a simple refraction
    /// correction added to the altitude.
    pub fn apparent_to_altaz(&self, apparent_ra: f64, apparent_dec: f64, jd: Option<f64>) -> (f64, f64) {
        let (lat, lon) = self.local_pos;
        let lha = wrap_360(self.gha(apparent_ra, jd) + lon);

        let (sin_dec, cos_dec) = (apparent_dec.to_radians().sin(), apparent_dec.to_radians().cos());
        let (sin_lat, cos_lat) = (lat.to_radians().sin(), lat.to_radians().cos());

        let alt = (sin_dec * sin_lat + cos_lat * cos_dec * lha.to_radians().cos())
            .asin()
            .to_degrees();
        let az_acos = ((sin_dec - sin_lat * alt.to_radians().sin())
            / (cos_lat * alt.to_radians().cos()))
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees();
        let az = if lha < 180.0 { 360.0 - az_acos } else { az_acos };

        let mut refraction = 1.02 / (alt + 10.3 / (alt + 5.11)).to_radians().tan();
        refraction *= 0.00467 * self.local_press_mbar / (273.0 + self.local_temp_c);

        (alt + refraction, az)
    }
}
