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

use nalgebra::{Matrix3, Vector3};

// WGS-84 ellipsoid
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Geodetic (degrees, meters of ellipsoidal height) to Earth-centered,
/// Earth-fixed Cartesian.
pub fn geodetic_to_ecef(lat: f64, lon: f64, height: f64) -> Vector3<f64> {
    let e2 = 2.0 * WGS84_F - WGS84_F * WGS84_F;
    let (sin_lat, cos_lat) = (lat.to_radians().sin(), lat.to_radians().cos());
    let (sin_lon, cos_lon) = (lon.to_radians().sin(), lon.to_radians().cos());

    // prime vertical radius of curvature
    let n = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    Vector3::new(
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - e2) + height) * sin_lat,
    )
}

/// Transforms geodetic positions into the horizon-tangent Cartesian frame of
/// a fixed observer: +x east, +y north, +z up, meters.
pub struct LocalCoordinateTransformer {
    origin_ecef: Vector3<f64>,
    /// Rows are the local east/north/up unit vectors in ECEF.
    basis: Matrix3<f64>,
}

impl LocalCoordinateTransformer {
    pub fn new(lat: f64, lon: f64, height: f64) -> LocalCoordinateTransformer {
        let mut transformer = LocalCoordinateTransformer {
            origin_ecef: Vector3::zeros(),
            basis: Matrix3::identity(),
        };
        transformer.set_local_position(lat, lon, height);
        transformer
    }

    /// Re-anchors the frame at a new observer position and rebuilds the
    /// basis from numerically perturbed points on the ellipsoid.
    pub fn set_local_position(&mut self, lat: f64, lon: f64, height: f64) {
        let origin = geodetic_to_ecef(lat, lon, height);

        // local vertical from a point 0.1 m up the geodetic normal
        let point_up = geodetic_to_ecef(lat, lon, height + 0.1);
        let v_z = (point_up - origin).normalize();

        // local north from a point slightly further north; reflect across
        // the pole if the perturbation overshoots it
        let mut north_lat = lat + 1.0e-5;
        let mut north_lon = lon;
        if north_lat > 90.0 {
            north_lat = 180.0 - north_lat;
            north_lon += if north_lon > 0.0 { -180.0 } else { 180.0 };
        }
        let point_north = geodetic_to_ecef(north_lat, north_lon, height);
        let v_y = point_north - origin;
        let v_y = (v_y - v_y.dot(&v_z) * v_z).normalize();

        let v_x = v_y.cross(&v_z);

        self.origin_ecef = origin;
        self.basis = Matrix3::from_rows(&[v_x.transpose(), v_y.transpose(), v_z.transpose()]);
        log::debug!(
            "local frame anchored at ({:.6}°, {:.6}°, {:.1} m), ECEF origin {:?}",
            lat, lon, height, self.origin_ecef
        );
    }

    pub fn transform_to_local(&self, lat: f64, lon: f64, height: f64) -> Vector3<f64> {
        self.basis * (geodetic_to_ecef(lat, lon, height) - self.origin_ecef)
    }

    pub fn origin_ecef(&self) -> &Vector3<f64> {
        &self.origin_ecef
    }

    pub fn basis(&self) -> &Matrix3<f64> {
        &self.basis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ecef_of_reference_points() {
        let equator = geodetic_to_ecef(0.0, 0.0, 0.0);
        assert_abs_diff_eq!(equator.x, WGS84_A, epsilon = 1.0e-6);
        assert_abs_diff_eq!(equator.y, 0.0, epsilon = 1.0e-6);
        assert_abs_diff_eq!(equator.z, 0.0, epsilon = 1.0e-6);

        let pole = geodetic_to_ecef(90.0, 0.0, 0.0);
        assert_abs_diff_eq!(pole.x, 0.0, epsilon = 1.0e-6);
        // semi-minor axis
        assert_abs_diff_eq!(pole.z, WGS84_A * (1.0 - WGS84_F), epsilon = 1.0e-6);
    }

    #[test]
    fn basis_is_orthonormal_and_right_handed() {
        for &(lat, lon) in &[(0.0, 0.0), (51.2, 0.3), (-33.9, 151.2), (80.0, -120.0), (-89.0, 10.0)] {
            let transformer = LocalCoordinateTransformer::new(lat, lon, 120.0);
            let r = transformer.basis();
            let deviation = (r * r.transpose() - Matrix3::identity()).norm();
            assert!(deviation < 1.0e-6, "at ({lat}, {lon}): {deviation:.2e}");
            assert!(r.determinant() > 0.0);
        }
    }

    #[test]
    fn zenith_target_at_equator() {
        let transformer = LocalCoordinateTransformer::new(0.0, 0.0, 0.0);
        let local = transformer.transform_to_local(0.0, 0.0, 100.0);
        assert_abs_diff_eq!(local.x, 0.0, epsilon = 1.0e-4);
        assert_abs_diff_eq!(local.y, 0.0, epsilon = 1.0e-4);
        assert_abs_diff_eq!(local.z, 100.0, epsilon = 1.0e-4);
    }

    #[test]
    fn northward_target_is_along_y() {
        let transformer = LocalCoordinateTransformer::new(45.0, 7.0, 0.0);
        // one arcminute of latitude is a nautical mile, give or take
        let local = transformer.transform_to_local(45.0 + 1.0 / 60.0, 7.0, 0.0);
        assert!(local.y > 1800.0 && local.y < 1900.0, "north delta {:.1}", local.y);
        assert_abs_diff_eq!(local.x, 0.0, epsilon = 1.0e-3);
        assert!(local.y.abs() > 1.0e3 * local.z.abs());
    }

    #[test]
    fn eastward_target_is_along_x() {
        let transformer = LocalCoordinateTransformer::new(10.0, 20.0, 0.0);
        let local = transformer.transform_to_local(10.0, 20.001, 0.0);
        assert!(local.x > 0.0);
        assert!(local.x > 1.0e3 * local.y.abs());
    }

    #[test]
    fn observer_height_offsets_z() {
        let transformer = LocalCoordinateTransformer::new(51.5, 0.0, 200.0);
        let local = transformer.transform_to_local(51.5, 0.0, 50.0);
        assert_abs_diff_eq!(local.z, -150.0, epsilon = 1.0e-4);
    }
}
