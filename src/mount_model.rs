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

use nalgebra::{Rotation3, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;

/// Calibrated kinematic chain of the mount.
///
/// All parameters are angles in degrees. The chain maps a target position in
/// the observer-local frame through the azimuth platform orientation, the two
/// drives and the fixed mechanical offsets into the scope frame, where a
/// correctly aimed boresight lies on +Y.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountModel {
    /// Azimuth platform orientation (intrinsic Z-X-Y Euler angles).
    pub az_rot_x: f64,
    pub az_rot_y: f64,
    pub az_rot_z: f64,
    /// Tilt of the declination axis about Y.
    pub dec_roll: f64,
    /// Declination home angle.
    pub dec_offset: f64,
    /// Final yaw from the declination axis to the boresight.
    pub scope_yaw: f64,
}

impl Default for MountModel {
    fn default() -> MountModel {
        MountModel {
            az_rot_x: 0.0,
            az_rot_y: 0.0,
            az_rot_z: 0.0,
            dec_roll: 0.0,
            dec_offset: 0.0,
            scope_yaw: 0.0,
        }
    }
}

fn rot_x(deg: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), deg.to_radians())
}

fn rot_y(deg: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), deg.to_radians())
}

fn rot_z(deg: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), deg.to_radians())
}

impl MountModel {
    /// Transforms a target position into the scope frame for the given motor
    /// angles `rots = [alt, az]` (degrees).
    pub fn transform(&self, pos: &Vector3<f64>, rots: [f64; 2]) -> Vector3<f64> {
        // Stage 1: azimuth plane orientation
        let m1 = rot_z(self.az_rot_z) * rot_x(self.az_rot_x) * rot_y(self.az_rot_y);
        // Stage 2: azimuth drive
        let m2 = rot_z(rots[1]);
        // Stage 3: declination roll
        let m3 = rot_y(self.dec_roll);
        // Stages 4+5: declination home + drive; positive angles rotate the
        // boresight downward about +X
        let m54 = rot_x(-(self.dec_offset + rots[0]));
        // Stage 6: scope yaw
        let m6 = rot_z(self.scope_yaw);

        m6 * (m54 * (m3 * (m2 * (m1 * pos))))
    }

    /// Parameters as a flat vector; the ordering is stable and matched by
    /// [`MountModel::unpack_parameters`].
    pub fn pack_parameters(&self) -> Vector6<f64> {
        Vector6::new(
            self.az_rot_x,
            self.az_rot_y,
            self.az_rot_z,
            self.dec_roll,
            self.dec_offset,
            self.scope_yaw,
        )
    }

    pub fn unpack_parameters(&mut self, params: &Vector6<f64>) {
        self.az_rot_x = params[0];
        self.az_rot_y = params[1];
        self.az_rot_z = params[2];
        self.dec_roll = params[3];
        self.dec_offset = params[4];
        self.scope_yaw = params[5];
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Loads parameters from a JSON file. A file with missing or unexpected
    /// keys resets the model to defaults (with a warning); only I/O failures
    /// are reported as errors.
    pub fn load_from_file(&mut self, path: &Path) -> Result<(), Box<dyn Error>> {
        let contents = std::fs::read_to_string(path)?;
        match serde_json::from_str::<MountModel>(&contents) {
            Ok(model) => *self = model,
            Err(e) => {
                log::warn!(
                    "loading mount model from {} failed ({}); using defaults",
                    path.display(),
                    e
                );
                *self = MountModel::default();
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for MountModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "MountModel")?;
        writeln!(f, "    az_rot_x: {}", self.az_rot_x)?;
        writeln!(f, "    az_rot_y: {}", self.az_rot_y)?;
        writeln!(f, "    az_rot_z: {}", self.az_rot_z)?;
        writeln!(f, "    dec_roll: {}", self.dec_roll)?;
        writeln!(f, "    dec_offset: {}", self.dec_offset)?;
        write!(f, "    scope_yaw: {}", self.scope_yaw)
    }
}
