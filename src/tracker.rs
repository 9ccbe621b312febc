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

use crate::data::{wrap_180, wrap_360, Position};
use crate::mount::ScopeDriver;
use crate::mount_model::MountModel;
use crate::solver::PointingSolver;
use crate::trackable::Trackable;
use crate::transformer::LocalCoordinateTransformer;
use std::error::Error;

/// Atomic snapshot of the target and the motor angles read back from the
/// scope, for calibration capture.
#[derive(Clone, Debug)]
pub struct TrackerState {
    /// Target position in the observer-local Cartesian frame.
    pub local_pos: Position,
    pub alt: f64,
    pub az: f64,
}

/// Drives the real-time tracking loop: target position in, motor command
/// out, once per tick.
pub struct ObjectTracker {
    tracked_object: Option<Box<dyn Trackable>>,
    transformer: LocalCoordinateTransformer,
    solver: PointingSolver,
    scope_driver: Box<dyn ScopeDriver>,
    /// User trim added to the solved angles, degrees.
    tracking_offset: (f64, f64),
    last_motor_angle: (f64, f64),
}

impl ObjectTracker {
    pub fn new(
        transformer: LocalCoordinateTransformer,
        scope_driver: Box<dyn ScopeDriver>,
        mount_model: MountModel,
    ) -> ObjectTracker {
        ObjectTracker {
            tracked_object: None,
            transformer,
            solver: PointingSolver::new(mount_model),
            scope_driver,
            tracking_offset: (0.0, 0.0),
            last_motor_angle: (0.0, 0.0),
        }
    }

    pub fn set_tracked_object(&mut self, obj: Option<Box<dyn Trackable>>) {
        match &obj {
            Some(obj) => log::info!("now tracking {}", obj.get_name()),
            None => log::info!("tracking deselected"),
        }
        self.tracked_object = obj;
    }

    pub fn tracked_object_name(&self) -> Option<String> {
        self.tracked_object.as_ref().map(|obj| obj.get_name())
    }

    /// Installs an independent copy of a freshly calibrated model.
    pub fn set_mount_model(&mut self, mount_model: MountModel) {
        self.solver.set_model(mount_model);
    }

    pub fn get_model(&self) -> MountModel {
        self.solver.model().clone()
    }

    pub fn set_tracking_offset(&mut self, alt: f64, az: f64) {
        self.tracking_offset = (alt, az);
    }

    pub fn add_tracking_offset(&mut self, d_alt: f64, d_az: f64) {
        self.tracking_offset.0 += d_alt;
        self.tracking_offset.1 += d_az;
    }

    pub fn get_tracking_offset(&self) -> (f64, f64) {
        self.tracking_offset
    }

    pub fn is_tracking(&self) -> bool {
        self.tracked_object.as_ref().map_or(false, |obj| obj.is_tracking())
    }

    /// Current target position in the local frame: geodetic positions are
    /// run through the local transformer, alt/az ones pass through.
    pub fn get_trackable_position(&self) -> Option<Position> {
        let pos = self.tracked_object.as_ref()?.get_position()?;
        Some(match pos {
            Position::LatLong { lat, lon, height } => {
                Position::Cartesian(self.transformer.transform_to_local(lat, lon, height))
            }
            other => other,
        })
    }

    /// One tick: solve for the current target and command the scope.
    /// Silently does nothing while the target has no position.
    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        let Some(local_pos) = self.get_trackable_position() else {
            return Ok(());
        };

        let (mut alt, mut az) = match &local_pos {
            Position::Cartesian(pos) => {
                let solution = self.solver.solve(pos);
                if !solution.converged {
                    // best-effort angles are still worth slewing to
                    log::warn!(
                        "tracking with non-converged solution (residual {:.4}°)",
                        solution.scope_error
                    );
                }
                (solution.alt, solution.az)
            }
            Position::AltAz { alt, az } => (*alt, *az),
            Position::LatLong { .. } => return Err("unusable local position type".into()),
        };

        alt += self.tracking_offset.0;
        az += self.tracking_offset.1;

        // fold over-the-top pointing back into the mechanical range
        alt = wrap_180(alt);
        if alt.abs() > 90.0 {
            az += 180.0;
            alt = if alt > 0.0 { 180.0 - alt } else { -180.0 - alt };
        }
        az = wrap_360(az);

        self.scope_driver.slew_to_altaz_deg(alt, az)?;
        self.last_motor_angle = (alt, az);

        Ok(())
    }

    /// Snapshot for calibration capture.
    ///
    /// Panics when the target has no position; callers gate on
    /// [`ObjectTracker::is_tracking`].
    pub fn get_state(&mut self) -> Result<TrackerState, Box<dyn Error>> {
        let local_pos = self
            .get_trackable_position()
            .expect("object tracker cannot get position from trackable");
        let (alt, az) = self.scope_driver.get_altaz_deg()?;
        self.last_motor_angle = (alt, az);

        Ok(TrackerState { local_pos, alt, az })
    }

    pub fn get_last_motor_angle(&self) -> (f64, f64) {
        self.last_motor_angle
    }
}
