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

use crate::data::Position;
use crate::mount_model::MountModel;
use crate::solver::{CalibrationError, CalibrationSolver, PointingSolver};
use crate::tracker::ObjectTracker;
use nalgebra::Vector3;
use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

/// One captured alignment sample.
#[derive(Clone, Debug)]
pub struct CalibrationPoint {
    /// Target position in the observer-local frame at capture time.
    pub local_pos: Vector3<f64>,
    /// Driven (alt, az) motor angles at capture time.
    pub motor_angles: [f64; 2],
    pub object_name: String,
    /// Angular miss of the last fitted model for this point, degrees.
    pub reprojection_error: Option<f64>,
}

/// Collects alignment samples while the operator centers known objects, and
/// refits the candidate mount model from them.
pub struct CalibrationManager {
    object_tracker: Rc<RefCell<ObjectTracker>>,
    solver: CalibrationSolver,
    mount_model: MountModel,
    point_list: Vec<CalibrationPoint>,
}

impl CalibrationManager {
    pub fn new(object_tracker: Rc<RefCell<ObjectTracker>>) -> CalibrationManager {
        CalibrationManager {
            object_tracker,
            solver: CalibrationSolver::new(),
            mount_model: MountModel::default(),
            point_list: Vec::new(),
        }
    }

    /// Snapshots the tracker's current (target, motor angles) pair.
    ///
    /// Does nothing when no object is being tracked. Panics when the tracker
    /// hands back a non-Cartesian target; calibration needs a metric
    /// position.
    pub fn capture_point(&mut self) -> Result<(), Box<dyn Error>> {
        if !self.object_tracker.borrow().is_tracking() {
            log::warn!("not capturing a calibration point, no tracked object");
            return Ok(());
        }

        let mut tracker = self.object_tracker.borrow_mut();
        let state = tracker.get_state()?;
        let object_name = tracker.tracked_object_name().unwrap_or_else(|| "No Name".to_string());

        let Position::Cartesian(local_pos) = state.local_pos else {
            panic!("position supplied to the calibrator must be cartesian");
        };

        log::info!(
            "captured calibration point for {} at alt {:.2}°, az {:.2}°",
            object_name, state.alt, state.az
        );
        self.point_list.push(CalibrationPoint {
            local_pos,
            motor_angles: [state.alt, state.az],
            object_name,
            reprojection_error: None,
        });

        Ok(())
    }

    /// Refits the candidate model from the captured points.
    ///
    /// Returns the fit residual, or −1.0 with no points. A non-converged fit
    /// leaves the previous model in place (and the points' reprojection
    /// errors untouched); a successful one recomputes them and optionally
    /// pushes a model copy into the tracker.
    pub fn update_model(&mut self, update_tracker: bool) -> f64 {
        let positions: Vec<Vector3<f64>> = self.point_list.iter().map(|p| p.local_pos).collect();
        let rotations: Vec<[f64; 2]> = self.point_list.iter().map(|p| p.motor_angles).collect();

        let residual = match self.solver.solve(&self.mount_model, &positions, &rotations, true) {
            Err(CalibrationError::NoData) => return -1.0,
            Err(e) => {
                // cannot happen with arrays built side by side above
                log::error!("calibration rejected its inputs: {}", e);
                return -1.0;
            }
            Ok(fit) => {
                if fit.converged {
                    self.mount_model.unpack_parameters(&fit.params);

                    let solver = PointingSolver::new(self.mount_model.clone());
                    for point in &mut self.point_list {
                        point.reprojection_error =
                            Some(solver.scope_error(point.motor_angles, &point.local_pos));
                    }
                } else {
                    log::warn!("calibration failed, keeping the previous model");
                }
                fit.residual
            }
        };

        if update_tracker {
            self.send_model();
        }

        residual
    }

    /// Pushes an independent copy of the candidate model into the tracker.
    pub fn send_model(&self) {
        self.object_tracker.borrow_mut().set_mount_model(self.mount_model.clone());
    }

    pub fn reset_model(&mut self) {
        self.mount_model = MountModel::default();
    }

    pub fn get_model(&self) -> MountModel {
        self.mount_model.clone()
    }

    pub fn set_model(&mut self, model: &MountModel) {
        self.mount_model = model.clone();
    }

    /// Removes one captured point and refits.
    pub fn delete_point(&mut self, index: usize, update_tracker: bool) -> f64 {
        self.point_list.remove(index);
        self.update_model(update_tracker)
    }

    pub fn get_point_list(&self) -> Vec<CalibrationPoint> {
        self.point_list.clone()
    }
}
