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

use crate::data::wrap_360;
use crate::mount_model::MountModel;
use crate::solver::optimize::{minimize, Options};
use nalgebra::{Vector2, Vector3};

/// Inverse-kinematics solver: target point → motor angles for a calibrated
/// mount model.
pub struct PointingSolver {
    model: MountModel,
    options: Options,
}

#[derive(Clone, Debug)]
pub struct PointingSolution {
    /// Altitude motor angle, degrees in [0°, 360°).
    pub alt: f64,
    /// Azimuth motor angle, degrees in [0°, 360°).
    pub az: f64,
    /// Residual angular miss between boresight and target, degrees.
    pub scope_error: f64,
    pub objective: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// 0 iff the scope-frame vector lies on +Y; the factor 10 conditions the
/// optimizer.
pub(crate) fn pointing_objective(model: &MountModel, pos: &Vector3<f64>, rots: [f64; 2]) -> f64 {
    let scope_pos = model.transform(pos, rots);
    10.0 * (1.0 - scope_pos.y / scope_pos.norm())
}

impl PointingSolver {
    pub fn new(model: MountModel) -> PointingSolver {
        PointingSolver { model, options: Options::default() }
    }

    pub fn set_model(&mut self, model: MountModel) {
        self.model = model;
    }

    pub fn model(&self) -> &MountModel {
        &self.model
    }

    /// Motor angles the target would need with a perfectly aligned mount;
    /// essential for keeping the optimizer out of the wrong local minimum.
    pub fn initial_guess(&self, pos: &Vector3<f64>) -> [f64; 2] {
        let base = (pos.x * pos.x + pos.y * pos.y).sqrt();
        let alt = pos.z.atan2(base).to_degrees() - self.model.dec_offset;
        let az = -pos.y.atan2(pos.x).to_degrees() - self.model.az_rot_z + 90.0;
        [alt, az]
    }

    pub fn solve(&self, pos: &Vector3<f64>) -> PointingSolution {
        self.solve_with_guess(pos, self.initial_guess(pos))
    }

    pub fn solve_with_guess(&self, pos: &Vector3<f64>, guess: [f64; 2]) -> PointingSolution {
        let model = &self.model;
        let result = minimize(
            |rots: &Vector2<f64>| pointing_objective(model, pos, [rots[0], rots[1]]),
            Vector2::new(guess[0], guess[1]),
            &self.options,
        );

        let rots = [result.x[0], result.x[1]];
        let solution = PointingSolution {
            alt: wrap_360(rots[0]),
            az: wrap_360(rots[1]),
            scope_error: self.scope_error(rots, pos),
            objective: result.fun,
            iterations: result.iterations,
            converged: result.converged,
        };
        if !solution.converged {
            log::warn!(
                "pointing solution did not converge (objective {:.3e} after {} iterations)",
                solution.objective,
                solution.iterations
            );
        }
        solution
    }

    /// Convenience wrapper returning only the angles.
    pub fn get_point_altaz(&self, pos: &Vector3<f64>) -> (f64, f64) {
        let solution = self.solve(pos);
        (solution.alt, solution.az)
    }

    /// Angular miss in degrees for the given motor angles and target.
    pub fn scope_error(&self, rots: [f64; 2], pos: &Vector3<f64>) -> f64 {
        let scope_pos = self.model.transform(pos, rots);
        (scope_pos.y / scope_pos.norm()).clamp(-1.0, 1.0).acos().to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::prelude::*;

    fn assert_on_boresight(model: &MountModel, pos: &Vector3<f64>, solution: &PointingSolution) {
        let s = model.transform(pos, [solution.alt, solution.az]);
        let miss = (s.y / s.norm()).clamp(-1.0, 1.0).acos();
        assert!(miss < 1.0e-4, "residual miss {:.3e} rad", miss);
    }

    #[test]
    fn identity_model_north_horizon() {
        let solver = PointingSolver::new(MountModel::default());
        let solution = solver.solve(&Vector3::new(0.0, 1000.0, 0.0));
        assert!(solution.converged);
        assert!(solution.alt < 1.0e-3 || solution.alt > 360.0 - 1.0e-3);
        assert!(solution.az < 1.0e-3 || solution.az > 360.0 - 1.0e-3);
    }

    #[test]
    fn straight_up_lands_on_boresight() {
        let model = MountModel::default();
        let solver = PointingSolver::new(model.clone());
        let pos = Vector3::new(0.0, 0.0, 1000.0);
        let solution = solver.solve(&pos);
        // azimuth is indeterminate overhead; only the boresight matters
        assert_on_boresight(&model, &pos, &solution);
        assert_abs_diff_eq!(crate::data::wrap_180(solution.alt), 90.0, epsilon = 1.0e-2);
    }

    #[test]
    fn dec_offset_is_cancelled() {
        let model = MountModel { dec_offset: 45.0, ..MountModel::default() };
        let solver = PointingSolver::new(model);
        let solution = solver.solve(&Vector3::new(0.0, 1.0, 0.0));
        assert!(solution.converged);
        assert_abs_diff_eq!(crate::data::wrap_180(solution.alt), -45.0, epsilon = 1.0e-3);
    }

    fn random_model(rng: &mut StdRng) -> MountModel {
        // distribution used for calibration acceptance: small normal-ish
        // mechanical errors, uniform drive offsets
        MountModel {
            az_rot_x: rng.gen_range(-10.0..10.0),
            az_rot_y: rng.gen_range(-10.0..10.0),
            az_rot_z: rng.gen_range(-180.0..180.0),
            dec_roll: rng.gen_range(-10.0..10.0),
            dec_offset: rng.gen_range(-180.0..180.0),
            scope_yaw: rng.gen_range(-10.0..10.0),
        }
    }

    fn random_upper_hemisphere_point(rng: &mut StdRng) -> Vector3<f64> {
        let alt = rng.gen_range(2.0..85.0f64).to_radians();
        let az = rng.gen_range(-180.0..180.0f64).to_radians();
        let range = rng.gen_range(0.4..1000.0);
        Vector3::new(
            az.cos() * alt.cos() * range,
            az.sin() * alt.cos() * range,
            alt.sin() * range,
        )
    }

    #[test]
    fn round_trip_over_random_models() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..25 {
            let model = random_model(&mut rng);
            let solver = PointingSolver::new(model.clone());
            let pos = random_upper_hemisphere_point(&mut rng);
            let solution = solver.solve(&pos);
            assert_on_boresight(&model, &pos, &solution);
        }
    }
}
