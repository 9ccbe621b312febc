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

use crate::data::{circular_mean, wrap_360};
use crate::mount_model::MountModel;
use crate::solver::optimize::{minimize, Options};
use crate::solver::pointing::pointing_objective;
use nalgebra::{Vector3, Vector6};

/// Fits the six mount-model parameters to captured (target point, motor
/// angle) pairs by nonlinear least squares.
pub struct CalibrationSolver {
    options: Options,
}

#[derive(Clone, Debug)]
pub struct CalibrationFit {
    pub params: Vector6<f64>,
    /// Final value of the mean pointing objective.
    pub residual: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("no calibration points")]
    NoData,
    #[error("{positions} positions but {rotations} motor-angle pairs")]
    LengthMismatch { positions: usize, rotations: usize },
}

fn calibration_objective(
    params: &Vector6<f64>,
    positions: &[Vector3<f64>],
    rotations: &[[f64; 2]],
) -> f64 {
    let mut model = MountModel::default();
    model.unpack_parameters(params);

    let sum: f64 = positions
        .iter()
        .zip(rotations)
        .map(|(pos, rots)| pointing_objective(&model, pos, *rots) / 10.0)
        .sum();

    10.0 * sum / positions.len() as f64
}

impl CalibrationSolver {
    pub fn new() -> CalibrationSolver {
        CalibrationSolver { options: Options::default() }
    }

    /// Average alt/az offsets between where an ideal mount would point and
    /// where the motors actually were; most of the total misalignment comes
    /// from the drive home offsets, so these seed `dec_offset` and
    /// `az_rot_z`.
    fn average_offsets(positions: &[Vector3<f64>], rotations: &[[f64; 2]]) -> (f64, f64) {
        let alt_offsets = positions.iter().zip(rotations).map(|(pos, rots)| {
            let base = (pos.x * pos.x + pos.y * pos.y).sqrt();
            let true_alt = (pos.z / base).atan().to_degrees();
            wrap_360(true_alt - rots[0])
        });
        let az_offsets = positions.iter().zip(rotations).map(|(pos, rots)| {
            let true_az = -pos.y.atan2(pos.x).to_degrees() + 90.0;
            wrap_360(true_az - rots[1])
        });
        (circular_mean(alt_offsets), circular_mean(az_offsets))
    }

    /// Fits the parameters, starting from `model` (or from the warm-start
    /// heuristic when `warm_start` is set). The model itself is not touched;
    /// the caller decides what to do with the fit.
    pub fn solve(
        &self,
        model: &MountModel,
        positions: &[Vector3<f64>],
        rotations: &[[f64; 2]],
        warm_start: bool,
    ) -> Result<CalibrationFit, CalibrationError> {
        if positions.len() != rotations.len() {
            return Err(CalibrationError::LengthMismatch {
                positions: positions.len(),
                rotations: rotations.len(),
            });
        }
        if positions.is_empty() {
            return Err(CalibrationError::NoData);
        }

        let start = if warm_start {
            let (avg_offset_alt, avg_offset_az) = Self::average_offsets(positions, rotations);
            let guess = MountModel {
                az_rot_z: avg_offset_az,
                dec_offset: avg_offset_alt,
                ..MountModel::default()
            };
            log::debug!("calibration warm start:\n{}", guess);
            guess.pack_parameters()
        } else {
            model.pack_parameters()
        };

        let result = minimize(
            |params: &Vector6<f64>| calibration_objective(params, positions, rotations),
            start,
            &self.options,
        );

        if !result.converged {
            log::warn!(
                "calibration did not converge (objective {:.3e} after {} iterations)",
                result.fun,
                result.iterations
            );
        }

        Ok(CalibrationFit {
            params: result.x,
            residual: result.fun,
            iterations: result.iterations,
            converged: result.converged,
        })
    }
}

impl Default for CalibrationSolver {
    fn default() -> CalibrationSolver {
        CalibrationSolver::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::pointing::PointingSolver;
    use rand::prelude::*;

    fn random_model(rng: &mut StdRng) -> MountModel {
        MountModel {
            az_rot_x: 5.0 * normal(rng),
            az_rot_y: 5.0 * normal(rng),
            az_rot_z: rng.gen_range(-180.0..180.0),
            dec_roll: 5.0 * normal(rng),
            dec_offset: rng.gen_range(-180.0..180.0),
            scope_yaw: 5.0 * normal(rng),
        }
    }

    // Box-Muller; keeps the test free of extra distribution dependencies
    fn normal(rng: &mut StdRng) -> f64 {
        let u1: f64 = rng.gen_range(1.0e-12..1.0);
        let u2: f64 = rng.gen_range(0.0..1.0);
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn random_point(rng: &mut StdRng) -> Vector3<f64> {
        let alt = rng.gen_range(2.0..85.0f64).to_radians();
        let az = rng.gen_range(-180.0..180.0f64).to_radians();
        let range = rng.gen_range(0.4..1000.0);
        Vector3::new(
            az.cos() * alt.cos() * range,
            az.sin() * alt.cos() * range,
            alt.sin() * range,
        )
    }

    fn synthetic_samples(
        model: &MountModel,
        rng: &mut StdRng,
        count: usize,
    ) -> (Vec<Vector3<f64>>, Vec<[f64; 2]>) {
        let solver = PointingSolver::new(model.clone());
        let mut positions = Vec::with_capacity(count);
        let mut rotations = Vec::with_capacity(count);
        while positions.len() < count {
            let pos = random_point(rng);
            let solution = solver.solve(&pos);
            if solution.objective < 1.0e-9 {
                positions.push(pos);
                rotations.push([solution.alt, solution.az]);
            }
        }
        (positions, rotations)
    }

    #[test]
    fn recovers_ground_truth_model() {
        let mut rng = StdRng::seed_from_u64(42);
        let truth = random_model(&mut rng);
        let (positions, rotations) = synthetic_samples(&truth, &mut rng, 25);

        let fit = CalibrationSolver::new()
            .solve(&MountModel::default(), &positions, &rotations, true)
            .unwrap();
        assert!(fit.converged);

        let mut fitted = MountModel::default();
        fitted.unpack_parameters(&fit.params);
        let fitted_solver = PointingSolver::new(fitted);

        // mean scope error on a fresh test set must stay below 0.01°
        let truth_solver = PointingSolver::new(truth.clone());
        let mut total_error = 0.0;
        for _ in 0..100 {
            let pos = random_point(&mut rng);
            let reference = truth_solver.solve(&pos);
            total_error += fitted_solver.scope_error([reference.alt, reference.az], &pos);
        }
        assert!(
            total_error / 100.0 < 0.01,
            "mean scope error {:.4}°",
            total_error / 100.0
        );
    }

    #[test]
    fn no_points_is_a_distinct_outcome() {
        let result = CalibrationSolver::new().solve(&MountModel::default(), &[], &[], true);
        assert!(matches!(result, Err(CalibrationError::NoData)));
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let result = CalibrationSolver::new().solve(
            &MountModel::default(),
            &[Vector3::new(0.0, 1.0, 0.0)],
            &[],
            true,
        );
        assert!(matches!(result, Err(CalibrationError::LengthMismatch { .. })));
    }

    #[test]
    fn cold_start_refines_an_almost_right_model() {
        let mut rng = StdRng::seed_from_u64(11);
        let truth = MountModel {
            az_rot_x: 1.5,
            az_rot_y: -0.75,
            az_rot_z: 20.0,
            dec_roll: 0.5,
            dec_offset: -30.0,
            scope_yaw: 1.0,
        };
        let (positions, rotations) = synthetic_samples(&truth, &mut rng, 20);

        let near = MountModel { az_rot_x: 0.0, ..truth.clone() };
        let fit = CalibrationSolver::new()
            .solve(&near, &positions, &rotations, false)
            .unwrap();
        assert!(fit.converged);
        assert!(fit.residual < 1.0e-8, "residual {:.3e}", fit.residual);
    }
}
