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

//! Bounded quasi-Newton minimizer (BFGS with backtracking line search and a
//! central-difference gradient) shared by the pointing and calibration
//! solvers.

use nalgebra::{SMatrix, SVector};

#[derive(Clone, Debug)]
pub struct Options {
    /// Stop when the gradient ∞-norm falls below this.
    pub gradient_tol: f64,
    /// Stop when the relative function decrease of an accepted step falls
    /// below this on two consecutive iterations.
    pub f_tol: f64,
    pub max_iterations: usize,
    /// Central-difference step for the gradient.
    pub fd_step: f64,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            gradient_tol: 1.0e-10,
            f_tol: 1.0e-14,
            max_iterations: 500,
            fd_step: 1.0e-6,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Minimization<const N: usize> {
    pub x: SVector<f64, N>,
    pub fun: f64,
    pub iterations: usize,
    pub converged: bool,
}

fn gradient<const N: usize>(
    f: &impl Fn(&SVector<f64, N>) -> f64,
    x: &SVector<f64, N>,
    h: f64,
) -> SVector<f64, N> {
    let mut g = SVector::<f64, N>::zeros();
    for i in 0..N {
        let mut xp = *x;
        let mut xm = *x;
        xp[i] += h;
        xm[i] -= h;
        g[i] = (f(&xp) - f(&xm)) / (2.0 * h);
    }
    g
}

/// Backtracking Armijo line search along `dir`; returns the accepted point
/// and value, or `None` when no decrease was found.
fn line_search<const N: usize>(
    f: &impl Fn(&SVector<f64, N>) -> f64,
    x: &SVector<f64, N>,
    fx: f64,
    g: &SVector<f64, N>,
    dir: &SVector<f64, N>,
) -> Option<(SVector<f64, N>, f64)> {
    const C1: f64 = 1.0e-4;
    const SHRINK: f64 = 0.5;
    const MAX_BACKTRACKS: usize = 40;

    let slope = g.dot(dir);
    let mut alpha = 1.0;
    for _ in 0..MAX_BACKTRACKS {
        let candidate = x + dir * alpha;
        let fc = f(&candidate);
        if fc <= fx + C1 * alpha * slope && fc < fx {
            return Some((candidate, fc));
        }
        alpha *= SHRINK;
    }
    None
}

/// Minimizes `f` starting from `x0`, without variable bounds.
///
/// The iteration budget and the gradient/function tolerances come from
/// `opts`; on a failed line search with a still-large gradient the best
/// point so far is returned with `converged == false`.
pub fn minimize<const N: usize>(
    f: impl Fn(&SVector<f64, N>) -> f64,
    x0: SVector<f64, N>,
    opts: &Options,
) -> Minimization<N> {
    // gradient magnitude below which a stalled line search still counts as
    // a converged solution (the finite-difference noise floor)
    const STALL_GRADIENT_TOL: f64 = 1.0e-6;

    let mut x = x0;
    let mut fx = f(&x);
    let mut g = gradient(&f, &x, opts.fd_step);
    let mut h_inv = SMatrix::<f64, N, N>::identity();
    let mut small_decreases = 0usize;

    for iteration in 0..opts.max_iterations {
        if g.amax() < opts.gradient_tol {
            return Minimization { x, fun: fx, iterations: iteration, converged: true };
        }

        let mut dir = -(h_inv * g);
        if dir.dot(&g) >= 0.0 {
            // curvature information went bad; restart from steepest descent
            h_inv = SMatrix::<f64, N, N>::identity();
            dir = -g;
        }

        let (x_new, f_new) = match line_search(&f, &x, fx, &g, &dir) {
            Some(step) => step,
            None => {
                return Minimization {
                    x,
                    fun: fx,
                    iterations: iteration,
                    converged: g.amax() < STALL_GRADIENT_TOL,
                };
            }
        };

        let g_new = gradient(&f, &x_new, opts.fd_step);
        let s = x_new - x;
        let y = g_new - g;
        let sy = s.dot(&y);
        if sy > 1.0e-12 * s.norm() * y.norm() {
            let rho = 1.0 / sy;
            let identity = SMatrix::<f64, N, N>::identity();
            let left = identity - (s * y.transpose()) * rho;
            let right = identity - (y * s.transpose()) * rho;
            h_inv = left * h_inv * right + (s * s.transpose()) * rho;
        }

        let decrease = fx - f_new;
        if decrease <= opts.f_tol * fx.abs().max(1.0) {
            small_decreases += 1;
        } else {
            small_decreases = 0;
        }

        x = x_new;
        fx = f_new;
        g = g_new;

        if small_decreases >= 2 {
            return Minimization { x, fun: fx, iterations: iteration + 1, converged: true };
        }
    }

    Minimization {
        x,
        fun: fx,
        iterations: opts.max_iterations,
        converged: g.amax() < STALL_GRADIENT_TOL,
    }
}
