//! Jacobi-preconditioned conjugate gradient.

use super::sparse::CsrMatrix;
use crate::error::{PlaceError, PlaceResult};

/// How a converged solve ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CgOutcome {
    /// Iterations performed.
    pub iterations: usize,
    /// Residual norm relative to the right-hand side norm.
    pub residual: f64,
}

/// Iteration cap used when none is configured.
pub fn default_max_iterations(n: usize) -> usize {
    (10 * n).max(100)
}

/// Solves `a * x = b` for symmetric positive semi-definite `a`, starting
/// from the contents of `x`.
///
/// Stops once `|r| <= tolerance * |b|` (or `|r| <= tolerance` for a zero
/// right-hand side).
pub fn solve_pcg(
    a: &CsrMatrix,
    b: &[f64],
    x: &mut [f64],
    tolerance: f64,
    max_iterations: usize,
) -> PlaceResult<CgOutcome> {
    let n = a.dim();
    if b.iter().any(|v| !v.is_finite()) {
        return Err(PlaceError::NumericalDivergence {
            reason: "non-finite right-hand side".into(),
        });
    }
    if x.iter().any(|v| !v.is_finite()) {
        x.iter_mut().for_each(|v| *v = 0.0);
    }

    let inv_diag: Vec<f64> = a
        .diagonal()
        .into_iter()
        .map(|d| if d > 0.0 { 1.0 / d } else { 1.0 })
        .collect();
    let b_norm = norm(b);
    let threshold = if b_norm > 0.0 { tolerance * b_norm } else { tolerance };
    let relative = |r: f64| if b_norm > 0.0 { r / b_norm } else { r };

    let mut ap = vec![0.0; n];
    a.mul_vec(x, &mut ap);
    let mut r: Vec<f64> = b.iter().zip(&ap).map(|(bi, ai)| bi - ai).collect();
    let mut z: Vec<f64> = r.iter().zip(&inv_diag).map(|(ri, mi)| ri * mi).collect();
    let mut p = z.clone();
    let mut rz = dot(&r, &z);

    for iteration in 0..=max_iterations {
        let r_norm = norm(&r);
        if !r_norm.is_finite() {
            return Err(PlaceError::NumericalDivergence {
                reason: format!("residual became non-finite at iteration {iteration}"),
            });
        }
        if r_norm <= threshold {
            return Ok(CgOutcome {
                iterations: iteration,
                residual: relative(r_norm),
            });
        }
        if iteration == max_iterations {
            return Err(PlaceError::SolverDidNotConverge {
                iterations: max_iterations,
                residual: relative(r_norm),
            });
        }

        a.mul_vec(&p, &mut ap);
        let p_ap = dot(&p, &ap);
        if p_ap <= 0.0 {
            return Err(PlaceError::NumericalDivergence {
                reason: format!("search direction lost positive curvature at iteration {iteration}"),
            });
        }
        let alpha = rz / p_ap;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
            z[i] = r[i] * inv_diag[i];
        }
        let rz_next = dot(&r, &z);
        let beta = rz_next / rz;
        rz = rz_next;
        for i in 0..n {
            p[i] = z[i] + beta * p[i];
        }
    }
    // The loop returns at `iteration == max_iterations` at the latest.
    Err(PlaceError::SolverDidNotConverge {
        iterations: max_iterations,
        residual: relative(norm(&r)),
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}
