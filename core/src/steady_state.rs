//! Stationary distribution of the active (non-absorbing) sub-chain.
//!
//! Diagnostic only. The stepping loop never reads it.
//!
//! Method:
//!   1. Take the 4×4 active sub-block and transpose it.
//!   2. Pick the eigenvalue with minimum |λ − 1|, not the largest one.
//!   3. Recover its eigenvector as the null vector of (Aᵀ − λI),
//!      i.e. the right singular vector with the smallest singular value.
//!   4. Keep the real part and normalize to sum 1.

use crate::{
    catalog::TransitionMatrix,
    error::{SimError, SimResult},
    types::ACTIVE_SEGMENT_COUNT,
};
use nalgebra::Matrix4;

pub type ActiveDistribution = [f64; ACTIVE_SEGMENT_COUNT];

pub fn steady_state(matrix: &TransitionMatrix) -> SimResult<ActiveDistribution> {
    let rows = matrix.rows();
    let transposed = Matrix4::<f64>::from_fn(|i, j| rows[j][i]);

    let eigenvalues = transposed.complex_eigenvalues();
    let lambda = eigenvalues
        .iter()
        .min_by(|a, b| {
            distance_to_one(a.re, a.im)
                .partial_cmp(&distance_to_one(b.re, b.im))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .ok_or_else(|| fault("sub-block has no eigenvalues"))?;
    log::debug!("steady state: selected eigenvalue {:.6}{:+.6}i", lambda.re, lambda.im);

    let shifted = transposed - Matrix4::<f64>::identity() * lambda.re;
    let svd = shifted.svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| fault("SVD did not produce right singular vectors"))?;
    let null_index = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .ok_or_else(|| fault("SVD produced no singular values"))?;

    let vector = v_t.row(null_index);
    let sum: f64 = vector.iter().sum();
    if !sum.is_finite() || sum.abs() < f64::EPSILON {
        return Err(fault("eigenvector cannot be normalized"));
    }

    let mut out = [0.0; ACTIVE_SEGMENT_COUNT];
    for (slot, v) in out.iter_mut().zip(vector.iter()) {
        *slot = v / sum;
    }
    Ok(out)
}

fn distance_to_one(re: f64, im: f64) -> f64 {
    ((re - 1.0).powi(2) + im.powi(2)).sqrt()
}

fn fault(detail: &str) -> SimError {
    SimError::Computation { month: 0, detail: format!("steady state: {detail}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ScenarioCatalog;

    #[test]
    fn doubly_stochastic_block_gives_uniform_distribution() {
        // Active block is 0.9 × doubly-stochastic, so the Perron vector is flat.
        let matrix = TransitionMatrix([
            [0.45, 0.15, 0.15, 0.15, 0.10],
            [0.15, 0.45, 0.15, 0.15, 0.10],
            [0.15, 0.15, 0.45, 0.15, 0.10],
            [0.15, 0.15, 0.15, 0.45, 0.10],
            [0.00, 0.00, 0.00, 0.00, 1.00],
        ]);
        let ss = steady_state(&matrix).unwrap();
        for p in ss {
            assert!((p - 0.25).abs() < 1e-9, "expected 0.25, got {p}");
        }
    }

    #[test]
    fn builtin_steady_states_are_probability_vectors() {
        let catalog = ScenarioCatalog::builtin();
        for scenario in catalog.scenarios() {
            let ss = steady_state(&scenario.matrix).unwrap();
            let sum: f64 = ss.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "{}: sum {sum}", scenario.name);
            assert!(ss.iter().all(|p| *p > 0.0), "{}: {ss:?}", scenario.name);
        }
    }

    #[test]
    fn result_is_a_left_eigenvector_of_the_active_block() {
        let catalog = ScenarioCatalog::builtin();
        let matrix = catalog.transition_matrix_for("Default").unwrap();
        let ss = steady_state(matrix).unwrap();
        let rows = matrix.rows();

        // πA = λπ with the same λ for every component.
        let projected: Vec<f64> = (0..4)
            .map(|j| (0..4).map(|i| ss[i] * rows[i][j]).sum())
            .collect();
        let lambda = projected[0] / ss[0];
        for j in 1..4 {
            assert!((projected[j] / ss[j] - lambda).abs() < 1e-9);
        }
    }
}
