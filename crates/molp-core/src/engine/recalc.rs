//! Facet-equation recalculation: every `RecalculateFacets` iterations,
//! rederive each live facet's equation from its adjacent-vertex set
//! rather than letting accumulated floating-point drift stand.

use super::{Engine, EngineError};
use crate::store::VertexCoords;
use nalgebra::{DMatrix, SVD};
use tracing::warn;

/// Solves the homogeneous system `A f = 0` for the facet equation `f`
/// (in homogeneous coordinates) via the right-singular vector
/// associated with the smallest singular value, which is the
/// least-squares null-space direction when the adjacent vertices are
/// (as expected) affinely dependent in exactly the one direction that
/// defines their common supporting hyperplane.
fn solve_homogeneous(rows: &[Vec<f64>], dim: usize, lineq_eps: f64) -> Option<Vec<f64>> {
    let nrows = rows.len();
    if nrows == 0 {
        return None;
    }
    let a = DMatrix::from_fn(nrows, dim + 1, |r, c| rows[r][c]);
    let svd = SVD::new(a, true, true);
    let v_t = svd.v_t?;
    let mut eqn: Vec<f64> = v_t.row(v_t.nrows() - 1).iter().copied().collect();
    for c in eqn.iter_mut() {
        if c.abs() <= lineq_eps {
            *c = 0.0;
        }
    }
    Some(eqn)
}

/// Flips the sign of `eqn` if needed so that `reference` (assumed
/// strictly interior to the whole polytope) lies on the negative
/// side, matching the `f . x + f[d+1] <= 0` convention.
fn normalize_sign(eqn: &mut [f64], reference: &[f64], dim: usize) {
    let mut val = eqn[dim];
    for i in 0..dim {
        val += eqn[i] * reference[i];
    }
    if val > 0.0 {
        for c in eqn.iter_mut() {
            *c = -*c;
        }
    }
}

pub(super) fn recalculate_facets(engine: &mut Engine) -> Result<(), EngineError> {
    let dim = engine.dim();
    let lineq_eps = engine.params().lineq_eps;
    let recalc_eps = engine.params().facet_recalc_eps;

    let reference: Vec<f64> = engine
        .store()
        .live_vertex_ids()
        .find_map(|v| engine.store().vertex_coords(v).as_finite().map(|c| c.to_vec()))
        .unwrap_or_else(|| vec![0.0; dim]);

    let live: Vec<_> = engine.store().live_facet_ids().collect();
    for fid in live {
        let rows: Vec<Vec<f64>> = engine
            .store()
            .vertices_on(fid)
            .filter_map(|v| match engine.store().vertex_coords(v) {
                VertexCoords::Finite(c) => {
                    let mut row = c.clone();
                    row.push(1.0);
                    Some(row)
                }
                VertexCoords::IdealAxis(_) => None,
            })
            .collect();
        if rows.len() < dim {
            continue;
        }
        let mut new_eqn = match solve_homogeneous(&rows, dim, lineq_eps) {
            Some(e) => e,
            None => continue,
        };
        normalize_sign(&mut new_eqn, &reference, dim);

        let old_eqn = engine.store().facet_eqn(fid).to_vec();
        let old_norm = old_eqn.iter().map(|c| c * c).sum::<f64>().sqrt().max(1e-30);
        let new_norm = new_eqn.iter().map(|c| c * c).sum::<f64>().sqrt().max(1e-30);
        let max_diff = old_eqn
            .iter()
            .zip(new_eqn.iter())
            .map(|(a, b)| (a / old_norm - b / new_norm).abs())
            .fold(0.0_f64, f64::max);
        if max_diff > recalc_eps {
            engine.stats_mut().instability_warnings += 1;
            warn!(facet = fid.0, max_diff, "facet recalculation instability");
        }
        engine.store_mut().set_facet_eqn(fid, new_eqn);
    }

    engine.stats_mut().recalculations += 1;
    Ok(())
}
