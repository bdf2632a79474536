//! Vertex insertion: the combinatorial heart of the DD engine.
//!
//! Given a new vertex `w` that some facet's oracle probe found
//! strictly outside the current approximation, partitions the live
//! facets by signed distance, cuts the violated ones, and synthesizes
//! one new facet per surviving ridge.

use super::{Engine, EngineError};
use crate::bitmatrix::BitRow;
use crate::store::{FacetId, VertexCoords};
use tracing::debug;

enum Side {
    Pos,
    Zero,
    Neg,
}

fn classify(delta: f64, eps: f64) -> Side {
    if delta > eps {
        Side::Pos
    } else if delta < -eps {
        Side::Neg
    } else {
        Side::Zero
    }
}

/// Tests whether `f_p` and `f_n` share a combinatorial ridge via
/// Chvátal's test: the intersection of their adjacent-vertex sets is
/// not a subset of any third live facet's adjacent-vertex set.
fn is_ridge(engine: &Engine, f_p: FacetId, f_n: FacetId, shared: &BitRow) -> bool {
    for f_k in engine.store().live_facet_ids() {
        if f_k == f_p || f_k == f_n {
            continue;
        }
        if shared.is_subset_of(engine.store().facet_adj_row(f_k)) {
            return false;
        }
    }
    true
}

pub(super) fn insert_vertex(engine: &mut Engine, w_coords: Vec<f64>) -> Result<(), EngineError> {
    let dim = engine.dim();
    let eps = engine.params().polytope_eps;

    let live: Vec<FacetId> = engine.store().live_facet_ids().collect();
    let mut pos = Vec::new();
    let mut zero = Vec::new();
    let mut neg = Vec::new();
    let mut deltas = std::collections::HashMap::new();

    for fid in &live {
        let eqn = engine.store().facet_eqn(*fid);
        let mut delta = eqn[dim];
        for i in 0..dim {
            delta += eqn[i] * w_coords[i];
        }
        deltas.insert(*fid, delta);
        match classify(delta, eps) {
            Side::Pos => pos.push(*fid),
            Side::Zero => zero.push(*fid),
            Side::Neg => neg.push(*fid),
        }
    }

    let mut new_facets = Vec::new();
    for &f_p in &pos {
        let candidates: Vec<FacetId> = neg.iter().chain(zero.iter()).copied().collect();
        for f_n in candidates {
            let shared = engine
                .store()
                .facet_adj_row(f_p)
                .and(engine.store().facet_adj_row(f_n));
            if shared.popcount() < dim.saturating_sub(2) {
                continue;
            }
            let ridge_combinatorial = is_ridge(engine, f_p, f_n, &shared);
            let ridge_arithmetic = shared.popcount() == dim.saturating_sub(1);
            if !ridge_combinatorial {
                continue;
            }
            if ridge_combinatorial != ridge_arithmetic {
                engine.stats_mut().instability_warnings += 1;
            }

            let delta_p = deltas[&f_p];
            let delta_n = deltas[&f_n];
            let eqn_p = engine.store().facet_eqn(f_p).to_vec();
            let eqn_n = engine.store().facet_eqn(f_n).to_vec();
            // g = -delta_n * f_p + delta_p * f_n passes exactly
            // through w: g.w = -delta_n*delta_p + delta_p*delta_n = 0.
            // Its f_p-coefficient is -delta_n, non-negative since f_n
            // is not on the positive side.
            let new_eqn: Vec<f64> = eqn_p
                .iter()
                .zip(eqn_n.iter())
                .map(|(a, b)| -delta_n * a + delta_p * b)
                .collect();
            new_facets.push((new_eqn, shared));
        }
    }

    let w = engine
        .store_mut()
        .add_vertex(VertexCoords::Finite(w_coords))?;
    engine.stats_mut().vertices_created += 1;

    for fid in &zero {
        engine.store_mut().set_adjacent(w, *fid)?;
    }

    for (eqn, shared) in new_facets {
        let new_fid = engine.store_mut().add_facet(eqn)?;
        engine.stats_mut().facets_created += 1;
        engine.store_mut().set_adjacent(w, new_fid)?;
        for vid in shared.iter_set() {
            engine
                .store_mut()
                .set_adjacent(crate::store::VertexId(vid), new_fid)?;
        }
    }

    for fid in pos {
        engine.store_mut().mark_facet_deleted(fid);
        engine.stats_mut().facets_deleted += 1;
    }

    debug!(
        created_facets = engine.stats().facets_created,
        deleted_facets = engine.stats().facets_deleted,
        "inserted new vertex"
    );

    Ok(())
}
