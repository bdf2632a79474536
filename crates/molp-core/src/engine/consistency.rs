//! Consistency check: periodically re-verifies the invariants the
//! combinatorial update logic is supposed to maintain by construction,
//! catching silent drift before it corrupts the rest of the run.

use super::{Engine, EngineError};
use crate::store::VertexCoords;

pub(super) fn check(engine: &mut Engine) -> Result<(), EngineError> {
    let dim = engine.dim();
    let eps = engine.params().polytope_eps;

    // (a) bitmap symmetry.
    for vid in engine.store().live_vertex_ids() {
        for fid in engine.store().facets_through(vid) {
            if !engine.store().is_adjacent(vid, fid) {
                return Err(EngineError::Numerical(format!(
                    "adjacency asymmetry between vertex {} and facet {}",
                    vid.0, fid.0
                )));
            }
        }
    }

    // (b) every live finite vertex lies within PolytopeEps of every
    // facet it is adjacent to. Ideal vertices are symbolic recession
    // markers, not literal points, and are exempt from this check.
    for vid in engine.store().live_vertex_ids() {
        if let VertexCoords::IdealAxis(_) = engine.store().vertex_coords(vid) {
            continue;
        }
        for fid in engine.store().facets_through(vid) {
            let dist = engine.store().signed_distance(fid, vid);
            if dist.abs() > eps {
                return Err(EngineError::Numerical(format!(
                    "vertex {} lies {} from facet {} it is adjacent to",
                    vid.0, dist, fid.0
                )));
            }
        }
    }

    // (c) every live facet has >= d adjacent live vertices.
    for fid in engine.store().live_facet_ids() {
        let count = engine.store().vertices_on(fid).count();
        if count < dim {
            return Err(EngineError::Numerical(format!(
                "facet {} has only {} adjacent vertices, need >= {}",
                fid.0, count, dim
            )));
        }
    }

    // (d) the recession cone is still correctly attached: every ideal
    // vertex remains live and adjacent to at least `dim - 1` facets,
    // matching its role in the original simplex construction.
    for vid in engine.store().live_vertex_ids() {
        if matches!(engine.store().vertex_coords(vid), VertexCoords::IdealAxis(_)) {
            let count = engine.store().facets_through(vid).count();
            if count < dim.saturating_sub(1) {
                return Err(EngineError::Numerical(format!(
                    "ideal vertex {} lost recession-cone attachment ({} adjacent facets)",
                    vid.0, count
                )));
            }
        }
    }

    engine.stats_mut().consistency_checks += 1;
    Ok(())
}
