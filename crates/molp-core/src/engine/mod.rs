//! The double-description engine: drives the polytope store from the
//! initial simplex to full certification by repeatedly probing the
//! oracle and inserting whatever vertex it returns.

mod consistency;
mod insert;
mod recalc;

use crate::bitmatrix::BitMatrixError;
use crate::oracle::{Oracle, OracleAdapter, OracleError};
use crate::store::{FacetId, PolytopeStore, StoreError, VertexCoords, VertexId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("numerical inconsistency: {0}")]
    Numerical(String),
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] BitMatrixError),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OutOfMemory(inner) => EngineError::OutOfMemory(inner),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetPolicy {
    Fifo,
    Random,
}

/// Tunable tolerances and periodic-maintenance intervals the engine
/// consults every iteration. `0` disables the corresponding periodic
/// maintenance pass entirely (distinct from "below the floor", which
/// is rewritten to the floor of `5` by the configuration layer before
/// it ever reaches the engine).
#[derive(Debug, Clone)]
pub struct EngineParams {
    pub polytope_eps: f64,
    pub lineq_eps: f64,
    pub facet_recalc_eps: f64,
    pub recalculate_facets: usize,
    pub check_consistency: usize,
    pub facet_policy: FacetPolicy,
    pub rng_seed: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        EngineParams {
            polytope_eps: 1.3e-8,
            lineq_eps: 8e-8,
            facet_recalc_eps: 1e-6,
            recalculate_facets: 100,
            check_consistency: 0,
            facet_policy: FacetPolicy::Fifo,
            rng_seed: 0,
        }
    }
}

/// Engine-local counters, replacing the process-global statistics
/// table of a hand-rolled C implementation with an owned value passed
/// by reference into the driver loop.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub vertices_created: u64,
    pub facets_created: u64,
    pub facets_deleted: u64,
    pub iterations: u64,
    pub recalculations: u64,
    pub consistency_checks: u64,
    pub instability_warnings: u64,
}

pub struct Engine {
    store: PolytopeStore,
    dim: usize,
    params: EngineParams,
    stats: Statistics,
    rng: StdRng,
}

impl Engine {
    /// Builds the initial `d`-simplex from the oracle's response to
    /// the all-ones probe direction, per the initialization recipe:
    /// `d` coordinate facets touching `v0`, plus one facet opposite
    /// `v0` through the `d` ideal vertices.
    pub fn init<O: Oracle>(
        dim: usize,
        params: EngineParams,
        oracle: &mut OracleAdapter<O>,
    ) -> Result<Self, EngineError> {
        if dim == 1 {
            return Self::init_single_objective(params, oracle);
        }

        let probe_dir = vec![1.0; dim];
        let v0_coords = oracle.probe(&probe_dir)?;
        let mut store = PolytopeStore::new(dim);
        let rng = StdRng::seed_from_u64(params.rng_seed);

        let v0 = store.add_vertex(VertexCoords::Finite(v0_coords.clone()))?;
        let idealv: Vec<VertexId> = (0..dim)
            .map(|axis| store.add_vertex(VertexCoords::IdealAxis(axis)))
            .collect::<Result<_, _>>()?;

        let mut coord_facets = Vec::with_capacity(dim);
        for i in 0..dim {
            let mut eqn = vec![0.0; dim + 1];
            eqn[i] = 1.0;
            eqn[dim] = -v0_coords[i];
            let fid = store.add_facet(eqn)?;
            coord_facets.push(fid);
        }
        let mut g_eqn = vec![1.0; dim + 1];
        g_eqn[dim] = -(v0_coords.iter().sum::<f64>() + 1.0);
        let g = store.add_facet(g_eqn)?;

        for i in 0..dim {
            store.set_adjacent(v0, coord_facets[i])?;
            for j in 0..dim {
                if i != j {
                    store.set_adjacent(idealv[i], coord_facets[j])?;
                }
            }
            store.set_adjacent(idealv[i], g)?;
        }

        let mut stats = Statistics::default();
        stats.vertices_created = (dim + 1) as u64;
        stats.facets_created = (dim + 1) as u64;

        Ok(Engine {
            store,
            dim,
            params,
            stats,
            rng,
        })
    }

    /// Degenerate `d=1` case called out explicitly by the boundary
    /// behaviors: a single-objective LP's image is an interval, not a
    /// polytope with a recession cone, so the general ridge-insertion
    /// machinery (which assumes `d >= 2` for a ridge to even exist) is
    /// skipped. Two probes in the only two directions of the
    /// one-dimensional canonical objective space produce the interval's
    /// endpoints directly, already final, with nothing left pending.
    fn init_single_objective<O: Oracle>(
        params: EngineParams,
        oracle: &mut OracleAdapter<O>,
    ) -> Result<Self, EngineError> {
        let hi = oracle.probe(&[1.0])?[0];
        let lo = -oracle.probe(&[-1.0])?[0];
        let mut store = PolytopeStore::new(1);
        let rng = StdRng::seed_from_u64(params.rng_seed);
        let mut stats = Statistics::default();

        let v_hi = store.add_vertex(VertexCoords::Finite(vec![hi]))?;
        let f_hi = store.add_facet(vec![1.0, -hi])?;
        store.set_adjacent(v_hi, f_hi)?;
        store.mark_facet_final(f_hi);
        stats.vertices_created += 1;
        stats.facets_created += 1;

        if (hi - lo).abs() > params.polytope_eps {
            let v_lo = store.add_vertex(VertexCoords::Finite(vec![lo]))?;
            let f_lo = store.add_facet(vec![-1.0, lo])?;
            store.set_adjacent(v_lo, f_lo)?;
            store.mark_facet_final(f_lo);
            stats.vertices_created += 1;
            stats.facets_created += 1;
        }

        Ok(Engine {
            store,
            dim: 1,
            params,
            stats,
            rng,
        })
    }

    pub fn store(&self) -> &PolytopeStore {
        &self.store
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn has_pending(&self) -> bool {
        self.store.pending_facet_ids().next().is_some()
    }

    fn select_pending(&mut self) -> Option<FacetId> {
        match self.params.facet_policy {
            FacetPolicy::Fifo => self.store.pending_facet_ids().next(),
            FacetPolicy::Random => {
                let pending: Vec<FacetId> = self.store.pending_facet_ids().collect();
                if pending.is_empty() {
                    None
                } else {
                    let idx = self.rng.gen_range(0..pending.len());
                    Some(pending[idx])
                }
            }
        }
    }

    /// Runs one main-loop iteration: select, probe, classify, and
    /// either finalize the facet or insert the returned vertex.
    /// Returns `true` if an iteration actually ran (there was a
    /// pending facet), `false` if the loop has already converged.
    pub fn step<O: Oracle>(&mut self, oracle: &mut OracleAdapter<O>) -> Result<bool, EngineError> {
        let fid = match self.select_pending() {
            Some(f) => f,
            None => return Ok(false),
        };
        self.stats.iterations += 1;

        let normal = &self.store.facet_eqn(fid)[..self.dim];
        let w_coords = oracle.probe(normal)?;

        let delta = {
            let eqn = self.store.facet_eqn(fid);
            let mut acc = eqn[self.dim];
            for i in 0..self.dim {
                acc += eqn[i] * w_coords[i];
            }
            acc
        };

        if delta > self.params.polytope_eps {
            return Err(EngineError::Numerical(format!(
                "oracle returned a point on the wrong side of facet {} (delta={delta})",
                fid.0
            )));
        }

        if delta.abs() <= self.params.polytope_eps {
            self.store.mark_facet_final(fid);
            debug!(facet = fid.0, "facet certified final");
        } else {
            insert::insert_vertex(self, w_coords)?;
        }

        self.after_iteration()?;
        Ok(true)
    }

    /// Periodic maintenance common to both the "mark final" and
    /// "insert" branches: recalculation and consistency passes, run
    /// on their own cadences.
    fn after_iteration(&mut self) -> Result<(), EngineError> {
        if self.params.recalculate_facets >= 5 && self.stats.iterations % self.params.recalculate_facets as u64 == 0
        {
            recalc::recalculate_facets(self)?;
        }
        if self.params.check_consistency >= 5 && self.stats.iterations % self.params.check_consistency as u64 == 0 {
            consistency::check(self)?;
        }
        Ok(())
    }

    /// Post-extract pass entered on interrupt: probe every currently
    /// live facet (pending or final) and record any new vertex found
    /// via `store_vertex` only, without extending adjacency or
    /// cutting facets. `interrupt_count` is a monotonically
    /// incrementing counter (bumped once per Ctrl-C by the signal
    /// handler); a rise above `entered_at` mid-pass is a second
    /// interrupt and aborts the pass early. Returns the vertices found
    /// plus whether a second interrupt cut the pass short.
    pub fn post_extract<O: Oracle>(
        &mut self,
        oracle: &mut OracleAdapter<O>,
        interrupt_count: &std::sync::atomic::AtomicU32,
        entered_at: u32,
    ) -> Result<(Vec<Vec<f64>>, bool), EngineError> {
        use std::sync::atomic::Ordering;
        let mut found = Vec::new();
        let live: Vec<FacetId> = self.store.live_facet_ids().collect();
        for fid in live {
            if interrupt_count.load(Ordering::Relaxed) > entered_at {
                warn!("second interrupt observed during post-extract, aborting");
                return Ok((found, true));
            }
            let normal = self.store.facet_eqn(fid)[..self.dim].to_vec();
            match oracle.probe(&normal) {
                Ok(w) => found.push(w),
                Err(OracleError::Fail) | Err(OracleError::Limit) => continue,
                Err(e) => return Err(EngineError::from(e)),
            }
        }
        Ok((found, false))
    }

    pub(crate) fn dim(&self) -> usize {
        self.dim
    }

    pub(crate) fn params(&self) -> &EngineParams {
        &self.params
    }

    pub(crate) fn store_mut(&mut self) -> &mut PolytopeStore {
        &mut self.store
    }

    pub(crate) fn stats_mut(&mut self) -> &mut Statistics {
        &mut self.stats
    }
}
