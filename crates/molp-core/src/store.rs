//! The polytope store: owns the vertex and facet tables and the two
//! adjacency bitmaps that keep them in sync.
//!
//! The DD engine holds one exclusive `&mut PolytopeStore` for the
//! duration of a driver iteration; nothing else is allowed to touch
//! the adjacency bitmaps.

use crate::bitmatrix::{BitMatrix, BitMatrixError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("allocation failure in polytope store: {0}")]
    OutOfMemory(#[from] BitMatrixError),
}

/// Stable handle to a vertex row. Never reused within a run; indices
/// assigned by `compress` are a fresh renumbering, but relative order
/// among survivors is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FacetId(pub usize);

/// A vertex's coordinates: either a finite point, or a sentinel
/// recession-cone direction introduced for the initial simplex.
/// Keeping this as a tagged enum means arithmetic code never has to
/// special-case a magic "infinity" float value.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexCoords {
    Finite(Vec<f64>),
    /// Recession direction along coordinate axis `axis`, one of the
    /// `d` ideal vertices synthesised at initialization.
    IdealAxis(usize),
}

impl VertexCoords {
    pub fn as_finite(&self) -> Option<&[f64]> {
        match self {
            VertexCoords::Finite(c) => Some(c),
            VertexCoords::IdealAxis(_) => None,
        }
    }

    pub fn is_ideal(&self) -> bool {
        matches!(self, VertexCoords::IdealAxis(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexStatus {
    Live,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetStatus {
    Pending,
    Final,
    Deleted,
}

struct VertexRow {
    coords: VertexCoords,
    status: VertexStatus,
}

struct FacetRow {
    /// `d+1` coefficients: `eqn[..d]` is the normal, `eqn[d]` the offset.
    eqn: Vec<f64>,
    status: FacetStatus,
}

/// Owns the vertex table, the facet table, and the two adjacency
/// bitmaps (vertex→facet and facet→vertex), which are always kept
/// symmetric.
pub struct PolytopeStore {
    dim: usize,
    vertices: Vec<VertexRow>,
    facets: Vec<FacetRow>,
    v2f: BitMatrix,
    f2v: BitMatrix,
    /// Bumped on every growth of either table; the driver loop polls
    /// this to decide whether a memory report is due.
    generation: u64,
}

impl PolytopeStore {
    pub fn new(dim: usize) -> Self {
        PolytopeStore {
            dim,
            vertices: Vec::new(),
            facets: Vec::new(),
            v2f: BitMatrix::new(),
            f2v: BitMatrix::new(),
            generation: 0,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn add_vertex(&mut self, coords: VertexCoords) -> Result<VertexId, StoreError> {
        let id = self.vertices.len();
        self.vertices.push(VertexRow {
            coords,
            status: VertexStatus::Live,
        });
        let row = self.v2f.push_row();
        debug_assert_eq!(row, id);
        self.generation += 1;
        Ok(VertexId(id))
    }

    pub fn add_facet(&mut self, eqn: Vec<f64>) -> Result<FacetId, StoreError> {
        debug_assert_eq!(eqn.len(), self.dim + 1);
        let id = self.facets.len();
        self.facets.push(FacetRow {
            eqn,
            status: FacetStatus::Pending,
        });
        let row = self.f2v.push_row();
        debug_assert_eq!(row, id);
        self.generation += 1;
        Ok(FacetId(id))
    }

    pub fn set_adjacent(&mut self, vid: VertexId, fid: FacetId) -> Result<(), StoreError> {
        self.v2f.set(vid.0, fid.0)?;
        self.f2v.set(fid.0, vid.0)?;
        Ok(())
    }

    pub fn clear_adjacent(&mut self, vid: VertexId, fid: FacetId) {
        self.v2f.clear(vid.0, fid.0);
        self.f2v.clear(fid.0, vid.0);
    }

    pub fn is_adjacent(&self, vid: VertexId, fid: FacetId) -> bool {
        self.v2f.test(vid.0, fid.0)
    }

    pub fn mark_facet_final(&mut self, fid: FacetId) {
        self.facets[fid.0].status = FacetStatus::Final;
    }

    pub fn mark_facet_deleted(&mut self, fid: FacetId) {
        self.facets[fid.0].status = FacetStatus::Deleted;
    }

    pub fn mark_vertex_deleted(&mut self, vid: VertexId) {
        self.vertices[vid.0].status = VertexStatus::Deleted;
    }

    pub fn facet_status(&self, fid: FacetId) -> FacetStatus {
        self.facets[fid.0].status
    }

    pub fn vertex_status(&self, vid: VertexId) -> VertexStatus {
        self.vertices[vid.0].status
    }

    pub fn facet_eqn(&self, fid: FacetId) -> &[f64] {
        &self.facets[fid.0].eqn
    }

    pub fn set_facet_eqn(&mut self, fid: FacetId, eqn: Vec<f64>) {
        debug_assert_eq!(eqn.len(), self.dim + 1);
        self.facets[fid.0].eqn = eqn;
    }

    pub fn vertex_coords(&self, vid: VertexId) -> &VertexCoords {
        &self.vertices[vid.0].coords
    }

    /// Signed distance of `vid` from `fid`'s hyperplane. Ideal vertices
    /// use the facet's leading normal coefficient along the sentinel's
    /// axis (the homogeneous limit as the coordinate tends to infinity).
    pub fn signed_distance(&self, fid: FacetId, vid: VertexId) -> f64 {
        let eqn = self.facet_eqn(fid);
        match self.vertex_coords(vid) {
            VertexCoords::Finite(c) => {
                let mut acc = eqn[self.dim];
                for i in 0..self.dim {
                    acc += eqn[i] * c[i];
                }
                acc
            }
            VertexCoords::IdealAxis(axis) => eqn[*axis],
        }
    }

    pub fn vertices_on(&self, fid: FacetId) -> impl Iterator<Item = VertexId> + '_ {
        self.f2v.row(fid.0).iter_set().map(VertexId)
    }

    pub fn facets_through(&self, vid: VertexId) -> impl Iterator<Item = FacetId> + '_ {
        self.v2f.row(vid.0).iter_set().map(FacetId)
    }

    pub fn vertex_adj_row(&self, vid: VertexId) -> &crate::bitmatrix::BitRow {
        self.v2f.row(vid.0)
    }

    pub fn facet_adj_row(&self, fid: FacetId) -> &crate::bitmatrix::BitRow {
        self.f2v.row(fid.0)
    }

    pub fn vertex_num(&self) -> usize {
        self.vertices
            .iter()
            .filter(|v| v.status == VertexStatus::Live)
            .count()
    }

    pub fn facet_num(&self) -> usize {
        self.facets
            .iter()
            .filter(|f| f.status != FacetStatus::Deleted)
            .count()
    }

    pub fn live_facet_ids(&self) -> impl Iterator<Item = FacetId> + '_ {
        self.facets.iter().enumerate().filter_map(|(i, f)| {
            if f.status != FacetStatus::Deleted {
                Some(FacetId(i))
            } else {
                None
            }
        })
    }

    pub fn pending_facet_ids(&self) -> impl Iterator<Item = FacetId> + '_ {
        self.facets.iter().enumerate().filter_map(|(i, f)| {
            if f.status == FacetStatus::Pending {
                Some(FacetId(i))
            } else {
                None
            }
        })
    }

    pub fn live_vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().enumerate().filter_map(|(i, v)| {
            if v.status == VertexStatus::Live {
                Some(VertexId(i))
            } else {
                None
            }
        })
    }

    /// Removes tombstoned rows and renumbers remaining handles,
    /// preserving relative order. All previously issued `VertexId`s
    /// and `FacetId`s become invalid after this call.
    pub fn compress(&mut self) -> Result<(), StoreError> {
        let keep_v: Vec<usize> = self
            .vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.status == VertexStatus::Live)
            .map(|(i, _)| i)
            .collect();
        let keep_f: Vec<usize> = self
            .facets
            .iter()
            .enumerate()
            .filter(|(_, f)| f.status != FacetStatus::Deleted)
            .map(|(i, _)| i)
            .collect();

        let new_vertices: Vec<VertexRow> = keep_v
            .iter()
            .map(|&old_vi| VertexRow {
                coords: self.vertices[old_vi].coords.clone(),
                status: VertexStatus::Live,
            })
            .collect();
        let new_facets: Vec<FacetRow> = keep_f
            .iter()
            .map(|&old_fi| FacetRow {
                eqn: self.facets[old_fi].eqn.clone(),
                status: self.facets[old_fi].status,
            })
            .collect();

        let new_v2f = self.v2f.compress(&keep_v, &keep_f)?;
        let new_f2v = self.f2v.compress(&keep_f, &keep_v)?;

        self.vertices = new_vertices;
        self.facets = new_facets;
        self.v2f = new_v2f;
        self.f2v = new_f2v;
        self.generation += 1;
        Ok(())
    }

    /// Debug-only invariant check: bitmap symmetry, no adjacency to a
    /// deleted row, and popcount of every live facet row >= d.
    #[cfg(debug_assertions)]
    pub fn assert_invariants(&self) {
        for vid in self.live_vertex_ids() {
            for fid in self.facets_through(vid) {
                assert!(
                    self.is_adjacent(vid, fid),
                    "asymmetric adjacency for vertex {}",
                    vid.0
                );
                assert_ne!(
                    self.facet_status(fid),
                    FacetStatus::Deleted,
                    "vertex {} adjacent to deleted facet {}",
                    vid.0,
                    fid.0
                );
            }
        }
        for fid in self.live_facet_ids() {
            let count = self.vertices_on(fid).count();
            assert!(
                count >= self.dim,
                "facet {} has only {} adjacent vertices, need >= {}",
                fid.0,
                count,
                self.dim
            );
            for vid in self.vertices_on(fid) {
                assert_ne!(
                    self.vertex_status(vid),
                    VertexStatus::Deleted,
                    "facet {} adjacent to deleted vertex {}",
                    fid.0,
                    vid.0
                );
            }
        }
    }
}
