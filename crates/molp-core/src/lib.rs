//! Core library for approximating the Pareto frontier of a
//! multi-objective linear program via Benson's inner-approximation
//! (double-description) method.
//!
//! Modules are organized leaf-first: [`bitmatrix`] has no internal
//! dependencies, [`store`] builds on it, [`engine`] builds on
//! [`store`] and [`oracle`], and [`driver`] ties the engine to a
//! configured [`Oracle`](oracle::Oracle) and reports a single
//! [`error::ExitKind`].

pub mod bitmatrix;
pub mod driver;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod params;
pub mod store;
pub mod vlp;

pub mod prelude {
    pub use crate::driver::{run, RunReport};
    pub use crate::engine::{Engine, EngineError, EngineParams, Statistics};
    pub use crate::error::ExitKind;
    pub use crate::oracle::simplex::SimplexOracle;
    pub use crate::oracle::{Oracle, OracleAdapter, OracleConfig, OracleError};
    pub use crate::params::Params;
    pub use crate::store::{FacetId, PolytopeStore, VertexCoords, VertexId};
    pub use crate::vlp::{parse as parse_vlp, Problem};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
