//! The driver loop: a single-threaded state machine that owns wall
//! clock timing, progress/memory reporting, and the post-extract
//! orchestration, and is the only component that picks an exit kind.

use crate::engine::{Engine, EngineParams, Statistics};
use crate::error::{classify_engine_error, ExitKind};
use crate::oracle::{Oracle, OracleAdapter};
use crate::params::Params;
use crate::store::{FacetStatus, PolytopeStore, VertexCoords};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Init,
    Running,
    Completed,
    Aborted,
    Interrupted,
}

#[derive(Debug)]
pub struct RunReport {
    pub exit_kind: ExitKind,
    pub stats: Statistics,
    pub vertices: Vec<Vec<f64>>,
    pub post_extract_vertices: Vec<Vec<f64>>,
    pub facets: Vec<Vec<f64>>,
}

/// Runs the engine to completion (or interruption), issuing progress
/// reports on the configured cadence and honoring `interrupt_count`
/// between iterations, exactly as specified for the
/// suspension/cancellation model: the only blocking call is the
/// oracle probe, and cancellation is only ever observed between
/// iterations. `interrupt_count` is bumped once per Ctrl-C by the
/// signal handler installed at the CLI boundary; the driver loop
/// never installs its own handler.
pub fn run<O: Oracle>(
    dim: usize,
    params: &Params,
    oracle: &mut OracleAdapter<O>,
    interrupt_count: &Arc<AtomicU32>,
) -> Result<RunReport, ExitKind> {
    let engine_params = EngineParams {
        polytope_eps: params.polytope_eps,
        lineq_eps: params.lineq_eps,
        facet_recalc_eps: params.facet_recalc_eps,
        recalculate_facets: params.recalculate_facets,
        check_consistency: params.check_consistency,
        facet_policy: params.facet_policy(),
        rng_seed: params.rng_seed,
    };

    let mut engine = match Engine::init(dim, engine_params, oracle) {
        Ok(e) => e,
        Err(e) => {
            info!(error = %e, "engine initialization failed");
            return Err(classify_engine_error(&e));
        }
    };

    let start = Instant::now();
    let mut last_report = start;
    let mut state = DriverState::Completed;
    let entered_at = interrupt_count.load(Ordering::Relaxed);

    loop {
        if interrupt_count.load(Ordering::Relaxed) > entered_at {
            state = DriverState::Interrupted;
            break;
        }

        match engine.step(oracle) {
            Ok(true) => {}
            Ok(false) => {
                state = DriverState::Completed;
                break;
            }
            Err(e) => {
                info!(error = %e, "engine aborted");
                return Err(classify_engine_error(&e));
            }
        }

        if let Some(period) = params.progress_report_period {
            if last_report.elapsed() >= period {
                report_progress(&engine, start);
                last_report = Instant::now();
            }
        }
    }

    match state {
        DriverState::Completed => Ok(RunReport {
            exit_kind: ExitKind::Normal,
            stats: engine.stats().clone(),
            vertices: collect_vertices(engine.store()),
            post_extract_vertices: Vec::new(),
            facets: collect_facets(engine.store()),
        }),
        DriverState::Interrupted => {
            // Mirrors `break_inner()`'s gate: post-extract only runs if
            // its result would actually be surfaced somewhere — full
            // (not partial) vertex printing, full vertex saving, or
            // as-found vertex reporting. Otherwise its own vertices
            // would simply be discarded, so it doesn't run at all.
            let do_post_extract = params.extract_after_break
                && (params.print_vertices >= 2
                    || params.save_vertices >= 2
                    || params.report_vertices_as_found);
            if do_post_extract {
                let entered_post_extract_at = interrupt_count.load(Ordering::Relaxed);
                match engine.post_extract(oracle, interrupt_count, entered_post_extract_at) {
                    Ok((extra, aborted_by_second_interrupt)) => Ok(RunReport {
                        exit_kind: if aborted_by_second_interrupt {
                            ExitKind::PostExtractInterrupted
                        } else {
                            ExitKind::Interrupted
                        },
                        stats: engine.stats().clone(),
                        vertices: collect_vertices(engine.store()),
                        post_extract_vertices: extra,
                        facets: collect_facets(engine.store()),
                    }),
                    Err(e) => {
                        info!(error = %e, "post-extract failed");
                        Err(ExitKind::PostExtractError)
                    }
                }
            } else {
                Ok(RunReport {
                    exit_kind: ExitKind::Interrupted,
                    stats: engine.stats().clone(),
                    vertices: collect_vertices(engine.store()),
                    post_extract_vertices: Vec::new(),
                    facets: collect_facets(engine.store()),
                })
            }
        }
        DriverState::Init | DriverState::Running | DriverState::Aborted => {
            unreachable!("loop always exits into Completed or Interrupted")
        }
    }
}

fn report_progress(engine: &Engine, start: Instant) {
    info!(
        elapsed_ms = start.elapsed().as_millis(),
        vertices = engine.store().vertex_num(),
        facets = engine.store().facet_num(),
        iterations = engine.stats().iterations,
        instability_warnings = engine.stats().instability_warnings,
        "progress report"
    );
}

/// Collects every live, finite vertex's coordinates in acceptance
/// order, filtering out the sentinel ideal vertices used only to
/// encode the recession cone.
fn collect_vertices(store: &PolytopeStore) -> Vec<Vec<f64>> {
    store
        .live_vertex_ids()
        .filter_map(|v| match store.vertex_coords(v) {
            VertexCoords::Finite(c) => Some(c.clone()),
            VertexCoords::IdealAxis(_) => None,
        })
        .collect()
}

/// Collects every certified-final facet's equation. Pending facets
/// (never probed to exhaustion, e.g. on an interrupted run) are
/// deliberately excluded: their equation is only a provisional cut,
/// not yet known to bound the true feasible region.
fn collect_facets(store: &PolytopeStore) -> Vec<Vec<f64>> {
    store
        .live_facet_ids()
        .filter(|&f| store.facet_status(f) == FacetStatus::Final)
        .map(|f| store.facet_eqn(f).to_vec())
        .collect()
}
