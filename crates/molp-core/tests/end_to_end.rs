//! End-to-end scenarios exercising the full `vlp::parse` →
//! `SimplexOracle` → `driver::run` pipeline against small,
//! hand-verifiable multi-objective linear programs.

use molp_core::driver::{self, RunReport};
use molp_core::engine::{Engine, EngineParams};
use molp_core::error::ExitKind;
use molp_core::oracle::simplex::SimplexOracle;
use molp_core::oracle::{OracleAdapter, OracleConfig};
use molp_core::params::Params;
use molp_core::store::VertexCoords;
use molp_core::vlp::{self, Direction, Problem};
use std::io::Cursor;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

fn parse(text: &str) -> Problem {
    vlp::parse(Cursor::new(text.as_bytes())).unwrap()
}

fn oracle_for(problem: &Problem, params: &Params) -> OracleAdapter<SimplexOracle> {
    let inner = SimplexOracle::new(problem, params.oracle_iteration_limit);
    OracleAdapter::new(
        inner,
        OracleConfig {
            iteration_limit: params.oracle_iteration_limit,
            time_limit: params.oracle_time_limit,
            ..Default::default()
        },
    )
}

fn run(problem: &Problem, params: &Params) -> Result<RunReport, ExitKind> {
    let mut oracle = oracle_for(problem, params);
    let interrupt = Arc::new(AtomicU32::new(0));
    driver::run(problem.dim(), params, &mut oracle, &interrupt)
}

/// Undoes the oracle's internal max-orientation sign flip, the same
/// way the CLI's report writer does, so assertions can be written
/// against the problem's own declared direction.
fn to_user_orientation(problem: &Problem, coords: &[f64]) -> Vec<f64> {
    let sign = match problem.direction {
        Direction::Min => -1.0,
        Direction::Max => 1.0,
    };
    coords.iter().map(|&c| sign * c).collect()
}

fn contains_point(vertices: &[Vec<f64>], expected: &[f64], eps: f64) -> bool {
    vertices.iter().any(|v| {
        v.len() == expected.len() && v.iter().zip(expected).all(|(a, b)| (a - b).abs() <= eps)
    })
}

#[test]
fn scenario_1_unit_square_min_sum() {
    let problem = parse(
        "\
p vlp min 0 2 0 2 2
j 1 d 0 1
j 2 d 0 1
o 1 1 1
o 2 2 1
e
",
    );
    let report = run(&problem, &Params::default()).unwrap();
    assert_eq!(report.exit_kind, ExitKind::Normal);
    let vertices: Vec<Vec<f64>> = report
        .vertices
        .iter()
        .map(|v| to_user_orientation(&problem, v))
        .collect();
    assert_eq!(vertices.len(), 1, "expected a single non-dominated point: {vertices:?}");
    assert!(contains_point(&vertices, &[0.0, 0.0], 1e-6));
}

#[test]
fn scenario_2_two_objective_tradeoff() {
    let problem = parse(
        "\
p vlp max 2 2 4 2 4
i 1 u 1
i 2 u 1
j 1 l 0
j 2 l 0
a 1 1 1
a 1 2 1
a 2 1 1
a 2 2 -1
o 1 1 1
o 1 2 1
o 2 1 1
o 2 2 -1
e
",
    );
    let report = run(&problem, &Params::default()).unwrap();
    assert_eq!(report.exit_kind, ExitKind::Normal);
    let vertices: Vec<Vec<f64>> = report
        .vertices
        .iter()
        .map(|v| to_user_orientation(&problem, v))
        .collect();
    assert!(contains_point(&vertices, &[1.0, 1.0], 1e-6), "{vertices:?}");
    assert!(contains_point(&vertices, &[1.0, -1.0], 1e-6), "{vertices:?}");
    assert!(contains_point(&vertices, &[0.0, 0.0], 1e-6), "{vertices:?}");
}

#[test]
fn scenario_3_three_objective_cube() {
    let problem = parse(
        "\
p vlp max 0 3 0 3 3
j 1 d 0 1
j 2 d 0 1
j 3 d 0 1
o 1 1 1
o 2 2 1
o 3 3 1
e
",
    );
    let report = run(&problem, &Params::default()).unwrap();
    assert_eq!(report.exit_kind, ExitKind::Normal);
    let vertices: Vec<Vec<f64>> = report
        .vertices
        .iter()
        .map(|v| to_user_orientation(&problem, v))
        .collect();
    assert_eq!(vertices.len(), 1, "{vertices:?}");
    assert!(contains_point(&vertices, &[1.0, 1.0, 1.0], 1e-6));
    assert_eq!(report.facets.len(), 3, "expected three axis-aligned final facets");
}

#[test]
fn scenario_4_unbounded_direction_is_a_fatal_numerical_error() {
    // The VLP format's direction is global, so "max x, min y" is
    // expressed here as "max (x, -y)" — maximizing a negated
    // objective is the format's way of saying "minimize" it. The
    // all-ones probe direction then maximizes x - y, unbounded since
    // x has no upper bound.
    let problem = parse(
        "\
p vlp max 0 2 0 2 2
j 1 l 0
j 2 l 0
o 1 1 1
o 2 2 -1
e
",
    );
    let err = run(&problem, &Params::default()).unwrap_err();
    assert_eq!(err, ExitKind::NumericalError);
}

#[test]
fn scenario_5_interrupted_run_reports_a_subset_of_the_full_vertex_set() {
    let problem = parse(
        "\
p vlp max 0 3 0 3 3
j 1 d 0 1
j 2 d 0 1
j 3 d 0 1
o 1 1 1
o 2 2 1
o 3 3 1
e
",
    );
    let full = run(&problem, &Params::default()).unwrap();
    assert_eq!(full.exit_kind, ExitKind::Normal);
    let full_user: Vec<Vec<f64>> = full
        .vertices
        .iter()
        .map(|v| to_user_orientation(&problem, v))
        .collect();

    // Simulates "interrupted after K iterations" directly against the
    // `Engine` API (the cube converges in too few iterations for a
    // driver-loop-level race to be reliable): run two iterations, then
    // hand post-extract an interrupt count that has not yet advanced
    // past its own entry point, so it runs to completion rather than
    // aborting early.
    let mut oracle = oracle_for(&problem, &Params::default());
    let mut engine = Engine::init(problem.dim(), EngineParams::default(), &mut oracle).unwrap();
    for _ in 0..2 {
        if !engine.step(&mut oracle).unwrap() {
            break;
        }
    }
    let interrupt = AtomicU32::new(0);
    let (extra, aborted) = engine.post_extract(&mut oracle, &interrupt, 0).unwrap();
    assert!(!aborted);

    let store = engine.store();
    let mut partial: Vec<Vec<f64>> = store
        .live_vertex_ids()
        .filter_map(|v| match store.vertex_coords(v) {
            VertexCoords::Finite(c) => Some(c.clone()),
            VertexCoords::IdealAxis(_) => None,
        })
        .collect();
    partial.extend(extra);

    for v in &partial {
        let v = to_user_orientation(&problem, v);
        assert!(
            contains_point(&full_user, &v, 1e-6),
            "interrupted run produced a vertex not present in the full run: {v:?}"
        );
    }
}

#[test]
fn scenario_6_periodic_recalculation_does_not_destabilize_the_cube() {
    let problem = parse(
        "\
p vlp max 0 3 0 3 3
j 1 d 0 1
j 2 d 0 1
j 3 d 0 1
o 1 1 1
o 2 2 1
o 3 3 1
e
",
    );
    let mut params = Params::default();
    params.recalculate_facets = Params::normalize_round_interval(5);
    let report = run(&problem, &params).unwrap();
    assert_eq!(report.exit_kind, ExitKind::Normal);
    assert_eq!(report.stats.instability_warnings, 0);
}

#[test]
fn triangle_tradeoff_insertion_does_not_spuriously_warn() {
    // Scenario 2's trade-off problem forces at least one real
    // `insert_vertex` call (the triangle has more than the initial
    // d+1 simplex vertices), unlike the axis-aligned box fixtures
    // where every probed facet finalizes directly.
    let problem = parse(
        "\
p vlp max 2 2 4 2 4
i 1 u 1
i 2 u 1
j 1 l 0
j 2 l 0
a 1 1 1
a 1 2 1
a 2 1 1
a 2 2 -1
o 1 1 1
o 1 2 1
o 2 1 1
o 2 2 -1
e
",
    );
    let report = run(&problem, &Params::default()).unwrap();
    assert_eq!(report.exit_kind, ExitKind::Normal);
    assert_eq!(
        report.stats.instability_warnings, 0,
        "ordinary non-degenerate insertion should never disagree with the ridge test"
    );
}

#[test]
fn oracle_adapter_tracks_calls_across_a_whole_run() {
    let problem = parse("p vlp max 0 1 0 1 1\nj 1 d 0 1\no 1 1 1\ne\n");
    let mut oracle = oracle_for(&problem, &Params::default());
    let interrupt = Arc::new(AtomicU32::new(0));
    let _ = driver::run(problem.dim(), &Params::default(), &mut oracle, &interrupt).unwrap();
    assert!(oracle.call_count() >= 1);
    let _ = oracle.probe(&[1.0]);
}
