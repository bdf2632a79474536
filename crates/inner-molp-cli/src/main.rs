mod cli;
mod fraction;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use molp_core::error::ExitKind;
use molp_core::params::{Params, Verbosity};
use molp_core::{driver, oracle, vlp};
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let legacy = cli::prescan(&argv);

    if legacy.want_version {
        println!("inner-molp {} — multi-objective LP inner-approximation solver", molp_core::VERSION);
        return ExitCode::from(0);
    }
    if let Some(topic) = &legacy.help_topic {
        match topic.as_str() {
            "vlp" => print!("{}", cli::VLP_HELP),
            "out" => print!("{}", cli::OUT_HELP),
            _ => print!("{}", cli::LONG_HELP),
        }
        return ExitCode::from(0);
    }
    if legacy.want_long_help {
        print!("{}", cli::LONG_HELP);
        return ExitCode::from(0);
    }
    if legacy.want_short_help {
        println!("{}", cli::SHORT_HELP);
        return ExitCode::from(0);
    }

    let mut clap_argv = vec!["inner-molp".to_string()];
    clap_argv.extend(legacy.remaining.iter().cloned());
    let args = match Args::try_parse_from(&clap_argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };

    if args.dump_config {
        print!("{}", default_config_text());
        return ExitCode::from(0);
    }

    match run(args, legacy) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("inner-molp: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: Args, legacy: cli::LegacyOptions) -> Result<u8> {
    let mut params = Params::default();
    if let Some(config_path) = &args.config {
        let f = File::open(config_path).with_context(|| format!("opening config file {config_path:?}"))?;
        molp_core::params::read_config(BufReader::new(f), &mut params)
            .with_context(|| format!("reading config file {config_path:?}"))?;
    }

    let verbosity = cli::apply_overrides(&mut params, &legacy.overrides)?;
    if let Some(name) = &args.name {
        params.problem_name = name.clone();
    }
    if let Some(t) = args.progress_period {
        params.progress_report_period = if t < 5 { None } else { Some(std::time::Duration::from_secs(t)) };
    }
    if let Some(r) = args.recalc_interval {
        params.recalculate_facets = Params::normalize_round_interval(r);
    }
    if let Some(k) = args.consistency_interval {
        params.check_consistency = Params::normalize_round_interval(k);
    }

    // Mirrors the original CLI's "no file, no save" coercion: a
    // config-file `SaveVertices`/`SaveFacets` value only matters once
    // some `-o`/`-ov`/`-of` path is actually present to write to.
    let has_vertex_file = args.save_both.is_some() || legacy.save_vertices.is_some();
    params.save_vertices = if has_vertex_file {
        if params.save_vertices == 0 { 1 } else { params.save_vertices }
    } else {
        0
    };
    let has_facet_file = args.save_both.is_some() || legacy.save_facets.is_some();
    params.save_facets = if has_facet_file {
        if params.save_facets == 0 { 1 } else { params.save_facets }
    } else {
        0
    };

    init_tracing(verbosity);

    let vlp_path = args
        .vlp_file
        .as_ref()
        .context("missing VLP input file (pass a path, or -h for usage)")?;
    let problem = {
        let f = File::open(vlp_path).with_context(|| format!("opening VLP file {vlp_path:?}"))?;
        vlp::parse(BufReader::new(f)).with_context(|| format!("parsing VLP file {vlp_path:?}"))?
    };

    let oracle_impl = oracle::simplex::SimplexOracle::new(&problem, params.oracle_iteration_limit);
    let oracle_config = oracle::OracleConfig {
        iteration_limit: params.oracle_iteration_limit,
        time_limit: params.oracle_time_limit,
        ..Default::default()
    };
    let mut adapter = oracle::OracleAdapter::new(oracle_impl, oracle_config);

    let interrupt_count = Arc::new(AtomicU32::new(0));
    {
        let flag = Arc::clone(&interrupt_count);
        ctrlc::set_handler(move || {
            flag.fetch_add(1, Ordering::Relaxed);
        })
        .context("installing Ctrl-C handler")?;
    }

    let outcome = driver::run(problem.dim(), &params, &mut adapter, &interrupt_count);

    let (report_result, exit_kind) = match outcome {
        Ok(r) => {
            let kind = r.exit_kind;
            (Ok(r), kind)
        }
        Err(kind) => (Err(()), kind),
    };

    match report_result {
        Ok(r) => {
            report::write_report(&args, &legacy, &params, &problem, &r)?;
        }
        Err(()) => {
            eprintln!("inner-molp: run aborted (exit kind {:?})", exit_kind);
        }
    }

    Ok(exit_kind.code() as u8)
}

fn init_tracing(verbosity: Verbosity) {
    let filter = match verbosity {
        Verbosity::Quiet => "off",
        Verbosity::Errors => "error",
        Verbosity::Normal => "info",
        Verbosity::Verbose => "debug",
    };
    SubscriberBuilder::default()
        .with_target(false)
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

fn default_config_text() -> String {
    let p = Params::default();
    format!(
        "\
# inner-molp default configuration
Verbosity = 2
Name = {}
RandomFacet = 0
ExtractAfterBreak = 1
ReportVerticesAsFound = 1
PrintAsFraction = 1
PrintVertices = 2
PrintFacets = 1
SaveVertices = {}
SaveFacets = {}
RecalculateFacets = {}
CheckConsistency = {}
ProgressReport = 5
PolytopeEps = {}
LineqEps = {}
FacetRecalcEps = {}
OracleItLimit = {}
OracleTimeLimit = {}
",
        p.problem_name,
        p.save_vertices,
        p.save_facets,
        p.recalculate_facets,
        p.check_consistency,
        p.polytope_eps,
        p.lineq_eps,
        p.facet_recalc_eps,
        p.oracle_iteration_limit,
        p.oracle_time_limit.as_secs(),
    )
}

