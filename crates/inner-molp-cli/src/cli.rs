//! Command-line surface: a `clap` derive struct for the modern subset
//! of flags, plus hand-rolled pre-parsing of the legacy single-dash
//! flags and the free-form `--KEYWORD=VALUE` override, ahead of
//! `clap::Parser::parse`, the way a hybrid legacy-flag CLI has to.

use anyhow::{Context, Result};
use clap::Parser;
use molp_core::params::{apply_keyword, Params, Verbosity};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "inner-molp", disable_help_flag = true, disable_version_flag = true)]
pub struct Args {
    #[arg(long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    #[arg(short = 'o')]
    pub save_both: Option<PathBuf>,

    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,

    #[arg(short = 'p')]
    pub progress_period: Option<u64>,

    #[arg(short = 'r')]
    pub recalc_interval: Option<usize>,

    #[arg(short = 'k')]
    pub consistency_interval: Option<usize>,

    #[arg(long = "dump")]
    pub dump_config: bool,

    pub vlp_file: Option<PathBuf>,
}

/// Outcome of pre-parsing the legacy single-dash flags and
/// `--KEYWORD=VALUE` overrides, applied to `Params` before the
/// `clap`-derived subset is consulted.
pub struct LegacyOptions {
    pub want_short_help: bool,
    pub want_long_help: bool,
    pub help_topic: Option<String>,
    pub want_version: bool,
    pub save_vertices: Option<PathBuf>,
    pub save_facets: Option<PathBuf>,
    pub overrides: Vec<(String, String)>,
    pub remaining: Vec<String>,
}

/// Scans raw `argv` (excluding argv[0]) for the flags `clap`'s derive
/// API cannot express cleanly: `-h`, `--help[=topic]`, `--version`,
/// `-ov`/`-of` (multi-letter single-dash, space-separated value),
/// `-m0..-m3`, `-q`, `-y+`/`-y-`, and `--KEYWORD=VALUE`. Everything
/// else passes through untouched for `Args::parse` to consume.
pub fn prescan(argv: &[String]) -> LegacyOptions {
    let mut out = LegacyOptions {
        want_short_help: argv.is_empty(),
        want_long_help: false,
        help_topic: None,
        want_version: false,
        save_vertices: None,
        save_facets: None,
        overrides: Vec::new(),
        remaining: Vec::new(),
    };

    let mut it = argv.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" => out.want_short_help = true,
            "--help" => out.want_long_help = true,
            "--version" => out.want_version = true,
            "-q" => out.overrides.push(("Verbosity".to_string(), "0".to_string())),
            "-m0" => out.overrides.push(("Verbosity".to_string(), "0".to_string())),
            "-m1" => out.overrides.push(("Verbosity".to_string(), "1".to_string())),
            "-m2" => out.overrides.push(("Verbosity".to_string(), "2".to_string())),
            "-m3" => out.overrides.push(("Verbosity".to_string(), "3".to_string())),
            "-y+" => out
                .overrides
                .push(("ReportVerticesAsFound".to_string(), "1".to_string())),
            "-y-" => out
                .overrides
                .push(("ReportVerticesAsFound".to_string(), "0".to_string())),
            "-ov" => out.save_vertices = it.next().map(PathBuf::from),
            "-of" => out.save_facets = it.next().map(PathBuf::from),
            other if other.starts_with("--help=") => {
                out.help_topic = Some(other["--help=".len()..].to_string());
            }
            other if other.starts_with("--") && other.contains('=') && !is_known_long_flag(other) => {
                let rest = &other[2..];
                if let Some((k, v)) = rest.split_once('=') {
                    out.overrides.push((k.to_string(), v.to_string()));
                    continue;
                }
                out.remaining.push(arg.clone());
            }
            _ => out.remaining.push(arg.clone()),
        }
    }

    out
}

fn is_known_long_flag(flag: &str) -> bool {
    flag.starts_with("--config=") || flag.starts_with("--name=")
}

/// Applies the verbosity-and-friends overrides collected by
/// [`prescan`] to `params`, returning the CLI's chosen verbosity
/// separately since it also drives the `tracing` subscriber, not just
/// `Params`.
pub fn apply_overrides(params: &mut Params, overrides: &[(String, String)]) -> Result<Verbosity> {
    for (k, v) in overrides {
        apply_keyword(params, 0, k, v).with_context(|| format!("applying --{k}={v}"))?;
    }
    Ok(params.verbosity)
}

pub const SHORT_HELP: &str = "usage: inner-molp [options] <vlp-file>\nrun `inner-molp --help` for the full option list.";

pub const LONG_HELP: &str = "\
inner-molp [options] <vlp-file>

  -h                   short help
  --help               this text
  --help=vlp           VLP input format help
  --help=out           output format help
  --version            version and copyright
  --dump               print the default configuration file and exit
  -c FILE, --config=FILE
                       read configuration from FILE
  -o FILE              save vertices and facets to FILE
  -ov FILE             save vertices only
  -of FILE             save facets only
  -n NAME, --name=NAME problem name
  -m0..-m3             message verbosity (0=quiet .. 3=verbose)
  -q                   alias for -m0
  -p T                 progress-report period in seconds (T<5 disables)
  -y+ / -y-            report vertices as found (default on)
  -r N                 recalculate facets every N rounds (N<5 disables except N=0)
  -k N                 consistency check every N rounds (same convention)
  --KEYWORD=VALUE      override any configuration keyword
";

pub const VLP_HELP: &str = "\
VLP input format (line-oriented, 1-indexed):
  c                      comment
  p vlp DIR ROWS COLS ALINES OBJS OLINES
  i ROW {f|l V|u V|d V1 V2|s V}   row bound (default f)
  j COL {f|l V|u V|d V1 V2|s V}   column bound (default s 0)
  a ROW COL V            constraint coefficient
  o OBJ COL V            objective coefficient
  e                      end of data
";

pub const OUT_HELP: &str = "\
Output format:
  V c1 c2 ... cd         a vertex, d coordinates
  F f1 f2 ... fd fd+1    a facet equation f.x + f[d+1] = 0
  C ...                  a comment line
Vertex coordinates are printed as reduced fractions when PrintAsFraction=1.
";
