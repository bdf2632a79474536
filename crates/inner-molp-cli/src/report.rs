//! Output formatting: writes `V`/`F` lines to stdout and/or the
//! `-o`/`-ov`/`-of` save files, honoring `PrintVertices`/`PrintFacets`/
//! `PrintAsFraction` and undoing the oracle's internal max-orientation
//! sign flip for `min` problems.

use crate::cli::{Args, LegacyOptions};
use crate::fraction;
use anyhow::{Context, Result};
use molp_core::driver::RunReport;
use molp_core::params::Params;
use molp_core::vlp::{Direction, Problem};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the run's vertices and/or facets according to `PrintVertices`
/// (`0` none, `1` only those found during the main loop, `2` main loop
/// plus anything recovered by post-extract) and `PrintFacets`, to
/// stdout and to whichever of `-o`/`-ov`/`-of` were given.
pub fn write_report(
    args: &Args,
    legacy: &LegacyOptions,
    params: &Params,
    problem: &Problem,
    report: &RunReport,
) -> Result<()> {
    let sign = match problem.direction {
        Direction::Min => -1.0,
        Direction::Max => 1.0,
    };

    let mut all_vertices: Vec<&Vec<f64>> = Vec::new();
    if params.print_vertices >= 1 {
        all_vertices.extend(report.vertices.iter());
    }
    if params.print_vertices >= 2 {
        all_vertices.extend(report.post_extract_vertices.iter());
    }

    let vertex_lines: Vec<String> = all_vertices
        .iter()
        .map(|v| format_row('V', v, sign, params.print_as_fraction))
        .collect();
    let facet_lines: Vec<String> = if params.print_facets {
        report
            .facets
            .iter()
            .map(|f| format_facet_row(f, sign, params.print_as_fraction))
            .collect()
    } else {
        Vec::new()
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "C {}", problem_header(params))?;
    for l in &vertex_lines {
        writeln!(out, "{l}")?;
    }
    for l in &facet_lines {
        writeln!(out, "{l}")?;
    }

    // `-o FILE` writes both kinds to one file; `-ov`/`-of` each write
    // one kind to their own file. Either may be present independently.
    if let Some(path) = &args.save_both {
        write_lines(path, vertex_lines.iter().chain(facet_lines.iter()))?;
    }
    if let Some(path) = &legacy.save_vertices {
        write_lines(path, vertex_lines.iter())?;
    }
    if let Some(path) = &legacy.save_facets {
        write_lines(path, facet_lines.iter())?;
    }

    Ok(())
}

fn problem_header(params: &Params) -> String {
    if params.problem_name.is_empty() {
        "(unnamed problem)".to_string()
    } else {
        params.problem_name.clone()
    }
}

fn format_row(tag: char, coords: &[f64], sign: f64, as_fraction: bool) -> String {
    let mut line = String::new();
    line.push(tag);
    for &c in coords {
        line.push(' ');
        let v = sign * c;
        line.push_str(&format_value(v, as_fraction));
    }
    line
}

/// Substituting `y_internal = sign * y` into `f . y_internal + f[d+1]
/// = 0` rescales only the leading normal coefficients by `sign`; the
/// trailing offset term is unchanged.
fn format_facet_row(eqn: &[f64], sign: f64, as_fraction: bool) -> String {
    let mut line = String::from("F");
    let normal_len = eqn.len() - 1;
    for (i, &c) in eqn.iter().enumerate() {
        line.push(' ');
        let v = if i < normal_len { sign * c } else { c };
        line.push_str(&format_value(v, as_fraction));
    }
    line
}

fn format_value(v: f64, as_fraction: bool) -> String {
    if as_fraction {
        fraction::format_value(v)
    } else {
        format!("{v}")
    }
}

fn write_lines<'a, I: Iterator<Item = &'a String>>(path: &Path, lines: I) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating output file {path:?}"))?;
    let mut w = BufWriter::new(f);
    for l in lines {
        writeln!(w, "{l}")?;
    }
    w.flush()?;
    Ok(())
}
