//! Runtime configuration: the owned `Params` struct plus a static
//! keyword-dispatch table that replaces a hand-rolled runtime lookup
//! table writing into process globals with one writing into an owned
//! struct, per the config-keyword-dispatch design note.

use crate::engine::FacetPolicy;
use std::io::BufRead;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("line {line}: unknown configuration keyword {keyword:?}")]
    UnknownKeyword { line: usize, keyword: String },
    #[error("line {line}: value {value:?} out of range for {keyword:?}")]
    OutOfRange {
        line: usize,
        keyword: String,
        value: String,
    },
    #[error("line {line}: malformed configuration line {text:?}")]
    Malformed { line: usize, text: String },
}

/// Message verbosity, driven by `-m0..-m3`/`-q` and mapped onto a
/// `tracing` level at the CLI boundary rather than a hand-rolled
/// global message-level variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Errors,
    Normal,
    Verbose,
}

#[derive(Debug, Clone)]
pub struct Params {
    pub problem_name: String,
    pub verbosity: Verbosity,
    pub progress_report_period: Option<Duration>,
    pub report_vertices_as_found: bool,
    pub recalculate_facets: usize,
    pub check_consistency: usize,
    pub random_facet: bool,
    pub rng_seed: u64,
    pub extract_after_break: bool,
    pub print_vertices: u8,
    pub print_facets: bool,
    pub save_vertices: u8,
    pub save_facets: u8,
    pub print_as_fraction: bool,
    pub polytope_eps: f64,
    pub lineq_eps: f64,
    pub facet_recalc_eps: f64,
    pub oracle_iteration_limit: usize,
    pub oracle_time_limit: Duration,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            problem_name: String::new(),
            verbosity: Verbosity::Normal,
            progress_report_period: Some(Duration::from_secs(5)),
            report_vertices_as_found: true,
            recalculate_facets: 100,
            check_consistency: 0,
            random_facet: false,
            rng_seed: 0,
            extract_after_break: true,
            print_vertices: 2,
            print_facets: true,
            save_vertices: 2,
            save_facets: 2,
            print_as_fraction: true,
            polytope_eps: 1.3e-8,
            lineq_eps: 8e-8,
            facet_recalc_eps: 1e-6,
            oracle_iteration_limit: 10_000,
            oracle_time_limit: Duration::from_secs(20),
        }
    }
}

impl Params {
    pub fn facet_policy(&self) -> FacetPolicy {
        if self.random_facet {
            FacetPolicy::Random
        } else {
            FacetPolicy::Fifo
        }
    }

    /// Rewrites an `-r`/`-k`-style "every N rounds" value per the
    /// uniform rule decided for the documented `0 < N < 5` asymmetry:
    /// `0` disables outright; any value strictly between `0` and `5`
    /// is rounded up to the floor of `5`; `5` and above pass through.
    pub fn normalize_round_interval(n: usize) -> usize {
        if n == 0 {
            0
        } else if n < 5 {
            5
        } else {
            n
        }
    }
}

/// One row of the keyword dispatch table: a name, a setter closure
/// writing into `Params`, and a validator applied to the raw value
/// string before the setter runs.
struct KeywordSpec {
    name: &'static str,
    set: fn(&mut Params, &str, usize) -> Result<(), ConfigError>,
}

fn parse_bool(keyword: &str, line: usize, value: &str) -> Result<bool, ConfigError> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ConfigError::OutOfRange {
            line,
            keyword: keyword.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_nonneg_int(keyword: &str, line: usize, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::OutOfRange {
        line,
        keyword: keyword.to_string(),
        value: value.to_string(),
    })
}

fn parse_real_eps(keyword: &str, line: usize, value: &str) -> Result<f64, ConfigError> {
    let v: f64 = value.parse().map_err(|_| ConfigError::OutOfRange {
        line,
        keyword: keyword.to_string(),
        value: value.to_string(),
    })?;
    if v > 1.01e-15 && v < 0.99 {
        Ok(v)
    } else {
        Err(ConfigError::OutOfRange {
            line,
            keyword: keyword.to_string(),
            value: value.to_string(),
        })
    }
}

fn parse_verbosity(line: usize, value: &str) -> Result<Verbosity, ConfigError> {
    match value {
        "0" => Ok(Verbosity::Quiet),
        "1" => Ok(Verbosity::Errors),
        "2" => Ok(Verbosity::Normal),
        "3" => Ok(Verbosity::Verbose),
        _ => Err(ConfigError::OutOfRange {
            line,
            keyword: "Verbosity".to_string(),
            value: value.to_string(),
        }),
    }
}

const KEYWORDS: &[KeywordSpec] = &[
    KeywordSpec {
        name: "Verbosity",
        set: |p, v, line| {
            p.verbosity = parse_verbosity(line, v)?;
            Ok(())
        },
    },
    KeywordSpec {
        name: "Name",
        set: |p, v, _| {
            p.problem_name = v.to_string();
            Ok(())
        },
    },
    KeywordSpec {
        name: "RandomFacet",
        set: |p, v, line| {
            p.random_facet = parse_bool("RandomFacet", line, v)?;
            Ok(())
        },
    },
    KeywordSpec {
        name: "ExtractAfterBreak",
        set: |p, v, line| {
            p.extract_after_break = parse_bool("ExtractAfterBreak", line, v)?;
            Ok(())
        },
    },
    KeywordSpec {
        name: "ReportVerticesAsFound",
        set: |p, v, line| {
            p.report_vertices_as_found = parse_bool("ReportVerticesAsFound", line, v)?;
            Ok(())
        },
    },
    KeywordSpec {
        name: "PrintAsFraction",
        set: |p, v, line| {
            p.print_as_fraction = parse_bool("PrintAsFraction", line, v)?;
            Ok(())
        },
    },
    KeywordSpec {
        name: "PrintVertices",
        set: |p, v, line| {
            let n = parse_nonneg_int("PrintVertices", line, v)?;
            if n > 2 {
                return Err(ConfigError::OutOfRange {
                    line,
                    keyword: "PrintVertices".to_string(),
                    value: v.to_string(),
                });
            }
            p.print_vertices = n as u8;
            Ok(())
        },
    },
    KeywordSpec {
        name: "PrintFacets",
        set: |p, v, line| {
            p.print_facets = parse_bool("PrintFacets", line, v)?;
            Ok(())
        },
    },
    KeywordSpec {
        name: "SaveVertices",
        set: |p, v, line| {
            let n = parse_nonneg_int("SaveVertices", line, v)?;
            if n > 2 {
                return Err(ConfigError::OutOfRange {
                    line,
                    keyword: "SaveVertices".to_string(),
                    value: v.to_string(),
                });
            }
            p.save_vertices = n as u8;
            Ok(())
        },
    },
    KeywordSpec {
        name: "SaveFacets",
        set: |p, v, line| {
            let n = parse_nonneg_int("SaveFacets", line, v)?;
            if n > 2 {
                return Err(ConfigError::OutOfRange {
                    line,
                    keyword: "SaveFacets".to_string(),
                    value: v.to_string(),
                });
            }
            p.save_facets = n as u8;
            Ok(())
        },
    },
    KeywordSpec {
        name: "RecalculateFacets",
        set: |p, v, line| {
            let n = parse_nonneg_int("RecalculateFacets", line, v)?;
            p.recalculate_facets = Params::normalize_round_interval(n);
            Ok(())
        },
    },
    KeywordSpec {
        name: "CheckConsistency",
        set: |p, v, line| {
            let n = parse_nonneg_int("CheckConsistency", line, v)?;
            p.check_consistency = Params::normalize_round_interval(n);
            Ok(())
        },
    },
    KeywordSpec {
        name: "ProgressReport",
        set: |p, v, line| {
            let n = parse_nonneg_int("ProgressReport", line, v)?;
            p.progress_report_period = if n < 5 { None } else { Some(Duration::from_secs(n as u64)) };
            Ok(())
        },
    },
    KeywordSpec {
        name: "PolytopeEps",
        set: |p, v, line| {
            p.polytope_eps = parse_real_eps("PolytopeEps", line, v)?;
            Ok(())
        },
    },
    KeywordSpec {
        name: "LineqEps",
        set: |p, v, line| {
            p.lineq_eps = parse_real_eps("LineqEps", line, v)?;
            Ok(())
        },
    },
    KeywordSpec {
        name: "FacetRecalcEps",
        set: |p, v, line| {
            p.facet_recalc_eps = parse_real_eps("FacetRecalcEps", line, v)?;
            Ok(())
        },
    },
    KeywordSpec {
        name: "OracleItLimit",
        set: |p, v, line| {
            p.oracle_iteration_limit = parse_nonneg_int("OracleItLimit", line, v)?;
            Ok(())
        },
    },
    KeywordSpec {
        name: "OracleTimeLimit",
        set: |p, v, line| {
            let n = parse_nonneg_int("OracleTimeLimit", line, v)?;
            p.oracle_time_limit = Duration::from_secs(n as u64);
            Ok(())
        },
    },
];

/// Applies a single `KEYWORD=VALUE` override (as produced by `-c`
/// config-file lines or `--KEYWORD=VALUE` CLI overrides) to `params`.
pub fn apply_keyword(params: &mut Params, line: usize, keyword: &str, value: &str) -> Result<(), ConfigError> {
    for spec in KEYWORDS {
        if spec.name.eq_ignore_ascii_case(keyword) {
            return (spec.set)(params, value, line);
        }
    }
    Err(ConfigError::UnknownKeyword {
        line,
        keyword: keyword.to_string(),
    })
}

/// Reads a config file: `#`-comments, blank lines ignored, each
/// effective line is `KEYWORD = VALUE`.
pub fn read_config<R: BufRead>(reader: R, params: &mut Params) -> Result<(), ConfigError> {
    for (idx, raw_line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let raw_line = raw_line.map_err(|e| ConfigError::Malformed {
            line: line_no,
            text: e.to_string(),
        })?;
        let without_comment = raw_line.split('#').next().unwrap_or("");
        let trimmed = without_comment.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (keyword, value) = trimmed.split_once('=').ok_or_else(|| ConfigError::Malformed {
            line: line_no,
            text: raw_line.clone(),
        })?;
        apply_keyword(params, line_no, keyword.trim(), value.trim())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn normalize_round_interval_matches_decided_rule() {
        assert_eq!(Params::normalize_round_interval(0), 0);
        assert_eq!(Params::normalize_round_interval(1), 5);
        assert_eq!(Params::normalize_round_interval(4), 5);
        assert_eq!(Params::normalize_round_interval(5), 5);
        assert_eq!(Params::normalize_round_interval(37), 37);
    }

    #[test]
    fn reads_simple_config_file() {
        let text = "\
# a comment
RandomFacet = 1
PrintVertices = 0
ProgressReport = 30
";
        let mut params = Params::default();
        read_config(Cursor::new(text.as_bytes()), &mut params).unwrap();
        assert!(params.random_facet);
        assert_eq!(params.print_vertices, 0);
        assert_eq!(params.progress_report_period, Some(Duration::from_secs(30)));
    }

    #[test]
    fn verbosity_keyword_accepts_0_through_3() {
        let mut params = Params::default();
        apply_keyword(&mut params, 1, "Verbosity", "0").unwrap();
        assert_eq!(params.verbosity, Verbosity::Quiet);
        apply_keyword(&mut params, 1, "verbosity", "3").unwrap();
        assert_eq!(params.verbosity, Verbosity::Verbose);
        assert!(apply_keyword(&mut params, 1, "Verbosity", "9").is_err());
    }

    #[test]
    fn save_vertices_and_facets_accept_the_tristate_range() {
        let mut params = Params::default();
        apply_keyword(&mut params, 1, "SaveVertices", "0").unwrap();
        assert_eq!(params.save_vertices, 0);
        apply_keyword(&mut params, 1, "SaveFacets", "1").unwrap();
        assert_eq!(params.save_facets, 1);
        assert!(apply_keyword(&mut params, 1, "SaveVertices", "3").is_err());
    }

    #[test]
    fn unknown_keyword_is_an_error() {
        let mut params = Params::default();
        let err = apply_keyword(&mut params, 1, "NotAKeyword", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKeyword { .. }));
    }

    #[test]
    fn out_of_range_eps_is_rejected() {
        let mut params = Params::default();
        let err = apply_keyword(&mut params, 1, "PolytopeEps", "1.0").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }
}
