//! Parser for the line-oriented VLP problem format and the in-memory
//! `Problem` representation it produces.
//!
//! Rows, columns and objectives are 1-indexed in the text format and
//! stored 0-indexed internally.

use std::collections::HashMap;
use std::io::BufRead;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VlpError {
    #[error("line {line}: unrecognized line kind {kind:?}")]
    UnknownLineKind { line: usize, kind: String },
    #[error("line {line}: malformed {kind} line: {detail}")]
    Malformed {
        line: usize,
        kind: &'static str,
        detail: String,
    },
    #[error("line {line}: `{kind}` line before `p vlp` declaration")]
    BeforeProgramLine { line: usize, kind: &'static str },
    #[error("line {line}: duplicate `p vlp` declaration")]
    DuplicateProgramLine { line: usize },
    #[error("missing `p vlp` declaration")]
    MissingProgramLine,
    #[error("line {line}: index {index} out of declared range 1..={max}")]
    IndexOutOfRange { line: usize, index: usize, max: usize },
    #[error("line {line}: unknown bound kind {kind:?}")]
    UnknownBoundKind { line: usize, kind: String },
    #[error("missing `e` end-of-data line")]
    MissingEndLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Min,
    Max,
}

/// Bound on a row or column: `f`ree, `l`ower only, `u`pper only,
/// `d`ouble-bounded, `s`ingle (fixed) value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Free,
    Lower(f64),
    Upper(f64),
    Double(f64, f64),
    Fixed(f64),
}

impl Bound {
    pub fn lo(&self) -> f64 {
        match *self {
            Bound::Free | Bound::Upper(_) => f64::NEG_INFINITY,
            Bound::Lower(v) | Bound::Double(v, _) | Bound::Fixed(v) => v,
        }
    }

    pub fn hi(&self) -> f64 {
        match *self {
            Bound::Free | Bound::Lower(_) => f64::INFINITY,
            Bound::Upper(v) | Bound::Double(_, v) | Bound::Fixed(v) => v,
        }
    }
}

/// A parsed multi-objective linear program. Sparse coefficients are
/// stored as `(row_or_obj, col) -> value` maps; the VLP grammar lets
/// zero entries be omitted entirely.
#[derive(Debug, Clone)]
pub struct Problem {
    pub direction: Direction,
    pub num_rows: usize,
    pub num_cols: usize,
    pub num_objs: usize,
    pub row_bounds: Vec<Bound>,
    pub col_bounds: Vec<Bound>,
    pub a: HashMap<(usize, usize), f64>,
    pub o: HashMap<(usize, usize), f64>,
}

impl Problem {
    pub fn dim(&self) -> usize {
        self.num_objs
    }

    pub fn a_coeff(&self, row: usize, col: usize) -> f64 {
        self.a.get(&(row, col)).copied().unwrap_or(0.0)
    }

    pub fn o_coeff(&self, obj: usize, col: usize) -> f64 {
        self.o.get(&(obj, col)).copied().unwrap_or(0.0)
    }
}

struct Builder {
    direction: Option<Direction>,
    num_rows: usize,
    num_cols: usize,
    num_alines: usize,
    num_objs: usize,
    num_olines: usize,
    row_bounds: HashMap<usize, Bound>,
    col_bounds: HashMap<usize, Bound>,
    a: HashMap<(usize, usize), f64>,
    o: HashMap<(usize, usize), f64>,
    seen_a: usize,
    seen_o: usize,
}

fn parse_bound(line: usize, kind: &'static str, tokens: &[&str]) -> Result<Bound, VlpError> {
    match tokens.first() {
        Some(&"f") => Ok(Bound::Free),
        Some(&"l") => {
            let v = parse_f64(line, kind, tokens.get(1))?;
            Ok(Bound::Lower(v))
        }
        Some(&"u") => {
            let v = parse_f64(line, kind, tokens.get(1))?;
            Ok(Bound::Upper(v))
        }
        Some(&"d") => {
            let lo = parse_f64(line, kind, tokens.get(1))?;
            let hi = parse_f64(line, kind, tokens.get(2))?;
            Ok(Bound::Double(lo, hi))
        }
        Some(&"s") => {
            let v = parse_f64(line, kind, tokens.get(1))?;
            Ok(Bound::Fixed(v))
        }
        Some(other) => Err(VlpError::UnknownBoundKind {
            line,
            kind: (*other).to_string(),
        }),
        None => Err(VlpError::Malformed {
            line,
            kind,
            detail: "missing bound kind".to_string(),
        }),
    }
}

fn parse_usize(line: usize, kind: &'static str, tok: Option<&&str>) -> Result<usize, VlpError> {
    tok.and_then(|t| t.parse::<usize>().ok())
        .ok_or_else(|| VlpError::Malformed {
            line,
            kind,
            detail: "expected a non-negative integer".to_string(),
        })
}

fn parse_f64(line: usize, kind: &'static str, tok: Option<&&str>) -> Result<f64, VlpError> {
    tok.and_then(|t| t.parse::<f64>().ok())
        .ok_or_else(|| VlpError::Malformed {
            line,
            kind,
            detail: "expected a real number".to_string(),
        })
}

/// Parse a VLP-format stream into a `Problem`.
pub fn parse<R: BufRead>(reader: R) -> Result<Problem, VlpError> {
    let mut builder: Option<Builder> = None;

    for (idx, raw_line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let raw_line = raw_line.map_err(|e| VlpError::Malformed {
            line: line_no,
            kind: "io",
            detail: e.to_string(),
        })?;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('c') || trimmed.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let kind = tokens[0];
        let rest = &tokens[1..];

        match kind {
            "p" => {
                if builder.is_some() {
                    return Err(VlpError::DuplicateProgramLine { line: line_no });
                }
                if rest.first() != Some(&"vlp") {
                    return Err(VlpError::Malformed {
                        line: line_no,
                        kind: "p",
                        detail: "expected `p vlp ...`".to_string(),
                    });
                }
                let dir = match rest.get(1) {
                    Some(&"min") => Direction::Min,
                    Some(&"max") => Direction::Max,
                    _ => {
                        return Err(VlpError::Malformed {
                            line: line_no,
                            kind: "p",
                            detail: "direction must be `min` or `max`".to_string(),
                        })
                    }
                };
                let num_rows = parse_usize(line_no, "p", rest.get(2))?;
                let num_cols = parse_usize(line_no, "p", rest.get(3))?;
                let num_alines = parse_usize(line_no, "p", rest.get(4))?;
                let num_objs = parse_usize(line_no, "p", rest.get(5))?;
                let num_olines = parse_usize(line_no, "p", rest.get(6))?;
                builder = Some(Builder {
                    direction: Some(dir),
                    num_rows,
                    num_cols,
                    num_alines,
                    num_objs,
                    num_olines,
                    row_bounds: HashMap::new(),
                    col_bounds: HashMap::new(),
                    a: HashMap::new(),
                    o: HashMap::new(),
                    seen_a: 0,
                    seen_o: 0,
                });
            }
            "e" => {
                let b = builder.ok_or(VlpError::MissingProgramLine)?;
                return finish(b);
            }
            "i" | "j" | "a" | "o" => {
                let b = builder.as_mut().ok_or(VlpError::BeforeProgramLine {
                    line: line_no,
                    kind: kind_static(kind),
                })?;
                match kind {
                    "i" => {
                        let row = parse_usize(line_no, "i", rest.first())?;
                        if row == 0 || row > b.num_rows {
                            return Err(VlpError::IndexOutOfRange {
                                line: line_no,
                                index: row,
                                max: b.num_rows,
                            });
                        }
                        let bound = parse_bound(line_no, "i", &rest[1..])?;
                        b.row_bounds.insert(row - 1, bound);
                    }
                    "j" => {
                        let col = parse_usize(line_no, "j", rest.first())?;
                        if col == 0 || col > b.num_cols {
                            return Err(VlpError::IndexOutOfRange {
                                line: line_no,
                                index: col,
                                max: b.num_cols,
                            });
                        }
                        let bound = parse_bound(line_no, "j", &rest[1..])?;
                        b.col_bounds.insert(col - 1, bound);
                    }
                    "a" => {
                        let row = parse_usize(line_no, "a", rest.first())?;
                        let col = parse_usize(line_no, "a", rest.get(1))?;
                        let val = parse_f64(line_no, "a", rest.get(2))?;
                        if row == 0 || row > b.num_rows {
                            return Err(VlpError::IndexOutOfRange {
                                line: line_no,
                                index: row,
                                max: b.num_rows,
                            });
                        }
                        if col == 0 || col > b.num_cols {
                            return Err(VlpError::IndexOutOfRange {
                                line: line_no,
                                index: col,
                                max: b.num_cols,
                            });
                        }
                        b.a.insert((row - 1, col - 1), val);
                        b.seen_a += 1;
                    }
                    "o" => {
                        let obj = parse_usize(line_no, "o", rest.first())?;
                        let col = parse_usize(line_no, "o", rest.get(1))?;
                        let val = parse_f64(line_no, "o", rest.get(2))?;
                        if obj == 0 || obj > b.num_objs {
                            return Err(VlpError::IndexOutOfRange {
                                line: line_no,
                                index: obj,
                                max: b.num_objs,
                            });
                        }
                        if col == 0 || col > b.num_cols {
                            return Err(VlpError::IndexOutOfRange {
                                line: line_no,
                                index: col,
                                max: b.num_cols,
                            });
                        }
                        b.o.insert((obj - 1, col - 1), val);
                        b.seen_o += 1;
                    }
                    _ => unreachable!(),
                }
            }
            other => {
                return Err(VlpError::UnknownLineKind {
                    line: line_no,
                    kind: other.to_string(),
                })
            }
        }
    }

    Err(VlpError::MissingEndLine)
}

fn kind_static(k: &str) -> &'static str {
    match k {
        "i" => "i",
        "j" => "j",
        "a" => "a",
        "o" => "o",
        _ => "?",
    }
}

fn finish(b: Builder) -> Result<Problem, VlpError> {
    let row_bounds = (0..b.num_rows)
        .map(|r| b.row_bounds.get(&r).copied().unwrap_or(Bound::Free))
        .collect();
    let col_bounds = (0..b.num_cols)
        .map(|c| b.col_bounds.get(&c).copied().unwrap_or(Bound::Fixed(0.0)))
        .collect();
    Ok(Problem {
        direction: b.direction.unwrap(),
        num_rows: b.num_rows,
        num_cols: b.num_cols,
        num_objs: b.num_objs,
        row_bounds,
        col_bounds,
        a: b.a,
        o: b.o,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse_str(s: &str) -> Result<Problem, VlpError> {
        parse(Cursor::new(s.as_bytes()))
    }

    #[test]
    fn parses_unit_square_min_problem() {
        let text = "\
p vlp min 0 2 0 2 4
j 1 d 0 1
j 2 d 0 1
o 1 1 1
o 2 2 1
e
";
        let problem = parse_str(text).unwrap();
        assert_eq!(problem.direction, Direction::Min);
        assert_eq!(problem.num_cols, 2);
        assert_eq!(problem.num_objs, 2);
        assert_eq!(problem.col_bounds[0], Bound::Double(0.0, 1.0));
        assert_eq!(problem.o_coeff(0, 0), 1.0);
        assert_eq!(problem.o_coeff(1, 1), 1.0);
        assert_eq!(problem.o_coeff(0, 1), 0.0);
    }

    #[test]
    fn default_column_bound_is_fixed_at_zero() {
        let text = "p vlp max 0 1 0 1 1\no 1 1 1\ne\n";
        let problem = parse_str(text).unwrap();
        assert_eq!(problem.col_bounds[0], Bound::Fixed(0.0));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "\
c a leading comment
p vlp max 0 1 0 1 1

# another style of comment
o 1 1 1
e
trailing garbage is ignored
";
        assert!(parse_str(text).is_ok());
    }

    #[test]
    fn rejects_data_line_before_program_line() {
        let text = "o 1 1 1\np vlp max 0 1 0 1 1\ne\n";
        let err = parse_str(text).unwrap_err();
        assert!(matches!(err, VlpError::BeforeProgramLine { .. }));
    }

    #[test]
    fn rejects_duplicate_program_line() {
        let text = "p vlp max 0 1 0 1 1\np vlp max 0 1 0 1 1\ne\n";
        let err = parse_str(text).unwrap_err();
        assert!(matches!(err, VlpError::DuplicateProgramLine { .. }));
    }

    #[test]
    fn rejects_out_of_range_column_index() {
        let text = "p vlp max 0 1 0 1 1\no 1 2 1\ne\n";
        let err = parse_str(text).unwrap_err();
        assert!(matches!(err, VlpError::IndexOutOfRange { .. }));
    }

    #[test]
    fn missing_end_line_is_an_error() {
        let text = "p vlp max 0 1 0 1 1\no 1 1 1\n";
        let err = parse_str(text).unwrap_err();
        assert_eq!(err, VlpError::MissingEndLine);
    }
}
