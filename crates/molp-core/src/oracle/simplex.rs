//! A self-contained dense bounded-variable simplex solver, used as
//! the default `Oracle` implementation so the DD engine is never
//! coupled to a particular scalar-LP backend.
//!
//! The feasible region is represented as `A x + s = 0` where `s` is a
//! row of slack variables with bounds derived from the row bounds
//! (sign-flipped so the identity block `I` gives a ready-made starting
//! basis). Because the right-hand side is identically zero, every
//! basic solution is simply `-(B^-1 N) x_N`, which keeps the pivoting
//! arithmetic unusually simple for a bounded-variable tableau.

use super::{Oracle, OracleError};
use crate::vlp::{Direction, Problem};
use nalgebra::DMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    FindFeasible,
    Optimize,
}

/// Dense two-phase bounded-variable simplex oracle.
///
/// `probe` maximizes `direction . (O x)` over the feasible region,
/// where `O` is the problem's objective matrix canonicalised so that
/// the DD engine always works in a "maximize" orientation; `Problem`s
/// declared `min` have their objective matrix negated at construction
/// and the caller (driver loop) undoes the negation when reporting
/// results in the user's original orientation.
pub struct SimplexOracle {
    num_cols: usize,
    num_rows: usize,
    num_objs: usize,
    /// `num_cols + num_rows` columns: original variables then slacks.
    tableau: DMatrix<f64>,
    bounds: Vec<(f64, f64)>,
    o_eff: DMatrix<f64>,
    iteration_limit: usize,
}

impl SimplexOracle {
    pub fn new(problem: &Problem, iteration_limit: usize) -> Self {
        let num_cols = problem.num_cols;
        let num_rows = problem.num_rows;
        let num_objs = problem.num_objs;
        let nv = num_cols + num_rows;

        let mut tableau = DMatrix::<f64>::zeros(num_rows.max(1), nv.max(1));
        for ((row, col), &val) in &problem.a {
            tableau[(*row, *col)] = val;
        }
        for r in 0..num_rows {
            tableau[(r, num_cols + r)] = 1.0;
        }

        let mut bounds = Vec::with_capacity(nv);
        for j in 0..num_cols {
            let b = problem.col_bounds[j];
            bounds.push((b.lo(), b.hi()));
        }
        for i in 0..num_rows {
            let b = problem.row_bounds[i];
            // s = -A x, so s's bounds are the negation of the row's.
            bounds.push((-b.hi(), -b.lo()));
        }

        let sign = match problem.direction {
            Direction::Max => 1.0,
            Direction::Min => -1.0,
        };
        let mut o_eff = DMatrix::<f64>::zeros(num_objs.max(1), num_cols.max(1));
        for ((obj, col), &val) in &problem.o {
            o_eff[(*obj, *col)] = sign * val;
        }

        SimplexOracle {
            num_cols,
            num_rows,
            num_objs,
            tableau,
            bounds,
            o_eff,
            iteration_limit,
        }
    }

    fn nv(&self) -> usize {
        self.num_cols + self.num_rows
    }

    fn nonbasic_value(&self, j: usize, at_upper: &[bool]) -> f64 {
        let (lo, hi) = self.bounds[j];
        if at_upper[j] {
            hi
        } else {
            lo
        }
    }

    fn basic_values(&self, at_upper: &[bool], nonbasic: &[bool]) -> Vec<f64> {
        let mut xb = vec![0.0; self.num_rows];
        for r in 0..self.num_rows {
            let mut acc = 0.0;
            for j in 0..self.nv() {
                if nonbasic[j] {
                    let v = self.nonbasic_value(j, at_upper);
                    if v != 0.0 {
                        acc -= self.tableau[(r, j)] * v;
                    }
                }
            }
            xb[r] = acc;
        }
        xb
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let piv = self.tableau[(row, col)];
        for j in 0..self.nv() {
            self.tableau[(row, j)] /= piv;
        }
        for r in 0..self.num_rows {
            if r == row {
                continue;
            }
            let factor = self.tableau[(r, col)];
            if factor != 0.0 {
                for j in 0..self.nv() {
                    let sub = factor * self.tableau[(row, j)];
                    self.tableau[(r, j)] -= sub;
                }
            }
        }
    }

    /// Runs the bounded-variable simplex method to either drive total
    /// infeasibility to zero (`Phase::FindFeasible`, cost vector built
    /// from current violations each iteration) or maximize a fixed
    /// cost vector (`Phase::Optimize`).
    fn run(
        &mut self,
        phase: Phase,
        cost: &[f64],
        basis: &mut [usize],
        at_upper: &mut [bool],
        nonbasic: &mut [bool],
    ) -> Result<(), OracleError> {
        let nv = self.nv();
        let mut iterations = 0usize;
        loop {
            if iterations >= self.iteration_limit {
                return Err(OracleError::Limit);
            }
            iterations += 1;

            let xb = self.basic_values(at_upper, nonbasic);

            let (effective_cost, infeasible_rows): (Vec<f64>, Vec<i8>) = match phase {
                Phase::Optimize => (cost.to_vec(), vec![0; self.num_rows]),
                Phase::FindFeasible => {
                    let mut sign = vec![0i8; self.num_rows];
                    for r in 0..self.num_rows {
                        let (lo, hi) = self.bounds[basis[r]];
                        if xb[r] > hi + 1e-9 {
                            sign[r] = 1;
                        } else if xb[r] < lo - 1e-9 {
                            sign[r] = -1;
                        }
                    }
                    if sign.iter().all(|&s| s == 0) {
                        return Ok(());
                    }
                    (vec![0.0; nv], sign)
                }
            };

            // c_B for the current basis, used to derive reduced costs
            // of nonbasic columns via c_j - c_B . tableau_col_j.
            let c_b: Vec<f64> = match phase {
                Phase::Optimize => basis.iter().map(|&bj| effective_cost[bj]).collect(),
                Phase::FindFeasible => infeasible_rows.iter().map(|&s| s as f64).collect(),
            };

            let mut best: Option<(usize, f64, bool)> = None; // (col, rc, increasing)
            for j in 0..nv {
                if !nonbasic[j] {
                    continue;
                }
                let mut col_dot = 0.0;
                for r in 0..self.num_rows {
                    col_dot += c_b[r] * self.tableau[(r, j)];
                }
                let rc = match phase {
                    Phase::Optimize => effective_cost[j] - col_dot,
                    Phase::FindFeasible => -col_dot,
                };
                let (lo, hi) = self.bounds[j];
                let can_increase = !at_upper[j] && hi > lo;
                let can_decrease = at_upper[j] && hi > lo;
                // A free variable resting nonbasic (both bounds
                // infinite) can move either way; such columns are
                // pivoted into the basis during setup whenever
                // possible, so this path is a conservative fallback.
                let free_either = lo == f64::NEG_INFINITY && hi == f64::INFINITY;

                if (can_increase || (free_either && !at_upper[j])) && rc > 1e-9 {
                    let better = best.map(|(_, brc, _)| rc > brc).unwrap_or(true);
                    if better {
                        best = Some((j, rc, true));
                    }
                }
                if (can_decrease || (free_either && at_upper[j])) && rc < -1e-9 {
                    let better = best.map(|(_, brc, _)| -rc > brc).unwrap_or(true);
                    if better {
                        best = Some((j, -rc, false));
                    }
                }
            }

            let (entering, _, increasing) = match best {
                Some(v) => v,
                None => {
                    return match phase {
                        Phase::Optimize => Ok(()),
                        Phase::FindFeasible => Err(OracleError::Empty),
                    }
                }
            };

            let dir = if increasing { 1.0 } else { -1.0 };
            let (lo_e, hi_e) = self.bounds[entering];
            let own_limit = if increasing {
                if hi_e.is_finite() {
                    hi_e - lo_e
                } else {
                    f64::INFINITY
                }
            } else if lo_e.is_finite() {
                hi_e - lo_e
            } else {
                f64::INFINITY
            };

            let mut best_step = own_limit;
            let mut leaving_row: Option<usize> = None;

            for r in 0..self.num_rows {
                let coeff = self.tableau[(r, entering)];
                if coeff == 0.0 {
                    continue;
                }
                let rate = -coeff * dir;
                if rate == 0.0 {
                    continue;
                }
                let (lo, hi) = self.bounds[basis[r]];
                let target = match phase {
                    Phase::FindFeasible => {
                        let s = infeasible_rows[r];
                        if s == 1 && rate < 0.0 {
                            Some(hi)
                        } else if s == -1 && rate > 0.0 {
                            Some(lo)
                        } else if s == 0 {
                            if rate > 0.0 && hi.is_finite() {
                                Some(hi)
                            } else if rate < 0.0 && lo.is_finite() {
                                Some(lo)
                            } else {
                                None
                            }
                        } else {
                            None
                        }
                    }
                    Phase::Optimize => {
                        if rate > 0.0 && hi.is_finite() {
                            Some(hi)
                        } else if rate < 0.0 && lo.is_finite() {
                            Some(lo)
                        } else {
                            None
                        }
                    }
                };
                if let Some(t) = target {
                    let step = (t - xb[r]) / rate;
                    if step.is_finite() && step >= -1e-9 {
                        let step = step.max(0.0);
                        if step < best_step - 1e-12 {
                            best_step = step;
                            leaving_row = Some(r);
                        }
                    }
                }
            }

            if !best_step.is_finite() {
                return Err(OracleError::Unbounded);
            }

            match leaving_row {
                Some(r) => {
                    let leaving_var = basis[r];
                    let piv = self.tableau[(r, entering)];
                    if piv.abs() < 1e-11 {
                        return Err(OracleError::Fail);
                    }
                    self.pivot(r, entering);
                    nonbasic[leaving_var] = true;
                    nonbasic[entering] = false;
                    // The leaving variable settles at whichever of its
                    // bounds the ratio test targeted.
                    let (lo, hi) = self.bounds[leaving_var];
                    let went_up = xb[r] + (-piv * dir) * best_step >= (lo + hi) / 2.0;
                    at_upper[leaving_var] = went_up && hi.is_finite();
                    basis[r] = entering;
                }
                None => {
                    // Bound flip: entering stays nonbasic at its other bound.
                    at_upper[entering] = increasing;
                }
            }
        }
    }

    /// Pivots any variable with both bounds infinite into the basis
    /// before the main loop starts, since such a variable cannot rest
    /// at either bound and would otherwise never be selectable.
    fn absorb_free_variables(&mut self, basis: &mut [usize], nonbasic: &mut [bool]) {
        for j in 0..self.nv() {
            let (lo, hi) = self.bounds[j];
            if lo != f64::NEG_INFINITY || hi != f64::INFINITY {
                continue;
            }
            if let Some(r) = (0..self.num_rows)
                .find(|&r| basis[r] == self.num_cols + r && self.tableau[(r, j)].abs() > 1e-9)
            {
                self.pivot(r, j);
                nonbasic[basis[r]] = true;
                nonbasic[j] = false;
                basis[r] = j;
            }
        }
    }

    fn solve(&mut self, cost: &[f64]) -> Result<Vec<f64>, OracleError> {
        let nv = self.nv();
        let mut basis: Vec<usize> = (0..self.num_rows).map(|r| self.num_cols + r).collect();
        let mut nonbasic = vec![true; nv];
        for &b in &basis {
            nonbasic[b] = false;
        }
        let mut at_upper = vec![false; nv];
        for j in 0..self.num_cols {
            let (lo, hi) = self.bounds[j];
            if lo == f64::NEG_INFINITY && hi.is_finite() {
                at_upper[j] = true;
            }
        }

        self.absorb_free_variables(&mut basis, &mut nonbasic);

        self.run(
            Phase::FindFeasible,
            &[],
            &mut basis,
            &mut at_upper,
            &mut nonbasic,
        )?;
        self.run(
            Phase::Optimize,
            cost,
            &mut basis,
            &mut at_upper,
            &mut nonbasic,
        )?;

        let xb = self.basic_values(&at_upper, &nonbasic);
        let mut x = vec![0.0; nv];
        for j in 0..nv {
            if nonbasic[j] {
                x[j] = self.nonbasic_value(j, &at_upper);
            }
        }
        for (r, &bj) in basis.iter().enumerate() {
            x[bj] = xb[r];
        }
        Ok(x)
    }
}

impl Oracle for SimplexOracle {
    fn probe(&mut self, direction: &[f64]) -> Result<Vec<f64>, OracleError> {
        debug_assert_eq!(direction.len(), self.num_objs);
        let mut cost = vec![0.0; self.nv()];
        for j in 0..self.num_cols {
            let mut c = 0.0;
            for k in 0..self.num_objs {
                c += direction[k] * self.o_eff[(k, j)];
            }
            cost[j] = c;
        }
        let x = self.solve(&cost)?;
        let mut vertex = vec![0.0; self.num_objs];
        for k in 0..self.num_objs {
            let mut acc = 0.0;
            for j in 0..self.num_cols {
                acc += self.o_eff[(k, j)] * x[j];
            }
            vertex[k] = acc;
        }
        Ok(vertex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vlp::{parse, Bound};
    use std::io::Cursor;

    fn build(text: &str) -> Problem {
        parse(Cursor::new(text.as_bytes())).unwrap()
    }

    #[test]
    fn maximizes_single_bounded_variable() {
        let problem = build("p vlp max 0 1 0 1 1\nj 1 d 0 1\no 1 1 1\ne\n");
        let mut oracle = SimplexOracle::new(&problem, 1_000);
        let v = oracle.probe(&[1.0]).unwrap();
        assert!((v[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn detects_unbounded_direction() {
        let problem = build("p vlp max 0 0 1 1 1\nj 1 l 0\no 1 1 1\ne\n");
        assert_eq!(problem.col_bounds[0], Bound::Lower(0.0));
        let mut oracle = SimplexOracle::new(&problem, 1_000);
        let err = oracle.probe(&[1.0]).unwrap_err();
        assert_eq!(err, OracleError::Unbounded);
    }

    #[test]
    fn finds_unit_square_corner() {
        let problem = build(
            "p vlp max 0 2 0 2 2\nj 1 d 0 1\nj 2 d 0 1\no 1 1 1\no 2 2 1\ne\n",
        );
        let mut oracle = SimplexOracle::new(&problem, 1_000);
        let v = oracle.probe(&[1.0, 1.0]).unwrap();
        assert!((v[0] - 1.0).abs() < 1e-6);
        assert!((v[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn respects_linear_constraint_row() {
        let problem = build(
            "p vlp max 1 2 0 2 2\ni 1 u 1\nj 1 l 0\nj 2 l 0\na 1 1 1\na 1 2 1\no 1 1 1\no 2 2 1\ne\n",
        );
        let mut oracle = SimplexOracle::new(&problem, 1_000);
        let v = oracle.probe(&[1.0, 1.0]).unwrap();
        assert!((v[0] + v[1] - 1.0).abs() < 1e-6);
    }
}
