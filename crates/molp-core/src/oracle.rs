//! The oracle adapter: translates a scalar-LP backend into the
//! four-valued probe contract the DD engine depends on, and
//! instruments call count/time so the driver loop can report them.

pub mod simplex;

use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle reported the feasible region is unbounded in the probed direction")]
    Unbounded,
    #[error("oracle reported the feasible region is empty")]
    Empty,
    #[error("oracle exceeded its iteration or time limit")]
    Limit,
    #[error("oracle failed (degenerate numerical breakdown)")]
    Fail,
}

/// Configuration surface consumed once, at adapter construction.
/// Mirrors the scalar-LP knobs a production backend (GLPK/HiGHS)
/// would expose; the reference simplex oracle honors the subset that
/// makes sense for a dense tableau.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub method: LpMethod,
    pub pricing: PricingRule,
    pub iteration_limit: usize,
    pub time_limit: Duration,
    pub shuffle_rows_cols: bool,
    pub rational_rounding: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            method: LpMethod::Primal,
            pricing: PricingRule::Dantzig,
            iteration_limit: 10_000,
            time_limit: Duration::from_secs(20),
            shuffle_rows_cols: false,
            rational_rounding: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpMethod {
    Primal,
    Dual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingRule {
    Dantzig,
    Bland,
}

/// A scalar-LP backend capable of maximizing a linear functional over
/// a fixed feasible region. Implementors own whatever tableau/model
/// state they need; `probe` is called once per DD-engine facet probe.
pub trait Oracle {
    fn probe(&mut self, direction: &[f64]) -> Result<Vec<f64>, OracleError>;
}

/// Wraps any `Oracle` with call-count/elapsed-time instrumentation,
/// the way the base driver loop's timing wrapper around the backend
/// solver call is specified.
pub struct OracleAdapter<O: Oracle> {
    inner: O,
    config: OracleConfig,
    call_count: u64,
    total_time: Duration,
}

impl<O: Oracle> OracleAdapter<O> {
    pub fn new(inner: O, config: OracleConfig) -> Self {
        OracleAdapter {
            inner,
            config,
            call_count: 0,
            total_time: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    pub fn total_time(&self) -> Duration {
        self.total_time
    }

    pub fn probe(&mut self, direction: &[f64]) -> Result<Vec<f64>, OracleError> {
        let start = Instant::now();
        let result = self.inner.probe(direction);
        self.total_time += start.elapsed();
        self.call_count += 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedOracle(Result<Vec<f64>, OracleError>);

    impl Oracle for FixedOracle {
        fn probe(&mut self, _direction: &[f64]) -> Result<Vec<f64>, OracleError> {
            self.0.clone()
        }
    }

    #[test]
    fn adapter_counts_calls_and_accumulates_time() {
        let mut adapter = OracleAdapter::new(FixedOracle(Ok(vec![1.0, 2.0])), OracleConfig::default());
        assert_eq!(adapter.call_count(), 0);
        let r = adapter.probe(&[1.0, 0.0]).unwrap();
        assert_eq!(r, vec![1.0, 2.0]);
        assert_eq!(adapter.call_count(), 1);
        adapter.probe(&[0.0, 1.0]).unwrap();
        assert_eq!(adapter.call_count(), 2);
    }

    #[test]
    fn adapter_propagates_oracle_errors() {
        let mut adapter = OracleAdapter::new(FixedOracle(Err(OracleError::Unbounded)), OracleConfig::default());
        assert_eq!(adapter.probe(&[1.0]).unwrap_err(), OracleError::Unbounded);
    }
}
