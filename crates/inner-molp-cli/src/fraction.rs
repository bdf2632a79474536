//! Best-rational-approximation formatting for `PrintAsFraction`: the
//! oracle's vertices and facet equations are themselves rational
//! (built from the input's rational coefficients by exact pivoting),
//! but come back as `f64`, so recovering a short fraction string is a
//! continued-fraction search rather than a literal conversion.

const MAX_DENOMINATOR: i64 = 1_000_000;
const TOLERANCE: f64 = 1e-9;

/// Renders `x` either as a bare integer, or as `p/q` in lowest terms,
/// whichever continued-fraction convergent first falls within
/// `TOLERANCE` of `x` (capped at `MAX_DENOMINATOR`, beyond which the
/// value is printed as a plain decimal — it likely wasn't exactly
/// rational to begin with, e.g. a numerically unstable facet).
pub fn format_value(x: f64) -> String {
    if !x.is_finite() {
        return format!("{x}");
    }
    if x == 0.0 {
        return "0".to_string();
    }
    let sign = if x < 0.0 { -1 } else { 1 };
    let x_abs = x.abs();
    match best_rational(x_abs) {
        Some((p, q)) if q == 1 => format!("{}", sign * p),
        Some((p, q)) => format!("{}{}/{}", if sign < 0 { "-" } else { "" }, p, q),
        None => format!("{x}"),
    }
}

/// Continued-fraction expansion of a positive `x`, returning the first
/// convergent `(p, q)` accurate to `TOLERANCE`, or `None` if no
/// convergent within `MAX_DENOMINATOR` gets close enough.
fn best_rational(x: f64) -> Option<(i64, i64)> {
    let (mut p0, mut q0) = (1i64, 0i64);
    let (mut p1, mut q1) = (0i64, 1i64);
    let mut rem = x;

    for _ in 0..64 {
        let a = rem.floor();
        let a_int = a as i64;
        let p2 = a_int * p1 + p0;
        let q2 = a_int * q1 + q0;
        if q2 > MAX_DENOMINATOR {
            break;
        }
        p0 = p1;
        q0 = q1;
        p1 = p2;
        q1 = q2;
        if (x - p1 as f64 / q1 as f64).abs() <= TOLERANCE {
            return Some((p1, q1));
        }
        let frac = rem - a;
        if frac.abs() < 1e-14 {
            break;
        }
        rem = 1.0 / frac;
    }
    if q1 != 0 && (x - p1 as f64 / q1 as f64).abs() <= TOLERANCE * 10.0 {
        Some((p1, q1))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_integers_without_a_slash() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(-2.0), "-2");
        assert_eq!(format_value(0.0), "0");
    }

    #[test]
    fn formats_simple_fractions() {
        assert_eq!(format_value(0.5), "1/2");
        assert_eq!(format_value(-1.0 / 3.0), "-1/3");
        assert_eq!(format_value(2.0 / 7.0), "2/7");
    }

    #[test]
    fn tolerates_floating_point_noise() {
        let noisy = 1.0 / 3.0 + 1e-13;
        assert_eq!(format_value(noisy), "1/3");
    }
}
