//! Log-domain determinants.

use nalgebra::DMatrix;

/// Sign and natural log of the absolute determinant, via LU decomposition.
///
/// An empty matrix has determinant one; a singular matrix gives `(0, -inf)`.
pub fn slogdet(m: &DMatrix<f64>) -> (f64, f64) {
    let n = m.nrows();
    if n == 0 {
        return (1.0, 0.0);
    }
    let lu = m.clone().lu();
    let mut sign = lu.p().determinant::<f64>();
    let mut log_abs = 0.0;
    let u = lu.u();
    for i in 0..n {
        let d = u[(i, i)];
        if d == 0.0 || !d.is_finite() {
            return (0.0, f64::NEG_INFINITY);
        }
        sign *= d.signum();
        log_abs += d.abs().ln();
    }
    (sign, log_abs)
}

/// ln|Σₖ sₖ exp(lₖ)| and its sign, for terms given as `(sₖ, lₖ)`.
pub fn logsumexp_signed(terms: &[(f64, f64)]) -> (f64, f64) {
    let max = terms.iter()
        .filter(|(s, _)| *s != 0.0)
        .map(|&(_, l)| l)
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return (0.0, f64::NEG_INFINITY);
    }
    let sum: f64 = terms.iter().map(|&(s, l)| s * (l - max).exp()).sum();
    if sum == 0.0 {
        return (0.0, f64::NEG_INFINITY);
    }
    (sum.signum(), max + sum.abs().ln())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_slogdet_matches_determinant() {
        let m = DMatrix::from_row_slice(3, 3, &[
            0.0, 2.0, 1.0,
            1.5, -1.0, 0.3,
            0.2, 0.7, -2.0,
        ]);
        let det = m.determinant();
        let (sign, log_abs) = slogdet(&m);
        assert_eq!(sign, det.signum());
        assert_relative_eq!(log_abs, det.abs().ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_slogdet_edge_cases() {
        assert_eq!(slogdet(&DMatrix::zeros(0, 0)), (1.0, 0.0));
        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let (sign, log_abs) = slogdet(&singular);
        assert_eq!(sign, 0.0);
        assert_eq!(log_abs, f64::NEG_INFINITY);
    }

    #[test]
    fn test_slogdet_large_scale_does_not_overflow() {
        let m = DMatrix::<f64>::identity(40, 40) * 1e10;
        let (sign, log_abs) = slogdet(&m);
        assert_eq!(sign, 1.0);
        assert_relative_eq!(log_abs, 400.0 * 10f64.ln(), epsilon = 1e-9);
    }

    #[test]
    fn test_logsumexp_signed() {
        let (s, l) = logsumexp_signed(&[(1.0, 3f64.ln()), (-1.0, 1f64.ln())]);
        assert_eq!(s, 1.0);
        assert_relative_eq!(l, 2f64.ln(), epsilon = 1e-12);

        let (s, l) = logsumexp_signed(&[(1.0, 800.0), (-1.0, 801.0)]);
        assert_eq!(s, -1.0);
        assert_relative_eq!(l, 801.0 + (1.0 - (-1f64).exp()).ln(), epsilon = 1e-9);

        assert_eq!(logsumexp_signed(&[(0.0, f64::NEG_INFINITY)]).0, 0.0);
    }
}
