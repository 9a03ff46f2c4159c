//! Atomic basis functions: Slater-type and contracted Cartesian Gaussian orbitals.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::traits::SingleWfn;

/// STO-3G contraction coefficients shared by every 1s shell.
const STO3G_1S_COEFFICIENTS: [f64; 3] = [0.15432897, 0.53532814, 0.44463454];

/// Slater-Type Orbital (STO) basis function.
///
/// ψ(r) = Σᵥ cᵥ sⁿᵛ exp(-ζᵥ s), s = |r - center|
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Sto {
    pub center: Vector3<f64>,
    /// Contraction coefficients
    pub coefficients: Vec<f64>,
    /// Radial powers
    pub powers: Vec<i32>,
    /// Orbital exponents
    pub exponents: Vec<f64>,
}

impl Sto {
    /// Normalized 1s orbital with exponent `zeta`.
    pub fn one_s(center: Vector3<f64>, zeta: f64) -> Self {
        Self {
            center,
            coefficients: vec![(zeta.powi(3) / PI).sqrt()],
            powers: vec![0],
            exponents: vec![zeta],
        }
    }

    fn terms(&self) -> impl Iterator<Item = (f64, i32, f64)> + '_ {
        self.coefficients.iter()
            .zip(self.powers.iter())
            .zip(self.exponents.iter())
            .map(|((&c, &p), &z)| (c, p, z))
    }

    /// Radial part R(s) and its first two derivatives in s.
    fn radial(&self, s: f64) -> (f64, f64, f64) {
        self.terms().fold((0.0, 0.0, 0.0), |(f, f1, f2), (c, p, z)| {
            let n = p as f64;
            let g = c * s.powi(p) * (-z * s).exp();
            // d/ds ln(sⁿ e^{-ζs}) = n/s - ζ
            let q = n / s - z;
            (f + g, f1 + g * q, f2 + g * (q * q - n / (s * s)))
        })
    }
}

impl SingleWfn for Sto {
    fn evaluate(&self, r: &Vector3<f64>) -> f64 {
        let s = (r - self.center).norm();
        self.terms().map(|(c, p, z)| c * s.powi(p) * (-z * s).exp()).sum()
    }

    /// R'(s) r̂; zero at the centre.
    fn gradient(&self, r: &Vector3<f64>) -> Vector3<f64> {
        let dr = r - self.center;
        let s = dr.norm();
        if s == 0.0 {
            return Vector3::zeros();
        }
        dr * (self.radial(s).1 / s)
    }

    /// R''(s) + 2R'(s)/s; zero at the centre.
    fn laplacian(&self, r: &Vector3<f64>) -> f64 {
        let s = (r - self.center).norm();
        if s == 0.0 {
            return 0.0;
        }
        let (_, d1, d2) = self.radial(s);
        d2 + 2.0 * d1 / s
    }
}

/// Gaussian primitive exp(-α r²) with its (normalized) contraction coefficient.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct GaussianPrimitive {
    pub exponent: f64,
    pub coefficient: f64,
}

/// Contracted Cartesian Gaussian: Σₚ cₚ xˡ yᵐ zⁿ exp(-αₚ r²).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ContractedGaussian {
    pub center: Vector3<f64>,
    /// Cartesian angular powers (l, m, n)
    pub powers: [i32; 3],
    pub primitives: Vec<GaussianPrimitive>,
}

fn double_factorial(n: i32) -> f64 {
    (1..=n).rev().step_by(2).map(|k| k as f64).product()
}

#[inline]
fn monomial(x: f64, n: i32) -> f64 {
    if n < 0 { 0.0 } else { x.powi(n) }
}

impl ContractedGaussian {
    /// Build a contraction, folding the primitive normalization into the coefficients.
    pub fn new(
        center: Vector3<f64>,
        powers: [i32; 3],
        exponents: &[f64],
        coefficients: &[f64],
    ) -> Self {
        let [l, m, n] = powers;
        let angular_norm = (double_factorial(2 * l - 1)
            * double_factorial(2 * m - 1)
            * double_factorial(2 * n - 1))
            .sqrt();
        let total = (l + m + n) as f64;
        let primitives = exponents.iter()
            .zip(coefficients.iter())
            .map(|(&a, &c)| {
                let norm = (2.0 * a / PI).powf(0.75) * (4.0 * a).powf(total / 2.0) / angular_norm;
                GaussianPrimitive { exponent: a, coefficient: c * norm }
            })
            .collect();
        Self { center, powers, primitives }
    }

    /// One-dimensional factor xⁿ e^{-αx²} and its first two derivatives,
    /// without the exponential.
    fn axis_terms(x: f64, n: i32, a: f64) -> (f64, f64, f64) {
        let nf = n as f64;
        let f = monomial(x, n);
        let f1 = nf * monomial(x, n - 1) - 2.0 * a * monomial(x, n + 1);
        let f2 = nf * (nf - 1.0) * monomial(x, n - 2)
            - 2.0 * a * (2.0 * nf + 1.0) * monomial(x, n)
            + 4.0 * a * a * monomial(x, n + 2);
        (f, f1, f2)
    }
}

impl SingleWfn for ContractedGaussian {
    fn evaluate(&self, r: &Vector3<f64>) -> f64 {
        let dr = r - self.center;
        let angular: f64 = (0..3).map(|k| monomial(dr[k], self.powers[k])).product();
        let radial: f64 = self.primitives.iter()
            .map(|p| p.coefficient * (-p.exponent * dr.norm_squared()).exp())
            .sum();
        angular * radial
    }

    fn gradient(&self, r: &Vector3<f64>) -> Vector3<f64> {
        let dr = r - self.center;
        let r2 = dr.norm_squared();
        let mut grad = Vector3::zeros();
        for p in &self.primitives {
            let terms: Vec<(f64, f64, f64)> = (0..3)
                .map(|k| Self::axis_terms(dr[k], self.powers[k], p.exponent))
                .collect();
            let weight = p.coefficient * (-p.exponent * r2).exp();
            grad.x += weight * terms[0].1 * terms[1].0 * terms[2].0;
            grad.y += weight * terms[0].0 * terms[1].1 * terms[2].0;
            grad.z += weight * terms[0].0 * terms[1].0 * terms[2].1;
        }
        grad
    }

    fn laplacian(&self, r: &Vector3<f64>) -> f64 {
        let dr = r - self.center;
        let r2 = dr.norm_squared();
        self.primitives.iter()
            .map(|p| {
                let t: Vec<(f64, f64, f64)> = (0..3)
                    .map(|k| Self::axis_terms(dr[k], self.powers[k], p.exponent))
                    .collect();
                let weight = p.coefficient * (-p.exponent * r2).exp();
                weight * (t[0].2 * t[1].0 * t[2].0
                    + t[0].0 * t[1].2 * t[2].0
                    + t[0].0 * t[1].0 * t[2].2)
            })
            .sum()
    }
}

/// An atomic orbital of either kind.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BasisFunction {
    Slater(Sto),
    Gaussian(ContractedGaussian),
}

impl SingleWfn for BasisFunction {
    fn evaluate(&self, r: &Vector3<f64>) -> f64 {
        match self {
            BasisFunction::Slater(f) => f.evaluate(r),
            BasisFunction::Gaussian(f) => f.evaluate(r),
        }
    }

    fn gradient(&self, r: &Vector3<f64>) -> Vector3<f64> {
        match self {
            BasisFunction::Slater(f) => f.gradient(r),
            BasisFunction::Gaussian(f) => f.gradient(r),
        }
    }

    fn laplacian(&self, r: &Vector3<f64>) -> f64 {
        match self {
            BasisFunction::Slater(f) => f.laplacian(r),
            BasisFunction::Gaussian(f) => f.laplacian(r),
        }
    }
}

/// STO-3G shells for the elements that need only a 1s function.
pub fn sto3g(symbol: &str, center: Vector3<f64>) -> Option<Vec<BasisFunction>> {
    let exponents = match symbol {
        "H" => [3.42525091, 0.62391373, 0.16885540],
        "He" => [6.36242139, 1.15892300, 0.31364979],
        _ => return None,
    };
    Some(vec![BasisFunction::Gaussian(ContractedGaussian::new(
        center,
        [0, 0, 0],
        &exponents,
        &STO3G_1S_COEFFICIENTS,
    ))])
}
