use nalgebra::Vector3;

use crate::wavefunction::LogWfn;

/// Default finite-difference step for the kinetic energy.
pub const DEFAULT_FD_STEP: f64 = 1e-3;

/// Local kinetic energy -½ ∇²Ψ / Ψ = -½ Σᵢ (∇ᵢ² ln|Ψ| + |∇ᵢ ln|Ψ||²).
///
/// `h` is the finite-difference step for wavefunctions without closed-form
/// derivatives; the estimate inherits any periodicity of the wavefunction.
pub fn kinetic_energy<W: LogWfn + ?Sized>(wfn: &W, r: &[Vector3<f64>], h: f64) -> f64 {
    let (grad, lap) = wfn.log_derivatives(r, h);
    -0.5 * grad.iter()
        .zip(lap.iter())
        .map(|(g, l)| l + g.norm_squared())
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Product of 3D harmonic oscillator ground states, exp(-ω r²/2) per electron.
    struct Oscillator {
        omega: f64,
    }

    impl LogWfn for Oscillator {
        fn nspins(&self) -> (usize, usize) {
            (1, 1)
        }

        fn log_psi(&self, r: &[Vector3<f64>]) -> (f64, f64) {
            (1.0, -0.5 * self.omega * r.iter().map(|x| x.norm_squared()).sum::<f64>())
        }
    }

    #[test]
    fn test_harmonic_oscillator_kinetic_energy() {
        // T_L = 3ω - ω² r²/2 per electron
        let wfn = Oscillator { omega: 0.8 };
        let r = vec![Vector3::new(0.3, -0.2, 0.5), Vector3::new(1.0, 0.4, 0.0)];
        let expected: f64 = r.iter().map(|x| 1.5 * 0.8 - 0.5 * 0.64 * x.norm_squared()).sum();
        assert_relative_eq!(kinetic_energy(&wfn, &r, DEFAULT_FD_STEP), expected, epsilon = 1e-6);
    }
}
