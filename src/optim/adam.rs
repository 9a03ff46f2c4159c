//! Adam on flat parameter vectors.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct AdamOptions {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
}

impl Default for AdamOptions {
    fn default() -> Self {
        Self {
            learning_rate: 3e-4,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }
}

/// Adam optimizer state with bias-corrected moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    pub options: AdamOptions,
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

impl Adam {
    pub fn new(num_params: usize, options: AdamOptions) -> Self {
        Self {
            options,
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
            t: 0,
        }
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Move `params` against `grad` in place.
    pub fn step(&mut self, params: &mut [f64], grad: &[f64]) {
        assert_eq!(params.len(), self.m.len(), "parameter vector has the wrong length");
        assert_eq!(grad.len(), self.m.len(), "gradient vector has the wrong length");
        let AdamOptions { learning_rate, beta1, beta2, eps } = self.options;

        self.t += 1;
        let correction1 = 1.0 - beta1.powi(self.t);
        let correction2 = 1.0 - beta2.powi(self.t);
        for i in 0..params.len() {
            self.m[i] = beta1 * self.m[i] + (1.0 - beta1) * grad[i];
            self.v[i] = beta2 * self.v[i] + (1.0 - beta2) * grad[i] * grad[i];
            let m_hat = self.m[i] / correction1;
            let v_hat = self.v[i] / correction2;
            params[i] -= learning_rate * m_hat / (v_hat.sqrt() + eps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(2, AdamOptions { learning_rate: 0.1, ..Default::default() });
        let mut params = vec![1.0, -2.0];
        adam.step(&mut params, &[3.0, -0.5]);
        assert_relative_eq!(params[0], 0.9, epsilon = 1e-6);
        assert_relative_eq!(params[1], -1.9, epsilon = 1e-6);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn test_minimizes_quadratic() {
        let mut adam = Adam::new(3, AdamOptions { learning_rate: 0.05, ..Default::default() });
        let target = [1.0, -3.0, 0.5];
        let mut params = vec![0.0; 3];
        for _ in 0..2000 {
            let grad: Vec<f64> = params.iter()
                .zip(target.iter())
                .map(|(p, t)| 2.0 * (p - t))
                .collect();
            adam.step(&mut params, &grad);
        }
        for (p, t) in params.iter().zip(target.iter()) {
            assert_relative_eq!(p, t, epsilon = 1e-2);
        }
    }
}
