//! Statistics of correlated Monte Carlo series.

/// Mean, blocking error and integrated autocorrelation time of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub mean: f64,
    pub error: f64,
    pub autocorrelation_time: f64,
}

impl SeriesStats {
    pub fn from_series(series: &[f64]) -> Self {
        let tau = autocorrelation_time(series);
        Self {
            mean: mean(series),
            error: blocking_error(series, tau),
            autocorrelation_time: tau,
        }
    }
}

pub fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

/// Population variance.
pub fn variance(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let m = mean(series);
    series.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / series.len() as f64
}

/// Integrated autocorrelation time, summed up to the first negative lag.
pub fn autocorrelation_time(series: &[f64]) -> f64 {
    let n = series.len();
    let m = mean(series);
    let var = variance(series);
    if var == 0.0 {
        return 1.0;
    }

    let mut tau = 1.0;
    for t in 1..n / 2 {
        let rho: f64 = series[..n - t].iter()
            .zip(series[t..].iter())
            .map(|(&x, &y)| (x - m) * (y - m))
            .sum::<f64>() / ((n - t) as f64 * var);
        if rho < 0.0 {
            break;
        }
        tau += 2.0 * rho;
    }
    tau
}

/// Standard error of the mean from blocks of length ⌈2τ⌉.
pub fn blocking_error(series: &[f64], autocorrelation_time: f64) -> f64 {
    let block_size = ((2.0 * autocorrelation_time).ceil() as usize).max(1);
    let n_blocks = series.len() / block_size;
    if n_blocks < 2 {
        return 0.0;
    }

    let block_means: Vec<f64> = series
        .chunks_exact(block_size)
        .map(mean)
        .collect();
    let m = mean(&block_means);
    let var = block_means.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (n_blocks - 1) as f64;
    (var / n_blocks as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_series() {
        let stats = SeriesStats::from_series(&[2.5; 10]);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.error, 0.0);
        assert_eq!(stats.autocorrelation_time, 1.0);
    }

    #[test]
    fn test_alternating_series_is_uncorrelated() {
        let series: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert_relative_eq!(autocorrelation_time(&series), 1.0);
        assert_relative_eq!(mean(&series), 0.0);
        assert_relative_eq!(variance(&series), 1.0);
    }

    #[test]
    fn test_blocking_error_of_independent_blocks() {
        let series = [1.0, 3.0, 1.0, 3.0];
        // two blocks of two, both with mean 2
        assert_relative_eq!(blocking_error(&series, 1.0), 0.0);
        let series = [0.0, 0.0, 2.0, 2.0];
        assert_relative_eq!(blocking_error(&series, 1.0), 1.0, epsilon = 1e-12);
    }
}
