//! Discrete Gaussian and ternary sampling
//!
//! Error polynomials use a rounded-Gaussian rejection sampler tail-cut at 6σ;
//! secret keys and encryption randomness are uniform ternary.

use rand::Rng;

/// Default Gaussian standard deviation
pub const DEFAULT_SIGMA: f64 = 3.2;

/// Discrete Gaussian sampler over Z using rejection sampling
#[derive(Debug, Clone, Copy)]
pub struct GaussianSampler {
    /// Standard deviation σ
    sigma: f64,
    /// Reject samples beyond this bound
    tailcut: i64,
}

impl GaussianSampler {
    /// Create a new Gaussian sampler with given standard deviation
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            tailcut: (sigma * 6.0).ceil() as i64,
        }
    }

    /// Get the standard deviation
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Largest magnitude this sampler can return
    pub fn bound(&self) -> i64 {
        self.tailcut
    }

    /// Sample a single value from D_σ
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let sigma_sq_2 = 2.0 * self.sigma * self.sigma;
        loop {
            let x = rng.gen_range(-self.tailcut..=self.tailcut);
            let prob = (-((x * x) as f64) / sigma_sq_2).exp();
            if rng.gen::<f64>() < prob {
                return x;
            }
        }
    }

    /// Sample a vector of n values
    pub fn sample_vec<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<i64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

impl Default for GaussianSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SIGMA)
    }
}

/// Sample n values uniformly from {-1, 0, 1}
pub fn sample_ternary<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<i64> {
    (0..n).map(|_| rng.gen_range(-1i64..=1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_gaussian_distribution() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let sampler = GaussianSampler::new(3.2);

        let samples = sampler.sample_vec(10000, &mut rng);

        let mean: f64 = samples.iter().map(|&x| x as f64).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.5, "Mean {} should be close to 0", mean);

        let variance: f64 = samples
            .iter()
            .map(|&x| (x as f64 - mean).powi(2))
            .sum::<f64>()
            / samples.len() as f64;
        let std_dev = variance.sqrt();
        assert!(
            (std_dev - 3.2).abs() < 0.5,
            "Std dev {} should be close to 3.2",
            std_dev
        );
    }

    #[test]
    fn test_tailcut_respected() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let sampler = GaussianSampler::new(3.2);
        assert!(sampler
            .sample_vec(5000, &mut rng)
            .iter()
            .all(|x| x.abs() <= sampler.bound()));
    }

    #[test]
    fn test_ternary_range() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let t = sample_ternary(3000, &mut rng);
        assert!(t.iter().all(|&x| (-1..=1).contains(&x)));
        assert!(t.contains(&-1) && t.contains(&0) && t.contains(&1));
    }
}
