//! Bloom blur weights
//!
//! A 5-tap separable Gaussian. The centre tap is used once and the four side taps
//! twice (mirrored), so the weights are normalized by `w0 + 2 * (w1 + .. + w4)`.

/// Variance of the blur kernel
pub const SIGMA_SQUARED: f32 = 9.0;

/// Number of taps on one side including the centre
pub const TAPS: usize = 5;

/// Gaussian density at `x`
pub fn gauss(x: f32, sigma_squared: f32) -> f32 {
    let coefficient = 1.0 / (2.0 * std::f64::consts::PI * f64::from(sigma_squared));
    let exponent = -f64::from(x * x) / (2.0 * f64::from(sigma_squared));
    (coefficient * exponent.exp()) as f32
}

/// Normalized blur weights, centre first
pub fn gaussian_weights(sigma_squared: f32) -> [f32; TAPS] {
    let mut weights = [0.0; TAPS];
    let mut sum = 0.0;
    for (i, weight) in weights.iter_mut().enumerate() {
        *weight = gauss(i as f32, sigma_squared);
        sum += if i == 0 { *weight } else { 2.0 * *weight };
    }
    for weight in &mut weights {
        *weight /= sum;
    }
    weights
}

/// Blur pass direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurDirection {
    /// Along x
    Horizontal,
    /// Along y
    Vertical,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mirrored_weights_sum_to_one() {
        let w = gaussian_weights(SIGMA_SQUARED);
        let total = w[0] + 2.0 * (w[1] + w[2] + w[3] + w[4]);
        assert_relative_eq!(total, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_weights_decrease_from_centre() {
        let w = gaussian_weights(SIGMA_SQUARED);
        for pair in w.windows(2) {
            assert!(pair[0] > pair[1]);
        }
        // Ratio between neighbours is fixed by sigma alone
        assert_relative_eq!(w[1] / w[0], (-1.0f32 / 18.0).exp(), epsilon = 1e-6);
    }
}
