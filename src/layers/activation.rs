//! Activation Functions
//!
//! The feed-forward sublayer uses GELU, the transformer-standard smooth
//! alternative to ReLU, via the usual tanh approximation:
//!
//! ```text
//! GELU(x) ≈ 0.5 * x * (1 + tanh(sqrt(2/π) * (x + 0.044715 * x³)))
//! ```

use crate::tensor::Tensor;

/// Element-wise GELU (tanh approximation).
pub fn gelu(x: &Tensor) -> Tensor {
    let sqrt_2_over_pi = (2.0_f32 / std::f32::consts::PI).sqrt();
    let coeff = 0.044715_f32;

    let data = x
        .data
        .iter()
        .map(|&v| {
            let inner = sqrt_2_over_pi * (v + coeff * v * v * v);
            0.5 * v * (1.0 + inner.tanh())
        })
        .collect();

    Tensor::new(data, x.shape.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gelu_known_points() {
        let x = Tensor::new(vec![0.0, 1.0, -1.0], vec![3]);
        let y = gelu(&x);
        assert_eq!(y.data[0], 0.0);
        assert!((y.data[1] - 0.8412).abs() < 1e-3);
        assert!((y.data[2] + 0.1588).abs() < 1e-3);
    }

    #[test]
    fn test_gelu_monotone_for_positive_inputs() {
        let x = Tensor::new(vec![0.5, 1.0, 2.0, 4.0], vec![4]);
        let y = gelu(&x);
        assert!(y.data.windows(2).all(|w| w[0] < w[1]));
    }
}
