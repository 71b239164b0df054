//! Layer Normalization
//!
//! Normalizes each position's feature vector to zero mean and unit variance,
//! then applies a learned scale and shift. The decoder uses the pre-norm
//! discipline: normalization happens *before* each sublayer, which keeps
//! activations stable as depth grows.
//!
//! ```text
//! output = (x - mean) / sqrt(variance + eps) * gamma + beta
//! ```

use rayon::prelude::*;

use crate::tensor::Tensor;

/// Per-feature normalization over the last axis.
pub struct LayerNorm {
    /// Learned scale: `[d_model]`, initialized to one.
    pub gamma: Tensor,
    /// Learned shift: `[d_model]`, initialized to zero.
    pub beta: Tensor,
    /// Guards against division by zero on constant rows.
    pub eps: f32,
}

impl LayerNorm {
    pub fn new(d_model: usize, eps: f32) -> Self {
        Self {
            gamma: Tensor::new(vec![1.0; d_model], vec![d_model]),
            beta: Tensor::zeros(vec![d_model]),
            eps,
        }
    }

    /// Normalize along the last axis; every leading dimension indexes an
    /// independent row. Rows are processed in parallel.
    pub fn forward(&self, x: &Tensor) -> Tensor {
        let d_model = *x.shape.last().expect("layer norm on 0-rank tensor");
        assert_eq!(
            d_model,
            self.gamma.data.len(),
            "layer norm width {} does not match input {:?}",
            self.gamma.data.len(),
            x.shape
        );

        let mut out = x.data.clone();
        out.par_chunks_mut(d_model).for_each(|row| {
            let mean = row.iter().sum::<f32>() / d_model as f32;
            let var = row.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / d_model as f32;
            let inv_std = 1.0 / (var + self.eps).sqrt();

            for (d, v) in row.iter_mut().enumerate() {
                *v = (*v - mean) * inv_std * self.gamma.data[d] + self.beta.data[d];
            }
        });

        Tensor::new(out, x.shape.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_has_zero_mean_unit_variance() {
        let ln = LayerNorm::new(4, 1e-5);
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![1, 1, 4]);
        let y = ln.forward(&x);

        let mean: f32 = y.data.iter().sum::<f32>() / 4.0;
        let var: f32 = y.data.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-5);
        assert!((var - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_constant_row_stays_finite() {
        let ln = LayerNorm::new(3, 1e-5);
        let x = Tensor::new(vec![5.0, 5.0, 5.0], vec![1, 3]);
        let y = ln.forward(&x);
        assert!(y.data.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_gamma_beta_applied() {
        let mut ln = LayerNorm::new(2, 1e-5);
        ln.gamma = Tensor::new(vec![0.0, 0.0], vec![2]);
        ln.beta = Tensor::new(vec![3.0, -3.0], vec![2]);
        let y = ln.forward(&Tensor::new(vec![1.0, 2.0], vec![1, 2]));
        assert_eq!(y.data, vec![3.0, -3.0]);
    }
}
