//! Dropout Layer
//!
//! Randomly zeroes activations during training to regularize the model,
//! scaling survivors by `1 / (1 - rate)` so expected magnitude is unchanged.
//! In [`Mode::Inference`] it is the identity, which is what makes generation
//! fully deterministic.

use super::Mode;
use crate::tensor::Tensor;

/// Training-only dropout. Holds no parameters, only the drop probability.
pub struct Dropout {
    pub rate: f32,
}

impl Dropout {
    /// # Panics
    ///
    /// Panics if `rate` is outside `[0.0, 1.0)`; the config validates this
    /// range before any layer is built.
    pub fn new(rate: f32) -> Self {
        assert!(
            (0.0..1.0).contains(&rate),
            "dropout rate must be in [0.0, 1.0), got {rate}"
        );
        Self { rate }
    }

    /// Identity at inference or when the rate is zero; otherwise drops each
    /// element independently with probability `rate`.
    pub fn forward(&self, x: &Tensor, mode: Mode) -> Tensor {
        if mode == Mode::Inference || self.rate == 0.0 {
            return x.clone();
        }

        let scale = 1.0 / (1.0 - self.rate);
        let data = x
            .data
            .iter()
            .map(|&v| {
                if rand::random::<f32>() < self.rate {
                    0.0
                } else {
                    v * scale
                }
            })
            .collect();

        Tensor::new(data, x.shape.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_is_identity() {
        let dropout = Dropout::new(0.9);
        let x = Tensor::new(vec![1.0, 2.0, 3.0], vec![3]);
        assert_eq!(dropout.forward(&x, Mode::Inference).data, x.data);
    }

    #[test]
    fn test_zero_rate_is_identity_even_in_training() {
        let dropout = Dropout::new(0.0);
        let x = Tensor::new(vec![1.0, 2.0, 3.0], vec![3]);
        assert_eq!(dropout.forward(&x, Mode::Training).data, x.data);
    }

    #[test]
    fn test_training_drops_and_scales() {
        let dropout = Dropout::new(0.5);
        let x = Tensor::new(vec![1.0; 1000], vec![1000]);
        let y = dropout.forward(&x, Mode::Training);

        // Survivors are scaled by 2.0, dropped entries are exactly zero.
        assert!(y.data.iter().all(|&v| v == 0.0 || v == 2.0));
        let dropped = y.data.iter().filter(|&&v| v == 0.0).count();
        assert!(dropped > 300 && dropped < 700, "dropped {dropped} of 1000");
    }

    #[test]
    #[should_panic(expected = "dropout rate")]
    fn test_rate_of_one_panics() {
        Dropout::new(1.0);
    }
}
