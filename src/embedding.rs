//! Input Embedding
//!
//! Maps a batch of token-id sequences to hidden states by summing two
//! learned lookup tables: token identity (`[vocab_size, d_model]`) and
//! absolute position (`[max_len, d_model]`). Dropout applies to the sum in
//! training mode only.
//!
//! Position indices are always `0..L-1`, independent of any padding already
//! present in the sequence: padding tokens take part in position embedding
//! like any other token, and their exclusion from attention is handled
//! entirely by the masking unit downstream.
//!
//! ## Preconditions
//!
//! Enforced at call time, never silently repaired — masking and position
//! correctness depend on strict bounds:
//!
//! - sequence length `<= max_len`, else [`ModelError::SequenceTooLong`]
//! - every id `< vocab_size`, else [`ModelError::TokenOutOfRange`]

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::config::Config;
use crate::error::ModelError;
use crate::layers::linear::INIT_STD;
use crate::layers::{Dropout, Mode};
use crate::tensor::Tensor;

/// Token + position embedding with training-mode dropout.
pub struct InputEmbedding {
    /// Token identity table: `[vocab_size, d_model]`.
    pub token: Tensor,
    /// Absolute position table: `[max_len, d_model]`.
    pub position: Tensor,
    pub dropout: Dropout,
    d_model: usize,
}

impl InputEmbedding {
    /// Both tables are initialized from `N(0, 0.02)` using the model's
    /// seeded RNG.
    pub fn new(config: &Config, rng: &mut StdRng) -> Self {
        let normal = Normal::new(0.0, INIT_STD).unwrap();
        let token_data: Vec<f32> = (0..config.vocab_size * config.d_model)
            .map(|_| normal.sample(rng))
            .collect();
        let position_data: Vec<f32> = (0..config.max_len * config.d_model)
            .map(|_| normal.sample(rng))
            .collect();

        Self {
            token: Tensor::new(token_data, vec![config.vocab_size, config.d_model]),
            position: Tensor::new(position_data, vec![config.max_len, config.d_model]),
            dropout: Dropout::new(config.dropout_rate),
            d_model: config.d_model,
        }
    }

    /// Embed a batch of id sequences into `[batch, seq, d_model]`.
    ///
    /// # Errors
    ///
    /// Fails fast on either precondition violation; no output is produced
    /// for a partially valid batch.
    pub fn forward(&self, ids: &[Vec<usize>], mode: Mode) -> Result<Tensor, ModelError> {
        let batch = ids.len();
        let seq_len = ids.first().map_or(0, |s| s.len());
        let max_len = self.position.shape[0];
        let vocab_size = self.token.shape[0];

        if seq_len > max_len {
            return Err(ModelError::SequenceTooLong {
                len: seq_len,
                max_len,
            });
        }

        let mut out = Vec::with_capacity(batch * seq_len * self.d_model);
        for seq in ids {
            for (pos, &id) in seq.iter().enumerate() {
                if id >= vocab_size {
                    return Err(ModelError::TokenOutOfRange { id, vocab_size });
                }
                let tok_row = &self.token.data[id * self.d_model..(id + 1) * self.d_model];
                let pos_row = &self.position.data[pos * self.d_model..(pos + 1) * self.d_model];
                out.extend(tok_row.iter().zip(pos_row).map(|(t, p)| t + p));
            }
        }

        let x = Tensor::new(out, vec![batch, seq_len, self.d_model]);
        Ok(self.dropout.forward(&x, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn embedding() -> InputEmbedding {
        let mut rng = StdRng::seed_from_u64(9);
        InputEmbedding::new(&Config::tiny(32), &mut rng)
    }

    #[test]
    fn test_output_shape() {
        let emb = embedding();
        let x = emb
            .forward(&[vec![1, 2, 3], vec![4, 5, 6]], Mode::Inference)
            .unwrap();
        assert_eq!(x.shape, vec![2, 3, 8]);
    }

    #[test]
    fn test_embedding_is_token_plus_position_sum() {
        let emb = embedding();
        let x = emb.forward(&[vec![7, 7]], Mode::Inference).unwrap();

        let d = 8;
        for pos in 0..2 {
            for e in 0..d {
                let expected = emb.token.data[7 * d + e] + emb.position.data[pos * d + e];
                assert_eq!(x.data[pos * d + e], expected);
            }
        }
    }

    #[test]
    fn test_sequence_too_long_rejected() {
        let emb = embedding();
        // Config::tiny has max_len 16.
        let long: Vec<usize> = vec![1; 17];
        let err = emb.forward(&[long], Mode::Inference).unwrap_err();
        assert_eq!(
            err,
            ModelError::SequenceTooLong {
                len: 17,
                max_len: 16
            }
        );
    }

    #[test]
    fn test_out_of_range_id_rejected() {
        let emb = embedding();
        let err = emb.forward(&[vec![1, 32]], Mode::Inference).unwrap_err();
        assert_eq!(
            err,
            ModelError::TokenOutOfRange {
                id: 32,
                vocab_size: 32
            }
        );
    }

    #[test]
    fn test_padding_gets_position_embedding_like_any_token() {
        let emb = embedding();
        let x = emb.forward(&[vec![0, 0]], Mode::Inference).unwrap();

        // Same token id at different positions differs by position row.
        let d = 8;
        assert_ne!(x.data[..d], x.data[d..2 * d]);
    }
}
