//! Attention Visibility Masking
//!
//! Derives, per forward pass, the combined mask that decides which (query,
//! key) pairs an attention head may use. Two components are combined by
//! elementwise product:
//!
//! - **Causal**: position `i` may attend to position `j` iff `j <= i`
//!   (lower-triangular, diagonal included). Identical for every sequence in
//!   the batch; this is what makes generation autoregressively valid, since
//!   no position can read information from the future.
//! - **Padding**: position `j` is visible as a *key* iff its id is not the
//!   padding sentinel. Padding never blocks a *query* row: a padding token
//!   may still attend and produce an output that downstream consumers
//!   ignore. Without this component, batched sequences of different true
//!   lengths would corrupt each other's attention with filler keys.
//!
//! The combined mask has shape `[batch, 1, seq, seq]` and broadcasts across
//! heads when applied to scores. It is rebuilt from the raw ids on every
//! forward pass and never persisted.

use crate::error::ModelError;
use crate::tensor::Tensor;

/// Reserved token id marking non-content positions. Never a valid attention
/// key and never produced by generation-facing tokenizers.
pub const PAD_ID: usize = 0;

/// Score assigned to blocked (query, key) pairs before softmax.
///
/// Large and negative rather than `-inf`: after the stable softmax's row-max
/// shift, blocked pairs underflow to exactly zero probability, while a row
/// whose visible keys are all padding degenerates to a uniform distribution
/// instead of NaN.
pub const MASKED_SCORE: f32 = -1e9;

/// Combined causal + padding visibility mask for one forward pass.
///
/// Stored as a 0/1 tensor of shape `[batch, 1, seq, seq]` where 0 means
/// "query may not attend to key".
pub struct AttentionMask {
    mask: Tensor,
}

impl AttentionMask {
    /// Build the combined mask from raw input ids.
    ///
    /// # Arguments
    ///
    /// * `ids` - Batch of id sequences, all of equal length
    ///
    /// # Panics
    ///
    /// Panics if the batch is empty or sequences have unequal lengths; the
    /// decoder stack pads batches to a common length before calling in.
    pub fn build(ids: &[Vec<usize>]) -> Self {
        let batch = ids.len();
        assert!(batch > 0, "cannot build a mask for an empty batch");
        let seq_len = ids[0].len();
        assert!(
            ids.iter().all(|s| s.len() == seq_len),
            "all sequences in a batch must have equal length"
        );

        let mut data = vec![0.0; batch * seq_len * seq_len];
        for (b, seq) in ids.iter().enumerate() {
            let base = b * seq_len * seq_len;
            for i in 0..seq_len {
                // Causal: keys up to and including the diagonal.
                for j in 0..=i {
                    if seq[j] != PAD_ID {
                        data[base + i * seq_len + j] = 1.0;
                    }
                }
            }
        }

        Self {
            mask: Tensor::new(data, vec![batch, 1, seq_len, seq_len]),
        }
    }

    /// Shape of the underlying mask tensor, `[batch, 1, seq, seq]`.
    pub fn shape(&self) -> &[usize] {
        &self.mask.shape
    }

    /// Whether `query` may attend to `key` in batch entry `b`.
    pub fn is_visible(&self, b: usize, query: usize, key: usize) -> bool {
        let seq_len = self.mask.shape[2];
        self.mask.data[(b * seq_len + query) * seq_len + key] != 0.0
    }

    /// Apply the mask to attention scores of shape `[batch, heads, seq, seq]`,
    /// forcing blocked pairs to [`MASKED_SCORE`]. The head axis broadcasts.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MaskShapeMismatch`] if the score shape does not
    /// broadcast against the mask, which signals a configuration or
    /// integration bug upstream.
    pub fn apply(&self, scores: &Tensor) -> Result<Tensor, ModelError> {
        let (batch, seq_len) = (self.mask.shape[0], self.mask.shape[2]);

        let compatible = scores.shape.len() == 4
            && scores.shape[0] == batch
            && scores.shape[2] == seq_len
            && scores.shape[3] == seq_len;
        if !compatible {
            return Err(ModelError::MaskShapeMismatch {
                mask: self.mask.shape.clone(),
                scores: scores.shape.clone(),
            });
        }

        let heads = scores.shape[1];
        let per_batch = heads * seq_len * seq_len;
        let per_head = seq_len * seq_len;

        let data = scores
            .data
            .iter()
            .enumerate()
            .map(|(idx, &score)| {
                let b = idx / per_batch;
                let pair = idx % per_head;
                if self.mask.data[b * per_head + pair] != 0.0 {
                    score
                } else {
                    MASKED_SCORE
                }
            })
            .collect();

        Ok(Tensor::new(data, scores.shape.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_causal_structure_without_padding() {
        let mask = AttentionMask::build(&[vec![5, 7, 9]]);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(mask.is_visible(0, i, j), j <= i, "query {i}, key {j}");
            }
        }
    }

    #[test]
    fn test_padding_blocks_keys_not_queries() {
        // Trailing pad at position 2.
        let mask = AttentionMask::build(&[vec![5, 7, PAD_ID]]);

        // Pad position is never a visible key.
        assert!(!mask.is_visible(0, 2, 2));

        // But the pad query row still sees earlier real tokens.
        assert!(mask.is_visible(0, 2, 0));
        assert!(mask.is_visible(0, 2, 1));
    }

    #[test]
    fn test_mask_differs_per_batch_entry() {
        let mask = AttentionMask::build(&[vec![5, 7], vec![5, PAD_ID]]);
        assert!(mask.is_visible(0, 1, 1));
        assert!(!mask.is_visible(1, 1, 1));
    }

    #[test]
    fn test_apply_broadcasts_over_heads() {
        let mask = AttentionMask::build(&[vec![5, 7]]);
        let scores = Tensor::new(vec![1.0; 2 * 2 * 2], vec![1, 2, 2, 2]);
        let masked = mask.apply(&scores).unwrap();

        // Both heads get the same pattern: (0,1) blocked, rest visible.
        for h in 0..2 {
            let base = h * 4;
            assert_eq!(masked.data[base], 1.0);
            assert_eq!(masked.data[base + 1], MASKED_SCORE);
            assert_eq!(masked.data[base + 2], 1.0);
            assert_eq!(masked.data[base + 3], 1.0);
        }
    }

    #[test]
    fn test_apply_rejects_mismatched_scores() {
        let mask = AttentionMask::build(&[vec![5, 7]]);
        let scores = Tensor::zeros(vec![1, 2, 3, 3]);
        let err = mask.apply(&scores).unwrap_err();
        assert!(matches!(err, ModelError::MaskShapeMismatch { .. }));
    }

    #[test]
    fn test_all_pad_prefix_row_stays_finite_after_softmax() {
        // Position 0 is padding, so its query row has no visible key.
        let mask = AttentionMask::build(&[vec![PAD_ID, 5]]);
        let scores = Tensor::zeros(vec![1, 1, 2, 2]);
        let probs = mask.apply(&scores).unwrap().softmax_last();
        assert!(probs.data.iter().all(|p| p.is_finite()));
    }
}
