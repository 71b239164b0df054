//! Autoregressive Generation
//!
//! Drives the decoder stack one token at a time: run the full (growing)
//! sequence through the model in inference mode, take the logits at the last
//! position, softmax, pick the single highest-probability token, append, and
//! repeat. The sequence grows monotonically; there is no sliding window and
//! no truncation, so the caller must ensure
//! `prompt.len() + max_new_tokens <= max_len` or a later step fails with the
//! embedding precondition and the whole generation aborts with no partial
//! output.
//!
//! ## Selection policy
//!
//! Selection is a deterministic argmax with ties broken toward the *lowest*
//! token id (see [`argmax`]). Running the loop twice with the same model and
//! prompt therefore yields byte-identical output.
//!
//! ## Termination
//!
//! The loop stops after exactly `max_new_tokens` appends and for no other
//! reason: there is no stop-token detection. Callers wanting earlier
//! termination bound `max_new_tokens` before invoking.

use tracing::debug;

use crate::error::{GenerationError, ModelError};
use crate::layers::Mode;
use crate::model::DecoderStack;
use crate::tokenizer::Tokenize;

/// The generation loop's control state, kept explicit so the transition rule
/// is testable apart from any tensor math.
///
/// `Running { remaining }` counts appends still owed; the transition is
/// "append one token, decrement; at zero, move to `Done`". `Done` is
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationState {
    Running { remaining: usize },
    Done,
}

impl GenerationState {
    /// Initial state for a budget of `max_new_tokens`; a zero budget starts
    /// (and ends) at `Done`.
    pub fn new(max_new_tokens: usize) -> Self {
        if max_new_tokens == 0 {
            GenerationState::Done
        } else {
            GenerationState::Running {
                remaining: max_new_tokens,
            }
        }
    }

    /// Consume one append from the budget.
    pub fn advance(self) -> Self {
        match self {
            GenerationState::Running { remaining } if remaining > 1 => GenerationState::Running {
                remaining: remaining - 1,
            },
            _ => GenerationState::Done,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, GenerationState::Done)
    }
}

/// Index of the largest value, ties broken toward the lowest index.
///
/// This is the loop's entire selection policy: a plain forward max-scan, so
/// equal probabilities resolve to the smallest token id. Deliberate and
/// documented rather than configurable.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Extend a prompt id sequence by exactly `max_new_tokens` greedy steps.
///
/// Returns the full sequence, prompt included, so
/// `output.len() == prompt.len() + max_new_tokens` always holds on success.
///
/// # Errors
///
/// Any forward-pass failure (sequence growing past `max_len`, out-of-range
/// prompt id) aborts the whole generation; no partial sequence is returned.
/// An empty prompt with a nonzero budget is rejected up front, since there
/// is no last position to read logits from.
pub fn generate_ids(
    model: &DecoderStack,
    prompt: &[usize],
    max_new_tokens: usize,
) -> Result<Vec<usize>, ModelError> {
    if prompt.is_empty() && max_new_tokens > 0 {
        return Err(ModelError::EmptyPrompt);
    }

    let mut ids = prompt.to_vec();
    let mut state = GenerationState::new(max_new_tokens);

    while !state.is_done() {
        let logits = model.forward(&[ids.clone()], Mode::Inference)?;

        // Only the last position predicts the next token.
        let vocab_size = model.config.vocab_size;
        let last = &logits.data[(ids.len() - 1) * vocab_size..ids.len() * vocab_size];

        // Stable softmax; argmax over probabilities matches argmax over
        // logits, but the distribution is what the policy is defined on.
        let max = last.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let exps: Vec<f32> = last.iter().map(|&v| (v - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        let probs: Vec<f32> = exps.iter().map(|&v| v / sum).collect();

        let next = argmax(&probs);
        debug!(position = ids.len(), token = next, "generated token");
        ids.push(next);

        state = state.advance();
    }

    Ok(ids)
}

/// Text-level generation surface: encode the prompt, extend it by
/// `max_new_tokens` greedy tokens, decode the full sequence.
pub fn generate<T: Tokenize>(
    model: &DecoderStack,
    tokenizer: &T,
    prompt: &str,
    max_new_tokens: usize,
) -> Result<String, GenerationError> {
    let prompt_ids = tokenizer.encode(prompt)?;
    let ids = generate_ids(model, &prompt_ids, max_new_tokens)?;
    Ok(tokenizer.decode(&ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn model() -> DecoderStack {
        DecoderStack::with_seed(&Config::tiny(32), 99).unwrap()
    }

    #[test]
    fn test_state_machine_counts_down_to_done() {
        let mut state = GenerationState::new(3);
        assert_eq!(state, GenerationState::Running { remaining: 3 });

        state = state.advance();
        assert_eq!(state, GenerationState::Running { remaining: 2 });

        state = state.advance().advance();
        assert!(state.is_done());

        // Terminal state is absorbing.
        assert!(state.advance().is_done());
    }

    #[test]
    fn test_zero_budget_starts_done() {
        assert!(GenerationState::new(0).is_done());
    }

    #[test]
    fn test_argmax_breaks_ties_toward_lowest_id() {
        assert_eq!(argmax(&[0.25, 0.25, 0.25, 0.25]), 0);
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), 1);
        assert_eq!(argmax(&[0.0, 0.0, 1.0]), 2);
    }

    #[test]
    fn test_output_length_is_exact() {
        let model = model();
        for budget in [0, 1, 3] {
            let out = generate_ids(&model, &[1, 2], budget).unwrap();
            assert_eq!(out.len(), 2 + budget);
            assert_eq!(&out[..2], &[1, 2]);
        }
    }

    #[test]
    fn test_zero_budget_returns_prompt_unchanged() {
        let out = generate_ids(&model(), &[4, 5, 6], 0).unwrap();
        assert_eq!(out, vec![4, 5, 6]);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let model = model();
        let a = generate_ids(&model, &[1, 2], 5).unwrap();
        let b = generate_ids(&model, &[1, 2], 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_exceeding_max_len_fails_without_truncating() {
        let model = model(); // max_len 16
        let prompt: Vec<usize> = (1..=15).collect();
        let err = generate_ids(&model, &prompt, 4).unwrap_err();
        assert!(matches!(err, ModelError::SequenceTooLong { .. }));
    }

    #[test]
    fn test_out_of_range_prompt_id_aborts() {
        let err = generate_ids(&model(), &[1, 99], 2).unwrap_err();
        assert!(matches!(err, ModelError::TokenOutOfRange { .. }));
    }

    #[test]
    fn test_empty_prompt_with_budget_rejected() {
        assert!(generate_ids(&model(), &[], 1).is_err());
        // But an empty prompt with a zero budget is a no-op.
        assert_eq!(generate_ids(&model(), &[], 0).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_femto_reference_config_reproducible() {
        // The reference configuration from the crate docs: prompt [12, 45]
        // extended by three deterministic argmax choices.
        let model = DecoderStack::with_seed(&Config::femto(), 0).unwrap();
        let a = generate_ids(&model, &[12, 45], 3).unwrap();
        let b = generate_ids(&model, &[12, 45], 3).unwrap();

        assert_eq!(a.len(), 5);
        assert_eq!(&a[..2], &[12, 45]);
        assert_eq!(a, b);
        assert!(a[2..].iter().all(|&id| id < 6000));
    }
}
