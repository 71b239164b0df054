//! Error Types
//!
//! All failures in this crate are deterministic defects: either the model was
//! configured inconsistently, or a caller handed the model input that violates
//! a documented precondition. None of them are transient, so nothing here is
//! ever retried. Errors propagate to the caller with enough context to name
//! the violated rule; no partial output is ever returned alongside an error.

use std::fmt;

/// Errors produced by model construction and forward passes.
///
/// # Variants
///
/// - **Config**: The [`Config`](crate::Config) failed validation at
///   construction time (e.g. `num_heads` does not divide `d_model`). Never
///   deferred to a later call.
/// - **SequenceTooLong**: An input sequence exceeds `max_len`. The model
///   rejects the call rather than truncating, because position embeddings and
///   masks are only correct for strictly bounded sequences.
/// - **TokenOutOfRange**: A token id is `>= vocab_size`. Rejected rather than
///   clamped for the same reason.
/// - **MaskShapeMismatch**: The attention mask does not broadcast against the
///   attention-score shape. This signals an integration bug upstream, not a
///   recoverable condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Configuration validation failed at construction time.
    Config(String),

    /// Input sequence is longer than the model's `max_len`.
    SequenceTooLong { len: usize, max_len: usize },

    /// A token id falls outside `[0, vocab_size)`.
    TokenOutOfRange { id: usize, vocab_size: usize },

    /// Attention mask shape cannot broadcast against the score shape.
    MaskShapeMismatch {
        mask: Vec<usize>,
        scores: Vec<usize>,
    },

    /// Generation was asked to extend an empty prompt; there is no last
    /// position to predict from.
    EmptyPrompt,
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Config(message) => write!(f, "invalid config: {message}"),
            ModelError::SequenceTooLong { len, max_len } => {
                write!(f, "sequence too long: length {len} exceeds max_len {max_len}")
            }
            ModelError::TokenOutOfRange { id, vocab_size } => {
                write!(f, "id out of range: token id {id} >= vocab_size {vocab_size}")
            }
            ModelError::MaskShapeMismatch { mask, scores } => {
                write!(
                    f,
                    "mask shape {mask:?} does not broadcast against attention scores {scores:?}"
                )
            }
            ModelError::EmptyPrompt => {
                write!(f, "cannot generate from an empty prompt")
            }
        }
    }
}

impl std::error::Error for ModelError {}

/// Errors produced by the vocabulary tokenizer wrapper.
///
/// # Variants
///
/// - **Io**: The vocabulary file could not be read.
/// - **Parse**: The vocabulary file is not valid JSON of the expected shape.
/// - **UnknownPiece**: Input text contains a span no vocabulary piece covers.
///   Encoding fails rather than emitting an out-of-vocabulary id, preserving
///   the contract that `encode` never produces an id `>= vocab_size`.
#[derive(Debug)]
pub enum TokenizerError {
    /// Failed to read the vocabulary file.
    Io(std::io::Error),

    /// Vocabulary file contents could not be parsed.
    Parse(String),

    /// Text contains a span not covered by any vocabulary piece.
    UnknownPiece(String),
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizerError::Io(e) => write!(f, "vocabulary file: {e}"),
            TokenizerError::Parse(message) => write!(f, "vocabulary parse: {message}"),
            TokenizerError::UnknownPiece(span) => {
                write!(f, "no vocabulary piece covers {span:?}")
            }
        }
    }
}

impl std::error::Error for TokenizerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TokenizerError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TokenizerError {
    fn from(e: std::io::Error) -> Self {
        TokenizerError::Io(e)
    }
}

/// Errors produced by the text-level generation surface, which drives both
/// the tokenizer and the model.
#[derive(Debug)]
pub enum GenerationError {
    /// The model rejected a forward pass.
    Model(ModelError),

    /// The tokenizer could not encode the prompt.
    Tokenizer(TokenizerError),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Model(e) => write!(f, "generation aborted: {e}"),
            GenerationError::Tokenizer(e) => write!(f, "prompt encoding failed: {e}"),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Model(e) => Some(e),
            GenerationError::Tokenizer(e) => Some(e),
        }
    }
}

impl From<ModelError> for GenerationError {
    fn from(e: ModelError) -> Self {
        GenerationError::Model(e)
    }
}

impl From<TokenizerError> for GenerationError {
    fn from(e: TokenizerError) -> Self {
        GenerationError::Tokenizer(e)
    }
}
