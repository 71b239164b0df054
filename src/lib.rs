//! Puck: A Femto-Scale Language Model
//!
//! A decoder-only transformer with greedy autoregressive generation,
//! implemented from scratch on a minimal f32 tensor. Named after the
//! mischievous sprite from *A Midsummer Night's Dream* — small, quick, and
//! fond of finishing other people's sentences.
//!
//! # Modules
//!
//! - [`tensor`] - Minimal row-major f32 tensor with Rayon-parallel ops
//! - [`config`] - Validated, immutable architecture hyperparameters
//! - [`mask`] - Combined causal + padding attention visibility mask
//! - [`embedding`] - Token + position input embedding
//! - [`layers`] - Attention, feed-forward, normalization, decoder blocks
//! - [`model`] - The composed decoder stack (ids in, logits out)
//! - [`generate`] - Greedy autoregressive generation loop
//! - [`tokenizer`] - Encoder/decoder collaborator trait and vocabulary file
//!   wrapper
//!
//! # Example
//!
//! ```rust
//! use puck::{generate, Config, DecoderStack, VocabTokenizer};
//!
//! let pieces = ["<pad>", "to", " be", ",", " or", " not"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//! let tokenizer = VocabTokenizer::from_pieces(pieces).unwrap();
//!
//! let model = DecoderStack::new(&Config::tiny(6)).unwrap();
//! let text = generate(&model, &tokenizer, "to be", 4).unwrap();
//! assert!(text.starts_with("to be"));
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod layers;
pub mod mask;
pub mod model;
pub mod tensor;
pub mod tokenizer;

// Re-export the main types for convenience
pub use config::Config;
pub use error::{GenerationError, ModelError, TokenizerError};
pub use generate::{generate, generate_ids, GenerationState};
pub use layers::{DecoderBlock, Mode};
pub use mask::{AttentionMask, PAD_ID};
pub use model::{DecoderStack, OutputHead};
pub use tensor::Tensor;
pub use tokenizer::{Tokenize, VocabTokenizer};
