//! Model Configuration
//!
//! The configuration is an immutable record of architecture hyperparameters,
//! validated once when a [`DecoderStack`](crate::DecoderStack) is constructed
//! and never mutated afterward. All validation failures are fatal at
//! construction time; nothing is deferred to the first forward pass.
//!
//! ## Fields
//!
//! - `vocab_size`: Number of tokens in the vocabulary (id 0 is the padding
//!   sentinel and counts toward this size)
//! - `max_len`: Maximum sequence length (context window)
//! - `d_model`: Embedding dimension (width of the residual stream)
//! - `dropout_rate`: Dropout probability, applied in training mode only
//! - `num_heads`: Attention heads per layer; must divide `d_model` evenly
//! - `expansion`: Feed-forward hidden width as a multiple of `d_model`
//! - `num_layers`: Number of decoder blocks
//! - `rich`: Selects the higher-capacity decoder block variant

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Architecture hyperparameters for a decoder-only model.
///
/// Serializable so a config can live in a JSON sidecar next to saved
/// vocabulary files. `rich` defaults to `false` when absent.
///
/// # Example
///
/// ```rust
/// use puck::Config;
///
/// let config = Config::femto();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.d_model % config.num_heads, 0);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub max_len: usize,
    pub d_model: usize,
    pub dropout_rate: f32,
    pub num_heads: usize,
    pub expansion: usize,
    pub num_layers: usize,
    #[serde(default)]
    pub rich: bool,
}

impl Config {
    /// The reference femto-scale configuration.
    ///
    /// **~2M parameters**: 6000-token vocabulary, 512-token context,
    /// 128-dimensional embeddings, 2 heads, 2 layers.
    pub fn femto() -> Self {
        Self {
            vocab_size: 6000,
            max_len: 512,
            d_model: 128,
            dropout_rate: 0.1,
            num_heads: 2,
            expansion: 4,
            num_layers: 2,
            rich: false,
        }
    }

    /// A minimal configuration for fast tests and experiments.
    ///
    /// # Arguments
    ///
    /// * `vocab_size` - Size of vocabulary (e.g. from a tokenizer)
    pub fn tiny(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            max_len: 16,
            d_model: 8,
            dropout_rate: 0.0,
            num_heads: 2,
            expansion: 2,
            num_layers: 1,
            rich: false,
        }
    }

    /// Validate every architectural invariant.
    ///
    /// Checked once at model construction:
    ///
    /// - `vocab_size`, `d_model`, `max_len` all positive
    /// - `0.0 <= dropout_rate < 1.0`
    /// - `num_heads` divides `d_model` evenly
    /// - `expansion >= 1`
    /// - `num_layers >= 1`
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.vocab_size == 0 {
            return Err(ModelError::Config("vocab_size must be positive".into()));
        }
        if self.d_model == 0 {
            return Err(ModelError::Config("d_model must be positive".into()));
        }
        if self.max_len == 0 {
            return Err(ModelError::Config("max_len must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(ModelError::Config(format!(
                "dropout_rate must be in [0.0, 1.0), got {}",
                self.dropout_rate
            )));
        }
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            return Err(ModelError::Config(format!(
                "num_heads ({}) must divide d_model ({}) evenly",
                self.num_heads, self.d_model
            )));
        }
        if self.expansion == 0 {
            return Err(ModelError::Config("expansion must be >= 1".into()));
        }
        if self.num_layers == 0 {
            return Err(ModelError::Config("num_layers must be >= 1".into()));
        }
        Ok(())
    }

    /// Width of each attention head.
    pub fn head_dim(&self) -> usize {
        self.d_model / self.num_heads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_femto_config_is_valid() {
        assert!(Config::femto().validate().is_ok());
    }

    #[test]
    fn test_zero_vocab_rejected() {
        let mut config = Config::tiny(64);
        config.vocab_size = 0;
        assert!(matches!(config.validate(), Err(ModelError::Config(_))));
    }

    #[test]
    fn test_heads_must_divide_d_model() {
        let mut config = Config::tiny(64);
        config.d_model = 10;
        config.num_heads = 3;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("num_heads"));
    }

    #[test]
    fn test_dropout_rate_of_one_rejected() {
        let mut config = Config::tiny(64);
        config.dropout_rate = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_layers_rejected() {
        let mut config = Config::tiny(64);
        config.num_layers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rich_defaults_to_false_in_json() {
        let json = r#"{
            "vocab_size": 6000, "max_len": 512, "d_model": 128,
            "dropout_rate": 0.1, "num_heads": 2, "expansion": 4, "num_layers": 2
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(!config.rich);
        assert!(config.validate().is_ok());
    }
}
