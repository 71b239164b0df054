//! Tokenizer Collaborator
//!
//! The model core never segments text itself; it consumes an encoder/decoder
//! collaborator through the [`Tokenize`] trait. The contract the generation
//! loop relies on:
//!
//! - `encode` followed by `decode` round-trips losslessly for any text the
//!   vocabulary covers
//! - `encode` never emits an id `>= vocab_size`
//! - id 0 is the padding sentinel and is never produced by `encode`
//!
//! [`VocabTokenizer`] is the shipped implementation: a thin wrapper that
//! loads a pretrained piece vocabulary from a JSON file and fails fast at
//! construction when the file is missing or malformed. How such a vocabulary
//! is *trained* is out of scope for this crate.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::TokenizerError;
use crate::mask::PAD_ID;

/// Encoder/decoder contract required by the generation surface.
pub trait Tokenize {
    /// Segment text into token ids, all `< vocab_size`.
    fn encode(&self, text: &str) -> Result<Vec<usize>, TokenizerError>;

    /// Reconstruct text from ids. Padding sentinels and unknown ids decode
    /// to nothing rather than failing; decoding is best-effort by contract.
    fn decode(&self, ids: &[usize]) -> String;

    /// Total number of ids, padding sentinel included.
    fn vocab_size(&self) -> usize;
}

/// File-loading vocabulary tokenizer with greedy longest-match encoding.
///
/// The vocabulary file is a JSON array of piece strings where the array
/// index is the token id. Index 0 is reserved for the padding sentinel and
/// never matched during encoding.
///
/// # Example vocabulary file
///
/// ```json
/// ["<pad>", "he", "l", "lo", " ", "world"]
/// ```
#[derive(Debug)]
pub struct VocabTokenizer {
    /// Piece strings indexed by id.
    pieces: Vec<String>,
    /// Reverse lookup, excluding the padding sentinel.
    lookup: HashMap<String, usize>,
    /// Longest piece length in chars, bounding the match window.
    max_piece_chars: usize,
}

impl VocabTokenizer {
    /// Build a tokenizer from an in-memory piece list (index = id).
    ///
    /// # Errors
    ///
    /// Fails if the list is empty or a non-sentinel piece is empty, since an
    /// empty piece would make greedy matching loop forever.
    pub fn from_pieces(pieces: Vec<String>) -> Result<Self, TokenizerError> {
        if pieces.is_empty() {
            return Err(TokenizerError::Parse("vocabulary is empty".into()));
        }
        if pieces.iter().skip(1).any(|p| p.is_empty()) {
            return Err(TokenizerError::Parse(
                "vocabulary contains an empty piece".into(),
            ));
        }

        let lookup = pieces
            .iter()
            .enumerate()
            .skip(1) // never match the padding sentinel
            .map(|(id, piece)| (piece.clone(), id))
            .collect();
        let max_piece_chars = pieces
            .iter()
            .skip(1)
            .map(|p| p.chars().count())
            .max()
            .unwrap_or(0);

        Ok(Self {
            pieces,
            lookup,
            max_piece_chars,
        })
    }

    /// Load a vocabulary from a JSON file of piece strings.
    ///
    /// # Errors
    ///
    /// Missing file, unreadable file, or malformed JSON all fail here at
    /// construction time, never later during encoding.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TokenizerError> {
        let raw = fs::read_to_string(path)?;
        let pieces: Vec<String> =
            serde_json::from_str(&raw).map_err(|e| TokenizerError::Parse(e.to_string()))?;
        Self::from_pieces(pieces)
    }
}

impl Tokenize for VocabTokenizer {
    /// Greedy longest-match segmentation: at each position, consume the
    /// longest vocabulary piece that matches the remaining text.
    fn encode(&self, text: &str) -> Result<Vec<usize>, TokenizerError> {
        let mut ids = Vec::new();
        let mut rest = text;

        while !rest.is_empty() {
            let window: usize = rest
                .char_indices()
                .take(self.max_piece_chars)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);

            let matched = (1..=window)
                .rev()
                .filter(|&end| rest.is_char_boundary(end))
                .find_map(|end| self.lookup.get(&rest[..end]).map(|&id| (id, end)));

            match matched {
                Some((id, end)) => {
                    ids.push(id);
                    rest = &rest[end..];
                }
                None => {
                    let span: String = rest.chars().take(8).collect();
                    return Err(TokenizerError::UnknownPiece(span));
                }
            }
        }

        Ok(ids)
    }

    fn decode(&self, ids: &[usize]) -> String {
        ids.iter()
            .filter(|&&id| id != PAD_ID)
            .filter_map(|&id| self.pieces.get(id))
            .map(String::as_str)
            .collect()
    }

    fn vocab_size(&self) -> usize {
        self.pieces.len()
    }
}
