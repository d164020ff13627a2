//! Seam for the neural graded-WSD cross-encoder.

use anyhow::Result;

/// One (marked sentence, sense definition) scoring input.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorePair {
    /// Sentence with the target wrapped in `<t>...</t>` tokens.
    pub marked_sentence: String,
    /// Sense definition text, including the generated example when present.
    pub definition: String,
}

/// A cross-encoder producing one scalar logit per pair. Backends format
/// inputs as `"{sentence} </s></s> {definition}"` truncated to 512 tokens;
/// the resolver feeds pairs in bounded batches.
pub trait SenseScorer: Send + Sync {
    fn score_pairs(&self, pairs: &[ScorePair]) -> Result<Vec<f32>>;
}

/// Canonical cross-encoder input encoding, shared by backends.
pub fn encoder_input(pair: &ScorePair) -> String {
    format!("{} </s></s> {}", pair.marked_sentence, pair.definition)
}
