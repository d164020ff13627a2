//! English tokenization, POS tagging, lemmatization, and span alignment.
//!
//! The tagging backend sits behind the [`Tagger`] trait so a transformer
//! model can replace the built-in [`RuleTagger`]; everything downstream only
//! sees [`ParsedDoc`]s. Parsing is fronted by [`DocCache`], a process-wide
//! LRU keyed on raw text, with `pipe`-style batch entry points that amortize
//! backend setup over at least [`BATCH_SIZE_LONG`] sentences or
//! [`BATCH_SIZE_SHORT`] short surfaces per call.

mod cache;
mod doc;
mod lemma;
mod lexicon;
mod pos;
mod tagger;

pub use cache::{BATCH_SIZE_LONG, BATCH_SIZE_SHORT, DocCache};
pub use doc::{ParsedDoc, Span, Token};
pub use lemma::{adverb_base, conservative_adverb_base, lemmatize};
pub use pos::{Pos, normalize_pos_label};
pub use tagger::{RawToken, RuleTagger, Tagger};

/// Lemmas containing non-ASCII characters are loanwords (`café`, `zōri`)
/// and never become vocabulary entries.
pub fn is_foreign_word(lemma: &str) -> bool {
    !lemma.is_ascii()
}
