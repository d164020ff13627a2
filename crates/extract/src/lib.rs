//! Exam extraction: walks structured exams and aggregates per-lemma
//! frequency counters, context sentences, phrase occurrences, and grammar
//! pattern occurrences.

mod dedupe;
mod extractor;
mod frequency;
mod phrase;

pub use dedupe::{ContextDeduper, context_fingerprint};
pub use extractor::{ProgressFn, clean_and_aggregate};
pub use frequency::FrequencyCounter;
pub use phrase::{PhraseMatcher, is_valid_phrase, is_valid_surface, normalize_phrase};
