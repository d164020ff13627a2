//! Cross-variant context deduplication.
//!
//! Reference exams (`gsat_ref`, `gsat_trial`) recycle sentences from
//! official sittings. The deduper keys recycled content by a lenient
//! fingerprint so a sentence is counted at most once per lemma, with
//! official occurrences shadowing reference ones.

use std::collections::HashMap;

use gsatvocab_model::ExamType;

/// Lenient fingerprint: lowercase ASCII alphanumerics with collapsed
/// separators, so paraphrases differing only in punctuation still align.
/// Falls back to the trimmed text when nothing alphanumeric survives
/// (Chinese prompts).
pub fn context_fingerprint(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut pending_space = false;
    for c in lower.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    if out.is_empty() {
        lower.trim().to_string()
    } else {
        out
    }
}

/// Per-lemma record of fingerprints already seen, with the variant that
/// first contributed each one.
#[derive(Debug, Default)]
pub struct ContextDeduper {
    seen: HashMap<String, HashMap<String, (ExamType, i16)>>,
}

impl ContextDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether to record this `(lemma, sentence)` occurrence.
    ///
    /// Rules, in order: first sighting keeps; official over a prior
    /// reference keeps and upgrades the stored record; reference over a
    /// prior official drops; two references drop the second; two officials
    /// keep (genuine multi-year recurrence).
    pub fn should_keep(&mut self, lemma: &str, text: &str, exam_type: ExamType, year: i16) -> bool {
        let fp = context_fingerprint(text);
        if fp.is_empty() {
            return false;
        }

        let lemma_seen = self.seen.entry(lemma.to_string()).or_default();
        match lemma_seen.get(&fp) {
            None => {
                lemma_seen.insert(fp, (exam_type, year));
                true
            }
            Some((existing_type, _)) => {
                let existing_ref = existing_type.is_reference();
                let incoming_ref = exam_type.is_reference();
                if !incoming_ref && existing_ref {
                    lemma_seen.insert(fp, (exam_type, year));
                    true
                } else if incoming_ref {
                    false
                } else {
                    true
                }
            }
        }
    }
}
