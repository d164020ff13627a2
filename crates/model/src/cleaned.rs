//! Post-extraction aggregates: per-lemma frequency, contexts, and phrase /
//! pattern occurrence lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::exam::{PatternCategory, PatternSubtype, SourceInfo};

/// Aggregated frequency statistics for one lemma, phrase, or pattern.
///
/// Histogram maps are `BTreeMap` so the serialized artifact is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyData {
    pub total_appearances: u32,
    pub tested_count: u32,
    pub active_tested_count: u32,
    pub year_spread: u32,
    pub years: Vec<i16>,
    pub by_role: BTreeMap<String, u32>,
    pub by_section: BTreeMap<String, u32>,
    pub by_exam_type: BTreeMap<String, u32>,
}

/// A sentence in which a lemma actually appears, kept as learning material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSentence {
    pub text: String,
    pub source: SourceInfo,
    /// POS of the target token in this sentence; empty for phrase contexts.
    pub pos: String,
    /// The surface form as it appeared (annotation surface or token text).
    pub surface: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseOccurrence {
    pub surface: String,
    pub sentence: String,
    pub source: SourceInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternOccurrence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_subtype: Option<PatternSubtype>,
    pub surface: String,
    pub sentence: String,
    pub source: SourceInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedWordEntry {
    pub lemma: String,
    /// Official difficulty level (1-6) from the CEEC wordlist, when listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    pub in_official_list: bool,
    pub pos: Vec<String>,
    pub frequency: FrequencyData,
    pub contexts: Vec<ContextSentence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedPhraseEntry {
    /// Normalized phrase form (verbs lemmatized, auxiliaries dropped).
    pub lemma: String,
    pub frequency: FrequencyData,
    pub contexts: Vec<ContextSentence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedPatternEntry {
    pub pattern_category: PatternCategory,
    pub occurrences: Vec<PatternOccurrence>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanedVocabData {
    #[serde(default)]
    pub words: Vec<CleanedWordEntry>,
    #[serde(default)]
    pub phrases: Vec<CleanedPhraseEntry>,
    #[serde(default)]
    pub patterns: Vec<CleanedPatternEntry>,
}
