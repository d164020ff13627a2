//! Sense-inventory stage artifacts: cleaned entries joined with their
//! registry senses, ready for definition generation and WSD.

use serde::{Deserialize, Serialize};

use crate::cleaned::{ContextSentence, FrequencyData, PatternOccurrence};
use crate::exam::{PatternCategory, PatternSubtype};

/// Origin of a registered sense definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenseSource {
    Dictionaryapi,
    LlmGenerated,
    Wordnet,
    Manual,
}

impl SenseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SenseSource::Dictionaryapi => "dictionaryapi",
            SenseSource::LlmGenerated => "llm_generated",
            SenseSource::Wordnet => "wordnet",
            SenseSource::Manual => "manual",
        }
    }
}

/// One sense attached to an entry, as stored in the registry plus the
/// clustering provenance the generation prompt wants to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedSense {
    pub sense_id: String,
    pub source: SenseSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    pub definition: String,
    /// Example sentences carried over from the dictionary entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    /// Definitions of all dictionary senses merged into this cluster.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_definitions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_meaning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseAssignedWordEntry {
    pub lemma: String,
    pub pos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    pub in_official_list: bool,
    pub frequency: FrequencyData,
    pub senses: Vec<AssignedSense>,
    pub contexts: Vec<ContextSentence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseAssignedPhraseEntry {
    pub lemma: String,
    pub frequency: FrequencyData,
    pub senses: Vec<AssignedSense>,
    pub contexts: Vec<ContextSentence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSubtypeData {
    pub subtype: PatternSubtype,
    /// Chinese display name from the closed subtype table.
    pub display_name: String,
    /// Canonical English structure template.
    pub structure: String,
    pub occurrences: Vec<PatternOccurrence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseAssignedPatternEntry {
    /// Chinese display name of the category, used as the entry headword.
    pub lemma: String,
    pub pattern_category: PatternCategory,
    pub subtypes: Vec<PatternSubtypeData>,
    pub frequency: FrequencyData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenseAssignedData {
    #[serde(default)]
    pub words: Vec<SenseAssignedWordEntry>,
    #[serde(default)]
    pub phrases: Vec<SenseAssignedPhraseEntry>,
    #[serde(default)]
    pub patterns: Vec<SenseAssignedPatternEntry>,
}
