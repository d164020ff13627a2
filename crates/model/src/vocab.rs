//! Final learner-facing database entries.
//!
//! Serialization deliberately omits empty collections and absent options so
//! the emitted artifact stays compact; paired with sorted entries and a
//! caller-supplied timestamp this keeps re-runs byte-identical.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cleaned::FrequencyData;
use crate::exam::{PatternCategory, PatternSubtype, SourceInfo};

/// A real exam sentence assigned to a sense by WSD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamExample {
    pub text: String,
    pub source: SourceInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabSense {
    pub sense_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    pub zh_def: String,
    pub en_def: String,
    /// Exam sentences illustrating this sense; filled by the WSD stage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExamExample>,
    pub generated_example: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionNote {
    pub confused_with: String,
    pub distinction: String,
    pub memory_tip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_breakdown: Option<String>,
    pub memory_strategy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordEntry {
    pub lemma: String,
    pub pos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    pub in_official_list: bool,
    pub senses: Vec<VocabSense>,
    pub frequency: FrequencyData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub confusion_notes: Vec<ConfusionNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_info: Option<RootInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antonyms: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseEntry {
    pub lemma: String,
    pub senses: Vec<VocabSense>,
    pub frequency: FrequencyData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub confusion_notes: Vec<ConfusionNote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSubtypeOutput {
    pub subtype: PatternSubtype,
    pub display_name: String,
    pub structure: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExamExample>,
    pub generated_example: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    pub lemma: String,
    pub pattern_category: PatternCategory,
    pub subtypes: Vec<PatternSubtypeOutput>,
    pub teaching_explanation: String,
    pub frequency: FrequencyData,
}

/// One database entry, discriminated by a `type` tag on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VocabEntry {
    Word(WordEntry),
    Phrase(PhraseEntry),
    Pattern(PatternEntry),
}

impl VocabEntry {
    pub fn lemma(&self) -> &str {
        match self {
            VocabEntry::Word(w) => &w.lemma,
            VocabEntry::Phrase(p) => &p.lemma,
            VocabEntry::Pattern(p) => &p.lemma,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            VocabEntry::Word(_) => "word",
            VocabEntry::Phrase(_) => "phrase",
            VocabEntry::Pattern(_) => "pattern",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i16,
    pub max: i16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabMetadata {
    pub exam_year_range: YearRange,
    pub total_entries: usize,
    pub count_by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabDatabase {
    pub version: String,
    pub generated_at: String,
    pub metadata: VocabMetadata,
    pub entries: Vec<VocabEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::{ExamType, SectionType};

    fn empty_frequency() -> FrequencyData {
        FrequencyData {
            total_appearances: 0,
            tested_count: 0,
            active_tested_count: 0,
            year_spread: 0,
            years: vec![],
            by_role: BTreeMap::new(),
            by_section: BTreeMap::new(),
            by_exam_type: BTreeMap::new(),
        }
    }

    #[test]
    fn entry_tag_discriminates() {
        let entry = VocabEntry::Phrase(PhraseEntry {
            lemma: "draw on".into(),
            senses: vec![],
            frequency: empty_frequency(),
            confusion_notes: vec![],
        });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "phrase");
        assert_eq!(json["lemma"], "draw on");
    }

    #[test]
    fn empty_collections_are_omitted() {
        let sense = VocabSense {
            sense_id: "draft.n.dict1a2b3c4d".into(),
            pos: Some("NOUN".into()),
            zh_def: "草稿".into(),
            en_def: "a preliminary version of a text".into(),
            examples: vec![],
            generated_example: "She handed in the first draft.".into(),
        };
        let json = serde_json::to_value(&sense).unwrap();
        assert!(json.get("examples").is_none());

        let with_example = VocabSense {
            examples: vec![ExamExample {
                text: "Mary revised the draft.".into(),
                source: SourceInfo {
                    year: 113,
                    exam_type: ExamType::Gsat,
                    section_type: SectionType::Vocabulary,
                    question_number: Some(3),
                    role: None,
                    sentence_role: None,
                },
            }],
            ..sense
        };
        let json = serde_json::to_value(&with_example).unwrap();
        assert_eq!(json["examples"].as_array().unwrap().len(), 1);
    }
}
