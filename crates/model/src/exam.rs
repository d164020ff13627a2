//! Structured exam input types.
//!
//! These mirror the schema emitted by the upstream structurization stage and
//! are treated as a fixed contract: unknown fields are ignored, optional
//! sections default to empty.

use serde::{Deserialize, Serialize};

/// Exam family and variant.
///
/// `GsatRef` and `GsatTrial` are *predictive* reference variants published as
/// practice material; their content may recycle sentences from official
/// exams, which the context deduper compensates for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamType {
    Gsat,
    GsatMakeup,
    Ast,
    AstMakeup,
    GsatTrial,
    GsatRef,
}

impl ExamType {
    /// Whether this variant is secondary practice material rather than an
    /// official sitting.
    pub fn is_reference(self) -> bool {
        matches!(self, ExamType::GsatTrial | ExamType::GsatRef)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExamType::Gsat => "gsat",
            ExamType::GsatMakeup => "gsat_makeup",
            ExamType::Ast => "ast",
            ExamType::AstMakeup => "ast_makeup",
            ExamType::GsatTrial => "gsat_trial",
            ExamType::GsatRef => "gsat_ref",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Vocabulary,
    Cloze,
    Discourse,
    Structure,
    Reading,
    Translation,
    Mixed,
    Essay,
}

impl SectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionType::Vocabulary => "vocabulary",
            SectionType::Cloze => "cloze",
            SectionType::Discourse => "discourse",
            SectionType::Structure => "structure",
            SectionType::Reading => "reading",
            SectionType::Translation => "translation",
            SectionType::Mixed => "mixed",
            SectionType::Essay => "essay",
        }
    }

    /// Sections carrying full passages where domain-specific vocabulary
    /// shows up incidentally.
    pub fn is_passage_section(self) -> bool {
        matches!(
            self,
            SectionType::Reading | SectionType::Mixed | SectionType::Cloze | SectionType::Discourse
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceRole {
    Cloze,
    Passage,
    QuestionPrompt,
    Option,
    UnusedOption,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Word,
    Phrase,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationRole {
    CorrectAnswer,
    Distractor,
    TestedKeyword,
    NotablePhrase,
    NotablePattern,
}

impl AnnotationRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationRole::CorrectAnswer => "correct_answer",
            AnnotationRole::Distractor => "distractor",
            AnnotationRole::TestedKeyword => "tested_keyword",
            AnnotationRole::NotablePhrase => "notable_phrase",
            AnnotationRole::NotablePattern => "notable_pattern",
        }
    }

    /// Roles that count as the word being tested at all.
    pub fn is_tested(self) -> bool {
        matches!(
            self,
            AnnotationRole::CorrectAnswer
                | AnnotationRole::TestedKeyword
                | AnnotationRole::Distractor
        )
    }

    /// Roles where the word itself is the expected answer.
    pub fn is_active_tested(self) -> bool {
        matches!(
            self,
            AnnotationRole::CorrectAnswer | AnnotationRole::TestedKeyword
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    Subjunctive,
    Inversion,
    Participle,
    CleftSentence,
    ComparisonAdv,
    ConcessionAdv,
    ResultPurpose,
}

impl PatternCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternCategory::Subjunctive => "subjunctive",
            PatternCategory::Inversion => "inversion",
            PatternCategory::Participle => "participle",
            PatternCategory::CleftSentence => "cleft_sentence",
            PatternCategory::ComparisonAdv => "comparison_adv",
            PatternCategory::ConcessionAdv => "concession_adv",
            PatternCategory::ResultPurpose => "result_purpose",
        }
    }
}

/// Fine-grained grammar pattern subtypes, grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PatternSubtype {
    #[serde(rename = "wish_past")]
    SubjWishPast,
    #[serde(rename = "wish_past_perfect")]
    SubjWishPastPerfect,
    #[serde(rename = "as_if_as_though")]
    SubjAsIf,
    #[serde(rename = "were_to")]
    SubjWereTo,
    #[serde(rename = "should_subjunctive")]
    SubjShould,
    #[serde(rename = "had_subjunctive")]
    SubjHad,
    #[serde(rename = "demand_suggest")]
    SubjDemand,
    #[serde(rename = "if_only")]
    SubjIfOnly,
    #[serde(rename = "but_for")]
    SubjButFor,
    #[serde(rename = "its_time")]
    SubjItsTime,

    #[serde(rename = "negative_adverb")]
    InvNegative,
    #[serde(rename = "not_only_but_also")]
    InvNotOnly,
    #[serde(rename = "no_sooner_than")]
    InvNoSooner,
    #[serde(rename = "only_inversion")]
    InvOnly,
    #[serde(rename = "so_adj_that")]
    InvSoAdj,
    #[serde(rename = "conditional_inversion")]
    InvConditional,
    #[serde(rename = "not_until")]
    InvNotUntil,

    #[serde(rename = "perfect_participle")]
    PartPerfect,
    #[serde(rename = "with_participle")]
    PartWith,
    #[serde(rename = "absolute_participle")]
    PartAbsolute,

    #[serde(rename = "it_that")]
    CleftItThat,
    #[serde(rename = "what_cleft")]
    CleftWhat,

    #[serde(rename = "the_more_the_more")]
    CompTheMore,
    #[serde(rename = "no_more_than")]
    CompNoMoreThan,
    #[serde(rename = "times_as")]
    CompTimes,

    #[serde(rename = "no_matter")]
    ConcNoMatter,
    #[serde(rename = "whatever_however")]
    ConcWhatever,
    #[serde(rename = "adj_as_clause")]
    ConcAdjAs,

    #[serde(rename = "so_that_result")]
    ResSoThat,
    #[serde(rename = "such_that")]
    ResSuchThat,
    #[serde(rename = "lest")]
    PurpLest,
    #[serde(rename = "for_fear_that")]
    PurpForFear,
}

impl PatternSubtype {
    pub fn as_str(self) -> &'static str {
        use PatternSubtype::*;
        match self {
            SubjWishPast => "wish_past",
            SubjWishPastPerfect => "wish_past_perfect",
            SubjAsIf => "as_if_as_though",
            SubjWereTo => "were_to",
            SubjShould => "should_subjunctive",
            SubjHad => "had_subjunctive",
            SubjDemand => "demand_suggest",
            SubjIfOnly => "if_only",
            SubjButFor => "but_for",
            SubjItsTime => "its_time",
            InvNegative => "negative_adverb",
            InvNotOnly => "not_only_but_also",
            InvNoSooner => "no_sooner_than",
            InvOnly => "only_inversion",
            InvSoAdj => "so_adj_that",
            InvConditional => "conditional_inversion",
            InvNotUntil => "not_until",
            PartPerfect => "perfect_participle",
            PartWith => "with_participle",
            PartAbsolute => "absolute_participle",
            CleftItThat => "it_that",
            CleftWhat => "what_cleft",
            CompTheMore => "the_more_the_more",
            CompNoMoreThan => "no_more_than",
            CompTimes => "times_as",
            ConcNoMatter => "no_matter",
            ConcWhatever => "whatever_however",
            ConcAdjAs => "adj_as_clause",
            ResSoThat => "so_that_result",
            ResSuchThat => "such_that",
            PurpLest => "lest",
            PurpForFear => "for_fear_that",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedQuestionType {
    FillInWord,
    MultipleSelect,
    ShortAnswer,
}

/// Provenance of a single occurrence: which exam, section, and question a
/// sentence or keyword came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceInfo {
    pub year: i16,
    pub exam_type: ExamType,
    pub section_type: SectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<AnnotationRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_role: Option<SentenceRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub surface: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub role: AnnotationRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_category: Option<PatternCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_subtype: Option<PatternSubtype>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedSentence {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_role: Option<SentenceRole>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixed_question_type: Option<MixedQuestionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptable_answers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "type")]
    pub kind: SectionType,
    pub sentences: Vec<AnnotatedSentence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EssayTopic {
    pub description: String,
    #[serde(default)]
    pub suggested_words: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationItem {
    pub question: u32,
    pub chinese_prompt: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub year: i16,
    pub exam_type: ExamType,
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub essay_topics: Vec<EssayTopic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub translation_items: Vec<TranslationItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_type_serde_roundtrip() {
        for et in [
            ExamType::Gsat,
            ExamType::GsatMakeup,
            ExamType::Ast,
            ExamType::AstMakeup,
            ExamType::GsatTrial,
            ExamType::GsatRef,
        ] {
            let json = serde_json::to_string(&et).unwrap();
            assert_eq!(json.trim_matches('"'), et.as_str());
            let back: ExamType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, et);
        }
    }

    #[test]
    fn reference_variants() {
        assert!(ExamType::GsatRef.is_reference());
        assert!(ExamType::GsatTrial.is_reference());
        assert!(!ExamType::Gsat.is_reference());
        assert!(!ExamType::AstMakeup.is_reference());
    }

    #[test]
    fn tested_roles() {
        assert!(AnnotationRole::CorrectAnswer.is_tested());
        assert!(AnnotationRole::Distractor.is_tested());
        assert!(!AnnotationRole::Distractor.is_active_tested());
        assert!(AnnotationRole::TestedKeyword.is_active_tested());
        assert!(!AnnotationRole::NotablePhrase.is_tested());
    }

    #[test]
    fn pattern_subtype_wire_names() {
        let json = serde_json::to_string(&PatternSubtype::InvNoSooner).unwrap();
        assert_eq!(json, "\"no_sooner_than\"");
        let back: PatternSubtype = serde_json::from_str("\"for_fear_that\"").unwrap();
        assert_eq!(back, PatternSubtype::PurpForFear);
    }

    #[test]
    fn exam_parses_with_missing_optional_blocks() {
        let raw = r#"{
            "year": 113,
            "exam_type": "gsat",
            "sections": [
                {"type": "vocabulary", "sentences": [
                    {"text": "A sentence.", "question": 1, "annotations": [
                        {"surface": "sentence", "type": "word", "role": "correct_answer"}
                    ]}
                ]}
            ]
        }"#;
        let exam: Exam = serde_json::from_str(raw).unwrap();
        assert_eq!(exam.year, 113);
        assert!(exam.translation_items.is_empty());
        assert!(exam.essay_topics.is_empty());
        assert_eq!(exam.sections[0].sentences[0].annotations.len(), 1);
    }
}
