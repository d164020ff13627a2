//! Shared data model for the vocabulary pipeline.
//!
//! Three layers of types flow through the stages:
//!
//! 1. [`exam`] — structured exams as produced by the upstream
//!    PDF-to-structure stages (the input contract).
//! 2. [`cleaned`] / [`sense_assigned`] — intermediate per-stage artifacts,
//!    all serializable so stages can be run and resumed independently.
//! 3. [`vocab`] — the final learner-facing database entries.

pub mod cleaned;
pub mod exam;
pub mod sense_assigned;
pub mod vocab;
pub mod wordlist;

pub use cleaned::{
    CleanedPatternEntry, CleanedPhraseEntry, CleanedVocabData, CleanedWordEntry, ContextSentence,
    FrequencyData, PatternOccurrence, PhraseOccurrence,
};
pub use exam::{
    AnnotatedSentence, Annotation, AnnotationKind, AnnotationRole, Exam, ExamType, EssayTopic,
    MixedQuestionType, PatternCategory, PatternSubtype, Section, SectionType, SentenceRole,
    SourceInfo, TranslationItem,
};
pub use sense_assigned::{
    AssignedSense, PatternSubtypeData, SenseAssignedData, SenseAssignedPatternEntry,
    SenseAssignedPhraseEntry, SenseAssignedWordEntry, SenseSource,
};
pub use vocab::{
    ConfusionNote, ExamExample, PatternEntry, PatternSubtypeOutput, PhraseEntry, RootInfo,
    VocabDatabase, VocabEntry, VocabMetadata, VocabSense, WordEntry, YearRange,
};
pub use wordlist::{OfficialWordEntry, load_official_wordlist};
