//! Entry validation before the database is assembled.

use gsatvocab_model::{PatternEntry, PhraseEntry, VocabEntry, VocabSense, WordEntry};
use gsatvocab_registry::normalize_lemma;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub lemma: String,
    pub issue_type: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(lemma: &str, issue_type: &str, message: String) -> Self {
        Self {
            lemma: lemma.to_string(),
            issue_type: issue_type.to_string(),
            message,
        }
    }
}

/// Issue types that exclude an entry from the output entirely.
const CRITICAL_ISSUES: &[&str] = &["no_senses", "no_subtypes"];

fn validate_senses(lemma: &str, senses: &[VocabSense], issues: &mut Vec<ValidationIssue>) {
    let lemma_key = normalize_lemma(lemma);
    let prefix = format!("{lemma_key}.");

    for sense in senses {
        if !sense.sense_id.to_lowercase().starts_with(&prefix) {
            issues.push(ValidationIssue::new(
                lemma,
                "invalid_sense_id",
                format!("sense id {} should start with {prefix}", sense.sense_id),
            ));
        }
        if sense.zh_def.trim().is_empty() {
            issues.push(ValidationIssue::new(
                lemma,
                "missing_zh_def",
                format!("sense {} has empty zh_def", sense.sense_id),
            ));
        }
        if sense.en_def.trim().is_empty() {
            issues.push(ValidationIssue::new(
                lemma,
                "missing_en_def",
                format!("sense {} has empty en_def", sense.sense_id),
            ));
        }
        if sense.generated_example.is_empty() {
            issues.push(ValidationIssue::new(
                lemma,
                "missing_generated_example",
                format!("sense {} has no generated example", sense.sense_id),
            ));
        }
        for example in &sense.examples {
            if example.source.year <= 0 {
                issues.push(ValidationIssue::new(
                    lemma,
                    "example_missing_source",
                    format!("sense {} has example without valid source", sense.sense_id),
                ));
            }
        }
    }
}

fn validate_word(entry: &WordEntry) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if entry.senses.is_empty() {
        issues.push(ValidationIssue::new(
            &entry.lemma,
            "no_senses",
            "entry has no senses (requires at least 1)".to_string(),
        ));
        return issues;
    }
    validate_senses(&entry.lemma, &entry.senses, &mut issues);

    if !entry.pos.is_empty() {
        let entry_pos: Vec<String> = entry.pos.iter().map(|p| p.to_uppercase()).collect();
        let missing: Vec<&str> = entry
            .senses
            .iter()
            .filter_map(|s| s.pos.as_deref())
            .filter(|p| {
                let upper = p.to_uppercase();
                upper != "PHRASE" && upper != "OTHER" && !entry_pos.contains(&upper)
            })
            .collect();
        if !missing.is_empty() {
            issues.push(ValidationIssue::new(
                &entry.lemma,
                "pos_mismatch",
                format!("entry pos {:?} missing sense POS types: {missing:?}", entry.pos),
            ));
        }
    }

    for note in &entry.confusion_notes {
        if note.memory_tip.trim().is_empty() || note.distinction.trim().is_empty() {
            issues.push(ValidationIssue::new(
                &entry.lemma,
                "invalid_confusion_note",
                "confusion note must have distinction and memory_tip".to_string(),
            ));
        }
    }

    if entry.level == Some(1) && entry.root_info.is_some() {
        issues.push(ValidationIssue::new(
            &entry.lemma,
            "root_for_level1",
            "level 1 words should not carry root_info".to_string(),
        ));
    }
    if let Some(root) = &entry.root_info {
        if root.memory_strategy.trim().is_empty() {
            issues.push(ValidationIssue::new(
                &entry.lemma,
                "missing_memory_strategy",
                "root_info exists but memory_strategy is empty".to_string(),
            ));
        }
    }

    issues
}

fn validate_phrase(entry: &PhraseEntry) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if entry.senses.is_empty() {
        issues.push(ValidationIssue::new(
            &entry.lemma,
            "no_senses",
            "entry has no senses (requires at least 1)".to_string(),
        ));
        return issues;
    }
    validate_senses(&entry.lemma, &entry.senses, &mut issues);
    issues
}

fn validate_pattern(entry: &PatternEntry) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if entry.subtypes.is_empty() {
        issues.push(ValidationIssue::new(
            &entry.lemma,
            "no_subtypes",
            "pattern entry has no subtypes".to_string(),
        ));
        return issues;
    }
    if entry.teaching_explanation.trim().is_empty() {
        issues.push(ValidationIssue::new(
            &entry.lemma,
            "missing_teaching_explanation",
            "pattern entry has empty teaching_explanation".to_string(),
        ));
    }
    for subtype in &entry.subtypes {
        if subtype.generated_example.is_empty() {
            issues.push(ValidationIssue::new(
                &entry.lemma,
                "missing_generated_example",
                format!("subtype {:?} has no generated example", subtype.subtype),
            ));
        }
    }
    issues
}

pub fn validate_entry(entry: &VocabEntry) -> Vec<ValidationIssue> {
    match entry {
        VocabEntry::Word(w) => validate_word(w),
        VocabEntry::Phrase(p) => validate_phrase(p),
        VocabEntry::Pattern(p) => validate_pattern(p),
    }
}

/// Validate every entry. Entries with critical issues are excluded; every
/// issue is returned for the sidecar file.
pub fn validate_all_entries(entries: Vec<VocabEntry>) -> (Vec<VocabEntry>, Vec<ValidationIssue>) {
    let mut all_issues = Vec::new();
    let mut valid = Vec::new();

    for entry in entries {
        let issues = validate_entry(&entry);
        let has_critical = issues
            .iter()
            .any(|i| CRITICAL_ISSUES.contains(&i.issue_type.as_str()));
        all_issues.extend(issues);

        if has_critical {
            tracing::warn!(lemma = %entry.lemma(), "excluding entry due to critical issues");
        } else {
            valid.push(entry);
        }
    }

    if all_issues.is_empty() {
        tracing::info!("all entries passed validation");
    } else {
        tracing::warn!(issues = all_issues.len(), "validation found issues");
    }

    (valid, all_issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsatvocab_model::{ExamExample, ExamType, FrequencyData, SectionType, SourceInfo};

    fn frequency() -> FrequencyData {
        FrequencyData {
            total_appearances: 1,
            tested_count: 0,
            active_tested_count: 0,
            year_spread: 1,
            years: vec![113],
            by_role: Default::default(),
            by_section: Default::default(),
            by_exam_type: Default::default(),
        }
    }

    fn sense(sense_id: &str, pos: &str) -> VocabSense {
        VocabSense {
            sense_id: sense_id.to_string(),
            pos: Some(pos.to_string()),
            zh_def: "草稿".to_string(),
            en_def: "a first version".to_string(),
            examples: vec![ExamExample {
                text: "The draft was rough.".to_string(),
                source: SourceInfo {
                    year: 113,
                    exam_type: ExamType::Gsat,
                    section_type: SectionType::Vocabulary,
                    question_number: Some(1),
                    role: None,
                    sentence_role: None,
                },
            }],
            generated_example: "She revised the draft.".to_string(),
        }
    }

    fn word(lemma: &str, senses: Vec<VocabSense>) -> VocabEntry {
        VocabEntry::Word(WordEntry {
            lemma: lemma.to_string(),
            pos: vec!["NOUN".to_string()],
            level: Some(2),
            in_official_list: true,
            senses,
            frequency: frequency(),
            confusion_notes: vec![],
            root_info: None,
            synonyms: None,
            antonyms: None,
        })
    }

    #[test]
    fn well_formed_entry_passes() {
        let entry = word("draft", vec![sense("draft.n.dict12345678", "NOUN")]);
        assert!(validate_entry(&entry).is_empty());
    }

    #[test]
    fn phrase_sense_ids_use_underscore_key() {
        let entry = VocabEntry::Phrase(PhraseEntry {
            lemma: "draw on".to_string(),
            senses: vec![VocabSense {
                sense_id: "draw_on.phr.reg1".to_string(),
                pos: None,
                zh_def: "利用".to_string(),
                en_def: "to make use of".to_string(),
                examples: vec![],
                generated_example: "She drew on her experience.".to_string(),
            }],
            frequency: frequency(),
            confusion_notes: vec![],
        });
        assert!(validate_entry(&entry).is_empty());
    }

    #[test]
    fn mismatched_sense_id_prefix_is_flagged() {
        let entry = word("draft", vec![sense("other.n.dict12345678", "NOUN")]);
        let issues = validate_entry(&entry);
        assert!(issues.iter().any(|i| i.issue_type == "invalid_sense_id"));
    }

    #[test]
    fn no_senses_is_critical() {
        let (valid, issues) = validate_all_entries(vec![word("draft", vec![])]);
        assert!(valid.is_empty());
        assert!(issues.iter().any(|i| i.issue_type == "no_senses"));
    }

    #[test]
    fn empty_definitions_are_non_critical() {
        let mut bad = sense("draft.n.dict12345678", "NOUN");
        bad.zh_def = "  ".to_string();
        let (valid, issues) = validate_all_entries(vec![word("draft", vec![bad])]);
        assert_eq!(valid.len(), 1);
        assert!(issues.iter().any(|i| i.issue_type == "missing_zh_def"));
    }

    #[test]
    fn pos_mismatch_detected() {
        let entry = word("draft", vec![sense("draft.v.reg1", "VERB")]);
        let issues = validate_entry(&entry);
        assert!(issues.iter().any(|i| i.issue_type == "pos_mismatch"));
    }

    #[test]
    fn level_one_root_info_flagged() {
        let VocabEntry::Word(mut w) = word("easy", vec![sense("easy.adj.reg1", "ADJ")]) else {
            panic!()
        };
        w.level = Some(1);
        w.pos = vec!["ADJ".to_string()];
        w.root_info = Some(gsatvocab_model::RootInfo {
            root_breakdown: None,
            memory_strategy: "whatever".to_string(),
        });
        let issues = validate_entry(&VocabEntry::Word(w));
        assert!(issues.iter().any(|i| i.issue_type == "root_for_level1"));
    }
}
