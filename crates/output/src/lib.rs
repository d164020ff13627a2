//! Database assembly: validation, deterministic ordering, and the compact
//! JSON artifact plus its errors sidecar.

mod validation;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use gsatvocab_model::{VocabDatabase, VocabEntry, VocabMetadata, YearRange};

pub use validation::{ValidationIssue, validate_all_entries, validate_entry};

const DATABASE_VERSION: &str = "3.0.0";

fn type_rank(entry: &VocabEntry) -> u8 {
    match entry {
        VocabEntry::Word(_) => 0,
        VocabEntry::Phrase(_) => 1,
        VocabEntry::Pattern(_) => 2,
    }
}

/// Validate entries and assemble the final database. Entries with critical
/// issues are excluded; all issues are returned for the sidecar.
///
/// `generated_at` is supplied by the caller so identical inputs produce
/// byte-identical artifacts.
pub fn build_database(
    entries: Vec<VocabEntry>,
    year_range: YearRange,
    generated_at: &str,
) -> (VocabDatabase, Vec<ValidationIssue>) {
    let input_count = entries.len();
    let (mut valid, issues) = validate_all_entries(entries);
    if !issues.is_empty() {
        tracing::warn!(
            issues = issues.len(),
            entries = input_count,
            "validation issues collected"
        );
    }

    valid.sort_by(|a, b| {
        type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| a.lemma().cmp(b.lemma()))
    });

    let mut count_by_type = std::collections::BTreeMap::new();
    count_by_type.insert("word".to_string(), 0usize);
    count_by_type.insert("phrase".to_string(), 0usize);
    count_by_type.insert("pattern".to_string(), 0usize);
    for entry in &valid {
        *count_by_type.get_mut(entry.type_name()).unwrap() += 1;
    }

    let metadata = VocabMetadata {
        exam_year_range: year_range,
        total_entries: valid.len(),
        count_by_type,
    };

    (
        VocabDatabase {
            version: DATABASE_VERSION.to_string(),
            generated_at: generated_at.to_string(),
            metadata,
            entries: valid,
        },
        issues,
    )
}

/// Recursively drop empty-array members so the artifact stays compact.
fn strip_empty_arrays(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !matches!(v, Value::Array(a) if a.is_empty()))
                .map(|(k, v)| (k, strip_empty_arrays(v)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(strip_empty_arrays).collect())
        }
        other => other,
    }
}

/// Serialized database JSON, with empty arrays and absent options omitted.
pub fn render_database(database: &VocabDatabase) -> Result<String> {
    let value = serde_json::to_value(database)?;
    let compact = strip_empty_arrays(value);
    Ok(serde_json::to_string_pretty(&compact)?)
}

/// Write the database artifact and, when there are issues, the errors
/// sidecar next to it.
pub fn write_output(
    database: &VocabDatabase,
    output_path: &Path,
    errors_path: Option<&Path>,
    issues: &[ValidationIssue],
) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let rendered = render_database(database)?;
    fs::write(output_path, rendered)
        .with_context(|| format!("writing database to {}", output_path.display()))?;

    if let Some(errors_path) = errors_path {
        if !issues.is_empty() {
            let rendered = serde_json::to_string_pretty(issues)?;
            fs::write(errors_path, rendered)
                .with_context(|| format!("writing errors sidecar to {}", errors_path.display()))?;
        }
    }

    tracing::info!(
        entries = database.metadata.total_entries,
        path = %output_path.display(),
        "database written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsatvocab_model::{
        ExamExample, ExamType, FrequencyData, PhraseEntry, SectionType, SourceInfo, VocabSense,
        WordEntry,
    };

    fn frequency() -> FrequencyData {
        FrequencyData {
            total_appearances: 1,
            tested_count: 1,
            active_tested_count: 1,
            year_spread: 1,
            years: vec![113],
            by_role: Default::default(),
            by_section: Default::default(),
            by_exam_type: Default::default(),
        }
    }

    fn sense(sense_id: &str) -> VocabSense {
        VocabSense {
            sense_id: sense_id.to_string(),
            pos: Some("NOUN".to_string()),
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

    fn phrase(lemma: &str, sense_id: &str) -> VocabEntry {
        VocabEntry::Phrase(PhraseEntry {
            lemma: lemma.to_string(),
            senses: vec![VocabSense {
                sense_id: sense_id.to_string(),
                pos: None,
                zh_def: "利用".to_string(),
                en_def: "to make use of".to_string(),
                examples: vec![],
                generated_example: "She drew on her savings.".to_string(),
            }],
            frequency: frequency(),
            confusion_notes: vec![],
        })
    }

    fn years() -> YearRange {
        YearRange { min: 110, max: 115 }
    }

    #[test]
    fn counts_match_entry_lists() {
        let entries = vec![
            word("draft", vec![sense("draft.n.dict12345678")]),
            word("essay", vec![sense("essay.n.dict12345678")]),
            phrase("draw on", "draw_on.phr.reg1"),
        ];
        let (db, issues) = build_database(entries, years(), "2026-08-01T00:00:00Z");
        assert!(issues.is_empty());
        assert_eq!(db.metadata.total_entries, 3);
        assert_eq!(db.metadata.count_by_type["word"], 2);
        assert_eq!(db.metadata.count_by_type["phrase"], 1);
        assert_eq!(db.metadata.count_by_type["pattern"], 0);
        assert_eq!(
            db.entries.iter().filter(|e| e.type_name() == "word").count(),
            db.metadata.count_by_type["word"]
        );
    }

    #[test]
    fn critical_entries_are_excluded_but_reported() {
        let entries = vec![
            word("draft", vec![sense("draft.n.dict12345678")]),
            word("broken", vec![]),
        ];
        let (db, issues) = build_database(entries, years(), "2026-08-01T00:00:00Z");
        assert_eq!(db.metadata.total_entries, 1);
        assert!(issues.iter().any(|i| i.lemma == "broken"));
    }

    #[test]
    fn entries_sorted_for_determinism() {
        let entries = vec![
            phrase("draw on", "draw_on.phr.reg1"),
            word("zebra", vec![sense("zebra.n.dict12345678")]),
            word("apple", vec![sense("apple.n.dict12345678")]),
        ];
        let (db, _) = build_database(entries, years(), "2026-08-01T00:00:00Z");
        let lemmas: Vec<&str> = db.entries.iter().map(|e| e.lemma()).collect();
        assert_eq!(lemmas, vec!["apple", "zebra", "draw on"]);
    }

    #[test]
    fn rendering_is_deterministic_and_compact() {
        let build = || {
            let entries = vec![
                word("draft", vec![sense("draft.n.dict12345678")]),
                phrase("draw on", "draw_on.phr.reg1"),
            ];
            build_database(entries, years(), "2026-08-01T00:00:00Z").0
        };
        let a = render_database(&build()).unwrap();
        let b = render_database(&build()).unwrap();
        assert_eq!(a, b);

        // the phrase sense has no exam examples: the key is gone entirely
        let value: Value = serde_json::from_str(&a).unwrap();
        let phrase_entry = value["entries"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["type"] == "phrase")
            .unwrap();
        assert!(phrase_entry["senses"][0].get("examples").is_none());
        assert!(phrase_entry.get("confusion_notes").is_none());
    }

    #[test]
    fn writes_artifact_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("vocab.json");
        let errors = dir.path().join("vocab.errors.json");

        let entries = vec![word("broken", vec![])];
        let (db, issues) = build_database(entries, years(), "2026-08-01T00:00:00Z");
        write_output(&db, &output, Some(&errors), &issues).unwrap();

        assert!(output.exists());
        assert!(errors.exists());
        let sidecar: Value = serde_json::from_str(&fs::read_to_string(errors).unwrap()).unwrap();
        assert_eq!(sidecar[0]["issue_type"], "no_senses");
    }
}
