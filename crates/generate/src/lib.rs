//! Definition generation: learner-facing bilingual content per sense,
//! cached in the registry on the sense-set hash so a fixed inventory never
//! pays for the same LLM work twice.

mod prompts;

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use gsatvocab_llm::{LanguageModel, ModelTier, complete};
use gsatvocab_model::{
    AssignedSense, ConfusionNote, ExamExample, PatternEntry, PatternSubtypeOutput, PhraseEntry,
    RootInfo, SenseAssignedData, SenseAssignedPatternEntry, SenseAssignedPhraseEntry,
    SenseAssignedWordEntry, VocabEntry, VocabSense, WordEntry,
};
use gsatvocab_registry::{Registry, generation_cache_key};

use prompts::{
    PATTERN_CATEGORY_SYSTEM, PATTERN_SUBTYPE_SYSTEM, SENSE_GENERATE_SYSTEM,
    pattern_category_prompt, pattern_subtype_prompt, sense_generate_prompt,
};

pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize, &str) + Sync);

const BATCH_SIZE: usize = 20;
const MAX_GENERATION_ATTEMPTS: usize = 3;
const RETRY_BASE_DELAY_SECS: u64 = 2;

// ── LLM response models ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedSenseDefinition {
    pub sense_index: usize,
    pub zh_def: String,
    pub en_def: String,
    pub generated_example: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedConfusionNote {
    pub confused_with: String,
    pub distinction: String,
    pub memory_tip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedRootInfo {
    pub root_breakdown: Option<String>,
    pub memory_strategy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WordSenseGeneration {
    pub lemma: String,
    pub senses: Vec<GeneratedSenseDefinition>,
    pub confusion_notes: Option<Vec<GeneratedConfusionNote>>,
    pub root_info: Option<GeneratedRootInfo>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct BatchSenseGenerateResponse {
    words: Vec<WordSenseGeneration>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct PatternCategoryGeneration {
    teaching_explanation: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct PatternSubtypeGeneration {
    generated_example: String,
}

// ── entries ──────────────────────────────────────────────────────────────────

/// A word or phrase entry going through generation; patterns take their own
/// path.
#[derive(Clone, Copy)]
enum GenEntry<'a> {
    Word(&'a SenseAssignedWordEntry),
    Phrase(&'a SenseAssignedPhraseEntry),
}

impl<'a> GenEntry<'a> {
    fn lemma(&self) -> &'a str {
        match self {
            GenEntry::Word(w) => &w.lemma,
            GenEntry::Phrase(p) => &p.lemma,
        }
    }

    fn senses(&self) -> &'a [AssignedSense] {
        match self {
            GenEntry::Word(w) => &w.senses,
            GenEntry::Phrase(p) => &p.senses,
        }
    }

    fn context_texts(&self) -> Vec<&'a str> {
        let contexts = match self {
            GenEntry::Word(w) => &w.contexts,
            GenEntry::Phrase(p) => &p.contexts,
        };
        contexts.iter().take(4).map(|c| c.text.as_str()).collect()
    }
}

/// Lemma key used to join LLM batch responses back onto entries.
fn normalize_lemma_key(lemma: &str) -> String {
    static POSSESSIVE_RE: OnceLock<Regex> = OnceLock::new();
    static SPACE_RE: OnceLock<Regex> = OnceLock::new();
    let possessive = POSSESSIVE_RE.get_or_init(|| Regex::new(r"\s+'s\b").unwrap());
    let spaces = SPACE_RE.get_or_init(|| Regex::new(r"\s+").unwrap());

    let lower = lemma.to_lowercase();
    let collapsed = possessive.replace_all(lower.trim(), "'s");
    spaces.replace_all(&collapsed, " ").to_string()
}

fn cache_key_for(entry: &GenEntry<'_>) -> String {
    let tuples: Vec<(String, Option<String>, String)> = entry
        .senses()
        .iter()
        .map(|s| (s.sense_id.clone(), s.pos.clone(), s.definition.clone()))
        .collect();
    generation_cache_key(&tuples)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn build_batch_xml(entries: &[GenEntry<'_>]) -> String {
    let mut lines = vec!["<words>".to_string()];
    for entry in entries {
        let (entry_type, level, pos) = match entry {
            GenEntry::Word(w) => (
                "word",
                w.level.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()),
                w.pos.join(","),
            ),
            GenEntry::Phrase(_) => ("phrase", "unknown".to_string(), String::new()),
        };
        lines.push(format!(
            "  <word lemma=\"{}\" type=\"{}\" level=\"{}\" pos=\"{}\">",
            escape(entry.lemma()),
            entry_type,
            level,
            pos
        ));

        let contexts = entry.context_texts();
        if !contexts.is_empty() {
            lines.push("    <contexts>".to_string());
            for ctx in contexts {
                lines.push(format!("      <context>{}</context>", escape(ctx)));
            }
            lines.push("    </contexts>".to_string());
        }

        for (i, sense) in entry.senses().iter().enumerate() {
            lines.push(format!(
                "    <sense index=\"{}\" pos=\"{}\" source=\"{}\">",
                i,
                sense.pos.as_deref().unwrap_or("UNKNOWN"),
                sense.source.as_str()
            ));
            if let Some(core) = &sense.core_meaning {
                lines.push(format!("      <core_meaning>{}</core_meaning>", escape(core)));
            }
            if !sense.definition.is_empty() {
                lines.push(format!(
                    "      <base_definition>{}</base_definition>",
                    escape(&sense.definition)
                ));
            }
            if !sense.merged_definitions.is_empty() {
                lines.push(format!(
                    "      <merged_definitions>{}</merged_definitions>",
                    escape(&sense.merged_definitions[..sense.merged_definitions.len().min(3)].join("; "))
                ));
            }
            if !sense.examples.is_empty() {
                lines.push(format!(
                    "      <source_examples>{}</source_examples>",
                    escape(&sense.examples[..sense.examples.len().min(2)].join("; "))
                ));
            }
            lines.push("    </sense>".to_string());
        }
        lines.push("  </word>".to_string());
    }
    lines.push("</words>".to_string());
    lines.join("\n")
}

async fn generate_batch(
    entries: &[GenEntry<'_>],
    llm: &dyn LanguageModel,
) -> HashMap<String, WordSenseGeneration> {
    let prompt = sense_generate_prompt(&build_batch_xml(entries));
    tracing::debug!(
        entries = entries.len(),
        senses = entries.iter().map(|e| e.senses().len()).sum::<usize>(),
        "generating sense batch"
    );

    match complete::<BatchSenseGenerateResponse>(
        llm,
        &prompt,
        SENSE_GENERATE_SYSTEM,
        ModelTier::Fast,
        0.2,
    )
    .await
    {
        Ok(response) => response
            .words
            .into_iter()
            .map(|w| (normalize_lemma_key(&w.lemma), w))
            .collect(),
        Err(e) => {
            tracing::error!(error = %e, "batch sense generation failed");
            HashMap::new()
        }
    }
}

fn load_cached(
    entry: &GenEntry<'_>,
    cache_key: &str,
    registry: &Registry,
) -> Option<WordSenseGeneration> {
    let payload = registry
        .get_generation_cache(entry.lemma(), cache_key)
        .ok()
        .flatten()?;
    match serde_json::from_str(&payload) {
        Ok(cached) => Some(cached),
        Err(e) => {
            tracing::warn!(lemma = %entry.lemma(), error = %e, "invalid generation cache, regenerating");
            None
        }
    }
}

fn store_cache(
    entry: &GenEntry<'_>,
    cache_key: &str,
    generation: &WordSenseGeneration,
    registry: &Registry,
) -> Result<()> {
    let payload = serde_json::to_string(generation)?;
    registry.upsert_generation_cache(entry.lemma(), cache_key, &payload)
}

/// Join generated content back to the registry's sense list by
/// `sense_index`; out-of-range indices are dropped.
fn build_vocab_entry(entry: &GenEntry<'_>, generated: &WordSenseGeneration) -> VocabEntry {
    let mut sorted: Vec<&GeneratedSenseDefinition> = generated.senses.iter().collect();
    sorted.sort_by_key(|s| s.sense_index);

    let mut vocab_senses: Vec<VocabSense> = Vec::new();
    for gen_sense in sorted {
        let Some(assigned) = entry.senses().get(gen_sense.sense_index) else {
            tracing::warn!(
                lemma = %entry.lemma(),
                sense_index = gen_sense.sense_index,
                "generated sense_index out of range"
            );
            continue;
        };
        vocab_senses.push(VocabSense {
            sense_id: assigned.sense_id.clone(),
            pos: assigned.pos.clone(),
            zh_def: gen_sense.zh_def.clone(),
            en_def: gen_sense.en_def.clone(),
            // real exam examples are attached by the WSD stage
            examples: vec![],
            generated_example: gen_sense.generated_example.clone(),
        });
    }

    let confusion_notes: Vec<ConfusionNote> = generated
        .confusion_notes
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|n| ConfusionNote {
            confused_with: n.confused_with.clone(),
            distinction: n.distinction.clone(),
            memory_tip: n.memory_tip.clone(),
        })
        .collect();

    match entry {
        GenEntry::Word(word) => {
            let root_info = generated.root_info.as_ref().map(|r| RootInfo {
                root_breakdown: r.root_breakdown.clone(),
                memory_strategy: r.memory_strategy.clone(),
            });
            VocabEntry::Word(WordEntry {
                lemma: word.lemma.clone(),
                pos: word.pos.clone(),
                level: word.level,
                in_official_list: word.in_official_list,
                senses: vocab_senses,
                frequency: word.frequency.clone(),
                confusion_notes,
                root_info,
                synonyms: None,
                antonyms: None,
            })
        }
        GenEntry::Phrase(phrase) => VocabEntry::Phrase(PhraseEntry {
            lemma: phrase.lemma.clone(),
            senses: vocab_senses,
            frequency: phrase.frequency.clone(),
            confusion_notes,
        }),
    }
}

async fn process_pattern_entry(
    entry: &SenseAssignedPatternEntry,
    llm: &dyn LanguageModel,
) -> PatternEntry {
    let teaching_explanation = match complete::<PatternCategoryGeneration>(
        llm,
        &pattern_category_prompt(entry.pattern_category.as_str(), &entry.lemma),
        PATTERN_CATEGORY_SYSTEM,
        ModelTier::Smart,
        0.3,
    )
    .await
    {
        Ok(response) => response.teaching_explanation,
        Err(e) => {
            tracing::error!(category = ?entry.pattern_category, error = %e, "pattern explanation failed");
            format!("{}的語法說明", entry.lemma)
        }
    };

    let subtype_futures = entry.subtypes.iter().map(|subtype_data| async move {
        let contexts_xml: String = subtype_data
            .occurrences
            .iter()
            .take(3)
            .map(|occ| format!("    <context>{}</context>", escape(&occ.sentence)))
            .collect::<Vec<_>>()
            .join("\n");
        match complete::<PatternSubtypeGeneration>(
            llm,
            &pattern_subtype_prompt(
                subtype_data.subtype.as_str(),
                &subtype_data.display_name,
                &subtype_data.structure,
                &contexts_xml,
            ),
            PATTERN_SUBTYPE_SYSTEM,
            ModelTier::Smart,
            0.3,
        )
        .await
        {
            Ok(response) => response.generated_example,
            Err(e) => {
                tracing::error!(subtype = ?subtype_data.subtype, error = %e, "pattern example failed");
                format!("Example sentence for {}", subtype_data.structure)
            }
        }
    });
    let subtype_examples: Vec<String> = futures::future::join_all(subtype_futures).await;

    let subtypes: Vec<PatternSubtypeOutput> = entry
        .subtypes
        .iter()
        .zip(subtype_examples)
        .map(|(subtype_data, generated_example)| PatternSubtypeOutput {
            subtype: subtype_data.subtype,
            display_name: subtype_data.display_name.clone(),
            structure: subtype_data.structure.clone(),
            examples: subtype_data
                .occurrences
                .iter()
                .map(|occ| ExamExample {
                    text: occ.sentence.clone(),
                    source: occ.source.clone(),
                })
                .collect(),
            generated_example,
        })
        .collect();

    PatternEntry {
        lemma: entry.lemma.clone(),
        pattern_category: entry.pattern_category,
        subtypes,
        teaching_explanation,
        frequency: entry.frequency.clone(),
    }
}

/// Generate learner-facing content for every entry, cache-first.
pub async fn generate_all_entries(
    data: &SenseAssignedData,
    registry: &Registry,
    llm: &dyn LanguageModel,
    progress: Option<ProgressFn<'_>>,
) -> Result<Vec<VocabEntry>> {
    let entries: Vec<GenEntry<'_>> = data
        .words
        .iter()
        .map(GenEntry::Word)
        .chain(data.phrases.iter().map(GenEntry::Phrase))
        .collect();

    let total_batches = entries.len().div_ceil(BATCH_SIZE).max(1);
    tracing::info!(
        entries = entries.len(),
        batches = total_batches,
        "generating definitions"
    );

    // cache probe
    let mut generation_map: HashMap<String, WordSenseGeneration> = HashMap::new();
    let mut cache_keys: HashMap<String, String> = HashMap::new();
    let mut to_generate: Vec<GenEntry<'_>> = Vec::new();
    for entry in &entries {
        let cache_key = cache_key_for(entry);
        let lemma_key = normalize_lemma_key(entry.lemma());
        cache_keys.insert(lemma_key.clone(), cache_key.clone());
        match load_cached(entry, &cache_key, registry) {
            Some(cached) => {
                generation_map.insert(lemma_key, cached);
            }
            None => to_generate.push(*entry),
        }
    }
    let cache_hits = generation_map.len();

    // batched generation with bounded retries for omitted lemmas
    let mut pending: Vec<GenEntry<'_>> = to_generate;
    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        if pending.is_empty() {
            break;
        }
        if attempt > 1 {
            let delay = RETRY_BASE_DELAY_SECS * 2u64.pow(attempt as u32 - 2);
            tracing::info!(attempt, delay_secs = delay, missing = pending.len(), "retrying generation");
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }

        let batch_results = futures::future::join_all(
            pending
                .chunks(BATCH_SIZE)
                .map(|chunk| generate_batch(chunk, llm)),
        )
        .await;

        let mut round: HashMap<String, WordSenseGeneration> = HashMap::new();
        for result in batch_results {
            round.extend(result);
        }

        for entry in &pending {
            let lemma_key = normalize_lemma_key(entry.lemma());
            if let Some(generation) = round.get(&lemma_key) {
                if let Some(cache_key) = cache_keys.get(&lemma_key) {
                    if let Err(e) = store_cache(entry, cache_key, generation, registry) {
                        tracing::warn!(lemma = %entry.lemma(), error = %e, "storing generation cache failed");
                    }
                }
            }
        }
        generation_map.extend(round);

        pending.retain(|e| !generation_map.contains_key(&normalize_lemma_key(e.lemma())));
        if let Some(cb) = progress {
            cb(generation_map.len(), entries.len(), "word_phrase");
        }
    }

    if !pending.is_empty() {
        let preview: Vec<&str> = pending.iter().take(5).map(|e| e.lemma()).collect();
        tracing::warn!(
            missing = pending.len(),
            preview = ?preview,
            "generation failed after retries, skipping entries"
        );
    }

    let mut results: Vec<VocabEntry> = Vec::new();
    for entry in &entries {
        let lemma_key = normalize_lemma_key(entry.lemma());
        match generation_map.get(&lemma_key) {
            Some(generated) => results.push(build_vocab_entry(entry, generated)),
            None => {
                tracing::warn!(lemma = %entry.lemma(), "no generation available, skipping");
            }
        }
    }

    tracing::info!(
        cache_hits,
        generated = generation_map.len().saturating_sub(cache_hits),
        "definition generation finished"
    );

    // patterns: one explanation per category, one example per subtype
    tracing::info!(patterns = data.patterns.len(), "generating pattern content");
    let pattern_results = futures::future::join_all(
        data.patterns
            .iter()
            .map(|entry| process_pattern_entry(entry, llm)),
    )
    .await;
    results.extend(pattern_results.into_iter().map(VocabEntry::Pattern));

    if let Some(cb) = progress {
        cb(results.len(), entries.len() + data.patterns.len(), "done");
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gsatvocab_llm::{CompletionRequest, LlmError};
    use gsatvocab_model::{FrequencyData, SenseSource};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn frequency() -> FrequencyData {
        FrequencyData {
            total_appearances: 2,
            tested_count: 1,
            active_tested_count: 1,
            year_spread: 1,
            years: vec![113],
            by_role: Default::default(),
            by_section: Default::default(),
            by_exam_type: Default::default(),
        }
    }

    fn sense(sense_id: &str, pos: Option<&str>, definition: &str) -> AssignedSense {
        AssignedSense {
            sense_id: sense_id.to_string(),
            source: SenseSource::Dictionaryapi,
            pos: pos.map(str::to_string),
            definition: definition.to_string(),
            examples: vec![],
            merged_definitions: vec![],
            core_meaning: None,
        }
    }

    fn word(lemma: &str, senses: Vec<AssignedSense>) -> SenseAssignedWordEntry {
        SenseAssignedWordEntry {
            lemma: lemma.to_string(),
            pos: vec!["NOUN".to_string()],
            level: Some(3),
            in_official_list: true,
            frequency: frequency(),
            senses,
            contexts: vec![],
        }
    }

    fn generation_json(lemma: &str) -> Value {
        json!({
            "words": [{
                "lemma": lemma,
                "senses": [{
                    "sense_index": 0,
                    "zh_def": "草稿",
                    "en_def": "a first rough version of a text",
                    "generated_example": "She handed in the first draft of her report."
                }],
                "confusion_notes": null,
                "root_info": null
            }]
        })
    }

    struct ScriptedLlm {
        responses: Mutex<Vec<Value>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for ScriptedLlm {
        async fn complete_value(&self, _request: CompletionRequest) -> Result<Value, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(json!({"words": []}))
            } else {
                Ok(responses.remove(0))
            }
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(vec![])
        }
    }

    fn temp_registry() -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("registry.redb")).unwrap();
        (dir, registry)
    }

    #[tokio::test]
    async fn generation_is_cached_on_sense_set_hash() {
        let (_dir, registry) = temp_registry();
        let entry = word(
            "draft",
            vec![sense("draft.n.dict11112222", Some("NOUN"), "a preliminary version")],
        );
        let data = SenseAssignedData {
            words: vec![entry],
            ..Default::default()
        };

        let llm = ScriptedLlm {
            responses: Mutex::new(vec![generation_json("draft")]),
            calls: AtomicUsize::new(0),
        };
        let first = generate_all_entries(&data, &registry, &llm, None).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

        // second run over the identical inventory: zero LLM calls
        let llm2 = ScriptedLlm {
            responses: Mutex::new(vec![]),
            calls: AtomicUsize::new(0),
        };
        let second = generate_all_entries(&data, &registry, &llm2, None).await.unwrap();
        assert_eq!(llm2.calls.load(Ordering::SeqCst), 0);

        let (VocabEntry::Word(a), VocabEntry::Word(b)) = (&first[0], &second[0]) else {
            panic!("expected word entries");
        };
        assert_eq!(a.senses[0].zh_def, b.senses[0].zh_def);
        assert_eq!(a.senses[0].sense_id, "draft.n.dict11112222");
        assert!(a.senses[0].examples.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn omitted_lemmas_are_retried_then_skipped() {
        let (_dir, registry) = temp_registry();
        let data = SenseAssignedData {
            words: vec![
                word("draft", vec![sense("draft.n.dict1", Some("NOUN"), "a version")]),
                word("ghost", vec![sense("ghost.n.dict1", Some("NOUN"), "a spirit")]),
            ],
            ..Default::default()
        };

        // every response only covers "draft"; "ghost" stays missing
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![
                generation_json("draft"),
                json!({"words": []}),
                json!({"words": []}),
            ]),
            calls: AtomicUsize::new(0),
        };

        let results = generate_all_entries(&data, &registry, &llm, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].lemma(), "draft");
        // initial pass + two retry passes
        assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn out_of_range_sense_index_is_dropped() {
        let (_dir, registry) = temp_registry();
        let data = SenseAssignedData {
            words: vec![word(
                "draft",
                vec![sense("draft.n.dict1", Some("NOUN"), "a version")],
            )],
            ..Default::default()
        };
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![json!({
                "words": [{
                    "lemma": "draft",
                    "senses": [
                        {"sense_index": 0, "zh_def": "草稿", "en_def": "a rough version", "generated_example": "A draft."},
                        {"sense_index": 7, "zh_def": "bogus", "en_def": "bogus", "generated_example": "bogus"}
                    ],
                    "confusion_notes": null,
                    "root_info": null
                }]
            })]),
            calls: AtomicUsize::new(0),
        };

        let results = generate_all_entries(&data, &registry, &llm, None).await.unwrap();
        let VocabEntry::Word(word) = &results[0] else {
            panic!("expected word");
        };
        assert_eq!(word.senses.len(), 1);
        assert_eq!(word.senses[0].zh_def, "草稿");
    }

    #[test]
    fn lemma_key_normalization() {
        assert_eq!(normalize_lemma_key("Draft"), "draft");
        assert_eq!(normalize_lemma_key("mother  's day"), "mother's day");
        assert_eq!(normalize_lemma_key("draw   on"), "draw on");
    }
}
