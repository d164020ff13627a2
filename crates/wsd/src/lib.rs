//! Word-sense disambiguation: assign each quality context sentence of a
//! multi-sense entry to exactly one sense, or declare that none applies.
//!
//! Pipeline per context: single-sense fast path → durable cache probe →
//! POS filter → batched cross-encoder scoring → selective LLM fallback.
//! Every scored or LLM-resolved decision is cached with the deciding
//! model's version; POS-filter-only resolutions are deterministic and
//! cheap, so they are recomputed instead of cached.

mod mark;
mod scorer;

use std::collections::HashMap;

use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;

use gsatvocab_llm::{LanguageModel, ModelTier, complete};
use gsatvocab_model::{ContextSentence, ExamExample, SenseAssignedData, VocabEntry, VocabSense};
use gsatvocab_registry::{
    Registry, WSD_LLM_VERSION, WSD_MODEL_VERSION, WsdSource, wsd_cache_key,
};
use gsatvocab_nlp::DocCache;

pub use mark::mark_target_word;
pub use scorer::{ScorePair, SenseScorer, encoder_input};

pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize, &str) + Sync);

/// Score gap above which the top sense is assigned without the LLM.
pub const DIFF_THRESHOLD_CONFIDENT: f32 = 0.15;
/// Below this top score (with a tiny gap) the context is treated as an
/// idiom / fixed expression.
pub const SCORE_THRESHOLD_LOW: f32 = 2.5;
pub const DIFF_THRESHOLD_IGNORE: f32 = 0.05;

const WSD_LLM_BATCH_SIZE: usize = 15;
const WSD_MODEL_BATCH_SIZE: usize = 64;
const WSD_CHUNK_SIZE: usize = 200;
const LLM_CACHE_FLUSH_EVERY: usize = 20;

const WSD_SYSTEM: &str = "You are a word sense disambiguation expert for a vocabulary learning \
system. Your task is to match word usages in sentences to their correct dictionary definitions.";

#[derive(Debug, Deserialize, JsonSchema)]
struct WsdItemDecision {
    /// The item id from the prompt.
    item_id: usize,
    /// 1-based sense index, or 0 when no sense applies (idiom).
    sense_index: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct WsdFallbackResponse {
    items: Vec<WsdItemDecision>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WsdAction {
    Assign,
    Llm,
    Ignore,
}

fn decide_action(best_score: f32, score_diff: f32) -> WsdAction {
    if score_diff >= DIFF_THRESHOLD_CONFIDENT {
        WsdAction::Assign
    } else if best_score < SCORE_THRESHOLD_LOW && score_diff < DIFF_THRESHOLD_IGNORE {
        WsdAction::Ignore
    } else {
        WsdAction::Llm
    }
}

/// One context of one multi-sense entry awaiting a decision.
struct WsdTask {
    entry_idx: usize,
    ctx_idx: usize,
    lemma: String,
    sentence: String,
    cache_key: String,
    marked_sentence: String,
    /// Original sense indices surviving the POS filter.
    filtered_indices: Vec<usize>,
}

/// A low-confidence case queued for the LLM.
struct PendingWsd {
    entry_idx: usize,
    ctx_idx: usize,
    cache_key: String,
    lemma: String,
    sentence: String,
    filtered_indices: Vec<usize>,
}

fn entry_senses(entry: &VocabEntry) -> Option<&[VocabSense]> {
    match entry {
        VocabEntry::Word(w) => Some(&w.senses),
        VocabEntry::Phrase(p) => Some(&p.senses),
        VocabEntry::Pattern(_) => None,
    }
}

/// Definition text used for scoring: the English definition plus the
/// generated example, which disambiguates near-synonym senses.
fn scoring_definition(sense: &VocabSense) -> String {
    if sense.generated_example.is_empty() {
        sense.en_def.clone()
    } else {
        format!("{}. Example: {}", sense.en_def, sense.generated_example)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn build_wsd_batch_prompt(items: &[(&PendingWsd, &[VocabSense])]) -> String {
    let mut blocks = Vec::with_capacity(items.len());
    for (idx, (pending, senses)) in items.iter().enumerate() {
        let senses_xml: Vec<String> = pending
            .filtered_indices
            .iter()
            .enumerate()
            .map(|(i, &orig)| {
                let sense = &senses[orig];
                format!(
                    "    <sense index=\"{}\">{} - {}</sense>",
                    i + 1,
                    escape(&sense.zh_def),
                    escape(&sense.en_def)
                )
            })
            .collect();
        blocks.push(format!(
            "<item id=\"{}\">\n  <word>{}</word>\n  <sentence>{}</sentence>\n  <senses>\n{}\n  </senses>\n</item>",
            idx,
            escape(&pending.lemma),
            escape(&pending.sentence),
            senses_xml.join("\n"),
        ));
    }

    format!(
        r#"For each item below, determine which sense best matches the word usage in context.

Rules:
- Return sense_index = 1, 2, 3... for the best matching sense
- Return sense_index = 0 ONLY when NONE of the provided senses apply, such as:
  - The word is part of a fixed expression (e.g., "order" in "in order to" has no standalone meaning)
  - The word is used in a completely different sense not listed

Most words WILL match one of the senses. Only use 0 for clear cases where no sense fits.

{}

Return JSON with your decisions:"#,
        blocks.join("\n")
    )
}

/// POS of the target lemma within a parsed sentence, folded onto the sense
/// POS vocabulary.
fn detect_pos(docs: &DocCache, sentence: &str, lemma: &str) -> Option<&'static str> {
    let doc = docs.parse(sentence);
    let lemma_lower = lemma.to_lowercase();
    doc.tokens
        .iter()
        .find(|t| t.lemma == lemma_lower || t.text.to_lowercase() == lemma_lower)
        .and_then(|t| t.pos.to_sense_pos())
}

fn filter_senses_by_pos(senses: &[VocabSense], detected: Option<&str>) -> Vec<usize> {
    let all: Vec<usize> = (0..senses.len()).collect();
    let Some(detected) = detected else {
        return all;
    };
    let matching: Vec<usize> = senses
        .iter()
        .enumerate()
        .filter(|(_, s)| s.pos.as_deref() == Some(detected))
        .map(|(i, _)| i)
        .collect();
    if matching.is_empty() { all } else { matching }
}

type CacheBatch = HashMap<String, (Option<usize>, WsdSource, String)>;

/// Assign every context of every multi-sense entry to a sense, updating
/// the generated entries in place.
pub async fn perform_wsd(
    sense_data: &SenseAssignedData,
    mut generated_entries: Vec<VocabEntry>,
    registry: &Registry,
    llm: &dyn LanguageModel,
    docs: &DocCache,
    scorer_factory: Option<&(dyn Fn() -> Result<Box<dyn SenseScorer>> + Sync)>,
    progress: Option<ProgressFn<'_>>,
) -> Result<Vec<VocabEntry>> {
    let mut contexts_map: HashMap<String, &[ContextSentence]> = HashMap::new();
    for word in &sense_data.words {
        contexts_map.insert(word.lemma.to_lowercase(), &word.contexts);
    }
    for phrase in &sense_data.phrases {
        contexts_map.insert(phrase.lemma.to_lowercase(), &phrase.contexts);
    }

    // per-entry accumulator: sense index → exam examples
    let mut entry_states: HashMap<usize, Vec<Vec<ExamExample>>> = HashMap::new();
    let mut tasks: Vec<WsdTask> = Vec::new();
    let mut ctx_sources: HashMap<(usize, usize), ExamExample> = HashMap::new();

    let mut single_sense_direct = 0usize;
    for (entry_idx, entry) in generated_entries.iter().enumerate() {
        let Some(senses) = entry_senses(entry) else {
            continue;
        };
        let lemma = entry.lemma().to_string();
        entry_states.insert(entry_idx, vec![Vec::new(); senses.len()]);

        let Some(ctxs) = contexts_map.get(&lemma.to_lowercase()) else {
            continue;
        };
        if ctxs.is_empty() {
            continue;
        }

        if senses.len() <= 1 {
            if !senses.is_empty() {
                let state = entry_states.get_mut(&entry_idx).unwrap();
                for ctx in *ctxs {
                    state[0].push(ExamExample {
                        text: ctx.text.clone(),
                        source: ctx.source.clone(),
                    });
                    single_sense_direct += 1;
                }
            }
            continue;
        }

        let sense_ids: Vec<String> = senses.iter().map(|s| s.sense_id.clone()).collect();
        for (ctx_idx, ctx) in ctxs.iter().enumerate() {
            // contexts whose target cannot be located are dropped
            let Some(marked) = mark_target_word(&ctx.text, &lemma) else {
                continue;
            };
            let cache_key = wsd_cache_key(&lemma, &ctx.text, &sense_ids);
            tasks.push(WsdTask {
                entry_idx,
                ctx_idx,
                lemma: lemma.clone(),
                sentence: ctx.text.clone(),
                cache_key,
                marked_sentence: marked,
                filtered_indices: Vec::new(),
            });
            ctx_sources.insert(
                (entry_idx, ctx_idx),
                ExamExample {
                    text: ctx.text.clone(),
                    source: ctx.source.clone(),
                },
            );
        }
    }

    tracing::info!(
        direct = single_sense_direct,
        multi_sense_contexts = tasks.len(),
        "WSD workload"
    );

    let total_tasks = tasks.len();
    if tasks.is_empty() {
        if let Some(cb) = progress {
            cb(1, 1, "done");
        }
        return Ok(apply_states(generated_entries, entry_states));
    }

    // durable cache probe
    let all_keys: Vec<String> = tasks.iter().map(|t| t.cache_key.clone()).collect();
    let cached = registry.get_wsd_cache_batch(&all_keys)?;

    let mut cache_hits = 0usize;
    let mut uncached: Vec<WsdTask> = Vec::new();
    for task in tasks {
        match cached.get(&task.cache_key) {
            Some(entry) => {
                cache_hits += 1;
                if let Some(sense_idx) = entry.sense_idx {
                    let senses_len = entry_senses(&generated_entries[task.entry_idx])
                        .map(<[VocabSense]>::len)
                        .unwrap_or(0);
                    if sense_idx < senses_len {
                        let example = ctx_sources[&(task.entry_idx, task.ctx_idx)].clone();
                        entry_states.get_mut(&task.entry_idx).unwrap()[sense_idx].push(example);
                    }
                }
            }
            None => uncached.push(task),
        }
    }
    tracing::info!(cache_hits, uncached = uncached.len(), "WSD cache probe");

    if uncached.is_empty() {
        if let Some(cb) = progress {
            cb(total_tasks, total_tasks, "done");
        }
        return Ok(apply_states(generated_entries, entry_states));
    }

    // parse every sentence up front so the tagger is done before the
    // scorer is constructed (the two never hold memory simultaneously)
    {
        let unique: Vec<&str> = {
            let mut seen = std::collections::HashSet::new();
            uncached
                .iter()
                .map(|t| t.sentence.as_str())
                .filter(|s| seen.insert(*s))
                .collect()
        };
        tracing::info!(sentences = unique.len(), "parsing WSD sentences");
        docs.parse_sentences(&unique);
    }

    for task in &mut uncached {
        let senses = entry_senses(&generated_entries[task.entry_idx]).unwrap();
        let detected = detect_pos(docs, &task.sentence, &task.lemma);
        task.filtered_indices = filter_senses_by_pos(senses, detected);
    }

    // POS filter reduced to a single candidate: deterministic, no cache
    let mut multi: Vec<WsdTask> = Vec::new();
    let mut assigned = cache_hits;
    for task in uncached {
        if task.filtered_indices.len() == 1 {
            let sense_idx = task.filtered_indices[0];
            let example = ctx_sources[&(task.entry_idx, task.ctx_idx)].clone();
            entry_states.get_mut(&task.entry_idx).unwrap()[sense_idx].push(example);
            assigned += 1;
        } else {
            multi.push(task);
        }
    }
    tracing::info!(resolved = assigned, scoring = multi.len(), "after POS filtering");

    if multi.is_empty() {
        if let Some(cb) = progress {
            cb(total_tasks, total_tasks, "done");
        }
        return Ok(apply_states(generated_entries, entry_states));
    }

    let mut pending: Vec<PendingWsd> = Vec::new();
    let mut cache_to_write: CacheBatch = HashMap::new();
    let mut processed = assigned;
    let mut ignored = 0usize;

    let Some(factory) = scorer_factory else {
        // no neural backend configured: every ambiguous context goes to
        // the LLM tier
        tracing::info!(contexts = multi.len(), "no scorer configured, routing all to LLM");
        pending = multi
            .into_iter()
            .map(|task| PendingWsd {
                entry_idx: task.entry_idx,
                ctx_idx: task.ctx_idx,
                cache_key: task.cache_key,
                lemma: task.lemma,
                sentence: task.sentence,
                filtered_indices: task.filtered_indices,
            })
            .collect();
        resolve_pending_with_llm(
            &pending,
            &generated_entries,
            llm,
            registry,
            &mut entry_states,
            &ctx_sources,
            &mut cache_to_write,
        )
        .await?;
        if !cache_to_write.is_empty() {
            registry.set_wsd_cache_batch(&cache_to_write)?;
        }
        if let Some(cb) = progress {
            cb(total_tasks, total_tasks, "done");
        }
        return Ok(apply_states(generated_entries, entry_states));
    };

    let scorer = factory()?;
    let total_chunks = multi.len().div_ceil(WSD_CHUNK_SIZE);

    for (chunk_idx, chunk) in multi.chunks(WSD_CHUNK_SIZE).enumerate() {
        // pairs for the whole chunk, scored in model-sized batches
        let mut pairs: Vec<ScorePair> = Vec::new();
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for task in chunk {
            let senses = entry_senses(&generated_entries[task.entry_idx]).unwrap();
            let start = pairs.len();
            for &orig in &task.filtered_indices {
                pairs.push(ScorePair {
                    marked_sentence: task.marked_sentence.clone(),
                    definition: scoring_definition(&senses[orig]),
                });
            }
            ranges.push((start, pairs.len()));
        }

        let mut scores: Vec<f32> = Vec::with_capacity(pairs.len());
        for batch in pairs.chunks(WSD_MODEL_BATCH_SIZE) {
            scores.extend(scorer.score_pairs(batch)?);
        }

        for (task, &(start, end)) in chunk.iter().zip(&ranges) {
            let task_scores = &scores[start..end];
            let (best_local, best_score) = task_scores
                .iter()
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .unwrap();
            let best_orig = task.filtered_indices[best_local];

            let mut sorted = task_scores.to_vec();
            sorted.sort_by(|a, b| b.total_cmp(a));
            let score_diff = if sorted.len() > 1 {
                sorted[0] - sorted[1]
            } else {
                0.0
            };

            match decide_action(best_score, score_diff) {
                WsdAction::Assign => {
                    let example = ctx_sources[&(task.entry_idx, task.ctx_idx)].clone();
                    entry_states.get_mut(&task.entry_idx).unwrap()[best_orig].push(example);
                    cache_to_write.insert(
                        task.cache_key.clone(),
                        (
                            Some(best_orig),
                            WsdSource::GradedWsd,
                            WSD_MODEL_VERSION.to_string(),
                        ),
                    );
                    processed += 1;
                }
                WsdAction::Ignore => {
                    cache_to_write.insert(
                        task.cache_key.clone(),
                        (None, WsdSource::GradedWsd, WSD_MODEL_VERSION.to_string()),
                    );
                    ignored += 1;
                    processed += 1;
                }
                WsdAction::Llm => {
                    pending.push(PendingWsd {
                        entry_idx: task.entry_idx,
                        ctx_idx: task.ctx_idx,
                        cache_key: task.cache_key.clone(),
                        lemma: task.lemma.clone(),
                        sentence: task.sentence.clone(),
                        filtered_indices: task.filtered_indices.clone(),
                    });
                }
            }
        }

        // flush per chunk so a crash loses at most this chunk
        if !cache_to_write.is_empty() {
            registry.set_wsd_cache_batch(&cache_to_write)?;
            cache_to_write.clear();
        }
        if let Some(cb) = progress {
            cb(
                processed,
                total_tasks,
                &format!("chunk {}/{}", chunk_idx + 1, total_chunks),
            );
        }
    }

    if !pending.is_empty() {
        tracing::info!(
            assigned = processed - ignored,
            ignored,
            llm_pending = pending.len(),
            "resolving ambiguous contexts with LLM"
        );
        resolve_pending_with_llm(
            &pending,
            &generated_entries,
            llm,
            registry,
            &mut entry_states,
            &ctx_sources,
            &mut cache_to_write,
        )
        .await?;
    }

    if !cache_to_write.is_empty() {
        registry.set_wsd_cache_batch(&cache_to_write)?;
    }

    if let Some(cb) = progress {
        cb(total_tasks, total_tasks, "done");
    }
    Ok(apply_states(generated_entries, entry_states))
}

#[allow(clippy::too_many_arguments)]
async fn resolve_pending_with_llm(
    pending: &[PendingWsd],
    entries: &[VocabEntry],
    llm: &dyn LanguageModel,
    registry: &Registry,
    entry_states: &mut HashMap<usize, Vec<Vec<ExamExample>>>,
    ctx_sources: &HashMap<(usize, usize), ExamExample>,
    cache_to_write: &mut CacheBatch,
) -> Result<()> {
    let mut resolved = 0usize;
    let mut idioms = 0usize;
    let total_batches = pending.len().div_ceil(WSD_LLM_BATCH_SIZE);

    for (batch_num, batch) in pending.chunks(WSD_LLM_BATCH_SIZE).enumerate() {
        if batch_num % 10 == 0 {
            tracing::info!(batch = batch_num + 1, total = total_batches, "WSD LLM batch");
        }

        let items: Vec<(&PendingWsd, &[VocabSense])> = batch
            .iter()
            .map(|p| (p, entry_senses(&entries[p.entry_idx]).unwrap()))
            .collect();
        let prompt = build_wsd_batch_prompt(&items);

        let response =
            match complete::<WsdFallbackResponse>(llm, &prompt, WSD_SYSTEM, ModelTier::Fast, 0.0)
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(batch = batch_num + 1, error = %e, "WSD LLM batch failed");
                    continue;
                }
            };

        for decision in response.items {
            let Some(item) = batch.get(decision.item_id) else {
                continue;
            };
            if decision.sense_index == 0 {
                cache_to_write.insert(
                    item.cache_key.clone(),
                    (None, WsdSource::Llm, WSD_LLM_VERSION.to_string()),
                );
                idioms += 1;
            } else if decision.sense_index <= item.filtered_indices.len() {
                let orig = item.filtered_indices[decision.sense_index - 1];
                let example = ctx_sources[&(item.entry_idx, item.ctx_idx)].clone();
                entry_states.get_mut(&item.entry_idx).unwrap()[orig].push(example);
                cache_to_write.insert(
                    item.cache_key.clone(),
                    (Some(orig), WsdSource::Llm, WSD_LLM_VERSION.to_string()),
                );
                resolved += 1;
            } else {
                tracing::warn!(
                    lemma = %item.lemma,
                    sense_index = decision.sense_index,
                    max = item.filtered_indices.len(),
                    "LLM returned invalid sense index"
                );
            }
        }

        if batch_num % LLM_CACHE_FLUSH_EVERY == LLM_CACHE_FLUSH_EVERY - 1
            && !cache_to_write.is_empty()
        {
            registry.set_wsd_cache_batch(cache_to_write)?;
            cache_to_write.clear();
        }
    }

    tracing::info!(resolved, idioms, "WSD LLM fallback finished");
    Ok(())
}

fn apply_states(
    mut entries: Vec<VocabEntry>,
    entry_states: HashMap<usize, Vec<Vec<ExamExample>>>,
) -> Vec<VocabEntry> {
    for (entry_idx, examples_by_sense) in entry_states {
        let senses = match &mut entries[entry_idx] {
            VocabEntry::Word(w) => &mut w.senses,
            VocabEntry::Phrase(p) => &mut p.senses,
            VocabEntry::Pattern(_) => continue,
        };
        for (sense_idx, examples) in examples_by_sense.into_iter().enumerate() {
            if let Some(sense) = senses.get_mut(sense_idx) {
                sense.examples.extend(examples);
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gsatvocab_llm::{CompletionRequest, LlmError};
    use gsatvocab_model::{
        AnnotationRole, ExamType, FrequencyData, SectionType, SenseAssignedWordEntry, SourceInfo,
        WordEntry,
    };
    use gsatvocab_nlp::RuleTagger;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

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

    fn source() -> SourceInfo {
        SourceInfo {
            year: 113,
            exam_type: ExamType::Gsat,
            section_type: SectionType::Reading,
            question_number: Some(41),
            role: Some(AnnotationRole::TestedKeyword),
            sentence_role: None,
        }
    }

    fn vocab_sense(sense_id: &str, pos: Option<&str>, en_def: &str, example: &str) -> VocabSense {
        VocabSense {
            sense_id: sense_id.to_string(),
            pos: pos.map(str::to_string),
            zh_def: "中文".to_string(),
            en_def: en_def.to_string(),
            examples: vec![],
            generated_example: example.to_string(),
        }
    }

    fn word_entry(lemma: &str, senses: Vec<VocabSense>) -> VocabEntry {
        VocabEntry::Word(WordEntry {
            lemma: lemma.to_string(),
            pos: vec!["VERB".to_string(), "NOUN".to_string()],
            level: Some(4),
            in_official_list: true,
            senses,
            frequency: frequency(),
            confusion_notes: vec![],
            root_info: None,
            synonyms: None,
            antonyms: None,
        })
    }

    fn assigned_word(lemma: &str, contexts: &[&str]) -> SenseAssignedWordEntry {
        SenseAssignedWordEntry {
            lemma: lemma.to_string(),
            pos: vec!["VERB".to_string()],
            level: Some(4),
            in_official_list: true,
            frequency: frequency(),
            senses: vec![],
            contexts: contexts
                .iter()
                .map(|c| ContextSentence {
                    text: c.to_string(),
                    source: source(),
                    pos: "VERB".to_string(),
                    surface: lemma.to_string(),
                })
                .collect(),
        }
    }

    struct ScriptedScorer {
        scores: Mutex<Vec<f32>>,
        calls: AtomicUsize,
    }

    impl SenseScorer for ScriptedScorer {
        fn score_pairs(&self, pairs: &[ScorePair]) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut scores = self.scores.lock().unwrap();
            Ok(scores.drain(..pairs.len()).collect())
        }
    }

    struct ScriptedLlm {
        response: Value,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for ScriptedLlm {
        async fn complete_value(&self, _request: CompletionRequest) -> Result<Value, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
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

    fn docs() -> DocCache {
        DocCache::new(Arc::new(RuleTagger::new()))
    }

    fn strike_entry() -> VocabEntry {
        word_entry(
            "strike",
            vec![
                vocab_sense("strike.v.reg1", Some("VERB"), "to hit someone or something", "He struck the ball."),
                vocab_sense(
                    "strike.v.reg2",
                    Some("VERB"),
                    "to happen suddenly and unexpectedly",
                    "Disaster struck without warning.",
                ),
                vocab_sense("strike.n.reg1", Some("NOUN"), "a period when workers refuse to work", "The strike lasted a week."),
            ],
        )
    }

    #[tokio::test]
    async fn confident_neural_score_assigns_and_caches() {
        let (_dir, registry) = temp_registry();
        let sentence = "It can strike suddenly, progressing from a feeling of uneasiness.";
        let data = SenseAssignedData {
            words: vec![assigned_word("strike", &[sentence])],
            ..Default::default()
        };

        // POS filter keeps the two VERB senses; gap 0.24 favors sense 2
        let scorer = Arc::new(ScriptedScorer {
            scores: Mutex::new(vec![2.76, 3.0]),
            calls: AtomicUsize::new(0),
        });
        let llm = ScriptedLlm {
            response: json!({}),
            calls: AtomicUsize::new(0),
        };

        let scorer_for_factory = Arc::clone(&scorer);
        let factory = move || -> Result<Box<dyn SenseScorer>> {
            Ok(Box::new(FactoryScorer(Arc::clone(&scorer_for_factory))))
        };

        let entries = perform_wsd(
            &data,
            vec![strike_entry()],
            &registry,
            &llm,
            &docs(),
            Some(&factory),
            None,
        )
        .await
        .unwrap();

        let VocabEntry::Word(word) = &entries[0] else {
            panic!("expected word")
        };
        assert!(word.senses[0].examples.is_empty());
        assert_eq!(word.senses[1].examples.len(), 1);
        assert_eq!(word.senses[1].examples[0].text, sentence);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);

        // decision durably cached with the neural source and version
        let sense_ids: Vec<String> = word.senses.iter().map(|s| s.sense_id.clone()).collect();
        let key = wsd_cache_key("strike", sentence, &sense_ids);
        let cached = registry.get_wsd_cache_batch(&[key.clone()]).unwrap();
        assert_eq!(cached[&key].sense_idx, Some(1));
        assert_eq!(cached[&key].source, WsdSource::GradedWsd);
        assert_eq!(cached[&key].model_version, WSD_MODEL_VERSION);
    }

    /// Wrapper so a shared scripted scorer can be handed out by the factory.
    struct FactoryScorer(Arc<ScriptedScorer>);

    impl SenseScorer for FactoryScorer {
        fn score_pairs(&self, pairs: &[ScorePair]) -> Result<Vec<f32>> {
            self.0.score_pairs(pairs)
        }
    }

    #[tokio::test]
    async fn ambiguous_low_scores_route_to_llm_idiom() {
        let (_dir, registry) = temp_registry();
        let sentence = "He woke up early in order to catch the first bus of the day.";
        let data = SenseAssignedData {
            words: vec![assigned_word("order", &[sentence])],
            ..Default::default()
        };
        let entry = word_entry(
            "order",
            vec![
                vocab_sense("order.n.reg1", Some("NOUN"), "a request for goods", "She placed an order online."),
                vocab_sense("order.n.reg2", Some("NOUN"), "the way things are arranged", "The names are in alphabetical order."),
            ],
        );

        // low score, gap in the LLM band (>= 0.05, < 0.15)
        let scorer = Arc::new(ScriptedScorer {
            scores: Mutex::new(vec![2.0, 2.06]),
            calls: AtomicUsize::new(0),
        });
        let llm = ScriptedLlm {
            response: json!({"items": [{"item_id": 0, "sense_index": 0}]}),
            calls: AtomicUsize::new(0),
        };

        let scorer_for_factory = Arc::clone(&scorer);
        let factory = move || -> Result<Box<dyn SenseScorer>> {
            Ok(Box::new(FactoryScorer(Arc::clone(&scorer_for_factory))))
        };

        let entries = perform_wsd(&data, vec![entry], &registry, &llm, &docs(), Some(&factory), None)
            .await
            .unwrap();

        let VocabEntry::Word(word) = &entries[0] else {
            panic!("expected word")
        };
        // idiom: no sense got the context
        assert!(word.senses.iter().all(|s| s.examples.is_empty()));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

        let sense_ids: Vec<String> = word.senses.iter().map(|s| s.sense_id.clone()).collect();
        let key = wsd_cache_key("order", sentence, &sense_ids);
        let cached = registry.get_wsd_cache_batch(&[key.clone()]).unwrap();
        assert_eq!(cached[&key].sense_idx, None);
        assert_eq!(cached[&key].source, WsdSource::Llm);
        assert_eq!(cached[&key].model_version, WSD_LLM_VERSION);
    }

    #[tokio::test]
    async fn cached_decisions_bypass_scoring() {
        let (_dir, registry) = temp_registry();
        let sentence = "It can strike suddenly, progressing from a feeling of uneasiness.";
        let entry = strike_entry();
        let VocabEntry::Word(word) = &entry else {
            panic!()
        };
        let sense_ids: Vec<String> = word.senses.iter().map(|s| s.sense_id.clone()).collect();
        let key = wsd_cache_key("strike", sentence, &sense_ids);
        let mut batch = HashMap::new();
        batch.insert(
            key,
            (Some(1), WsdSource::GradedWsd, WSD_MODEL_VERSION.to_string()),
        );
        registry.set_wsd_cache_batch(&batch).unwrap();

        let data = SenseAssignedData {
            words: vec![assigned_word("strike", &[sentence])],
            ..Default::default()
        };
        let llm = ScriptedLlm {
            response: json!({}),
            calls: AtomicUsize::new(0),
        };
        let factory = || -> Result<Box<dyn SenseScorer>> { panic!("scorer must not be built") };

        let entries = perform_wsd(&data, vec![entry], &registry, &llm, &docs(), Some(&factory), None)
            .await
            .unwrap();

        let VocabEntry::Word(word) = &entries[0] else {
            panic!()
        };
        assert_eq!(word.senses[1].examples.len(), 1);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn single_sense_entries_assign_directly() {
        let (_dir, registry) = temp_registry();
        let sentence = "Mary revised the first draft of her long essay again.";
        let data = SenseAssignedData {
            words: vec![assigned_word("draft", &[sentence])],
            ..Default::default()
        };
        let entry = word_entry(
            "draft",
            vec![vocab_sense("draft.n.reg1", Some("NOUN"), "a first version", "A rough draft.")],
        );
        let llm = ScriptedLlm {
            response: json!({}),
            calls: AtomicUsize::new(0),
        };
        let factory = || -> Result<Box<dyn SenseScorer>> { panic!("scorer must not be built") };

        let entries = perform_wsd(&data, vec![entry], &registry, &llm, &docs(), Some(&factory), None)
            .await
            .unwrap();

        let VocabEntry::Word(word) = &entries[0] else {
            panic!()
        };
        assert_eq!(word.senses[0].examples.len(), 1);
        // fast path decisions are not cached
        let keys = registry
            .get_wsd_cache_batch(&[wsd_cache_key(
                "draft",
                sentence,
                &["draft.n.reg1".to_string()],
            )])
            .unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn pos_filter_single_candidate_is_not_cached() {
        let (_dir, registry) = temp_registry();
        // "draft" is nominal here, so the NOUN sense wins deterministically
        let sentence = "Not satisfied with the first draft of her essay, Mary revised it.";
        let data = SenseAssignedData {
            words: vec![assigned_word("draft", &[sentence])],
            ..Default::default()
        };
        let entry = word_entry(
            "draft",
            vec![
                vocab_sense("draft.n.reg1", Some("NOUN"), "a first version of writing", "A rough draft."),
                vocab_sense("draft.v.reg1", Some("VERB"), "to write a first version", "She drafted a letter."),
            ],
        );
        let llm = ScriptedLlm {
            response: json!({}),
            calls: AtomicUsize::new(0),
        };
        let factory = || -> Result<Box<dyn SenseScorer>> { panic!("scorer must not be built") };

        let entries = perform_wsd(&data, vec![entry], &registry, &llm, &docs(), Some(&factory), None)
            .await
            .unwrap();

        let VocabEntry::Word(word) = &entries[0] else {
            panic!()
        };
        assert_eq!(word.senses[0].examples.len(), 1);
        assert!(word.senses[1].examples.is_empty());

        let sense_ids = vec!["draft.n.reg1".to_string(), "draft.v.reg1".to_string()];
        let keys = registry
            .get_wsd_cache_batch(&[wsd_cache_key("draft", sentence, &sense_ids)])
            .unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn unlocatable_targets_are_dropped() {
        let (_dir, registry) = temp_registry();
        let data = SenseAssignedData {
            words: vec![assigned_word(
                "strike",
                &["A sentence without the target word at all."],
            )],
            ..Default::default()
        };
        let llm = ScriptedLlm {
            response: json!({}),
            calls: AtomicUsize::new(0),
        };
        let factory = || -> Result<Box<dyn SenseScorer>> { panic!("scorer must not be built") };

        let entries = perform_wsd(
            &data,
            vec![strike_entry()],
            &registry,
            &llm,
            &docs(),
            Some(&factory),
            None,
        )
        .await
        .unwrap();

        let VocabEntry::Word(word) = &entries[0] else {
            panic!()
        };
        assert!(word.senses.iter().all(|s| s.examples.is_empty()));
    }

    #[test]
    fn action_thresholds() {
        assert_eq!(decide_action(3.0, 0.24), WsdAction::Assign);
        assert_eq!(decide_action(2.0, 0.01), WsdAction::Ignore);
        assert_eq!(decide_action(2.0, 0.06), WsdAction::Llm);
        assert_eq!(decide_action(3.5, 0.05), WsdAction::Llm);
    }
}
