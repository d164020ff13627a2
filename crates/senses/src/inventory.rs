//! The inventory pipeline: registry-first, then dictionary + clustering,
//! then direct LLM fallback, wired as three concurrent queues so slow
//! dictionary fetches never stall clustering of already-fetched lemmas.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use futures::StreamExt;
use tokio::sync::mpsc;

use gsatvocab_extract::FrequencyCounter;
use gsatvocab_llm::{LanguageModel, ModelTier, complete};
use gsatvocab_model::{
    AssignedSense, CleanedPatternEntry, CleanedPhraseEntry, CleanedVocabData, CleanedWordEntry,
    ContextSentence, PatternSubtype, PatternSubtypeData, SenseAssignedData,
    SenseAssignedPatternEntry, SenseAssignedPhraseEntry, SenseAssignedWordEntry, SenseSource,
};
use gsatvocab_nlp::conservative_adverb_base;
use gsatvocab_registry::Registry;

use crate::cluster::{
    ClusterInput, ClusteredSense, LlmPhraseSenseClusterResponse, LlmSenseClusterResponse,
    SenseFilterBatchResponse, build_filter_batch_prompt, clusters_to_result,
};
use crate::dictionary::{DictionaryApi, DictionarySense};
use crate::patterns::{category_display_name, subtype_display_name, subtype_structure};
use crate::prompts::{CLUSTER_SYSTEM, define_phrase_prompt, define_word_prompt, escape};

pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize, &str) + Sync);

const MAX_CONTEXTS: usize = 6;
const BATCH_FILTER_SIZE: usize = 10;

#[derive(Debug, Clone)]
enum PendingEntry {
    Word(CleanedWordEntry),
    Phrase(CleanedPhraseEntry),
}

impl PendingEntry {
    fn lemma(&self) -> &str {
        match self {
            PendingEntry::Word(w) => &w.lemma,
            PendingEntry::Phrase(p) => &p.lemma,
        }
    }

    fn contexts(&self) -> &[ContextSentence] {
        match self {
            PendingEntry::Word(w) => &w.contexts,
            PendingEntry::Phrase(p) => &p.contexts,
        }
    }

    fn is_phrase(&self) -> bool {
        matches!(self, PendingEntry::Phrase(_))
    }
}

enum AssignedResult {
    Word(SenseAssignedWordEntry),
    Phrase(SenseAssignedPhraseEntry),
}

struct DictionaryCandidate {
    entry: PendingEntry,
    senses: Vec<DictionarySense>,
    contexts: Vec<String>,
    source_lemma: String,
}

fn select_contexts(contexts: &[ContextSentence]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for ctx in contexts {
        let text = ctx.text.trim();
        if !text.is_empty() && seen.insert(text.to_string()) {
            selected.push(text.to_string());
        }
        if selected.len() >= MAX_CONTEXTS {
            break;
        }
    }
    selected
}

fn derive_entry_pos(senses: &[AssignedSense], fallback: &[String]) -> Vec<String> {
    let set: HashSet<&str> = senses.iter().filter_map(|s| s.pos.as_deref()).collect();
    if set.is_empty() {
        return fallback.to_vec();
    }
    let mut pos: Vec<String> = set.into_iter().map(str::to_string).collect();
    pos.sort();
    pos
}

fn build_word_result(entry: &CleanedWordEntry, senses: Vec<AssignedSense>) -> AssignedResult {
    let pos = derive_entry_pos(&senses, &entry.pos);
    AssignedResult::Word(SenseAssignedWordEntry {
        lemma: entry.lemma.clone(),
        pos,
        level: entry.level,
        in_official_list: entry.in_official_list,
        frequency: entry.frequency.clone(),
        senses,
        contexts: entry.contexts.clone(),
    })
}

fn build_phrase_result(entry: &CleanedPhraseEntry, senses: Vec<AssignedSense>) -> AssignedResult {
    AssignedResult::Phrase(SenseAssignedPhraseEntry {
        lemma: entry.lemma.clone(),
        frequency: entry.frequency.clone(),
        senses,
        contexts: entry.contexts.clone(),
    })
}

fn build_result(entry: &PendingEntry, senses: Vec<AssignedSense>) -> AssignedResult {
    match entry {
        PendingEntry::Word(w) => build_word_result(w, senses),
        PendingEntry::Phrase(p) => build_phrase_result(p, senses),
    }
}

/// Load senses the registry already holds for this lemma, preserving the
/// stored ordering.
fn load_cached_senses(registry: &Registry, lemma: &str) -> Result<Vec<AssignedSense>> {
    let cached = registry.get_senses_for_lemma(lemma)?;
    Ok(cached
        .into_iter()
        .map(|sense| AssignedSense {
            sense_id: sense.sense_id,
            source: sense.source,
            pos: sense.pos,
            definition: sense.definition,
            examples: vec![],
            merged_definitions: vec![],
            core_meaning: None,
        })
        .collect())
}

fn register_clustered_senses(
    entry: &PendingEntry,
    clustered: &[ClusteredSense],
    registry: &Registry,
) -> Result<Vec<AssignedSense>> {
    let mut results = Vec::with_capacity(clustered.len());
    for (order, cluster) in clustered.iter().enumerate() {
        let pos = if entry.is_phrase() {
            None
        } else {
            cluster.primary.pos.as_deref()
        };
        let sense_id = registry.add_sense(
            entry.lemma(),
            pos,
            &cluster.core_meaning,
            SenseSource::Dictionaryapi,
            Some(order as u32),
        )?;

        let examples: Vec<String> = cluster
            .merged
            .iter()
            .filter_map(|s| s.example.clone())
            .collect();
        let merged_definitions: Vec<String> =
            cluster.merged.iter().map(|s| s.definition.clone()).collect();

        results.push(AssignedSense {
            sense_id,
            source: SenseSource::Dictionaryapi,
            pos: pos.map(str::to_string),
            definition: cluster.core_meaning.clone(),
            examples,
            merged_definitions,
            core_meaning: Some(cluster.core_meaning.clone()),
        });
    }
    Ok(results)
}

/// Clustering failed but the dictionary did answer: register the raw
/// senses individually so the entry still gets an inventory.
fn register_raw_dictionary_senses(
    entry: &PendingEntry,
    senses: &[DictionarySense],
    registry: &Registry,
) -> Result<Vec<AssignedSense>> {
    let mut results = Vec::with_capacity(senses.len());
    for (order, sense) in senses.iter().enumerate() {
        let pos = if entry.is_phrase() {
            None
        } else {
            sense.pos.as_deref()
        };
        let sense_id = registry.add_sense(
            entry.lemma(),
            pos,
            &sense.definition,
            SenseSource::Dictionaryapi,
            Some(order as u32),
        )?;
        results.push(AssignedSense {
            sense_id,
            source: SenseSource::Dictionaryapi,
            pos: pos.map(str::to_string),
            definition: sense.definition.clone(),
            examples: sense.example.clone().into_iter().collect(),
            merged_definitions: vec![],
            core_meaning: None,
        });
    }
    Ok(results)
}

async fn prepare_candidate(
    entry: PendingEntry,
    dictionary: &dyn DictionaryApi,
) -> DictionaryCandidate {
    let lemma = entry.lemma().to_string();
    let mut senses = match dictionary.fetch_senses(&lemma).await {
        Ok(senses) => senses,
        Err(e) => {
            tracing::warn!(lemma = %lemma, error = %e, "dictionary fetch failed");
            Vec::new()
        }
    };
    let mut source_lemma = lemma.clone();

    // adverb → adjective base retry when the API is silent
    if senses.is_empty() {
        if let Some(base) = conservative_adverb_base(&lemma) {
            if base != lemma {
                if let Ok(base_senses) = dictionary.fetch_senses(&base).await {
                    if !base_senses.is_empty() {
                        tracing::info!(lemma = %lemma, base = %base, "dictionary fallback to adverb base");
                        senses = base_senses;
                        source_lemma = base;
                    }
                }
            }
        }
    }

    // keep only senses matching the POS observed in exams, when any match
    if let PendingEntry::Word(word) = &entry {
        if !word.pos.is_empty() && !senses.is_empty() {
            let allowed: HashSet<&str> = word.pos.iter().map(String::as_str).collect();
            let filtered: Vec<DictionarySense> = senses
                .iter()
                .filter(|s| s.pos.as_deref().is_none_or(|p| allowed.contains(p)))
                .cloned()
                .collect();
            if filtered.is_empty() {
                tracing::info!(lemma = %lemma, "no dictionary senses matched observed POS; keeping all");
            } else {
                senses = filtered;
            }
        }
    }

    let contexts = select_contexts(entry.contexts());
    DictionaryCandidate {
        entry,
        senses,
        contexts,
        source_lemma,
    }
}

async fn define_with_llm(
    entry: &PendingEntry,
    llm: &dyn LanguageModel,
    registry: &Registry,
) -> Result<Vec<AssignedSense>> {
    let contexts_xml: String = entry
        .contexts()
        .iter()
        .take(MAX_CONTEXTS)
        .filter(|c| !c.text.is_empty())
        .map(|c| format!("<context>{}</context>", escape(&c.text)))
        .collect::<Vec<_>>()
        .join("\n");

    let mut senses = Vec::new();
    match entry {
        PendingEntry::Word(word) => {
            let pos_hints = if word.pos.is_empty() {
                "unknown".to_string()
            } else {
                word.pos.join(", ")
            };
            let prompt = define_word_prompt(&escape(&word.lemma), &pos_hints, &contexts_xml);
            let response: LlmSenseClusterResponse =
                complete(llm, &prompt, CLUSTER_SYSTEM, ModelTier::Balanced, 0.2).await?;
            for (order, cluster) in response.clusters.iter().enumerate() {
                let sense_id = registry.add_sense(
                    &word.lemma,
                    cluster.pos.as_deref(),
                    &cluster.core_meaning,
                    SenseSource::LlmGenerated,
                    Some(order as u32),
                )?;
                senses.push(AssignedSense {
                    sense_id,
                    source: SenseSource::LlmGenerated,
                    pos: cluster.pos.clone(),
                    definition: cluster.core_meaning.clone(),
                    examples: cluster.examples.clone().unwrap_or_default(),
                    merged_definitions: vec![],
                    core_meaning: Some(cluster.core_meaning.clone()),
                });
            }
        }
        PendingEntry::Phrase(phrase) => {
            let prompt = define_phrase_prompt(&escape(&phrase.lemma), &contexts_xml);
            let response: LlmPhraseSenseClusterResponse =
                complete(llm, &prompt, CLUSTER_SYSTEM, ModelTier::Balanced, 0.2).await?;
            for (order, cluster) in response.clusters.iter().enumerate() {
                let sense_id = registry.add_sense(
                    &phrase.lemma,
                    None,
                    &cluster.core_meaning,
                    SenseSource::LlmGenerated,
                    Some(order as u32),
                )?;
                senses.push(AssignedSense {
                    sense_id,
                    source: SenseSource::LlmGenerated,
                    pos: None,
                    definition: cluster.core_meaning.clone(),
                    examples: cluster.examples.clone().unwrap_or_default(),
                    merged_definitions: vec![],
                    core_meaning: Some(cluster.core_meaning.clone()),
                });
            }
        }
    }
    Ok(senses)
}

#[allow(clippy::too_many_arguments)]
async fn process_cluster_batch(
    batch: Vec<DictionaryCandidate>,
    llm: &dyn LanguageModel,
    registry: &Registry,
    fallback_tx: &mpsc::Sender<PendingEntry>,
    results: &Mutex<Vec<AssignedResult>>,
    report: &(dyn Fn() + Sync),
) {
    let inputs: Vec<ClusterInput<'_>> = batch
        .iter()
        .map(|c| ClusterInput {
            lemma: c.entry.lemma(),
            dict_lemma: &c.source_lemma,
            senses: &c.senses,
            contexts: &c.contexts,
        })
        .collect();
    let prompt = build_filter_batch_prompt(&inputs);

    let cluster_map: BTreeMap<String, Vec<crate::cluster::SenseCluster>> =
        match complete::<SenseFilterBatchResponse>(
            llm,
            &prompt,
            CLUSTER_SYSTEM,
            ModelTier::Balanced,
            0.0,
        )
        .await
        {
            Ok(response) => response
                .items
                .into_iter()
                .map(|item| (item.lemma.to_lowercase(), item.clusters))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "batch sense clustering failed");
                BTreeMap::new()
            }
        };

    for candidate in batch {
        let key = candidate.entry.lemma().to_lowercase();
        let clustered = cluster_map
            .get(&key)
            .map(|clusters| clusters_to_result(clusters, &candidate.senses))
            .unwrap_or_default();

        if clustered.is_empty() {
            // clustering failed; keep the raw dictionary senses instead of
            // paying for a second LLM pass
            tracing::info!(lemma = %candidate.entry.lemma(), "clustering empty, registering raw dictionary senses");
            match register_raw_dictionary_senses(&candidate.entry, &candidate.senses, registry) {
                Ok(senses) => {
                    results
                        .lock()
                        .unwrap()
                        .push(build_result(&candidate.entry, senses));
                    report();
                }
                Err(e) => {
                    tracing::warn!(lemma = %candidate.entry.lemma(), error = %e, "raw sense registration failed");
                    let _ = fallback_tx.send(candidate.entry).await;
                }
            }
            continue;
        }

        match register_clustered_senses(&candidate.entry, &clustered, registry) {
            Ok(senses) => {
                results
                    .lock()
                    .unwrap()
                    .push(build_result(&candidate.entry, senses));
                report();
            }
            Err(e) => {
                tracing::warn!(lemma = %candidate.entry.lemma(), error = %e, "registering clustered senses failed");
            }
        }
    }
}

async fn process_uncached_entries(
    pending: Vec<PendingEntry>,
    registry: &Registry,
    llm: &dyn LanguageModel,
    dictionary: &dyn DictionaryApi,
    concurrency: usize,
    report: &(dyn Fn() + Sync),
) -> Vec<AssignedResult> {
    if pending.is_empty() {
        return Vec::new();
    }

    let results: Mutex<Vec<AssignedResult>> = Mutex::new(Vec::new());
    let (candidate_tx, mut candidate_rx) = mpsc::channel::<DictionaryCandidate>(BATCH_FILTER_SIZE * 2);
    let (fallback_tx, mut fallback_rx) = mpsc::channel::<PendingEntry>(BATCH_FILTER_SIZE * 2);

    let producer = async {
        let mut fetches = futures::stream::iter(
            pending
                .into_iter()
                .map(|entry| prepare_candidate(entry, dictionary)),
        )
        .buffer_unordered(concurrency.max(1));
        while let Some(candidate) = fetches.next().await {
            if candidate_tx.send(candidate).await.is_err() {
                break;
            }
        }
        drop(candidate_tx);
    };

    let cluster_consumer = async {
        let mut batch: Vec<DictionaryCandidate> = Vec::new();
        while let Some(candidate) = candidate_rx.recv().await {
            if candidate.senses.is_empty() {
                let _ = fallback_tx.send(candidate.entry).await;
                continue;
            }
            batch.push(candidate);
            if batch.len() >= BATCH_FILTER_SIZE {
                let drained = std::mem::take(&mut batch);
                process_cluster_batch(drained, llm, registry, &fallback_tx, &results, report)
                    .await;
            }
        }
        if !batch.is_empty() {
            process_cluster_batch(batch, llm, registry, &fallback_tx, &results, report).await;
        }
        drop(fallback_tx);
    };

    let fallback_consumer = async {
        while let Some(entry) = fallback_rx.recv().await {
            match define_with_llm(&entry, llm, registry).await {
                Ok(senses) => {
                    results.lock().unwrap().push(build_result(&entry, senses));
                    report();
                }
                Err(e) => {
                    tracing::warn!(lemma = %entry.lemma(), error = %e, "LLM sense definition failed, skipping entry");
                }
            }
        }
    };

    tokio::join!(producer, cluster_consumer, fallback_consumer);
    results.into_inner().unwrap()
}

fn aggregate_patterns(entries: &[CleanedPatternEntry]) -> Vec<SenseAssignedPatternEntry> {
    let mut results = Vec::new();
    for entry in entries {
        let mut by_subtype: BTreeMap<PatternSubtype, Vec<_>> = BTreeMap::new();
        for occ in &entry.occurrences {
            if let Some(subtype) = occ.pattern_subtype {
                by_subtype.entry(subtype).or_default().push(occ.clone());
            }
        }
        if by_subtype.is_empty() {
            continue;
        }

        let mut counter = FrequencyCounter::default();
        let mut subtypes = Vec::new();
        for (subtype, occurrences) in by_subtype {
            for occ in &occurrences {
                counter.add(
                    occ.source.year,
                    occ.source.role,
                    occ.source.section_type,
                    occ.source.exam_type,
                );
            }
            subtypes.push(PatternSubtypeData {
                subtype,
                display_name: subtype_display_name(subtype).to_string(),
                structure: subtype_structure(subtype).to_string(),
                occurrences,
            });
        }

        results.push(SenseAssignedPatternEntry {
            lemma: category_display_name(entry.pattern_category).to_string(),
            pattern_category: entry.pattern_category,
            subtypes,
            frequency: counter.to_frequency_data(),
        });
    }
    results
}

/// Populate the registry with 1-4 senses per word/phrase and return the
/// sense-assigned artifact for the generation and WSD stages.
pub async fn assign_all_senses(
    cleaned: &CleanedVocabData,
    registry: &Registry,
    llm: &dyn LanguageModel,
    dictionary: &dyn DictionaryApi,
    concurrency: usize,
    progress: Option<ProgressFn<'_>>,
) -> Result<SenseAssignedData> {
    tracing::info!(
        words = cleaned.words.len(),
        phrases = cleaned.phrases.len(),
        "building sense inventory"
    );

    let total = cleaned.words.len() + cleaned.phrases.len();
    let processed = AtomicUsize::new(0);
    let report = || {
        let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(cb) = progress {
            cb(done, total, "senses");
        }
    };

    let mut word_results: Vec<SenseAssignedWordEntry> = Vec::new();
    let mut pending: Vec<PendingEntry> = Vec::new();
    let mut cached_words = 0usize;

    for entry in &cleaned.words {
        let cached = load_cached_senses(registry, &entry.lemma)?;
        if cached.is_empty() {
            pending.push(PendingEntry::Word(entry.clone()));
        } else {
            let pos = derive_entry_pos(&cached, &entry.pos);
            word_results.push(SenseAssignedWordEntry {
                lemma: entry.lemma.clone(),
                pos,
                level: entry.level,
                in_official_list: entry.in_official_list,
                frequency: entry.frequency.clone(),
                senses: cached,
                contexts: entry.contexts.clone(),
            });
            cached_words += 1;
            report();
        }
    }

    let mut phrase_results: Vec<SenseAssignedPhraseEntry> = Vec::new();
    let mut cached_phrases = 0usize;
    for entry in &cleaned.phrases {
        let cached = load_cached_senses(registry, &entry.lemma)?;
        if cached.is_empty() {
            pending.push(PendingEntry::Phrase(entry.clone()));
        } else {
            phrase_results.push(SenseAssignedPhraseEntry {
                lemma: entry.lemma.clone(),
                frequency: entry.frequency.clone(),
                senses: cached,
                contexts: entry.contexts.clone(),
            });
            cached_phrases += 1;
            report();
        }
    }

    let uncached =
        process_uncached_entries(pending, registry, llm, dictionary, concurrency, &report).await;
    for result in uncached {
        match result {
            AssignedResult::Word(w) => word_results.push(w),
            AssignedResult::Phrase(p) => phrase_results.push(p),
        }
    }

    // deterministic artifact regardless of queue completion order
    word_results.sort_by(|a, b| a.lemma.cmp(&b.lemma));
    phrase_results.sort_by(|a, b| a.lemma.cmp(&b.lemma));

    let pattern_results = aggregate_patterns(&cleaned.patterns);

    if cached_words > 0 || cached_phrases > 0 {
        tracing::info!(
            words = cached_words,
            phrases = cached_phrases,
            "reused senses from registry"
        );
    }
    tracing::info!(
        entries = word_results.len() + phrase_results.len() + pattern_results.len(),
        "sense inventory complete"
    );

    Ok(SenseAssignedData {
        words: word_results,
        phrases: phrase_results,
        patterns: pattern_results,
    })
}
