//! Stage orchestration: extract → sense inventory → generation → WSD →
//! database build.
//!
//! Within one entry's lifetime the stages are strictly ordered (each stage
//! observes the registry writes of the previous one); across entries the
//! stages impose no ordering, which is why every aggregate is merged
//! commutatively. All collaborators arrive through [`PipelineDeps`] — there
//! are no global singletons to configure.

use std::collections::HashMap;

use anyhow::Result;

use gsatvocab_extract::clean_and_aggregate;
use gsatvocab_generate::generate_all_entries;
use gsatvocab_llm::LanguageModel;
use gsatvocab_model::{
    CleanedVocabData, Exam, OfficialWordEntry, SenseAssignedData, VocabDatabase, VocabEntry,
    YearRange,
};
use gsatvocab_nlp::DocCache;
use gsatvocab_output::{ValidationIssue, build_database};
use gsatvocab_registry::Registry;
use gsatvocab_senses::{DictionaryApi, assign_all_senses};
use gsatvocab_wsd::{SenseScorer, perform_wsd};

pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize, &str) + Sync);

/// Explicit collaborators for a pipeline run.
pub struct PipelineDeps<'a> {
    pub registry: &'a Registry,
    pub llm: &'a dyn LanguageModel,
    pub dictionary: &'a dyn DictionaryApi,
    pub docs: &'a DocCache,
    /// Neural WSD backend; `None` routes every ambiguous context to the
    /// LLM tier.
    pub scorer_factory: Option<&'a (dyn Fn() -> Result<Box<dyn SenseScorer>> + Sync)>,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Skip official-wordlist words that never appear in any exam.
    pub exam_only: bool,
    /// Dictionary fetch queue depth (the API itself is throttled to one
    /// in-flight request).
    pub concurrency: usize,
    /// Timestamp recorded in the artifact; caller-supplied so identical
    /// inputs produce byte-identical output.
    pub generated_at: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            exam_only: false,
            concurrency: 4,
            generated_at: String::new(),
        }
    }
}

pub fn exam_year_range(exams: &[Exam]) -> YearRange {
    let min = exams.iter().map(|e| e.year).min().unwrap_or(0);
    let max = exams.iter().map(|e| e.year).max().unwrap_or(0);
    YearRange { min, max }
}

/// Stage 2: exams → cleaned aggregates.
pub fn run_extract(
    exams: &[Exam],
    wordlist: &HashMap<String, OfficialWordEntry>,
    docs: &DocCache,
    exam_only: bool,
    progress: Option<ProgressFn<'_>>,
) -> CleanedVocabData {
    clean_and_aggregate(exams, wordlist, docs, exam_only, progress)
}

/// Stage 3: cleaned aggregates → sense inventory.
pub async fn run_sense_inventory(
    cleaned: &CleanedVocabData,
    deps: &PipelineDeps<'_>,
    concurrency: usize,
    progress: Option<ProgressFn<'_>>,
) -> Result<SenseAssignedData> {
    assign_all_senses(
        cleaned,
        deps.registry,
        deps.llm,
        deps.dictionary,
        concurrency,
        progress,
    )
    .await
}

/// Stage 4: sense inventory → generated entries.
pub async fn run_generation(
    sense_data: &SenseAssignedData,
    deps: &PipelineDeps<'_>,
    progress: Option<ProgressFn<'_>>,
) -> Result<Vec<VocabEntry>> {
    generate_all_entries(sense_data, deps.registry, deps.llm, progress).await
}

/// Stage 5: assign exam contexts to senses.
pub async fn run_wsd(
    sense_data: &SenseAssignedData,
    entries: Vec<VocabEntry>,
    deps: &PipelineDeps<'_>,
    progress: Option<ProgressFn<'_>>,
) -> Result<Vec<VocabEntry>> {
    perform_wsd(
        sense_data,
        entries,
        deps.registry,
        deps.llm,
        deps.docs,
        deps.scorer_factory,
        progress,
    )
    .await
}

/// The full pipeline over structured exams.
pub async fn run_pipeline(
    exams: &[Exam],
    wordlist: &HashMap<String, OfficialWordEntry>,
    deps: &PipelineDeps<'_>,
    options: &PipelineOptions,
    progress: Option<ProgressFn<'_>>,
) -> Result<(VocabDatabase, Vec<ValidationIssue>)> {
    tracing::info!(exams = exams.len(), "pipeline started");

    let cleaned = run_extract(exams, wordlist, deps.docs, options.exam_only, progress);
    tracing::info!(
        words = cleaned.words.len(),
        phrases = cleaned.phrases.len(),
        patterns = cleaned.patterns.len(),
        "extraction complete"
    );

    let sense_data = run_sense_inventory(&cleaned, deps, options.concurrency, progress).await?;
    let generated = run_generation(&sense_data, deps, progress).await?;
    let resolved = run_wsd(&sense_data, generated, deps, progress).await?;

    let (database, issues) =
        build_database(resolved, exam_year_range(exams), &options.generated_at);
    tracing::info!(
        entries = database.metadata.total_entries,
        issues = issues.len(),
        "pipeline finished"
    );
    Ok((database, issues))
}
