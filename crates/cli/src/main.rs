use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gsatvocab_config::AppConfig;
use gsatvocab_llm::LlmClient;
use gsatvocab_model::{
    CleanedVocabData, Exam, OfficialWordEntry, SenseAssignedData, VocabEntry, YearRange,
    load_official_wordlist,
};
use gsatvocab_nlp::{DocCache, RuleTagger};
use gsatvocab_output::{build_database, write_output};
use gsatvocab_pipeline::{
    PipelineDeps, PipelineOptions, exam_year_range, run_extract, run_generation, run_pipeline,
    run_sense_inventory, run_wsd,
};
use gsatvocab_registry::Registry;
use gsatvocab_senses::DictionaryClient;

#[derive(Debug, Parser)]
#[command(
    name = "gsatvocab",
    version,
    about = "Build a structured vocabulary database from GSAT/AST exam archives"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "gsatvocab.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Stage 2: extract per-lemma aggregates from structured exams.
    Extract {
        /// Directory of structured exam JSON files (or a single file).
        #[arg(long)]
        exams: PathBuf,
        /// Official CEEC wordlist JSON.
        #[arg(long)]
        wordlist: PathBuf,
        #[arg(long, default_value = "data/cleaned.json")]
        output: PathBuf,
        /// Skip official-list words that never appear in any exam.
        #[arg(long)]
        exam_only: bool,
    },
    /// Stage 3: build the sense inventory for cleaned entries.
    Senses {
        #[arg(long, default_value = "data/cleaned.json")]
        input: PathBuf,
        #[arg(long, default_value = "data/senses.json")]
        output: PathBuf,
    },
    /// Stage 4: generate learner-facing definitions and examples.
    Generate {
        #[arg(long, default_value = "data/senses.json")]
        input: PathBuf,
        #[arg(long, default_value = "data/generated.json")]
        output: PathBuf,
    },
    /// Stage 5: assign exam contexts to senses via WSD.
    Wsd {
        #[arg(long, default_value = "data/senses.json")]
        senses: PathBuf,
        #[arg(long, default_value = "data/generated.json")]
        generated: PathBuf,
        #[arg(long, default_value = "data/resolved.json")]
        output: PathBuf,
    },
    /// Stage 7: validate and write the final database artifact.
    Build {
        #[arg(long, default_value = "data/resolved.json")]
        input: PathBuf,
        #[arg(long, default_value = "data/vocab_database.json")]
        output: PathBuf,
        #[arg(long)]
        errors: Option<PathBuf>,
        #[arg(long)]
        min_year: i16,
        #[arg(long)]
        max_year: i16,
    },
    /// Run the full pipeline end to end.
    Run {
        #[arg(long)]
        exams: PathBuf,
        #[arg(long)]
        wordlist: PathBuf,
        #[arg(long, default_value = "data/vocab_database.json")]
        output: PathBuf,
        #[arg(long)]
        errors: Option<PathBuf>,
        #[arg(long)]
        exam_only: bool,
    },
}

fn load_exams(path: &Path) -> Result<Vec<Exam>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if path.is_dir() {
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|e| e == "json") {
                files.push(entry.path());
            }
        }
        files.sort();
    } else {
        files.push(path.to_path_buf());
    }
    if files.is_empty() {
        bail!("no exam JSON files found under {}", path.display());
    }

    let mut exams = Vec::with_capacity(files.len());
    for file in files {
        let raw = fs::read_to_string(&file)
            .with_context(|| format!("reading exam file {}", file.display()))?;
        let exam: Exam = serde_json::from_str(&raw)
            .with_context(|| format!("parsing exam file {}", file.display()))?;
        exams.push(exam);
    }
    tracing::info!(count = exams.len(), "loaded structured exams");
    Ok(exams)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "artifact written");
    Ok(())
}

fn progress(completed: usize, total: usize, label: &str) {
    if total > 0 {
        eprintln!("  [{completed}/{total}] {label}");
    }
}

struct Stack {
    registry: Registry,
    llm: LlmClient,
    dictionary: DictionaryClient,
    docs: DocCache,
    concurrency: usize,
}

impl Stack {
    fn open(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            registry: Registry::open(&config.registry.path)?,
            llm: LlmClient::new(config.llm.clone()),
            dictionary: DictionaryClient::new(&config.dictionary)?,
            docs: DocCache::new(Arc::new(RuleTagger::new())),
            concurrency: config.llm.concurrency,
        })
    }

    fn deps(&self) -> PipelineDeps<'_> {
        PipelineDeps {
            registry: &self.registry,
            llm: &self.llm,
            dictionary: &self.dictionary,
            docs: &self.docs,
            scorer_factory: None,
        }
    }
}

fn load_wordlist(path: &Path) -> Result<HashMap<String, OfficialWordEntry>> {
    let list = load_official_wordlist(path)?;
    tracing::info!(words = list.len(), "loaded official wordlist");
    Ok(list)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.telemetry.log_level.clone())),
        )
        .init();

    match cli.command {
        Commands::Extract {
            exams,
            wordlist,
            output,
            exam_only,
        } => {
            let exams = load_exams(&exams)?;
            let wordlist = load_wordlist(&wordlist)?;
            let docs = DocCache::new(Arc::new(RuleTagger::new()));
            let cleaned = run_extract(&exams, &wordlist, &docs, exam_only, Some(&progress));
            println!(
                "extracted {} words, {} phrases, {} pattern categories",
                cleaned.words.len(),
                cleaned.phrases.len(),
                cleaned.patterns.len()
            );
            write_json(&output, &cleaned)?;
        }
        Commands::Senses { input, output } => {
            let cleaned: CleanedVocabData = read_json(&input)?;
            let stack = Stack::open(&config)?;
            let sense_data = run_sense_inventory(
                &cleaned,
                &stack.deps(),
                stack.concurrency,
                Some(&progress),
            )
            .await?;
            println!(
                "sense inventory: {} words, {} phrases, {} patterns",
                sense_data.words.len(),
                sense_data.phrases.len(),
                sense_data.patterns.len()
            );
            write_json(&output, &sense_data)?;
        }
        Commands::Generate { input, output } => {
            let sense_data: SenseAssignedData = read_json(&input)?;
            let stack = Stack::open(&config)?;
            let entries = run_generation(&sense_data, &stack.deps(), Some(&progress)).await?;
            println!("generated content for {} entries", entries.len());
            write_json(&output, &entries)?;
        }
        Commands::Wsd {
            senses,
            generated,
            output,
        } => {
            let sense_data: SenseAssignedData = read_json(&senses)?;
            let entries: Vec<VocabEntry> = read_json(&generated)?;
            let stack = Stack::open(&config)?;
            let resolved = run_wsd(&sense_data, entries, &stack.deps(), Some(&progress)).await?;
            println!("WSD resolved {} entries", resolved.len());
            write_json(&output, &resolved)?;
        }
        Commands::Build {
            input,
            output,
            errors,
            min_year,
            max_year,
        } => {
            let entries: Vec<VocabEntry> = read_json(&input)?;
            let generated_at = chrono::Utc::now().to_rfc3339();
            let (database, issues) = build_database(
                entries,
                YearRange {
                    min: min_year,
                    max: max_year,
                },
                &generated_at,
            );
            write_output(&database, &output, errors.as_deref(), &issues)?;
            print_summary(&database, issues.len());
        }
        Commands::Run {
            exams,
            wordlist,
            output,
            errors,
            exam_only,
        } => {
            let exams = load_exams(&exams)?;
            let wordlist = load_wordlist(&wordlist)?;
            let stack = Stack::open(&config)?;
            let options = PipelineOptions {
                exam_only,
                concurrency: stack.concurrency,
                generated_at: chrono::Utc::now().to_rfc3339(),
            };
            let year_range = exam_year_range(&exams);
            tracing::info!(min = year_range.min, max = year_range.max, "exam year range");

            let (database, issues) =
                run_pipeline(&exams, &wordlist, &stack.deps(), &options, Some(&progress)).await?;
            write_output(&database, &output, errors.as_deref(), &issues)?;
            print_summary(&database, issues.len());
        }
    }

    Ok(())
}

fn print_summary(database: &gsatvocab_model::VocabDatabase, issue_count: usize) {
    println!(
        "database v{}: {} entries ({} words, {} phrases, {} patterns), {} validation issues",
        database.version,
        database.metadata.total_entries,
        database.metadata.count_by_type.get("word").copied().unwrap_or(0),
        database.metadata.count_by_type.get("phrase").copied().unwrap_or(0),
        database.metadata.count_by_type.get("pattern").copied().unwrap_or(0),
        issue_count,
    );
}
