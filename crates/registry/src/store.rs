//! redb-backed registry store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};

use gsatvocab_model::SenseSource;

use crate::keys::{normalize_lemma, pos_abbrev, sense_digest};

/// Canonical senses: `sense_id → serialized SenseRecord`.
const SENSES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("senses");
/// Secondary index: `lemma → newline-joined sense_id list`.
const LEMMA_TABLE: TableDefinition<&str, &str> = TableDefinition::new("lemma_index");
/// Generation cache: `"{lemma_key}\x1f{cache_key}" → payload`.
const GEN_CACHE_TABLE: TableDefinition<&str, &str> = TableDefinition::new("sense_generation_cache");
/// WSD cache: `cache_key → serialized WsdRecord`.
const WSD_CACHE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("wsd_cache");
/// Schema version and the insertion-sequence counter.
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const SCHEMA_VERSION: u64 = 2;
const GEN_KEY_SEPARATOR: char = '\u{1f}';

/// One canonical sense as exposed to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySense {
    pub sense_id: String,
    pub lemma: String,
    pub pos: Option<String>,
    pub source: SenseSource,
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SenseRecord {
    sense_id: String,
    lemma: String,
    pos: Option<String>,
    source: String,
    definition: String,
    #[serde(default)]
    sense_order: Option<u32>,
    #[serde(default)]
    seq: u64,
    #[serde(default)]
    created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsdSource {
    GradedWsd,
    Llm,
}

impl WsdSource {
    pub fn as_str(self) -> &'static str {
        match self {
            WsdSource::GradedWsd => "graded_wsd",
            WsdSource::Llm => "llm",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "graded_wsd" => Ok(WsdSource::GradedWsd),
            "llm" => Ok(WsdSource::Llm),
            other => bail!("unknown WSD source in cache: {other}"),
        }
    }
}

/// One cached WSD decision. `sense_idx == None` means "no sense applies"
/// (stored as `-1`).
#[derive(Debug, Clone, PartialEq)]
pub struct WsdCacheEntry {
    pub sense_idx: Option<usize>,
    pub source: WsdSource,
    pub model_version: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WsdRecord {
    sense_idx: i64,
    source: String,
    model_version: String,
}

fn parse_source(raw: &str) -> Result<SenseSource> {
    match raw {
        "dictionaryapi" => Ok(SenseSource::Dictionaryapi),
        "llm_generated" => Ok(SenseSource::LlmGenerated),
        "wordnet" => Ok(SenseSource::Wordnet),
        "manual" => Ok(SenseSource::Manual),
        other => bail!("unknown sense source in registry: {other}"),
    }
}

fn record_to_sense(record: &SenseRecord) -> Result<RegistrySense> {
    Ok(RegistrySense {
        sense_id: record.sense_id.clone(),
        lemma: record.lemma.clone(),
        pos: record.pos.clone(),
        source: parse_source(&record.source)?,
        definition: record.definition.clone(),
    })
}

pub struct Registry {
    db: Database,
    path: PathBuf,
    /// Serializes writers; reads use their own transactions concurrently.
    write_lock: Mutex<()>,
}

impl Registry {
    /// Open or create the registry file at `path`, running forward-only
    /// schema migrations when an older file is found.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(&path)
            .with_context(|| format!("opening sense registry at {}", path.display()))?;

        let registry = Self {
            db,
            path,
            write_lock: Mutex::new(()),
        };
        registry.ensure_schema()?;
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_schema(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let tx = self.db.begin_write()?;
        {
            tx.open_table(SENSES_TABLE)?;
            tx.open_table(LEMMA_TABLE)?;
            tx.open_table(GEN_CACHE_TABLE)?;
            tx.open_table(WSD_CACHE_TABLE)?;
            let mut meta = tx.open_table(META_TABLE)?;
            let version = meta.get("version")?.map(|v| v.value());
            match version {
                None => {
                    meta.insert("version", SCHEMA_VERSION)?;
                }
                Some(v) if v < SCHEMA_VERSION => {
                    // v1 records predate sense_order; serde defaults fill it
                    // in on read, so the bump is just recorded.
                    tracing::info!(from = v, to = SCHEMA_VERSION, "migrating registry schema");
                    meta.insert("version", SCHEMA_VERSION)?;
                }
                Some(v) if v > SCHEMA_VERSION => {
                    bail!("registry schema version {v} is newer than this build supports");
                }
                Some(_) => {}
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn sense_ids_for_lemma_tx(
        table: &impl ReadableTable<&'static str, &'static str>,
        lemma: &str,
    ) -> Result<Vec<String>> {
        Ok(table
            .get(lemma)?
            .map(|v| v.value().to_string())
            .unwrap_or_default()
            .lines()
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect())
    }

    fn load_record(
        table: &impl ReadableTable<&'static str, &'static [u8]>,
        sense_id: &str,
    ) -> Result<Option<SenseRecord>> {
        match table.get(sense_id)? {
            None => Ok(None),
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
        }
    }

    fn records_for_lemma(&self, lemma: &str) -> Result<Vec<SenseRecord>> {
        let tx = self.db.begin_read()?;
        let lemma_table = tx.open_table(LEMMA_TABLE)?;
        let senses_table = tx.open_table(SENSES_TABLE)?;
        let ids = Self::sense_ids_for_lemma_tx(&lemma_table, lemma)?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = Self::load_record(&senses_table, &id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// All senses for a lemma, ordered by `sense_order` ascending with
    /// nulls last, ties broken by insertion sequence.
    pub fn get_senses_for_lemma(&self, lemma: &str) -> Result<Vec<RegistrySense>> {
        let mut records = self.records_for_lemma(lemma.trim())?;
        records.sort_by_key(|r| (r.sense_order.is_none(), r.sense_order, r.seq));
        records.iter().map(record_to_sense).collect()
    }

    pub fn get_sense(&self, sense_id: &str) -> Result<Option<RegistrySense>> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(SENSES_TABLE)?;
        match Self::load_record(&table, sense_id)? {
            None => Ok(None),
            Some(record) => Ok(Some(record_to_sense(&record)?)),
        }
    }

    pub fn sense_count(&self) -> Result<usize> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(SENSES_TABLE)?;
        Ok(table.len()? as usize)
    }

    fn next_reg_index(&self, lemma: &str, abbrev: &str) -> Result<u32> {
        let prefix = format!("{}.{}.reg", normalize_lemma(lemma), abbrev);
        let records = self.records_for_lemma(lemma)?;
        let mut max_idx = 0;
        for record in records {
            if let Some(suffix) = record.sense_id.strip_prefix(&prefix) {
                if let Ok(idx) = suffix.parse::<u32>() {
                    max_idx = max_idx.max(idx);
                }
            }
        }
        Ok(max_idx + 1)
    }

    fn synthesize_sense_id(
        &self,
        lemma: &str,
        pos: Option<&str>,
        source: SenseSource,
        definition: &str,
    ) -> Result<String> {
        let lemma_key = normalize_lemma(lemma);
        let abbrev = pos_abbrev(pos);
        Ok(match source {
            SenseSource::Dictionaryapi => {
                format!("{lemma_key}.{abbrev}.dict{}", sense_digest(definition, 8))
            }
            SenseSource::Wordnet => {
                format!("{lemma_key}.{abbrev}.wn{}", sense_digest(definition, 6))
            }
            SenseSource::LlmGenerated | SenseSource::Manual => {
                format!("{lemma_key}.{abbrev}.reg{}", self.next_reg_index(lemma, abbrev)?)
            }
        })
    }

    /// Register a sense, reusing an existing row when
    /// `(lemma, pos, source, definition)` matches exactly. Returns the
    /// stable sense id either way.
    pub fn add_sense(
        &self,
        lemma: &str,
        pos: Option<&str>,
        definition: &str,
        source: SenseSource,
        sense_order: Option<u32>,
    ) -> Result<String> {
        let lemma = lemma.trim();
        let definition = definition.trim();

        let existing = self.records_for_lemma(lemma)?.into_iter().find(|r| {
            r.pos.as_deref() == pos && r.source == source.as_str() && r.definition == definition
        });

        if let Some(mut record) = existing {
            if sense_order.is_some() && record.sense_order != sense_order {
                record.sense_order = sense_order;
                let _guard = self.write_lock.lock().unwrap();
                let tx = self.db.begin_write()?;
                {
                    let mut table = tx.open_table(SENSES_TABLE)?;
                    let bytes = serde_json::to_vec(&record)?;
                    table.insert(record.sense_id.as_str(), bytes.as_slice())?;
                }
                tx.commit()?;
            }
            return Ok(record.sense_id);
        }

        let sense_id = self.synthesize_sense_id(lemma, pos, source, definition)?;

        let _guard = self.write_lock.lock().unwrap();
        let tx = self.db.begin_write()?;
        {
            let mut meta = tx.open_table(META_TABLE)?;
            let seq = meta.get("seq")?.map(|v| v.value()).unwrap_or(0) + 1;
            meta.insert("seq", seq)?;
            drop(meta);

            let record = SenseRecord {
                sense_id: sense_id.clone(),
                lemma: lemma.to_string(),
                pos: pos.map(str::to_string),
                source: source.as_str().to_string(),
                definition: definition.to_string(),
                sense_order,
                seq,
                created_at: chrono::Utc::now().to_rfc3339(),
            };

            let mut senses = tx.open_table(SENSES_TABLE)?;
            let bytes = serde_json::to_vec(&record)?;
            senses.insert(sense_id.as_str(), bytes.as_slice())?;
            drop(senses);

            let mut lemma_table = tx.open_table(LEMMA_TABLE)?;
            let existing_ids = lemma_table
                .get(lemma)?
                .map(|v| v.value().to_string())
                .unwrap_or_default();
            if !existing_ids.lines().any(|id| id == sense_id) {
                let updated = if existing_ids.is_empty() {
                    sense_id.clone()
                } else {
                    format!("{existing_ids}\n{sense_id}")
                };
                lemma_table.insert(lemma, updated.as_str())?;
            }
        }
        tx.commit()?;

        tracing::info!(
            sense_id = %sense_id,
            source = source.as_str(),
            order = ?sense_order,
            "added new sense"
        );
        Ok(sense_id)
    }

    // ── generation cache ─────────────────────────────────────────────────

    fn gen_key(lemma: &str, cache_key: &str) -> String {
        format!("{}{}{}", normalize_lemma(lemma), GEN_KEY_SEPARATOR, cache_key)
    }

    pub fn get_generation_cache(&self, lemma: &str, cache_key: &str) -> Result<Option<String>> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(GEN_CACHE_TABLE)?;
        Ok(table
            .get(Self::gen_key(lemma, cache_key).as_str())?
            .map(|v| v.value().to_string()))
    }

    pub fn upsert_generation_cache(
        &self,
        lemma: &str,
        cache_key: &str,
        payload: &str,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let tx = self.db.begin_write()?;
        {
            let mut table = tx.open_table(GEN_CACHE_TABLE)?;
            table.insert(Self::gen_key(lemma, cache_key).as_str(), payload)?;
        }
        tx.commit()?;
        Ok(())
    }

    // ── WSD cache ────────────────────────────────────────────────────────

    pub fn get_wsd_cache_batch(
        &self,
        cache_keys: &[String],
    ) -> Result<HashMap<String, WsdCacheEntry>> {
        if cache_keys.is_empty() {
            return Ok(HashMap::new());
        }
        let tx = self.db.begin_read()?;
        let table = tx.open_table(WSD_CACHE_TABLE)?;
        let mut result = HashMap::new();
        for key in cache_keys {
            if let Some(v) = table.get(key.as_str())? {
                let record: WsdRecord = serde_json::from_slice(v.value())?;
                result.insert(
                    key.clone(),
                    WsdCacheEntry {
                        sense_idx: usize::try_from(record.sense_idx).ok(),
                        source: WsdSource::parse(&record.source)?,
                        model_version: record.model_version,
                    },
                );
            }
        }
        Ok(result)
    }

    /// Write a batch of WSD decisions in one transaction. This is the
    /// crash-safety unit: an abort between calls loses at most one batch.
    pub fn set_wsd_cache_batch(
        &self,
        entries: &HashMap<String, (Option<usize>, WsdSource, String)>,
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().unwrap();
        let tx = self.db.begin_write()?;
        {
            let mut table = tx.open_table(WSD_CACHE_TABLE)?;
            for (key, (sense_idx, source, model_version)) in entries {
                let record = WsdRecord {
                    sense_idx: sense_idx.map(|v| v as i64).unwrap_or(-1),
                    source: source.as_str().to_string(),
                    model_version: model_version.clone(),
                };
                let bytes = serde_json::to_vec(&record)?;
                table.insert(key.as_str(), bytes.as_slice())?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WSD_LLM_VERSION, WSD_MODEL_VERSION, wsd_cache_key};

    fn open_temp() -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("registry.redb")).unwrap();
        (dir, registry)
    }

    #[test]
    fn dictionary_sense_id_is_content_stable() {
        let (_dir, registry) = open_temp();
        let id = registry
            .add_sense(
                "commit",
                Some("VERB"),
                "to do something illegal",
                SenseSource::Dictionaryapi,
                Some(0),
            )
            .unwrap();
        assert!(id.starts_with("commit.v.dict"), "{id}");
        assert_eq!(id.len(), "commit.v.dict".len() + 8);
    }

    #[test]
    fn add_sense_dedups_on_exact_match() {
        let (_dir, registry) = open_temp();
        let first = registry
            .add_sense(
                "commit",
                Some("VERB"),
                "to promise or dedicate",
                SenseSource::Dictionaryapi,
                Some(0),
            )
            .unwrap();
        let second = registry
            .add_sense(
                "commit",
                Some("VERB"),
                "to promise or dedicate",
                SenseSource::Dictionaryapi,
                Some(1),
            )
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.sense_count().unwrap(), 1);
    }

    #[test]
    fn generated_ids_use_monotone_registry_index() {
        let (_dir, registry) = open_temp();
        let a = registry
            .add_sense("strike", Some("VERB"), "to hit", SenseSource::LlmGenerated, Some(0))
            .unwrap();
        let b = registry
            .add_sense(
                "strike",
                Some("VERB"),
                "to occur suddenly",
                SenseSource::LlmGenerated,
                Some(1),
            )
            .unwrap();
        let c = registry
            .add_sense(
                "strike",
                Some("NOUN"),
                "a work stoppage",
                SenseSource::LlmGenerated,
                Some(2),
            )
            .unwrap();
        assert_eq!(a, "strike.v.reg1");
        assert_eq!(b, "strike.v.reg2");
        // the registry index is per lemma+POS
        assert_eq!(c, "strike.n.reg1");
    }

    #[test]
    fn phrase_senses_use_phr_abbrev() {
        let (_dir, registry) = open_temp();
        let id = registry
            .add_sense(
                "draw on",
                None,
                "to make use of a supply",
                SenseSource::LlmGenerated,
                Some(0),
            )
            .unwrap();
        assert_eq!(id, "draw_on.phr.reg1");
    }

    #[test]
    fn senses_are_ordered_by_sense_order_then_seq() {
        let (_dir, registry) = open_temp();
        registry
            .add_sense("bank", Some("NOUN"), "a river edge", SenseSource::LlmGenerated, Some(1))
            .unwrap();
        registry
            .add_sense(
                "bank",
                Some("NOUN"),
                "a financial institution",
                SenseSource::LlmGenerated,
                Some(0),
            )
            .unwrap();
        registry
            .add_sense("bank", Some("VERB"), "to rely on", SenseSource::LlmGenerated, None)
            .unwrap();

        let senses = registry.get_senses_for_lemma("bank").unwrap();
        assert_eq!(senses[0].definition, "a financial institution");
        assert_eq!(senses[1].definition, "a river edge");
        // null order sorts last
        assert_eq!(senses[2].definition, "to rely on");
    }

    #[test]
    fn reopen_returns_same_sense_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.redb");

        let first = {
            let registry = Registry::open(&path).unwrap();
            registry
                .add_sense("draft", Some("NOUN"), "a preliminary version", SenseSource::Dictionaryapi, Some(0))
                .unwrap()
        };

        let registry = Registry::open(&path).unwrap();
        let second = registry
            .add_sense("draft", Some("NOUN"), "a preliminary version", SenseSource::Dictionaryapi, Some(0))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.sense_count().unwrap(), 1);
    }

    #[test]
    fn generation_cache_roundtrip() {
        let (_dir, registry) = open_temp();
        assert_eq!(registry.get_generation_cache("draft", "abc").unwrap(), None);
        registry
            .upsert_generation_cache("draft", "abc", r#"{"lemma":"draft"}"#)
            .unwrap();
        assert_eq!(
            registry.get_generation_cache("draft", "abc").unwrap().as_deref(),
            Some(r#"{"lemma":"draft"}"#)
        );
        // write-once per key: identical overwrite is a no-op in effect
        registry
            .upsert_generation_cache("draft", "abc", r#"{"lemma":"draft"}"#)
            .unwrap();
        assert_eq!(
            registry.get_generation_cache("draft", "abc").unwrap().as_deref(),
            Some(r#"{"lemma":"draft"}"#)
        );
    }

    #[test]
    fn wsd_cache_batch_roundtrip_with_none_encoding() {
        let (_dir, registry) = open_temp();
        let key_assigned = wsd_cache_key("strike", "It can strike suddenly.", &[
            "strike.v.reg1".to_string(),
            "strike.v.reg2".to_string(),
        ]);
        let key_idiom = wsd_cache_key("order", "He left in order to catch the bus.", &[
            "order.n.reg1".to_string(),
        ]);

        let mut batch = HashMap::new();
        batch.insert(
            key_assigned.clone(),
            (Some(1), WsdSource::GradedWsd, WSD_MODEL_VERSION.to_string()),
        );
        batch.insert(
            key_idiom.clone(),
            (None, WsdSource::Llm, WSD_LLM_VERSION.to_string()),
        );
        registry.set_wsd_cache_batch(&batch).unwrap();

        let loaded = registry
            .get_wsd_cache_batch(&[key_assigned.clone(), key_idiom.clone(), "missing".to_string()])
            .unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[&key_assigned].sense_idx, Some(1));
        assert_eq!(loaded[&key_assigned].source, WsdSource::GradedWsd);
        assert_eq!(loaded[&key_idiom].sense_idx, None);
        assert_eq!(loaded[&key_idiom].model_version, WSD_LLM_VERSION);
    }

    #[test]
    fn cache_lookups_are_stable_within_a_run() {
        let (_dir, registry) = open_temp();
        let key = wsd_cache_key("draft", "s", &["draft.n.reg1".to_string()]);
        let mut batch = HashMap::new();
        batch.insert(key.clone(), (Some(0), WsdSource::GradedWsd, WSD_MODEL_VERSION.to_string()));
        registry.set_wsd_cache_batch(&batch).unwrap();

        let a = registry.get_wsd_cache_batch(std::slice::from_ref(&key)).unwrap();
        let b = registry.get_wsd_cache_batch(std::slice::from_ref(&key)).unwrap();
        assert_eq!(a[&key], b[&key]);
    }
}
