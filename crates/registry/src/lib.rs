//! Durable sense registry and content-addressed caches.
//!
//! One redb file holds three relations: canonical senses per lemma, the
//! definition-generation cache, and the WSD decision cache. All mutations
//! are serialized under a single writer mutex and committed as single
//! transactions, so an aborted run never leaves the file inconsistent;
//! reads go through their own read transactions and run concurrently.

mod keys;
mod store;

pub use keys::{
    generation_cache_key, normalize_lemma, pos_abbrev, sense_digest, wsd_cache_key,
};
pub use store::{Registry, RegistrySense, WsdCacheEntry, WsdSource};

/// Version tag recorded with neural-scored WSD cache rows.
pub const WSD_MODEL_VERSION: &str = "graded-wsd-1.0";
/// Version tag recorded with LLM-resolved WSD cache rows.
pub const WSD_LLM_VERSION: &str = "llm-v1";
