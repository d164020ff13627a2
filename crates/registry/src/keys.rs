//! Centralized derivation of sense ids and cache keys.
//!
//! Every content-addressed identifier in the registry is produced here, so a
//! change to "what counts as identical" invalidates exactly the affected
//! entries and nothing else.

use sha1::{Digest, Sha1};

/// Normalize a lemma into its id/key form: trimmed, lowercased, spaces
/// replaced by underscores.
pub fn normalize_lemma(lemma: &str) -> String {
    lemma.trim().to_lowercase().replace(' ', "_")
}

/// Abbreviate a sense POS for use inside a sense id. Phrases carry no POS
/// and abbreviate to `phr`; unrecognized tags fall back to `x`.
pub fn pos_abbrev(pos: Option<&str>) -> &'static str {
    let Some(pos) = pos else {
        return "phr";
    };
    match pos.to_uppercase().as_str() {
        "NOUN" => "n",
        "VERB" => "v",
        "ADJ" => "adj",
        "ADV" => "adv",
        "PRON" => "pron",
        "DET" => "det",
        "CONJ" => "conj",
        "PREP" => "prep",
        "AUX" => "aux",
        _ => "x",
    }
}

fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Truncated SHA-1 of a definition, the content-stable part of dictionary
/// and wordnet sense ids.
pub fn sense_digest(definition: &str, len: usize) -> String {
    let mut hex = sha1_hex(&definition.trim().to_lowercase());
    hex.truncate(len);
    hex
}

/// Cache key for the generation cache: SHA-1 over the sorted list of
/// `{sense_id}|{pos or NONE}|{definition}` tuples. Sorting makes the key
/// insensitive to sense reordering with identical content.
pub fn generation_cache_key(senses: &[(String, Option<String>, String)]) -> String {
    let mut parts: Vec<String> = senses
        .iter()
        .map(|(sense_id, pos, definition)| {
            format!(
                "{}|{}|{}",
                sense_id,
                pos.as_deref().unwrap_or("NONE"),
                definition.trim()
            )
        })
        .collect();
    parts.sort();
    sha1_hex(&parts.join("|"))
}

/// Cache key for one WSD decision: lemma, raw sentence, and the sorted
/// sense-id list, so a changed sense inventory misses the cache.
pub fn wsd_cache_key(lemma: &str, sentence: &str, sense_ids: &[String]) -> String {
    let mut sorted = sense_ids.to_vec();
    sorted.sort();
    let raw = format!("{}|{}|{}", lemma.to_lowercase(), sentence, sorted.join(","));
    let mut hex = sha1_hex(&raw);
    hex.truncate(16);
    hex
}
