//! CEEC official wordlist loading.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default)]
pub struct OfficialWordEntry {
    pub word: String,
    pub parts_of_speech: Vec<String>,
    /// Difficulty level 1-6; `None` when the list omits it.
    pub level: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct RawWordInfo {
    #[serde(default)]
    pos: Vec<String>,
    #[serde(default)]
    level: Option<serde_json::Value>,
}

fn parse_level(value: Option<&serde_json::Value>) -> Option<u8> {
    match value? {
        serde_json::Value::Number(n) => n.as_u64().map(|v| v as u8),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Load the official wordlist from a JSON object keyed by headword:
/// `{"abandon": {"pos": ["v."], "level": 4}, ...}`. Keys are lowercased.
pub fn load_official_wordlist(path: &Path) -> Result<HashMap<String, OfficialWordEntry>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading official wordlist at {}", path.display()))?;
    let parsed: HashMap<String, RawWordInfo> =
        serde_json::from_str(&raw).context("parsing official wordlist JSON")?;

    let mut result = HashMap::with_capacity(parsed.len());
    for (word, info) in parsed {
        let level = parse_level(info.level.as_ref());
        result.insert(
            word.to_lowercase(),
            OfficialWordEntry {
                word,
                parts_of_speech: info.pos,
                level,
            },
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("gsatvocab-{}-{}", std::process::id(), name));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_and_lowercases_keys() {
        let path = write_temp(
            "wordlist.json",
            r#"{"Abandon": {"pos": ["v."], "level": 4}, "draft": {"pos": ["n.", "v."], "level": "2"}}"#,
        );
        let list = load_official_wordlist(&path).unwrap();
        assert_eq!(list.len(), 2);
        let abandon = &list["abandon"];
        assert_eq!(abandon.word, "Abandon");
        assert_eq!(abandon.level, Some(4));
        assert_eq!(list["draft"].level, Some(2));
        assert_eq!(list["draft"].parts_of_speech, vec!["n.", "v."]);
        fs::remove_file(path).ok();
    }

    #[test]
    fn missing_level_is_none() {
        let path = write_temp("wordlist-nolevel.json", r#"{"kale": {"pos": ["n."]}}"#);
        let list = load_official_wordlist(&path).unwrap();
        assert_eq!(list["kale"].level, None);
        fs::remove_file(path).ok();
    }
}
