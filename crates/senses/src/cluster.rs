//! LLM sense clustering: batch prompt construction, response models, and
//! mapping cluster references back onto dictionary senses.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::dictionary::DictionarySense;
use crate::prompts::{cluster_batch_prompt, escape};

/// One meaning cluster chosen by the LLM, referencing dictionary senses by
/// their `s{idx}` ids.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SenseCluster {
    /// Main sense id representing this cluster (e.g. "s0").
    pub primary_id: String,
    /// All sense ids merged into this cluster, including the primary.
    pub merged_ids: Vec<String>,
    /// Part of speech for the cluster (NOUN, VERB, ADJ, ADV, ...).
    pub pos: String,
    /// Bilingual core meaning of the cluster.
    pub core_meaning: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SenseFilterBatchItem {
    /// The lemma exactly as provided in the input XML.
    pub lemma: String,
    pub clusters: Vec<SenseCluster>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SenseFilterBatchResponse {
    pub items: Vec<SenseFilterBatchItem>,
}

/// Direct-generation cluster for words (dictionary silent).
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LlmSenseCluster {
    pub pos: Option<String>,
    pub core_meaning: String,
    pub examples: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LlmSenseClusterResponse {
    pub clusters: Vec<LlmSenseCluster>,
}

/// Direct-generation cluster for phrases: no POS by construction.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LlmPhraseSenseCluster {
    pub core_meaning: String,
    pub examples: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LlmPhraseSenseClusterResponse {
    pub clusters: Vec<LlmPhraseSenseCluster>,
}

/// One lemma's slice of a clustering batch.
pub struct ClusterInput<'a> {
    pub lemma: &'a str,
    /// The lemma actually sent to the dictionary (adverb-base fallback).
    pub dict_lemma: &'a str,
    pub senses: &'a [DictionarySense],
    pub contexts: &'a [String],
}

pub fn build_filter_batch_prompt(items: &[ClusterInput<'_>]) -> String {
    let mut blocks = Vec::with_capacity(items.len());
    for item in items {
        let senses_block: Vec<String> = item
            .senses
            .iter()
            .map(|s| {
                let example = s
                    .example
                    .as_deref()
                    .map(|e| format!("<example>{}</example>", escape(e)))
                    .unwrap_or_default();
                let pos_attr = s
                    .pos
                    .as_deref()
                    .map(|p| format!(" pos=\"{p}\""))
                    .unwrap_or_default();
                format!(
                    "<sense id=\"s{}\"{}><definition>{}</definition>{}</sense>",
                    s.idx,
                    pos_attr,
                    escape(&s.definition),
                    example
                )
            })
            .collect();
        let contexts_block: Vec<String> = item
            .contexts
            .iter()
            .map(|c| format!("<context>{}</context>", escape(c)))
            .collect();
        blocks.push(format!(
            "<lemma name=\"{}\" dict_lemma=\"{}\">\n<contexts>\n{}\n</contexts>\n<senses>\n{}\n</senses>\n</lemma>",
            escape(item.lemma),
            escape(item.dict_lemma),
            contexts_block.join("\n"),
            senses_block.join("\n"),
        ));
    }
    cluster_batch_prompt(&blocks.join("\n"))
}

/// A cluster resolved back to its dictionary senses.
#[derive(Debug, Clone)]
pub struct ClusteredSense {
    pub primary: DictionarySense,
    pub merged: Vec<DictionarySense>,
    pub core_meaning: String,
}

/// Resolve the LLM's `s{idx}` references onto the original sense list.
/// Clusters pointing at unknown ids are dropped; the cluster's POS wins
/// over the primary sense's.
pub fn clusters_to_result(
    clusters: &[SenseCluster],
    senses: &[DictionarySense],
) -> Vec<ClusteredSense> {
    let mut result = Vec::new();

    for cluster in clusters {
        let primary_id = cluster.primary_id.trim().to_lowercase();
        let Some(primary) = senses
            .iter()
            .find(|s| format!("s{}", s.idx) == primary_id)
        else {
            continue;
        };

        let merged: Vec<DictionarySense> = cluster
            .merged_ids
            .iter()
            .filter_map(|mid| {
                let mid = mid.trim().to_lowercase();
                senses.iter().find(|s| format!("s{}", s.idx) == mid).cloned()
            })
            .collect();

        let mut primary = primary.clone();
        if !cluster.pos.trim().is_empty() {
            primary.pos = Some(cluster.pos.trim().to_uppercase());
        }

        result.push(ClusteredSense {
            merged: if merged.is_empty() {
                vec![primary.clone()]
            } else {
                merged
            },
            primary,
            core_meaning: cluster.core_meaning.clone(),
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_senses() -> Vec<DictionarySense> {
        let defs = [
            "to do something illegal",
            "to promise or dedicate",
            "to send to prison",
            "to commit a file (computing)",
        ];
        defs.iter()
            .enumerate()
            .map(|(idx, d)| DictionarySense {
                idx,
                pos: Some("VERB".to_string()),
                definition: d.to_string(),
                example: None,
            })
            .collect()
    }

    #[test]
    fn clustering_merges_and_drops_senses() {
        // crime cluster absorbs the legal-custody sense, computing dropped
        let clusters = vec![
            SenseCluster {
                primary_id: "s0".to_string(),
                merged_ids: vec!["s0".to_string(), "s2".to_string()],
                pos: "VERB".to_string(),
                core_meaning: "犯（罪）(to do something illegal)".to_string(),
            },
            SenseCluster {
                primary_id: "s1".to_string(),
                merged_ids: vec!["s1".to_string()],
                pos: "VERB".to_string(),
                core_meaning: "承諾、投入 (to promise or dedicate)".to_string(),
            },
        ];
        let result = clusters_to_result(&clusters, &commit_senses());
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|c| c.primary.pos.as_deref() == Some("VERB")));
        assert_eq!(result[0].merged.len(), 2);
        assert!(result[0].core_meaning.contains("illegal"));
        // the computing sense is in no surviving cluster
        assert!(
            result
                .iter()
                .flat_map(|c| &c.merged)
                .all(|s| !s.definition.contains("computing"))
        );
    }

    #[test]
    fn unknown_primary_id_drops_cluster() {
        let clusters = vec![SenseCluster {
            primary_id: "s9".to_string(),
            merged_ids: vec!["s9".to_string()],
            pos: "VERB".to_string(),
            core_meaning: "whatever".to_string(),
        }];
        assert!(clusters_to_result(&clusters, &commit_senses()).is_empty());
    }

    #[test]
    fn batch_prompt_embeds_senses_and_contexts() {
        let senses = commit_senses();
        let contexts = vec!["He committed a serious crime.".to_string()];
        let prompt = build_filter_batch_prompt(&[ClusterInput {
            lemma: "commit",
            dict_lemma: "commit",
            senses: &senses,
            contexts: &contexts,
        }]);
        assert!(prompt.contains("<lemma name=\"commit\""));
        assert!(prompt.contains("<sense id=\"s0\" pos=\"VERB\">"));
        assert!(prompt.contains("committed a serious crime"));
    }
}
