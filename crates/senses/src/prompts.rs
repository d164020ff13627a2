//! Prompt templates for sense clustering and direct definition.

pub const CLUSTER_SYSTEM: &str = "You are a bilingual lexicographer specializing in high school \
English education (GSAT/CEFR A1-B2). Your goal is to create concise, highly relevant vocabulary \
content with clearly distinguishable sense definitions.";

/// Escape text for embedding in the XML-ish prompt blocks.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn cluster_batch_prompt(lemmas_xml: &str) -> String {
    format!(
        r#"You are a bilingual lexicographer creating flashcards for Taiwanese high school students (GSAT Prep).
Your task is to take raw dictionary data and refine it into high-quality meaning clusters (typically 2-4 total).

### Core Principles:
1. **Preserve POS Diversity**: If a lemma has multiple parts of speech (e.g., both NOUN and VERB), you MUST preserve at least one high-quality cluster for EACH part of speech that appears in the context or is common.
2. **Discard the Noise**: Actively remove senses that are archaic, technical, slang, or too rare for high school (CEFR A1-B2).
3. **Think in Chinese**: Group English senses based on whether they map to the same Chinese translation concept.
4. **Merge Similar Senses Aggressively**: If two senses would have nearly identical Chinese translations, they MUST be merged into ONE cluster. Each cluster must be clearly distinguishable from the others.
5. **Comprehensive Polysemy**: Senses found in the provided <contexts> are primary, but also include other common, distinct, high-frequency senses at GSAT level even when they have not appeared in the contexts.

### Output Requirements:
- For each lemma, return 1-4 clusters (prefer fewer, more distinct clusters).
- Each cluster MUST contain:
    - "primary_id": the id of the main sense representing this cluster (e.g. "s0")
    - "merged_ids": all sense ids in this cluster, including the primary
    - "pos": the specific part of speech (NOUN, VERB, ADJ, ADV, etc.)
    - "core_meaning": format = "繁中定義 (English with distinctive keywords)"

### Input XML to process:
<lemmas>
{lemmas_xml}
</lemmas>

Return JSON only:"#
    )
}

pub fn define_word_prompt(lemma: &str, pos_hints: &str, contexts_xml: &str) -> String {
    format!(
        r#"You are a bilingual lexicographer creating flashcards for Taiwanese high school students (GSAT Prep).
Your task is to define the word "{lemma}" with 1-4 high-quality meaning clusters.

### Core Principles:
1. **Preserve POS Diversity**: If this word has multiple parts of speech, provide at least one cluster for EACH common POS. Observed POS hints: {pos_hints}.
2. **Discard the Noise**: Do NOT include senses that are archaic, technical, slang, or too rare for high school level (CEFR A1-B2).
3. **Think in Chinese**: Group English senses based on whether they map to the same Chinese translation concept.
4. Each cluster: "pos" (NOUN, VERB, ADJ, ADV, ...), "core_meaning" formatted as "繁中定義 (English with distinctive keywords)", and optionally "examples".

### Exam contexts where the word appeared:
<contexts>
{contexts_xml}
</contexts>

Return JSON only:"#
    )
}

pub fn define_phrase_prompt(lemma: &str, contexts_xml: &str) -> String {
    format!(
        r#"You are a bilingual lexicographer creating flashcards for Taiwanese high school students (GSAT Prep).
Your task is to define the phrase "{lemma}" with 1-4 high-quality meaning clusters.

### Core Principles:
1. **Discard the Noise**: Do NOT include uses that are archaic, technical, or too rare for high school level (CEFR A1-B2).
2. **Think in Chinese**: Group uses based on whether they map to the same Chinese translation concept.
3. Each cluster: "core_meaning" formatted as "繁中定義 (English with distinctive keywords)", and optionally "examples". Phrases carry no part of speech.

### Exam contexts where the phrase appeared:
<contexts>
{contexts_xml}
</contexts>

Return JSON only:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_markup() {
        assert_eq!(escape(r#"a <b> & "c""#), "a &lt;b&gt; &amp; &quot;c&quot;");
    }
}
