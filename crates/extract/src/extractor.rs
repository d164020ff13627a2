//! The extraction walk itself.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use gsatvocab_model::{
    Annotation, AnnotationRole, CleanedPatternEntry, CleanedPhraseEntry, CleanedVocabData,
    CleanedWordEntry, ContextSentence, Exam, ExamType, OfficialWordEntry, PatternCategory,
    PatternOccurrence, PhraseOccurrence, SectionType, SentenceRole, SourceInfo,
};
use gsatvocab_nlp::{DocCache, Pos, adverb_base, is_foreign_word, normalize_pos_label};

use crate::dedupe::{ContextDeduper, context_fingerprint};
use crate::frequency::FrequencyCounter;
use crate::phrase::{PhraseMatcher, is_valid_phrase, is_valid_surface, normalize_phrase};

/// Progress callback `(completed, total, label)`; must never panic.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize, &str) + Sync);

const QUALITY_CONTEXT_MIN_TOKENS: usize = 5;
const VALID_ENTRY_POS: &[&str] = &["NOUN", "VERB", "ADJ", "ADV"];

fn cloze_blank_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"__\d+__").unwrap())
}

fn is_quality_context(text: &str) -> bool {
    text.split_whitespace().count() >= QUALITY_CONTEXT_MIN_TOKENS
}

struct SentenceTask<'a> {
    year: i16,
    exam_type: ExamType,
    section_type: SectionType,
    question: Option<u32>,
    sentence_role: Option<SentenceRole>,
    text: &'a str,
    annotations: &'a [Annotation],
}

#[derive(Default)]
struct Extraction {
    deduper: ContextDeduper,
    counters: HashMap<String, FrequencyCounter>,
    contexts: HashMap<String, Vec<ContextSentence>>,
    phrase_map: HashMap<String, Vec<PhraseOccurrence>>,
    pattern_map: BTreeMap<PatternCategory, Vec<PatternOccurrence>>,
}

impl Extraction {
    /// Substitute the adjective base for `-ly` adverbs when the base is a
    /// known headword (official list or already seen in this corpus).
    fn rewrite_adverb(
        &self,
        lemma: String,
        pos: Pos,
        official: &HashMap<String, OfficialWordEntry>,
    ) -> String {
        if pos != Pos::Adv {
            return lemma;
        }
        match adverb_base(&lemma) {
            Some(base)
                if base != lemma
                    && (official.contains_key(&base) || self.counters.contains_key(&base)) =>
            {
                base
            }
            _ => lemma,
        }
    }

    fn record_token(
        &mut self,
        lemma: String,
        context_text: &str,
        pos: Pos,
        surface: &str,
        source: SourceInfo,
    ) {
        let role = source.role;
        if !self
            .deduper
            .should_keep(&lemma, context_text, source.exam_type, source.year)
        {
            return;
        }
        self.counters.entry(lemma.clone()).or_default().add(
            source.year,
            role,
            source.section_type,
            source.exam_type,
        );
        if role == Some(AnnotationRole::Distractor) {
            return;
        }
        if is_quality_context(context_text) {
            self.contexts.entry(lemma).or_default().push(ContextSentence {
                text: context_text.to_string(),
                source,
                pos: pos.as_str().to_string(),
                surface: surface.to_string(),
            });
        }
    }
}

/// Walk every exam and build the cleaned per-lemma aggregates.
pub fn clean_and_aggregate(
    exams: &[Exam],
    official_wordlist: &HashMap<String, OfficialWordEntry>,
    docs: &DocCache,
    exam_only: bool,
    progress: Option<ProgressFn<'_>>,
) -> CleanedVocabData {
    let mut state = Extraction::default();

    let report = |completed: usize, label: &str| {
        if let Some(cb) = progress {
            cb(completed, 100, label);
        }
    };

    report(0, "processing sections");
    collect_annotations(exams, docs, &mut state);
    process_sentences(exams, official_wordlist, docs, &mut state, progress);

    report(30, "processing translations");
    process_translation_items(exams, official_wordlist, docs, &mut state);

    report(40, "processing essays");
    process_essay_words(exams, official_wordlist, docs, &mut state);

    report(50, "backfilling phrases");
    backfill_phrase_occurrences(exams, docs, &mut state, progress);

    report(80, "merging data");
    let data = finalize(state, official_wordlist, exam_only);
    report(100, "done");
    data
}

/// First pass: route pattern annotations into category buckets and valid
/// phrase annotations into the phrase map.
fn collect_annotations(exams: &[Exam], docs: &DocCache, state: &mut Extraction) {
    // warm the parse cache for all phrase surfaces in one batch
    let mut surfaces: Vec<&str> = Vec::new();
    for exam in exams {
        for section in &exam.sections {
            for sentence in &section.sentences {
                for ann in &sentence.annotations {
                    if ann.role == AnnotationRole::NotablePhrase
                        && is_valid_surface(&ann.surface, &sentence.text)
                        && is_valid_phrase(&ann.surface)
                        && !surfaces.contains(&ann.surface.as_str())
                    {
                        surfaces.push(&ann.surface);
                    }
                }
            }
        }
    }
    docs.parse_surfaces(&surfaces);

    for exam in exams {
        for section in &exam.sections {
            for sentence in &section.sentences {
                for ann in &sentence.annotations {
                    match ann.role {
                        AnnotationRole::NotablePattern => {
                            let Some(category) = ann.pattern_category else {
                                tracing::warn!(
                                    surface = %ann.surface,
                                    year = exam.year,
                                    question = ?sentence.question,
                                    "pattern annotation missing category"
                                );
                                continue;
                            };
                            let source = SourceInfo {
                                year: exam.year,
                                exam_type: exam.exam_type,
                                section_type: section.kind,
                                question_number: sentence.question,
                                sentence_role: sentence.sentence_role,
                                role: Some(ann.role),
                            };
                            state.pattern_map.entry(category).or_default().push(
                                PatternOccurrence {
                                    pattern_subtype: ann.pattern_subtype,
                                    surface: ann.surface.clone(),
                                    sentence: sentence.text.clone(),
                                    source,
                                },
                            );
                        }
                        AnnotationRole::NotablePhrase => {
                            if !is_valid_surface(&ann.surface, &sentence.text) {
                                tracing::warn!(
                                    surface = %ann.surface,
                                    year = exam.year,
                                    question = ?sentence.question,
                                    "skipping phrase not found in sentence"
                                );
                                continue;
                            }
                            if !is_valid_phrase(&ann.surface) {
                                tracing::warn!(
                                    surface = %ann.surface,
                                    year = exam.year,
                                    question = ?sentence.question,
                                    "skipping invalid phrase format"
                                );
                                continue;
                            }
                            let normalized = normalize_phrase(&ann.surface, docs);
                            let source = SourceInfo {
                                year: exam.year,
                                exam_type: exam.exam_type,
                                section_type: section.kind,
                                question_number: sentence.question,
                                sentence_role: sentence.sentence_role,
                                role: Some(ann.role),
                            };
                            state.phrase_map.entry(normalized).or_default().push(
                                PhraseOccurrence {
                                    surface: ann.surface.clone(),
                                    sentence: sentence.text.clone(),
                                    source,
                                },
                            );
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

/// Second pass: tokenize every non-prompt sentence, align tested
/// annotations onto tokens, and count every surviving token.
fn process_sentences(
    exams: &[Exam],
    official: &HashMap<String, OfficialWordEntry>,
    docs: &DocCache,
    state: &mut Extraction,
    progress: Option<ProgressFn<'_>>,
) {
    let mut tasks: Vec<SentenceTask<'_>> = Vec::new();
    for exam in exams {
        for section in &exam.sections {
            for sentence in &section.sentences {
                if sentence.sentence_role == Some(SentenceRole::QuestionPrompt) {
                    continue;
                }
                tasks.push(SentenceTask {
                    year: exam.year,
                    exam_type: exam.exam_type,
                    section_type: section.kind,
                    question: sentence.question,
                    sentence_role: sentence.sentence_role,
                    text: &sentence.text,
                    annotations: &sentence.annotations,
                });
            }
        }
    }

    let texts: Vec<&str> = tasks.iter().map(|t| t.text).collect();
    docs.parse_sentences(&texts);

    let total = tasks.len();
    for (task_idx, task) in tasks.iter().enumerate() {
        let doc = docs.parse(task.text);
        let base_source = SourceInfo {
            year: task.year,
            exam_type: task.exam_type,
            section_type: task.section_type,
            question_number: task.question,
            sentence_role: task.sentence_role,
            role: None,
        };

        // align tested annotations to token indices
        let mut token_annotations: HashMap<usize, (AnnotationRole, &str)> = HashMap::new();
        let mut unmatched: Vec<&Annotation> = Vec::new();
        for ann in task.annotations {
            if !matches!(
                ann.role,
                AnnotationRole::CorrectAnswer
                    | AnnotationRole::Distractor
                    | AnnotationRole::TestedKeyword
            ) {
                continue;
            }
            let spans = doc.find_spans(&ann.surface);
            if spans.is_empty() {
                tracing::warn!(
                    surface = %ann.surface,
                    year = task.year,
                    question = ?task.question,
                    "annotation surface not aligned to sentence"
                );
                unmatched.push(ann);
                continue;
            }
            for span in spans {
                for idx in span.start..span.end {
                    token_annotations
                        .entry(idx)
                        .or_insert((ann.role, ann.surface.as_str()));
                }
            }
        }

        // annotations absent from the sentence (vocabulary options) are
        // tokenized standalone so they still count
        for ann in unmatched {
            let surface_doc = docs.parse(&ann.surface);
            for token in &surface_doc.tokens {
                if token.pos.is_stop_pos() || !token.is_alpha || token.lemma.chars().count() <= 1 {
                    continue;
                }
                if is_foreign_word(&token.lemma) {
                    continue;
                }
                let lemma = state.rewrite_adverb(token.lemma.clone(), token.pos, official);
                state.record_token(
                    lemma,
                    task.text,
                    token.pos,
                    &ann.surface,
                    SourceInfo {
                        role: Some(ann.role),
                        ..base_source.clone()
                    },
                );
            }
        }

        // every token of every sentence
        for &(sent_start, sent_end) in doc.sentence_spans() {
            let sent_text = doc.slice(sent_start, sent_end).to_string();
            for idx in sent_start..sent_end {
                let token = &doc.tokens[idx];
                if token.pos.is_stop_pos()
                    || !token.is_alpha
                    || token.is_stop
                    || token.lemma.chars().count() <= 1
                {
                    continue;
                }
                if is_foreign_word(&token.lemma) {
                    continue;
                }

                let (role, surface) = match token_annotations.get(&idx) {
                    Some((role, surface)) => (Some(*role), (*surface).to_string()),
                    None => (None, token.text.clone()),
                };
                let lemma = state.rewrite_adverb(token.lemma.clone(), token.pos, official);
                state.record_token(
                    lemma,
                    &sent_text,
                    token.pos,
                    &surface,
                    SourceInfo {
                        role,
                        ..base_source.clone()
                    },
                );
            }
        }

        if let Some(cb) = progress {
            if (task_idx + 1) % 200 == 0 {
                cb(task_idx + 1, total, "sentences");
            }
        }
    }
}

/// Translation keywords contribute tested-keyword occurrences with the
/// Chinese prompt as context.
fn process_translation_items(
    exams: &[Exam],
    official: &HashMap<String, OfficialWordEntry>,
    docs: &DocCache,
    state: &mut Extraction,
) {
    let mut keywords: Vec<(&str, i16, ExamType, Option<u32>, &str)> = Vec::new();
    for exam in exams {
        for item in &exam.translation_items {
            for keyword in &item.keywords {
                keywords.push((
                    keyword,
                    exam.year,
                    exam.exam_type,
                    Some(item.question),
                    &item.chinese_prompt,
                ));
            }
        }
    }

    let unique: Vec<&str> = {
        let mut seen = HashSet::new();
        keywords
            .iter()
            .map(|k| k.0)
            .filter(|k| seen.insert(*k))
            .collect()
    };
    docs.parse_surfaces(&unique);

    for (keyword, year, exam_type, question, prompt) in keywords {
        let doc = docs.parse(keyword);
        let source = SourceInfo {
            year,
            exam_type,
            section_type: SectionType::Translation,
            question_number: question,
            role: Some(AnnotationRole::TestedKeyword),
            sentence_role: None,
        };
        for token in &doc.tokens {
            if token.pos.is_stop_pos() || !token.is_alpha || token.lemma.chars().count() <= 1 {
                continue;
            }
            if is_foreign_word(&token.lemma) {
                continue;
            }
            let lemma = state.rewrite_adverb(token.lemma.clone(), token.pos, official);
            if !state.deduper.should_keep(&lemma, prompt, exam_type, year) {
                continue;
            }
            state.counters.entry(lemma.clone()).or_default().add(
                year,
                Some(AnnotationRole::TestedKeyword),
                SectionType::Translation,
                exam_type,
            );
            state.contexts.entry(lemma).or_default().push(ContextSentence {
                text: prompt.to_string(),
                source: source.clone(),
                pos: token.pos.as_str().to_string(),
                surface: keyword.to_string(),
            });
        }
    }
}

/// Essay suggested words contribute untested occurrences with the essay
/// description as context.
fn process_essay_words(
    exams: &[Exam],
    official: &HashMap<String, OfficialWordEntry>,
    docs: &DocCache,
    state: &mut Extraction,
) {
    let mut words: Vec<(&str, i16, ExamType, &str)> = Vec::new();
    for exam in exams {
        for topic in &exam.essay_topics {
            for word in &topic.suggested_words {
                words.push((word, exam.year, exam.exam_type, &topic.description));
            }
        }
    }

    let unique: Vec<&str> = {
        let mut seen = HashSet::new();
        words.iter().map(|w| w.0).filter(|w| seen.insert(*w)).collect()
    };
    docs.parse_surfaces(&unique);

    for (word, year, exam_type, description) in words {
        let doc = docs.parse(word);
        let source = SourceInfo {
            year,
            exam_type,
            section_type: SectionType::Essay,
            question_number: None,
            role: None,
            sentence_role: None,
        };
        for token in &doc.tokens {
            if token.pos.is_stop_pos() || !token.is_alpha || token.lemma.chars().count() <= 1 {
                continue;
            }
            if is_foreign_word(&token.lemma) {
                continue;
            }
            let lemma = state.rewrite_adverb(token.lemma.clone(), token.pos, official);
            if !state.deduper.should_keep(&lemma, description, exam_type, year) {
                continue;
            }
            state.counters.entry(lemma.clone()).or_default().add(
                year,
                None,
                SectionType::Essay,
                exam_type,
            );
            state.contexts.entry(lemma).or_default().push(ContextSentence {
                text: description.to_string(),
                source: source.clone(),
                pos: token.pos.as_str().to_string(),
                surface: word.to_string(),
            });
        }
    }
}

/// Scan every exam sentence for unannotated occurrences of known phrases.
fn backfill_phrase_occurrences(
    exams: &[Exam],
    docs: &DocCache,
    state: &mut Extraction,
    progress: Option<ProgressFn<'_>>,
) {
    if state.phrase_map.is_empty() {
        return;
    }

    let mut matcher = PhraseMatcher::new();
    for phrase in state.phrase_map.keys() {
        matcher.add_phrase(phrase, docs);
    }
    tracing::info!(phrases = state.phrase_map.len(), "backfilling phrase occurrences");

    let mut existing: HashSet<(String, String, i16, Option<u32>)> = HashSet::new();
    for (phrase, occurrences) in &state.phrase_map {
        for occ in occurrences {
            existing.insert((
                phrase.clone(),
                occ.sentence.trim().to_string(),
                occ.source.year,
                occ.source.question_number,
            ));
        }
    }

    let mut sentences: Vec<(&str, i16, ExamType, SectionType, Option<u32>, Option<SentenceRole>)> =
        Vec::new();
    for exam in exams {
        for section in &exam.sections {
            for sentence in &section.sentences {
                if sentence.text.len() < 10 {
                    continue;
                }
                if sentence.sentence_role == Some(SentenceRole::QuestionPrompt) {
                    continue;
                }
                sentences.push((
                    &sentence.text,
                    exam.year,
                    exam.exam_type,
                    section.kind,
                    sentence.question,
                    sentence.sentence_role,
                ));
            }
        }
    }

    let texts: Vec<&str> = sentences.iter().map(|s| s.0).collect();
    docs.parse_sentences(&texts);

    let total = sentences.len();
    let mut new_occurrences = 0usize;
    for (i, (text, year, exam_type, section_type, question, sentence_role)) in
        sentences.into_iter().enumerate()
    {
        if let Some(cb) = progress {
            if (i + 1) % 500 == 0 {
                cb(i + 1, total, "backfill");
            }
        }

        let doc = docs.parse(text);
        for m in matcher.find_matches(&doc) {
            let key = (
                m.phrase.clone(),
                text.trim().to_string(),
                year,
                question,
            );
            if existing.contains(&key) {
                continue;
            }
            existing.insert(key);

            let surface = doc.slice(m.start, m.end).to_string();
            state.phrase_map.get_mut(&m.phrase).unwrap().push(PhraseOccurrence {
                surface,
                sentence: text.to_string(),
                source: SourceInfo {
                    year,
                    exam_type,
                    section_type,
                    question_number: question,
                    role: Some(AnnotationRole::NotablePhrase),
                    sentence_role,
                },
            });
            new_occurrences += 1;
        }
    }
    tracing::info!(added = new_occurrences, "phrase backfill complete");
}

fn dedupe_contexts(contexts: &[ContextSentence]) -> Vec<ContextSentence> {
    let mut sorted: Vec<&ContextSentence> = contexts.iter().collect();
    sorted.sort_by_key(|c| (c.source.exam_type.is_reference(), c.source.year));

    let mut seen: HashSet<(String, i16, Option<u32>)> = HashSet::new();
    let mut primary_seen_fp: HashSet<String> = HashSet::new();
    let mut result = Vec::new();

    for ctx in sorted {
        if cloze_blank_re().is_match(&ctx.text) {
            continue;
        }

        let fp = context_fingerprint(&ctx.text);
        if !fp.is_empty() && primary_seen_fp.contains(&fp) && ctx.source.exam_type.is_reference() {
            continue;
        }

        let key = (
            ctx.text.trim().to_string(),
            ctx.source.year,
            ctx.source.question_number,
        );
        if seen.contains(&key) {
            continue;
        }

        if !fp.is_empty() && !ctx.source.exam_type.is_reference() {
            primary_seen_fp.insert(fp);
        }
        seen.insert(key);
        result.push(ctx.clone());
    }

    result
}

fn dedupe_phrase_occurrences(occurrences: &[PhraseOccurrence]) -> Vec<PhraseOccurrence> {
    let mut seen: HashSet<(String, i16, Option<u32>)> = HashSet::new();
    occurrences
        .iter()
        .filter(|occ| !cloze_blank_re().is_match(&occ.sentence))
        .filter(|occ| {
            seen.insert((
                occ.sentence.trim().to_string(),
                occ.source.year,
                occ.source.question_number,
            ))
        })
        .cloned()
        .collect()
}

fn dedupe_pattern_occurrences(occurrences: &[PatternOccurrence]) -> Vec<PatternOccurrence> {
    let mut seen = HashSet::new();
    occurrences
        .iter()
        .filter(|occ| {
            seen.insert((
                occ.sentence.trim().to_string(),
                occ.source.year,
                occ.source.question_number,
                occ.pattern_subtype,
            ))
        })
        .cloned()
        .collect()
}

/// Domain-specific vocabulary that surfaced once inside a single passage
/// section (and was never tested) is unlikely to recur; reference-only
/// appearances count as zero official years.
fn is_passage_specific_single_year(contexts: &[ContextSentence]) -> bool {
    if contexts.is_empty() {
        return false;
    }

    let primary: Vec<&ContextSentence> = contexts
        .iter()
        .filter(|c| !c.source.exam_type.is_reference())
        .collect();

    if primary.is_empty() {
        let years: HashSet<i16> = contexts.iter().map(|c| c.source.year).collect();
        let sections: HashSet<SectionType> =
            contexts.iter().map(|c| c.source.section_type).collect();
        return years.len() == 1
            && sections.len() == 1
            && sections.iter().next().unwrap().is_passage_section();
    }

    let years: HashSet<i16> = primary.iter().map(|c| c.source.year).collect();
    if years.len() > 1 {
        return false;
    }

    let sections: HashSet<SectionType> = primary.iter().map(|c| c.source.section_type).collect();
    if sections.iter().any(|s| !s.is_passage_section()) {
        return false;
    }

    sections.len() == 1
}

fn finalize(
    state: Extraction,
    official_wordlist: &HashMap<String, OfficialWordEntry>,
    exam_only: bool,
) -> CleanedVocabData {
    let Extraction {
        mut counters,
        contexts,
        phrase_map,
        pattern_map,
        ..
    } = state;

    if !exam_only {
        for word in official_wordlist.keys() {
            counters.entry(word.clone()).or_default();
        }
    }

    let mut words: Vec<CleanedWordEntry> = Vec::new();
    let mut filtered_passage_specific = 0usize;

    let mut lemmas: Vec<&String> = counters.keys().collect();
    lemmas.sort();

    for lemma in lemmas {
        let counter = &counters[lemma];
        let deduped = contexts
            .get(lemma)
            .map(|c| dedupe_contexts(c))
            .unwrap_or_default();

        let official = official_wordlist.get(lemma);
        let in_official = official.is_some();
        let level = official.and_then(|o| o.level);

        if !in_official
            && counter.tested_count() == 0
            && is_passage_specific_single_year(&deduped)
        {
            filtered_passage_specific += 1;
            continue;
        }

        let pos: Vec<String> = if deduped.is_empty() {
            official
                .map(|o| {
                    o.parts_of_speech
                        .iter()
                        .map(|p| normalize_pos_label(p))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        } else {
            let set: HashSet<String> = deduped.iter().map(|c| c.pos.clone()).collect();
            let mut v: Vec<String> = set.into_iter().collect();
            v.sort();
            v
        };
        let pos: Vec<String> = {
            let mut filtered: Vec<String> = pos
                .into_iter()
                .filter(|p| VALID_ENTRY_POS.contains(&p.as_str()))
                .collect();
            filtered.dedup();
            filtered
        };
        if pos.is_empty() {
            continue;
        }

        words.push(CleanedWordEntry {
            lemma: lemma.clone(),
            level,
            in_official_list: in_official,
            pos,
            frequency: counter.to_frequency_data(),
            contexts: deduped,
        });
    }

    let mut phrases: Vec<CleanedPhraseEntry> = Vec::new();
    let mut phrase_keys: Vec<&String> = phrase_map.keys().collect();
    phrase_keys.sort();
    for phrase in phrase_keys {
        let occurrences = dedupe_phrase_occurrences(&phrase_map[phrase]);
        if occurrences.is_empty() {
            continue;
        }

        let mut counter = FrequencyCounter::default();
        let mut phrase_contexts = Vec::new();
        for occ in &occurrences {
            counter.add(
                occ.source.year,
                occ.source.role,
                occ.source.section_type,
                occ.source.exam_type,
            );
            if is_quality_context(&occ.sentence) {
                phrase_contexts.push(ContextSentence {
                    text: occ.sentence.clone(),
                    source: occ.source.clone(),
                    pos: String::new(),
                    surface: occ.surface.clone(),
                });
            }
        }

        phrases.push(CleanedPhraseEntry {
            lemma: phrase.clone(),
            frequency: counter.to_frequency_data(),
            contexts: phrase_contexts,
        });
    }

    let mut patterns: Vec<CleanedPatternEntry> = Vec::new();
    for (category, occurrences) in pattern_map {
        let occurrences = dedupe_pattern_occurrences(&occurrences);
        if occurrences.is_empty() {
            continue;
        }
        patterns.push(CleanedPatternEntry {
            pattern_category: category,
            occurrences,
        });
    }

    if filtered_passage_specific > 0 {
        tracing::info!(
            filtered = filtered_passage_specific,
            "filtered passage-specific incidental words"
        );
    }

    CleanedVocabData {
        words,
        phrases,
        patterns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsatvocab_model::{AnnotatedSentence, AnnotationKind, Section};
    use gsatvocab_nlp::RuleTagger;
    use std::sync::Arc;

    fn docs() -> DocCache {
        DocCache::new(Arc::new(RuleTagger::new()))
    }

    fn word_annotation(surface: &str, role: AnnotationRole) -> Annotation {
        Annotation {
            surface: surface.to_string(),
            kind: AnnotationKind::Word,
            role,
            pattern_category: None,
            pattern_subtype: None,
        }
    }

    fn sentence(text: &str, question: Option<u32>, annotations: Vec<Annotation>) -> AnnotatedSentence {
        AnnotatedSentence {
            text: text.to_string(),
            question,
            sentence_role: None,
            annotations,
            mixed_question_type: None,
            acceptable_answers: None,
        }
    }

    fn exam(year: i16, exam_type: ExamType, sections: Vec<Section>) -> Exam {
        Exam {
            year,
            exam_type,
            sections,
            essay_topics: vec![],
            translation_items: vec![],
        }
    }

    fn wordlist(entries: &[(&str, &[&str], u8)]) -> HashMap<String, OfficialWordEntry> {
        entries
            .iter()
            .map(|(word, pos, level)| {
                (
                    word.to_string(),
                    OfficialWordEntry {
                        word: word.to_string(),
                        parts_of_speech: pos.iter().map(|p| p.to_string()).collect(),
                        level: Some(*level),
                    },
                )
            })
            .collect()
    }

    fn find_word<'a>(data: &'a CleanedVocabData, lemma: &str) -> &'a CleanedWordEntry {
        data.words
            .iter()
            .find(|w| w.lemma == lemma)
            .unwrap_or_else(|| panic!("word entry {lemma} missing"))
    }

    #[test]
    fn vocabulary_question_counts_answer_and_distractors() {
        let text = "Not satisfied with the first draft of her essay, Mary revised it several times.";
        let exams = vec![exam(
            113,
            ExamType::Gsat,
            vec![Section {
                kind: SectionType::Vocabulary,
                sentences: vec![sentence(
                    text,
                    Some(1),
                    vec![
                        word_annotation("draft", AnnotationRole::CorrectAnswer),
                        word_annotation("text", AnnotationRole::Distractor),
                        word_annotation("brush", AnnotationRole::Distractor),
                        word_annotation("plot", AnnotationRole::Distractor),
                    ],
                )],
            }],
        )];
        let list = wordlist(&[
            ("draft", &["n.", "v."], 4),
            ("text", &["n."], 2),
            ("brush", &["n.", "v."], 2),
            ("plot", &["n."], 4),
        ]);

        let data = clean_and_aggregate(&exams, &list, &docs(), true, None);

        let draft = find_word(&data, "draft");
        assert!(draft.frequency.tested_count >= 1);
        assert_eq!(
            draft
                .contexts
                .iter()
                .filter(|c| c.text == text)
                .count(),
            1
        );
        assert!(draft.pos.contains(&"NOUN".to_string()));

        for distractor in ["text", "brush", "plot"] {
            let entry = find_word(&data, distractor);
            assert_eq!(entry.frequency.by_role["distractor"], 1, "{distractor}");
            assert!(entry.contexts.is_empty(), "{distractor} should have no contexts");
        }
    }

    #[test]
    fn cross_variant_recycling_keeps_official_context_once() {
        let text = "The committee spent weeks preparing the final report for review.";
        let make = |exam_type| {
            exam(
                115,
                exam_type,
                vec![Section {
                    kind: SectionType::Reading,
                    sentences: vec![sentence(text, Some(30), vec![])],
                }],
            )
        };
        let exams = vec![make(ExamType::GsatRef), make(ExamType::Gsat)];
        let list = wordlist(&[("committee", &["n."], 3)]);

        let data = clean_and_aggregate(&exams, &list, &docs(), true, None);
        let committee = find_word(&data, "committee");

        assert_eq!(committee.contexts.len(), 1);
        assert_eq!(committee.contexts[0].source.exam_type, ExamType::Gsat);
        assert_eq!(
            committee
                .frequency
                .years
                .iter()
                .filter(|y| **y == 115)
                .count(),
            1
        );
    }

    #[test]
    fn phrase_backfill_finds_unannotated_occurrences() {
        let annotated = "Writers often draw on their own childhood memories for ideas.";
        let unannotated = "She drew heavily on her memory of that summer to answer.";
        let exams = vec![
            exam(
                112,
                ExamType::Gsat,
                vec![Section {
                    kind: SectionType::Cloze,
                    sentences: vec![sentence(
                        annotated,
                        Some(5),
                        vec![Annotation {
                            surface: "draw on".to_string(),
                            kind: AnnotationKind::Phrase,
                            role: AnnotationRole::NotablePhrase,
                            pattern_category: None,
                            pattern_subtype: None,
                        }],
                    )],
                }],
            ),
            exam(
                113,
                ExamType::Gsat,
                vec![Section {
                    kind: SectionType::Reading,
                    sentences: vec![sentence(unannotated, Some(40), vec![])],
                }],
            ),
        ];

        let data = clean_and_aggregate(&exams, &HashMap::new(), &docs(), true, None);
        let phrase = data
            .phrases
            .iter()
            .find(|p| p.lemma == "draw on")
            .expect("phrase entry missing");

        assert_eq!(phrase.frequency.total_appearances, 2);
        let sentences: Vec<&str> = phrase.contexts.iter().map(|c| c.text.as_str()).collect();
        assert!(sentences.contains(&annotated));
        assert!(sentences.contains(&unannotated));
    }

    #[test]
    fn short_sentences_are_never_contexts() {
        let exams = vec![exam(
            113,
            ExamType::Gsat,
            vec![Section {
                kind: SectionType::Vocabulary,
                sentences: vec![sentence("Mary revised drafts.", Some(1), vec![])],
            }],
        )];
        let list = wordlist(&[("draft", &["n."], 4)]);
        let data = clean_and_aggregate(&exams, &list, &docs(), true, None);
        let draft = find_word(&data, "draft");
        assert!(draft.frequency.total_appearances >= 1);
        assert!(draft.contexts.is_empty());
    }

    #[test]
    fn question_prompts_are_skipped() {
        let mut prompt = sentence("Which of the following is the best answer for the blank below?", Some(1), vec![]);
        prompt.sentence_role = Some(SentenceRole::QuestionPrompt);
        let exams = vec![exam(
            113,
            ExamType::Gsat,
            vec![Section {
                kind: SectionType::Reading,
                sentences: vec![prompt],
            }],
        )];
        let data = clean_and_aggregate(&exams, &HashMap::new(), &docs(), true, None);
        assert!(data.words.iter().all(|w| w.lemma != "blank" && w.lemma != "answer"));
    }

    #[test]
    fn passage_specific_single_year_words_are_filtered() {
        let text = "The chef added fresh kale and spinach to the salad before serving.";
        let exams = vec![exam(
            113,
            ExamType::Gsat,
            vec![Section {
                kind: SectionType::Reading,
                sentences: vec![sentence(text, Some(41), vec![])],
            }],
        )];
        // kale is not in the official list and never tested
        let list = wordlist(&[("salad", &["n."], 2)]);
        let data = clean_and_aggregate(&exams, &list, &docs(), true, None);

        assert!(data.words.iter().all(|w| w.lemma != "kale"));
        // official-list words survive the same filter
        assert!(data.words.iter().any(|w| w.lemma == "salad"));
    }

    #[test]
    fn official_wordlist_words_emitted_without_contexts() {
        let list = wordlist(&[("abandon", &["v."], 4)]);
        let data = clean_and_aggregate(&[], &list, &docs(), false, None);
        let abandon = find_word(&data, "abandon");
        assert_eq!(abandon.frequency.total_appearances, 0);
        assert!(abandon.in_official_list);
        assert_eq!(abandon.pos, vec!["VERB".to_string()]);

        // exam_only drops wordlist-only lemmas
        let data = clean_and_aggregate(&[], &list, &docs(), true, None);
        assert!(data.words.is_empty());
    }
}
