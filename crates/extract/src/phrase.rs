//! Phrase surface validation, normalization, and the backfill matcher.

use std::sync::OnceLock;

use regex::Regex;

use gsatvocab_nlp::{DocCache, ParsedDoc, Pos};

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w\s]+:").unwrap())
}

fn clause_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\w+/\w+-clause").unwrap())
}

fn embedded_proper_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z][a-z]+\s+[A-Z]").unwrap())
}

fn article_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(a|an|the|this|that|these|those|my|your|his|her|its|our|their)\s").unwrap()
    })
}

fn noun_of_noun_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\w+\s+of\s+\w+$").unwrap())
}

/// Compositional noun phrases that carry no idiomatic content.
const COMPOSITIONAL_STOPLIST: &[&str] = &[
    "a lot of",
    "a cup of",
    "a piece of",
    "a kind of",
    "a type of",
    "a sort of",
    "a bit of",
    "a number of",
    "a series of",
    "a variety of",
];

fn strip_punct_and_quotes(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '.' | ',' | '!' | '?' | ';' | ':'))
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Check that an annotation surface actually occurs in its carrying
/// sentence. Grammar-label surfaces (`S + V: ...`, `that/wh-clause`) are
/// rejected outright; ellipsis surfaces match when every part occurs.
pub fn is_valid_surface(surface: &str, sentence: &str) -> bool {
    if label_re().is_match(surface) || clause_label_re().is_match(surface) {
        return false;
    }

    let surface_lower = surface.to_lowercase();
    let sentence_lower = sentence.to_lowercase();

    if sentence_lower.contains(&surface_lower) {
        return true;
    }
    if strip_punct_and_quotes(&sentence_lower).contains(&strip_punct_and_quotes(&surface_lower)) {
        return true;
    }

    if surface_lower.contains("...") || surface_lower.contains('\u{2026}') {
        let parts: Vec<&str> = surface_lower
            .split(|c| c == '\u{2026}')
            .flat_map(|chunk| chunk.split("..."))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if !parts.is_empty() && parts.iter().all(|p| sentence_lower.contains(p)) {
            return true;
        }
    }

    false
}

/// Shape check for phrase surfaces: 2-6 tokens, no embedded quotes or
/// sentence-like content, no bare article+of constructions, not in the
/// compositional stoplist.
pub fn is_valid_phrase(surface: &str) -> bool {
    if surface.contains('"') || surface.contains('\u{201c}') || surface.contains('\u{201d}') {
        return false;
    }

    let has_apostrophe =
        surface.contains('\'') || surface.contains('\u{2018}') || surface.contains('\u{2019}');
    if has_apostrophe {
        static POSSESSIVE_RE: OnceLock<Regex> = OnceLock::new();
        let re = POSSESSIVE_RE
            .get_or_init(|| Regex::new(r"^[\w\s]+['\u{2018}\u{2019}][\w\s]+$").unwrap());
        if !re.is_match(surface) {
            return false;
        }
    }

    if surface.len() > 50 {
        return false;
    }

    let words: Vec<&str> = surface.split_whitespace().collect();
    if words.len() < 2 || words.len() > 6 {
        return false;
    }

    if embedded_proper_re().is_match(surface) {
        return false;
    }

    let lower = surface.to_lowercase();
    if article_prefix_re().is_match(&lower) {
        let clean = article_prefix_re().replace(&lower, "").to_string();
        let clean_words: Vec<&str> = clean.split_whitespace().collect();
        if clean_words.len() < 2 {
            return false;
        }
        if noun_of_noun_re().is_match(&clean) {
            return false;
        }
    }

    !COMPOSITIONAL_STOPLIST.contains(&lower.as_str())
}

/// Normalize a phrase surface to its canonical form: auxiliaries dropped,
/// verbs lemmatized, everything else lowercased.
pub fn normalize_phrase(surface: &str, docs: &DocCache) -> String {
    let doc = docs.parse(surface);
    let mut parts: Vec<String> = Vec::new();
    for token in &doc.tokens {
        match token.pos {
            Pos::Aux => continue,
            Pos::Verb => parts.push(token.lemma.clone()),
            Pos::Punct => continue,
            _ => parts.push(token.text.to_lowercase()),
        }
    }
    parts.join(" ")
}

/// One element of a backfill pattern.
#[derive(Debug, Clone)]
enum PatternElem {
    /// Verb matched by lemma.
    Lemma(String),
    /// Literal lowercase token text.
    Lower(String),
    /// Zero or one interstitial adverb.
    OptionalAdv,
    /// Any determiner.
    AnyDet,
}

#[derive(Debug, Clone)]
struct PhrasePattern {
    phrase: String,
    elems: Vec<PatternElem>,
}

/// Matcher over all known phrases, scanned against every exam sentence to
/// recover occurrences the annotator missed.
#[derive(Debug, Default)]
pub struct PhraseMatcher {
    patterns: Vec<PhrasePattern>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseMatch {
    pub phrase: String,
    /// Token index range of the match.
    pub start: usize,
    pub end: usize,
}

impl PhraseMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register patterns for one normalized phrase. Verb-initial phrases
    /// match by verb lemma with literal particles and allow one
    /// interstitial adverb; other phrases match literally, with a
    /// determiner-generalized variant for article-initial phrases.
    pub fn add_phrase(&mut self, phrase: &str, docs: &DocCache) {
        let doc = docs.parse(phrase);
        let tokens: Vec<_> = doc
            .tokens
            .iter()
            .filter(|t| t.pos != Pos::Punct && !t.text.trim().is_empty())
            .collect();
        if tokens.len() < 2 {
            return;
        }

        let first = tokens[0];
        let rest = &tokens[1..];

        if matches!(first.pos, Pos::Verb | Pos::Aux) {
            let verb_lemma = first.lemma.to_lowercase();
            let particles: Vec<String> = rest.iter().map(|t| t.text.to_lowercase()).collect();

            let mut base = vec![PatternElem::Lemma(verb_lemma.clone())];
            base.extend(particles.iter().cloned().map(PatternElem::Lower));
            self.patterns.push(PhrasePattern {
                phrase: phrase.to_string(),
                elems: base,
            });

            if particles.len() == 1 {
                self.patterns.push(PhrasePattern {
                    phrase: phrase.to_string(),
                    elems: vec![
                        PatternElem::Lemma(verb_lemma),
                        PatternElem::OptionalAdv,
                        PatternElem::Lower(particles[0].clone()),
                    ],
                });
            } else if particles.len() == 2 {
                self.patterns.push(PhrasePattern {
                    phrase: phrase.to_string(),
                    elems: vec![
                        PatternElem::Lemma(verb_lemma),
                        PatternElem::Lower(particles[0].clone()),
                        PatternElem::OptionalAdv,
                        PatternElem::Lower(particles[1].clone()),
                    ],
                });
            }
        } else {
            let elems: Vec<PatternElem> = tokens
                .iter()
                .map(|t| PatternElem::Lower(t.text.to_lowercase()))
                .collect();
            self.patterns.push(PhrasePattern {
                phrase: phrase.to_string(),
                elems,
            });

            if first.pos == Pos::Det && tokens.len() >= 3 {
                let mut elems = vec![PatternElem::AnyDet];
                elems.extend(
                    tokens[1..]
                        .iter()
                        .map(|t| PatternElem::Lower(t.text.to_lowercase())),
                );
                self.patterns.push(PhrasePattern {
                    phrase: phrase.to_string(),
                    elems,
                });
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// All pattern matches in a parsed sentence, deduplicated by span.
    pub fn find_matches(&self, doc: &ParsedDoc) -> Vec<PhraseMatch> {
        let mut matches: Vec<PhraseMatch> = Vec::new();
        let mut seen_spans: Vec<(usize, usize)> = Vec::new();

        for pattern in &self.patterns {
            for start in 0..doc.tokens.len() {
                if let Some(end) = match_at(&pattern.elems, doc, start) {
                    if seen_spans.contains(&(start, end)) {
                        continue;
                    }
                    seen_spans.push((start, end));
                    matches.push(PhraseMatch {
                        phrase: pattern.phrase.clone(),
                        start,
                        end,
                    });
                }
            }
        }
        matches
    }
}

fn match_at(elems: &[PatternElem], doc: &ParsedDoc, start: usize) -> Option<usize> {
    let mut i = start;
    for elem in elems {
        match elem {
            PatternElem::Lemma(lemma) => {
                let token = doc.tokens.get(i)?;
                if token.lemma != *lemma {
                    return None;
                }
                i += 1;
            }
            PatternElem::Lower(text) => {
                let token = doc.tokens.get(i)?;
                if token.text.to_lowercase() != *text {
                    return None;
                }
                i += 1;
            }
            PatternElem::OptionalAdv => {
                if doc.tokens.get(i).is_some_and(|t| t.pos == Pos::Adv) {
                    i += 1;
                }
            }
            PatternElem::AnyDet => {
                let token = doc.tokens.get(i)?;
                if token.pos != Pos::Det {
                    return None;
                }
                i += 1;
            }
        }
    }
    Some(i)
}
