//! Parsed documents: tokens, sentence boundaries, and surface-to-span
//! alignment.

use crate::lexicon::stopwords;
use crate::pos::Pos;
use crate::tagger::RawToken;

#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub lemma: String,
    pub pos: Pos,
    /// Byte offsets into [`ParsedDoc::text`].
    pub start: usize,
    pub end: usize,
    pub is_alpha: bool,
    pub is_stop: bool,
}

/// Half-open token index range within a [`ParsedDoc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[derive(Debug, Clone)]
pub struct ParsedDoc {
    pub text: String,
    pub tokens: Vec<Token>,
    /// Token index ranges of the sentences, in order.
    sentences: Vec<(usize, usize)>,
}

/// Words a trailing period usually abbreviates rather than ends a sentence.
const ABBREVIATIONS: &[&str] = &["mr", "mrs", "ms", "dr", "prof", "st", "vs", "etc", "no"];

impl ParsedDoc {
    pub fn new(text: impl Into<String>, raw: Vec<RawToken>) -> Self {
        let text = text.into();
        let stops = stopwords();
        let tokens: Vec<Token> = raw
            .into_iter()
            .map(|t| {
                let is_alpha = !t.text.is_empty() && t.text.chars().all(|c| c.is_alphabetic());
                let is_stop = stops.contains(t.text.to_lowercase().as_str())
                    || stops.contains(t.lemma.as_str());
                Token {
                    text: t.text,
                    lemma: t.lemma,
                    pos: t.pos,
                    start: t.start,
                    end: t.end,
                    is_alpha,
                    is_stop,
                }
            })
            .collect();
        let sentences = segment(&tokens);
        Self {
            text,
            tokens,
            sentences,
        }
    }

    pub fn sentence_spans(&self) -> &[(usize, usize)] {
        &self.sentences
    }

    /// Source text slice covered by a token range, trimmed.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        if start >= end || start >= self.tokens.len() {
            return "";
        }
        let end = end.min(self.tokens.len());
        let from = self.tokens[start].start;
        let to = self.tokens[end - 1].end;
        self.text[from..to].trim()
    }

    pub fn span_text(&self, span: Span) -> &str {
        self.slice(span.start, span.end)
    }

    /// Find token spans corresponding to an annotation surface. Tries, in
    /// order: case-insensitive substring match expanded to token
    /// boundaries; single-token text or lemma equality; contiguous
    /// multi-token text equality. Empty only when all three fail.
    pub fn find_spans(&self, surface: &str) -> Vec<Span> {
        let surface = surface.trim();
        if surface.is_empty() {
            return Vec::new();
        }

        // 1. char-level search, expanded to overlapping tokens
        let mut spans = Vec::new();
        for (match_start, match_end) in ascii_find_all(&self.text, surface) {
            if let Some(span) = self.char_range_to_span(match_start, match_end) {
                if !spans.contains(&span) {
                    spans.push(span);
                }
            }
        }
        if !spans.is_empty() {
            return spans;
        }

        let surface_lower = surface.to_lowercase();

        // 2. single-token text or lemma equality
        for (i, token) in self.tokens.iter().enumerate() {
            if token.text.to_lowercase() == surface_lower || token.lemma == surface_lower {
                return vec![Span {
                    start: i,
                    end: i + 1,
                }];
            }
        }

        // 3. contiguous multi-token text equality
        let words: Vec<&str> = surface_lower.split_whitespace().collect();
        if words.len() > 1 {
            let n = self.tokens.len();
            for i in 0..n.saturating_sub(words.len() - 1) {
                let window = &self.tokens[i..i + words.len()];
                if window
                    .iter()
                    .zip(&words)
                    .all(|(t, w)| t.text.to_lowercase() == **w)
                {
                    return vec![Span {
                        start: i,
                        end: i + words.len(),
                    }];
                }
            }
        }

        Vec::new()
    }

    fn char_range_to_span(&self, start: usize, end: usize) -> Option<Span> {
        let first = self.tokens.iter().position(|t| t.end > start)?;
        let mut last = first;
        for (i, token) in self.tokens.iter().enumerate().skip(first) {
            if token.start < end {
                last = i;
            } else {
                break;
            }
        }
        if self.tokens[first].start >= end {
            return None;
        }
        Some(Span {
            start: first,
            end: last + 1,
        })
    }
}

/// ASCII case-insensitive substring search returning all byte ranges.
fn ascii_find_all(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    let hay = haystack.as_bytes();
    let needle_bytes = needle.as_bytes();
    if needle_bytes.is_empty() || needle_bytes.len() > hay.len() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for start in 0..=(hay.len() - needle_bytes.len()) {
        if !haystack.is_char_boundary(start) {
            continue;
        }
        let window = &hay[start..start + needle_bytes.len()];
        if window.eq_ignore_ascii_case(needle_bytes)
            && haystack.is_char_boundary(start + needle_bytes.len())
        {
            out.push((start, start + needle_bytes.len()));
        }
    }
    out
}

fn segment(tokens: &[Token]) -> Vec<(usize, usize)> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for i in 0..tokens.len() {
        let text = tokens[i].text.as_str();
        if !matches!(text, "." | "!" | "?") {
            continue;
        }
        // abbreviation periods do not end sentences
        if text == "." {
            if let Some(prev) = i.checked_sub(1).map(|j| &tokens[j]) {
                let prev_lower = prev.text.to_lowercase();
                if prev.text.chars().count() == 1 && prev.is_alpha {
                    continue;
                }
                if ABBREVIATIONS.contains(&prev_lower.as_str()) {
                    continue;
                }
            }
        }
        // require the next token to plausibly start a sentence
        if let Some(next) = tokens.get(i + 1) {
            let starts_upper = next
                .text
                .chars()
                .next()
                .is_some_and(|c| c.is_uppercase() || c == '"' || c == '\u{201c}');
            if !starts_upper && next.pos != Pos::Punct {
                continue;
            }
        }
        sentences.push((start, i + 1));
        start = i + 1;
    }

    if start < tokens.len() {
        sentences.push((start, tokens.len()));
    }
    if sentences.is_empty() && !tokens.is_empty() {
        sentences.push((0, tokens.len()));
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::{RuleTagger, Tagger};

    fn parse(text: &str) -> ParsedDoc {
        let tagger = RuleTagger::new();
        ParsedDoc::new(text, tagger.tag(text))
    }

    #[test]
    fn find_spans_substring() {
        let doc = parse("Not satisfied with the first draft of her essay, Mary revised it.");
        let spans = doc.find_spans("draft");
        assert_eq!(spans.len(), 1);
        assert_eq!(doc.span_text(spans[0]), "draft");
    }

    #[test]
    fn find_spans_multiword() {
        let doc = parse("He succeeded by virtue of hard work.");
        let spans = doc.find_spans("by virtue of");
        assert_eq!(spans.len(), 1);
        assert_eq!(doc.span_text(spans[0]), "by virtue of");
        assert_eq!(spans[0].len(), 3);
    }

    #[test]
    fn find_spans_lemma_fallback() {
        let doc = parse("She drew heavily on her memory.");
        // "draw" never appears literally, single-token lemma match kicks in
        let spans = doc.find_spans("draw");
        assert_eq!(spans.len(), 1);
        assert_eq!(doc.span_text(spans[0]), "drew");
    }

    #[test]
    fn find_spans_missing_surface() {
        let doc = parse("A completely unrelated sentence.");
        assert!(doc.find_spans("draft").is_empty());
    }

    #[test]
    fn case_insensitive_match() {
        let doc = parse("DRAFT versions differ.");
        let spans = doc.find_spans("draft");
        assert!(!spans.is_empty());
    }

    #[test]
    fn sentence_segmentation() {
        let doc = parse("This is one. This is two! Is this three?");
        assert_eq!(doc.sentence_spans().len(), 3);
        let (s, e) = doc.sentence_spans()[1];
        assert_eq!(doc.slice(s, e), "This is two!");
    }

    #[test]
    fn abbreviation_does_not_split() {
        let doc = parse("Dr. Smith arrived late. He apologized.");
        assert_eq!(doc.sentence_spans().len(), 2);
    }

    #[test]
    fn stopwords_flagged() {
        let doc = parse("The draft was ready.");
        let the = &doc.tokens[0];
        assert!(the.is_stop);
        let draft = doc.tokens.iter().find(|t| t.text == "draft").unwrap();
        assert!(!draft.is_stop);
    }
}
