//! Tokenization and POS tagging.
//!
//! [`Tagger`] is the seam a transformer backend plugs into; [`RuleTagger`]
//! is the built-in backend: closed-class lexicon, suffix heuristics, and a
//! light contextual repair pass. It is deterministic, allocation-light, and
//! good enough for span alignment and stop-POS filtering; sense-level POS
//! decisions downstream always tolerate a missing or wrong tag.

use crate::lemma::lemmatize;
use crate::lexicon;
use crate::pos::Pos;

#[derive(Debug, Clone)]
pub struct RawToken {
    pub text: String,
    pub lemma: String,
    pub pos: Pos,
    /// Byte offsets into the source text.
    pub start: usize,
    pub end: usize,
}

pub trait Tagger: Send + Sync {
    fn tag(&self, text: &str) -> Vec<RawToken>;

    /// Tag many texts in one call. Backends with per-call setup cost
    /// override this; the default just loops.
    fn tag_batch(&self, texts: &[&str]) -> Vec<Vec<RawToken>> {
        texts.iter().map(|t| self.tag(t)).collect()
    }
}

#[derive(Debug, Default)]
pub struct RuleTagger;

impl RuleTagger {
    pub fn new() -> Self {
        Self
    }
}

impl Tagger for RuleTagger {
    fn tag(&self, text: &str) -> Vec<RawToken> {
        let pieces = tokenize(text);
        let mut tags: Vec<Pos> = Vec::with_capacity(pieces.len());

        for (i, piece) in pieces.iter().enumerate() {
            let sentence_initial = i == 0 || is_sentence_end(&pieces[i - 1].0);
            let prev = if i > 0 { Some(tags[i - 1]) } else { None };
            tags.push(initial_tag(&piece.0, sentence_initial, prev));
        }

        repair_tags(&pieces, &mut tags);

        pieces
            .into_iter()
            .zip(tags)
            .map(|((text, start, end), pos)| {
                let lemma = lemmatize(&text, pos);
                RawToken {
                    text,
                    lemma,
                    pos,
                    start,
                    end,
                }
            })
            .collect()
    }
}

fn is_sentence_end(token: &str) -> bool {
    matches!(token, "." | "!" | "?")
}

/// Split raw text into (token, start, end) pieces with byte offsets.
/// Contraction suffixes (`n't`, `'s`, `'ll`, ...) become separate tokens.
fn tokenize(text: &str) -> Vec<(String, usize, usize)> {
    let mut out: Vec<(String, usize, usize)> = Vec::new();
    let bytes = text.char_indices().collect::<Vec<_>>();
    let mut i = 0;

    while i < bytes.len() {
        let (start, c) = bytes[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_alphabetic() {
            let mut j = i;
            while j < bytes.len() {
                let ch = bytes[j].1;
                if ch.is_alphanumeric() || ch == '\'' || ch == '\u{2019}' || ch == '-' {
                    j += 1;
                } else {
                    break;
                }
            }
            let end = if j < bytes.len() {
                bytes[j].0
            } else {
                text.len()
            };
            let word = &text[start..end];
            split_contraction(word, start, &mut out);
            i = j;
            continue;
        }

        if c.is_ascii_digit() {
            let mut j = i;
            while j < bytes.len() {
                let ch = bytes[j].1;
                if ch.is_ascii_digit() || ch == ',' || ch == '.' {
                    j += 1;
                } else {
                    break;
                }
            }
            let end = if j < bytes.len() {
                bytes[j].0
            } else {
                text.len()
            };
            // trailing punctuation belongs to the sentence, not the number
            let mut num = &text[start..end];
            while num.ends_with('.') || num.ends_with(',') {
                num = &num[..num.len() - 1];
            }
            let end = start + num.len();
            out.push((num.to_string(), start, end));
            i += num.chars().count();
            continue;
        }

        let end = start + c.len_utf8();
        out.push((c.to_string(), start, end));
        i += 1;
    }

    out
}

const CONTRACTION_SUFFIXES: &[&str] = &["n't", "n\u{2019}t", "'s", "\u{2019}s", "'re", "'ve", "'ll", "'d", "'m"];

fn split_contraction(word: &str, start: usize, out: &mut Vec<(String, usize, usize)>) {
    for suffix in CONTRACTION_SUFFIXES {
        if word.len() > suffix.len() {
            if let Some(stem) = word.strip_suffix(suffix) {
                let split_at = start + stem.len();
                out.push((stem.to_string(), start, split_at));
                out.push((suffix.to_string(), split_at, start + word.len()));
                return;
            }
        }
    }
    out.push((word.to_string(), start, start + word.len()));
}

fn initial_tag(token: &str, sentence_initial: bool, prev: Option<Pos>) -> Pos {
    let lower = token.to_lowercase();
    let lower = lower.replace('\u{2019}', "'");

    if !token.chars().any(|c| c.is_alphanumeric()) {
        return if token.chars().all(|c| c.is_ascii_punctuation() || !c.is_ascii()) {
            Pos::Punct
        } else {
            Pos::Sym
        };
    }
    if token.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
        return Pos::Num;
    }
    if !token.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '\u{2019}' || c == '-') {
        return Pos::Other;
    }

    match lower.as_str() {
        "n't" | "not" | "'s" => return Pos::Part,
        "'re" | "'ve" | "'ll" | "'d" | "'m" => return Pos::Aux,
        "to" => {
            // infinitive marker by default, preposition after motion is
            // indistinguishable without a parse; both are stop POS
            return Pos::Part;
        }
        _ => {}
    }

    if lexicon::auxiliaries().contains(lower.as_str()) {
        return Pos::Aux;
    }
    if lexicon::determiners().contains(lower.as_str()) {
        return Pos::Det;
    }
    if lexicon::pronouns().contains(lower.as_str()) {
        return Pos::Pron;
    }
    if lexicon::prepositions().contains(lower.as_str()) {
        return Pos::Adp;
    }
    if lexicon::coord_conjunctions().contains(lower.as_str()) {
        return Pos::Cconj;
    }
    if lexicon::subord_conjunctions().contains(lower.as_str()) {
        return Pos::Sconj;
    }
    if lexicon::number_words().contains(lower.as_str()) {
        return Pos::Num;
    }

    // capitalized mid-sentence → proper noun
    if !sentence_initial && token.chars().next().is_some_and(|c| c.is_uppercase()) {
        return Pos::Propn;
    }

    if lower.len() > 3 && lower.ends_with("ly") {
        return Pos::Adv;
    }

    if lexicon::common_verbs().contains(lower.as_str()) {
        return Pos::Verb;
    }
    if crate::lemma::lemmatize(&lower, Pos::Verb) != lower
        && lexicon::common_verbs().contains(crate::lemma::lemmatize(&lower, Pos::Verb).as_str())
    {
        // inflected form of a known verb (drew, strikes, revised)
        return Pos::Verb;
    }

    suffix_tag(&lower, prev)
}

fn suffix_tag(lower: &str, prev: Option<Pos>) -> Pos {
    const NOUN_SUFFIXES: &[&str] = &[
        "tion", "sion", "ment", "ness", "ity", "ance", "ence", "ship", "hood", "ism", "ology",
        "graphy",
    ];
    const ADJ_SUFFIXES: &[&str] = &[
        "ous", "ful", "less", "able", "ible", "ive", "ical", "ish", "ary",
    ];
    const VERB_SUFFIXES: &[&str] = &["ize", "ise", "ify"];

    for s in NOUN_SUFFIXES {
        if lower.len() > s.len() + 2 && lower.ends_with(s) {
            return Pos::Noun;
        }
    }
    for s in ADJ_SUFFIXES {
        if lower.len() > s.len() + 2 && lower.ends_with(s) {
            return Pos::Adj;
        }
    }
    for s in VERB_SUFFIXES {
        if lower.len() > s.len() + 2 && lower.ends_with(s) {
            return Pos::Verb;
        }
    }

    if lower.len() > 4 && lower.ends_with("ing") {
        return match prev {
            Some(Pos::Det) | Some(Pos::Adj) => Pos::Noun,
            _ => Pos::Verb,
        };
    }
    if lower.len() > 3 && lower.ends_with("ed") {
        return Pos::Verb;
    }

    Pos::Noun
}

/// Contextual repair: fix the common noun/verb confusions the lexicon pass
/// cannot see.
fn repair_tags(pieces: &[(String, usize, usize)], tags: &mut [Pos]) {
    for i in 0..tags.len() {
        let prev = if i > 0 { Some(tags[i - 1]) } else { None };

        // "the cook", "her draft": verb-list words after a determiner or
        // adjective are nouns, unless clearly inflected as verbs
        if tags[i] == Pos::Verb
            && matches!(prev, Some(Pos::Det) | Some(Pos::Adj) | Some(Pos::Num))
        {
            let lower = pieces[i].0.to_lowercase();
            if lexicon::common_verbs().contains(lower.as_str()) {
                tags[i] = Pos::Noun;
            }
        }

        // "to draft", "will draft": nouns after an infinitive marker or a
        // bare auxiliary are verbs
        if tags[i] == Pos::Noun {
            let prev_lower = i.checked_sub(1).map(|j| pieces[j].0.to_lowercase());
            let after_to = prev_lower.as_deref() == Some("to");
            let after_modal = matches!(prev, Some(Pos::Aux));
            if after_to || after_modal {
                tags[i] = Pos::Verb;
            }
        }
    }
}
