//! English lemmatization: irregular form tables plus suffix-stripping rules.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::lexicon::common_verbs;
use crate::pos::Pos;

/// Irregular verb forms (past, participle, 3sg where irregular) → base.
const IRREGULAR_VERBS: &[(&str, &str)] = &[
    ("arose", "arise"),
    ("arisen", "arise"),
    ("ate", "eat"),
    ("eaten", "eat"),
    ("awoke", "awake"),
    ("awoken", "awake"),
    ("bore", "bear"),
    ("born", "bear"),
    ("borne", "bear"),
    ("beat", "beat"),
    ("beaten", "beat"),
    ("became", "become"),
    ("become", "become"),
    ("began", "begin"),
    ("begun", "begin"),
    ("bent", "bend"),
    ("bet", "bet"),
    ("bit", "bite"),
    ("bitten", "bite"),
    ("bled", "bleed"),
    ("blew", "blow"),
    ("blown", "blow"),
    ("broke", "break"),
    ("broken", "break"),
    ("brought", "bring"),
    ("built", "build"),
    ("burnt", "burn"),
    ("bought", "buy"),
    ("caught", "catch"),
    ("chose", "choose"),
    ("chosen", "choose"),
    ("came", "come"),
    ("cost", "cost"),
    ("crept", "creep"),
    ("cut", "cut"),
    ("dealt", "deal"),
    ("dug", "dig"),
    ("did", "do"),
    ("done", "do"),
    ("drew", "draw"),
    ("drawn", "draw"),
    ("dreamt", "dream"),
    ("drank", "drink"),
    ("drunk", "drink"),
    ("drove", "drive"),
    ("driven", "drive"),
    ("fell", "fall"),
    ("fallen", "fall"),
    ("fed", "feed"),
    ("felt", "feel"),
    ("fought", "fight"),
    ("found", "find"),
    ("fled", "flee"),
    ("flew", "fly"),
    ("flown", "fly"),
    ("forbade", "forbid"),
    ("forbidden", "forbid"),
    ("forgot", "forget"),
    ("forgotten", "forget"),
    ("forgave", "forgive"),
    ("forgiven", "forgive"),
    ("froze", "freeze"),
    ("frozen", "freeze"),
    ("got", "get"),
    ("gotten", "get"),
    ("gave", "give"),
    ("given", "give"),
    ("went", "go"),
    ("gone", "go"),
    ("goes", "go"),
    ("grew", "grow"),
    ("grown", "grow"),
    ("hung", "hang"),
    ("heard", "hear"),
    ("hid", "hide"),
    ("hidden", "hide"),
    ("hit", "hit"),
    ("held", "hold"),
    ("hurt", "hurt"),
    ("kept", "keep"),
    ("knelt", "kneel"),
    ("knew", "know"),
    ("known", "know"),
    ("laid", "lay"),
    ("led", "lead"),
    ("leant", "lean"),
    ("leapt", "leap"),
    ("learnt", "learn"),
    ("left", "leave"),
    ("lent", "lend"),
    ("let", "let"),
    ("lay", "lie"),
    ("lain", "lie"),
    ("lit", "light"),
    ("lost", "lose"),
    ("made", "make"),
    ("meant", "mean"),
    ("met", "meet"),
    ("mistook", "mistake"),
    ("mistaken", "mistake"),
    ("overcame", "overcome"),
    ("overcome", "overcome"),
    ("paid", "pay"),
    ("put", "put"),
    ("quit", "quit"),
    ("read", "read"),
    ("rode", "ride"),
    ("ridden", "ride"),
    ("rang", "ring"),
    ("rung", "ring"),
    ("rose", "rise"),
    ("risen", "rise"),
    ("ran", "run"),
    ("said", "say"),
    ("says", "say"),
    ("saw", "see"),
    ("seen", "see"),
    ("sought", "seek"),
    ("sold", "sell"),
    ("sent", "send"),
    ("set", "set"),
    ("shook", "shake"),
    ("shaken", "shake"),
    ("shone", "shine"),
    ("shot", "shoot"),
    ("showed", "show"),
    ("shown", "show"),
    ("shrank", "shrink"),
    ("shrunk", "shrink"),
    ("shut", "shut"),
    ("sang", "sing"),
    ("sung", "sing"),
    ("sank", "sink"),
    ("sunk", "sink"),
    ("sat", "sit"),
    ("slept", "sleep"),
    ("slid", "slide"),
    ("spoke", "speak"),
    ("spoken", "speak"),
    ("spent", "spend"),
    ("spilt", "spill"),
    ("spun", "spin"),
    ("spread", "spread"),
    ("sprang", "spring"),
    ("sprung", "spring"),
    ("stood", "stand"),
    ("stole", "steal"),
    ("stolen", "steal"),
    ("stuck", "stick"),
    ("stung", "sting"),
    ("struck", "strike"),
    ("strove", "strive"),
    ("striven", "strive"),
    ("swore", "swear"),
    ("sworn", "swear"),
    ("swept", "sweep"),
    ("swam", "swim"),
    ("swum", "swim"),
    ("swung", "swing"),
    ("took", "take"),
    ("taken", "take"),
    ("taught", "teach"),
    ("tore", "tear"),
    ("torn", "tear"),
    ("told", "tell"),
    ("thought", "think"),
    ("threw", "throw"),
    ("thrown", "throw"),
    ("undertook", "undertake"),
    ("undertaken", "undertake"),
    ("understood", "understand"),
    ("woke", "wake"),
    ("woken", "wake"),
    ("wore", "wear"),
    ("worn", "wear"),
    ("wove", "weave"),
    ("woven", "weave"),
    ("wept", "weep"),
    ("won", "win"),
    ("withdrew", "withdraw"),
    ("withdrawn", "withdraw"),
    ("wound", "wind"),
    ("wrote", "write"),
    ("written", "write"),
];

const IRREGULAR_NOUNS: &[(&str, &str)] = &[
    ("children", "child"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("halves", "half"),
    ("knives", "knife"),
    ("leaves", "leaf"),
    ("lives", "life"),
    ("loaves", "loaf"),
    ("mice", "mouse"),
    ("oxen", "ox"),
    ("scarves", "scarf"),
    ("shelves", "shelf"),
    ("teeth", "tooth"),
    ("thieves", "thief"),
    ("wives", "wife"),
    ("wolves", "wolf"),
    ("phenomena", "phenomenon"),
    ("criteria", "criterion"),
    ("media", "medium"),
    ("data", "datum"),
    ("analyses", "analysis"),
    ("crises", "crisis"),
    ("hypotheses", "hypothesis"),
    ("theses", "thesis"),
];

fn irregular_verbs() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| IRREGULAR_VERBS.iter().copied().collect())
}

fn irregular_nouns() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| IRREGULAR_NOUNS.iter().copied().collect())
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Undo doubling and silent-e dropping after stripping `-ed`/`-ing`.
fn repair_verb_stem(stem: &str) -> String {
    if common_verbs().contains(stem) {
        return stem.to_string();
    }

    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();

    // stopped → stopp → stop
    if n >= 3 && chars[n - 1] == chars[n - 2] && !is_vowel(chars[n - 1]) {
        let deduped: String = chars[..n - 1].iter().collect();
        if common_verbs().contains(deduped.as_str()) {
            return deduped;
        }
        if chars[n - 1] != 'l' && chars[n - 1] != 's' {
            return deduped;
        }
    }

    // hoped → hop → hope
    let with_e = format!("{stem}e");
    if common_verbs().contains(with_e.as_str()) {
        return with_e;
    }
    // unknown short CVC stems most likely dropped a silent e (rated → rate)
    if n >= 3 && n <= 4 && !is_vowel(chars[n - 1]) && is_vowel(chars[n - 2]) && !is_vowel(chars[n - 3])
    {
        return with_e;
    }
    stem.to_string()
}

fn lemmatize_verb(word: &str) -> String {
    if let Some(base) = irregular_verbs().get(word) {
        return (*base).to_string();
    }
    if common_verbs().contains(word) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        if stem.len() >= 2 {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = word.strip_suffix("ied") {
        if stem.len() >= 2 {
            return format!("{stem}y");
        }
    }
    for suffix in ["ches", "shes", "sses", "xes", "zes", "oes"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            return format!("{stem}{}", &suffix[..suffix.len() - 2]);
        }
    }
    if let Some(stem) = word.strip_suffix("ing") {
        if stem.len() >= 2 {
            return repair_verb_stem(stem);
        }
    }
    if let Some(stem) = word.strip_suffix("ed") {
        if stem.len() >= 2 {
            return repair_verb_stem(stem);
        }
    }
    if let Some(stem) = word.strip_suffix('s') {
        if stem.len() >= 2 && !stem.ends_with('s') && !stem.ends_with('i') && !stem.ends_with('u') {
            return stem.to_string();
        }
    }
    word.to_string()
}

fn lemmatize_noun(word: &str) -> String {
    if let Some(base) = irregular_nouns().get(word) {
        return (*base).to_string();
    }
    if let Some(stem) = word.strip_suffix("men") {
        return format!("{stem}man");
    }
    if let Some(stem) = word.strip_suffix("ies") {
        if stem.len() >= 2 {
            return format!("{stem}y");
        }
    }
    for suffix in ["ches", "shes", "sses", "xes", "zes", "oes"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            return format!("{stem}{}", &suffix[..suffix.len() - 2]);
        }
    }
    if let Some(stem) = word.strip_suffix('s') {
        if stem.len() >= 3
            && !stem.ends_with('s')
            && !stem.ends_with('u')
            && !stem.ends_with('i')
            && !stem.ends_with("new")
        {
            return stem.to_string();
        }
    }
    word.to_string()
}

fn lemmatize_adj(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("iest") {
        if stem.len() >= 2 {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = word.strip_suffix("ier") {
        if stem.len() >= 2 {
            return format!("{stem}y");
        }
    }
    for suffix in ["est", "er"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            if stem.len() < 3 {
                continue;
            }
            let chars: Vec<char> = stem.chars().collect();
            let n = chars.len();
            if chars[n - 1] == chars[n - 2] && !is_vowel(chars[n - 1]) {
                return chars[..n - 1].iter().collect();
            }
            // nicer → nic → nice
            if !is_vowel(chars[n - 1]) && n >= 2 && is_vowel(chars[n - 2]) && n <= 4 {
                return format!("{stem}e");
            }
            return stem.to_string();
        }
    }
    word.to_string()
}

/// Lemmatize a lowercase word given its POS tag.
pub fn lemmatize(word: &str, pos: Pos) -> String {
    let word = word.to_lowercase();
    match pos {
        Pos::Verb | Pos::Aux => lemmatize_verb(&word),
        Pos::Noun | Pos::Propn => lemmatize_noun(&word),
        Pos::Adj => lemmatize_adj(&word),
        _ => word,
    }
}

/// Recover a candidate adjective base from an `-ly` adverb
/// (`optionally → optional`, `happily → happy`, `quickly → quick`).
///
/// Purely morphological: the caller must confirm the base is a known
/// headword before substituting it.
pub fn adverb_base(lemma: &str) -> Option<String> {
    if lemma.len() > 4 {
        if let Some(stem) = lemma.strip_suffix("ally") {
            return Some(format!("{stem}al"));
        }
    }
    if lemma.len() > 3 {
        if let Some(stem) = lemma.strip_suffix("ily") {
            return Some(format!("{stem}y"));
        }
    }
    if lemma.len() > 3 {
        if let Some(stem) = lemma.strip_suffix("ly") {
            return Some(stem.to_string());
        }
    }
    None
}

/// Stricter adverb-base recovery used when there is no corpus to validate
/// against: the bare `-ly` strip is only trusted when the base carries an
/// adjectival suffix.
pub fn conservative_adverb_base(lemma: &str) -> Option<String> {
    if lemma.len() > 4 {
        if let Some(stem) = lemma.strip_suffix("ally") {
            return Some(format!("{stem}al"));
        }
    }
    if lemma.len() > 3 {
        if let Some(stem) = lemma.strip_suffix("ily") {
            return Some(format!("{stem}y"));
        }
    }
    if lemma.len() > 4 {
        if let Some(stem) = lemma.strip_suffix("ly") {
            const ADJ_SUFFIXES: &[&str] = &["al", "ic", "ous", "ive", "ble", "ful", "less"];
            if ADJ_SUFFIXES.iter().any(|s| stem.ends_with(s)) {
                return Some(stem.to_string());
            }
        }
    }
    None
}
