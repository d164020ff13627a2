//! Closed-class word lists and the stopword set used by the rule tagger.

use std::collections::HashSet;
use std::sync::OnceLock;

pub const DETERMINERS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "my", "your", "his", "her", "its", "our",
    "their", "some", "any", "no", "every", "each", "either", "neither", "another", "such", "what",
    "which", "whose", "all", "both", "half", "several", "enough",
];

pub const PREPOSITIONS: &[&str] = &[
    "of", "in", "on", "at", "by", "for", "with", "about", "against", "between", "into", "through",
    "during", "before", "after", "above", "below", "from", "up", "down", "out", "off", "over",
    "under", "again", "behind", "beyond", "near", "among", "within", "without", "despite",
    "toward", "towards", "upon", "onto", "per", "via", "since", "until", "across", "along",
    "amid", "around", "beneath", "beside", "besides", "except", "inside", "outside", "past",
    "throughout", "underneath",
];

pub const PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "them", "us", "mine", "yours",
    "hers", "ours", "theirs", "myself", "yourself", "himself", "herself", "itself", "ourselves",
    "yourselves", "themselves", "who", "whom", "whoever", "someone", "anyone", "everyone",
    "nobody", "somebody", "anybody", "everybody", "something", "anything", "everything",
    "nothing", "none", "one", "oneself",
];

pub const AUXILIARIES: &[&str] = &[
    "be", "am", "is", "are", "was", "were", "been", "being", "have", "has", "had", "having",
    "do", "does", "did", "will", "would", "shall", "should", "may", "might", "must", "can",
    "could", "ought",
];

pub const COORD_CONJUNCTIONS: &[&str] = &["and", "or", "but", "nor", "so", "yet"];

pub const SUBORD_CONJUNCTIONS: &[&str] = &[
    "because", "although", "though", "while", "whereas", "if", "unless", "whether", "when",
    "whenever", "where", "wherever", "once", "than", "lest",
];

pub const PARTICLES: &[&str] = &["not", "n't", "'s", "to"];

pub const NUMBER_WORDS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
    "hundred", "thousand", "million", "billion",
];

/// Base forms of frequent English verbs. The rule tagger cannot learn verb
/// identity from morphology alone for bare forms (`draw`, `strike`), so this
/// list backs both tagging and phrase-matcher head classification.
pub const COMMON_VERBS: &[&str] = &[
    "accept", "achieve", "act", "add", "admit", "affect", "afford", "agree", "allow", "announce",
    "answer", "appear", "apply", "argue", "arrive", "ask", "attend", "avoid", "base", "bear",
    "beat", "become", "begin", "believe", "belong", "break", "bring", "build", "buy", "call", "cancel",
    "care", "carry", "catch", "cause", "change", "charge", "check", "choose", "claim", "close",
    "come", "commit", "compare", "complete", "consider", "contain", "continue", "contribute",
    "control", "cook", "cost", "count", "cover", "create", "cross", "cut", "deal", "decide",
    "deliver", "demand", "depend", "describe", "design", "develop", "die", "disappear",
    "discover", "discuss", "draw", "dress", "drink", "drive", "drop", "earn", "eat", "edit", "enjoy",
    "enter", "establish", "examine", "exist", "expect", "experience", "explain", "express",
    "face", "fail", "fall", "fear", "feed", "feel", "fight", "fill", "find", "finish", "fit", "fix",
    "fly", "focus", "follow", "force", "forget", "form", "gain", "get", "give", "go", "grow",
    "handle", "happen", "hate", "head", "hear", "help", "hide", "hit", "hold", "hope", "hurt",
    "identify", "imagine", "improve", "include", "increase", "indicate", "influence", "involve",
    "join", "jump", "keep", "kill", "know", "lack", "land", "last", "laugh", "lay", "lead",
    "learn", "leave", "lend", "let", "lie", "like", "limit", "listen", "live", "look", "lose",
    "love", "maintain", "make", "manage", "mark", "matter", "mean", "meet", "mention", "mind",
    "miss", "move", "need", "notice", "obtain", "occur", "offer", "open", "order", "own", "pass",
    "pay", "perform", "pick", "place", "plan", "play", "point", "prepare", "present", "press",
    "prevent", "produce", "promise", "protect", "prove", "provide", "pull", "push", "put",
    "raise", "reach", "read", "realize", "receive", "recognize", "reduce", "refer", "reflect",
    "refuse", "regard", "relate", "release", "remain", "remember", "remove", "repeat", "replace",
    "report", "represent", "require", "rest", "result", "return", "reveal", "revise", "ride",
    "rise", "risk", "run", "save", "say", "see", "seek", "seem", "sell", "send", "serve", "set",
    "settle", "share", "show", "shut", "sing", "sit", "sleep", "smile", "sound", "speak",
    "spend", "spread", "stand", "start", "state", "stay", "stick", "stop", "strike", "study",
    "succeed", "suffer", "suggest", "supply", "support", "suppose", "survive", "take", "talk",
    "teach", "tell", "tend", "test", "thank", "think", "throw", "touch", "train", "travel",
    "treat", "try", "turn", "understand", "use", "visit", "wait", "walk", "want", "watch",
    "wear", "win", "wish", "wonder", "work", "worry", "write",
];

/// Stopword set in the spirit of the large-model stop lists: closed-class
/// words plus high-frequency adverbs and quantifiers. Content verbs stay out
/// so tested vocabulary is never swallowed here.
pub const EXTRA_STOPWORDS: &[&str] = &[
    "also", "very", "really", "quite", "too", "just", "only", "even", "still", "yet", "already",
    "often", "always", "never", "sometimes", "perhaps", "maybe", "then", "there", "here", "now",
    "well", "much", "many", "more", "most", "few", "little", "less", "least", "other", "others",
    "same", "own", "else", "ever", "far", "further", "indeed", "instead", "however", "therefore",
    "thus", "moreover", "meanwhile", "otherwise", "anyway", "almost", "rather", "soon",
    "away", "back", "again", "together", "etc",
];

fn set(lists: &[&[&'static str]]) -> HashSet<&'static str> {
    lists.iter().flat_map(|l| l.iter().copied()).collect()
}

pub fn common_verbs() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| set(&[COMMON_VERBS]))
}

pub fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        set(&[
            DETERMINERS,
            PREPOSITIONS,
            PRONOUNS,
            AUXILIARIES,
            COORD_CONJUNCTIONS,
            SUBORD_CONJUNCTIONS,
            PARTICLES,
            NUMBER_WORDS,
            EXTRA_STOPWORDS,
        ])
    })
}

macro_rules! lookup_set {
    ($name:ident, $list:expr) => {
        pub fn $name() -> &'static HashSet<&'static str> {
            static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
            SET.get_or_init(|| set(&[$list]))
        }
    };
}

lookup_set!(determiners, DETERMINERS);
lookup_set!(prepositions, PREPOSITIONS);
lookup_set!(pronouns, PRONOUNS);
lookup_set!(auxiliaries, AUXILIARIES);
lookup_set!(coord_conjunctions, COORD_CONJUNCTIONS);
lookup_set!(subord_conjunctions, SUBORD_CONJUNCTIONS);
lookup_set!(number_words, NUMBER_WORDS);
