//! Universal part-of-speech tags and label normalization.

/// Universal POS tags, following the tagset the upstream annotations and the
/// sense registry speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pos {
    Noun,
    Verb,
    Adj,
    Adv,
    Propn,
    Pron,
    Det,
    Adp,
    Aux,
    Cconj,
    Sconj,
    Num,
    Part,
    Intj,
    Punct,
    Sym,
    Space,
    Other,
}

impl Pos {
    pub fn as_str(self) -> &'static str {
        match self {
            Pos::Noun => "NOUN",
            Pos::Verb => "VERB",
            Pos::Adj => "ADJ",
            Pos::Adv => "ADV",
            Pos::Propn => "PROPN",
            Pos::Pron => "PRON",
            Pos::Det => "DET",
            Pos::Adp => "ADP",
            Pos::Aux => "AUX",
            Pos::Cconj => "CCONJ",
            Pos::Sconj => "SCONJ",
            Pos::Num => "NUM",
            Pos::Part => "PART",
            Pos::Intj => "INTJ",
            Pos::Punct => "PUNCT",
            Pos::Sym => "SYM",
            Pos::Space => "SPACE",
            Pos::Other => "X",
        }
    }

    /// Closed set of tags whose tokens never become vocabulary entries.
    pub fn is_stop_pos(self) -> bool {
        matches!(
            self,
            Pos::Adp
                | Pos::Aux
                | Pos::Cconj
                | Pos::Sconj
                | Pos::Det
                | Pos::Num
                | Pos::Part
                | Pos::Pron
                | Pos::Punct
                | Pos::Space
                | Pos::Sym
                | Pos::Other
                | Pos::Propn
        )
    }

    /// Map a tagger tag onto the POS vocabulary senses use. Proper nouns
    /// count as nouns and auxiliaries as verbs; closed-class tags map to
    /// nothing.
    pub fn to_sense_pos(self) -> Option<&'static str> {
        match self {
            Pos::Noun | Pos::Propn => Some("NOUN"),
            Pos::Verb | Pos::Aux => Some("VERB"),
            Pos::Adj => Some("ADJ"),
            Pos::Adv => Some("ADV"),
            _ => None,
        }
    }
}

/// Normalize free-form POS labels from annotations and wordlists
/// (`"n."`, `"ADJECTIVE"`, `"prep."`) into canonical uppercase tags.
pub fn normalize_pos_label(label: &str) -> String {
    let upper = label.trim().to_uppercase();
    match upper.as_str() {
        "N." | "N" | "NOUN" => "NOUN".to_string(),
        "V." | "V" | "VERB" => "VERB".to_string(),
        "ADJ." | "ADJ" | "ADJECTIVE" => "ADJ".to_string(),
        "ADV." | "ADV" | "ADVERB" => "ADV".to_string(),
        "PREP." | "PREP" | "PREPOSITION" => "PREP".to_string(),
        "CONJ." | "CONJ" | "CONJUNCTION" => "CONJ".to_string(),
        "PRON." | "PRON" | "PRONOUN" => "PRON".to_string(),
        "ART." | "ART" | "DETERMINER" => "ART".to_string(),
        "AUX." | "AUX" => "AUX".to_string(),
        "INTERJECTION" | "INTJ" => "INTJ".to_string(),
        _ => upper,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_pos_set_matches_contract() {
        for pos in [
            Pos::Adp,
            Pos::Aux,
            Pos::Cconj,
            Pos::Sconj,
            Pos::Det,
            Pos::Num,
            Pos::Part,
            Pos::Pron,
            Pos::Punct,
            Pos::Space,
            Pos::Sym,
            Pos::Other,
            Pos::Propn,
        ] {
            assert!(pos.is_stop_pos(), "{:?} should be stop", pos);
        }
        for pos in [Pos::Noun, Pos::Verb, Pos::Adj, Pos::Adv, Pos::Intj] {
            assert!(!pos.is_stop_pos(), "{:?} should not be stop", pos);
        }
    }

    #[test]
    fn sense_pos_folds_propn_and_aux() {
        assert_eq!(Pos::Propn.to_sense_pos(), Some("NOUN"));
        assert_eq!(Pos::Aux.to_sense_pos(), Some("VERB"));
        assert_eq!(Pos::Det.to_sense_pos(), None);
    }

    #[test]
    fn label_normalization() {
        assert_eq!(normalize_pos_label("n."), "NOUN");
        assert_eq!(normalize_pos_label("Adjective"), "ADJ");
        assert_eq!(normalize_pos_label("prep."), "PREP");
        assert_eq!(normalize_pos_label("weird"), "WEIRD");
    }
}
