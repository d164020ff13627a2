//! Target-word marking for the cross-encoder input.

use regex::Regex;

/// Wrap the target word in `<t>...</t>` delimiter tokens, trying the bare
/// lemma first and then common English inflections. Returns `None` when no
/// form of the lemma can be located.
pub fn mark_target_word(sentence: &str, lemma: &str) -> Option<String> {
    if lemma.is_empty() {
        return None;
    }

    if let Some(marked) = mark_form(sentence, lemma) {
        return Some(marked);
    }

    let last = lemma.chars().last()?;
    let mut forms: Vec<String> = vec![
        format!("{lemma}s"),
        format!("{lemma}es"),
        format!("{lemma}ed"),
        format!("{lemma}ing"),
        format!("{lemma}d"),
    ];
    if !"aeiou".contains(last) {
        forms.push(format!("{lemma}{last}ed"));
        forms.push(format!("{lemma}{last}ing"));
    }
    if let Some(stem) = lemma.strip_suffix('y') {
        forms.push(format!("{stem}ies"));
        forms.push(format!("{stem}ied"));
    }
    if let Some(stem) = lemma.strip_suffix('e') {
        forms.push(format!("{stem}ing"));
    }

    forms.iter().find_map(|form| mark_form(sentence, form))
}

fn mark_form(sentence: &str, form: &str) -> Option<String> {
    let pattern = Regex::new(&format!(r"(?i)\b({})\b", regex::escape(form))).ok()?;
    let m = pattern.captures(sentence)?.get(1)?;
    Some(format!(
        "{}<t>{}</t>{}",
        &sentence[..m.start()],
        m.as_str(),
        &sentence[m.end()..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_exact_form() {
        assert_eq!(
            mark_target_word("It can strike suddenly.", "strike").as_deref(),
            Some("It can <t>strike</t> suddenly.")
        );
    }

    #[test]
    fn marks_case_insensitively() {
        assert_eq!(
            mark_target_word("Strike while the iron is hot.", "strike").as_deref(),
            Some("<t>Strike</t> while the iron is hot.")
        );
    }

    #[test]
    fn tries_verb_inflections() {
        assert_eq!(
            mark_target_word("She hurried to the station.", "hurry").as_deref(),
            Some("She <t>hurried</t> to the station.")
        );
        assert_eq!(
            mark_target_word("He stopped at the light.", "stop").as_deref(),
            Some("He <t>stopped</t> at the light.")
        );
        assert_eq!(
            mark_target_word("They are making progress.", "make").as_deref(),
            Some("They are <t>making</t> progress.")
        );
    }

    #[test]
    fn requires_word_boundaries() {
        // "art" must not match inside "start"
        assert!(mark_target_word("They start early.", "art").is_none());
    }

    #[test]
    fn missing_target_returns_none() {
        assert!(mark_target_word("Nothing relevant here.", "strike").is_none());
    }
}
