//! Closed display-name and structure tables for grammar pattern entries.

use gsatvocab_model::{PatternCategory, PatternSubtype};

/// Chinese display name for a pattern category.
pub fn category_display_name(category: PatternCategory) -> &'static str {
    match category {
        PatternCategory::Subjunctive => "假設語氣",
        PatternCategory::Inversion => "倒裝句",
        PatternCategory::Participle => "分詞構句",
        PatternCategory::CleftSentence => "分裂句",
        PatternCategory::ComparisonAdv => "比較句型",
        PatternCategory::ConcessionAdv => "讓步句型",
        PatternCategory::ResultPurpose => "結果與目的句型",
    }
}

/// Chinese display name for a pattern subtype.
pub fn subtype_display_name(subtype: PatternSubtype) -> &'static str {
    use PatternSubtype::*;
    match subtype {
        SubjWishPast => "wish + 過去式（與現在事實相反）",
        SubjWishPastPerfect => "wish + 過去完成式（與過去事實相反）",
        SubjAsIf => "as if / as though（彷彿）",
        SubjWereTo => "If...were to...（假設未來）",
        SubjShould => "should 假設語氣",
        SubjHad => "had 假設語氣",
        SubjDemand => "demand/suggest 要求建議動詞",
        SubjIfOnly => "if only（要是...就好了）",
        SubjButFor => "but for / without（要不是）",
        SubjItsTime => "It's time (that)...（該是...的時候了）",
        InvNegative => "否定副詞倒裝",
        InvNotOnly => "not only...but also 倒裝",
        InvNoSooner => "no sooner...than 倒裝",
        InvOnly => "only 開頭倒裝",
        InvSoAdj => "so + adj/adv + that 倒裝",
        InvConditional => "條件句倒裝（省略 if）",
        InvNotUntil => "not until 倒裝",
        PartPerfect => "完成式分詞（Having + p.p.）",
        PartWith => "with + 名詞 + 分詞",
        PartAbsolute => "獨立分詞構句",
        CleftItThat => "It is/was...that 強調句",
        CleftWhat => "What...is/was 名詞子句強調",
        CompTheMore => "the more...the more",
        CompNoMoreThan => "no more...than（一樣不...）",
        CompTimes => "倍數 + as...as",
        ConcNoMatter => "no matter + wh-",
        ConcWhatever => "whatever / however 讓步",
        ConcAdjAs => "adj + as + 主詞 + 動詞",
        ResSoThat => "so...that（結果）",
        ResSuchThat => "such...that（結果）",
        PurpLest => "lest（以免）",
        PurpForFear => "for fear that（唯恐）",
    }
}

/// Canonical English structure template for a pattern subtype.
pub fn subtype_structure(subtype: PatternSubtype) -> &'static str {
    use PatternSubtype::*;
    match subtype {
        SubjWishPast => "I wish + S + Ved/were",
        SubjWishPastPerfect => "I wish + S + had + p.p.",
        SubjAsIf => "S + V + as if/though + S + Ved/were",
        SubjWereTo => "If + S + were to + V..., S + would/could + V",
        SubjShould => "If + S + should + V..., S + will/would + V",
        SubjHad => "If + S + had + p.p., S + would have + p.p.",
        SubjDemand => "S + demand/suggest + that + S + (should) + V",
        SubjIfOnly => "If only + S + Ved/were/had p.p.",
        SubjButFor => "But for/Without + N, S + would + V",
        SubjItsTime => "It's time (that) + S + Ved",
        InvNegative => "Negative adverb + Aux + S + V",
        InvNotOnly => "Not only + Aux + S + V..., but (S) also...",
        InvNoSooner => "No sooner + had + S + p.p. + than + S + Ved",
        InvOnly => "Only + adverbial + Aux + S + V",
        InvSoAdj => "So + adj/adv + Aux + S + V + that...",
        InvConditional => "Had/Were/Should + S + ..., S + would + V",
        InvNotUntil => "Not until + clause/time + Aux + S + V",
        PartPerfect => "Having + p.p., S + V",
        PartWith => "With + N + Ving/p.p., S + V",
        PartAbsolute => "N + Ving/p.p., S + V",
        CleftItThat => "It is/was + N/phrase + that + S + V",
        CleftWhat => "What + S + V + is/was + N/phrase",
        CompTheMore => "The + comparative..., the + comparative",
        CompNoMoreThan => "S + be + no more + adj + than + S",
        CompTimes => "N times + as + adj + as",
        ConcNoMatter => "No matter + wh- + S + V, S + V",
        ConcWhatever => "Whatever/However + adj/adv + S + V, S + V",
        ConcAdjAs => "Adj/Adv + as + S + V, S + V",
        ResSoThat => "S + V + so + adj/adv + that + S + V",
        ResSuchThat => "S + V + such + (a/an) + adj + N + that + S + V",
        PurpLest => "S + V + lest + S + (should) + V",
        PurpForFear => "S + V + for fear that + S + might/should + V",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_SUBTYPES: &[PatternSubtype] = &[
        PatternSubtype::SubjWishPast,
        PatternSubtype::SubjWishPastPerfect,
        PatternSubtype::SubjAsIf,
        PatternSubtype::SubjWereTo,
        PatternSubtype::SubjShould,
        PatternSubtype::SubjHad,
        PatternSubtype::SubjDemand,
        PatternSubtype::SubjIfOnly,
        PatternSubtype::SubjButFor,
        PatternSubtype::SubjItsTime,
        PatternSubtype::InvNegative,
        PatternSubtype::InvNotOnly,
        PatternSubtype::InvNoSooner,
        PatternSubtype::InvOnly,
        PatternSubtype::InvSoAdj,
        PatternSubtype::InvConditional,
        PatternSubtype::InvNotUntil,
        PatternSubtype::PartPerfect,
        PatternSubtype::PartWith,
        PatternSubtype::PartAbsolute,
        PatternSubtype::CleftItThat,
        PatternSubtype::CleftWhat,
        PatternSubtype::CompTheMore,
        PatternSubtype::CompNoMoreThan,
        PatternSubtype::CompTimes,
        PatternSubtype::ConcNoMatter,
        PatternSubtype::ConcWhatever,
        PatternSubtype::ConcAdjAs,
        PatternSubtype::ResSoThat,
        PatternSubtype::ResSuchThat,
        PatternSubtype::PurpLest,
        PatternSubtype::PurpForFear,
    ];

    #[test]
    fn every_subtype_has_display_and_structure() {
        for subtype in ALL_SUBTYPES {
            assert!(!subtype_display_name(*subtype).is_empty());
            assert!(!subtype_structure(*subtype).is_empty());
        }
    }

    #[test]
    fn every_category_has_display_name() {
        for category in [
            PatternCategory::Subjunctive,
            PatternCategory::Inversion,
            PatternCategory::Participle,
            PatternCategory::CleftSentence,
            PatternCategory::ComparisonAdv,
            PatternCategory::ConcessionAdv,
            PatternCategory::ResultPurpose,
        ] {
            assert!(!category_display_name(category).is_empty());
        }
    }
}
