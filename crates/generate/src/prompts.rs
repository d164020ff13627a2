//! Prompt templates for learner-facing content generation.

pub const SENSE_GENERATE_SYSTEM: &str = "你是一位專為臺灣高中生編寫學測英文單字書的資深英文老師。\n\n\
你的目標是產出像臺灣市售單字書那樣精煉、實用的內容。\
所有說明、記憶技巧、混淆詞解析都必須以繁體中文撰寫，例句則用英文。";

pub fn sense_generate_prompt(words_xml: &str) -> String {
    format!(
        r#"為以下單字產生學習者導向的定義與輔助記憶資訊。

<quality_principle>
重質不重量：選填欄位（confusion_notes、root_info）寧可不填，也不要產出低品質內容。
root_info 只提供給 level 2 以上的單字。
</quality_principle>

輸入資料：
{words_xml}

針對每個單字，依序處理所有 sense（按 sense_index 順序）。回傳以下欄位：

### zh_def（繁體中文定義）
- 精簡為主，2-8 字為佳，最多不超過 12 字
- 同義項內有多個意思時用「；」分隔，可用括號補充情境

### en_def（英文定義）
- 學習者字典風格，使用約 2000 常用字的 defining vocabulary
- 多義項時必須彼此可區分：使用不同關鍵詞彙、典型搭配詞或使用情境

### generated_example（英文例句）
- 全新創作，符合學測閱讀題材，約 10-18 字
- 禁止重複來源例句或考古題原文

### confusion_notes（選填）
只在拼字極相近或意思易混但用法不同時加入（affect/effect、borrow/lend 這一類），
同義詞、反義詞、詞性變化都不算混淆詞。每筆包含 confused_with、distinction（繁中
30-50 字）、memory_tip（繁中 15 字以內）。

### root_info（選填，level ≥ 2）
只在字根/字首有高延伸性（spect、duct、port 這一類）或單字特別難記時加入，
包含 root_breakdown 與 memory_strategy。

每個輸入單字回傳一個物件，lemma 必須與輸入一致。Return JSON only:"#
    )
}

pub const PATTERN_CATEGORY_SYSTEM: &str = "你是一位臺灣高中英文文法老師，擅長把句型講得簡單清楚。";

pub fn pattern_category_prompt(category: &str, display_name: &str) -> String {
    format!(
        r#"為「{display_name}」（{category}）這個文法句型類別撰寫一段教學說明。

要求：
- 繁體中文，150-250 字
- 說明這類句型的核心概念、何時使用、以及學測常見的考法
- 語氣像課堂講解，避免條列過多術語

回傳欄位 teaching_explanation。Return JSON only:"#
    )
}

pub const PATTERN_SUBTYPE_SYSTEM: &str = "你是一位臺灣高中英文文法老師，擅長造自然的示範例句。";

pub fn pattern_subtype_prompt(
    subtype: &str,
    display_name: &str,
    structure: &str,
    contexts_xml: &str,
) -> String {
    format!(
        r#"為句型「{display_name}」（{subtype}）造一個全新的英文示範例句。

句型結構：{structure}

歷屆考題中的實例（僅供參考，禁止照抄）：
{contexts_xml}

要求：
- 例句必須完整展現該句型結構
- 題材符合學測（科普、環保、社會議題、校園生活）
- 約 10-20 字

回傳欄位 generated_example。Return JSON only:"#
    )
}
