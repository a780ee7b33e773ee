use crate::quiz::vocabulary::VocabularyRecord;

// What a vocabulary card shows: characters, romanization, translation or a
// stacked pair of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayFormat {
    Hanzi,
    Pinyin,
    Rus,
    HanziPinyin,
    HanziRus,
    PinyinRus,
}

impl DisplayFormat {
    pub const ALL: [DisplayFormat; 6] = [
        DisplayFormat::Hanzi,
        DisplayFormat::Pinyin,
        DisplayFormat::Rus,
        DisplayFormat::HanziPinyin,
        DisplayFormat::HanziRus,
        DisplayFormat::PinyinRus,
    ];

    // The single-component formats a format is built from
    pub fn components(&self) -> &'static [DisplayFormat] {
        match self {
            DisplayFormat::Hanzi => &[DisplayFormat::Hanzi],
            DisplayFormat::Pinyin => &[DisplayFormat::Pinyin],
            DisplayFormat::Rus => &[DisplayFormat::Rus],
            DisplayFormat::HanziPinyin => &[DisplayFormat::Hanzi, DisplayFormat::Pinyin],
            DisplayFormat::HanziRus => &[DisplayFormat::Hanzi, DisplayFormat::Rus],
            DisplayFormat::PinyinRus => &[DisplayFormat::Pinyin, DisplayFormat::Rus],
        }
    }

    pub fn shares_component(&self, other: DisplayFormat) -> bool {
        self.components()
            .iter()
            .any(|c| other.components().contains(c))
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayFormat::Hanzi => "Иероглифы (汉字)",
            DisplayFormat::Pinyin => "Пиньинь (pīnyīn)",
            DisplayFormat::Rus => "Русский перевод",
            DisplayFormat::HanziPinyin => "Иероглифы + Пиньинь",
            DisplayFormat::HanziRus => "Иероглифы + Русский",
            DisplayFormat::PinyinRus => "Пиньинь + Русский",
        }
    }

    pub fn from_label(label: &str) -> Option<DisplayFormat> {
        DisplayFormat::ALL.into_iter().find(|f| f.label() == label)
    }
}

// Answer formats must not reveal the question: anything sharing a
// component with the question format is excluded.
pub fn available_answer_formats(question_format: DisplayFormat) -> Vec<DisplayFormat> {
    DisplayFormat::ALL
        .into_iter()
        .filter(|f| !f.shares_component(question_format))
        .collect()
}

pub fn format_display_text(word: &VocabularyRecord, format: DisplayFormat) -> String {
    match format {
        DisplayFormat::Hanzi => word.hanzi.clone(),
        DisplayFormat::Pinyin => word.pinyin.clone(),
        DisplayFormat::Rus => word.translations.join(", "),
        DisplayFormat::HanziPinyin => format!("{}\n{}", word.hanzi, word.pinyin),
        DisplayFormat::HanziRus => format!("{}\n{}", word.hanzi, word.translations.join(", ")),
        DisplayFormat::PinyinRus => {
            format!("{}\n{}", word.pinyin, word.translations.join(", "))
        }
    }
}
