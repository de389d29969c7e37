use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages the lookup understands. Only some of them have collections
/// behind them; the rest are detected and then fall back to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "hi")]
    Hindi,
    #[serde(rename = "ta")]
    Tamil,
    #[serde(rename = "ml")]
    Malayalam,
    #[serde(rename = "te")]
    Telugu,
    #[serde(rename = "kn")]
    Kannada,
}

/// Script blocks in detection order. The first block with a hit decides.
const SCRIPT_BLOCKS: [(Language, char, char); 5] = [
    (Language::Tamil, '\u{0B80}', '\u{0BFF}'),
    (Language::Telugu, '\u{0C00}', '\u{0C7F}'),
    (Language::Malayalam, '\u{0D00}', '\u{0D7F}'),
    (Language::Kannada, '\u{0C80}', '\u{0CFF}'),
    (Language::Hindi, '\u{0900}', '\u{097F}'),
];

impl Language {
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::Hindi,
        Language::Tamil,
        Language::Malayalam,
        Language::Telugu,
        Language::Kannada,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Tamil => "ta",
            Language::Malayalam => "ml",
            Language::Telugu => "te",
            Language::Kannada => "kn",
        }
    }

    /// Suffix appended to a category name to form the collection name.
    pub fn collection_suffix(&self) -> &'static str {
        match self {
            Language::English => "",
            Language::Hindi => "Hindi",
            Language::Tamil => "Tamil",
            Language::Malayalam => "Malayalam",
            Language::Telugu => "Telugu",
            Language::Kannada => "Kannada",
        }
    }

    pub fn supported_codes() -> Vec<&'static str> {
        Self::ALL.iter().map(|l| l.code()).collect()
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.code() == code)
            .ok_or_else(|| format!("Unsupported language: {}", s))
    }
}

/// Guess the language of a query from the scripts it contains.
///
/// This is a heuristic: mixed-script text is classified by the first block
/// in [`SCRIPT_BLOCKS`] order that has any character in it, and text with no
/// Indic characters at all is treated as English.
pub fn detect_language(text: &str) -> Language {
    let text = text.trim();
    for (language, start, end) in SCRIPT_BLOCKS {
        if text.chars().any(|c| c >= start && c <= end) {
            return language;
        }
    }
    Language::default()
}
