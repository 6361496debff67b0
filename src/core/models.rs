use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};

/// Millisecond-timestamp card identity, bumped monotonically on collision.
pub type CardId = i64;

pub const DEFAULT_TAG_ID: &str = "default-tag-1";

/// Structured record returned by the generation and improvement calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseFields {
    pub title: String,       // short translated summary (max ~10 chars)
    pub kanji: String,       // natural sentence in kanji and kana
    pub hiragana: String,    // pure hiragana reading, used for speech
    pub romaji: String,
    pub furigana: String,    // HTML <ruby>/<rt> markup, every kanji annotated
    pub translation: String, // Traditional Chinese
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub title: String,
    pub kanji: String,
    pub hiragana: String,
    pub romaji: String,
    pub furigana: String,
    pub translation: String,
    pub original_input: String,
    #[serde(default)]
    pub feedback: String, // empty = no feedback yet
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default)]
    pub is_improved: bool,
}

impl Card {
    pub fn has_feedback(&self) -> bool {
        !self.feedback.is_empty()
    }

    /// Text handed to the audio engine. Fallback cards carry no reading and are
    /// never playable.
    pub fn speech_text(&self) -> Option<&str> {
        if self.is_fallback || self.hiragana.is_empty() {
            None
        } else {
            Some(&self.hiragana)
        }
    }

    /// Feedback requests are only valid for generated cards that kept their
    /// original input around.
    pub fn accepts_feedback(&self) -> bool {
        !self.is_fallback && !self.original_input.is_empty()
    }

    pub fn accepts_improvement(&self) -> bool {
        self.accepts_feedback() && self.has_feedback()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: TagColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagColor {
    pub name: String,
    pub bg: String,   // background hex
    pub text: String, // foreground hex
}

/// Fixed palette; index 0 is the muted gray reserved for system use.
pub const TAG_PALETTE: [(&str, &str, &str); 10] = [
    ("default", "#F3F4F6", "#4B5563"),
    ("violet", "#E0D9FF", "#6D28D9"),
    ("blue", "#D1E9FF", "#0070F3"),
    ("sky", "#E0F2FE", "#0284C7"),
    ("emerald", "#D1FAE5", "#059669"),
    ("rose", "#FFE4E6", "#E11D48"),
    ("amber", "#FEF3C7", "#D97706"),
    ("fuchsia", "#FCE7F3", "#DB2777"),
    ("orange", "#FFEDD5", "#EA580C"),
    ("teal", "#CCFBF1", "#0D9488"),
];

impl TagColor {
    pub fn from_palette(index: usize) -> Self {
        let (name, bg, text) = TAG_PALETTE[index % TAG_PALETTE.len()];
        TagColor { name: name.to_string(), bg: bg.to_string(), text: text.to_string() }
    }

    /// Random pick skipping the gray default entry.
    pub fn random() -> Self {
        let mut rng = rand::rng();
        TagColor::from_palette(rng.random_range(1..TAG_PALETTE.len()))
    }
}

/// The tag every fresh install starts with, pre-selected for new cards.
pub fn default_tag() -> Tag {
    Tag {
        id: DEFAULT_TAG_ID.to_string(),
        name: super::messages::DEFAULT_TAG_NAME.to_string(),
        color: TagColor::from_palette(1), // violet
    }
}

/// Mint the next card id: wall-clock milliseconds, bumped past the previous id so
/// same-millisecond creations stay unique.
pub fn next_card_id(last: CardId) -> CardId {
    let now = chrono::Utc::now().timestamp_millis();
    now.max(last + 1)
}
