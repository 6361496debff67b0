use serde::{
    Deserialize,
    Serialize,
};

use crate::core::models::PhraseFields;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn from_text(text: impl Into<String>) -> Self {
        Content { parts: vec![Part { text: Some(text.into()), inline_data: None }] }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// Base64-encoded binary payload, used by the speech model for audio output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, or None when the model
    /// produced no text at all.
    pub fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String =
            content.parts.iter().filter_map(|part| part.text.as_deref()).collect();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn first_inline_data(&self) -> Option<&InlineData> {
        let content = self.candidates.first()?.content.as_ref()?;
        content.parts.iter().find_map(|part| part.inline_data.as_ref())
    }
}

/// JSON document the text model is instructed to produce for card generation
/// and improvement.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseResponse {
    pub japanese_kanji: String,
    pub japanese_hiragana: String,
    pub romaji: String,
    pub japanese_furigana: String,
    pub simplified_chinese_translation: String,
    pub chinese_translation: String,
}

impl From<PhraseResponse> for PhraseFields {
    fn from(response: PhraseResponse) -> Self {
        PhraseFields {
            title: response.simplified_chinese_translation,
            kanji: response.japanese_kanji,
            hiragana: response.japanese_hiragana,
            romaji: response.romaji,
            furigana: response.japanese_furigana,
            translation: response.chinese_translation,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub grammar_feedback: String,
}
