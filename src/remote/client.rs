use async_trait::async_trait;
use base64::{
    engine::general_purpose::STANDARD as BASE64,
    Engine as _,
};
use reqwest::Client;
use tracing::{
    debug,
    warn,
};

use super::types::{
    Content,
    FeedbackResponse,
    GenerateContentRequest,
    GenerateContentResponse,
    GenerationConfig,
    PhraseResponse,
    PrebuiltVoiceConfig,
    SpeechConfig,
    VoiceConfig,
};
use crate::core::{
    errors::KotonoteError,
    models::PhraseFields,
};

pub const TEXT_MODEL: &str = "gemini-2.5-flash";
pub const SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub tts_model: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        GeminiConfig {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: TEXT_MODEL.to_string(),
            tts_model: SPEECH_MODEL.to_string(),
        }
    }

    /// Reads `GEMINI_API_KEY`; an unset variable leaves the key empty, which
    /// makes every call fail fast with `MissingApiKey`.
    pub fn from_env() -> Self {
        Self::new(std::env::var("GEMINI_API_KEY").unwrap_or_default())
    }
}

/// The three structured generation calls used by the card flows.
#[async_trait]
pub trait PhraseGenerator: Send + Sync {
    async fn create_card(&self, input: &str) -> Result<PhraseFields, KotonoteError>;

    async fn grammar_feedback(
        &self,
        original_input: &str,
        kanji: &str,
    ) -> Result<String, KotonoteError>;

    async fn improve_card(
        &self,
        title: &str,
        kanji: &str,
        feedback: &str,
        original_input: &str,
    ) -> Result<PhraseFields, KotonoteError>;
}

/// Remote speech synthesis: returns raw PCM samples (mono, 16-bit, 24 kHz),
/// already base64-decoded.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, KotonoteError>;
}

pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config, client: Client::new() }
    }

    fn ensure_key(&self) -> Result<(), KotonoteError> {
        if self.config.api_key.is_empty() {
            return Err(KotonoteError::MissingApiKey);
        }
        Ok(())
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, KotonoteError> {
        self.ensure_key()?;

        let url = format!("{}/v1beta/models/{}:generateContent", self.config.base_url, model);
        debug!(model, "dispatching generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(KotonoteError::QuotaExhausted);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "generateContent failed");

            if message.contains("RESOURCE_EXHAUSTED") {
                return Err(KotonoteError::QuotaExhausted);
            }
            return Err(KotonoteError::RemoteApi { status: status.as_u16(), message });
        }

        Ok(response.json().await?)
    }

    async fn structured_phrase(
        &self,
        query: String,
        system: &str,
    ) -> Result<PhraseFields, KotonoteError> {
        let request = GenerateContentRequest {
            contents: vec![Content::from_text(query)],
            system_instruction: Some(Content::from_text(system)),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(phrase_response_schema()),
                ..Default::default()
            }),
        };

        let response = self.generate(&self.config.model, &request).await?;
        let text = response.first_text().ok_or(KotonoteError::EmptyResponse)?;
        let parsed: PhraseResponse = serde_json::from_str(&text)?;

        Ok(parsed.into())
    }
}

#[async_trait]
impl PhraseGenerator for GeminiClient {
    async fn create_card(&self, input: &str) -> Result<PhraseFields, KotonoteError> {
        let query = format!(
            "The user has provided the following Japanese sentence: \"{}\".\n\
             1. Confirm and format this Japanese sentence.\n\
             2. Provide the Traditional Chinese translation.\n\
             3. **CRITICAL:** For the 'japaneseFurigana' field, you MUST wrap every Kanji \
             character with HTML <ruby> tags to show the reading.\n\
             Example format: <ruby>漢<rt>かん</rt></ruby><ruby>字<rt>じ</rt></ruby>\n\
             Do NOT use parentheses like 漢字(かんじ). YOU MUST USE RUBY TAGS.",
            input
        );

        let system = "You are a Japanese language expert. Your output must be valid JSON. \
                      Ensure 'japaneseFurigana' contains valid HTML ruby tags for ALL Kanji \
                      characters.";

        self.structured_phrase(query, system).await
    }

    async fn grammar_feedback(
        &self,
        original_input: &str,
        kanji: &str,
    ) -> Result<String, KotonoteError> {
        let query = format!(
            "The user input was: \"{}\".\n\
             The generated Japanese sentence is: \"{}\".\n\n\
             Please provide a short (max 1 sentence) constructive grammarFeedback in \
             **Traditional Chinese**.\n\
             Focus on:\n\
             1. Is the Japanese natural?\n\
             2. Is it appropriate for a tourist context?\n\
             3. Are there any grammatical errors?\n\n\
             If it is perfect, just say \"這句日文非常自然且正確。\"",
            original_input, kanji
        );

        let request = GenerateContentRequest {
            contents: vec![Content::from_text(query)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(feedback_response_schema()),
                ..Default::default()
            }),
        };

        let response = self.generate(&self.config.model, &request).await?;
        let text = response.first_text().ok_or(KotonoteError::EmptyResponse)?;
        let parsed: FeedbackResponse = serde_json::from_str(&text)?;

        Ok(parsed.grammar_feedback)
    }

    async fn improve_card(
        &self,
        title: &str,
        kanji: &str,
        feedback: &str,
        original_input: &str,
    ) -> Result<PhraseFields, KotonoteError> {
        let query = format!(
            "The previous Japanese sentence summarized as \"{}\" was: \"{}\".\n\
             The previous AI feedback provided was: \"{}\".\n\
             The original user Japanese input was: \"{}\".\n\
             Please generate a **new, more natural and improved Japanese expression** based \
             on this feedback and the original Japanese input.\n\
             1. Provide the Japanese expression in Kanji, its full Hiragana reading, and the \
             Romaji.\n\
             2. **CRITICAL:** For 'japaneseFurigana', you MUST use HTML <ruby> tags for ALL \
             Kanji. Example: <ruby>改<rt>かい</rt></ruby><ruby>良<rt>りょう</rt></ruby>\n\
             3. Provide the Traditional Chinese translation for this IMPROVED Japanese \
             expression.",
            title, kanji, feedback, original_input
        );

        let system = "You are a Japanese language expert. Output valid JSON. Ensure \
                      'japaneseFurigana' contains valid HTML ruby tags for ALL Kanji.";

        self.structured_phrase(query, system).await
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, KotonoteError> {
        let request = GenerateContentRequest {
            contents: vec![Content::from_text(text)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                }),
                ..Default::default()
            }),
        };

        let response = self.generate(&self.config.tts_model, &request).await?;
        let inline = response.first_inline_data().ok_or(KotonoteError::EmptyResponse)?;

        Ok(BASE64.decode(inline.data.as_bytes())?)
    }
}

fn phrase_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "japaneseKanji": {
                "type": "STRING",
                "description": "The complete, natural Japanese sentence in Kanji and Kana (plain text)."
            },
            "japaneseHiragana": {
                "type": "STRING",
                "description": "The Japanese sentence purely in Hiragana for TTS playback."
            },
            "romaji": {
                "type": "STRING",
                "description": "The Romanized version of the Japanese sentence."
            },
            "japaneseFurigana": {
                "type": "STRING",
                "description": "The Japanese sentence formatted with HTML <ruby> and <rt> tags for furigana (Kanji only). EXAMPLE: <ruby>日<rt>に</rt></ruby><ruby>本<rt>ほん</rt></ruby>"
            },
            "simplifiedChineseTranslation": {
                "type": "STRING",
                "description": "A short summary (max 10 characters) of the sentence."
            },
            "chineseTranslation": {
                "type": "STRING",
                "description": "The Traditional Chinese translation of the Japanese sentence."
            }
        },
        "required": [
            "japaneseKanji",
            "japaneseHiragana",
            "romaji",
            "japaneseFurigana",
            "simplifiedChineseTranslation",
            "chineseTranslation"
        ]
    })
}

fn feedback_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "grammarFeedback": {
                "type": "STRING",
                "description": "Constructive grammar feedback in Traditional Chinese."
            }
        },
        "required": ["grammarFeedback"]
    })
}
