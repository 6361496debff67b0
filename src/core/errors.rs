use thiserror::Error;

#[derive(Error, Debug)]
pub enum KotonoteError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("WAV error: {0}")]
    Wav(Box<hound::Error>),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("API Key is missing.")]
    MissingApiKey,

    #[error("Request quota exhausted (429)")]
    QuotaExhausted,

    #[error("Remote API error ({status}): {message}")]
    RemoteApi { status: u16, message: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("KotonoteError: {0}")]
    Custom(String),
}

impl KotonoteError {
    /// Rate-limit classification: the dedicated variant, an HTTP 429, or an error
    /// signal carrying the provider's exhaustion marker all count as quota errors.
    pub fn is_quota(&self) -> bool {
        match self {
            KotonoteError::QuotaExhausted => true,
            KotonoteError::RemoteApi { status, message } => {
                *status == 429 || message.contains("RESOURCE_EXHAUSTED")
            }
            KotonoteError::Reqwest(e) => e.status().map(|s| s.as_u16() == 429).unwrap_or(false),
            other => {
                let text = other.to_string();
                text.contains("429") || text.contains("RESOURCE_EXHAUSTED")
            }
        }
    }
}

impl From<std::io::Error> for KotonoteError {
    fn from(error: std::io::Error) -> Self {
        KotonoteError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for KotonoteError {
    fn from(error: reqwest::Error) -> Self {
        KotonoteError::Reqwest(Box::new(error))
    }
}

impl From<hound::Error> for KotonoteError {
    fn from(error: hound::Error) -> Self {
        KotonoteError::Wav(Box::new(error))
    }
}
