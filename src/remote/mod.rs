pub mod client;
pub mod types;


pub use client::{
    GeminiClient,
    GeminiConfig,
    PhraseGenerator,
    SpeechSynthesizer,
};
pub use types::PhraseResponse;
