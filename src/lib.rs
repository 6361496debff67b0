//! Core engine for a personal Japanese phrase notebook: cards are generated,
//! critiqued, and improved through the Gemini API, read aloud through hosted
//! or on-device speech, and kept in local JSON storage.
//!
//! The embedder owns the event loop: construct [`store::Library`],
//! [`flows::FlowManager`], and [`audio::AudioEngine`] on one thread, call the
//! `start_*`/`play` methods from input handlers, and drain `poll()` every
//! frame to apply finished background work and collect user-facing notices.

pub mod audio;
pub mod core;
pub mod flows;
pub mod persistence;
pub mod remote;
pub mod store;

pub use audio::{AudioEngine, PlaybackState, RodioOutput};
pub use self::core::{Card, CardId, KotonoteError, PhraseFields, Tag};
pub use flows::FlowManager;
pub use persistence::JsonStorage;
pub use remote::{GeminiClient, GeminiConfig};
pub use store::Library;
