use crate::core::{
    errors::KotonoteError,
    models::{
        CardId,
        PhraseFields,
    },
    slots::RequestToken,
};

/// Slot namespaces for the three generation flows. Creation is a single
/// global slot; feedback and improvement are tracked per card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    Create,
    Feedback(CardId),
    Improve(CardId),
}

/// Completion messages from the request worker threads. The token decides
/// whether a result still matters by the time it is applied.
pub enum FlowEvent {
    CardGenerated {
        token: RequestToken,
        /// Trimmed input captured when the request started.
        input: String,
        /// Draft tag selection captured when the request started.
        tag_ids: Vec<String>,
        result: Result<PhraseFields, KotonoteError>,
    },
    FeedbackReady {
        token: RequestToken,
        card_id: CardId,
        result: Result<String, KotonoteError>,
    },
    ImprovementReady {
        token: RequestToken,
        parent_id: CardId,
        result: Result<PhraseFields, KotonoteError>,
    },
}
