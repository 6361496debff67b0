use std::{
    sync::{
        mpsc::{
            self,
            Receiver,
            Sender,
        },
        Arc,
    },
    thread,
};

use tokio::runtime::Runtime;
use tracing::{
    debug,
    warn,
};

use super::types::{
    FlowEvent,
    SlotKey,
};
use crate::{
    core::{
        messages,
        models::CardId,
        slots::RequestSlots,
    },
    remote::client::PhraseGenerator,
    store::Library,
};

/// Drives the three remote generation flows against a [`Library`].
///
/// Each flow occupies a slot in [`RequestSlots`]: one global slot for card
/// creation, and one per card for feedback and improvement. Requests run on
/// worker threads and report back over a channel; [`FlowManager::poll`]
/// drains the channel on the embedder's thread, so the library is only ever
/// mutated there. Results whose token no longer matches the slot are dropped
/// without touching the library.
pub struct FlowManager {
    runtime: Arc<Runtime>,
    client: Arc<dyn PhraseGenerator>,
    sender: Sender<FlowEvent>,
    receiver: Receiver<FlowEvent>,
    slots: RequestSlots<SlotKey>,
    notices: Vec<String>,
}

impl FlowManager {
    pub fn new(runtime: Arc<Runtime>, client: Arc<dyn PhraseGenerator>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            runtime,
            client,
            sender,
            receiver,
            slots: RequestSlots::new(),
            notices: Vec::new(),
        }
    }

    fn task_context(&self) -> (Sender<FlowEvent>, Arc<Runtime>, Arc<dyn PhraseGenerator>) {
        (
            self.sender.clone(),
            self.runtime.clone(),
            self.client.clone(),
        )
    }

    // --- Card creation ---

    /// Kicks off card generation for the raw input box contents. Blank input
    /// produces a prompt notice instead of a request. A second call while one
    /// is in flight supersedes the first.
    pub fn start_create(&mut self, library: &Library, input: &str) {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            self.notices.push(messages::INPUT_REQUIRED.to_string());
            return;
        }

        let token = self.slots.start(SlotKey::Create);
        let input = trimmed.to_string();
        let tag_ids = library.draft_tags().to_vec();
        let (sender, runtime, client) = self.task_context();

        thread::spawn(move || {
            let result = runtime.block_on(async { client.create_card(&input).await });

            let _ = sender.send(FlowEvent::CardGenerated {
                token,
                input,
                tag_ids,
                result,
            });
        });
    }

    pub fn cancel_create(&mut self) {
        self.slots.cancel(SlotKey::Create);
    }

    pub fn is_creating(&self) -> bool {
        self.slots.is_active(&SlotKey::Create)
    }

    // --- Grammar feedback ---

    /// Requests grammar feedback for a card. Fallback cards and cards without
    /// a recorded input are skipped. A repeat call for the same card
    /// supersedes the earlier one; other cards are unaffected.
    pub fn start_feedback(&mut self, library: &Library, card_id: CardId) {
        let card = match library.card(card_id) {
            Some(card) if card.accepts_feedback() => card,
            _ => return,
        };

        let token = self.slots.start(SlotKey::Feedback(card_id));
        let original_input = card.original_input.clone();
        let kanji = card.kanji.clone();
        let (sender, runtime, client) = self.task_context();

        thread::spawn(move || {
            let result = runtime
                .block_on(async { client.grammar_feedback(&original_input, &kanji).await });

            let _ = sender.send(FlowEvent::FeedbackReady {
                token,
                card_id,
                result,
            });
        });
    }

    pub fn cancel_feedback(&mut self, card_id: CardId) {
        self.slots.cancel(SlotKey::Feedback(card_id));
    }

    pub fn is_feedback_pending(&self, card_id: CardId) -> bool {
        self.slots.is_active(&SlotKey::Feedback(card_id))
    }

    // --- Improvement ---

    /// Generates an improved version of a card from its stored feedback. The
    /// card must have both feedback and a recorded input.
    pub fn start_improvement(&mut self, library: &Library, card_id: CardId) {
        let card = match library.card(card_id) {
            Some(card) if card.accepts_improvement() => card,
            _ => return,
        };

        let token = self.slots.start(SlotKey::Improve(card_id));
        let title = card.title.clone();
        let kanji = card.kanji.clone();
        let feedback = card.feedback.clone();
        let original_input = card.original_input.clone();
        let (sender, runtime, client) = self.task_context();

        thread::spawn(move || {
            let result = runtime.block_on(async {
                client
                    .improve_card(&title, &kanji, &feedback, &original_input)
                    .await
            });

            let _ = sender.send(FlowEvent::ImprovementReady {
                token,
                parent_id: card_id,
                result,
            });
        });
    }

    pub fn cancel_improvement(&mut self, card_id: CardId) {
        self.slots.cancel(SlotKey::Improve(card_id));
    }

    pub fn is_improving(&self, card_id: CardId) -> bool {
        self.slots.is_active(&SlotKey::Improve(card_id))
    }

    // --- Event loop ---

    /// Applies finished requests to the library and returns any user-facing
    /// notices raised since the last poll. Call once per frame.
    pub fn poll(&mut self, library: &mut Library) -> Vec<String> {
        while let Ok(event) = self.receiver.try_recv() {
            self.apply(event, library);
        }
        std::mem::take(&mut self.notices)
    }

    fn apply(&mut self, event: FlowEvent, library: &mut Library) {
        match event {
            FlowEvent::CardGenerated {
                token,
                input,
                tag_ids,
                result,
            } => {
                if !self.slots.is_current(&SlotKey::Create, token) {
                    debug!("discarding superseded card generation");
                    return;
                }

                match result {
                    Ok(fields) => {
                        library.add_generated_card(&input, tag_ids, fields);
                        library.reset_draft_tags();
                    }
                    Err(error) => {
                        warn!(%error, "card generation failed");
                        let message = if error.is_quota() {
                            messages::API_QUOTA
                        } else {
                            messages::CONNECTION_ERROR
                        };
                        self.notices.push(message.to_string());
                        library.add_fallback_card(&input, tag_ids);
                    }
                }
                self.slots.finish(&SlotKey::Create, token);
            }
            FlowEvent::FeedbackReady {
                token,
                card_id,
                result,
            } => {
                if !self.slots.is_current(&SlotKey::Feedback(card_id), token) {
                    debug!(card_id, "discarding superseded feedback");
                    return;
                }

                match result {
                    Ok(feedback) => {
                        library.set_card_feedback(card_id, feedback);
                    }
                    Err(error) => {
                        warn!(%error, card_id, "feedback request failed");
                        let message = if error.is_quota() {
                            messages::API_QUOTA_SIMPLE.to_string()
                        } else {
                            format!("{} {}", messages::FEEDBACK_FAILED_PREFIX, error)
                        };
                        self.notices.push(message);
                    }
                }
                self.slots.finish(&SlotKey::Feedback(card_id), token);
            }
            FlowEvent::ImprovementReady {
                token,
                parent_id,
                result,
            } => {
                if !self.slots.is_current(&SlotKey::Improve(parent_id), token) {
                    debug!(parent_id, "discarding superseded improvement");
                    return;
                }

                match result {
                    Ok(fields) => {
                        if library.add_improved_card(parent_id, fields).is_none() {
                            debug!(parent_id, "improvement arrived after the card was deleted");
                        }
                    }
                    Err(error) => {
                        warn!(%error, parent_id, "improvement request failed");
                        let message = if error.is_quota() {
                            messages::IMPROVE_QUOTA_ERROR.to_string()
                        } else {
                            format!("{} {}", messages::IMPROVE_FAILED_PREFIX, error)
                        };
                        self.notices.push(message);
                    }
                }
                self.slots.finish(&SlotKey::Improve(parent_id), token);
            }
        }
    }
}
