
use regex::Regex;
use tracing::warn;
use uuid::Uuid;

use crate::{
    core::{
        messages,
        models::{
            default_tag,
            next_card_id,
            Card,
            CardId,
            PhraseFields,
            Tag,
            TagColor,
            DEFAULT_TAG_ID,
        },
    },
    persistence::{
        JsonStorage,
        CARDS_KEY,
        TAGS_KEY,
    },
};

/// Improvement titles sometimes come back prefixed with a marker; strip the
/// first occurrence and tidy the whitespace.
fn clean_improved_title(raw: &str) -> String {
    match Regex::new(r"\[改良版\]\s*") {
        Ok(marker) => marker.replace(raw, "").trim().to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

fn truncated_title(input: &str) -> String {
    input.chars().take(10).collect()
}

/// The card and tag collections, newest card first, persisted wholesale on
/// every mutation. In-memory state stays authoritative for the session; a
/// failed save is logged and retried implicitly on the next mutation.
pub struct Library {
    cards: Vec<Card>,
    tags: Vec<Tag>,
    draft_tags: Vec<String>,
    last_card_id: CardId,
    storage: JsonStorage,
}

impl Library {
    /// Loads both blobs, seeding a fresh install with the default tag. The
    /// draft selection starts on the default tag when it exists.
    pub fn load(storage: JsonStorage) -> Self {
        let mut tags: Vec<Tag> = storage.load_or_default(TAGS_KEY);
        let seeded = tags.is_empty();
        if seeded {
            tags.push(default_tag());
        }

        let cards: Vec<Card> = storage.load_or_default(CARDS_KEY);
        let last_card_id = cards.iter().map(|card| card.id).max().unwrap_or(0);

        let draft_tags = if tags.iter().any(|tag| tag.id == DEFAULT_TAG_ID) {
            vec![DEFAULT_TAG_ID.to_string()]
        } else {
            Vec::new()
        };

        let library = Self { cards, tags, draft_tags, last_card_id, storage };
        if seeded {
            library.persist_tags();
        }
        library
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn tag(&self, id: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.id == id)
    }

    // --- Draft selection (tags preselected for the next card; not persisted) ---

    pub fn draft_tags(&self) -> &[String] {
        &self.draft_tags
    }

    pub fn set_draft_tags(&mut self, tag_ids: Vec<String>) {
        self.draft_tags = tag_ids;
    }

    /// Back to the default tag, or nothing if it has been deleted.
    pub fn reset_draft_tags(&mut self) {
        self.draft_tags = if self.tag(DEFAULT_TAG_ID).is_some() {
            vec![DEFAULT_TAG_ID.to_string()]
        } else {
            Vec::new()
        };
    }

    // --- Cards ---

    /// Inserts a freshly generated card at the top. A blank remote title falls
    /// back to a truncated echo of the input.
    pub fn add_generated_card(
        &mut self,
        input: &str,
        tag_ids: Vec<String>,
        fields: PhraseFields,
    ) -> CardId {
        let tag_ids = self.live_tag_ids(tag_ids);
        let trimmed = input.trim();
        let title = if fields.title.is_empty() {
            format!("{}...", truncated_title(trimmed))
        } else {
            fields.title
        };

        let card = Card {
            id: self.next_id(),
            title,
            kanji: fields.kanji,
            hiragana: fields.hiragana,
            romaji: fields.romaji,
            furigana: fields.furigana,
            translation: fields.translation,
            original_input: trimmed.to_string(),
            feedback: String::new(),
            tag_ids,
            is_fallback: false,
            is_improved: false,
        };
        let id = card.id;
        self.cards.insert(0, card);
        self.persist_cards();
        id
    }

    /// Text-only stand-in when generation fails: the raw input as kanji, all
    /// derived fields empty, marked so audio and feedback stay off.
    pub fn add_fallback_card(&mut self, input: &str, tag_ids: Vec<String>) -> CardId {
        let tag_ids = self.live_tag_ids(tag_ids);
        let trimmed = input.trim();
        let mut title = truncated_title(trimmed);
        if trimmed.chars().count() > 10 {
            title.push_str("...");
        }

        let card = Card {
            id: self.next_id(),
            title,
            kanji: trimmed.to_string(),
            hiragana: String::new(),
            romaji: String::new(),
            furigana: String::new(),
            translation: messages::NO_TRANSLATION_FALLBACK.to_string(),
            original_input: trimmed.to_string(),
            feedback: String::new(),
            tag_ids,
            is_fallback: true,
            is_improved: false,
        };
        let id = card.id;
        self.cards.insert(0, card);
        self.persist_cards();
        id
    }

    /// Builds the improved variant of `parent_id`: same tags and original
    /// input, preset feedback note, cleaned title. `None` when the parent is
    /// gone (deleted while the request was in flight).
    pub fn add_improved_card(
        &mut self,
        parent_id: CardId,
        fields: PhraseFields,
    ) -> Option<CardId> {
        let (tag_ids, original_input) = {
            let parent = self.card(parent_id)?;
            (parent.tag_ids.clone(), parent.original_input.clone())
        };

        let card = Card {
            id: self.next_id(),
            title: clean_improved_title(&fields.title),
            kanji: fields.kanji,
            hiragana: fields.hiragana,
            romaji: fields.romaji,
            furigana: fields.furigana,
            translation: fields.translation,
            original_input,
            feedback: messages::AI_FEEDBACK_INTRO.to_string(),
            tag_ids,
            is_fallback: false,
            is_improved: true,
        };
        let id = card.id;
        self.cards.insert(0, card);
        self.persist_cards();
        Some(id)
    }

    pub fn delete_card(&mut self, id: CardId) -> bool {
        let before = self.cards.len();
        self.cards.retain(|card| card.id != id);
        let removed = self.cards.len() != before;
        if removed {
            self.persist_cards();
        }
        removed
    }

    pub fn set_card_feedback(&mut self, id: CardId, feedback: String) -> bool {
        match self.cards.iter_mut().find(|card| card.id == id) {
            Some(card) => {
                card.feedback = feedback;
                self.persist_cards();
                true
            }
            None => false,
        }
    }

    pub fn clear_card_feedback(&mut self, id: CardId) -> bool {
        self.set_card_feedback(id, String::new())
    }

    pub fn set_card_tags(&mut self, id: CardId, tag_ids: Vec<String>) -> bool {
        match self.cards.iter_mut().find(|card| card.id == id) {
            Some(card) => {
                card.tag_ids = tag_ids;
                self.persist_cards();
                true
            }
            None => false,
        }
    }

    // --- Tags ---

    pub fn create_tag(&mut self, name: &str) -> String {
        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            color: TagColor::random(),
        };
        let id = tag.id.clone();
        self.tags.push(tag);
        self.persist_tags();
        id
    }

    /// Replaces the tag with the same id; unknown ids are ignored.
    pub fn update_tag(&mut self, updated: Tag) -> bool {
        match self.tags.iter_mut().find(|tag| tag.id == updated.id) {
            Some(tag) => {
                *tag = updated;
                self.persist_tags();
                true
            }
            None => false,
        }
    }

    /// Removes the tag and every reference to it (card tag sets and the
    /// draft selection) in one mutation, so no card ever points at a
    /// deleted tag.
    pub fn delete_tag(&mut self, tag_id: &str) {
        self.tags.retain(|tag| tag.id != tag_id);
        self.draft_tags.retain(|id| id != tag_id);
        for card in &mut self.cards {
            card.tag_ids.retain(|id| id != tag_id);
        }

        self.persist_tags();
        self.persist_cards();
    }

    /// A creation request snapshots the draft selection when it starts, so a
    /// tag deleted while the request is in flight can still be in the list by
    /// the time the card is built. Keep only ids that still exist.
    fn live_tag_ids(&self, mut tag_ids: Vec<String>) -> Vec<String> {
        tag_ids.retain(|id| self.tag(id).is_some());
        tag_ids
    }

    fn next_id(&mut self) -> CardId {
        self.last_card_id = next_card_id(self.last_card_id);
        self.last_card_id
    }

    fn persist_cards(&self) {
        if let Err(error) = self.storage.save(&self.cards, CARDS_KEY) {
            warn!(%error, "failed to persist cards");
        }
    }

    fn persist_tags(&self) {
        if let Err(error) = self.storage.save(&self.tags, TAGS_KEY) {
            warn!(%error, "failed to persist tags");
        }
    }
}
