pub mod errors;
pub mod messages;
pub mod models;
pub mod slots;


pub use errors::KotonoteError;
pub use models::{ Card, CardId, PhraseFields, Tag, TagColor };
pub use slots::{ RequestSlots, RequestToken };
