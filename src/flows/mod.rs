pub mod manager;
pub mod types;


pub use manager::FlowManager;
pub use types::{
    FlowEvent,
    SlotKey,
};
