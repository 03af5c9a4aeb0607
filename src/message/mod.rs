//! IRC message parsing and formatting.

mod parse;
mod serialize;
pub mod tags;
mod types;

pub use self::tags::Tag;
pub use self::types::{Message, MessageFlags, MAX_BODY_LEN, MAX_TAGS_LEN};
