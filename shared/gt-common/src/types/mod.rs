//! Shared Types

mod id;
mod player;

pub use id::{ParsePlayerIdError, PlayerId};
pub use player::{IconType, PlayerIcon, TagPosition};
