//! `GlobalTags` Common Library
//!
//! Shared types used by the service core and the HTTP/bot front-ends.

pub mod types;

pub use types::*;
