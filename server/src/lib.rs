//! GlobalTags Server Core
//!
//! Role-based permissions, player tag settings and the moderation
//! workflow behind them. Transport layers sit on top of the handlers in
//! each module; storage and notification delivery are pluggable ports.

pub mod clock;
pub mod config;
pub mod error;
pub mod gift_codes;
pub mod i18n;
pub mod locks;
pub mod moderation;
pub mod notify;
pub mod observability;
pub mod permissions;
pub mod players;
pub mod roles;
pub mod session;
pub mod state;
pub mod store;
pub mod util;
pub mod validation;
