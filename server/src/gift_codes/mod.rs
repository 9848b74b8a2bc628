//! Gift codes: limited-use codes that grant a role on redemption.

pub mod handlers;
pub mod models;

pub use handlers::RedeemError;
pub use models::{CreateGiftCodeRequest, GiftCode, GiftCodeId, GiftCodeSummary, GiftGrant, Redemption};
