//! # Domain Models
//!
//! Canonical, provider-agnostic types for one token analytics run.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TokenIdentifier`] | Chain + contract (+ optional pair) correlation key |
//! | [`HolderSnapshot`] | Point-in-time holder balances |
//! | [`TradeWindow`] | DEX trades bounded by a since-date |
//! | [`TransferWindow`] | Token transfers bounded by a since-date |
//! | [`CanonicalSection`] | Normalized payload of one provider |
//! | [`UtcDateTime`] / [`CalendarDate`] | UTC timestamps and days |
//!
//! Balances, amounts and prices are [`rust_decimal::Decimal`] throughout so
//! that textual provider values are never routed through binary floats.

mod holder;
mod models;
mod timestamp;
mod token;
mod trade;

pub use holder::{HolderRecord, HolderSnapshot};
pub use models::{
    CanonicalSection, HolderSection, PriceSection, RollingWindows, SocialSection, TradeSection,
    TransferSection,
};
pub use timestamp::{CalendarDate, UtcDateTime};
pub use token::TokenIdentifier;
pub use trade::{TradeRecord, TradeSide, TradeWindow, TransferRecord, TransferWindow};
