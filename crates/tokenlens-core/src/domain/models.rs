use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{HolderSnapshot, SectionName, TradeWindow, TransferWindow, UtcDateTime};

/// Values reported over the rolling windows used by pair-stats feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingWindows {
    pub five_min: Decimal,
    pub one_hour: Decimal,
    pub four_hour: Decimal,
    pub twenty_four_hour: Decimal,
}

/// Canonical price and liquidity section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSection {
    pub token_name: String,
    pub token_symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_logo: Option<String>,
    pub pair_label: String,
    pub pair_created: String,
    pub exchange: String,
    pub usd_price: Decimal,
    pub native_price: Decimal,
    pub liquidity_usd: Decimal,
    pub price_change_pct: RollingWindows,
    pub liquidity_change_pct: RollingWindows,
    pub buys: RollingWindows,
    pub sells: RollingWindows,
    pub total_volume: RollingWindows,
    pub buy_volume: RollingWindows,
    pub sell_volume: RollingWindows,
    pub buyers: RollingWindows,
    pub sellers: RollingWindows,
    pub as_of: UtcDateTime,
}

/// Canonical holder-distribution section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderSection {
    pub snapshot: HolderSnapshot,
}

/// Canonical DEX trade section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSection {
    pub window: TradeWindow,
}

/// Canonical token transfer section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSection {
    pub window: TransferWindow,
}

/// Labelled values scraped from a social/aggregator token page.
///
/// Values stay textual because the page mixes units and suffixes (`$1.2M`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialSection {
    pub name: Option<String>,
    pub price: Option<String>,
    pub fdv: Option<String>,
    pub holders: Option<String>,
    pub liquidity: Option<String>,
    pub content_length: usize,
    pub as_of: UtcDateTime,
}

/// Provider-agnostic normalized payload, one variant per section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum CanonicalSection {
    Price(PriceSection),
    Holders(HolderSection),
    Trades(TradeSection),
    Transfers(TransferSection),
    Social(SocialSection),
}

impl CanonicalSection {
    pub const fn name(&self) -> SectionName {
        match self {
            Self::Price(_) => SectionName::Price,
            Self::Holders(_) => SectionName::Holders,
            Self::Trades(_) => SectionName::Trades,
            Self::Transfers(_) => SectionName::Transfers,
            Self::Social(_) => SectionName::Social,
        }
    }
}
