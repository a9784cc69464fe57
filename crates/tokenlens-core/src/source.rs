use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in manifests and envelopes.
///
/// One identifier is one logical fetch, so a vendor exposing several feeds
/// (Bitquery) appears once per feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Moralis,
    BitqueryHolders,
    BitqueryTrades,
    BitqueryTransfers,
    Gmgn,
}

impl ProviderId {
    pub const ALL: [Self; 5] = [
        Self::Moralis,
        Self::BitqueryHolders,
        Self::BitqueryTrades,
        Self::BitqueryTransfers,
        Self::Gmgn,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Moralis => "moralis",
            Self::BitqueryHolders => "bitquery_holders",
            Self::BitqueryTrades => "bitquery_trades",
            Self::BitqueryTransfers => "bitquery_transfers",
            Self::Gmgn => "gmgn",
        }
    }

    /// The canonical section this provider's payload normalizes into.
    pub const fn section(self) -> SectionName {
        match self {
            Self::Moralis => SectionName::Price,
            Self::BitqueryHolders => SectionName::Holders,
            Self::BitqueryTrades => SectionName::Trades,
            Self::BitqueryTransfers => SectionName::Transfers,
            Self::Gmgn => SectionName::Social,
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "moralis" => Ok(Self::Moralis),
            "bitquery_holders" => Ok(Self::BitqueryHolders),
            "bitquery_trades" => Ok(Self::BitqueryTrades),
            "bitquery_transfers" => Ok(Self::BitqueryTransfers),
            "gmgn" => Ok(Self::Gmgn),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}

/// Data category of an aggregate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Price,
    Holders,
    Trades,
    Transfers,
    Social,
}

impl SectionName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Holders => "holders",
            Self::Trades => "trades",
            Self::Transfers => "transfers",
            Self::Social => "social",
        }
    }
}

impl Display for SectionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
