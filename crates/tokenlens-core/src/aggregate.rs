//! Folding normalized sections into one [`AggregateRecord`].
//!
//! Every enabled provider leaves exactly one manifest entry. A failed
//! provider's record field holds an explicit `absent` marker carrying the
//! originating error; disabled providers are `not_requested` and have no
//! manifest entry. Cross-section fields are only derived when all of their
//! inputs are present.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stats::{percent_change, DerivedStatistics};
use crate::{
    CanonicalSection, ComputationError, HolderSnapshot, PriceSection, ProviderId, ProviderResult,
    SectionName, SocialSection, SourceError, TokenIdentifier, TradeSide, TradeWindow,
    TransferRecord, TransferWindow, UtcDateTime,
};

/// One record field, tagged by `status` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Present { data: T },
    /// Usable data with a caveat, e.g. statistics over a truncated snapshot.
    Degraded { data: T, note: String },
    Absent { reason: SourceError },
    NotRequested,
}

impl<T> Section<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Present { data } | Self::Degraded { data, .. } => Some(data),
            Self::Absent { .. } | Self::NotRequested => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    pub fn reason(&self) -> Option<&SourceError> {
        match self {
            Self::Absent { reason } => Some(reason),
            _ => None,
        }
    }

    fn from_data(data: T, note: Option<String>) -> Self {
        match note {
            Some(note) => Self::Degraded { data, note },
            None => Self::Present { data },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Present,
    Degraded,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub provider: ProviderId,
    pub status: ManifestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SourceError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Per-section outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionManifest {
    entries: BTreeMap<SectionName, ManifestEntry>,
}

impl SectionManifest {
    pub fn entry(&self, section: SectionName) -> Option<&ManifestEntry> {
        self.entries.get(&section)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionName, &ManifestEntry)> {
        self.entries.iter().map(|(section, entry)| (*section, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, status: ManifestStatus) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.status == status)
            .count()
    }

    /// Sections that produced data, degraded or not.
    pub fn produced(&self) -> usize {
        self.count(ManifestStatus::Present) + self.count(ManifestStatus::Degraded)
    }

    fn record<T>(&mut self, section: SectionName, provider: ProviderId, value: &Section<T>) {
        let (status, error, note) = match value {
            Section::Present { .. } => (ManifestStatus::Present, None, None),
            Section::Degraded { note, .. } => (ManifestStatus::Degraded, None, Some(note.clone())),
            Section::Absent { reason } => (ManifestStatus::Missing, Some(reason.clone()), None),
            Section::NotRequested => return,
        };
        self.entries.insert(
            section,
            ManifestEntry {
                provider,
                status,
                error,
                note,
            },
        );
    }
}

/// Holder snapshot plus its locally derived statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderAnalytics {
    pub snapshot: HolderSnapshot,
    pub statistics: DerivedStatistics,
}

/// Trade window analytics.
///
/// The window is split at its midpoint into a previous and a current half;
/// `dex_volume_change` compares their token volumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAnalytics {
    pub since: UtcDateTime,
    pub until: UtcDateTime,
    pub trade_count: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub volume: Decimal,
    pub buy_volume: Decimal,
    pub sell_volume: Decimal,
    pub quote_volume: Decimal,
    pub unique_traders: usize,
    pub split_at: UtcDateTime,
    pub previous_volume: Decimal,
    pub current_volume: Decimal,
    pub dex_volume_change: Option<Decimal>,
    pub window: TradeWindow,
}

impl TradeAnalytics {
    pub fn from_window(window: TradeWindow) -> Result<Self, ComputationError> {
        let split_at = window.since().midpoint(window.until());
        let (previous, current) = window.split_at(split_at);
        let previous_volume = previous.volume()?;
        let current_volume = current.volume()?;
        let dex_volume_change = if previous.is_empty() || current.is_empty() {
            None
        } else {
            percent_change(previous_volume, current_volume)
        };

        Ok(Self {
            since: window.since(),
            until: window.until(),
            trade_count: window.trades().len(),
            buy_count: window.count_for(TradeSide::Buy),
            sell_count: window.count_for(TradeSide::Sell),
            volume: window.volume()?,
            buy_volume: window.volume_for(TradeSide::Buy)?,
            sell_volume: window.volume_for(TradeSide::Sell)?,
            quote_volume: window.quote_volume()?,
            unique_traders: window.unique_traders(),
            split_at,
            previous_volume,
            current_volume,
            dex_volume_change,
            window,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferAnalytics {
    pub transfer_count: usize,
    pub total_amount: Decimal,
    pub unique_senders: usize,
    pub unique_receivers: usize,
    pub largest: Option<TransferRecord>,
    pub window: TransferWindow,
}

impl TransferAnalytics {
    pub fn from_window(window: TransferWindow) -> Result<Self, ComputationError> {
        Ok(Self {
            transfer_count: window.transfers().len(),
            total_amount: window.total_amount()?,
            unique_senders: window.unique_senders(),
            unique_receivers: window.unique_receivers(),
            largest: window.largest().cloned(),
            window,
        })
    }
}

/// Inputs a downstream risk model would consume. No score is computed here.
///
/// Every field serializes as an explicit `null` when its source section is
/// absent or the value is undefined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskInputs {
    pub liquidity_usd: Option<Decimal>,
    pub price_change_24h_pct: Option<Decimal>,
    pub liquidity_change_24h_pct: Option<Decimal>,
    pub volume_to_liquidity_24h: Option<Decimal>,
    pub top1_share: Option<Decimal>,
    pub top10_share: Option<Decimal>,
    pub gini: Option<f64>,
    pub nakamoto: Option<usize>,
    pub buy_sell_ratio: Option<Decimal>,
    pub unique_traders: Option<usize>,
    pub dex_volume_change: Option<Decimal>,
}

impl RiskInputs {
    fn derive(
        price: Option<&PriceSection>,
        holders: Option<&HolderAnalytics>,
        trades: Option<&TradeAnalytics>,
    ) -> Self {
        let statistics = holders.map(|holders| &holders.statistics);
        Self {
            liquidity_usd: price.map(|price| price.liquidity_usd),
            price_change_24h_pct: price.map(|price| price.price_change_pct.twenty_four_hour),
            liquidity_change_24h_pct: price
                .map(|price| price.liquidity_change_pct.twenty_four_hour),
            volume_to_liquidity_24h: price.and_then(|price| {
                price
                    .total_volume
                    .twenty_four_hour
                    .checked_div(price.liquidity_usd)
            }),
            top1_share: statistics.and_then(|statistics| statistics.top1_share),
            top10_share: statistics.and_then(|statistics| statistics.top10_share),
            gini: statistics.map(|statistics| statistics.gini),
            nakamoto: statistics.map(|statistics| statistics.nakamoto),
            buy_sell_ratio: trades.and_then(|trades| {
                Decimal::from(trades.buy_count).checked_div(Decimal::from(trades.sell_count))
            }),
            unique_traders: trades.map(|trades| trades.unique_traders),
            dex_volume_change: trades.and_then(|trades| trades.dex_volume_change),
        }
    }
}

/// Unified analytics record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub token: TokenIdentifier,
    pub generated_at: UtcDateTime,
    pub price: Section<PriceSection>,
    pub holders: Section<HolderAnalytics>,
    pub trades: Section<TradeAnalytics>,
    pub transfers: Section<TransferAnalytics>,
    pub social: Section<SocialSection>,
    pub risk: RiskInputs,
    pub manifest: SectionManifest,
}

impl AggregateRecord {
    /// No enabled section is missing.
    pub fn is_complete(&self) -> bool {
        self.manifest.count(ManifestStatus::Missing) == 0
    }
}

/// Folds normalized provider results into an [`AggregateRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateBuilder {
    nakamoto_threshold: Decimal,
    holder_limit: usize,
    trade_limit: usize,
}

impl AggregateBuilder {
    /// `holder_limit` and `trade_limit` are the provider page sizes. A full
    /// page means the older or smaller part of the data was cut off.
    pub fn new(nakamoto_threshold: Decimal, holder_limit: usize, trade_limit: usize) -> Self {
        Self {
            nakamoto_threshold,
            holder_limit,
            trade_limit,
        }
    }

    /// Builds the record, stamping `generated_at` with the current time.
    ///
    /// `sections` holds one entry per enabled provider.
    ///
    /// # Errors
    ///
    /// Fails only with a [`ComputationError`]; provider failures are recorded
    /// in the manifest instead.
    pub fn build(
        &self,
        token: &TokenIdentifier,
        sections: BTreeMap<ProviderId, ProviderResult<CanonicalSection>>,
    ) -> Result<AggregateRecord, ComputationError> {
        let mut price = Section::NotRequested;
        let mut holders = Section::NotRequested;
        let mut trades = Section::NotRequested;
        let mut transfers = Section::NotRequested;
        let mut social = Section::NotRequested;
        let mut manifest = SectionManifest::default();

        for (provider, result) in sections {
            match result {
                Ok(CanonicalSection::Price(data)) => {
                    price = Section::Present { data };
                    manifest.record(SectionName::Price, provider, &price);
                }
                Ok(CanonicalSection::Holders(data)) => {
                    holders = self.holder_section(data.snapshot)?;
                    manifest.record(SectionName::Holders, provider, &holders);
                }
                Ok(CanonicalSection::Trades(data)) => {
                    trades = self.trade_section(data.window)?;
                    manifest.record(SectionName::Trades, provider, &trades);
                }
                Ok(CanonicalSection::Transfers(data)) => {
                    transfers = self.transfer_section(data.window)?;
                    manifest.record(SectionName::Transfers, provider, &transfers);
                }
                Ok(CanonicalSection::Social(data)) => {
                    let note = [&data.name, &data.price, &data.fdv, &data.holders, &data.liquidity]
                        .iter()
                        .all(|value| value.is_none())
                        .then(|| String::from("no labelled values found on the page"));
                    social = Section::from_data(data, note);
                    manifest.record(SectionName::Social, provider, &social);
                }
                Err(reason) => {
                    let section = provider.section();
                    match section {
                        SectionName::Price => {
                            price = Section::Absent { reason };
                            manifest.record(section, provider, &price);
                        }
                        SectionName::Holders => {
                            holders = Section::Absent { reason };
                            manifest.record(section, provider, &holders);
                        }
                        SectionName::Trades => {
                            trades = Section::Absent { reason };
                            manifest.record(section, provider, &trades);
                        }
                        SectionName::Transfers => {
                            transfers = Section::Absent { reason };
                            manifest.record(section, provider, &transfers);
                        }
                        SectionName::Social => {
                            social = Section::Absent { reason };
                            manifest.record(section, provider, &social);
                        }
                    }
                }
            }
        }

        let risk = RiskInputs::derive(price.data(), holders.data(), trades.data());

        Ok(AggregateRecord {
            token: token.clone(),
            generated_at: UtcDateTime::now(),
            price,
            holders,
            trades,
            transfers,
            social,
            risk,
            manifest,
        })
    }

    fn holder_section(
        &self,
        snapshot: HolderSnapshot,
    ) -> Result<Section<HolderAnalytics>, ComputationError> {
        let statistics = DerivedStatistics::from_snapshot(&snapshot, self.nakamoto_threshold)?;
        let note = if snapshot.is_empty() {
            Some(String::from("holder snapshot is empty"))
        } else if snapshot.len() >= self.holder_limit {
            Some(format!(
                "statistics cover the top {} holders only",
                snapshot.len()
            ))
        } else {
            None
        };

        Ok(Section::from_data(
            HolderAnalytics {
                snapshot,
                statistics,
            },
            note,
        ))
    }

    /// A full page holds only the newest trades, so the previous half of the
    /// window is incomplete and its volume change is left undefined.
    fn trade_section(
        &self,
        window: TradeWindow,
    ) -> Result<Section<TradeAnalytics>, ComputationError> {
        let mut analytics = TradeAnalytics::from_window(window)?;
        let note = if analytics.window.is_empty() {
            Some(String::from("no trades in the requested window"))
        } else if analytics.window.len() >= self.trade_limit {
            analytics.dex_volume_change = None;
            Some(format!("covers the newest {} trades only", analytics.window.len()))
        } else {
            None
        };

        Ok(Section::from_data(analytics, note))
    }

    fn transfer_section(
        &self,
        window: TransferWindow,
    ) -> Result<Section<TransferAnalytics>, ComputationError> {
        let note = if window.is_empty() {
            Some(String::from("no transfers in the requested window"))
        } else if window.len() >= self.trade_limit {
            Some(format!("covers the newest {} transfers only", window.len()))
        } else {
            None
        };

        Ok(Section::from_data(TransferAnalytics::from_window(window)?, note))
    }
}
