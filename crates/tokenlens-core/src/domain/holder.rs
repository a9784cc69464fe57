use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CalendarDate;

/// One holder balance at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderRecord {
    pub address: String,
    pub balance: Decimal,
}

impl HolderRecord {
    pub fn new(address: impl Into<String>, balance: Decimal) -> Self {
        Self {
            address: address.into(),
            balance,
        }
    }
}

/// Point-in-time holder distribution.
///
/// Immutable after construction; statistics are always derived from it, never
/// stored back into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderSnapshot {
    date: CalendarDate,
    holders: Vec<HolderRecord>,
}

impl HolderSnapshot {
    pub fn new(date: CalendarDate, holders: Vec<HolderRecord>) -> Self {
        Self { date, holders }
    }

    pub fn date(&self) -> CalendarDate {
        self.date
    }

    pub fn holders(&self) -> &[HolderRecord] {
        &self.holders
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    pub fn balances(&self) -> Vec<Decimal> {
        self.holders.iter().map(|holder| holder.balance).collect()
    }

    pub fn unique_addresses(&self) -> usize {
        self.holders
            .iter()
            .map(|holder| holder.address.to_ascii_lowercase())
            .collect::<HashSet<_>>()
            .len()
    }
}
