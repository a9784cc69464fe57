use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ComputationError, UtcDateTime};

/// Direction of a trade from the token's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Single DEX trade touching the analysed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: UtcDateTime,
    pub side: TradeSide,
    pub buyer: String,
    pub seller: String,
    /// Token amount exchanged.
    pub amount: Decimal,
    /// Price of one token in the counter currency.
    pub price: Decimal,
    pub tx_hash: String,
}

impl TradeRecord {
    /// Address on the trader side: the receiver of the token on buys, the
    /// sender on sells.
    pub fn trader(&self) -> &str {
        match self.side {
            TradeSide::Buy => &self.buyer,
            TradeSide::Sell => &self.seller,
        }
    }
}

/// Trades in `[since, until]`, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeWindow {
    since: UtcDateTime,
    until: UtcDateTime,
    trades: Vec<TradeRecord>,
}

impl TradeWindow {
    pub fn new(since: UtcDateTime, until: UtcDateTime, mut trades: Vec<TradeRecord>) -> Self {
        trades.sort_by(|left, right| {
            right
                .timestamp
                .cmp(&left.timestamp)
                .then_with(|| left.tx_hash.cmp(&right.tx_hash))
        });
        Self {
            since,
            until,
            trades,
        }
    }

    pub fn since(&self) -> UtcDateTime {
        self.since
    }

    pub fn until(&self) -> UtcDateTime {
        self.until
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Split into `(earlier, later)` halves at `at`; trades stamped exactly at
    /// `at` belong to the later half.
    pub fn split_at(&self, at: UtcDateTime) -> (TradeWindow, TradeWindow) {
        let (later, earlier): (Vec<_>, Vec<_>) = self
            .trades
            .iter()
            .cloned()
            .partition(|trade| trade.timestamp >= at);

        (
            TradeWindow::new(self.since, at, earlier),
            TradeWindow::new(at, self.until, later),
        )
    }

    pub fn volume(&self) -> Result<Decimal, ComputationError> {
        checked_sum(self.trades.iter().map(|trade| trade.amount), "trade volume")
    }

    pub fn volume_for(&self, side: TradeSide) -> Result<Decimal, ComputationError> {
        checked_sum(
            self.trades
                .iter()
                .filter(|trade| trade.side == side)
                .map(|trade| trade.amount),
            "trade volume",
        )
    }

    /// Sum of `amount * price` over all trades.
    pub fn quote_volume(&self) -> Result<Decimal, ComputationError> {
        self.trades.iter().try_fold(Decimal::ZERO, |acc, trade| {
            trade
                .amount
                .checked_mul(trade.price)
                .and_then(|value| acc.checked_add(value))
                .ok_or(ComputationError::Overflow {
                    operation: "quote volume",
                })
        })
    }

    pub fn count_for(&self, side: TradeSide) -> usize {
        self.trades.iter().filter(|trade| trade.side == side).count()
    }

    pub fn unique_traders(&self) -> usize {
        self.trades
            .iter()
            .map(|trade| trade.trader().to_ascii_lowercase())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Plain token transfer between two addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub timestamp: UtcDateTime,
    pub sender: String,
    pub receiver: String,
    pub amount: Decimal,
    pub tx_hash: String,
}

/// Transfers in `[since, until]`, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferWindow {
    since: UtcDateTime,
    until: UtcDateTime,
    transfers: Vec<TransferRecord>,
}

impl TransferWindow {
    pub fn new(since: UtcDateTime, until: UtcDateTime, mut transfers: Vec<TransferRecord>) -> Self {
        transfers.sort_by(|left, right| {
            right
                .timestamp
                .cmp(&left.timestamp)
                .then_with(|| left.tx_hash.cmp(&right.tx_hash))
        });
        Self {
            since,
            until,
            transfers,
        }
    }

    pub fn since(&self) -> UtcDateTime {
        self.since
    }

    pub fn until(&self) -> UtcDateTime {
        self.until
    }

    pub fn transfers(&self) -> &[TransferRecord] {
        &self.transfers
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    pub fn total_amount(&self) -> Result<Decimal, ComputationError> {
        checked_sum(
            self.transfers.iter().map(|transfer| transfer.amount),
            "transfer amount",
        )
    }

    pub fn largest(&self) -> Option<&TransferRecord> {
        self.transfers.iter().max_by(|left, right| {
            left.amount
                .cmp(&right.amount)
                .then_with(|| right.tx_hash.cmp(&left.tx_hash))
        })
    }

    pub fn unique_senders(&self) -> usize {
        self.transfers
            .iter()
            .map(|transfer| transfer.sender.to_ascii_lowercase())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn unique_receivers(&self) -> usize {
        self.transfers
            .iter()
            .map(|transfer| transfer.receiver.to_ascii_lowercase())
            .collect::<HashSet<_>>()
            .len()
    }
}

fn checked_sum(
    mut values: impl Iterator<Item = Decimal>,
    operation: &'static str,
) -> Result<Decimal, ComputationError> {
    values.try_fold(Decimal::ZERO, |acc, value| {
        acc.checked_add(value)
            .ok_or(ComputationError::Overflow { operation })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(ts: &str, side: TradeSide, trader: &str, amount: i64) -> TradeRecord {
        let (buyer, seller) = match side {
            TradeSide::Buy => (trader.to_owned(), String::from("0xpool")),
            TradeSide::Sell => (String::from("0xpool"), trader.to_owned()),
        };
        TradeRecord {
            timestamp: UtcDateTime::parse(ts).expect("timestamp"),
            side,
            buyer,
            seller,
            amount: Decimal::from(amount),
            price: Decimal::new(5, 1),
            tx_hash: format!("0x{ts}"),
        }
    }

    fn window(trades: Vec<TradeRecord>) -> TradeWindow {
        TradeWindow::new(
            UtcDateTime::parse("2024-01-01T00:00:00Z").expect("since"),
            UtcDateTime::parse("2024-01-03T00:00:00Z").expect("until"),
            trades,
        )
    }

    #[test]
    fn orders_trades_most_recent_first() {
        let window = window(vec![
            trade("2024-01-01T01:00:00Z", TradeSide::Buy, "0xa", 1),
            trade("2024-01-02T01:00:00Z", TradeSide::Sell, "0xb", 2),
        ]);
        assert_eq!(window.trades()[0].amount, Decimal::from(2));
    }

    #[test]
    fn split_assigns_trades_to_halves() {
        let window = window(vec![
            trade("2024-01-01T01:00:00Z", TradeSide::Buy, "0xa", 1),
            trade("2024-01-02T00:00:00Z", TradeSide::Buy, "0xb", 2),
            trade("2024-01-02T05:00:00Z", TradeSide::Sell, "0xa", 3),
        ]);
        let midpoint = window.since().midpoint(window.until());
        let (earlier, later) = window.split_at(midpoint);

        assert_eq!(earlier.trades().len(), 1);
        assert_eq!(later.trades().len(), 2);
        assert_eq!(later.volume().expect("volume"), Decimal::from(5));
    }

    #[test]
    fn counts_unique_traders_case_insensitively() {
        let window = window(vec![
            trade("2024-01-01T01:00:00Z", TradeSide::Buy, "0xAbC", 1),
            trade("2024-01-01T02:00:00Z", TradeSide::Sell, "0xabc", 1),
            trade("2024-01-01T03:00:00Z", TradeSide::Buy, "0xdef", 1),
        ]);
        assert_eq!(window.unique_traders(), 2);
        assert_eq!(window.count_for(TradeSide::Buy), 2);
        assert_eq!(window.quote_volume().expect("quote"), Decimal::new(15, 1));
    }

    #[test]
    fn side_volume_sums_only_that_side() {
        let window = window(vec![
            trade("2024-01-01T01:00:00Z", TradeSide::Buy, "0xa", 4),
            trade("2024-01-01T02:00:00Z", TradeSide::Sell, "0xb", 7),
            trade("2024-01-01T03:00:00Z", TradeSide::Buy, "0xc", 6),
        ]);
        assert_eq!(window.volume_for(TradeSide::Buy).expect("buy"), Decimal::from(10));
        assert_eq!(window.volume_for(TradeSide::Sell).expect("sell"), Decimal::from(7));
        assert_eq!(window.volume().expect("volume"), Decimal::from(17));
    }

    #[test]
    fn transfer_total_reports_overflow() {
        let transfer = |hash: &str| TransferRecord {
            timestamp: UtcDateTime::parse("2024-01-01T01:00:00Z").expect("timestamp"),
            sender: String::from("0xa"),
            receiver: String::from("0xb"),
            amount: Decimal::MAX,
            tx_hash: hash.to_owned(),
        };
        let window = TransferWindow::new(
            UtcDateTime::parse("2024-01-01T00:00:00Z").expect("since"),
            UtcDateTime::parse("2024-01-03T00:00:00Z").expect("until"),
            vec![transfer("0x1"), transfer("0x2")],
        );

        assert_eq!(window.len(), 2);
        assert_eq!(
            window.total_amount(),
            Err(ComputationError::Overflow {
                operation: "transfer amount"
            })
        );
    }
}
