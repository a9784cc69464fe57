//! Provider payload → canonical section mapping.
//!
//! Normalization is pure: no I/O, no defaults for missing required fields.
//! Every failure is a [`SourceErrorKind::SchemaMismatch`](crate::SourceErrorKind)
//! carrying the dotted path of the offending field, e.g.
//! `data.EVM.TokenHolders[3].Balance.Amount`.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::{
    CanonicalSection, HolderRecord, HolderSection, HolderSnapshot, PayloadBody, PriceSection,
    ProviderId, ProviderResult, RawPayload, RollingWindows, SocialSection, SourceError,
    TokenIdentifier, TradeRecord, TradeSection, TradeSide, TradeWindow, TransferRecord,
    TransferSection, TransferWindow, UtcDateTime,
};

static PAGE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Name|Price|FDV|Holders|Liquidity)\b[:\s]*([\d.,$A-Za-z]+)")
        .expect("page label pattern is valid")
});

/// Maps raw provider payloads onto [`CanonicalSection`] variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    /// Normalizes the payload of `provider`.
    ///
    /// `token` disambiguates trade direction; the request window carried by
    /// the payload bounds trade and transfer windows.
    pub fn normalize(
        provider: ProviderId,
        token: &TokenIdentifier,
        payload: &RawPayload,
    ) -> ProviderResult<CanonicalSection> {
        match provider {
            ProviderId::Moralis => price(json_body(payload)?, payload).map(CanonicalSection::Price),
            ProviderId::BitqueryHolders => {
                holders(json_body(payload)?, payload).map(CanonicalSection::Holders)
            }
            ProviderId::BitqueryTrades => {
                trades(json_body(payload)?, token, payload).map(CanonicalSection::Trades)
            }
            ProviderId::BitqueryTransfers => {
                transfers(json_body(payload)?, payload).map(CanonicalSection::Transfers)
            }
            ProviderId::Gmgn => social(payload).map(CanonicalSection::Social),
        }
    }
}

fn json_body(payload: &RawPayload) -> ProviderResult<Field<'_>> {
    match &payload.body {
        PayloadBody::Json(value) => Ok(Field::root(value)),
        PayloadBody::Text(_) => Err(SourceError::schema_mismatch("$", "expected a JSON document")),
    }
}

fn price(root: Field<'_>, payload: &RawPayload) -> ProviderResult<PriceSection> {
    Ok(PriceSection {
        token_name: root.get("tokenName")?.text()?.to_owned(),
        token_symbol: root.get("tokenSymbol")?.text()?.to_owned(),
        token_logo: root
            .get_optional("tokenLogo")
            .map(|logo| logo.text().map(str::to_owned))
            .transpose()?,
        pair_label: root.get("pairLabel")?.text()?.to_owned(),
        pair_created: root.get("pairCreated")?.text()?.to_owned(),
        exchange: root.get("exchange")?.text()?.to_owned(),
        usd_price: root.get("currentUsdPrice")?.decimal()?,
        native_price: root.get("currentNativePrice")?.decimal()?,
        liquidity_usd: root.get("totalLiquidityUsd")?.decimal()?,
        price_change_pct: rolling(&root, "pricePercentChange")?,
        liquidity_change_pct: rolling(&root, "liquidityPercentChange")?,
        buys: rolling(&root, "buys")?,
        sells: rolling(&root, "sells")?,
        total_volume: rolling(&root, "totalVolume")?,
        buy_volume: rolling(&root, "buyVolume")?,
        sell_volume: rolling(&root, "sellVolume")?,
        buyers: rolling(&root, "buyers")?,
        sellers: rolling(&root, "sellers")?,
        as_of: payload.fetched_at,
    })
}

fn rolling(root: &Field<'_>, group: &str) -> ProviderResult<RollingWindows> {
    let group = root.get(group)?;
    Ok(RollingWindows {
        five_min: group.get_any(&["five_min", "5min"])?.decimal()?,
        one_hour: group.get_any(&["one_hour", "1h"])?.decimal()?,
        four_hour: group.get_any(&["four_hour", "4h"])?.decimal()?,
        twenty_four_hour: group.get_any(&["twenty_four_hour", "24h"])?.decimal()?,
    })
}

fn holders(root: Field<'_>, payload: &RawPayload) -> ProviderResult<HolderSection> {
    let rows = root.get("data")?.get("EVM")?.get("TokenHolders")?.items()?;
    let holders = rows
        .iter()
        .map(|row| {
            let address = row.get("Holder")?.get("Address")?.text()?;
            let balance = row.get("Balance")?.get("Amount")?.decimal()?;
            Ok(HolderRecord::new(address, balance))
        })
        .collect::<ProviderResult<Vec<_>>>()?;

    Ok(HolderSection {
        snapshot: HolderSnapshot::new(payload.params.snapshot_date, holders),
    })
}

fn trades(
    root: Field<'_>,
    token: &TokenIdentifier,
    payload: &RawPayload,
) -> ProviderResult<TradeSection> {
    let rows = root.get("data")?.get("EVM")?.get("DEXTrades")?.items()?;
    let trades = rows
        .iter()
        .map(|row| trade(row, token, payload))
        .collect::<ProviderResult<Vec<_>>>()?;

    Ok(TradeSection {
        window: TradeWindow::new(payload.params.since, payload.params.until, trades),
    })
}

fn trade(
    row: &Field<'_>,
    token: &TokenIdentifier,
    payload: &RawPayload,
) -> ProviderResult<TradeRecord> {
    let timestamp = block_time(row, payload)?;
    let tx_hash = row.get("Transaction")?.get("Hash")?.text()?.to_owned();

    let legs = row.get("Trade")?;
    let buy = legs.get("Buy")?;
    let sell = legs.get("Sell")?;
    let buy_currency = buy.get("Currency")?.get("SmartContract")?.text()?;
    let sell_currency = sell.get("Currency")?.get("SmartContract")?.text()?;

    let (side, leg) = if token.matches_address(buy_currency) {
        (TradeSide::Buy, &buy)
    } else if token.matches_address(sell_currency) {
        (TradeSide::Sell, &sell)
    } else {
        return Err(SourceError::schema_mismatch(
            legs.path.clone(),
            format!("does not involve token {}", token.address()),
        ));
    };

    Ok(TradeRecord {
        timestamp,
        side,
        buyer: buy.get("Buyer")?.text()?.to_owned(),
        seller: sell.get("Seller")?.text()?.to_owned(),
        amount: leg.get("Amount")?.decimal()?,
        price: leg.get("Price")?.decimal()?,
        tx_hash,
    })
}

fn transfers(root: Field<'_>, payload: &RawPayload) -> ProviderResult<TransferSection> {
    let rows = root.get("data")?.get("EVM")?.get("Transfers")?.items()?;
    let transfers = rows
        .iter()
        .map(|row| {
            let transfer = row.get("Transfer")?;
            Ok(TransferRecord {
                timestamp: block_time(row, payload)?,
                sender: transfer.get("Sender")?.text()?.to_owned(),
                receiver: transfer.get("Receiver")?.text()?.to_owned(),
                amount: transfer.get("Amount")?.decimal()?,
                tx_hash: row.get("Transaction")?.get("Hash")?.text()?.to_owned(),
            })
        })
        .collect::<ProviderResult<Vec<_>>>()?;

    Ok(TransferSection {
        window: TransferWindow::new(payload.params.since, payload.params.until, transfers),
    })
}

/// Block time of a row, which must fall inside the requested window.
fn block_time(row: &Field<'_>, payload: &RawPayload) -> ProviderResult<UtcDateTime> {
    let field = row.get("Block")?.get("Time")?;
    let timestamp = field.timestamp()?;
    if timestamp < payload.params.since || timestamp > payload.params.until {
        return Err(SourceError::schema_mismatch(
            field.path,
            format!(
                "is outside the requested window [{}, {}]",
                payload.params.since, payload.params.until
            ),
        ));
    }
    Ok(timestamp)
}

fn social(payload: &RawPayload) -> ProviderResult<SocialSection> {
    let text = match &payload.body {
        PayloadBody::Text(text) => text,
        PayloadBody::Json(_) => {
            return Err(SourceError::schema_mismatch("markdown", "expected page text"))
        }
    };
    if text.trim().is_empty() {
        return Err(SourceError::schema_mismatch("markdown", "is empty"));
    }

    let label = |name: &str| {
        PAGE_LABEL
            .captures_iter(text)
            .find(|captures| &captures[1] == name)
            .map(|captures| captures[2].trim_end_matches([',', '.']).to_owned())
    };

    Ok(SocialSection {
        name: label("Name"),
        price: label("Price"),
        fdv: label("FDV"),
        holders: label("Holders"),
        liquidity: label("Liquidity"),
        content_length: text.len(),
        as_of: payload.fetched_at,
    })
}

/// JSON value plus the dotted path it was reached by.
#[derive(Debug, Clone)]
struct Field<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Field<'a> {
    fn root(value: &'a Value) -> Self {
        Self {
            value,
            path: String::new(),
        }
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_owned()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    fn get(&self, key: &str) -> ProviderResult<Field<'a>> {
        self.get_optional(key)
            .ok_or_else(|| SourceError::schema_mismatch(self.child_path(key), "is missing"))
    }

    /// Present, non-null member.
    fn get_optional(&self, key: &str) -> Option<Field<'a>> {
        match self.value.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(Field {
                value,
                path: self.child_path(key),
            }),
        }
    }

    /// First present member among alias spellings of the same field.
    fn get_any(&self, keys: &[&str]) -> ProviderResult<Field<'a>> {
        keys.iter()
            .find_map(|key| self.get_optional(key))
            .ok_or_else(|| {
                let primary = keys.first().copied().unwrap_or_default();
                SourceError::schema_mismatch(self.child_path(primary), "is missing")
            })
    }

    fn items(&self) -> ProviderResult<Vec<Field<'a>>> {
        let values = self
            .value
            .as_array()
            .ok_or_else(|| SourceError::schema_mismatch(self.path.clone(), "is not an array"))?;
        Ok(values
            .iter()
            .enumerate()
            .map(|(index, value)| Field {
                value,
                path: format!("{}[{index}]", self.path),
            })
            .collect())
    }

    fn text(&self) -> ProviderResult<&'a str> {
        self.value
            .as_str()
            .ok_or_else(|| SourceError::schema_mismatch(self.path.clone(), "is not a string"))
    }

    /// Decimal from a JSON string or number, parsed from its text form.
    fn decimal(&self) -> ProviderResult<Decimal> {
        let text = match self.value {
            Value::String(text) => text.trim().to_owned(),
            Value::Number(number) => number.to_string(),
            _ => {
                return Err(SourceError::schema_mismatch(
                    self.path.clone(),
                    "is not a decimal",
                ))
            }
        };

        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| {
                SourceError::schema_mismatch(
                    self.path.clone(),
                    format!("is not a decimal: '{text}'"),
                )
            })
    }

    fn timestamp(&self) -> ProviderResult<UtcDateTime> {
        let text = self.text()?;
        UtcDateTime::parse(text).map_err(|error| {
            SourceError::schema_mismatch(self.path.clone(), error)
        })
    }
}
