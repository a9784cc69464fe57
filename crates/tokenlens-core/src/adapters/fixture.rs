//! Offline provider clients.
//!
//! [`StaticProviderClient`] answers every fetch with a canned payload, a canned
//! failure, or a deterministic demo payload shaped exactly like the real
//! provider's response. Demo payloads drive the CLI's offline mode and the
//! behaviour tests; they never touch the network.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::{json, Value};

use crate::{
    FetchParams, PayloadBody, ProviderClient, ProviderId, ProviderResult, RawPayload,
    SourceError, TokenIdentifier,
};

const QUOTE_CURRENCY: &str = "0x4200000000000000000000000000000000000006";
const DEMO_HOLDERS: usize = 25;
const DEMO_TRADES: usize = 24;
const DEMO_TRANSFERS: usize = 12;

#[derive(Debug, Clone)]
enum Fixture {
    Payload(PayloadBody),
    Failure(SourceError),
    Demo,
}

/// Provider client with a fixed answer and an optional artificial latency.
#[derive(Debug, Clone)]
pub struct StaticProviderClient {
    id: ProviderId,
    fixture: Fixture,
    delay: Option<Duration>,
}

impl StaticProviderClient {
    pub fn json(id: ProviderId, value: Value) -> Self {
        Self::new(id, Fixture::Payload(PayloadBody::Json(value)))
    }

    pub fn text(id: ProviderId, value: impl Into<String>) -> Self {
        Self::new(id, Fixture::Payload(PayloadBody::Text(value.into())))
    }

    pub fn failing(id: ProviderId, error: SourceError) -> Self {
        Self::new(id, Fixture::Failure(error))
    }

    /// Deterministic payload derived from the token address and the request
    /// window.
    pub fn demo(id: ProviderId) -> Self {
        Self::new(id, Fixture::Demo)
    }

    /// Sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn new(id: ProviderId, fixture: Fixture) -> Self {
        Self {
            id,
            fixture,
            delay: None,
        }
    }
}

impl ProviderClient for StaticProviderClient {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn fetch<'a>(
        &'a self,
        token: &'a TokenIdentifier,
        params: &'a FetchParams,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<RawPayload>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match &self.fixture {
                Fixture::Payload(PayloadBody::Json(value)) => {
                    Ok(RawPayload::json(value.clone(), params))
                }
                Fixture::Payload(PayloadBody::Text(text)) => {
                    Ok(RawPayload::text(text.clone(), params))
                }
                Fixture::Failure(error) => Err(error.clone()),
                Fixture::Demo => Ok(demo_payload(self.id, token, params)),
            }
        })
    }
}

fn demo_payload(id: ProviderId, token: &TokenIdentifier, params: &FetchParams) -> RawPayload {
    let seed = address_seed(token.address());
    match id {
        ProviderId::Moralis => RawPayload::json(demo_pair_stats(token, seed), params),
        ProviderId::BitqueryHolders => RawPayload::json(demo_holders(params, seed), params),
        ProviderId::BitqueryTrades => RawPayload::json(demo_trades(token, params, seed), params),
        ProviderId::BitqueryTransfers => {
            RawPayload::json(demo_transfers(params, seed), params)
        }
        ProviderId::Gmgn => RawPayload::text(demo_page(seed), params),
    }
}

fn address_seed(address: &str) -> u64 {
    address
        .bytes()
        .fold(17_u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(u64::from(byte)))
}

fn demo_address(seed: u64, index: usize) -> String {
    format!("0x{:040x}", seed.wrapping_add(index as u64 * 7_919))
}

fn windows(values: [i64; 4]) -> Value {
    json!({
        "five_min": values[0],
        "one_hour": values[1],
        "four_hour": values[2],
        "twenty_four_hour": values[3],
    })
}

fn demo_pair_stats(token: &TokenIdentifier, seed: u64) -> Value {
    let base = (seed % 900) as i64 + 100;
    json!({
        "tokenAddress": token.address(),
        "tokenName": "Demo Token",
        "tokenSymbol": "DEMO",
        "tokenLogo": null,
        "pairCreated": "2024-01-15T08:30:00.000Z",
        "pairLabel": "DEMO/WETH",
        "pairAddress": token.pair_or_address(),
        "exchange": "Uniswap v3",
        "currentUsdPrice": format!("0.{:06}", base * 37),
        "currentNativePrice": format!("0.{:09}", base * 11),
        "totalLiquidityUsd": format!("{}.25", base * 1_250),
        "pricePercentChange": {
            "five_min": 0.4, "one_hour": -1.25, "four_hour": 3.5, "twenty_four_hour": 12.75
        },
        "liquidityPercentChange": {
            "five_min": 0, "one_hour": 0.5, "four_hour": -2.0, "twenty_four_hour": 6.5
        },
        "buys": windows([3, 41, 150, 820]),
        "sells": windows([2, 35, 131, 744]),
        "totalVolume": windows([base, base * 12, base * 45, base * 260]),
        "buyVolume": windows([base / 2, base * 7, base * 24, base * 140]),
        "sellVolume": windows([base / 2, base * 5, base * 21, base * 120]),
        "buyers": windows([3, 30, 98, 402]),
        "sellers": windows([2, 28, 87, 377]),
    })
}

fn demo_holders(params: &FetchParams, seed: u64) -> Value {
    let count = DEMO_HOLDERS.min(params.holder_limit);
    let holders = (0..count)
        .map(|index| {
            let rank = (index as u64) + 1;
            let balance = (50_000_000 + seed % 1_000_000) / (rank * rank);
            json!({
                "Holder": { "Address": demo_address(seed, index) },
                "Balance": { "Amount": format!("{balance}.5") },
            })
        })
        .collect::<Vec<_>>();

    json!({ "data": { "EVM": { "TokenHolders": holders } } })
}

fn demo_trades(token: &TokenIdentifier, params: &FetchParams, seed: u64) -> Value {
    let count = DEMO_TRADES.min(params.trade_limit);
    let span = params.until.since(params.since);
    let trades = (0..count)
        .map(|index| {
            let offset = span * (index as i32 + 1) / (count as i32 + 1);
            let time = params.since.saturating_add(offset);
            let amount = 1_000 + (seed + index as u64 * 37) % 900;
            let price = format!("0.0000{}", 120 + (seed + index as u64) % 80);
            let trader = demo_address(seed, index % 9);
            let pool = demo_address(seed, 1_000);
            let (buy_currency, sell_currency, buyer, seller) = if index % 3 == 0 {
                (QUOTE_CURRENCY, token.address(), pool, trader)
            } else {
                (token.address(), QUOTE_CURRENCY, trader, pool)
            };
            let symbol = |currency: &str| if currency == QUOTE_CURRENCY { "WETH" } else { "DEMO" };

            json!({
                "Block": { "Time": time.format_rfc3339(), "Number": 1_000_000 + index },
                "Transaction": { "Hash": format!("0x{:064x}", seed.wrapping_add(index as u64)) },
                "Trade": {
                    "Buy": {
                        "Amount": amount.to_string(),
                        "Buyer": buyer,
                        "Price": price,
                        "Currency": {
                            "SmartContract": buy_currency,
                            "Symbol": symbol(buy_currency),
                        }
                    },
                    "Sell": {
                        "Amount": amount.to_string(),
                        "Seller": seller,
                        "Price": price,
                        "Currency": {
                            "SmartContract": sell_currency,
                            "Symbol": symbol(sell_currency),
                        }
                    },
                    "Dex": { "ProtocolName": "uniswap_v3" }
                }
            })
        })
        .collect::<Vec<_>>();

    json!({ "data": { "EVM": { "DEXTrades": trades } } })
}

fn demo_transfers(params: &FetchParams, seed: u64) -> Value {
    let count = DEMO_TRANSFERS.min(params.trade_limit);
    let span = params.until.since(params.since);
    let transfers = (0..count)
        .map(|index| {
            let offset = span * (index as i32 + 1) / (count as i32 + 1);
            let time = params.since.saturating_add(offset);
            json!({
                "Transfer": {
                    "Amount": format!("{}.125", 500 + (seed + index as u64 * 13) % 5_000),
                    "Sender": demo_address(seed, index % 4),
                    "Receiver": demo_address(seed, 50 + index),
                    "Currency": { "Symbol": "DEMO" }
                },
                "Block": { "Time": time.format_rfc3339(), "Number": 2_000_000 + index },
                "Transaction": {
                    "Hash": format!("0x{:064x}", seed.wrapping_add(10_000 + index as u64)),
                }
            })
        })
        .collect::<Vec<_>>();

    json!({ "data": { "EVM": { "Transfers": transfers } } })
}

fn demo_page(seed: u64) -> String {
    let base = seed % 900 + 100;
    let price = base * 3;
    let fdv = base / 10 + 1;
    let holders = base * 17;
    let liquidity = base / 2;
    format!(
        "Demo Token (DEMO)\nName: DemoToken\nPrice: $0.{price:04}\nFDV: ${fdv}.4M\n\
         Holders: {holders}\nLiquidity: ${liquidity}K\n"
    )
}
