//! Contract tests for provider payload normalization
//!
//! Each provider's raw shape must map onto its canonical section without
//! losing precision, and every malformed payload must fail with a schema
//! mismatch naming the offending field.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokenlens_core::{
    CanonicalSection, Normalizer, ProviderClient, ProviderId, ProviderResult, RawPayload,
    SourceErrorKind, TradeSide,
};
use tokenlens_tests::{
    holders_payload, pair_stats_payload, params, scripted, token, trade_row, trades_payload,
};

fn normalize_json(provider: ProviderId, value: Value) -> ProviderResult<CanonicalSection> {
    Normalizer::normalize(provider, &token(), &RawPayload::json(value, &params()))
}

#[tokio::test]
async fn every_demo_payload_maps_to_its_provider_section() {
    for provider in ProviderId::ALL {
        // Given: the provider's demo payload
        let payload = scripted(provider)
            .fetch(&token(), &params())
            .await
            .expect("demo payload");

        // When: it is normalized
        let section = Normalizer::normalize(provider, &token(), &payload)
            .unwrap_or_else(|error| panic!("{provider} failed to normalize: {error}"));

        // Then: the section variant matches the provider
        assert_eq!(section.name(), provider.section());
    }
}

// =============================================================================
// Holders
// =============================================================================

#[test]
fn holder_balances_keep_full_precision() {
    // Given: balances beyond f64 precision
    let payload = holders_payload(&["123456789.123456789012345678", "0.000000000000000001"]);

    // When: the payload is normalized
    let section = normalize_json(ProviderId::BitqueryHolders, payload).expect("valid payload");

    // Then: every digit survives and the snapshot is tied to the requested date
    let CanonicalSection::Holders(holders) = section else {
        panic!("expected holders section");
    };
    let balances = holders.snapshot.balances();
    assert_eq!(
        balances[0],
        Decimal::from_str("123456789.123456789012345678").expect("decimal")
    );
    assert_eq!(balances[1], Decimal::new(1, 18));
    assert_eq!(holders.snapshot.date(), params().snapshot_date);
}

#[test]
fn missing_holder_balance_names_the_indexed_field() {
    // Given: the second row lacks its balance
    let payload = json!({ "data": { "EVM": { "TokenHolders": [
        { "Holder": { "Address": "0xa" }, "Balance": { "Amount": "1" } },
        { "Holder": { "Address": "0xb" }, "Balance": {} },
    ] } } });

    // When: the payload is normalized
    let error = normalize_json(ProviderId::BitqueryHolders, payload).expect_err("must fail");

    // Then: the error points at the exact field
    assert_eq!(error.kind(), SourceErrorKind::SchemaMismatch);
    assert_eq!(error.field(), Some("data.EVM.TokenHolders[1].Balance.Amount"));
    assert!(!error.retryable());
}

#[test]
fn non_numeric_balance_is_a_schema_mismatch() {
    let error = normalize_json(ProviderId::BitqueryHolders, holders_payload(&["lots"]))
        .expect_err("must fail");

    assert_eq!(error.field(), Some("data.EVM.TokenHolders[0].Balance.Amount"));
}

#[test]
fn text_body_for_a_json_provider_is_rejected() {
    let payload = RawPayload::text("<html></html>", &params());

    let error = Normalizer::normalize(ProviderId::BitqueryHolders, &token(), &payload)
        .expect_err("must fail");

    assert_eq!(error.kind(), SourceErrorKind::SchemaMismatch);
    assert_eq!(error.field(), Some("$"));
}

// =============================================================================
// Trades
// =============================================================================

#[test]
fn trade_side_follows_the_leg_carrying_the_token() {
    // Given: one buy of the token and one sell of the token
    let payload = trades_payload(vec![
        trade_row("2025-02-25T12:00:00Z", true, "150.5", "0.25"),
        trade_row("2025-02-27T08:30:00Z", false, "40", "0.5"),
    ]);

    // When: the payload is normalized
    let section = normalize_json(ProviderId::BitqueryTrades, payload).expect("valid payload");

    // Then: sides are assigned per leg and the window is newest first
    let CanonicalSection::Trades(trades) = section else {
        panic!("expected trades section");
    };
    let records = trades.window.trades();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].side, TradeSide::Sell);
    assert_eq!(records[0].amount, Decimal::from(40));
    assert_eq!(records[1].side, TradeSide::Buy);
    assert_eq!(records[1].amount, Decimal::new(1505, 1));
}

#[test]
fn trade_outside_the_requested_window_is_rejected() {
    // Given: a trade a day before the window opens
    let payload = trades_payload(vec![trade_row("2025-02-21T00:00:00Z", true, "1", "1")]);

    // When: the payload is normalized
    let error = normalize_json(ProviderId::BitqueryTrades, payload).expect_err("must fail");

    // Then: the block time is the offending field
    assert_eq!(error.field(), Some("data.EVM.DEXTrades[0].Block.Time"));
}

#[test]
fn trade_not_involving_the_token_is_rejected() {
    let mut row = trade_row("2025-02-25T12:00:00Z", true, "1", "1");
    row["Trade"]["Buy"]["Currency"]["SmartContract"] =
        json!("0x9999999999999999999999999999999999999999");

    let error = normalize_json(ProviderId::BitqueryTrades, trades_payload(vec![row]))
        .expect_err("must fail");

    assert_eq!(error.kind(), SourceErrorKind::SchemaMismatch);
    assert_eq!(error.field(), Some("data.EVM.DEXTrades[0].Trade"));
}

// =============================================================================
// Transfers
// =============================================================================

#[test]
fn transfers_map_sender_receiver_and_amount() {
    let payload = json!({ "data": { "EVM": { "Transfers": [{
        "Block": { "Time": "2025-02-28T09:00:00Z" },
        "Transaction": { "Hash": "0xfeed" },
        "Transfer": { "Sender": "0xa", "Receiver": "0xb", "Amount": "1e3" },
    }] } } });

    let section = normalize_json(ProviderId::BitqueryTransfers, payload).expect("valid payload");

    let CanonicalSection::Transfers(transfers) = section else {
        panic!("expected transfers section");
    };
    let record = &transfers.window.transfers()[0];
    assert_eq!(record.sender, "0xa");
    assert_eq!(record.receiver, "0xb");
    assert_eq!(record.amount, Decimal::from(1000));
}

// =============================================================================
// Price
// =============================================================================

#[test]
fn pair_stats_accept_both_rolling_window_spellings() {
    let short = json!({ "5min": "1", "1h": "2", "4h": "3", "24h": "4" });
    let long = json!({ "five_min": 1, "one_hour": 2, "four_hour": 3, "twenty_four_hour": 4 });

    for window in [short, long] {
        let payload = pair_stats_payload("0.75", "2500000", window);
        let section = normalize_json(ProviderId::Moralis, payload).expect("valid payload");

        let CanonicalSection::Price(price) = section else {
            panic!("expected price section");
        };
        assert_eq!(price.usd_price, Decimal::new(75, 2));
        assert_eq!(price.total_volume.twenty_four_hour, Decimal::from(4));
        assert_eq!(price.token_logo, None);
    }
}

#[test]
fn missing_usd_price_is_a_schema_mismatch() {
    let window = json!({ "5min": 0, "1h": 0, "4h": 0, "24h": 0 });
    let mut payload = pair_stats_payload("1", "1", window);
    payload["currentUsdPrice"] = Value::Null;

    let error = normalize_json(ProviderId::Moralis, payload).expect_err("must fail");

    assert_eq!(error.field(), Some("currentUsdPrice"));
}

// =============================================================================
// Social page
// =============================================================================

#[test]
fn page_labels_are_extracted_as_text() {
    let page = concat!(
        "# FIX\nName: Fixture Token\nPrice $0.0123\nFDV: $1.2M\n",
        "Holders 4,210\nLiquidity: $310K\n",
    );
    let payload = RawPayload::text(page, &params());

    let section = Normalizer::normalize(ProviderId::Gmgn, &token(), &payload).expect("valid page");

    let CanonicalSection::Social(social) = section else {
        panic!("expected social section");
    };
    assert_eq!(social.price.as_deref(), Some("$0.0123"));
    assert_eq!(social.fdv.as_deref(), Some("$1.2M"));
    assert_eq!(social.holders.as_deref(), Some("4,210"));
    assert_eq!(social.liquidity.as_deref(), Some("$310K"));
    assert_eq!(social.content_length, page.len());
}

#[test]
fn empty_page_is_a_schema_mismatch() {
    let payload = RawPayload::text("   \n", &params());

    let error = Normalizer::normalize(ProviderId::Gmgn, &token(), &payload).expect_err("must fail");

    assert_eq!(error.field(), Some("markdown"));
}
