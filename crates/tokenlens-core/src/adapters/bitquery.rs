//! Bitquery streaming (V2) GraphQL adapters.
//!
//! Three providers share one transport: holders at a snapshot date, DEX trades
//! and transfers inside the run's lookback window. A `200 OK` whose body
//! carries a top-level `errors` array is reported as a provider error.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::http_client::{HttpAuth, HttpClient, HttpRequest, ReqwestHttpClient};
use crate::retry::RetryPolicy;
use crate::{
    FetchParams, ProviderClient, ProviderId, ProviderResult, RawPayload, SourceError,
    TokenIdentifier,
};

pub const BITQUERY_STREAMING_URL: &str = "https://streaming.bitquery.io/graphql";

const HOLDERS_QUERY: &str = r#"
query ($network: evm_network!, $token: String!, $limit: Int!, $date: String!) {
  EVM(dataset: archive, network: $network) {
    TokenHolders(
      date: $date
      tokenSmartContract: $token
      limit: {count: $limit}
      orderBy: {descending: Balance_Amount}
      where: {Balance: {Amount: {gt: "0"}}}
    ) {
      Holder { Address }
      Balance { Amount }
    }
  }
}
"#;

const TRADES_QUERY: &str = r#"
query ($network: evm_network!, $token: String!, $limit: Int!, $since: DateTime!, $till: DateTime!) {
  EVM(dataset: combined, network: $network) {
    DEXTrades(
      limit: {count: $limit}
      orderBy: {descending: Block_Time}
      where: {
        any: [
          {Trade: {Buy: {Currency: {SmartContract: {is: $token}}}}}
          {Trade: {Sell: {Currency: {SmartContract: {is: $token}}}}}
        ]
        Block: {Time: {since: $since, till: $till}}
      }
    ) {
      Block { Time Number }
      Transaction { Hash }
      Trade {
        Buy { Amount Buyer Price Currency { SmartContract Symbol } }
        Sell { Amount Seller Price Currency { SmartContract Symbol } }
        Dex { ProtocolName }
      }
    }
  }
}
"#;

const TRANSFERS_QUERY: &str = r#"
query ($network: evm_network!, $token: String!, $limit: Int!, $since: DateTime!, $till: DateTime!) {
  EVM(dataset: combined, network: $network) {
    Transfers(
      limit: {count: $limit}
      orderBy: {descending: Block_Time}
      where: {
        Transfer: {Currency: {SmartContract: {is: $token}}}
        Block: {Time: {since: $since, till: $till}}
      }
    ) {
      Transfer { Amount Sender Receiver Currency { Symbol } }
      Block { Time Number }
      Transaction { Hash }
    }
  }
}
"#;

#[derive(Clone)]
struct GraphqlTransport {
    http_client: Arc<dyn HttpClient>,
    oauth_token: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl GraphqlTransport {
    fn new(http_client: Arc<dyn HttpClient>, oauth_token: String) -> Self {
        Self {
            http_client,
            oauth_token,
            endpoint: BITQUERY_STREAMING_URL.to_owned(),
            retry: RetryPolicy::default(),
        }
    }

    async fn query(
        &self,
        provider: ProviderId,
        query: &str,
        variables: Value,
        params: &FetchParams,
    ) -> ProviderResult<RawPayload> {
        let body = json!({ "query": query, "variables": variables });
        let request = HttpRequest::post_json(&self.endpoint, &body)
            .with_auth(&HttpAuth::BearerToken(self.oauth_token.clone()))
            .with_timeout(params.request_timeout);

        let http_client = self.http_client.as_ref();
        let response = self
            .retry
            .run(provider.as_str(), move || {
                super::send(http_client, request.clone())
            })
            .await?;

        let value = super::decode_json(provider.as_str(), &response)?;
        reject_graphql_errors(&value)?;
        Ok(RawPayload::json(value, params))
    }
}

fn reject_graphql_errors(value: &Value) -> ProviderResult<()> {
    let Some(errors) = value.get("errors").and_then(Value::as_array) else {
        return Ok(());
    };
    if errors.is_empty() {
        return Ok(());
    }

    let messages = errors
        .iter()
        .map(|error| {
            error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(SourceError::provider_error(format!(
        "graphql query failed: {messages}"
    )))
}

/// Bitquery network name for a chain.
fn network(chain: &str) -> &str {
    match chain {
        "ethereum" | "mainnet" => "eth",
        "polygon" => "matic",
        other => other,
    }
}

macro_rules! bitquery_client {
    ($(#[$doc:meta])* $name:ident, $provider:expr) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name {
            transport: GraphqlTransport,
        }

        impl $name {
            pub fn new(oauth_token: impl Into<String>) -> Self {
                Self::with_http_client(Arc::new(ReqwestHttpClient::new()), oauth_token)
            }

            pub fn with_http_client(
                http_client: Arc<dyn HttpClient>,
                oauth_token: impl Into<String>,
            ) -> Self {
                Self {
                    transport: GraphqlTransport::new(http_client, oauth_token.into()),
                }
            }

            pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
                self.transport.endpoint = endpoint.into();
                self
            }

            pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
                self.transport.retry = retry;
                self
            }
        }

        impl ProviderClient for $name {
            fn id(&self) -> ProviderId {
                $provider
            }

            fn fetch<'a>(
                &'a self,
                token: &'a TokenIdentifier,
                params: &'a FetchParams,
            ) -> Pin<Box<dyn Future<Output = ProviderResult<RawPayload>> + Send + 'a>> {
                Box::pin(async move {
                    let (query, variables) = self.request(token, params);
                    self.transport
                        .query($provider, query, variables, params)
                        .await
                })
            }
        }
    };
}

bitquery_client!(
    /// Top holders by balance at the snapshot date.
    BitqueryHoldersClient,
    ProviderId::BitqueryHolders
);
bitquery_client!(
    /// DEX trades with the token on either side, newest first.
    BitqueryTradesClient,
    ProviderId::BitqueryTrades
);
bitquery_client!(
    /// Token transfers inside the lookback window, newest first.
    BitqueryTransfersClient,
    ProviderId::BitqueryTransfers
);

impl BitqueryHoldersClient {
    fn request(&self, token: &TokenIdentifier, params: &FetchParams) -> (&'static str, Value) {
        let variables = json!({
            "network": network(token.chain()),
            "token": token.address(),
            "limit": params.holder_limit,
            "date": params.snapshot_date.format_iso(),
        });
        (HOLDERS_QUERY, variables)
    }
}

impl BitqueryTradesClient {
    fn request(&self, token: &TokenIdentifier, params: &FetchParams) -> (&'static str, Value) {
        (TRADES_QUERY, window_variables(token, params))
    }
}

impl BitqueryTransfersClient {
    fn request(&self, token: &TokenIdentifier, params: &FetchParams) -> (&'static str, Value) {
        (TRANSFERS_QUERY, window_variables(token, params))
    }
}

fn window_variables(token: &TokenIdentifier, params: &FetchParams) -> Value {
    json!({
        "network": network(token.chain()),
        "token": token.address(),
        "limit": params.trade_limit,
        "since": params.since.format_rfc3339(),
        "till": params.until.format_rfc3339(),
    })
}
