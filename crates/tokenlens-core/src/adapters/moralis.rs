use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http_client::{HttpAuth, HttpClient, HttpRequest, ReqwestHttpClient};
use crate::retry::RetryPolicy;
use crate::{FetchParams, ProviderClient, ProviderId, ProviderResult, RawPayload, TokenIdentifier};

pub const MORALIS_BASE_URL: &str = "https://deep-index.moralis.io/api/v2.2";

/// Moralis pair statistics (`/pairs/{pair}/stats`).
#[derive(Clone)]
pub struct MoralisPairStatsClient {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl MoralisPairStatsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()), api_key)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: MORALIS_BASE_URL.to_owned(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, token: &TokenIdentifier) -> String {
        format!(
            "{}/pairs/{}/stats?chain={}",
            self.base_url,
            urlencoding::encode(token.pair_or_address()),
            urlencoding::encode(moralis_chain(token.chain())),
        )
    }
}

impl ProviderClient for MoralisPairStatsClient {
    fn id(&self) -> ProviderId {
        ProviderId::Moralis
    }

    fn fetch<'a>(
        &'a self,
        token: &'a TokenIdentifier,
        params: &'a FetchParams,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<RawPayload>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(self.endpoint(token))
                .with_header("accept", "application/json")
                .with_auth(&HttpAuth::Header {
                    name: String::from("X-API-Key"),
                    value: self.api_key.clone(),
                })
                .with_timeout(params.request_timeout);

            let http_client = self.http_client.as_ref();
            let body = self
                .retry
                .run("moralis", move || super::send(http_client, request.clone()))
                .await?;

            let value = super::decode_json("moralis", &body)?;
            Ok(RawPayload::json(value, params))
        })
    }
}

/// Moralis names Ethereum mainnet `eth`; other chains pass through.
fn moralis_chain(chain: &str) -> &str {
    match chain {
        "ethereum" | "mainnet" => "eth",
        other => other,
    }
}
