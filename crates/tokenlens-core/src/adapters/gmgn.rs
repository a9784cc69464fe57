use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::retry::RetryPolicy;
use crate::{FetchParams, ProviderClient, ProviderId, ProviderResult, RawPayload, TokenIdentifier};

pub const GMGN_BASE_URL: &str = "https://gmgn.ai";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// GMGN token page. The page text is handed to normalization unparsed.
#[derive(Clone)]
pub struct GmgnPageClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    retry: RetryPolicy,
}

impl Default for GmgnPageClient {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl GmgnPageClient {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: GMGN_BASE_URL.to_owned(),
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

    fn page_url(&self, token: &TokenIdentifier) -> String {
        format!(
            "{}/{}/token/{}",
            self.base_url,
            urlencoding::encode(gmgn_chain(token.chain())),
            urlencoding::encode(token.address()),
        )
    }
}

impl ProviderClient for GmgnPageClient {
    fn id(&self) -> ProviderId {
        ProviderId::Gmgn
    }

    fn fetch<'a>(
        &'a self,
        token: &'a TokenIdentifier,
        params: &'a FetchParams,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<RawPayload>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(self.page_url(token))
                .with_header("user-agent", BROWSER_USER_AGENT)
                .with_header("accept", "text/html,text/plain")
                .with_timeout(params.request_timeout);

            let http_client = self.http_client.as_ref();
            let body = self
                .retry
                .run("gmgn", move || super::send(http_client, request.clone()))
                .await?;

            Ok(RawPayload::text(body, params))
        })
    }
}

fn gmgn_chain(chain: &str) -> &str {
    match chain {
        "ethereum" | "mainnet" => "eth",
        other => other,
    }
}
