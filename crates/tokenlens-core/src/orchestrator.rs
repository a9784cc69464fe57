//! Concurrent provider fan-out.
//!
//! [`FetchOrchestrator::run`] dispatches one task per enabled provider, time
//! boxes each independently, and joins all of them. No result is retried and
//! no failure short-circuits the others. An optional run deadline aborts
//! whatever is still pending; aborted providers settle as timeouts.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::adapters::{
    BitqueryHoldersClient, BitqueryTradesClient, BitqueryTransfersClient, GmgnPageClient,
    MoralisPairStatsClient, StaticProviderClient,
};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::retry::RetryPolicy;
use crate::{
    FetchParams, ProviderClient, ProviderCredentials, ProviderId, ProviderResult, RawPayload,
    SourceError, TokenIdentifier,
};

/// Settled results of one fan-out.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Exactly one entry per enabled provider.
    pub results: BTreeMap<ProviderId, ProviderResult<RawPayload>>,
    /// Number of dispatched providers that settled on their own before any
    /// deadline.
    pub settled: usize,
    pub deadline_elapsed: bool,
    pub elapsed: Duration,
}

/// Registry of provider clients plus the fan-out itself.
#[derive(Clone, Default)]
pub struct FetchOrchestrator {
    clients: BTreeMap<ProviderId, Arc<dyn ProviderClient>>,
}

impl FetchOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Registers `client` under its own id, replacing any previous client.
    pub fn register(&mut self, client: Arc<dyn ProviderClient>) {
        self.clients.insert(client.id(), client);
    }

    pub fn with_client(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.register(client);
        self
    }

    pub fn registered(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.clients.keys().copied()
    }

    pub fn is_registered(&self, provider: ProviderId) -> bool {
        self.clients.contains_key(&provider)
    }

    /// Fetches from every enabled provider concurrently.
    ///
    /// Returns after every dispatched task settled, timed out, or was
    /// cancelled by `deadline`. Enabled providers without a registered client
    /// fail with `NotConfigured` without being dispatched.
    pub async fn run(
        &self,
        token: &TokenIdentifier,
        enabled: &BTreeSet<ProviderId>,
        params: &FetchParams,
        provider_timeout: Duration,
        deadline: Option<Duration>,
    ) -> FetchOutcome {
        let started = Instant::now();
        let deadline_at = deadline.map(|deadline| started + deadline);
        let mut results = BTreeMap::new();
        let mut pending = BTreeSet::new();
        let mut tasks = JoinSet::new();

        for &provider in enabled {
            let Some(client) = self.clients.get(&provider) else {
                tracing::warn!(
                    provider = %provider,
                    "provider enabled without a configured client"
                );
                results.insert(provider, Err(SourceError::not_configured(provider)));
                continue;
            };

            tracing::debug!(provider = %provider, token = %token, "dispatching provider fetch");
            pending.insert(provider);
            tasks.spawn(fetch_one(
                provider,
                Arc::clone(client),
                token.clone(),
                params.clone(),
                provider_timeout,
            ));
        }

        let mut settled = 0;
        let mut deadline_elapsed = false;
        loop {
            let next = match deadline_at {
                Some(at) => match tokio::time::timeout_at(at, tasks.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        deadline_elapsed = true;
                        tasks.abort_all();
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            match next {
                Some(Ok((provider, result))) => {
                    settled += 1;
                    pending.remove(&provider);
                    results.insert(provider, result);
                }
                Some(Err(error)) => {
                    tracing::error!(error = %error, "provider task ended abnormally");
                }
                None => break,
            }
        }

        for provider in pending {
            let error = if deadline_elapsed {
                tracing::warn!(
                    provider = %provider,
                    "run deadline elapsed before provider settled"
                );
                SourceError::timeout("run deadline elapsed before the provider settled")
            } else {
                SourceError::internal("provider task panicked before returning a result")
            };
            results.insert(provider, Err(error));
        }

        let elapsed = started.elapsed();
        tracing::info!(
            token = %token,
            enabled = enabled.len(),
            settled,
            succeeded = results.values().filter(|result| result.is_ok()).count(),
            deadline_elapsed,
            elapsed_ms = elapsed.as_millis() as u64,
            "provider fan-out finished"
        );

        FetchOutcome {
            results,
            settled,
            deadline_elapsed,
            elapsed,
        }
    }
}

async fn fetch_one(
    provider: ProviderId,
    client: Arc<dyn ProviderClient>,
    token: TokenIdentifier,
    params: FetchParams,
    timeout: Duration,
) -> (ProviderId, ProviderResult<RawPayload>) {
    let started = Instant::now();
    let result = match tokio::time::timeout(timeout, client.fetch(&token, &params)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::timeout(format!(
            "{provider} did not respond within {} ms",
            timeout.as_millis()
        ))),
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => tracing::debug!(provider = %provider, elapsed_ms, "provider settled"),
        Err(error) => tracing::warn!(
            provider = %provider,
            elapsed_ms,
            code = error.code(),
            error = %error,
            "provider failed"
        ),
    }

    (provider, result)
}

/// Wires adapters from explicit credentials.
///
/// Providers whose credential is missing are left unregistered, so enabling
/// them yields `NotConfigured` for that section only. Mock mode registers a
/// deterministic offline client for every provider instead.
#[derive(Default)]
pub struct OrchestratorBuilder {
    credentials: ProviderCredentials,
    use_mock: bool,
    retry: RetryPolicy,
    http_client: Option<Arc<dyn HttpClient>>,
    overrides: Vec<Arc<dyn ProviderClient>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(mut self, credentials: ProviderCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_mock_mode(mut self) -> Self {
        self.use_mock = true;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Registers `client` after the built-in adapters, replacing the adapter
    /// with the same id.
    pub fn with_client(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.overrides.push(client);
        self
    }

    pub fn build(self) -> FetchOrchestrator {
        let mut orchestrator = FetchOrchestrator::new();

        if self.use_mock {
            for provider in ProviderId::ALL {
                orchestrator.register(Arc::new(StaticProviderClient::demo(provider)));
            }
        } else {
            let http_client = self
                .http_client
                .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
            let credentials = &self.credentials;

            if let Some(api_key) = usable(&credentials.moralis_api_key) {
                orchestrator.register(Arc::new(
                    MoralisPairStatsClient::with_http_client(Arc::clone(&http_client), api_key)
                        .with_retry(self.retry.clone()),
                ));
            }
            if let Some(token) = usable(&credentials.bitquery_oauth_token) {
                orchestrator.register(Arc::new(
                    BitqueryHoldersClient::with_http_client(Arc::clone(&http_client), token)
                        .with_retry(self.retry.clone()),
                ));
                orchestrator.register(Arc::new(
                    BitqueryTradesClient::with_http_client(Arc::clone(&http_client), token)
                        .with_retry(self.retry.clone()),
                ));
                orchestrator.register(Arc::new(
                    BitqueryTransfersClient::with_http_client(Arc::clone(&http_client), token)
                        .with_retry(self.retry.clone()),
                ));
            }
            orchestrator.register(Arc::new(
                GmgnPageClient::with_http_client(http_client).with_retry(self.retry),
            ));
        }

        for client in self.overrides {
            orchestrator.register(client);
        }
        orchestrator
    }
}

fn usable(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_skips_providers_without_credentials() {
        let orchestrator = OrchestratorBuilder::new()
            .with_credentials(ProviderCredentials {
                moralis_api_key: Some(String::from("key")),
                bitquery_oauth_token: None,
            })
            .build();

        assert!(orchestrator.is_registered(ProviderId::Moralis));
        assert!(orchestrator.is_registered(ProviderId::Gmgn));
        assert!(!orchestrator.is_registered(ProviderId::BitqueryHolders));
        assert!(!orchestrator.is_registered(ProviderId::BitqueryTransfers));
    }

    #[test]
    fn mock_mode_registers_every_provider() {
        let orchestrator = OrchestratorBuilder::new().with_mock_mode().build();
        assert_eq!(
            orchestrator.registered().collect::<Vec<_>>(),
            ProviderId::ALL.to_vec()
        );
    }

    #[test]
    fn overrides_replace_built_in_adapters() {
        let orchestrator = OrchestratorBuilder::new()
            .with_mock_mode()
            .with_client(Arc::new(StaticProviderClient::failing(
                ProviderId::Gmgn,
                SourceError::http_status(403, "forbidden"),
            )))
            .build();

        assert_eq!(orchestrator.registered().count(), ProviderId::ALL.len());
    }
}
