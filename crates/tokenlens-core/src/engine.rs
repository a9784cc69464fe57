use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::aggregate::{AggregateBuilder, AggregateRecord, SectionManifest};
use crate::orchestrator::FetchOrchestrator;
use crate::{
    AggregationConfig, ComputationError, Normalizer, TokenIdentifier, UtcDateTime,
    ValidationError,
};

/// Run-level failure. Provider failures alone never produce one of these
/// unless no section at all could be built.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no providers are enabled")]
    NoProviders,

    #[error("no section could be produced; {} provider(s) failed", .manifest.len())]
    NoSections { manifest: SectionManifest },

    #[error("run deadline of {} ms elapsed before any provider settled", .deadline.as_millis())]
    DeadlineElapsed { deadline: Duration },

    #[error(transparent)]
    Computation(#[from] ComputationError),
}

impl AggregateError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "aggregate.invalid_config",
            Self::NoProviders => "aggregate.no_providers",
            Self::NoSections { .. } => "aggregate.no_sections",
            Self::DeadlineElapsed { .. } => "aggregate.deadline_elapsed",
            Self::Computation(_) => "aggregate.computation",
        }
    }
}

/// Runs one aggregation: fan-out, normalization, statistics, record.
pub struct Aggregator {
    orchestrator: FetchOrchestrator,
    config: AggregationConfig,
}

impl Aggregator {
    pub fn new(orchestrator: FetchOrchestrator, config: AggregationConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub async fn run(&self, token: &TokenIdentifier) -> Result<AggregateRecord, AggregateError> {
        self.config.validate()?;
        if self.config.enabled.is_empty() {
            return Err(AggregateError::NoProviders);
        }

        let params = self.config.fetch_params(UtcDateTime::now());
        let outcome = self
            .orchestrator
            .run(
                token,
                &self.config.enabled,
                &params,
                self.config.provider_timeout,
                self.config.deadline,
            )
            .await;

        if let (true, 0, Some(deadline)) =
            (outcome.deadline_elapsed, outcome.settled, self.config.deadline)
        {
            return Err(AggregateError::DeadlineElapsed { deadline });
        }

        let sections = outcome
            .results
            .into_iter()
            .map(|(provider, result)| {
                let normalized = result.and_then(|payload| {
                    Normalizer::normalize(provider, token, &payload).inspect_err(|error| {
                        tracing::warn!(
                            provider = %provider,
                            field = error.field().unwrap_or_default(),
                            error = %error,
                            "payload failed normalization"
                        );
                    })
                });
                (provider, normalized)
            })
            .collect::<BTreeMap<_, _>>();

        let builder = AggregateBuilder::new(
            self.config.nakamoto_threshold,
            self.config.holder_limit,
            self.config.trade_limit,
        );
        let record = builder.build(token, sections)?;

        if record.manifest.produced() == 0 {
            return Err(AggregateError::NoSections {
                manifest: record.manifest,
            });
        }

        tracing::info!(
            token = %token,
            present = record.manifest.produced(),
            missing = record.manifest.len() - record.manifest.produced(),
            "aggregate record built"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::StaticProviderClient;
    use crate::{ProviderId, SourceError};

    fn token() -> TokenIdentifier {
        TokenIdentifier::new("base", "0x9999999999999999999999999999999999999999")
            .expect("valid token")
    }

    #[tokio::test]
    async fn empty_provider_set_is_rejected() {
        let aggregator = Aggregator::new(
            FetchOrchestrator::new(),
            AggregationConfig::with_providers(Vec::new()),
        );

        let error = aggregator.run(&token()).await.expect_err("must fail");
        assert!(matches!(error, AggregateError::NoProviders));
        assert_eq!(error.code(), "aggregate.no_providers");
    }

    #[tokio::test]
    async fn every_provider_failing_fails_the_run() {
        let orchestrator = FetchOrchestrator::new().with_client(Arc::new(
            StaticProviderClient::failing(
                ProviderId::Moralis,
                SourceError::http_status(500, "boom"),
            ),
        ));
        let aggregator = Aggregator::new(
            orchestrator,
            AggregationConfig::with_providers([ProviderId::Moralis, ProviderId::Gmgn]),
        );

        let error = aggregator.run(&token()).await.expect_err("must fail");
        let AggregateError::NoSections { manifest } = error else {
            panic!("expected NoSections, got {error:?}");
        };
        assert_eq!(manifest.len(), 2);
    }

    #[tokio::test]
    async fn mock_providers_produce_a_complete_record() {
        let orchestrator = FetchOrchestrator::builder().with_mock_mode().build();
        let aggregator = Aggregator::new(orchestrator, AggregationConfig::default());

        let record = aggregator.run(&token()).await.expect("run succeeds");

        assert!(record.is_complete(), "manifest: {:?}", record.manifest);
        assert_eq!(record.manifest.len(), ProviderId::ALL.len());
        assert!(record.risk.gini.is_some());
        assert!(record.risk.dex_volume_change.is_some());
    }
}
