//! # tokenlens core
//!
//! Aggregation and derived-statistics engine for on-chain token analytics.
//!
//! One run fans out to every enabled provider concurrently, normalizes each
//! payload into a canonical section, computes holder concentration and trade
//! statistics locally, and folds everything into a single
//! [`AggregateRecord`] whose [`SectionManifest`] states which sections are
//! present, degraded or missing and why.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Moralis, Bitquery and GMGN clients plus an offline fixture client |
//! | [`aggregate`] | Record, manifest and section analytics |
//! | [`config`] | Run configuration and provider credentials |
//! | [`data_source`] | Provider contract and classified provider errors |
//! | [`domain`] | Canonical domain models |
//! | [`engine`] | End-to-end run and run-level errors |
//! | [`envelope`] | Machine-readable output envelope |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalize`] | Provider payload → canonical section mapping |
//! | [`orchestrator`] | Concurrent fan-out with timeouts and deadline |
//! | [`retry`] | Adapter-side retry policy |
//! | [`stats`] | Gini, Nakamoto, Theil and summary statistics |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tokenlens_core::{AggregationConfig, Aggregator, FetchOrchestrator, TokenIdentifier};
//!
//! let token = TokenIdentifier::new("base", "0x4200000000000000000000000000000000000006")?;
//! let orchestrator = FetchOrchestrator::builder().with_mock_mode().build();
//! let record = Aggregator::new(orchestrator, AggregationConfig::default())
//!     .run(&token)
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&record)?);
//! ```

pub mod adapters;
pub mod aggregate;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod normalize;
pub mod orchestrator;
pub mod retry;
pub mod source;
pub mod stats;

pub use adapters::{
    BitqueryHoldersClient, BitqueryTradesClient, BitqueryTransfersClient, GmgnPageClient,
    MoralisPairStatsClient, StaticProviderClient,
};
pub use aggregate::{
    AggregateBuilder, AggregateRecord, HolderAnalytics, ManifestEntry, ManifestStatus, RiskInputs,
    Section, SectionManifest, TradeAnalytics, TransferAnalytics,
};
pub use config::{AggregationConfig, ProviderCredentials};
pub use data_source::{
    FetchParams, PayloadBody, ProviderClient, ProviderResult, RawPayload, SourceError,
    SourceErrorKind,
};
pub use domain::{
    CalendarDate, CanonicalSection, HolderRecord, HolderSection, HolderSnapshot, PriceSection,
    RollingWindows, SocialSection, TokenIdentifier, TradeRecord, TradeSection, TradeSide,
    TradeWindow, TransferRecord, TransferSection, TransferWindow, UtcDateTime,
};
pub use engine::{AggregateError, Aggregator};
pub use envelope::{manifest_errors, Completeness, Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{ComputationError, ValidationError};
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse};
pub use normalize::Normalizer;
pub use orchestrator::{FetchOrchestrator, FetchOutcome, OrchestratorBuilder};
pub use retry::{Backoff, RetryPolicy};
pub use source::{ProviderId, SectionName};
pub use stats::DerivedStatistics;
