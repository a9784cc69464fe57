use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

use rust_decimal::Decimal;

use crate::stats::DEFAULT_NAKAMOTO_THRESHOLD;
use crate::{CalendarDate, FetchParams, ProviderId, UtcDateTime, ValidationError};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;
pub const DEFAULT_HOLDER_LIMIT: usize = 100;
pub const DEFAULT_TRADE_LIMIT: usize = 500;

/// Run configuration consumed by [`Aggregator`](crate::Aggregator).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    pub enabled: BTreeSet<ProviderId>,
    /// Independent time box applied to every provider fetch.
    pub provider_timeout: Duration,
    /// Overall run deadline. Providers still pending when it fires fail with
    /// a timeout.
    pub deadline: Option<Duration>,
    /// Holder snapshot date; the run's UTC date when unset.
    pub snapshot_date: Option<CalendarDate>,
    pub lookback_days: u32,
    pub holder_limit: usize,
    pub trade_limit: usize,
    pub nakamoto_threshold: Decimal,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            enabled: ProviderId::ALL.into_iter().collect(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            deadline: None,
            snapshot_date: None,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            holder_limit: DEFAULT_HOLDER_LIMIT,
            trade_limit: DEFAULT_TRADE_LIMIT,
            nakamoto_threshold: DEFAULT_NAKAMOTO_THRESHOLD,
        }
    }
}

impl AggregationConfig {
    pub fn with_providers(providers: impl IntoIterator<Item = ProviderId>) -> Self {
        Self {
            enabled: providers.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Checks numeric bounds. An empty provider set is left to the run, which
    /// reports it as a run-level failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.provider_timeout.is_zero() {
            return Err(ValidationError::ZeroValue {
                field: "provider_timeout",
            });
        }
        if self.deadline.is_some_and(|deadline| deadline.is_zero()) {
            return Err(ValidationError::ZeroValue { field: "deadline" });
        }
        if self.lookback_days == 0 {
            return Err(ValidationError::ZeroValue {
                field: "lookback_days",
            });
        }
        if self.holder_limit == 0 {
            return Err(ValidationError::ZeroValue {
                field: "holder_limit",
            });
        }
        if self.trade_limit == 0 {
            return Err(ValidationError::ZeroValue {
                field: "trade_limit",
            });
        }
        if self.nakamoto_threshold <= Decimal::ZERO || self.nakamoto_threshold >= Decimal::ONE {
            return Err(ValidationError::InvalidThreshold {
                value: self.nakamoto_threshold.to_string(),
            });
        }
        Ok(())
    }

    /// Request window for a run starting at `now`.
    pub fn fetch_params(&self, now: UtcDateTime) -> FetchParams {
        FetchParams {
            snapshot_date: self.snapshot_date.unwrap_or_else(|| now.date()),
            since: now.saturating_sub(time::Duration::days(i64::from(self.lookback_days))),
            until: now,
            holder_limit: self.holder_limit,
            trade_limit: self.trade_limit,
            request_timeout: self.provider_timeout,
        }
    }
}

/// Secrets handed to adapter constructors. Never read from the environment
/// by the core.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub moralis_api_key: Option<String>,
    pub bitquery_oauth_token: Option<String>,
}

impl ProviderCredentials {
    /// Name of the credential a provider needs, if any.
    pub const fn required_for(provider: ProviderId) -> Option<&'static str> {
        match provider {
            ProviderId::Moralis => Some("moralis_api_key"),
            ProviderId::BitqueryHolders
            | ProviderId::BitqueryTrades
            | ProviderId::BitqueryTransfers => Some("bitquery_oauth_token"),
            ProviderId::Gmgn => None,
        }
    }

    pub fn is_configured(&self, provider: ProviderId) -> bool {
        match provider {
            ProviderId::Moralis => has_value(&self.moralis_api_key),
            ProviderId::BitqueryHolders
            | ProviderId::BitqueryTrades
            | ProviderId::BitqueryTransfers => has_value(&self.bitquery_oauth_token),
            ProviderId::Gmgn => true,
        }
    }
}

impl Debug for ProviderCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("ProviderCredentials")
            .field("moralis_api_key", &redact(&self.moralis_api_key))
            .field("bitquery_oauth_token", &redact(&self.bitquery_oauth_token))
            .finish()
    }
}

fn has_value(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|value| !value.trim().is_empty())
}
