//! Provider contract and the per-provider result/error types.
//!
//! Every upstream feed implements [`ProviderClient`]: one logical fetch per
//! aggregation run, returning a [`RawPayload`] or a classified
//! [`SourceError`]. Nothing in this module performs I/O itself.
//!
//! # Error classification
//!
//! | Kind | Code | Raised when |
//! |------|------|-------------|
//! | `Transport` | `source.transport` | connection, TLS or body read failure |
//! | `Timeout` | `source.timeout` | per-provider timeout or run deadline elapsed |
//! | `HttpStatus(n)` | `source.http_status` | non-2xx HTTP response |
//! | `ProviderError` | `source.provider_error` | 2xx response reporting an error |
//! | `SchemaMismatch` | `source.schema_mismatch` | payload violates the expected shape |
//! | `NotConfigured` | `source.not_configured` | enabled provider has no client |
//! | `Internal` | `source.internal` | provider task panicked or was aborted |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CalendarDate, ProviderId, TokenIdentifier, UtcDateTime};

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Transport,
    Timeout,
    HttpStatus(u16),
    ProviderError,
    SchemaMismatch,
    NotConfigured,
    Internal,
}

impl SourceErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::HttpStatus(_) => "http_status",
            Self::ProviderError => "provider_error",
            Self::SchemaMismatch => "schema_mismatch",
            Self::NotConfigured => "not_configured",
            Self::Internal => "internal",
        }
    }
}

impl Display for SourceErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpStatus(status) => write!(f, "http_status({status})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Structured provider failure recorded in the section manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SourceErrorRepr", try_from = "SourceErrorRepr")]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    field: Option<String>,
    retryable: bool,
}

impl SourceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Transport,
            message: message.into(),
            field: None,
            retryable: true,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: message.into(),
            field: None,
            retryable: true,
        }
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::HttpStatus(status),
            message: message.into(),
            field: None,
            retryable: status == 408 || status == 429 || status >= 500,
        }
    }

    pub fn provider_error(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::ProviderError,
            message: message.into(),
            field: None,
            retryable: false,
        }
    }

    /// Required field at `field_path` is missing or malformed.
    pub fn schema_mismatch(field_path: impl Into<String>, detail: impl Display) -> Self {
        let field_path = field_path.into();
        Self {
            kind: SourceErrorKind::SchemaMismatch,
            message: format!("field '{field_path}' {detail}"),
            field: Some(field_path),
            retryable: false,
        }
    }

    pub fn not_configured(provider: ProviderId) -> Self {
        Self {
            kind: SourceErrorKind::NotConfigured,
            message: format!("provider '{provider}' is enabled but has no configured client"),
            field: None,
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            field: None,
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Offending field path for schema mismatches.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::HttpStatus(_) => "source.http_status",
            SourceErrorKind::ProviderError => "source.provider_error",
            SourceErrorKind::SchemaMismatch => "source.schema_mismatch",
            SourceErrorKind::NotConfigured => "source.not_configured",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SourceErrorRepr {
    kind: String,
    code: String,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    retryable: bool,
}

impl From<SourceError> for SourceErrorRepr {
    fn from(error: SourceError) -> Self {
        let status = match error.kind {
            SourceErrorKind::HttpStatus(status) => Some(status),
            _ => None,
        };
        Self {
            kind: error.kind.as_str().to_owned(),
            code: error.code().to_owned(),
            message: error.message,
            status,
            field: error.field,
            retryable: error.retryable,
        }
    }
}

impl TryFrom<SourceErrorRepr> for SourceError {
    type Error = String;

    fn try_from(repr: SourceErrorRepr) -> Result<Self, Self::Error> {
        let kind = match (repr.kind.as_str(), repr.status) {
            ("transport", _) => SourceErrorKind::Transport,
            ("timeout", _) => SourceErrorKind::Timeout,
            ("http_status", Some(status)) => SourceErrorKind::HttpStatus(status),
            ("provider_error", _) => SourceErrorKind::ProviderError,
            ("schema_mismatch", _) => SourceErrorKind::SchemaMismatch,
            ("not_configured", _) => SourceErrorKind::NotConfigured,
            ("internal", _) => SourceErrorKind::Internal,
            (other, _) => return Err(format!("unknown source error kind '{other}'")),
        };
        Ok(Self {
            kind,
            message: repr.message,
            field: repr.field,
            retryable: repr.retryable,
        })
    }
}

/// Outcome of one provider call or one normalization step.
pub type ProviderResult<T> = Result<T, SourceError>;

/// Request window shared by every provider in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub snapshot_date: CalendarDate,
    pub since: UtcDateTime,
    pub until: UtcDateTime,
    pub holder_limit: usize,
    pub trade_limit: usize,
    /// Transport-level timeout handed to HTTP requests.
    pub request_timeout: Duration,
}

/// Undecoded provider response body.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadBody {
    Json(serde_json::Value),
    Text(String),
}

/// Provider response plus the request window it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    pub body: PayloadBody,
    pub fetched_at: UtcDateTime,
    pub params: FetchParams,
}

impl RawPayload {
    pub fn json(value: serde_json::Value, params: &FetchParams) -> Self {
        Self {
            body: PayloadBody::Json(value),
            fetched_at: UtcDateTime::now(),
            params: params.clone(),
        }
    }

    pub fn text(value: impl Into<String>, params: &FetchParams) -> Self {
        Self {
            body: PayloadBody::Text(value.into()),
            fetched_at: UtcDateTime::now(),
            params: params.clone(),
        }
    }
}

/// Upstream feed contract.
///
/// Implementations own their transport, credentials and retry policy; the
/// orchestrator calls [`fetch`](ProviderClient::fetch) exactly once per run
/// and applies its own timeout around it.
///
/// # Errors
///
/// `fetch` fails with a [`SourceError`] of kind `Transport`, `Timeout`,
/// `HttpStatus` or `ProviderError`.
pub trait ProviderClient: Send + Sync {
    /// Returns the provider identifier this client answers for.
    fn id(&self) -> ProviderId;

    fn fetch<'a>(
        &'a self,
        token: &'a TokenIdentifier,
        params: &'a FetchParams,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<RawPayload>> + Send + 'a>>;
}
