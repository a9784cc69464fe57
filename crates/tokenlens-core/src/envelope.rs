//! Machine-readable output envelope.
//!
//! Every `tokenlens` output is wrapped as `{ meta, data, errors }`. For an
//! aggregation run the meta carries the section completeness counts and the
//! manifest notes, and every missing section contributes one error entry.

use serde::{Deserialize, Serialize};

use crate::aggregate::{ManifestStatus, SectionManifest};
use crate::{ProviderId, SourceError, UtcDateTime};

/// Version of the envelope layout.
pub const SCHEMA_VERSION: &str = "v1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    /// Envelope for output that did not come from an aggregation run.
    pub fn new(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            meta,
            data,
            errors: Vec::new(),
        }
    }

    /// Envelope for one aggregation run described by `manifest`.
    pub fn for_run(mut meta: EnvelopeMeta, data: T, manifest: &SectionManifest) -> Self {
        meta.completeness = Some(Completeness::of(manifest));
        for (section, entry) in manifest.iter() {
            if let Some(note) = &entry.note {
                meta.warnings.push(format!("{section}: {note}"));
            }
        }

        Self {
            meta,
            data,
            errors: manifest_errors(manifest),
        }
    }

    /// No requested section is missing. Non-run envelopes are complete.
    pub fn is_complete(&self) -> bool {
        self.meta
            .completeness
            .is_none_or(|completeness| completeness.missing == 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub trace_id: String,
    pub schema_version: String,
    pub generated_at: UtcDateTime,
    /// Providers consulted, in dispatch order. Empty for local computations.
    pub source_chain: Vec<ProviderId>,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completeness: Option<Completeness>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(
        request_id: impl Into<String>,
        trace_id: impl Into<String>,
        source_chain: Vec<ProviderId>,
        latency_ms: u64,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            trace_id: trace_id.into(),
            schema_version: String::from(SCHEMA_VERSION),
            generated_at: UtcDateTime::now(),
            source_chain,
            latency_ms,
            completeness: None,
            warnings: Vec::new(),
        }
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Section counts of one run, taken from its manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    pub requested: usize,
    pub present: usize,
    pub degraded: usize,
    pub missing: usize,
}

impl Completeness {
    pub fn of(manifest: &SectionManifest) -> Self {
        Self {
            requested: manifest.len(),
            present: manifest.count(ManifestStatus::Present),
            degraded: manifest.count(ManifestStatus::Degraded),
            missing: manifest.count(ManifestStatus::Missing),
        }
    }

    /// Every requested section is present without caveats.
    pub fn is_full(&self) -> bool {
        self.degraded == 0 && self.missing == 0
    }
}

/// One missing section, or any other failure reported next to the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ProviderId>,
}

impl EnvelopeError {
    pub fn from_source(provider: ProviderId, error: &SourceError) -> Self {
        Self {
            code: error.code().to_owned(),
            message: error.message().to_owned(),
            retryable: error.retryable(),
            source: Some(provider),
        }
    }
}

/// One envelope error per missing manifest section, in section order.
pub fn manifest_errors(manifest: &SectionManifest) -> Vec<EnvelopeError> {
    manifest
        .iter()
        .filter_map(|(_, entry)| {
            entry
                .error
                .as_ref()
                .map(|error| EnvelopeError::from_source(entry.provider, error))
        })
        .collect()
}
