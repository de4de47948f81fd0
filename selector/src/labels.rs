//! Label values lookup.
//!
//! Lookups may complete out of order. [`LabelValuesTracker`] numbers each
//! request and only applies the completion of the most recently issued one.

use std::collections::BTreeMap;

use crate::{Error, Result};

/// Label holding the profile type of a series.
pub const PROFILE_NAME_LABEL: &str = "__name__";

/// Source of known values for a label.
pub trait LabelValuesSource {
    fn values(&self, label_name: &str) -> Result<Vec<String>>;
}

/// Label values from a fixed table, typically the `[labels]` config section.
#[derive(Debug, Clone, Default)]
pub struct StaticLabelValues {
    labels: BTreeMap<String, Vec<String>>,
}

impl StaticLabelValues {
    pub fn new(labels: BTreeMap<String, Vec<String>>) -> Self {
        Self { labels }
    }
}

impl LabelValuesSource for StaticLabelValues {
    fn values(&self, label_name: &str) -> Result<Vec<String>> {
        self.labels
            .get(label_name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("label '{}'", label_name)))
    }
}

/// Outcome of the latest lookup. The error is kept next to the response.
#[derive(Debug, Default)]
pub struct LabelValuesResult {
    pub response: Option<Vec<String>>,
    pub error: Option<Error>,
}

impl LabelValuesResult {
    /// Values to offer, empty whenever the lookup failed.
    pub fn options(&self) -> &[String] {
        match (&self.error, &self.response) {
            (None, Some(values)) => values,
            _ => &[],
        }
    }
}

/// Handle for an issued lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelValuesRequest {
    pub seq: u64,
    pub label_name: String,
}

/// Latest-request-wins bookkeeping for label value lookups.
#[derive(Debug, Default)]
pub struct LabelValuesTracker {
    issued: u64,
    result: LabelValuesResult,
}

impl LabelValuesTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new request, superseding any in flight.
    pub fn begin(&mut self, label_name: &str) -> LabelValuesRequest {
        self.issued += 1;
        LabelValuesRequest {
            seq: self.issued,
            label_name: label_name.to_string(),
        }
    }

    /// Apply a completion. Returns false if the request was superseded.
    pub fn complete(&mut self, request: &LabelValuesRequest, outcome: Result<Vec<String>>) -> bool {
        if request.seq != self.issued {
            tracing::debug!(
                seq = request.seq,
                latest = self.issued,
                label = %request.label_name,
                "dropping stale label values response"
            );
            return false;
        }

        self.result = match outcome {
            Ok(values) => LabelValuesResult {
                response: Some(values),
                error: None,
            },
            Err(err) => {
                tracing::debug!(label = %request.label_name, error = %err, "label values lookup failed");
                LabelValuesResult {
                    response: None,
                    error: Some(err),
                }
            }
        };
        true
    }

    /// Issue and complete a lookup against a synchronous source.
    pub fn fetch(&mut self, source: &dyn LabelValuesSource, label_name: &str) -> &LabelValuesResult {
        let request = self.begin(label_name);
        let outcome = source.values(label_name);
        self.complete(&request, outcome);
        &self.result
    }

    pub fn result(&self) -> &LabelValuesResult {
        &self.result
    }
}
