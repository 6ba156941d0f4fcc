//! Retry policy: eligibility and merge
//!
//! A step is eligible when it is a `datasource` step whose `subtype` is one
//! of the query kinds the workflow engine can retry. Eligible steps get their
//! `blockData.retryPolicy` replaced wholesale.

use crate::config::{
    DEFAULT_ATTEMPTS, DEFAULT_BACKOFF_COEFFICIENT, DEFAULT_INITIAL_INTERVAL_MS,
    DEFAULT_MAXIMUM_INTERVAL_MS,
};
use crate::document::Document;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fmt;

pub const DATASOURCE_TYPE: &str = "datasource";
pub const BLOCK_DATA_KEY: &str = "blockData";
pub const RETRY_POLICY_KEY: &str = "retryPolicy";

/// Retryable subtypes, lower-cased
static VALID_SUBTYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "restquery",
        "graphqlquery",
        "sqlquery",
        "s3query",
        "firebasequery",
        "dynamoquery",
        "openapiqy",
    ]
    .into_iter()
    .collect()
});

/// The retry policy written into every eligible step
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub num_attempts: u32,
    pub initial_interval_ms: i64,
    pub maximum_interval_ms: i64,
    pub backoff_coefficient: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            num_attempts: DEFAULT_ATTEMPTS,
            initial_interval_ms: DEFAULT_INITIAL_INTERVAL_MS,
            maximum_interval_ms: DEFAULT_MAXIMUM_INTERVAL_MS,
            backoff_coefficient: DEFAULT_BACKOFF_COEFFICIENT,
        }
    }
}

impl RetryPolicy {
    /// The YAML mapping stored under `blockData.retryPolicy`.
    pub fn to_mapping(&self) -> Mapping {
        let mut map = Mapping::new();
        map.insert("numAttempts".into(), self.num_attempts.into());
        map.insert("initialIntervalMs".into(), self.initial_interval_ms.into());
        map.insert("maximumIntervalMs".into(), self.maximum_interval_ms.into());
        map.insert("backoffCoefficient".into(), coefficient_value(self.backoff_coefficient));
        map
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  numAttempts: {}", self.num_attempts)?;
        writeln!(f, "  initialIntervalMs: {}", self.initial_interval_ms)?;
        writeln!(f, "  maximumIntervalMs: {}", self.maximum_interval_ms)?;
        write!(f, "  backoffCoefficient: {}", self.backoff_coefficient)
    }
}

/// Whole coefficients are stored as integers (`2`, not `2.0`).
fn coefficient_value(coefficient: f64) -> Value {
    if coefficient.fract() == 0.0 && coefficient.abs() < i64::MAX as f64 {
        Value::from(coefficient as i64)
    } else {
        Value::from(coefficient)
    }
}

/// True for datasource steps with a retryable subtype
pub fn is_eligible(doc: &Document) -> bool {
    let Some(map) = doc.as_mapping() else {
        return false;
    };

    if map.get("type").and_then(Value::as_str) != Some(DATASOURCE_TYPE) {
        return false;
    }

    match map.get("subtype").and_then(Value::as_str) {
        Some(subtype) => VALID_SUBTYPES.contains(subtype.to_lowercase().as_str()),
        None => false,
    }
}

/// True when `blockData.retryPolicy` already equals `policy` field for field.
///
/// The coefficient is compared with exact float equality.
pub fn has_desired_policy(doc: &Document, policy: &RetryPolicy) -> bool {
    let Some(existing) = doc
        .get(BLOCK_DATA_KEY)
        .and_then(|block| block.get(RETRY_POLICY_KEY))
    else {
        return false;
    };

    match serde_yaml::from_value::<RetryPolicy>(existing.clone()) {
        Ok(existing) => existing == *policy,
        Err(_) => false,
    }
}

/// Set `blockData.retryPolicy` to `policy`, discarding any previous value.
///
/// A missing or non-mapping `blockData` is replaced by an empty mapping
/// first. Documents that are not mappings are returned unchanged.
pub fn apply_policy(mut doc: Document, policy: &RetryPolicy) -> Document {
    let Some(root) = doc.as_mapping_mut() else {
        return doc;
    };

    let block = root
        .entry(BLOCK_DATA_KEY.into())
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if !block.is_mapping() {
        *block = Value::Mapping(Mapping::new());
    }

    if let Some(block) = block.as_mapping_mut() {
        block.insert(RETRY_POLICY_KEY.into(), Value::Mapping(policy.to_mapping()));
    }

    doc
}
