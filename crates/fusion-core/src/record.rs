//! Conversion of loosely-typed provider records into [`CandidateResult`].
//!
//! Search backends usually hand back JSON objects: Elasticsearch hits carry
//! `_id`/`_score`, vector stores carry `id`/`distance`. This module is the one
//! place where those shapes are validated. Everything past it works with a
//! required string id and a finite `f64` score.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{FusionError, Result};
use crate::types::{Attributes, CandidateResult, Source};

/// Keys tried, in order, for the item identifier.
const ID_KEYS: [&str; 2] = ["_id", "id"];

/// Keys tried, in order, for the keyword relevance score.
const SCORE_KEYS: [&str; 2] = ["_score", "score"];

/// Keys tried for the vector distance.
const DISTANCE_KEYS: [&str; 1] = ["distance"];

/// Score assumed for a keyword record without one.
pub const DEFAULT_KEYWORD_SCORE: f64 = 0.0;

/// Distance assumed for a vector record without one (maximum cosine distance
/// that still maps to zero similarity).
pub const DEFAULT_DISTANCE: f64 = 1.0;

/// Prefix of identifiers synthesized for records without a usable id.
pub const FALLBACK_ID_PREFIX: &str = "anon-";

impl CandidateResult {
    /// Build a candidate from a lexical provider record (`_id`/`id`, `_score`/`score`).
    pub fn from_lexical_record(record: Attributes) -> Self {
        from_record(record, Source::Keyword)
    }

    /// Build a candidate from a vector provider record (`_id`/`id`, `distance`).
    pub fn from_vector_record(record: Attributes) -> Self {
        from_record(record, Source::Semantic)
    }
}

/// Parse a JSON array of provider records for the given source.
///
/// Non-object elements are skipped with a warning; a non-array document is an
/// argument error.
pub fn parse_records(source: Source, document: Value) -> Result<Vec<CandidateResult>> {
    let items = match document {
        Value::Array(items) => items,
        other => {
            return Err(FusionError::invalid_argument(format!(
                "{} results must be a JSON array, got {}",
                source,
                json_type_name(&other)
            )))
        }
    };

    let mut candidates = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(record) => candidates.push(from_record(record, source)),
            other => warn!(
                "Skipping {} record #{}: expected object, got {}",
                source,
                index,
                json_type_name(&other)
            ),
        }
    }

    Ok(candidates)
}

fn from_record(mut record: Attributes, source: Source) -> CandidateResult {
    let id = match extract_id(&record) {
        Some(id) => id,
        None => {
            let id = fallback_id(&record);
            warn!(
                "{} result missing 'id' field, using content-derived {} (deduplication is best-effort)",
                source, id
            );
            id
        }
    };
    for key in ID_KEYS {
        record.remove(key);
    }

    let (keys, default): (&[&str], f64) = match source {
        Source::Keyword => (&SCORE_KEYS[..], DEFAULT_KEYWORD_SCORE),
        Source::Semantic => (&DISTANCE_KEYS[..], DEFAULT_DISTANCE),
    };
    let raw_score = take_score(&mut record, keys, &id, source).unwrap_or(default);

    CandidateResult {
        id,
        raw_score,
        attributes: record,
    }
}

/// First usable identifier among [`ID_KEYS`]. Strings and numbers are usable;
/// blank strings, nulls and structured values are not.
fn extract_id(record: &Attributes) -> Option<String> {
    ID_KEYS.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Deterministic identifier derived from the record's canonical JSON.
fn fallback_id(record: &Attributes) -> String {
    let canonical = Value::Object(record.clone()).to_string();
    let hash = blake3::hash(canonical.as_bytes());
    format!("{}{}", FALLBACK_ID_PREFIX, hex::encode(&hash.as_bytes()[..8]))
}

/// Remove every key in `keys` and return the first parseable score.
fn take_score(record: &mut Attributes, keys: &[&str], id: &str, source: Source) -> Option<f64> {
    let mut score = None;

    for key in keys {
        let Some(value) = record.remove(*key) else {
            continue;
        };
        if score.is_some() {
            continue;
        }
        score = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if score.is_none() {
            warn!("Unparseable {} on {} result {}: {}", key, source, id, value);
        }
    }

    if score.is_none() {
        debug!("No score on {} result {}, using default", source, id);
    }
    score
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
