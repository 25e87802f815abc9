//! Mapping between domain records and Firestore documents.
//!
//! Records go through their serde representation, so the stored field names
//! are the model's snake_case names. `created_at`/`updated_at` are written as
//! native timestamps so they sort and display correctly in the console.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{json_to_value, value_to_json, Document, Value};

pub const VIDEOS: &str = "videos";
pub const CLIPS: &str = "clips";

const TIMESTAMP_FIELDS: [&str; 2] = ["created_at", "updated_at"];

pub fn to_fields<T: Serialize>(record: &T) -> FirestoreResult<HashMap<String, Value>> {
    let serde_json::Value::Object(map) = serde_json::to_value(record)? else {
        return Err(FirestoreError::SerializationError(
            "record must serialize to a JSON object".to_string(),
        ));
    };

    Ok(map
        .iter()
        .map(|(key, json)| {
            let value = match json.as_str() {
                Some(ts) if TIMESTAMP_FIELDS.contains(&key.as_str()) => {
                    Value::TimestampValue(ts.to_string())
                }
                _ => json_to_value(json),
            };
            (key.clone(), value)
        })
        .collect())
}

pub fn from_document<T: DeserializeOwned>(doc: &Document) -> FirestoreResult<T> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::InvalidResponse("Document has no fields".to_string()))?;

    let map: serde_json::Map<String, serde_json::Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), value_to_json(v)))
        .collect();

    serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| {
        FirestoreError::SerializationError(format!(
            "{}: {}",
            doc.name.as_deref().unwrap_or("<unnamed>"),
            e
        ))
    })
}

/// Fields and mask for a partial update of the listed keys.
///
/// Keys missing from the serialized record (skipped `None`s) stay in the
/// mask, which makes Firestore delete them.
pub fn masked_fields<T: Serialize>(
    record: &T,
    keys: &[&str],
) -> FirestoreResult<(HashMap<String, Value>, Vec<String>)> {
    let mut fields = to_fields(record)?;
    fields.retain(|k, _| keys.contains(&k.as_str()));
    Ok((fields, keys.iter().map(|k| k.to_string()).collect()))
}
