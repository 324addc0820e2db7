//! Encoding of records into the bytes the backend stores.

use crate::error::ServiceError;
use crate::model::{Model, Versioned};
use crate::service::StoredObject;

pub fn encode<M: Model>(model: &M) -> Result<Vec<u8>, ServiceError> {
    Ok(bitcode::serialize(model)?)
}

pub fn decode<M: Model>(bytes: &[u8]) -> Result<M, ServiceError> {
    Ok(bitcode::deserialize(bytes)?)
}

pub fn decode_versioned<M: Model>(stored: &StoredObject) -> Result<Versioned<M>, ServiceError> {
    Ok(Versioned {
        data: decode(&stored.bytes)?,
        version: stored.version,
    })
}

/// Names of the top-level fields whose values differ between two records.
pub fn changed_properties<M: Model>(old: &M, new: &M) -> Vec<String> {
    let (Ok(serde_json::Value::Object(old)), Ok(serde_json::Value::Object(new))) =
        (serde_json::to_value(old), serde_json::to_value(new))
    else {
        return Vec::new();
    };

    new.iter()
        .filter(|(name, value)| old.get(name.as_str()) != Some(value))
        .map(|(name, _)| name.clone())
        .collect()
}
