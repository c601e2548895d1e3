//! JSON wire codec for method inputs and outputs.
//!
//! Decoding is always directed by a concrete target type chosen at
//! registration time; the payload never selects its own shape.

mod shape;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

use self::shape::ObjectOnly;

/// Content type of every encoded body.
pub const CONTENT_TYPE: &str = "application/json";

const NULL_LITERAL: &[u8] = b"null";

/// Decodes a payload into the method input type `T`.
///
/// The decode is atomic: either a complete `T` is produced or nothing is.
///
/// # Errors
///
/// Returns [`DispatchError::Decode`] when the payload is not valid JSON or its
/// fields do not match `T`. An empty payload is rejected the same way, as is
/// anything other than a JSON object where `T` is a struct.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, DispatchError> {
    let mut deserializer = serde_json::Deserializer::from_slice(payload);
    T::deserialize(ObjectOnly(&mut deserializer))
        .and_then(|value| deserializer.end().map(|()| value))
        .map_err(|source| DispatchError::decode(std::any::type_name::<T>(), source))
}

/// Encodes a method output.
///
/// Returns `Ok(None)` when the value serialises to `null` (unit, `None`),
/// signalling that no body should be produced.
///
/// # Errors
///
/// Returns [`DispatchError::Encode`] when serialisation fails, for example a
/// map with non-string keys.
pub fn encode<T: Serialize>(value: &T) -> Result<Option<Vec<u8>>, DispatchError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|source| DispatchError::encode(std::any::type_name::<T>(), source))?;
    if bytes == NULL_LITERAL {
        return Ok(None);
    }
    Ok(Some(bytes))
}
