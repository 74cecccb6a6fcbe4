//! JSON rendering of error compositions.
//!
//! An error that was wrapped with [`Error::json`] serializes itself; every
//! other error becomes its terse message as a JSON string. Wrappers in this
//! crate serialize their inner errors through the same rule, so a whole
//! composition marshals into nested objects:
//!
//! ```json
//! {"type":"oops::error::Message","name":"db","err":{"type":"oops::error::Message","err":"connection refused","data":[...]}}
//! ```

use serde_json::Value;

use crate::Error;

/// JSON value of `err`: its own serialization if it has one, otherwise its
/// terse message.
pub fn to_json(err: &Error) -> serde_json::Result<Value> {
    match err.own_json() {
        Some(value) => value,
        None => Ok(Value::String(err.to_string())),
    }
}

/// [`to_json`] encoded as bytes.
pub fn marshal(err: &Error) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&to_json(err)?)
}
