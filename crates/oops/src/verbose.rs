use std::error::Error as StdError;
use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::Error;

/// Renders its inner error verbosely even under `{}`.
///
/// Useful where only `to_string()` is available, e.g. a log line.
#[derive(Debug)]
pub struct VerboseError {
    err: Error,
}

impl VerboseError {
    pub fn err(&self) -> &Error {
        &self.err
    }
}

impl fmt::Display for VerboseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.err)
    }
}

impl StdError for VerboseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.err.as_dyn())
    }
}

impl Serialize for VerboseError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("VerboseError", 2)?;
        state.serialize_field("type", self.err.type_name())?;
        state.serialize_field("err", &self.err)?;
        state.end()
    }
}

/// Make `err` render verbosely under `{}`. `None` stays `None`.
pub fn verbose(err: impl Into<Option<Error>>) -> Option<Error> {
    err.into().map(wrap)
}

pub(crate) fn wrap(err: Error) -> Error {
    Error::json(VerboseError { err })
}
