//! Deferred errors.
//!
//! [`later`] records where an error was requested and runs the closure
//! producing it on first use. Rendering, `source()`, inspection and JSON
//! all force evaluation; the closure runs at most once, even when several
//! threads race to render the same error.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::lines;
use crate::trace::{attach, TraceOptions, TRACE_SKIP_INTERNAL};
use crate::Error;

/// Why a deferred closure did not produce an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaterFault {
    #[error("later: callable returned {returned} instead of an error")]
    NoError { returned: &'static str },

    #[error("later: callable panicked: {message}")]
    Panicked { message: String },
}

/// Values a deferred closure may return.
///
/// `()`, `None` and `Ok(_)` carry no error and evaluate to
/// [`LaterFault::NoError`].
pub trait LaterOutput {
    fn into_error(self) -> Result<Error, LaterFault>;
}

impl LaterOutput for Error {
    fn into_error(self) -> Result<Error, LaterFault> {
        Ok(self)
    }
}

impl LaterOutput for Option<Error> {
    fn into_error(self) -> Result<Error, LaterFault> {
        self.ok_or(LaterFault::NoError { returned: "None" })
    }
}

impl<T, E> LaterOutput for Result<T, E>
where
    E: Into<Error>,
{
    fn into_error(self) -> Result<Error, LaterFault> {
        match self {
            Ok(_) => Err(LaterFault::NoError { returned: "Ok" }),
            Err(err) => Ok(err.into()),
        }
    }
}

impl LaterOutput for () {
    fn into_error(self) -> Result<Error, LaterFault> {
        Err(LaterFault::NoError { returned: "()" })
    }
}

type Callable = Box<dyn FnOnce() -> Result<Error, LaterFault> + Send>;

/// An error computed on first use.
pub struct LaterError {
    callable: Mutex<Option<Callable>>,
    result: OnceLock<Error>,
}

impl LaterError {
    pub(crate) fn new<F, O>(f: F) -> Self
    where
        F: FnOnce() -> O + Send + 'static,
        O: LaterOutput,
    {
        let callable: Callable = Box::new(move || f().into_error());
        Self {
            callable: Mutex::new(Some(callable)),
            result: OnceLock::new(),
        }
    }

    /// Run the closure if it has not run yet and return its error.
    pub fn eval(&self) -> &Error {
        self.result.get_or_init(|| {
            let callable = self
                .callable
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();

            let outcome = match callable {
                Some(callable) => match panic::catch_unwind(AssertUnwindSafe(callable)) {
                    Ok(outcome) => outcome,
                    Err(payload) => Err(LaterFault::Panicked {
                        message: panic_message(payload.as_ref()),
                    }),
                },
                // Taken by an evaluation that unwound before storing its result.
                None => Err(LaterFault::Panicked {
                    message: String::from("evaluation interrupted"),
                }),
            };

            match outcome {
                Ok(err) => err,
                Err(fault) => {
                    tracing::warn!(%fault, "deferred error evaluated to a fault");
                    Error::new(fault)
                }
            }
        })
    }

    pub fn is_evaluated(&self) -> bool {
        self.result.get().is_some()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    String::from("<non-string panic payload>")
}

impl fmt::Debug for LaterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaterError")
            .field("result", &self.result.get())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for LaterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let err = self.eval();
        if !f.alternate() {
            return fmt::Display::fmt(err, f);
        }

        let lines = lines::lines(&format!("{err:#}"));
        write!(f, "later: {}", lines[0])?;
        for line in &lines[1..] {
            write!(f, "\n{line}")?;
        }
        Ok(())
    }
}

impl StdError for LaterError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.eval().as_dyn())
    }
}

impl Serialize for LaterError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let err = self.eval();

        let mut state = serializer.serialize_struct("LaterError", 2)?;
        state.serialize_field("type", err.type_name())?;
        state.serialize_field("err", err)?;
        state.end()
    }
}

/// A traced error produced by `f` on first use.
///
/// The trace points at the caller of `later`, not at whoever first renders
/// the error.
///
/// ```
/// use oops::{later, Error};
///
/// let err = later(|| Error::msg(format!("{} retries exhausted", 3)));
/// assert_eq!(err.to_string(), "3 retries exhausted");
/// ```
///
/// `later` is the only constructor, so every deferred error is traced:
///
/// ```compile_fail
/// let untraced = oops::LaterError::new(|| oops::Error::msg("x"));
/// ```
#[inline(never)]
pub fn later<F, O>(f: F) -> Error
where
    F: FnOnce() -> O + Send + 'static,
    O: LaterOutput,
{
    attach(Error::json(LaterError::new(f)), TraceOptions::skip(TRACE_SKIP_INTERNAL))
}
