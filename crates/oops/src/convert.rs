use crate::namespace::Namespace;
use crate::trace::{attach, TraceOptions, TRACE_SKIP_INTERNAL};
use crate::{shadow, verbose, Error};

// ── ResultExt: composition on Results ─────────────────────────────

/// Extension trait composing the error side of any `Result`.
///
/// Each adapter leaves `Ok` untouched and converts the error into
/// [`Error`] first, so it works directly on `io::Result` and friends:
///
/// ```no_run
/// use oops::{Namespace, ResultExt};
///
/// static CONFIG: Namespace = Namespace::new("config");
///
/// fn load() -> oops::Result<Vec<u8>> {
///     std::fs::read("app.toml").trace().namespace(&CONFIG)
/// }
/// ```
///
/// [`ResultExt::trace`] attributes the trace to its caller, like
/// [`crate::trace`].
pub trait ResultExt<T> {
    /// Attach a trace starting at the caller.
    fn trace(self) -> Result<T, Error>;

    /// Attach a trace, skipping `skip` frames above the capture function.
    fn trace_n(self, skip: usize) -> Result<T, Error>;

    /// Prefix the error with `ns`.
    fn namespace(self, ns: &Namespace) -> Result<T, Error>;

    /// Replace the error with `err`, keeping the original as hidden.
    fn shadow(self, err: impl Into<Error>) -> Result<T, Error>;

    /// Render the error verbosely under `{}`.
    fn verbose(self) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<Error>,
{
    #[inline(never)]
    fn trace(self) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(attach(err.into(), TraceOptions::skip(TRACE_SKIP_INTERNAL))),
        }
    }

    #[inline(never)]
    fn trace_n(self, skip: usize) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(attach(err.into(), TraceOptions::skip(skip))),
        }
    }

    fn namespace(self, ns: &Namespace) -> Result<T, Error> {
        self.map_err(|err| ns.prefix(err.into()))
    }

    fn shadow(self, err: impl Into<Error>) -> Result<T, Error> {
        self.map_err(|hidden| shadow::pair(hidden.into(), err.into()))
    }

    fn verbose(self) -> Result<T, Error> {
        self.map_err(|err| verbose::wrap(err.into()))
    }
}
