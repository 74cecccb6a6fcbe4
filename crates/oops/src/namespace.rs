use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::chain as chain_mod;
use crate::shadow as shadow_mod;
use crate::trace::{attach, TraceOptions, TRACE_SKIP_INTERNAL};
use crate::Error;

/// A name prefixed to every error it produces.
///
/// Typically one per package or subsystem:
///
/// ```
/// use oops::{Error, Namespace};
///
/// static DB: Namespace = Namespace::new("db");
///
/// let err = DB.error("connection refused");
/// assert_eq!(err.to_string(), "db: connection refused");
///
/// assert!(DB.wrap(None).is_none());
/// ```
///
/// Tracing methods attribute the trace to their caller, exactly like
/// [`crate::trace`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    name: Cow<'static, str>,
}

impl Namespace {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
        }
    }

    /// A namespace with a name built at runtime.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn prefix(&self, err: Error) -> Error {
        Error::json(NamespaceError {
            name: self.name.clone(),
            err,
        })
    }

    // ── Wrapping ──────────────────────────────────────────────────

    /// Prefix `err`. `None` stays `None`.
    pub fn wrap(&self, err: impl Into<Option<Error>>) -> Option<Error> {
        match err.into() {
            Some(err) => Some(self.prefix(err)),
            None => None,
        }
    }

    /// Prefix the error in `slot`, if any.
    pub fn wrap_into(&self, slot: &mut Option<Error>) {
        *slot = self.wrap(slot.take());
    }

    // ── Tracing ───────────────────────────────────────────────────

    /// A traced, prefixed message error.
    #[inline(never)]
    pub fn error(&self, message: impl fmt::Display) -> Error {
        self.prefix(attach(Error::msg(message), TraceOptions::skip(TRACE_SKIP_INTERNAL)))
    }

    #[inline(never)]
    pub fn trace(&self, err: impl Into<Option<Error>>) -> Option<Error> {
        match err.into() {
            Some(err) => Some(self.prefix(attach(err, TraceOptions::skip(TRACE_SKIP_INTERNAL)))),
            None => None,
        }
    }

    #[inline(never)]
    pub fn trace_n(&self, err: impl Into<Option<Error>>, skip: usize) -> Option<Error> {
        match err.into() {
            Some(err) => Some(self.prefix(attach(err, TraceOptions::skip(skip)))),
            None => None,
        }
    }

    #[inline(never)]
    pub fn trace_with_options(
        &self,
        err: impl Into<Option<Error>>,
        options: TraceOptions,
    ) -> Option<Error> {
        match err.into() {
            Some(err) => Some(self.prefix(attach(err, options))),
            None => None,
        }
    }

    // ── Composition ───────────────────────────────────────────────

    pub fn chain<I>(&self, errs: I) -> Option<Error>
    where
        I: IntoIterator,
        I::Item: Into<Option<Error>>,
    {
        self.wrap(chain_mod::chain(errs))
    }

    /// [`crate::chain_into`], then prefix the result.
    pub fn chain_into<I>(&self, target: &mut Option<Error>, errs: I)
    where
        I: IntoIterator,
        I::Item: Into<Option<Error>>,
    {
        chain_mod::chain_into(target, errs);
        self.wrap_into(target);
    }

    pub fn shadow(
        &self,
        hidden: impl Into<Option<Error>>,
        err: impl Into<Option<Error>>,
    ) -> Option<Error> {
        self.wrap(shadow_mod::shadow(hidden, err))
    }

    /// [`crate::shadow_into`], then prefix the result.
    pub fn shadow_into(&self, hidden: &mut Option<Error>, err: impl Into<Option<Error>>) {
        shadow_mod::shadow_into(hidden, err);
        self.wrap_into(hidden);
    }

    /// A closure performing [`Namespace::shadow_into`] when called.
    pub fn shadow_deferred<'a>(
        &'a self,
        hidden: &'a mut Option<Error>,
        err: impl Into<Option<Error>>,
    ) -> impl FnOnce() + 'a {
        self.deferred(hidden, err.into())
    }

    fn deferred<'a>(&'a self, hidden: &'a mut Option<Error>, err: Option<Error>) -> impl FnOnce() + 'a {
        move || self.shadow_into(hidden, err)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An error prefixed with a [`Namespace`] name.
///
/// Verbose rendering prefixes only the first line; continuation lines of
/// the inner rendering pass through untouched.
#[derive(Debug)]
pub struct NamespaceError {
    name: Cow<'static, str>,
    err: Error,
}

impl NamespaceError {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn err(&self) -> &Error {
        &self.err
    }
}

impl fmt::Display for NamespaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name)?;
        fmt::Display::fmt(&self.err, f)
    }
}

impl StdError for NamespaceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.err.as_dyn())
    }
}

impl Serialize for NamespaceError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("NamespaceError", 3)?;
        state.serialize_field("type", self.err.type_name())?;
        state.serialize_field("name", self.name.as_ref())?;
        state.serialize_field("err", &self.err)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::default_capturer_guard;
    use crate::{ChainError, Frames, ShadowError, TraceError};
    use pretty_assertions::assert_eq;

    static NS: Namespace = Namespace::new("test");

    #[derive(Debug, PartialEq)]
    struct Custom(&'static str);

    impl fmt::Display for Custom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl StdError for Custom {}

    fn frames_of(err: &Error) -> &Frames {
        err.find::<TraceError>()
            .and_then(TraceError::frames)
            .expect("trace with frames")
    }

    #[inline(never)]
    fn error_site() -> Error {
        NS.error("bad stuff")
    }

    #[inline(never)]
    fn trace_site() -> Error {
        NS.trace(Error::msg("bad stuff")).unwrap()
    }

    #[inline(never)]
    fn trace_n_site() -> Error {
        NS.trace_n(Error::msg("bad stuff"), TRACE_SKIP_INTERNAL).unwrap()
    }

    #[inline(never)]
    fn trace_options_site() -> Error {
        NS.trace_with_options(Error::msg("bad stuff"), TraceOptions::skip(TRACE_SKIP_INTERNAL))
            .unwrap()
    }

    #[test]
    fn folding() {
        let mut slot = None;

        assert!(NS.wrap(None).is_none());
        assert!(NS.trace(None).is_none());
        assert!(NS.trace_n(None, 0).is_none());
        assert!(NS.trace_with_options(None, TraceOptions::default()).is_none());
        assert!(NS.chain([None::<Error>, None]).is_none());
        assert!(NS.shadow(Error::msg("h"), None).is_none());

        NS.wrap_into(&mut slot);
        NS.chain_into(&mut slot, [None::<Error>]);
        NS.shadow_into(&mut slot, Error::msg("e"));
        assert!(slot.is_none());
    }

    #[test]
    fn methods_attribute_their_caller() {
        let _guard = default_capturer_guard();

        let cases: [(fn() -> Error, &str); 4] = [
            (error_site, "error_site"),
            (trace_site, "trace_site"),
            (trace_n_site, "trace_n_site"),
            (trace_options_site, "trace_options_site"),
        ];
        for (site, name) in cases {
            let err = site();
            let frames = frames_of(&err);
            assert!(frames[0].function.ends_with(name), "{name}:\n{frames}");
            assert_eq!(err.to_string(), "test: bad stuff");
        }
    }

    #[test]
    fn prefix_once_on_first_line() {
        let err = NS.wrap(Error::msg("first\nsecond")).unwrap();
        assert_eq!(err.to_string(), "test: first\nsecond");
        assert_eq!(format!("{err:#}"), "test: first\nsecond");

        let _guard = default_capturer_guard();
        let err = NS.error("bad stuff");
        let verbose = format!("{err:#}");
        let mut lines = verbose.lines();
        assert_eq!(lines.next(), Some("test: bad stuff"));
        for line in lines {
            assert!(!line.contains("test: "), "{verbose}");
            assert!(line.starts_with("··"), "{verbose}");
        }
    }

    #[test]
    fn unwrap_is_and_as_delegate() {
        let inner = Error::new(Custom("custom"));
        let err = NS.wrap(inner.clone()).unwrap();

        assert!(err.is(&Custom("custom")));
        assert!(err.is_error(&inner));
        assert_eq!(err.find::<NamespaceError>().map(NamespaceError::name), Some("test"));
        assert_eq!(err.source().unwrap().downcast_ref::<Custom>(), Some(&Custom("custom")));
    }

    #[test]
    fn composition_helpers_prefix() {
        let err = NS.chain([Error::msg("a"), Error::msg("b")]).unwrap();
        assert_eq!(err.to_string(), "test: a");
        assert_eq!(err.find::<NamespaceError>().unwrap().err().downcast_ref::<ChainError>().unwrap().len(), 2);

        let mut slot = Some(Error::msg("primary"));
        NS.chain_into(&mut slot, [Error::msg("cleanup")]);
        assert_eq!(slot.as_ref().unwrap().to_string(), "test: primary");

        let err = NS.shadow(Error::msg("internal"), Error::msg("public")).unwrap();
        assert_eq!(err.to_string(), "test: public");
        assert!(err.find::<ShadowError>().is_some());

        let mut slot = Some(Error::msg("internal"));
        NS.shadow_into(&mut slot, Error::msg("public"));
        assert_eq!(slot.unwrap().to_string(), "test: public");

        let mut slot = Some(Error::msg("internal"));
        NS.shadow_deferred(&mut slot, Error::msg("public"))();
        assert_eq!(slot.unwrap().to_string(), "test: public");
    }

    #[test]
    fn runtime_names() {
        let ns = Namespace::named(format!("shard-{}", 3));
        assert_eq!(ns.name(), "shard-3");
        assert_eq!(ns.to_string(), "shard-3");
        assert_eq!(ns.wrap(Error::msg("down")).unwrap().to_string(), "shard-3: down");
    }

    #[test]
    fn json_has_name() {
        let err = NS.wrap(Error::msg("bad stuff")).unwrap();
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["name"], "test");
        assert_eq!(json["err"], "bad stuff");
        assert_eq!(json["type"], std::any::type_name::<crate::Message>());
    }
}
