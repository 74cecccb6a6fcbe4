use std::error::Error as StdError;
use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::Error;

/// A public error standing in for a hidden one.
///
/// Rendering, terse or verbose, shows only `err`. The hidden error appears
/// in `Debug` of the concrete type and in JSON, and can be read back with
/// [`ShadowError::hidden`] after [`Error::find`].
///
/// `source()` is `err.source()`: the visible branch's history without the
/// visible error itself, so repeated shadowing does not nest wrappers.
/// [`Error::is`] and [`Error::find`] see `err` and its history, never
/// `hidden`.
#[derive(Debug)]
pub struct ShadowError {
    hidden: Error,
    err: Error,
}

impl ShadowError {
    pub fn hidden(&self) -> &Error {
        &self.hidden
    }

    pub fn err(&self) -> &Error {
        &self.err
    }
}

impl fmt::Display for ShadowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.err, f)
    }
}

impl StdError for ShadowError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.err.source()
    }
}

impl Serialize for ShadowError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ShadowError", 3)?;
        state.serialize_field("type", self.err.type_name())?;
        state.serialize_field("err", &self.err)?;
        state.serialize_field("hidden", &self.hidden)?;
        state.end()
    }
}

/// Hide `hidden` behind `err`. Either `None` gives `None`.
///
/// ```
/// use oops::{shadow, Error, ShadowError};
///
/// let internal = Error::msg("pq: relation \"users\" does not exist");
/// let err = shadow(internal, Error::msg("user lookup failed")).unwrap();
///
/// assert_eq!(err.to_string(), "user lookup failed");
/// assert!(err.find::<ShadowError>().unwrap().hidden().to_string().starts_with("pq:"));
/// ```
pub fn shadow(hidden: impl Into<Option<Error>>, err: impl Into<Option<Error>>) -> Option<Error> {
    let hidden = hidden.into()?;
    let err = err.into()?;

    Some(pair(hidden, err))
}

pub(crate) fn pair(hidden: Error, err: Error) -> Error {
    Error::json(ShadowError { hidden, err })
}

/// `*hidden = shadow(hidden, err)`.
pub fn shadow_into(hidden: &mut Option<Error>, err: impl Into<Option<Error>>) {
    *hidden = shadow(hidden.take(), err);
}

/// A closure performing [`shadow_into`] when called, for cleanup paths.
///
/// ```
/// use oops::{shadow_deferred, Error};
///
/// fn load() -> Result<(), Error> {
///     let mut err = Some(Error::msg("disk on fire"));
///     shadow_deferred(&mut err, Error::msg("load failed"))();
///     err.map_or(Ok(()), Err)
/// }
///
/// assert_eq!(load().unwrap_err().to_string(), "load failed");
/// ```
pub fn shadow_deferred<'a>(
    hidden: &'a mut Option<Error>,
    err: impl Into<Option<Error>>,
) -> impl FnOnce() + 'a {
    deferred(hidden, err.into())
}

fn deferred(hidden: &mut Option<Error>, err: Option<Error>) -> impl FnOnce() + '_ {
    move || shadow_into(hidden, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{trace_with_options, TraceError, TraceOptions};
    use crate::TraceData;
    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq)]
    struct Custom(&'static str);

    impl fmt::Display for Custom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl StdError for Custom {}

    #[derive(Debug)]
    struct Marker;

    impl fmt::Display for Marker {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("marker")
        }
    }

    impl TraceData for Marker {}

    fn marked(err: Error) -> Error {
        let options = TraceOptions::default().capturer(|_: &Error, _: usize| -> Box<dyn TraceData> {
            Box::new(Marker)
        });
        trace_with_options(err, options).unwrap()
    }

    #[test]
    fn folding() {
        let e = Error::msg("e");
        assert!(shadow(None, None).is_none());
        assert!(shadow(e.clone(), None).is_none());
        assert!(shadow(None, e.clone()).is_none());
        assert!(shadow(e.clone(), e).is_some());
    }

    #[test]
    fn renders_only_the_visible_error() {
        let hidden = marked(Error::msg("secret"));
        let err = shadow(hidden, marked(Error::msg("public"))).unwrap();

        assert_eq!(err.to_string(), "public");
        assert_eq!(format!("{err:#}"), "public\n··marker");
        assert!(!format!("{err:#}").contains("secret"));
        assert!(format!("{:#?}", err).contains("secret"));
    }

    #[test]
    fn source_skips_the_visible_level() {
        let root = Error::new(Custom("root"));
        let visible = marked(root.clone());
        let err = shadow(Error::msg("hidden"), visible).unwrap();

        let source = err.source().unwrap();
        assert_eq!(source.downcast_ref::<Custom>(), Some(&Custom("root")));
        assert!(source.source().is_none());

        let bare = shadow(Error::msg("hidden"), Error::msg("leaf")).unwrap();
        assert!(bare.source().is_none());
    }

    #[test]
    fn is_and_as_follow_the_visible_branch() {
        let hidden = Error::new(Custom("hidden"));
        let visible = marked(Error::new(Custom("visible")));
        let err = shadow(hidden.clone(), visible.clone()).unwrap();

        assert!(err.is(&Custom("visible")));
        assert!(!err.is(&Custom("hidden")));
        assert!(err.is_error(&visible));
        assert!(!err.is_error(&hidden));
        assert!(err.find::<TraceError>().is_some());

        let recovered = err.find::<ShadowError>().unwrap().hidden();
        assert!(Error::ptr_eq(recovered, &hidden));
    }

    #[test]
    fn into_and_deferred_accumulate() {
        let mut slot = None;
        shadow_into(&mut slot, Error::msg("public"));
        assert!(slot.is_none());

        let mut slot = Some(Error::msg("first"));
        shadow_into(&mut slot, Error::msg("second"));
        assert_eq!(slot.as_ref().unwrap().to_string(), "second");

        let mut slot = Some(Error::msg("internal"));
        {
            let finish = shadow_deferred(&mut slot, Error::msg("public"));
            finish();
        }
        let err = slot.unwrap();
        assert_eq!(err.to_string(), "public");
        assert_eq!(err.find::<ShadowError>().unwrap().hidden().to_string(), "internal");
    }

    #[test]
    fn repeated_shadowing_keeps_latest_visible() {
        let mut slot = Some(Error::msg("a"));
        shadow_into(&mut slot, Error::msg("b"));
        shadow_into(&mut slot, Error::msg("c"));

        let err = slot.unwrap();
        assert_eq!(err.to_string(), "c");
        let outer = err.find::<ShadowError>().unwrap();
        assert_eq!(outer.hidden().to_string(), "b");
        assert!(outer.hidden().find::<ShadowError>().is_some());
    }

    #[test]
    fn json_includes_both() {
        let err = shadow(Error::msg("internal"), Error::msg("public")).unwrap();
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["err"], "public");
        assert_eq!(json["hidden"], "internal");
        assert_eq!(json["type"], std::any::type_name::<crate::Message>());
    }
}
