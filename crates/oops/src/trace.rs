use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::capture::{default_capturer, Capturer, Frames, TraceData};
use crate::lines::{self, SUB_ITEM};
use crate::Error;

/// Call levels between a public entry point's caller and the capture
/// function. Passing it as `skip` starts the trace at the caller.
///
/// Use `TRACE_SKIP_INTERNAL + n` from your own helpers that sit `n`
/// levels above a call to [`trace_n`].
pub const TRACE_SKIP_INTERNAL: usize = 4;

/// An error with trace data attached.
///
/// Terse rendering is the inner error's; the trace only shows in verbose
/// (`{:#}`) output.
#[derive(Debug)]
pub struct TraceError {
    data: Box<dyn TraceData>,
    err: Error,
}

impl TraceError {
    /// The capturer's payload.
    pub fn data(&self) -> &(dyn TraceData + 'static) {
        self.data.as_ref()
    }

    /// The payload as [`Frames`], when the default capturer produced it.
    pub fn frames(&self) -> Option<&Frames> {
        self.data.downcast_ref::<Frames>()
    }

    /// The traced error.
    pub fn err(&self) -> &Error {
        &self.err
    }
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !f.alternate() {
            return fmt::Display::fmt(&self.err, f);
        }

        let mut output = lines::indent(lines::lines(&format!("{:#}", self.err)), SUB_ITEM, 1);
        output.extend(lines::indent(lines::lines(&format!("{:#}", self.data)), SUB_ITEM, 0));

        f.write_str(&output.join("\n"))
    }
}

impl StdError for TraceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.err.as_dyn())
    }
}

impl Serialize for TraceError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.data.to_json();

        let mut state = serializer.serialize_struct("TraceError", 3)?;
        state.serialize_field("type", self.err.type_name())?;
        state.serialize_field("err", &self.err)?;
        match data {
            Some(data) => state.serialize_field("data", &data)?,
            None => state.skip_field("data")?,
        }
        state.end()
    }
}

// ── Options ───────────────────────────────────────────────────────

/// Options for [`trace_with_options`].
#[derive(Clone, Default)]
pub struct TraceOptions {
    /// Frames to skip, see [`TRACE_SKIP_INTERNAL`].
    pub skip: usize,

    /// Capturer for this trace only. `None` uses the process default.
    pub capturer: Option<Arc<dyn Capturer>>,
}

impl TraceOptions {
    pub fn skip(skip: usize) -> Self {
        Self {
            skip,
            capturer: None,
        }
    }

    pub fn capturer<C>(mut self, capturer: C) -> Self
    where
        C: Capturer + 'static,
    {
        self.capturer = Some(Arc::new(capturer));
        self
    }
}

impl fmt::Debug for TraceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceOptions")
            .field("skip", &self.skip)
            .field("capturer", &self.capturer.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

// ── Constructors ──────────────────────────────────────────────────
//
// Every public entry point calls `attach` directly so they all sit at the
// same depth above the capturer.

/// Capture a trace and attach it to `err`.
#[inline(never)]
pub(crate) fn attach(err: Error, options: TraceOptions) -> Error {
    let capturer = options.capturer.unwrap_or_else(default_capturer);
    let data = capturer.capture(&err, options.skip);

    Error::json(TraceError { data, err })
}

/// Attach a trace starting at the caller. `None` stays `None`.
#[inline(never)]
pub fn trace(err: impl Into<Option<Error>>) -> Option<Error> {
    match err.into() {
        Some(err) => Some(attach(err, TraceOptions::skip(TRACE_SKIP_INTERNAL))),
        None => None,
    }
}

/// Attach a trace, skipping `skip` frames above the capture function.
#[inline(never)]
pub fn trace_n(err: impl Into<Option<Error>>, skip: usize) -> Option<Error> {
    match err.into() {
        Some(err) => Some(attach(err, TraceOptions::skip(skip))),
        None => None,
    }
}

/// Attach a trace using the given options.
#[inline(never)]
pub fn trace_with_options(err: impl Into<Option<Error>>, options: TraceOptions) -> Option<Error> {
    match err.into() {
        Some(err) => Some(attach(err, options)),
        None => None,
    }
}

/// A traced message error.
///
/// ```
/// let err = oops::new("bad stuff");
/// assert_eq!(err.to_string(), "bad stuff");
/// assert!(format!("{err:#}").lines().count() > 1);
/// ```
#[inline(never)]
pub fn new(message: impl fmt::Display) -> Error {
    attach(Error::msg(message), TraceOptions::skip(TRACE_SKIP_INTERNAL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{default_capturer_guard, RuntimeCapturer};
    use crate::Message;
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
    struct Label;

    impl fmt::Display for Label {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("label line 1\nlabel line 2")
        }
    }

    impl TraceData for Label {}

    fn label(_: &Error, _: usize) -> Box<dyn TraceData> {
        Box::new(Label)
    }

    fn label_of(err: &Error) -> Option<&Label> {
        err.find::<TraceError>()?.data().downcast_ref::<Label>()
    }

    fn frames_of(err: &Error) -> &Frames {
        err.find::<TraceError>()
            .and_then(TraceError::frames)
            .expect("trace with frames")
    }

    #[inline(never)]
    fn traced_site() -> Error {
        trace(Error::msg("bad stuff")).unwrap()
    }

    #[inline(never)]
    fn traced_n_site() -> Error {
        trace_n(Error::msg("bad stuff"), TRACE_SKIP_INTERNAL).unwrap()
    }

    #[inline(never)]
    fn traced_options_site() -> Error {
        trace_with_options(Error::msg("bad stuff"), TraceOptions::skip(TRACE_SKIP_INTERNAL)).unwrap()
    }

    #[inline(never)]
    fn new_site() -> Error {
        new("bad stuff")
    }

    #[inline(never)]
    fn deep_site(skip: usize) -> Error {
        let options = TraceOptions::skip(skip).capturer(RuntimeCapturer::with_depth(256));
        trace_with_options(Error::msg("bad stuff"), options).unwrap()
    }

    #[test]
    fn folding() {
        assert!(trace(None).is_none());
        assert!(trace_n(None, 0).is_none());
        assert!(trace_with_options(None, TraceOptions::default()).is_none());
    }

    #[test]
    fn terse_is_inner_message() {
        let err = trace(Error::msg("bad stuff")).unwrap();
        assert_eq!(err.to_string(), "bad stuff");
    }

    #[test]
    fn every_entry_point_starts_at_caller() {
        let _guard = default_capturer_guard();

        let cases: [(fn() -> Error, &str); 4] = [
            (traced_site, "traced_site"),
            (traced_n_site, "traced_n_site"),
            (traced_options_site, "traced_options_site"),
            (new_site, "new_site"),
        ];
        for (site, name) in cases {
            let err = site();
            let frames = frames_of(&err);
            assert!(frames[0].function.ends_with(name), "{name}:\n{frames}");
        }
    }

    #[test]
    fn trace_and_trace_n_capture_same_depth() {
        let _guard = default_capturer_guard();

        let terr = traced_site();
        let tnerr = traced_n_site();
        assert_eq!(frames_of(&terr).len(), frames_of(&tnerr).len());
    }

    #[test]
    fn skip_drops_one_frame_per_level() {
        let counts: Vec<usize> = (1..=TRACE_SKIP_INTERNAL + 1)
            .map(|k| frames_of(&deep_site(k)).len())
            .collect();
        for pair in counts.windows(2) {
            assert_eq!(pair[0], pair[1] + 1, "{counts:?}");
        }
        assert!(frames_of(&deep_site(TRACE_SKIP_INTERNAL))[0]
            .function
            .ends_with("deep_site"));
    }

    #[test]
    fn verbose_appends_indented_payload() {
        let options = TraceOptions::default().capturer(label);
        let err = trace_with_options(Error::msg("first\nsecond"), options).unwrap();

        assert_eq!(err.to_string(), "first\nsecond");
        assert_eq!(
            format!("{err:#}"),
            "first\n··second\n··label line 1\n··label line 2"
        );
    }

    #[test]
    fn custom_capturer_applies_once() {
        let _guard = default_capturer_guard();

        let custom = trace_with_options(Error::msg("x"), TraceOptions::default().capturer(label)).unwrap();
        let default = trace(Error::msg("x")).unwrap();

        assert!(label_of(&custom).is_some());
        assert!(label_of(&default).is_none());
        assert!(default.find::<TraceError>().unwrap().frames().is_some());
    }

    #[test]
    fn payload_borrows_from_local_error() {
        let data = {
            let local = trace_with_options(Error::msg("x"), TraceOptions::default().capturer(label)).unwrap();
            label_of(&local).map(ToString::to_string)
        };
        assert_eq!(data.as_deref(), Some("label line 1\nlabel line 2"));
    }

    #[test]
    fn unwrap_is_and_as_delegate() {
        let cerr = Error::new(Custom("custom"));
        let err = trace(cerr.clone()).unwrap();

        assert!(err.is(&Custom("custom")));
        assert!(err.is_error(&cerr));
        assert_eq!(err.find::<Custom>(), Some(&Custom("custom")));
        assert!(err.find::<TraceError>().is_some());

        let inner = err.source().unwrap();
        assert_eq!(inner.downcast_ref::<Custom>(), Some(&Custom("custom")));
    }

    #[test]
    fn json_has_type_err_and_data() {
        let err = trace_with_options(Error::msg("bad stuff"), TraceOptions::default().capturer(label)).unwrap();
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["type"], std::any::type_name::<Message>());
        assert_eq!(json["err"], "bad stuff");
        assert!(json.get("data").is_none());

        let _guard = default_capturer_guard();
        let err = new("framed");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["err"], "framed");
        assert!(json["data"].is_array());
    }
}
