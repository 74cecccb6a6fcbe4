//! Stack capture for trace wrappers.
//!
//! A [`Capturer`] turns `(error, skip)` into an opaque [`TraceData`]
//! payload. The process-wide default walks the stack with the `backtrace`
//! crate and returns [`Frames`].
//!
//! # Skip arithmetic
//!
//! Frame 0 is [`capture_frames`] (or [`capture_frames_scanning`]) itself. Every public trace entry point
//! reaches it through the same call levels:
//!
//! ```text
//! [0] capture_frames_scanning
//! [1] <RuntimeCapturer as Capturer>::capture
//! [2] trace::attach
//! [3] trace / trace_n / Namespace::trace / new / later / ResultExt::trace ...
//! [4] caller                      <- TRACE_SKIP_INTERNAL
//! ```
//!
//! # Registration
//!
//! [`set_default_capturer`] swaps the capturer for every trace taken
//! afterwards. Configure once, before use: a registration racing with
//! concurrent traces is serialized by a lock, but which capturer those
//! traces see is unspecified.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::Serialize;

use crate::config::{self, TraceConfig};
use crate::Error;

/// Symbol suffixes identifying frame 0.
const ANCHORS: [&str; 2] = ["::capture_frames", "::capture_frames_scanning"];

// ── Frames ────────────────────────────────────────────────────────

/// One stack entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Frame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl Frame {
    fn from_symbol(symbol: &backtrace::Symbol) -> Self {
        Self {
            function: symbol
                .name()
                .map(|name| format!("{name:#}"))
                .unwrap_or_else(|| String::from("<unknown>")),
            file: symbol
                .filename()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
            line: symbol.lineno().unwrap_or(0),
        }
    }

    fn unresolved(frame: &backtrace::Frame) -> Self {
        Self {
            function: format!("<unknown {:p}>", frame.ip()),
            file: String::new(),
            line: 0,
        }
    }

    fn is_anchor(&self) -> bool {
        ANCHORS.iter().any(|anchor| self.function.ends_with(anchor))
    }
}

/// Captured stack, innermost frame first.
///
/// Renders as numbered two-line entries:
///
/// ```text
/// [0] app::db::open
///     src/db.rs:42
/// [1] app::main
///     src/main.rs:7
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Frames(pub Vec<Frame>);

impl Frames {
    /// Capture the current stack bounded by the process-wide config.
    /// `skip` 0 starts at the caller of this function.
    #[inline(never)]
    pub fn capture(skip: usize) -> Self {
        let config = config::global();
        capture_frames_scanning(skip.saturating_add(2), config.max_frames, config.scan_limit)
    }
}

impl std::ops::Deref for Frames {
    type Target = [Frame];

    fn deref(&self) -> &[Frame] {
        &self.0
    }
}

impl fmt::Display for Frames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            let prefix = format!("[{i}] ");
            write!(f, "{prefix}{}", frame.function)?;
            write!(f, "\n{:width$}{}:{}", "", frame.file, frame.line, width = prefix.len())?;
        }
        Ok(())
    }
}

/// Walk the current stack and return up to `max_frames` frames, starting
/// `skip` frames above this function.
///
/// Inlined calls are expanded into their own frames. If this function's
/// own frame cannot be located (stripped binaries), the walk starts at the
/// innermost raw frame instead.
///
/// At most `OOPS_TRACE_SCAN` raw frames are walked; see
/// [`capture_frames_scanning`] for an explicit limit.
#[inline(never)]
pub fn capture_frames(skip: usize, max_frames: usize) -> Frames {
    walk(skip, max_frames, config::global().scan_limit)
}

/// [`capture_frames`] walking at most `scan_limit` raw frames.
#[inline(never)]
pub fn capture_frames_scanning(skip: usize, max_frames: usize, scan_limit: usize) -> Frames {
    walk(skip, max_frames, scan_limit)
}

// Frames below the anchor (this function and the backtrace internals) are
// dropped, so both public entry points share one frame 0.
#[inline(never)]
fn walk(skip: usize, max_frames: usize, scan_limit: usize) -> Frames {
    let mut raw = Vec::new();
    backtrace::trace(|frame| {
        raw.push(frame.clone());
        raw.len() < scan_limit
    });

    let mut frames: Vec<Frame> = Vec::new();
    let mut anchor = None;

    for frame in &raw {
        let before = frames.len();
        backtrace::resolve_frame(frame, |symbol| frames.push(Frame::from_symbol(symbol)));
        if frames.len() == before {
            frames.push(Frame::unresolved(frame));
        }

        if anchor.is_none() {
            anchor = frames[before..]
                .iter()
                .position(Frame::is_anchor)
                .map(|i| before + i);
        }

        if let Some(start) = anchor {
            if frames.len() >= start.saturating_add(skip).saturating_add(max_frames) {
                break;
            }
        }
    }

    let start = anchor.unwrap_or_else(|| {
        tracing::trace!(scanned = raw.len(), "capture anchor not found; using raw stack");
        0
    });

    Frames(frames.into_iter().skip(start.saturating_add(skip)).take(max_frames).collect())
}

// ── Payload ───────────────────────────────────────────────────────

#[doc(hidden)]
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Payload attached by a [`Capturer`].
///
/// `Display` is used for verbose rendering, `to_json` for the `data` field
/// of a trace's JSON form.
pub trait TraceData: AsAny + fmt::Display + fmt::Debug + Send + Sync {
    fn to_json(&self) -> Option<serde_json::Value> {
        None
    }
}

impl dyn TraceData {
    /// Downcast the payload, e.g. to [`Frames`].
    pub fn downcast_ref<T: TraceData + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl TraceData for Frames {
    fn to_json(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self).ok()
    }
}

// ── Capturer ──────────────────────────────────────────────────────

/// Strategy producing trace payloads.
pub trait Capturer: Send + Sync {
    fn capture(&self, err: &Error, skip: usize) -> Box<dyn TraceData>;
}

impl<F> Capturer for F
where
    F: Fn(&Error, usize) -> Box<dyn TraceData> + Send + Sync,
{
    fn capture(&self, err: &Error, skip: usize) -> Box<dyn TraceData> {
        self(err, skip)
    }
}

/// Default capturer: [`capture_frames_scanning`] bounded by a
/// [`TraceConfig`].
#[derive(Debug, Clone, Copy)]
pub struct RuntimeCapturer {
    max_frames: usize,
    scan_limit: usize,
}

impl Default for RuntimeCapturer {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeCapturer {
    /// Uses the process-wide config (`OOPS_TRACE_DEPTH`, `OOPS_TRACE_SCAN`).
    pub fn new() -> Self {
        Self::from_config(config::global())
    }

    pub fn from_config(config: &TraceConfig) -> Self {
        Self {
            max_frames: config.max_frames,
            scan_limit: config.scan_limit,
        }
    }

    /// Process-wide config with `max_frames` overridden.
    pub fn with_depth(max_frames: usize) -> Self {
        Self::from_config(&config::global().max_frames(max_frames))
    }
}

impl Capturer for RuntimeCapturer {
    #[inline(never)]
    fn capture(&self, _err: &Error, skip: usize) -> Box<dyn TraceData> {
        Box::new(capture_frames_scanning(skip, self.max_frames, self.scan_limit))
    }
}

// ── Registry ──────────────────────────────────────────────────────

/// `None` means the built-in [`RuntimeCapturer`].
static DEFAULT_CAPTURER: RwLock<Option<Arc<dyn Capturer>>> = RwLock::new(None);

fn runtime_capturer() -> Arc<dyn Capturer> {
    static RUNTIME: OnceLock<Arc<dyn Capturer>> = OnceLock::new();
    RUNTIME.get_or_init(|| Arc::new(RuntimeCapturer::new())).clone()
}

/// Replace the capturer used by traces that do not pass their own.
/// Existing traces keep their payloads.
pub fn set_default_capturer<C>(capturer: C)
where
    C: Capturer + 'static,
{
    let mut slot = DEFAULT_CAPTURER.write().unwrap_or_else(PoisonError::into_inner);
    *slot = Some(Arc::new(capturer));
    tracing::debug!("default trace capturer replaced");
}

/// Restore the built-in [`RuntimeCapturer`].
pub fn reset_default_capturer() {
    let mut slot = DEFAULT_CAPTURER.write().unwrap_or_else(PoisonError::into_inner);
    *slot = None;
    tracing::debug!("default trace capturer reset");
}

pub(crate) fn default_capturer() -> Arc<dyn Capturer> {
    DEFAULT_CAPTURER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .unwrap_or_else(runtime_capturer)
}

/// Serializes tests that read frames from, or replace, the default
/// capturer.
#[cfg(test)]
pub(crate) fn default_capturer_guard() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
