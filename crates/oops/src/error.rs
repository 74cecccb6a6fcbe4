use std::error::Error as StdError;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::inspect::{inspect, Inspect};

/// Shared handle to any error in a composition.
///
/// Every wrapper in this crate (trace, chain, namespace, shadow, later,
/// verbose) stores its inner errors as `Error` and is itself handed back as
/// an `Error`. The handle is an `Arc`, so cloning is cheap and a single
/// error may appear in several compositions at once.
///
/// # Rendering
///
/// | Format  | Output |
/// |---------|--------|
/// | `{}`    | terse: the headline message |
/// | `{:#}`  | verbose: traces, chains, namespaces expanded |
/// | `{:?}`  | same as `{:#}` |
/// | `{:#?}` | `Debug` of the concrete error |
///
/// # Inspection
///
/// `source()` (through `Deref`) unwraps one level. [`Error::find`] and
/// [`Error::is`] walk the inspection path, see [`crate::inspect`].
///
/// # Nil
///
/// There is no "nil" `Error`. Entry points that may fold to nothing return
/// `Option<Error>`.
#[derive(Clone)]
pub struct Error {
    inner: Arc<dyn Repr>,
}

/// Object-safe view over the concrete error behind an [`Error`].
trait Repr: Send + Sync + 'static {
    fn error(&self) -> &(dyn StdError + Send + Sync + 'static);
    fn type_name(&self) -> &'static str;
    fn to_json(&self) -> Option<serde_json::Result<serde_json::Value>>;
}

/// Any std error, rendered to JSON as its message.
struct Plain<E>(E);

/// An error carrying its own JSON form.
struct Json<E>(E);

/// A pre-boxed trait object.
struct Boxed(Box<dyn StdError + Send + Sync + 'static>);

impl<E> Repr for Plain<E>
where
    E: StdError + Send + Sync + 'static,
{
    fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &self.0
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    fn to_json(&self) -> Option<serde_json::Result<serde_json::Value>> {
        None
    }
}

impl<E> Repr for Json<E>
where
    E: StdError + Serialize + Send + Sync + 'static,
{
    fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &self.0
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    fn to_json(&self) -> Option<serde_json::Result<serde_json::Value>> {
        Some(serde_json::to_value(&self.0))
    }
}

impl Repr for Boxed {
    fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Box<dyn StdError + Send + Sync>>()
    }

    fn to_json(&self) -> Option<serde_json::Result<serde_json::Value>> {
        None
    }
}

// ── Constructors ──────────────────────────────────────────────────

impl Error {
    /// Wrap any std error. Its JSON form is its message.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Plain(error)),
        }
    }

    /// Wrap an error that serializes itself. [`crate::marshal`] prefers
    /// this representation over the message.
    pub fn json<E>(error: E) -> Self
    where
        E: StdError + Serialize + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Json(error)),
        }
    }

    /// Wrap an already boxed error.
    pub fn from_boxed(error: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        Self {
            inner: Arc::new(Boxed(error)),
        }
    }

    /// A plain message error without a trace. See [`crate::new`] for the
    /// traced variant.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::new(Message(message.to_string()))
    }
}

// ── Accessors ─────────────────────────────────────────────────────

impl Error {
    /// The concrete error as a trait object.
    #[inline]
    pub fn as_dyn(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.error()
    }

    /// Type name of the concrete error, e.g. `oops::trace::TraceError`.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Downcast this level only. Use [`Error::find`] to search the
    /// inspection path.
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: StdError + 'static,
    {
        self.as_dyn().downcast_ref::<T>()
    }

    /// First error of type `T` on the inspection path ("as").
    pub fn find<T>(&self) -> Option<&T>
    where
        T: StdError + 'static,
    {
        self.inspect().find_map(|err| err.downcast_ref::<T>())
    }

    /// True if an error equal to `target` is on the inspection path ("is").
    pub fn is<T>(&self, target: &T) -> bool
    where
        T: StdError + PartialEq + 'static,
    {
        self.inspect()
            .filter_map(|err| err.downcast_ref::<T>())
            .any(|err| err == target)
    }

    /// True if `target` itself (same allocation) is on the inspection path.
    pub fn is_error(&self, target: &Error) -> bool {
        let target = target.as_dyn() as *const dyn StdError as *const ();
        self.inspect()
            .any(|err| std::ptr::eq(err as *const dyn StdError as *const (), target))
    }

    /// Walk the inspection path starting at this error.
    pub fn inspect(&self) -> Inspect<'_> {
        inspect(self.as_dyn())
    }

    /// True if both handles point at the same error.
    #[inline]
    pub fn ptr_eq(a: &Error, b: &Error) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&a.inner) as *const (),
            Arc::as_ptr(&b.inner) as *const (),
        )
    }

    /// The error's own JSON form, if it has one.
    pub(crate) fn own_json(&self) -> Option<serde_json::Result<serde_json::Value>> {
        self.inner.to_json()
    }
}

impl Deref for Error {
    type Target = dyn StdError + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        self.as_dyn()
    }
}

impl AsRef<dyn StdError + Send + Sync + 'static> for Error {
    fn as_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.as_dyn()
    }
}

/// Handles compare by identity.
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        Error::ptr_eq(self, other)
    }
}

impl Eq for Error {}

// ── Conversions ───────────────────────────────────────────────────

impl<E> From<E> for Error
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Error::new(error)
    }
}

impl From<Error> for Box<dyn StdError + Send + Sync + 'static> {
    fn from(error: Error) -> Self {
        Box::new(Bridge(error))
    }
}

/// Lets an [`Error`] travel where a boxed std error is expected.
struct Bridge(Error);

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for Bridge {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.0.as_dyn())
    }
}

// ── Display / Debug ───────────────────────────────────────────────

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Forwarding the formatter keeps the `{:#}` flag intact.
        fmt::Display::fmt(self.as_dyn(), f)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            fmt::Debug::fmt(self.as_dyn(), f)
        } else {
            write!(f, "{:#}", self.as_dyn())
        }
    }
}

// ── Serialize ─────────────────────────────────────────────────────

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        crate::json::to_json(self)
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

// ── Message ───────────────────────────────────────────────────────

/// A bare message error, the leaf produced by [`crate::new`] and
/// [`Error::msg`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message(String);

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}
