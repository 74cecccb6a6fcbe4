//! # oops: composable errors
//!
//! Small error wrappers that nest freely and stay inspectable: attach a
//! stack trace, chain errors that happened together, prefix a namespace,
//! hide an internal error behind a public one, defer building an error
//! until it is needed.
//!
//! ## Design
//!
//! Every wrapper stores its inner errors as [`Error`], a cloneable `Arc`
//! handle to any `std::error::Error + Send + Sync`, and hands back an
//! `Error` itself. Compositions are immutable once built.
//!
//! | Wrapper             | Built by | `{}` renders |
//! |---------------------|----------|--------------|
//! | [`TraceError`]      | [`trace`], [`trace_n`], [`new`], [`oops!`] | inner |
//! | [`ChainError`]      | [`chain`], [`chain_into`] | first error |
//! | [`NamespaceError`]  | [`Namespace`] methods | `name: inner` |
//! | [`ShadowError`]     | [`shadow`], [`shadow_into`], [`shadow_deferred`] | visible error |
//! | [`LaterError`]      | [`later`] | evaluated error |
//! | [`VerboseError`]    | [`verbose`] | inner, verbose |
//!
//! `{:#}` renders the verbose form: traces, chain elements and nested
//! structure, continuation lines indented with `··`.
//!
//! Wrapping "nothing" gives nothing: entry points take
//! `impl Into<Option<Error>>` and return `Option<Error>`, and `None` folds
//! through every wrapper.
//!
//! ## Quick Start
//!
//! ```rust
//! use oops::{chain_into, Error, Namespace};
//!
//! static STORE: Namespace = Namespace::new("store");
//!
//! fn save() -> Result<(), Error> {
//!     let mut err = STORE.trace(Error::msg("write failed"));
//!
//!     // Cleanup failures join the primary error instead of replacing it.
//!     chain_into(&mut err, [STORE.trace(Error::msg("close failed"))]);
//!
//!     err.map_or(Ok(()), Err)
//! }
//!
//! let err = save().unwrap_err();
//! assert_eq!(err.to_string(), "store: write failed");
//! assert!(format!("{err:#}").starts_with("chain(len=2):"));
//! ```
//!
//! ## Inspection
//!
//! `source()` unwraps one level. [`Error::find`] ("as") and [`Error::is`]
//! walk the [`inspect`] path, which follows only the first error of a chain
//! and only the visible side of a shadow.
//!
//! ## Logging
//!
//! Uses `tracing`; install a subscriber to see capturer changes and faulty
//! [`later`] closures.
//!
//! ## Dependencies
//!
//! | Crate        | Used for |
//! |--------------|----------|
//! | `backtrace`  | stack walking in [`capture_frames`] |
//! | `serde`      | `Serialize` on every wrapper |
//! | `serde_json` | [`marshal`] and trace payloads |
//! | `thiserror`  | [`LaterFault`] |
//! | `tracing`    | diagnostics |

pub mod capture;
pub mod config;
pub mod inspect;
pub mod lines;

mod chain;
mod convert;
mod error;
mod json;
mod later;
#[macro_use]
mod macros;
mod namespace;
mod shadow;
mod trace;
mod verbose;

// ── Public API ────────────────────────────────────────────────────

pub use capture::{
    capture_frames, capture_frames_scanning, reset_default_capturer, set_default_capturer,
    Capturer, Frame, Frames, RuntimeCapturer, TraceData,
};
pub use chain::{chain, chain_into, ChainError, Errors};
pub use convert::ResultExt;
pub use error::{Error, Message};
pub use json::{marshal, to_json};
pub use later::{later, LaterError, LaterFault, LaterOutput};
pub use namespace::{Namespace, NamespaceError};
pub use shadow::{shadow, shadow_deferred, shadow_into, ShadowError};
pub use trace::{new, trace, trace_n, trace_with_options, TraceError, TraceOptions, TRACE_SKIP_INTERNAL};
pub use verbose::{verbose, VerboseError};

/// Convenience Result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
