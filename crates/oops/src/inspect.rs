//! The inspection path walked by [`Error::find`](crate::Error::find) and
//! [`Error::is`](crate::Error::is).
//!
//! Starting at an error, each step moves to:
//!
//! | Node            | Next |
//! |-----------------|------|
//! | [`ChainError`]  | its first (oldest) error only |
//! | [`ShadowError`] | its visible `err`, never `hidden` |
//! | anything else   | `source()` |
//!
//! Every other wrapper in this crate is transparent: its `source()` is the
//! error it wraps. A chain's later elements and a shadow's hidden error are
//! still reachable by hand, through `source()` and the concrete types.

use std::error::Error as StdError;
use std::iter::FusedIterator;

use crate::chain::ChainError;
use crate::shadow::ShadowError;

/// Iterator over the inspection path, starting with the error itself.
///
/// Steps lazily: a node's `source()` is not called until the iterator is
/// advanced past it, so stopping at a [`crate::LaterError`] leaves it
/// unevaluated.
#[derive(Clone)]
pub struct Inspect<'a> {
    next: Option<&'a (dyn StdError + 'static)>,
    yielded: Option<&'a (dyn StdError + 'static)>,
}

/// Walk the inspection path of any std error.
pub fn inspect<'a>(err: &'a (dyn StdError + 'static)) -> Inspect<'a> {
    Inspect {
        next: Some(err),
        yielded: None,
    }
}

fn step<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a (dyn StdError + 'static)> {
    if let Some(chain) = err.downcast_ref::<ChainError>() {
        return Some(chain.first().as_dyn());
    }
    if let Some(shadow) = err.downcast_ref::<ShadowError>() {
        return Some(shadow.err().as_dyn());
    }
    err.source()
}

impl<'a> Iterator for Inspect<'a> {
    type Item = &'a (dyn StdError + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(prev) = self.yielded.take() {
            self.next = step(prev);
        }
        let current = self.next.take()?;
        self.yielded = Some(current);
        Some(current)
    }
}

impl FusedIterator for Inspect<'_> {}
