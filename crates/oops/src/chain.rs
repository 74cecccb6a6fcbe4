use std::error::Error as StdError;
use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::lines::{self, SUB_ITEM};
use crate::Error;

/// Errors that occurred together, oldest first.
///
/// A chain always holds at least two errors; [`chain`] collapses smaller
/// inputs. It is stored as a cons cell (`head`, `rest`) so that unwrapping
/// one level yields the tail without allocating:
///
/// ```text
/// chain(e0, e1, e2) = Chain { e0, Chain { e1, e2 } }
/// source()          =         Chain { e1, e2 }
/// source()          =                     e2
/// ```
///
/// The oldest error is the primary one: terse rendering, [`Error::is`] and
/// [`Error::find`] consider only [`ChainError::first`]. Later errors are
/// reachable through `source()` and [`ChainError::errors`].
#[derive(Debug)]
pub struct ChainError {
    head: Error,
    /// Another `ChainError` while more than two errors remain, else the last.
    rest: Error,
    len: usize,
}

impl ChainError {
    /// Number of errors in the chain (at least 2).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The oldest error.
    pub fn first(&self) -> &Error {
        &self.head
    }

    /// All errors, oldest first.
    pub fn errors(&self) -> Errors<'_> {
        Errors {
            chain: Some(self),
            last: None,
        }
    }
}

/// Iterator over the errors of a [`ChainError`].
pub struct Errors<'a> {
    chain: Option<&'a ChainError>,
    last: Option<&'a Error>,
}

impl<'a> Iterator for Errors<'a> {
    type Item = &'a Error;

    fn next(&mut self) -> Option<&'a Error> {
        let Some(chain) = self.chain else {
            return self.last.take();
        };

        match chain.rest.downcast_ref::<ChainError>() {
            Some(rest) => self.chain = Some(rest),
            None => {
                self.chain = None;
                self.last = Some(&chain.rest);
            }
        }

        Some(&chain.head)
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !f.alternate() {
            return fmt::Display::fmt(&self.head, f);
        }

        write!(f, "chain(len={}):", self.len)?;
        for (i, err) in self.errors().enumerate() {
            let lines = lines::indent(lines::lines(&format!("{err:#}")), SUB_ITEM, 1);
            write!(f, "\n{SUB_ITEM}[{i}] {}", lines[0])?;
            for line in &lines[1..] {
                write!(f, "\n{line}")?;
            }
        }
        Ok(())
    }
}

impl StdError for ChainError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.rest.as_dyn())
    }
}

impl Serialize for ChainError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let errs: Vec<&Error> = self.errors().collect();

        let mut state = serializer.serialize_struct("ChainError", 3)?;
        state.serialize_field("type", self.head.type_name())?;
        state.serialize_field("err", &self.head)?;
        state.serialize_field("chain", &errs)?;
        state.end()
    }
}

// ── Constructors ──────────────────────────────────────────────────

/// Combine errors into a chain, oldest first.
///
/// `None`s are dropped and nested chains are spliced in. Zero survivors
/// give `None`, one survivor is returned as is.
///
/// ```
/// use oops::{chain, ChainError, Error};
///
/// let e0 = Error::msg("0");
/// let e1 = Error::msg("1");
///
/// assert!(chain([None, None]).is_none());
/// assert_eq!(chain([None, Some(e0.clone())]), Some(e0.clone()));
///
/// let both = chain([e0, e1]).unwrap();
/// assert_eq!(both.downcast_ref::<ChainError>().unwrap().len(), 2);
/// ```
pub fn chain<I>(errs: I) -> Option<Error>
where
    I: IntoIterator,
    I::Item: Into<Option<Error>>,
{
    let mut flat: Vec<Error> = Vec::new();
    for err in errs.into_iter().filter_map(Into::<Option<Error>>::into) {
        match err.downcast_ref::<ChainError>() {
            Some(peer) => flat.extend(peer.errors().cloned()),
            None => flat.push(err),
        }
    }

    let mut survivors = flat.into_iter().rev();
    let last = survivors.next()?;

    Some(survivors.fold(last, |rest, head| {
        let len = 1 + rest.downcast_ref::<ChainError>().map_or(1, ChainError::len);
        Error::json(ChainError { head, rest, len })
    }))
}

/// `*target = chain(target, errs...)`.
///
/// Meant for cleanup paths that must not lose the primary error:
///
/// ```
/// use oops::{chain_into, Error};
///
/// fn close() -> Option<Error> {
///     Some(Error::msg("close failed"))
/// }
///
/// let mut err = Some(Error::msg("write failed"));
/// chain_into(&mut err, [close()]);
/// assert_eq!(err.unwrap().to_string(), "write failed");
/// ```
pub fn chain_into<I>(target: &mut Option<Error>, errs: I)
where
    I: IntoIterator,
    I::Item: Into<Option<Error>>,
{
    let head = target.take();
    *target = chain(std::iter::once(head).chain(errs.into_iter().map(Into::<Option<Error>>::into)));
}
