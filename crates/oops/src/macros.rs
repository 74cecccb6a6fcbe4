/// Construct a traced message error from a format string.
///
/// Shorthand for `oops::new(format!(...))`; the trace starts at the macro
/// call site.
///
/// ```
/// let path = "/etc/app.toml";
/// let err = oops::oops!("cannot read {path}");
/// assert_eq!(err.to_string(), "cannot read /etc/app.toml");
/// ```
#[macro_export]
macro_rules! oops {
    ($($arg:tt)+) => {
        $crate::new(::std::format!($($arg)+))
    };
}

/// Return early with a traced message error unless a condition holds.
///
/// The error is converted with `Into`, so the enclosing function may return
/// any error type that an [`Error`](crate::Error) converts into.
///
/// # Forms
///
/// ```
/// use oops::{ensure, Error};
///
/// fn check(len: usize) -> Result<(), Error> {
///     // Default message: "condition failed: len > 0"
///     ensure!(len > 0);
///
///     // Custom message:
///     ensure!(len <= 8, "too long: {len} > 8");
///     Ok(())
/// }
///
/// assert_eq!(check(0).unwrap_err().to_string(), "condition failed: len > 0");
/// assert_eq!(check(9).unwrap_err().to_string(), "too long: 9 > 8");
/// assert!(check(3).is_ok());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr $(,)?) => {
        if !$cond {
            return ::std::result::Result::Err(::std::convert::Into::into($crate::new(
                ::std::concat!("condition failed: ", ::std::stringify!($cond)),
            )));
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return ::std::result::Result::Err(::std::convert::Into::into($crate::oops!($($arg)+)));
        }
    };
}
