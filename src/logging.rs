#![allow(dead_code)]

//! Log macros that compile to nothing unless the `logging` feature is on.
//!
//! Without an explicit `target:` the records go to the `growbuf` target, so
//! that buffer internals can be filtered as one unit.

pub(crate) const DEFAULT_TARGET: &str = "growbuf";

macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::debug!(target: $target, $($arg)+);
    );
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::debug!(target: crate::logging::DEFAULT_TARGET, $($arg)+);
    )
}

macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::trace!(target: $target, $($arg)+);
    );
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::trace!(target: crate::logging::DEFAULT_TARGET, $($arg)+);
    )
}
