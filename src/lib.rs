//! Growable contiguous buffer with explicit capacity control.
//!
//! `GrowBuf` keeps its values in one region obtained from an `Allocator`.
//! Construction reserves at least `DEFAULT_CAPACITY` slots, `reserve` and
//! `shrink_to_fit` change the capacity exactly, and every fallible operation
//! returns a `BufError` while leaving the buffer as it was.

#[macro_use]
mod logging;
mod error;
mod memory;
mod uninit;
mod buffer;
mod iter;
mod traits;

pub use error::{AllocError, BufError};
pub use memory::{Allocator, Global, Memory, MemoryBuilder};
pub use buffer::{GrowBuf, DEFAULT_CAPACITY};
pub use iter::IntoIter;
pub use traits::GrowBufIterator;

#[cfg(test)]
pub mod dropflag;
