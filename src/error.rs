use thiserror::Error;

/// Failure reported by an `Allocator` that could not satisfy a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("memory allocation failed")]
pub struct AllocError;

/// Errors returned by `GrowBuf` operations.
///
/// A failed operation leaves the buffer exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufError {
    #[error("failed to allocate {bytes} bytes")]
    AllocationFailure { bytes: usize },
    #[error("requested capacity {requested} exceeds max_size {max}")]
    LengthError { requested: usize, max: usize },
    #[error("index {index} is out of range for buffer of length {len}")]
    OutOfRange { index: usize, len: usize },
}
