use crate::{Allocator, BufError, Global, GrowBuf, DEFAULT_CAPACITY};

/// Implements collect to `GrowBuf`.
pub trait GrowBufIterator: Iterator {
    fn collect_buf(self) -> Result<GrowBuf<Self::Item>, BufError>;

    fn collect_buf_in<A: Allocator>(self, alloc: A) -> Result<GrowBuf<Self::Item, A>, BufError>;

    /// Stops at the first `Err` item; the values collected so far are dropped.
    fn collect_result_buf<I, E>(self) -> Result<GrowBuf<I>, E>
        where
            Self: Iterator<Item=Result<I, E>>,
            E: From<BufError>;
}

impl<Q: Iterator> GrowBufIterator for Q {
    fn collect_buf(self) -> Result<GrowBuf<Self::Item>, BufError> {
        self.collect_buf_in(Global)
    }

    fn collect_buf_in<A: Allocator>(self, alloc: A) -> Result<GrowBuf<Self::Item, A>, BufError> {
        let (lower, _) = self.size_hint();
        let mut buf = GrowBuf::with_capacity_in(lower.max(DEFAULT_CAPACITY), alloc)?;
        for item in self {
            buf.push(item)?;
        }
        Ok(buf)
    }

    fn collect_result_buf<I, E>(self) -> Result<GrowBuf<I>, E>
        where
            Self: Iterator<Item=Result<I, E>>,
            E: From<BufError>
    {
        let (lower, _) = self.size_hint();
        let mut buf = GrowBuf::with_capacity(lower.max(DEFAULT_CAPACITY))?;
        for mi in self {
            let i = mi?;
            buf.push(i)?;
        }
        Ok(buf)
    }
}
