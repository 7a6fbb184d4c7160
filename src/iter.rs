use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::uninit;
use crate::{Allocator, Global, GrowBuf};

/// Owning iterator over the values of a `GrowBuf`.
///
/// Values not yet yielded are dropped together with the iterator, which then
/// returns the storage to the allocator.
pub struct IntoIter<T, A: Allocator = Global> {
    buf: NonNull<T>,
    cap: usize,
    alloc: A,
    front: usize,
    back: usize,
    _owns: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send> Send for IntoIter<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for IntoIter<T, A> {}

impl<T, A: Allocator> IntoIter<T, A> {
    /// Values not yet yielded.
    pub fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.buf.as_ptr().add(self.front), self.back - self.front) }
    }
}

impl<T, A: Allocator> IntoIterator for GrowBuf<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        let (buf, len, cap, alloc) = self.into_raw_parts();
        IntoIter {
            buf,
            cap,
            alloc,
            front: 0,
            back: len,
            _owns: PhantomData,
        }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }
        let item = unsafe { ptr::read(self.buf.as_ptr().add(self.front)) };
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(unsafe { ptr::read(self.buf.as_ptr().add(self.back)) })
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {
    fn len(&self) -> usize {
        self.back - self.front
    }
}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

impl<T, A: Allocator> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        unsafe {
            uninit::destroy_range(self.buf.as_ptr().add(self.front), self.back - self.front);
            GrowBuf::<T, A>::release_slots(&self.alloc, self.buf, self.cap);
        }
    }
}

impl<T, A: Allocator> std::fmt::Debug for IntoIter<T, A> where T: std::fmt::Debug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

#[cfg(test)]
mod into_iter_tests {
    use crate::dropflag::{counters, Tracked};
    use crate::{GrowBuf, Memory};

    #[test]
    fn yields_values_in_order() {
        let buf = GrowBuf::from_slice(&[1, 2, 3, 4]).unwrap();
        let mut iter = buf.into_iter();
        assert_eq!(4, iter.len());
        assert_eq!(Some(1), iter.next());
        assert_eq!(Some(4), iter.next_back());
        assert_eq!(&[2, 3], iter.as_slice());
        assert_eq!(vec![2, 3], iter.collect::<Vec<_>>());
    }

    #[test]
    fn reverse_iteration() {
        let buf = GrowBuf::from_slice(&["a", "b", "c"]).unwrap();
        assert_eq!(vec!["c", "b", "a"], buf.into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn drops_remaining_values_and_returns_memory() {
        let memory = Memory::new();
        let flag = counters();
        let buf = GrowBuf::from_exact_iter_in((0..10).map(|v| Tracked::new(v, &flag)), memory.clone()).unwrap();

        let mut iter = buf.into_iter();
        let first = iter.next().unwrap();
        let last = iter.next_back().unwrap();
        assert_eq!((0, 9), (first.value, last.value));
        assert_eq!(0, flag.borrow().drops);

        drop(iter);
        assert_eq!(8, flag.borrow().drops);
        assert_eq!(0, memory.live_regions());

        drop((first, last));
        assert_eq!(10, flag.borrow().drops);
    }

    #[test]
    fn exhausted_iterator_stays_exhausted() {
        let mut iter = GrowBuf::from_slice(&[1u8]).unwrap().into_iter();
        assert_eq!(Some(1), iter.next());
        assert_eq!(None, iter.next());
        assert_eq!(None, iter.next_back());
        assert_eq!(0, iter.len());
    }
}
