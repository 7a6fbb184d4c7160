//! Construction and destruction of values in raw, allocated-but-uninitialized
//! memory.
//!
//! Every constructing routine writes front to back and keeps count of what it
//! has written. If producing the next value fails (a panicking `Clone`, a
//! panicking iterator, or an `Err` from a fallible producer), the values
//! already written are destroyed before the failure continues, so the region
//! is left uninitialized again and can simply be released by the caller.

use std::ptr;

/// Initialized prefix of a raw region under construction.
///
/// Dropping the guard destroys the prefix; `finish` hands it over instead.
pub(crate) struct InitGuard<T> {
    start: *mut T,
    initialized: usize,
}

impl<T> InitGuard<T> {
    /// # Safety
    ///
    /// `start` must point to a region with room for every value later passed
    /// to `write_next`.
    #[inline(always)]
    pub unsafe fn new(start: *mut T) -> InitGuard<T> {
        InitGuard { start, initialized: 0 }
    }

    /// # Safety
    ///
    /// The slot after the current prefix must be inside the region.
    #[inline(always)]
    pub unsafe fn write_next(&mut self, value: T) {
        ptr::write(self.start.add(self.initialized), value);
        self.initialized += 1;
    }

    /// Stops tracking and returns the number of initialized values, which are
    /// now owned by the caller.
    #[inline(always)]
    pub fn finish(self) -> usize {
        let initialized = self.initialized;
        std::mem::forget(self);
        initialized
    }
}

impl<T> Drop for InitGuard<T> {
    fn drop(&mut self) {
        unsafe { destroy_range(self.start, self.initialized) };
    }
}

/// Writes `n` clones of `value` starting at `dst`.
///
/// # Safety
///
/// `dst` must have room for `n` uninitialized values.
pub(crate) unsafe fn fill_n<T: Clone>(dst: *mut T, n: usize, value: &T) {
    let mut guard = InitGuard::new(dst);
    for _ in 0..n {
        guard.write_next(value.clone());
    }
    guard.finish();
}

/// Writes clones of `src`, in order, starting at `dst`.
///
/// # Safety
///
/// `dst` must have room for `src.len()` uninitialized values and must not
/// overlap `src`.
pub(crate) unsafe fn clone_from_slice<T: Clone>(dst: *mut T, src: &[T]) {
    let mut guard = InitGuard::new(dst);
    for item in src {
        guard.write_next(item.clone());
    }
    guard.finish();
}

/// Moves at most `limit` items out of `iter` into `dst` and returns how many
/// were written. Items past `limit` are left in the iterator.
///
/// # Safety
///
/// `dst` must have room for `limit` uninitialized values.
pub(crate) unsafe fn write_from_iter<T, I>(dst: *mut T, limit: usize, iter: I) -> usize
    where I: Iterator<Item=T>
{
    let mut guard = InitGuard::new(dst);
    for item in iter.take(limit) {
        guard.write_next(item);
    }
    guard.finish()
}

/// Writes `f(0)..f(n)` starting at `dst`, stopping at the first error.
///
/// # Safety
///
/// `dst` must have room for `n` uninitialized values.
pub(crate) unsafe fn try_fill_with<T, E, F>(dst: *mut T, n: usize, mut f: F) -> Result<(), E>
    where F: FnMut(usize) -> Result<T, E>
{
    let mut guard = InitGuard::new(dst);
    for index in 0..n {
        guard.write_next(f(index)?);
    }
    guard.finish();
    Ok(())
}

/// Moves `n` values from `src` to `dst`. Afterwards `src` is logically
/// uninitialized and must not be dropped.
///
/// # Safety
///
/// `src` must hold `n` initialized values, `dst` must have room for `n`
/// values, and the regions must not overlap.
#[inline(always)]
pub(crate) unsafe fn move_range<T>(src: *const T, dst: *mut T, n: usize) {
    ptr::copy_nonoverlapping(src, dst, n);
}

/// Drops `n` values in place starting at `start`.
///
/// # Safety
///
/// `start` must hold `n` initialized values that are not used afterwards.
#[inline(always)]
pub(crate) unsafe fn destroy_range<T>(start: *mut T, n: usize) {
    ptr::drop_in_place(ptr::slice_from_raw_parts_mut(start, n));
}
