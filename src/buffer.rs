use std::alloc::Layout;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::ptr::{self, NonNull};
use std::slice::{self, SliceIndex};

use crate::uninit;
use crate::{Allocator, BufError, Global};

/// Capacity requested by default construction, and the floor for fill and
/// range construction.
pub const DEFAULT_CAPACITY: usize = 16;

#[cfg_attr(not(feature = "logging"), allow(dead_code))]
const BUFFER_TARGET: &str = "growbuf::buffer";

/// Growable contiguous buffer.
///
/// The buffer owns one region of `capacity` slots obtained from its allocator.
/// The first `len` slots hold live values, the rest is uninitialized and never
/// reachable through the public API. Every capacity change moves the live
/// values into a freshly allocated region and releases the old one; when the
/// new region can not be obtained, the buffer is left exactly as it was.
///
/// Moving values in Rust is a bitwise copy that can not fail, so capacity
/// changes either fully succeed or change nothing.
pub struct GrowBuf<T, A: Allocator = Global> {
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
    alloc: A,
    _owns: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send> Send for GrowBuf<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for GrowBuf<T, A> {}

impl<T> GrowBuf<T> {
    /// Buffer with room for `DEFAULT_CAPACITY` values, or an empty buffer
    /// without storage if that much memory is not available.
    pub fn new() -> GrowBuf<T> {
        GrowBuf::new_in(Global)
    }

    /// Buffer without storage.
    pub fn empty() -> GrowBuf<T> {
        GrowBuf::empty_in(Global)
    }

    /// Buffer with room for exactly `capacity` values.
    pub fn with_capacity(capacity: usize) -> Result<GrowBuf<T>, BufError> {
        GrowBuf::with_capacity_in(capacity, Global)
    }

    /// `n` clones of `value`.
    pub fn from_elem(n: usize, value: &T) -> Result<GrowBuf<T>, BufError> where T: Clone {
        GrowBuf::from_elem_in(n, value, Global)
    }

    /// `n` default values.
    pub fn with_len(n: usize) -> Result<GrowBuf<T>, BufError> where T: Default {
        GrowBuf::with_len_in(n, Global)
    }

    /// Clones of `items`, in order.
    pub fn from_slice(items: &[T]) -> Result<GrowBuf<T>, BufError> where T: Clone {
        GrowBuf::from_slice_in(items, Global)
    }

    /// Values moved out of `iter`, in order.
    pub fn from_exact_iter<I>(iter: I) -> Result<GrowBuf<T>, BufError>
        where I: IntoIterator<Item=T>, I::IntoIter: ExactSizeIterator
    {
        GrowBuf::from_exact_iter_in(iter, Global)
    }

    /// Values `f(0)..f(n)`, stopping at the first error.
    pub fn try_from_fn<E, F>(n: usize, f: F) -> Result<GrowBuf<T>, E>
        where F: FnMut(usize) -> Result<T, E>, E: From<BufError>
    {
        GrowBuf::try_from_fn_in(n, Global, f)
    }
}

impl<T, A: Allocator> GrowBuf<T, A> {
    const MAX_SIZE: usize = if mem::size_of::<T>() == 0 {
        usize::MAX
    } else {
        isize::MAX as usize / mem::size_of::<T>()
    };

    #[inline(always)]
    fn is_zst() -> bool {
        mem::size_of::<T>() == 0
    }

    /// Obtains a region of exactly `count` slots. Requests that occupy no
    /// bytes never reach the allocator.
    fn allocate_slots(alloc: &A, count: usize) -> Result<NonNull<T>, BufError> {
        if count > Self::MAX_SIZE {
            return Err(BufError::LengthError { requested: count, max: Self::MAX_SIZE });
        }
        if count == 0 || Self::is_zst() {
            return Ok(NonNull::dangling());
        }
        let layout = Layout::array::<T>(count)
            .map_err(|_| BufError::LengthError { requested: count, max: Self::MAX_SIZE })?;
        alloc.allocate(layout)
            .map(|ptr| ptr.cast())
            .map_err(|_| BufError::AllocationFailure { bytes: layout.size() })
    }

    /// # Safety
    ///
    /// `ptr` must come from `allocate_slots` on `alloc` with the same `count`.
    pub(crate) unsafe fn release_slots(alloc: &A, ptr: NonNull<T>, count: usize) {
        if count == 0 || Self::is_zst() {
            return;
        }
        let layout = Layout::from_size_align_unchecked(mem::size_of::<T>() * count, mem::align_of::<T>());
        alloc.deallocate(ptr.cast(), layout);
    }

    /// Buffer without storage; no allocation takes place.
    pub fn empty_in(alloc: A) -> GrowBuf<T, A> {
        GrowBuf {
            ptr: NonNull::dangling(),
            len: 0,
            cap: 0,
            alloc,
            _owns: PhantomData,
        }
    }

    /// Attempts to reserve `DEFAULT_CAPACITY` slots. Allocation failure is not
    /// reported: the buffer is returned empty and without storage instead.
    pub fn new_in(alloc: A) -> GrowBuf<T, A> {
        match Self::allocate_slots(&alloc, DEFAULT_CAPACITY) {
            Ok(ptr) => GrowBuf {
                ptr,
                len: 0,
                cap: DEFAULT_CAPACITY,
                alloc,
                _owns: PhantomData,
            },
            Err(_) => GrowBuf::empty_in(alloc),
        }
    }

    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<GrowBuf<T, A>, BufError> {
        let ptr = Self::allocate_slots(&alloc, capacity)?;
        Ok(GrowBuf {
            ptr,
            len: 0,
            cap: capacity,
            alloc,
            _owns: PhantomData,
        })
    }

    #[inline(always)]
    fn with_floor_in(len: usize, alloc: A) -> Result<GrowBuf<T, A>, BufError> {
        GrowBuf::with_capacity_in(len.max(DEFAULT_CAPACITY), alloc)
    }

    /// Buffer of `n` clones of `value` with capacity `max(16, n)`.
    ///
    /// If a clone panics, the clones made so far are dropped and the region is
    /// released before the panic continues.
    pub fn from_elem_in(n: usize, value: &T, alloc: A) -> Result<GrowBuf<T, A>, BufError> where T: Clone {
        let mut buf = GrowBuf::with_floor_in(n, alloc)?;
        unsafe { uninit::fill_n(buf.ptr.as_ptr(), n, value) };
        buf.len = n;
        Ok(buf)
    }

    pub fn with_len_in(n: usize, alloc: A) -> Result<GrowBuf<T, A>, BufError> where T: Default {
        let mut buf = GrowBuf::with_floor_in(n, alloc)?;
        buf.len = unsafe { uninit::write_from_iter(buf.ptr.as_ptr(), n, std::iter::repeat_with(T::default)) };
        Ok(buf)
    }

    /// Buffer of clones of `items` with capacity `max(16, items.len())`.
    pub fn from_slice_in(items: &[T], alloc: A) -> Result<GrowBuf<T, A>, BufError> where T: Clone {
        let mut buf = GrowBuf::with_floor_in(items.len(), alloc)?;
        unsafe { uninit::clone_from_slice(buf.ptr.as_ptr(), items) };
        buf.len = items.len();
        Ok(buf)
    }

    /// Buffer of the values of `iter` with capacity `max(16, iter.len())`.
    ///
    /// An iterator that ends early produces a shorter buffer; values past the
    /// announced length are not taken.
    pub fn from_exact_iter_in<I>(iter: I, alloc: A) -> Result<GrowBuf<T, A>, BufError>
        where I: IntoIterator<Item=T>, I::IntoIter: ExactSizeIterator
    {
        let iter = iter.into_iter();
        let announced = iter.len();
        let mut buf = GrowBuf::with_floor_in(announced, alloc)?;
        buf.len = unsafe { uninit::write_from_iter(buf.ptr.as_ptr(), announced, iter) };
        Ok(buf)
    }

    /// Buffer of `f(0)..f(n)` with capacity `max(16, n)`.
    ///
    /// The first error drops the values built so far, releases the region and
    /// is returned. Allocation errors reach the caller through `E: From<BufError>`.
    pub fn try_from_fn_in<E, F>(n: usize, alloc: A, f: F) -> Result<GrowBuf<T, A>, E>
        where F: FnMut(usize) -> Result<T, E>, E: From<BufError>
    {
        let mut buf = GrowBuf::with_floor_in(n, alloc)?;
        unsafe { uninit::try_fill_with(buf.ptr.as_ptr(), n, f)? };
        buf.len = n;
        Ok(buf)
    }

    /// Moves the contents out, leaving `self` empty and without storage.
    pub fn take(&mut self) -> GrowBuf<T, A> where A: Clone {
        let empty = GrowBuf::empty_in(self.alloc.clone());
        mem::replace(self, empty)
    }

    /// Deep copy into newly allocated storage of capacity `max(16, len)`.
    pub fn try_clone(&self) -> Result<GrowBuf<T, A>, BufError> where T: Clone, A: Clone {
        GrowBuf::from_slice_in(self.as_slice(), self.alloc.clone())
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Largest capacity that can be requested for `T`.
    #[inline(always)]
    pub fn max_size(&self) -> usize {
        Self::MAX_SIZE
    }

    /// Ensures `capacity() >= n`. Never shrinks.
    ///
    /// When growing, the new capacity is exactly `n`.
    pub fn reserve(&mut self, n: usize) -> Result<(), BufError> {
        if self.cap >= n {
            return Ok(());
        }
        if n > Self::MAX_SIZE {
            return Err(BufError::LengthError { requested: n, max: Self::MAX_SIZE });
        }
        self.relocate(n)
    }

    /// Reduces capacity to `len()`. A buffer without values gives up its
    /// storage entirely.
    pub fn shrink_to_fit(&mut self) -> Result<(), BufError> {
        if self.cap == self.len {
            return Ok(());
        }
        self.relocate(self.len)
    }

    /// Moves the live values into a region of exactly `new_cap` slots and
    /// releases the old region.
    fn relocate(&mut self, new_cap: usize) -> Result<(), BufError> {
        debug_assert!(new_cap >= self.len, "relocate below len");
        let new_ptr = Self::allocate_slots(&self.alloc, new_cap)?;

        trace!(target: BUFFER_TARGET, "relocate {} values, capacity {} -> {}", self.len, self.cap, new_cap);

        unsafe {
            uninit::move_range(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
            Self::release_slots(&self.alloc, self.ptr, self.cap);
        }
        self.ptr = new_ptr;
        self.cap = new_cap;
        Ok(())
    }

    /// Makes room for `required` values, at least doubling the capacity.
    fn grow_amortized(&mut self, required: usize) -> Result<(), BufError> {
        if required <= self.cap {
            return Ok(());
        }
        let amortized = self.cap.saturating_mul(2)
            .max(DEFAULT_CAPACITY)
            .min(Self::MAX_SIZE)
            .max(required);
        self.reserve(amortized)
    }

    /// Appends `value`, growing the storage when full.
    ///
    /// On failure `value` is dropped and the buffer is unchanged.
    pub fn push(&mut self, value: T) -> Result<(), BufError> {
        if self.len == self.cap {
            let required = self.len.checked_add(1)
                .ok_or(BufError::LengthError { requested: usize::MAX, max: Self::MAX_SIZE })?;
            self.grow_amortized(required)?;
        }
        unsafe { ptr::write(self.ptr.as_ptr().add(self.len), value) };
        self.len += 1;
        Ok(())
    }

    /// Appends clones of `items`.
    ///
    /// Storage is grown once up front. If a clone panics, the values appended
    /// before it stay in the buffer.
    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<(), BufError> where T: Clone {
        let required = self.len.checked_add(items.len())
            .ok_or(BufError::LengthError { requested: usize::MAX, max: Self::MAX_SIZE })?;
        self.grow_amortized(required)?;
        for item in items {
            unsafe { ptr::write(self.ptr.as_ptr().add(self.len), item.clone()) };
            self.len += 1;
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            Some(unsafe { ptr::read(self.ptr.as_ptr().add(self.len)) })
        }
    }

    /// Drops the values past `len`. Capacity is kept.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = self.len - len;
        self.len = len;
        unsafe { uninit::destroy_range(self.ptr.as_ptr().add(len), tail) };
    }

    /// Drops every value. Capacity is kept.
    pub fn clear(&mut self) {
        self.truncate(0)
    }

    /// Checked access.
    pub fn at(&self, index: usize) -> Result<&T, BufError> {
        let len = self.len;
        self.as_slice().get(index).ok_or(BufError::OutOfRange { index, len })
    }

    /// Checked mutable access.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, BufError> {
        let len = self.len;
        self.as_mut_slice().get_mut(index).ok_or(BufError::OutOfRange { index, len })
    }

    /// # Safety
    ///
    /// `index` must be less than `len()`. Only debug builds check it.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.len, "index {} out of bounds for length {}", index, self.len);
        &*self.ptr.as_ptr().add(index)
    }

    /// # Safety
    ///
    /// `index` must be less than `len()`. Only debug builds check it.
    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.len, "index {} out of bounds for length {}", index, self.len);
        &mut *self.ptr.as_ptr().add(index)
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Releases ownership of the storage without dropping anything.
    pub(crate) fn into_raw_parts(self) -> (NonNull<T>, usize, usize, A) {
        let me = mem::ManuallyDrop::new(self);
        let alloc = unsafe { ptr::read(&me.alloc) };
        (me.ptr, me.len, me.cap, alloc)
    }
}

impl<T, A: Allocator> Drop for GrowBuf<T, A> {
    fn drop(&mut self) {
        unsafe {
            uninit::destroy_range(self.ptr.as_ptr(), self.len);
            Self::release_slots(&self.alloc, self.ptr, self.cap);
        }
    }
}

impl<T> Default for GrowBuf<T> {
    fn default() -> Self {
        GrowBuf::new()
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for GrowBuf<T, A> {
    /// Panics if the copy can not be allocated; use `try_clone` to handle that.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(buf) => buf,
            Err(e) => panic!("GrowBuf::clone: {}", e),
        }
    }
}

impl<T, A: Allocator> Deref for GrowBuf<T, A> {
    type Target = [T];

    #[inline(always)]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for GrowBuf<T, A> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: Allocator, I: SliceIndex<[T]>> Index<I> for GrowBuf<T, A> {
    type Output = I::Output;

    #[inline(always)]
    fn index(&self, index: I) -> &Self::Output {
        Index::index(self.as_slice(), index)
    }
}

impl<T, A: Allocator, I: SliceIndex<[T]>> IndexMut<I> for GrowBuf<T, A> {
    #[inline(always)]
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        IndexMut::index_mut(self.as_mut_slice(), index)
    }
}

impl<T, A: Allocator> std::fmt::Debug for GrowBuf<T, A> where T: std::fmt::Debug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a GrowBuf<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut GrowBuf<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}
