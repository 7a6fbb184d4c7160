use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::AllocError;

#[cfg_attr(not(feature = "logging"), allow(dead_code))]
const MEMORY_TARGET: &str = "growbuf::memory";

/// Raw memory source for `GrowBuf`.
///
/// The allocator hands out uninitialized regions and takes them back; it never
/// constructs or destroys values.
///
/// # Safety
///
/// A successful `allocate` must return memory valid for reads and writes of
/// `layout.size()` bytes, aligned to `layout.align()`, and not aliased by any
/// other live region until it is passed to `deallocate`.
pub unsafe trait Allocator {
    /// Acquires a region for `layout`. `layout.size()` is never zero.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a region.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator (or a clone of it)
    /// with the same `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process-wide allocator behind `std::alloc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Global;

unsafe impl Allocator for Global {
    #[inline(always)]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert_ne!(0, layout.size(), "zero-sized allocation");
        NonNull::new(unsafe { std::alloc::alloc(layout) }).ok_or(AllocError)
    }

    #[inline(always)]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout)
    }
}

unsafe impl<'a, A: Allocator + ?Sized> Allocator for &'a A {
    #[inline(always)]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline(always)]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }
}

struct MemoryInstance {
    limit_bytes: Option<usize>,
    fail_after: Option<usize>,
    live_bytes: usize,
    live_regions: usize,
    allocations: usize,
}

impl MemoryInstance {
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if let Some(remaining) = self.fail_after {
            if remaining == 0 {
                debug!(target: MEMORY_TARGET, "-- refuse {} bytes, allocation budget spent", layout.size());
                return Err(AllocError);
            }
        }

        if let Some(limit) = self.limit_bytes {
            let wanted = self.live_bytes.checked_add(layout.size()).ok_or(AllocError)?;
            if wanted > limit {
                debug!(target: MEMORY_TARGET, "-- refuse {} bytes, {} of {} in use", layout.size(), self.live_bytes, limit);
                return Err(AllocError);
            }
        }

        let ptr = Global.allocate(layout)?;
        if let Some(remaining) = self.fail_after.as_mut() {
            *remaining -= 1;
        }
        self.live_bytes += layout.size();
        self.live_regions += 1;
        self.allocations += 1;

        trace!(target: MEMORY_TARGET, "-- take   region of size {}", layout.size());

        Ok(ptr)
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<u8>, layout: Layout) {
        debug_assert!(self.live_regions > 0, "deallocate without live regions");
        debug_assert!(self.live_bytes >= layout.size(), "deallocate more bytes than live");

        trace!(target: MEMORY_TARGET, "-- return region of size {}", layout.size());

        Global.deallocate(ptr, layout);
        self.live_bytes -= layout.size();
        self.live_regions -= 1;
    }
}

/// Accounting allocator with optional limits.
///
/// Clones share the same accounting, so a `Memory` handle kept by the caller
/// observes every region a buffer acquires and releases through its own clone.
#[derive(Clone)]
pub struct Memory {
    shared: Arc<Mutex<MemoryInstance>>,
}

impl Memory {
    /// Unlimited accounting allocator.
    pub fn new() -> Memory {
        MemoryBuilder::new().build()
    }

    pub fn builder() -> MemoryBuilder {
        MemoryBuilder::new()
    }

    #[inline(always)]
    fn lock(&self) -> MutexGuard<'_, MemoryInstance> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bytes currently handed out and not yet returned.
    pub fn live_bytes(&self) -> usize {
        self.lock().live_bytes
    }

    /// Regions currently handed out and not yet returned.
    pub fn live_regions(&self) -> usize {
        self.lock().live_regions
    }

    /// Successful allocations since creation.
    pub fn allocations(&self) -> usize {
        self.lock().allocations
    }

    /// Replaces the number of further allocations that may succeed.
    /// `None` lifts the restriction.
    pub fn set_fail_after(&self, fail_after: Option<usize>) {
        self.lock().fail_after = fail_after;
    }

    /// Replaces the live byte limit. `None` lifts the restriction.
    pub fn set_limit_bytes(&self, limit_bytes: Option<usize>) {
        self.lock().limit_bytes = limit_bytes;
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let md = self.lock();
        f.debug_struct("Memory")
            .field("live_bytes", &md.live_bytes)
            .field("live_regions", &md.live_regions)
            .field("allocations", &md.allocations)
            .field("limit_bytes", &md.limit_bytes)
            .field("fail_after", &md.fail_after)
            .finish()
    }
}

unsafe impl Allocator for Memory {
    #[inline(always)]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.lock().allocate(layout)
    }

    #[inline(always)]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.lock().deallocate(ptr, layout)
    }
}

/// Configures a `Memory`.
#[derive(Debug, Default, Clone)]
pub struct MemoryBuilder {
    limit_bytes: Option<usize>,
    fail_after: Option<usize>,
}

impl MemoryBuilder {
    pub fn new() -> MemoryBuilder {
        MemoryBuilder::default()
    }

    /// Refuse any request that would raise live bytes above `limit`.
    pub fn limit_bytes(mut self, limit: usize) -> MemoryBuilder {
        self.limit_bytes = Some(limit);
        self
    }

    /// Let `count` allocations succeed, then refuse every further one.
    pub fn fail_after(mut self, count: usize) -> MemoryBuilder {
        self.fail_after = Some(count);
        self
    }

    pub fn build(self) -> Memory {
        Memory {
            shared: Arc::new(Mutex::new(MemoryInstance {
                limit_bytes: self.limit_bytes,
                fail_after: self.fail_after,
                live_bytes: 0,
                live_regions: 0,
                allocations: 0,
            })),
        }
    }
}
