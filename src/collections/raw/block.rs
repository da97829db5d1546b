use std::alloc::{self, Layout};
use std::fmt::{self, Debug, Formatter};
use std::ptr::{self, NonNull};
use std::slice;

#[doc(inline)]
pub use crate::util::error::OutOfMemory;

/// The alignment of every block handed out by [`RawBlock`].
pub const BLOCK_ALIGN: usize = 32;

/// A single zero-initialized heap allocation, measured in bytes.
///
/// RawBlock is the only type in this crate that talks to the global allocator. Every block is
/// zero-filled when it is allocated and every byte added by [`reallocate`](RawBlock::reallocate)
/// is zeroed too, so containers can treat fresh storage as holding zero-valued elements.
///
/// Releasing a block consumes it (or happens when it is dropped), so a block can never be released
/// twice or used after release.
///
/// A block of size 0 is never allocated, it holds a dangling pointer instead.
pub struct RawBlock {
    pub(crate) ptr: NonNull<u8>,
    pub(crate) size: usize,
}

impl RawBlock {
    /// Creates a block of size 0 without allocating.
    pub const fn dangling() -> RawBlock {
        RawBlock {
            ptr: NonNull::dangling(),
            size: 0,
        }
    }

    /// Allocates a new zero-filled block of `size` bytes.
    ///
    /// # Errors
    /// Returns [`OutOfMemory`] if the size can't be laid out or the allocator fails. The failure is
    /// reported as is and never retried.
    pub fn allocate(size: usize) -> Result<RawBlock, OutOfMemory> {
        if size == 0 {
            return Ok(RawBlock::dangling());
        }

        let layout = Self::make_layout(size)?;

        #[cfg(test)]
        if crate::util::alloc::should_fail() {
            return Err(OutOfMemory { size });
        }

        // SAFETY: Zero-sized layouts have been guarded against.
        let raw_ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw_ptr).ok_or(OutOfMemory { size })?;

        #[cfg(test)]
        crate::util::alloc::record_allocate();
        log::trace!("allocated block of {size} bytes at {ptr:p}");

        Ok(RawBlock { ptr, size })
    }

    /// Resizes the block to `new_size` bytes, moving it if the allocator can't resize in place.
    /// Bytes past the old size are zero-filled, bytes past the new size are discarded.
    ///
    /// # Errors
    /// Returns [`OutOfMemory`] if the new size can't be laid out or the allocator fails. The block
    /// is left untouched in that case.
    pub fn reallocate(&mut self, new_size: usize) -> Result<(), OutOfMemory> {
        match (self.size, new_size) {
            (old, new) if old == new => Ok(()),
            (0, _) => {
                *self = RawBlock::allocate(new_size)?;
                Ok(())
            },
            (_, 0) => {
                drop(std::mem::replace(self, RawBlock::dangling()));
                Ok(())
            },
            (old, new) => {
                // Checked before the call so that a failure doesn't invalidate the block.
                Self::make_layout(new)?;

                #[cfg(test)]
                if crate::util::alloc::should_fail() {
                    return Err(OutOfMemory { size: new });
                }

                // SAFETY: The block was allocated in the global allocator with this same layout,
                // and the new size is non-zero and forms a valid layout with the same alignment.
                let raw_ptr = unsafe {
                    alloc::realloc(self.ptr.as_ptr(), Self::make_layout(old)?, new)
                };
                let ptr = NonNull::new(raw_ptr).ok_or(OutOfMemory { size: new })?;

                if new > old {
                    // SAFETY: The block is now valid for `new` bytes, so the tail from `old` is in
                    // bounds.
                    unsafe { ptr::write_bytes(ptr.as_ptr().add(old), 0, new - old); }
                }

                self.ptr = ptr;
                self.size = new;
                Ok(())
            },
        }
    }

    /// Releases the block. Equivalent to dropping it.
    pub fn release(self) {
        drop(self);
    }

    /// Returns the size of the block in bytes.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns true if this block doesn't own an allocation.
    pub const fn is_dangling(&self) -> bool {
        self.size == 0
    }

    /// Returns the address of the first byte of the block.
    pub const fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr().cast_const()
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: The block is valid, initialized (zero-filled on allocation) and exclusively owned
        // for `size` bytes. A dangling block is valid for 0 bytes.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: As in as_bytes, with uniqueness enforced by &mut self.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }

    fn make_layout(size: usize) -> Result<Layout, OutOfMemory> {
        Layout::from_size_align(size, BLOCK_ALIGN).map_err(|_| OutOfMemory { size })
    }
}

impl Drop for RawBlock {
    fn drop(&mut self) {
        if self.size == 0 {
            return;
        }

        // SAFETY: The block was allocated with this layout, which was valid at the time and
        // still is, as neither the size nor the alignment have changed.
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.size, BLOCK_ALIGN);
            alloc::dealloc(self.ptr.as_ptr(), layout);
        }

        #[cfg(test)]
        crate::util::alloc::record_release();
        log::trace!("released block of {} bytes at {:p}", self.size, self.ptr);
    }
}

impl Debug for RawBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBlock")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .finish()
    }
}

// SAFETY: A RawBlock uniquely owns its allocation and only hands out borrows tied to itself.
unsafe impl Send for RawBlock {}
// SAFETY: Shared access only allows reading the bytes.
unsafe impl Sync for RawBlock {}
