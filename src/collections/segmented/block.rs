use std::fmt::{self, Debug, Formatter};
use std::mem;
use std::ptr::NonNull;

use crate::collections::raw::{OutOfMemory, RawBlock};

/// The number of element slots in every block of a
/// [`SegmentedVector`](super::SegmentedVector).
pub const BLOCK_CAP: usize = 256;

/// One link of the chain. The data never moves once allocated.
///
/// Blocks are owned by their [`SegmentedVector`](super::SegmentedVector) through the pointers
/// returned by [`allocate`](Block::allocate), and are only freed by [`free`](Block::free).
pub(crate) struct Block {
    pub fill: u16,
    pub next: Option<NonNull<Block>>,
    pub data: RawBlock,
}

impl Block {
    pub fn allocate(elem_size: usize) -> Result<NonNull<Block>, OutOfMemory> {
        let size = Block::data_size(elem_size)?;

        let block = Box::new(Block {
            fill: 0,
            next: None,
            data: RawBlock::allocate(size)?,
        });
        Ok(NonNull::from(Box::leak(block)))
    }

    /// Frees a block, returning the link to the one after it.
    ///
    /// # Safety
    /// `block` must have come from [`allocate`](Block::allocate), must not have been freed already
    /// and must not be used afterwards.
    pub unsafe fn free(block: NonNull<Block>) -> Option<NonNull<Block>> {
        // SAFETY: Guaranteed by the caller. The pointer came from Box::leak.
        let block = unsafe { Box::from_raw(block.as_ptr()) };
        block.next
    }

    /// Returns the bytes of data held by a block of `elem_size`-byte elements.
    pub fn data_size(elem_size: usize) -> Result<usize, OutOfMemory> {
        elem_size.checked_mul(BLOCK_CAP).ok_or(OutOfMemory { size: usize::MAX })
    }

    /// Returns the total heap footprint of `rows` blocks, or [`None`] if it can't be addressed.
    pub fn chain_size(rows: usize, elem_size: usize) -> Option<usize> {
        let per_block = Block::data_size(elem_size).ok()?.checked_add(mem::size_of::<Block>())?;
        rows.checked_mul(per_block).filter(|size| *size <= isize::MAX as usize)
    }

    pub fn slot(&self, col: usize, elem_size: usize) -> &[u8] {
        &self.data.as_bytes()[col * elem_size..(col + 1) * elem_size]
    }

    pub fn slot_mut(&mut self, col: usize, elem_size: usize) -> &mut [u8] {
        &mut self.data.as_bytes_mut()[col * elem_size..(col + 1) * elem_size]
    }
}

/// A borrowed view of a single block, see
/// [`SegmentedVector::blocks`](super::SegmentedVector::blocks).
#[derive(Clone, Copy)]
pub struct BlockRef<'a> {
    pub(crate) block: &'a Block,
    pub(crate) elem_size: usize,
}

impl<'a> BlockRef<'a> {
    /// Returns the number of committed elements in the block.
    pub fn fill(&self) -> usize {
        self.block.fill as usize
    }

    /// Returns the bytes of the committed elements, in order.
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.block.data.as_bytes()[..self.fill() * self.elem_size]
    }

    /// Returns the address of the block's first slot, which stays the same for the block's whole
    /// life.
    pub fn as_ptr(&self) -> *const u8 {
        self.block.data.as_ptr()
    }
}

impl Debug for BlockRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("fill", &self.fill())
            .field("ptr", &self.as_ptr())
            .finish()
    }
}
