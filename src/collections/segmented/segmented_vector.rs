use std::cmp;
use std::fmt::{self, Debug, Formatter};
use std::ptr::NonNull;

use super::{Block, Blocks, Iter, BLOCK_CAP};
use crate::collections::settings::SegmentSettings;
#[doc(inline)]
pub use crate::util::error::{OutOfBound, OutOfMemory, VectorError};

/// A variable size collection of fixed-size elements, stored in a chain of blocks of
/// [`BLOCK_CAP`] elements each.
///
/// Growing a SegmentedVector appends blocks to the chain instead of reallocating, so an element
/// never moves once written, no matter how large the vector becomes. In exchange, the elements
/// aren't contiguous: index `i` lives in block `i / BLOCK_CAP`, slot `i % BLOCK_CAP`, and bulk
/// access goes block by block through [`blocks`](SegmentedVector::blocks).
///
/// Every block before the last committed one is full. Blocks reserved ahead of the length are
/// allocated and zeroed, but hold no committed elements.
///
/// # Time Complexity
/// | Method | Complexity |
/// |-|-|
/// | `get` | `O(1)` |
/// | `len` | `O(1)` |
/// | `push` | `O(1)` |
/// | `set` | `O(1)`*, `O(k)` |
///
/// \* Writing `k` blocks past the end of the chain allocates each of them.
pub struct SegmentedVector {
    head: Option<NonNull<Block>>,
    rows: Vec<NonNull<Block>>,
    elem_size: usize,
    len: usize,
    max_len: Option<usize>,
}

impl SegmentedVector {
    /// Creates a new, empty SegmentedVector of `elem_size`-byte elements, with its first block
    /// allocated.
    ///
    /// # Errors
    /// Returns [`OutOfMemory`] if the first block can't be allocated.
    pub fn new(elem_size: usize) -> Result<SegmentedVector, OutOfMemory> {
        SegmentedVector::with_settings(SegmentSettings::new(elem_size))
    }

    /// Creates a new, empty SegmentedVector from the provided settings.
    ///
    /// Blocks are reserved for the initial length (but never past the maximum length). Unless
    /// eager allocation is turned off, they are all allocated up front; otherwise only the first
    /// one is.
    ///
    /// # Errors
    /// Returns [`OutOfMemory`] if a block can't be allocated. Nothing is kept in that case.
    ///
    /// # Examples
    /// ```
    /// # use packed_vector::collections::segmented::SegmentedVector;
    /// # use packed_vector::collections::settings::SegmentSettings;
    /// let vec = SegmentedVector::with_settings(SegmentSettings::new(4).initial_len(600)).unwrap();
    /// assert_eq!(vec.block_count(), 3);
    /// assert!(vec.is_empty());
    ///
    /// let lazy = SegmentSettings::new(4).initial_len(600).eager(false);
    /// assert_eq!(SegmentedVector::with_settings(lazy).unwrap().block_count(), 1);
    /// ```
    pub fn with_settings(settings: SegmentSettings) -> Result<SegmentedVector, OutOfMemory> {
        let mut vec = SegmentedVector {
            head: None,
            rows: Vec::new(),
            elem_size: settings.elem_size,
            len: 0,
            max_len: settings.max_len,
        };

        let reserved = settings
            .max_len
            .map_or(settings.initial_len, |max| cmp::min(max, settings.initial_len));
        let blocks = if settings.eager {
            cmp::max(reserved.div_ceil(BLOCK_CAP), 1)
        } else {
            1
        };

        for _ in 0..blocks {
            vec.append_block()?;
        }
        Ok(vec)
    }

    /// Returns the number of committed elements.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the size of a single element in bytes.
    pub const fn elem_size(&self) -> usize {
        self.elem_size
    }

    /// Returns the maximum length, if one was configured.
    pub const fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    /// Returns the number of blocks in the chain, including reserved ones.
    pub fn block_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    /// Returns [`OutOfBound`] if `index` isn't less than the length. See
    /// [`get_or_extend`](SegmentedVector::get_or_extend) for the growing form.
    pub fn get(&self, index: usize) -> Result<&[u8], OutOfBound> {
        self.check_index(index)?;

        let (row, col) = Self::locate(index);
        Ok(self.block(row).slot(col, self.elem_size))
    }

    /// Returns the element at `index` mutably.
    ///
    /// # Errors
    /// Returns [`OutOfBound`] if `index` isn't less than the length.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut [u8], OutOfBound> {
        self.check_index(index)?;

        let (row, col) = Self::locate(index);
        let elem_size = self.elem_size;
        Ok(self.block_mut(row).slot_mut(col, elem_size))
    }

    /// Returns the element at `index` mutably, first extending the vector to `index + 1` elements
    /// if it is shorter. Elements added by the extension are zeroed.
    ///
    /// # Errors
    /// Returns [`OutOfBound`] if `index` is past the maximum length, or [`OutOfMemory`] if a block
    /// can't be allocated. A chain too large to address is rejected before allocating anything.
    /// Otherwise, blocks appended before the failure are kept in the chain as reserved blocks, but
    /// the length doesn't change.
    pub fn get_or_extend(&mut self, index: usize) -> Result<&mut [u8], VectorError> {
        if index >= self.len {
            let new_len = index.checked_add(1).ok_or(OutOfMemory { size: usize::MAX })?;
            self.extend_to(new_len)?;
        }

        let (row, col) = Self::locate(index);
        let elem_size = self.elem_size;
        Ok(self.block_mut(row).slot_mut(col, elem_size))
    }

    /// Writes `value` at `index`, extending the vector to `index + 1` elements if it is shorter.
    ///
    /// # Errors
    /// See [`get_or_extend`](SegmentedVector::get_or_extend).
    ///
    /// # Panics
    /// Panics if `value` isn't exactly [`elem_size`](SegmentedVector::elem_size) bytes long.
    ///
    /// # Examples
    /// ```
    /// # use packed_vector::collections::segmented::SegmentedVector;
    /// let mut vec = SegmentedVector::new(2).unwrap();
    /// vec.set(300, &[1, 2]).unwrap();
    ///
    /// assert_eq!(vec.len(), 301);
    /// assert_eq!(vec.block_count(), 2);
    /// assert_eq!(vec.get(300).unwrap(), &[1, 2]);
    /// assert_eq!(vec.get(0).unwrap(), &[0, 0]);
    /// ```
    pub fn set(&mut self, index: usize, value: &[u8]) -> Result<(), VectorError> {
        self.check_value(value);
        self.get_or_extend(index)?.copy_from_slice(value);
        Ok(())
    }

    /// Appends `value`, returning its index.
    ///
    /// # Errors
    /// See [`get_or_extend`](SegmentedVector::get_or_extend).
    ///
    /// # Panics
    /// Panics if `value` isn't exactly [`elem_size`](SegmentedVector::elem_size) bytes long.
    pub fn push(&mut self, value: &[u8]) -> Result<usize, VectorError> {
        let index = self.len;
        self.set(index, value)?;
        Ok(index)
    }

    /// Returns an iterator over the blocks of the chain, reserved blocks included.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks::new(self)
    }

    /// Returns an iterator over the committed elements, in index order.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Releases every block in the chain.
    pub fn release(self) {
        drop(self);
    }

    pub(crate) const fn head(&self) -> Option<NonNull<Block>> {
        self.head
    }

    pub(crate) const fn locate(index: usize) -> (usize, usize) {
        (index / BLOCK_CAP, index % BLOCK_CAP)
    }

    pub(crate) fn block(&self, row: usize) -> &Block {
        // SAFETY: Every row points to a block owned by the chain, which lives as long as self.
        unsafe { self.rows[row].as_ref() }
    }

    fn block_mut(&mut self, row: usize) -> &mut Block {
        // SAFETY: As above, and the borrow is tied to &mut self.
        unsafe { self.rows[row].as_mut() }
    }

    fn check_index(&self, index: usize) -> Result<(), OutOfBound> {
        if index < self.len {
            Ok(())
        } else {
            Err(OutOfBound::unsigned(index, self.len))
        }
    }

    fn check_value(&self, value: &[u8]) {
        assert_eq!(
            value.len(),
            self.elem_size,
            "element of {} bytes doesn't fit a vector of {}-byte elements",
            value.len(),
            self.elem_size,
        );
    }

    /// Appends a single zeroed block to the end of the chain.
    fn append_block(&mut self) -> Result<(), OutOfMemory> {
        let block = Block::allocate(self.elem_size)?;

        match self.rows.last_mut() {
            // SAFETY: The last row is owned by the chain and nothing else borrows it here.
            Some(last) => unsafe { last.as_mut().next = Some(block) },
            None => self.head = Some(block),
        }

        self.rows.push(block);
        Ok(())
    }

    /// Extends the committed length to `new_len`, appending blocks as needed.
    fn extend_to(&mut self, new_len: usize) -> Result<(), VectorError> {
        if let Some(max) = self.max_len.filter(|max| new_len > *max) {
            return Err(OutOfBound::unsigned(new_len - 1, max).into());
        }

        let rows = new_len.div_ceil(BLOCK_CAP);
        if rows > self.rows.len() {
            if Block::chain_size(rows, self.elem_size).is_none() {
                return Err(OutOfMemory { size: usize::MAX }.into());
            }

            let before = self.rows.len();
            while self.rows.len() < rows {
                if let Err(err) = self.append_block() {
                    log::debug!(
                        "chain growth stopped at {} of {rows} blocks: {err}",
                        self.rows.len()
                    );
                    return Err(err.into());
                }
            }
            log::debug!("grew chain from {before} to {rows} blocks");
        }

        for row in self.len / BLOCK_CAP..rows {
            let fill = cmp::min(new_len - row * BLOCK_CAP, BLOCK_CAP);
            // A fill of 256 needs the full u16.
            self.block_mut(row).fill = fill as u16;
        }

        self.len = new_len;
        Ok(())
    }
}

impl Drop for SegmentedVector {
    fn drop(&mut self) {
        self.rows.clear();

        let mut next = self.head.take();
        while let Some(block) = next {
            // SAFETY: Each block is reachable through exactly one link, and the rows that also
            // pointed at it were cleared above.
            next = unsafe { Block::free(block) };
        }
    }
}

// SAFETY: The links and rows only point into the chain owned by the vector itself.
unsafe impl Send for SegmentedVector {}
// SAFETY: Shared access never mutates.
unsafe impl Sync for SegmentedVector {}

impl Debug for SegmentedVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentedVector")
            .field("len", &self.len)
            .field("elem_size", &self.elem_size)
            .field("max_len", &self.max_len)
            .field("blocks", &self.block_count())
            .finish()
    }
}
