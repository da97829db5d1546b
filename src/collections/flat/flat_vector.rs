use std::cmp;
use std::fmt::{self, Debug, Formatter};
use std::ops::Range;
use std::ptr::NonNull;

use super::{Element, Iter, Removed, Slot, SlotMut, Tombstones, COMPACTION_THRESHOLD};
use crate::collections::header::{codec, CountWidth, Header, SlotKind};
use crate::collections::raw::RawBlock;
use crate::collections::settings::VectorSettings;
use crate::collections::tree::Walk;
#[doc(inline)]
pub use crate::util::error::{OutOfBound, OutOfMemory, VectorError};

pub const MIN_CAP: usize = 1;

pub const GROWTH_FACTOR: usize = 2;

/// The slot size of a nested vector: one owning pointer.
pub(crate) const NESTED_SLOT: usize = size_of::<usize>();

/// A variable size contiguous collection of fixed-size elements, storing its length in a packed
/// [`Header`] directly in front of the elements, within a single allocation.
///
/// Each FlatVector either holds leaf elements (byte blobs of [`elem_size`](FlatVector::elem_size)
/// bytes, copied in and out) or nested FlatVectors, which it owns. Nested vectors form a tree that
/// is torn down with an explicit work stack rather than recursion, see
/// [`tree`](crate::collections::tree).
///
/// # Time Complexity
/// For this analysis of time complexity, variables are defined as follows:
/// - `n`: The number of items in the FlatVector.
/// - `i`: The index of the item in question.
///
/// | Method | Complexity |
/// |-|-|
/// | `get` | `O(1)`* |
/// | `len` | `O(1)` |
/// | `push` | `O(1)`**, `O(n)` |
/// | `pop` | `O(1)` |
/// | `set` | `O(1)` |
/// | `set_growing` | `O(1)`**, `O(n)` |
/// | `insert` | `O(n-i)` |
/// | `remove` | `O(n-i)`, `O(1)`*** |
/// | `compact` | `O(n)` |
///
/// \* While removals are pending compaction, a lookup also scans the (bounded) tombstone buffer.
///
/// \** If the FlatVector doesn't have slack for the new element, or its header has to be promoted
/// to a wider count, the operation takes `O(n)`. Capacity grows geometrically.
///
/// \*** Above [`COMPACTION_THRESHOLD`] elements, removal only records a tombstone. Every
/// [`TOMBSTONE_CAP`](super::TOMBSTONE_CAP) removals, a single `O(n)` compaction closes the gaps.
pub struct FlatVector {
    pub(crate) block: RawBlock,
    pub(crate) cap: usize,
    pub(crate) elem_size: usize,
    pub(crate) tombstones: Option<Box<Tombstones>>,
}

impl FlatVector {
    /// Creates a new, empty FlatVector of `elem_size`-byte leaf elements, with slack for
    /// `capacity` elements (at least 1).
    ///
    /// # Errors
    /// Returns [`OutOfMemory`] if the allocation fails.
    ///
    /// # Examples
    /// ```
    /// # use packed_vector::collections::flat::FlatVector;
    /// let vec = FlatVector::new(4, 8).unwrap();
    /// assert_eq!(vec.len(), 0);
    /// assert_eq!(vec.cap(), 8);
    /// ```
    pub fn new(elem_size: usize, capacity: usize) -> Result<FlatVector, OutOfMemory> {
        FlatVector::with_settings(VectorSettings::leaf(elem_size).capacity(capacity))
    }

    /// Creates a new, empty FlatVector whose slots hold nested FlatVectors.
    ///
    /// # Errors
    /// Returns [`OutOfMemory`] if the allocation fails.
    pub fn nested(capacity: usize) -> Result<FlatVector, OutOfMemory> {
        FlatVector::with_settings(VectorSettings::nested().capacity(capacity))
    }

    /// Creates a new, empty FlatVector from the provided settings. Costs exactly one allocation.
    ///
    /// # Errors
    /// Returns [`OutOfMemory`] if the allocation fails.
    pub fn with_settings(settings: VectorSettings) -> Result<FlatVector, OutOfMemory> {
        let cap = cmp::max(settings.capacity, MIN_CAP);
        let elem_size = match settings.kind {
            SlotKind::Leaf => settings.elem_size,
            SlotKind::Nested => NESTED_SLOT,
        };
        let data_size = cap.checked_mul(elem_size).ok_or(OutOfMemory { size: usize::MAX })?;

        Ok(FlatVector {
            block: codec::allocate_with_header(settings.kind, true, data_size)?,
            cap,
            elem_size,
            tombstones: None,
        })
    }

    /// Returns the number of slots in the FlatVector, including removed slots awaiting compaction.
    pub fn len(&self) -> usize {
        codec::read_count(&self.block) as usize
    }

    /// Returns true if the FlatVector contains no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of slots the FlatVector can hold before reallocating.
    pub const fn cap(&self) -> usize {
        self.cap
    }

    /// Returns the size of a single slot in bytes.
    pub const fn elem_size(&self) -> usize {
        self.elem_size
    }

    /// Returns whether the slots hold leaf elements or nested vectors.
    pub fn kind(&self) -> SlotKind {
        codec::type_of(&self.block)
    }

    /// Returns the width currently used by the packed count.
    pub fn width(&self) -> CountWidth {
        self.header().width()
    }

    /// Returns true if the allocation has room for another element. A push that widens the count
    /// still rebuilds the block.
    pub fn has_slack(&self) -> bool {
        self.header().prealloc()
    }

    /// Returns the number of removals waiting for compaction.
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.as_ref().map_or(0, |t| t.len())
    }

    /// Returns the slot at `index`. Negative indices count back from the end, so `-1` is the last
    /// slot.
    ///
    /// # Errors
    /// Returns [`OutOfBound`] if the resolved index isn't less than the length.
    ///
    /// # Examples
    /// ```
    /// # use packed_vector::collections::flat::FlatVector;
    /// let mut vec = FlatVector::new(1, 1).unwrap();
    /// vec.push(&[5]).unwrap();
    /// vec.push(&[6]).unwrap();
    /// assert_eq!(vec.get(-1).unwrap().as_leaf(), Some(&[6][..]));
    /// assert!(vec.get(2).is_err());
    /// ```
    pub fn get(&self, index: isize) -> Result<Slot<'_>, OutOfBound> {
        let index = self.resolve(index)?;
        Ok(self.slot(index))
    }

    /// Returns a mutable view of the slot at `index`. Negative indices count back from the end.
    ///
    /// # Errors
    /// Returns [`OutOfBound`] if the resolved index isn't less than the length.
    pub fn get_mut(&mut self, index: isize) -> Result<SlotMut<'_>, OutOfBound> {
        let index = self.resolve(index)?;

        if self.is_tombstoned(index) {
            return Ok(SlotMut::Vacant);
        }

        Ok(match self.kind() {
            SlotKind::Leaf => SlotMut::Leaf(self.slot_bytes_mut(index)),
            SlotKind::Nested => match self.child_ptr(index) {
                // SAFETY: The child is owned by this slot and the borrow is tied to &mut self.
                Some(mut child) => SlotMut::Nested(unsafe { child.as_mut() }),
                None => SlotMut::Vacant,
            },
        })
    }

    /// Returns the last slot, if the FlatVector isn't empty.
    pub fn last(&self) -> Option<Slot<'_>> {
        self.get(-1).ok()
    }

    /// Pushes `value` onto the end of the FlatVector, returning its index.
    ///
    /// When there is no slack left, the capacity grows by [`GROWTH_FACTOR`]. If the new length
    /// wouldn't fit the header's count width, the header is promoted first.
    ///
    /// # Errors
    /// Returns [`OutOfMemory`] if growing fails. The FlatVector is left as it was and `value` is
    /// dropped.
    ///
    /// # Panics
    /// Panics if `value` doesn't match the kind or element size of the FlatVector.
    ///
    /// # Examples
    /// ```
    /// # use packed_vector::collections::flat::FlatVector;
    /// let mut vec = FlatVector::new(2, 1).unwrap();
    /// for i in 0..300_u16 {
    ///     assert_eq!(vec.push(&i.to_le_bytes()).unwrap(), i as usize);
    /// }
    /// assert_eq!(vec.len(), 300);
    /// ```
    pub fn push<'a>(&mut self, value: impl Into<Element<'a>>) -> Result<usize, OutOfMemory> {
        let value = value.into();
        self.check_element(&value);

        let index = self.len();
        let header = self.header();
        if !header.prealloc() || !header.fits(index as u64 + 1) {
            self.make_room(index + 1)?;
        }

        self.write_slot(index, value);
        self.commit_len(index + 1);
        Ok(index)
    }

    /// Removes the last slot, returning its contents. This never moves any other slot.
    pub fn pop(&mut self) -> Option<Removed> {
        let index = self.len().checked_sub(1)?;
        let removed = self.take_slot(index);
        if let Some(tombstones) = &mut self.tombstones {
            tombstones.forget(index);
        }

        self.commit_len(index);
        Some(removed)
    }

    /// Overwrites the slot at `index` with `value`. A nested vector previously held by the slot is
    /// destroyed, along with all of its descendants.
    ///
    /// # Errors
    /// Returns [`OutOfBound`] if `index` isn't less than the length. See
    /// [`set_growing`](FlatVector::set_growing) for writing past the end.
    ///
    /// # Panics
    /// Panics if `value` doesn't match the kind or element size of the FlatVector.
    pub fn set<'a>(&mut self, index: usize, value: impl Into<Element<'a>>) -> Result<(), OutOfBound> {
        let value = value.into();
        self.check_element(&value);

        let len = self.len();
        if index >= len {
            return Err(OutOfBound::unsigned(index, len));
        }

        self.overwrite(index, value);
        Ok(())
    }

    /// Writes `value` at `index`, growing the FlatVector to `index + 1` slots if it is shorter.
    /// Slots between the old length and `index` are left zeroed (vacant for nested vectors).
    ///
    /// # Errors
    /// Returns [`OutOfMemory`] if growing fails. The FlatVector is left as it was and `value` is
    /// dropped.
    ///
    /// # Panics
    /// Panics if `value` doesn't match the kind or element size of the FlatVector.
    ///
    /// # Examples
    /// ```
    /// # use packed_vector::collections::flat::FlatVector;
    /// let mut vec = FlatVector::new(1, 1).unwrap();
    /// vec.set_growing(3, &[9]).unwrap();
    /// assert_eq!(vec.len(), 4);
    /// assert_eq!(vec.get(1).unwrap().as_leaf(), Some(&[0][..]));
    /// assert_eq!(vec.get(3).unwrap().as_leaf(), Some(&[9][..]));
    /// ```
    pub fn set_growing<'a>(
        &mut self,
        index: usize,
        value: impl Into<Element<'a>>,
    ) -> Result<(), OutOfMemory> {
        let value = value.into();
        self.check_element(&value);

        if index < self.len() {
            self.overwrite(index, value);
            return Ok(());
        }

        let new_len = index.checked_add(1).ok_or(OutOfMemory { size: usize::MAX })?;
        self.make_room(new_len)?;
        self.write_slot(index, value);
        self.commit_len(new_len);
        Ok(())
    }

    /// Inserts `value` at `index`, moving all following slots one place to the right. Pending
    /// removals are compacted first, so `index` refers to the compacted layout.
    ///
    /// # Errors
    /// Returns [`OutOfBound`] if `index` is greater than the compacted length, in which case
    /// nothing changes. Returns [`OutOfMemory`] if growing fails, in which case the FlatVector is
    /// left as it was apart from the compaction.
    ///
    /// # Panics
    /// Panics if `value` doesn't match the kind or element size of the FlatVector.
    pub fn insert<'a>(
        &mut self,
        index: usize,
        value: impl Into<Element<'a>>,
    ) -> Result<(), VectorError> {
        let value = value.into();
        self.check_element(&value);

        let live = self.len() - self.tombstone_count();
        if index > live {
            return Err(OutOfBound::unsigned(index, live).into());
        }

        self.compact();
        let len = self.len();

        self.make_room(len + 1)?;

        let range = self.data_range(index..len);
        let size = self.elem_size;
        self.block.as_bytes_mut().copy_within(range.clone(), range.start + size);

        self.write_slot(index, value);
        self.commit_len(len + 1);
        Ok(())
    }

    /// Removes the slot at `index`, returning its contents.
    ///
    /// Up to [`COMPACTION_THRESHOLD`] slots, all following slots move one place to the left and
    /// the length drops by one. Past that, the slot is only vacated and recorded as a tombstone:
    /// indices and the length stay the same until the tombstone buffer fills, at which point a
    /// single compaction pass closes every gap.
    ///
    /// # Errors
    /// Returns [`OutOfBound`] if `index` isn't less than the length.
    ///
    /// # Examples
    /// ```
    /// # use packed_vector::collections::flat::FlatVector;
    /// let mut vec = FlatVector::new(1, 1).unwrap();
    /// for i in [5, 6, 7] {
    ///     vec.push(&[i]).unwrap();
    /// }
    /// assert_eq!(vec.remove(0).unwrap().into_leaf().as_deref(), Some(&[5][..]));
    /// assert_eq!(vec.len(), 2);
    /// assert_eq!(vec.get(0).unwrap().as_leaf(), Some(&[6][..]));
    /// ```
    pub fn remove(&mut self, index: usize) -> Result<Removed, OutOfBound> {
        let len = self.len();
        if index >= len {
            return Err(OutOfBound::unsigned(index, len));
        }

        if len > COMPACTION_THRESHOLD {
            Ok(self.remove_deferred(index))
        } else {
            Ok(self.remove_shifting(index, len))
        }
    }

    /// Closes every gap left by deferred removals in one pass, reducing the length by the number
    /// of tombstones.
    pub fn compact(&mut self) {
        let Some(tombstones) = &mut self.tombstones else { return };
        if tombstones.len() == 0 {
            return;
        }

        let len = codec::read_count(&self.block) as usize;
        let offset = codec::read_header(&self.block).encoded_len();
        let size = self.elem_size;
        let bytes = self.block.as_bytes_mut();
        let holes = tombstones.drain_sorted();
        let removed = holes.len();

        let mut write = holes[0];
        for (i, hole) in holes.iter().enumerate() {
            let next = holes.get(i + 1).copied().unwrap_or(len);
            let run = next - hole - 1;
            bytes.copy_within(
                offset + (hole + 1) * size..offset + next * size,
                offset + write * size,
            );
            write += run;
        }
        bytes[offset + write * size..offset + len * size].fill(0);

        self.commit_len(write);
        log::debug!("compacted {removed} tombstones, length {len} -> {write}");
    }

    /// Ensures that the FlatVector has capacity for an additional `extra` slots. The capacity is
    /// set to exactly `len + extra` if it has to change.
    ///
    /// # Errors
    /// Returns [`OutOfMemory`] if growing fails. The FlatVector is left as it was.
    pub fn reserve(&mut self, extra: usize) -> Result<(), OutOfMemory> {
        let required = self.len().checked_add(extra).ok_or(OutOfMemory { size: usize::MAX })?;
        if required <= self.cap {
            return Ok(());
        }

        self.resize_cap(required)
    }

    /// Shrinks the allocation so that its capacity equals its length (but at least
    /// [`MIN_CAP`]).
    ///
    /// # Errors
    /// Returns [`OutOfMemory`] if the allocator fails to resize. The FlatVector is left as it was.
    pub fn shrink_to_fit(&mut self) -> Result<(), OutOfMemory> {
        self.resize_cap(cmp::max(self.len(), MIN_CAP))
    }

    /// Returns an iterator over all slots, in index order.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Releases the FlatVector. For nested vectors this tears down every descendant first, without
    /// a depth limit; see [`tree::delete`](crate::collections::tree::delete) for a bounded
    /// teardown.
    pub fn release(self) {
        drop(self);
    }

    pub(crate) fn header(&self) -> Header {
        codec::read_header(&self.block)
    }

    /// Returns the raw pointer held by nested slot `index`, if the slot is occupied.
    pub(crate) fn child_ptr(&self, index: usize) -> Option<NonNull<FlatVector>> {
        let bytes = self.slot_bytes(index);
        let mut raw = [0; NESTED_SLOT];
        raw.copy_from_slice(bytes);
        NonNull::new(usize::from_ne_bytes(raw) as *mut FlatVector)
    }

    /// Vacates nested slot `index` without touching the child it pointed to.
    pub(crate) fn clear_child_ptr(&mut self, index: usize) {
        self.slot_bytes_mut(index).fill(0);
    }

    /// Releases this vector's own storage, leaving a shell that owns nothing. Only used on a
    /// vector whose slots have already been emptied, right before it is dropped.
    pub(crate) fn release_storage(&mut self) {
        drop(std::mem::replace(&mut self.block, RawBlock::dangling()));
        self.tombstones = None;
        self.cap = 0;
    }

    pub(crate) fn slot(&self, index: usize) -> Slot<'_> {
        if self.is_tombstoned(index) {
            return Slot::Vacant;
        }

        match self.kind() {
            SlotKind::Leaf => Slot::Leaf(self.slot_bytes(index)),
            SlotKind::Nested => match self.child_ptr(index) {
                // SAFETY: The child is owned by this slot and the borrow is tied to &self.
                Some(child) => Slot::Nested(unsafe { child.as_ref() }),
                None => Slot::Vacant,
            },
        }
    }

    fn resolve(&self, index: isize) -> Result<usize, OutOfBound> {
        let len = self.len();
        let resolved = if index < 0 {
            len.checked_sub(index.unsigned_abs())
        } else {
            Some(index.unsigned_abs())
        };

        match resolved {
            Some(i) if i < len => Ok(i),
            _ => Err(OutOfBound { index, len }),
        }
    }

    fn is_tombstoned(&self, index: usize) -> bool {
        self.tombstones.as_ref().is_some_and(|t| t.contains(index))
    }

    /// Returns the byte range of the slots in `slots`, within the block.
    fn data_range(&self, slots: Range<usize>) -> Range<usize> {
        let offset = self.header().encoded_len();
        offset + slots.start * self.elem_size..offset + slots.end * self.elem_size
    }

    fn slot_bytes(&self, index: usize) -> &[u8] {
        let range = self.data_range(index..index + 1);
        &self.block.as_bytes()[range]
    }

    fn slot_bytes_mut(&mut self, index: usize) -> &mut [u8] {
        let range = self.data_range(index..index + 1);
        &mut self.block.as_bytes_mut()[range]
    }

    /// Checks that `value` can be stored in this FlatVector.
    ///
    /// # Panics
    /// Panics if the kind or size of `value` doesn't match.
    fn check_element(&self, value: &Element<'_>) {
        match (self.kind(), value) {
            (SlotKind::Leaf, Element::Leaf(bytes)) => assert_eq!(
                bytes.len(),
                self.elem_size,
                "element of {} bytes doesn't fit a vector of {}-byte elements",
                bytes.len(),
                self.elem_size,
            ),
            (SlotKind::Nested, Element::Nested(_)) => {},
            (kind, _) => panic!("element kind doesn't match a vector of {kind:?} slots"),
        }
    }

    /// Writes `value` into a slot which holds nothing that needs releasing.
    fn write_slot(&mut self, index: usize, value: Element<'_>) {
        match value {
            Element::Leaf(bytes) => self.slot_bytes_mut(index).copy_from_slice(bytes),
            Element::Nested(child) => {
                let ptr = Box::into_raw(Box::new(child)) as usize;
                self.slot_bytes_mut(index).copy_from_slice(&ptr.to_ne_bytes());
            },
        }
    }

    /// Takes the contents out of a slot, leaving it zeroed. The tombstone record isn't touched.
    fn take_slot(&mut self, index: usize) -> Removed {
        if self.is_tombstoned(index) {
            return Removed::Vacant;
        }

        let removed = match self.kind() {
            SlotKind::Leaf => Removed::Leaf(Box::from(self.slot_bytes(index))),
            SlotKind::Nested => match self.child_ptr(index) {
                // SAFETY: The pointer came from Box::into_raw in write_slot, and the slot is
                // zeroed below so it can't be taken twice.
                Some(child) => Removed::Nested(*unsafe { Box::from_raw(child.as_ptr()) }),
                None => Removed::Vacant,
            },
        };

        self.slot_bytes_mut(index).fill(0);
        removed
    }

    fn overwrite(&mut self, index: usize, value: Element<'_>) {
        let old = self.take_slot(index);
        if let Some(tombstones) = &mut self.tombstones {
            tombstones.forget(index);
        }

        // Destroy the previous occupant before the slot is reused.
        drop(old);
        self.write_slot(index, value);
    }

    fn remove_shifting(&mut self, index: usize, len: usize) -> Removed {
        let removed = self.take_slot(index);

        if index + 1 < len {
            let range = self.data_range(index + 1..len);
            let size = self.elem_size;
            self.block.as_bytes_mut().copy_within(range.clone(), range.start - size);
            self.slot_bytes_mut(len - 1).fill(0);
        }

        if let Some(tombstones) = &mut self.tombstones {
            tombstones.forget(index);
            tombstones.shift_after(index);
        }

        self.commit_len(len - 1);
        removed
    }

    fn remove_deferred(&mut self, index: usize) -> Removed {
        if self.is_tombstoned(index) {
            return Removed::Vacant;
        }

        let removed = self.take_slot(index);
        let tombstones = self.tombstones.get_or_insert_with(Box::default);
        tombstones.record(index);

        if tombstones.is_full() {
            self.compact();
        }
        removed
    }

    /// Writes `len` to the header in place, updating the slack flag to match.
    ///
    /// # Panics
    /// Panics if `len` doesn't fit the header. [`make_room`](FlatVector::make_room) promotes the
    /// header ahead of any growth.
    fn commit_len(&mut self, len: usize) {
        let mut header = self.header();
        header.set_count(len as u64);
        header.set_prealloc(self.cap > len);
        codec::write_header(&mut self.block, &header);
    }

    /// Makes room for `new_len` slots: promotes the header if `new_len` would overflow its width and
    /// grows the capacity geometrically if it is too small. Nothing changes if an allocation fails.
    fn make_room(&mut self, new_len: usize) -> Result<(), OutOfMemory> {
        let header = self.header();
        let new_cap = if new_len > self.cap {
            cmp::max(self.cap.saturating_mul(GROWTH_FACTOR), new_len)
        } else {
            self.cap
        };

        match header.promotion_for(new_len as u64) {
            Some(width) => {
                let wider = header.widened(width);
                let data_len = self.len() * self.elem_size;
                let new_size = Self::block_size(&wider, new_cap, self.elem_size)?;

                self.block = codec::rebuild(&self.block, &wider, data_len, new_size)?;
                log::trace!("promoted count from {:?} to {width:?} at length {new_len}", header.width());
            },
            None if new_cap != self.cap => {
                self.block.reallocate(Self::block_size(&header, new_cap, self.elem_size)?)?;
            },
            None => return Ok(()),
        }

        self.cap = new_cap;
        Ok(())
    }

    /// Reallocates to exactly `new_cap` slots, which must not be less than the length.
    fn resize_cap(&mut self, new_cap: usize) -> Result<(), OutOfMemory> {
        let header = self.header();
        self.block.reallocate(Self::block_size(&header, new_cap, self.elem_size)?)?;
        self.cap = new_cap;

        let len = self.len();
        self.commit_len(len);
        Ok(())
    }

    fn block_size(header: &Header, cap: usize, elem_size: usize) -> Result<usize, OutOfMemory> {
        cap.checked_mul(elem_size)
            .and_then(|data| data.checked_add(header.encoded_len()))
            .ok_or(OutOfMemory { size: usize::MAX })
    }
}

impl Drop for FlatVector {
    fn drop(&mut self) {
        if self.block.is_dangling() || self.kind().is_leaf() {
            // Leaf slots own nothing, the block is released when it is dropped.
            return;
        }

        // Tear down all descendants with an explicit stack. The limit can't be reached before
        // memory runs out, so the walk always finishes.
        let mut walk = Walk::new(NonNull::from(&mut *self), usize::MAX);
        while walk.step().is_ok_and(|state| !state.is_finished()) {}
    }
}

impl Debug for FlatVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        struct Contents<'a>(&'a FlatVector);

        impl Debug for Contents<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.debug_list().entries(self.0.iter()).finish()
            }
        }

        if self.block.is_dangling() {
            return f.write_str("FlatVector(released)");
        }

        f.debug_struct("FlatVector")
            .field("contents", &Contents(self))
            .field("len", &self.len())
            .field("cap", &self.cap)
            .field("elem_size", &self.elem_size)
            .field("width", &self.width())
            .field("tombstones", &self.tombstone_count())
            .finish()
    }
}
