use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ops::Range;
use std::ptr::NonNull;

use super::{Block, BlockRef, SegmentedVector};

impl<'a> IntoIterator for &'a SegmentedVector {
    type Item = &'a [u8];

    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A borrowing iterator over the elements of a [`SegmentedVector`], see
/// [`SegmentedVector::iter`].
pub struct Iter<'a> {
    vec: &'a SegmentedVector,
    range: Range<usize>,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(vec: &'a SegmentedVector) -> Iter<'a> {
        Iter {
            vec,
            range: 0..vec.len(),
        }
    }

    fn element(&self, index: usize) -> &'a [u8] {
        let (row, col) = SegmentedVector::locate(index);
        self.vec.block(row).slot(col, self.vec.elem_size())
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.range.next()?;
        Some(self.element(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let index = self.range.next_back()?;
        Some(self.element(index))
    }
}

impl FusedIterator for Iter<'_> {}

impl ExactSizeIterator for Iter<'_> {
    fn len(&self) -> usize {
        self.range.len()
    }
}

/// An iterator over the blocks of a [`SegmentedVector`] chain, see [`SegmentedVector::blocks`].
pub struct Blocks<'a> {
    next: Option<NonNull<Block>>,
    elem_size: usize,
    _phantom: PhantomData<&'a Block>,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(vec: &'a SegmentedVector) -> Blocks<'a> {
        Blocks {
            next: vec.head(),
            elem_size: vec.elem_size(),
            _phantom: PhantomData,
        }
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = BlockRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: Every link points to a block owned by the vector this iterator borrows.
        let block: &'a Block = unsafe { self.next?.as_ref() };
        self.next = block.next;

        Some(BlockRef {
            block,
            elem_size: self.elem_size,
        })
    }
}

impl FusedIterator for Blocks<'_> {}
