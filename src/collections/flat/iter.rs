use std::iter::FusedIterator;
use std::ops::Range;

use super::{FlatVector, Slot};

impl<'a> IntoIterator for &'a FlatVector {
    type Item = Slot<'a>;

    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A borrowing iterator over the slots of a [`FlatVector`], see [`FlatVector::iter`].
///
/// Slots removed but not yet compacted are yielded as [`Slot::Vacant`], so indices line up with
/// [`FlatVector::get`].
pub struct Iter<'a> {
    vec: &'a FlatVector,
    range: Range<usize>,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(vec: &'a FlatVector) -> Iter<'a> {
        Iter {
            vec,
            range: 0..vec.len(),
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Slot<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.range.next().map(|i| self.vec.slot(i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.range.next_back().map(|i| self.vec.slot(i))
    }
}

impl FusedIterator for Iter<'_> {}

impl ExactSizeIterator for Iter<'_> {
    fn len(&self) -> usize {
        self.range.len()
    }
}
