use std::fmt::{self, Debug, Formatter};

use derive_more::IsVariant;

use super::FlatVector;

/// A value to be copied into a [`FlatVector`] slot.
///
/// Leaf bytes are copied, a nested vector is moved in and owned by its new parent from then on.
#[derive(Debug, IsVariant)]
pub enum Element<'a> {
    Leaf(&'a [u8]),
    Nested(FlatVector),
}

impl<'a> From<&'a [u8]> for Element<'a> {
    fn from(value: &'a [u8]) -> Self {
        Element::Leaf(value)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Element<'a> {
    fn from(value: &'a [u8; N]) -> Self {
        Element::Leaf(value)
    }
}

impl From<FlatVector> for Element<'_> {
    fn from(value: FlatVector) -> Self {
        Element::Nested(value)
    }
}

/// A borrowed view of a [`FlatVector`] slot, valid until the vector is next mutated.
#[derive(Clone, Copy, IsVariant)]
pub enum Slot<'a> {
    /// The bytes of a leaf element.
    Leaf(&'a [u8]),
    /// A nested vector owned by the slot.
    Nested(&'a FlatVector),
    /// A removed slot awaiting compaction, or a nested slot that was never filled.
    Vacant,
}

impl<'a> Slot<'a> {
    pub const fn as_leaf(self) -> Option<&'a [u8]> {
        match self {
            Slot::Leaf(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub const fn as_nested(self) -> Option<&'a FlatVector> {
        match self {
            Slot::Nested(vec) => Some(vec),
            _ => None,
        }
    }
}

// Nested vectors are summarized rather than printed, so formatting a deep tree can't recurse.
impl Debug for Slot<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Leaf(bytes) => f.debug_tuple("Leaf").field(bytes).finish(),
            Slot::Nested(vec) => f.debug_struct("Nested")
                .field("len", &vec.len())
                .field("cap", &vec.cap())
                .field("kind", &vec.kind())
                .finish(),
            Slot::Vacant => f.write_str("Vacant"),
        }
    }
}

/// A mutable view of a [`FlatVector`] slot.
#[derive(Debug, IsVariant)]
pub enum SlotMut<'a> {
    Leaf(&'a mut [u8]),
    Nested(&'a mut FlatVector),
    Vacant,
}

impl<'a> SlotMut<'a> {
    pub fn into_leaf(self) -> Option<&'a mut [u8]> {
        match self {
            SlotMut::Leaf(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_nested(self) -> Option<&'a mut FlatVector> {
        match self {
            SlotMut::Nested(vec) => Some(vec),
            _ => None,
        }
    }
}

/// The owned contents of a slot taken out of a [`FlatVector`].
#[derive(Debug, IsVariant)]
pub enum Removed {
    Leaf(Box<[u8]>),
    Nested(FlatVector),
    Vacant,
}

impl Removed {
    pub fn into_leaf(self) -> Option<Box<[u8]>> {
        match self {
            Removed::Leaf(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_nested(self) -> Option<FlatVector> {
        match self {
            Removed::Nested(vec) => Some(vec),
            _ => None,
        }
    }
}
