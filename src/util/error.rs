use derive_more::{Display, Error, From, IsVariant, TryInto};

/// The allocator couldn't provide a block of the requested size, or the size couldn't be
/// described by a valid memory layout at all.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
#[display("allocation of {size} bytes failed")]
pub struct OutOfMemory {
    pub size: usize,
}

/// An index resolved outside of the valid range of a collection. Negative indices are reported as
/// they were provided, before being resolved from the end.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
#[display("index {index} out of bounds for collection with {len} elements")]
pub struct OutOfBound {
    pub index: isize,
    pub len: usize,
}

impl OutOfBound {
    pub(crate) fn unsigned(index: usize, len: usize) -> OutOfBound {
        OutOfBound {
            index: isize::try_from(index).unwrap_or(isize::MAX),
            len,
        }
    }
}

/// A tree traversal would have needed more frames than its configured limit.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
#[display("tree deeper than the traversal limit of {limit} levels")]
pub struct RecursionLimitExceeded {
    pub limit: usize,
}

/// Errors produced by fallible collection mutations.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq, From, TryInto, IsVariant)]
pub enum VectorError {
    OutOfMemory(OutOfMemory),
    OutOfBound(OutOfBound),
}
