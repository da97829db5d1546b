//! A contiguous vector of fixed-size slots with a packed, self-describing header.
//!
//! [`FlatVector`] keeps its length in a [`Header`](crate::collections::header::Header) at the
//! front of its single allocation, so an empty vector of small elements costs only two bytes of
//! metadata. Slots either hold leaf bytes or own nested FlatVectors.

mod element;
mod flat_vector;
mod iter;
mod tests;
mod tombstone;

pub use element::*;
pub use flat_vector::*;
pub use iter::*;
pub(crate) use tombstone::Tombstones;
pub use tombstone::{COMPACTION_THRESHOLD, TOMBSTONE_CAP};
