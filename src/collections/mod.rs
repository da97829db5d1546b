//! Vectors of fixed-size elements and the pieces they are built from.
//!
//! # Layout
//! - [`raw`]: zero-filled heap blocks, the only place that talks to the allocator.
//! - [`header`]: the packed count header and the codec that reads and writes it in a block.
//! - [`flat`]: [`FlatVector`](flat::FlatVector), a single block holding a header and its slots.
//! - [`tree`]: iterative, depth-bounded teardown of nested FlatVectors.
//! - [`segmented`]: [`SegmentedVector`](segmented::SegmentedVector), a chain of fixed-size blocks.
//! - [`settings`]: construction settings shared by the above.

pub mod header;
pub mod raw;
pub mod settings;

#[cfg(feature = "flat")]
pub mod flat;
#[cfg(feature = "flat")]
pub mod tree;

#[cfg(feature = "segmented")]
pub mod segmented;

#[doc(inline)]
pub use crate::util::error::{OutOfBound, OutOfMemory, RecursionLimitExceeded, VectorError};
