//! A vector made of a chain of fixed-size blocks, which never moves its elements.

mod block;
mod iter;
mod segmented_vector;

pub(crate) use block::Block;
pub use block::{BlockRef, BLOCK_CAP};
pub use iter::*;
pub use segmented_vector::*;
