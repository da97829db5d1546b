//! A module containing [`RawBlock`], the zero-filling allocation wrapper that every collection in
//! this crate builds its storage from.

mod block;

pub use block::*;
