//! A module containing [`Header`], the packed, variable-width metadata stored in front of a
//! [`FlatVector`](crate::collections::flat::FlatVector)'s slots, along with [`CountWidth`] and the
//! block-level [`codec`] functions that read, write and promote it.

pub mod codec;
mod header;
mod width;

pub use header::*;
pub use width::*;
