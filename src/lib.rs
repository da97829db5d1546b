//! Byte-level vectors with a packed, self-describing header.
//!
//! # Purpose
//! This crate is about squeezing container metadata. A [`FlatVector`](collections::flat::FlatVector)
//! keeps its length in front of its elements, using one metadata byte and as few count bytes as the
//! length needs, and widens that count in place as the vector grows. Vectors can own other vectors,
//! forming trees that can be torn down to any depth without blowing the call stack.
//!
//! # Method
//! Everything here is written directly against [`std::alloc`]: each collection manages its own
//! blocks through [`RawBlock`](collections::raw::RawBlock), which zero-fills new memory and never
//! invalidates a block when an allocation fails. Elements are untyped, fixed-size byte blobs, so
//! callers are free to lay them out however they want.
//!
//! # Error Handling
//! Allocation failure is reported, never turned into an abort: every growing operation returns
//! [`OutOfMemory`](collections::OutOfMemory) and leaves the collection as it was (with one
//! documented exception for [`SegmentedVector`](collections::segmented::SegmentedVector) chain
//! growth). Bad indices produce [`OutOfBound`](collections::OutOfBound). Errors are small structs
//! implementing [`Error`](std::error::Error), combined into enums for static dispatch where an
//! operation can fail in more than one way.
//!
//! Passing an element of the wrong kind or size is a programming error and panics instead.
//!
//! # Dependencies
//! This crate uses `derive_more` for its error types and the `log` facade for tracing allocation
//! and promotion activity. No logger is installed; that is left to the binary.
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(clippy::missing_const_for_fn)]
#![warn(clippy::missing_panics_doc)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_inception)]

#[cfg(feature = "collections")]
pub mod collections;

pub(crate) mod util;
