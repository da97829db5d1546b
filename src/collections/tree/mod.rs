//! Teardown of [`FlatVector`](crate::collections::flat::FlatVector) trees without native recursion.
//!
//! A nested FlatVector owns its children, which may own children of their own, to any depth. Both
//! [`delete`] and the destructor of FlatVector walk such a tree with an explicit stack, so a tree
//! deep enough to overflow the call stack is still released correctly. [`delete`] additionally
//! refuses trees deeper than a configurable limit.

mod deletion;

pub use deletion::*;
