//! Construction settings for the collections in this crate.

use crate::collections::header::SlotKind;

/// The depth limit used by tree deletion unless another one is provided.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Settings for creating a [`FlatVector`](crate::collections::flat::FlatVector).
///
/// # Examples
/// ```
/// # use packed_vector::collections::settings::VectorSettings;
/// # use packed_vector::collections::flat::FlatVector;
/// let vec = FlatVector::with_settings(VectorSettings::leaf(4).capacity(16)).unwrap();
/// assert_eq!(vec.cap(), 16);
/// assert_eq!(vec.elem_size(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorSettings {
    pub(crate) kind: SlotKind,
    pub(crate) elem_size: usize,
    pub(crate) capacity: usize,
}

impl VectorSettings {
    /// Settings for a vector of `elem_size`-byte leaf elements.
    pub const fn leaf(elem_size: usize) -> VectorSettings {
        VectorSettings {
            kind: SlotKind::Leaf,
            elem_size,
            capacity: 1,
        }
    }

    /// Settings for a vector of nested vectors.
    pub const fn nested() -> VectorSettings {
        VectorSettings {
            kind: SlotKind::Nested,
            elem_size: size_of::<usize>(),
            capacity: 1,
        }
    }

    /// Sets the number of slots allocated up front. Values below 1 are raised to 1.
    pub const fn capacity(mut self, capacity: usize) -> VectorSettings {
        self.capacity = if capacity == 0 { 1 } else { capacity };
        self
    }

    pub const fn kind(&self) -> SlotKind {
        self.kind
    }
}

/// Settings for creating a [`SegmentedVector`](crate::collections::segmented::SegmentedVector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentSettings {
    pub(crate) elem_size: usize,
    pub(crate) initial_len: usize,
    pub(crate) max_len: Option<usize>,
    pub(crate) eager: bool,
}

impl SegmentSettings {
    /// Settings for a segmented vector of `elem_size`-byte elements, with room for one block.
    pub const fn new(elem_size: usize) -> SegmentSettings {
        SegmentSettings {
            elem_size,
            initial_len: 0,
            max_len: None,
            eager: true,
        }
    }

    /// Sets the number of elements to reserve blocks for at creation.
    pub const fn initial_len(mut self, initial_len: usize) -> SegmentSettings {
        self.initial_len = initial_len;
        self
    }

    /// Sets a fixed maximum number of elements. Accesses past it fail rather than growing.
    pub const fn max_len(mut self, max_len: usize) -> SegmentSettings {
        self.max_len = Some(max_len);
        self
    }

    /// Sets whether every block for the initial length is allocated at creation (the default) or
    /// only the first one, with the rest allocated as they are reached.
    pub const fn eager(mut self, eager: bool) -> SegmentSettings {
        self.eager = eager;
        self
    }
}
