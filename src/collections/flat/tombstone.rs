/// The number of removals a [`FlatVector`](super::FlatVector) defers before compacting.
pub const TOMBSTONE_CAP: usize = 255;

/// The length above which removal switches from shifting to tombstoning.
pub const COMPACTION_THRESHOLD: usize = u16::MAX as usize;

/// A bounded record of slots that have been removed but not yet compacted away.
///
/// Never holds more than [`TOMBSTONE_CAP`] entries or the same index twice.
pub(crate) struct Tombstones {
    indices: [usize; TOMBSTONE_CAP],
    len: u8,
}

impl Tombstones {
    pub const fn new() -> Tombstones {
        Tombstones {
            indices: [0; TOMBSTONE_CAP],
            len: 0,
        }
    }

    pub const fn len(&self) -> usize {
        self.len as usize
    }

    pub const fn is_full(&self) -> bool {
        self.len() == TOMBSTONE_CAP
    }

    pub fn contains(&self, index: usize) -> bool {
        self.as_slice().contains(&index)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices[..self.len()]
    }

    /// Records a removed index.
    ///
    /// # Panics
    /// Panics if the buffer is already full. Full buffers have to be compacted first.
    pub fn record(&mut self, index: usize) {
        assert!(!self.is_full(), "tombstone buffer must be compacted before recording more");
        debug_assert!(!self.contains(index));

        self.indices[self.len()] = index;
        self.len += 1;
    }

    /// Forgets `index` if it was recorded, returning whether it was.
    pub fn forget(&mut self, index: usize) -> bool {
        match self.as_slice().iter().position(|i| *i == index) {
            Some(pos) => {
                self.indices[pos] = self.indices[self.len() - 1];
                self.len -= 1;
                true
            },
            None => false,
        }
    }

    /// Moves every recorded index after `index` down by one, following a left shift of the slots.
    pub fn shift_after(&mut self, index: usize) {
        let len = self.len();
        for recorded in self.indices[..len].iter_mut().filter(|i| **i > index) {
            *recorded -= 1;
        }
    }

    /// Empties the buffer, returning the recorded indices in ascending order.
    pub fn drain_sorted(&mut self) -> &[usize] {
        let len = self.len();
        self.len = 0;
        self.indices[..len].sort_unstable();
        &self.indices[..len]
    }
}

impl Default for Tombstones {
    fn default() -> Self {
        Self::new()
    }
}
