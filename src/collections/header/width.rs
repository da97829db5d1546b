/// The byte width of a packed count field.
///
/// Each width is persisted as a 3-bit code (1 to 4) inside a header's metadata byte. Widths are
/// ordered, so a promotion always moves to a strictly greater width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CountWidth {
    U8 = 1,
    U16 = 2,
    U32 = 3,
    U64 = 4,
}

impl CountWidth {
    /// Returns the smallest width able to hold `value`, or [`None`] if `value` needs more than 8
    /// bytes.
    ///
    /// # Examples
    /// ```
    /// # use packed_vector::collections::header::CountWidth;
    /// assert_eq!(CountWidth::fitting(255), Some(CountWidth::U8));
    /// assert_eq!(CountWidth::fitting(256), Some(CountWidth::U16));
    /// assert_eq!(CountWidth::fitting(u64::MAX as u128 + 1), None);
    /// ```
    pub const fn fitting(value: u128) -> Option<CountWidth> {
        if value <= u8::MAX as u128 {
            Some(CountWidth::U8)
        } else if value <= u16::MAX as u128 {
            Some(CountWidth::U16)
        } else if value <= u32::MAX as u128 {
            Some(CountWidth::U32)
        } else if value <= u64::MAX as u128 {
            Some(CountWidth::U64)
        } else {
            None
        }
    }

    /// Returns the width a header storing `count` should use: the smallest width that can still
    /// represent `count + 1`, leaving headroom for one pending increment.
    pub const fn for_count(count: u64) -> Option<CountWidth> {
        CountWidth::fitting(count as u128 + 1)
    }

    /// Returns true if `count` can be stored at this width with headroom for one increment.
    pub const fn holds(self, count: u64) -> bool {
        (count as u128) < self.max_value() as u128
    }

    /// Returns the number of bytes used by a count field of this width.
    pub const fn bytes(self) -> usize {
        match self {
            CountWidth::U8 => 1,
            CountWidth::U16 => 2,
            CountWidth::U32 => 4,
            CountWidth::U64 => 8,
        }
    }

    /// Returns the largest value a count field of this width can represent.
    pub const fn max_value(self) -> u64 {
        match self {
            CountWidth::U8 => u8::MAX as u64,
            CountWidth::U16 => u16::MAX as u64,
            CountWidth::U32 => u32::MAX as u64,
            CountWidth::U64 => u64::MAX,
        }
    }

    /// Returns the 3-bit code persisted in the metadata byte.
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn from_code(code: u8) -> Option<CountWidth> {
        match code {
            1 => Some(CountWidth::U8),
            2 => Some(CountWidth::U16),
            3 => Some(CountWidth::U32),
            4 => Some(CountWidth::U64),
            _ => None,
        }
    }

    /// Returns the next wider width, if there is one.
    pub const fn next(self) -> Option<CountWidth> {
        match self {
            CountWidth::U8 => Some(CountWidth::U16),
            CountWidth::U16 => Some(CountWidth::U32),
            CountWidth::U32 => Some(CountWidth::U64),
            CountWidth::U64 => None,
        }
    }
}
