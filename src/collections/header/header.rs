use derive_more::IsVariant;

use super::CountWidth;
use crate::util::option::OptionExt;

/// Bits 0 to 2 of the metadata byte: the count width code.
pub const WIDTH_MASK: u8 = 0x07;
/// Bit 6 of the metadata byte: the allocation has slack past the current count.
pub const PREALLOC_FLAG: u8 = 0x40;
/// Bit 7 of the metadata byte: slots hold nested containers rather than leaf elements.
pub const NESTED_FLAG: u8 = 0x80;

/// What a container's slots hold. Fixed for the lifetime of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum SlotKind {
    /// Fixed-size byte blobs, copied in and out by value.
    Leaf,
    /// Owned references to child containers.
    Nested,
}

/// The metadata stored in front of a container's element slots.
///
/// In memory, a Header is a width selector, a little-endian count buffer large enough for the
/// widest count and the two flags. Packed, it takes `1 + width.bytes()` bytes:
///
/// | Byte | Contents |
/// |-|-|
/// | `0` | width code (bits 0-2), prealloc (bit 6), nested (bit 7) |
/// | `1..=width` | count, little-endian |
///
/// The count always leaves headroom for one more increment, see [`CountWidth::for_count`]. A
/// count that wouldn't fit requires a promotion via [`Header::widened`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    width: CountWidth,
    count: [u8; 8],
    kind: SlotKind,
    prealloc: bool,
}

impl Header {
    /// The largest number of bytes a packed header can take.
    pub const MAX_ENCODED_LEN: usize = 1 + 8;

    /// Creates a header with a count of 0 at the narrowest width.
    pub const fn new(kind: SlotKind) -> Header {
        Header {
            width: CountWidth::U8,
            count: [0; 8],
            kind,
            prealloc: false,
        }
    }

    pub const fn width(&self) -> CountWidth {
        self.width
    }

    pub const fn kind(&self) -> SlotKind {
        self.kind
    }

    pub const fn prealloc(&self) -> bool {
        self.prealloc
    }

    pub const fn set_prealloc(&mut self, prealloc: bool) {
        self.prealloc = prealloc;
    }

    /// Returns the number of bytes this header takes once packed.
    pub const fn encoded_len(&self) -> usize {
        1 + self.width.bytes()
    }

    /// Decodes the count, reading only as many bytes as the width uses.
    pub fn count(&self) -> u64 {
        self.count[..self.width.bytes()]
            .iter()
            .rev()
            .fold(0, |acc, byte| (acc << 8) | u64::from(*byte))
    }

    /// Returns true if `count` can be stored without a promotion.
    pub const fn fits(&self, count: u64) -> bool {
        self.width.holds(count)
    }

    /// Overwrites the count in place.
    ///
    /// # Panics
    /// Panics if `count` doesn't fit the current width. Callers check [`Header::fits`] and promote
    /// first.
    pub fn set_count(&mut self, count: u64) {
        assert!(
            self.fits(count),
            "count {count} doesn't fit a header of width {:?}",
            self.width
        );
        self.count = count.to_le_bytes();
    }

    /// Returns a copy of this header reinterpreted at `width`. The count and flags are kept; the
    /// width never shrinks.
    pub fn widened(&self, width: CountWidth) -> Header {
        Header {
            width: width.max(self.width),
            ..*self
        }
    }

    /// Returns the width this header must be promoted to before storing `count`, or [`None`] if the
    /// current width already fits.
    pub fn promotion_for(&self, count: u64) -> Option<CountWidth> {
        if self.fits(count) {
            None
        } else {
            // SAFETY: A usize count plus one always fits in 8 bytes on supported targets.
            Some(unsafe { CountWidth::for_count(count).assume_some() })
        }
    }

    /// Builds the packed metadata byte.
    pub const fn meta_byte(&self) -> u8 {
        let mut meta = self.width.code();
        if self.prealloc {
            meta |= PREALLOC_FLAG;
        }
        if matches!(self.kind, SlotKind::Nested) {
            meta |= NESTED_FLAG;
        }
        meta
    }

    /// Writes the packed header to the start of `dst`.
    ///
    /// # Panics
    /// Panics if `dst` is shorter than [`Header::encoded_len`].
    pub fn encode_into(&self, dst: &mut [u8]) {
        let width = self.width.bytes();
        dst[0] = self.meta_byte();
        dst[1..=width].copy_from_slice(&self.count[..width]);
    }

    /// Reads a packed header from the start of `src`. Returns [`None`] if the metadata byte holds
    /// an unknown width code or `src` is too short for the width it names.
    pub fn decode(src: &[u8]) -> Option<Header> {
        let meta = *src.first()?;
        let width = CountWidth::from_code(meta & WIDTH_MASK)?;
        let bytes = src.get(1..=width.bytes())?;

        let mut count = [0; 8];
        count[..bytes.len()].copy_from_slice(bytes);

        Some(Header {
            width,
            count,
            kind: if meta & NESTED_FLAG != 0 { SlotKind::Nested } else { SlotKind::Leaf },
            prealloc: meta & PREALLOC_FLAG != 0,
        })
    }
}
