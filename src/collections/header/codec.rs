use super::{Header, SlotKind};
use crate::collections::raw::{OutOfMemory, RawBlock};
use crate::util::option::OptionExt;

/// Reads the header packed at the start of `block`.
///
/// The block must have been written by [`write_header`] or [`rebuild`]; anything else is a bug in
/// this crate.
pub fn read_header(block: &RawBlock) -> Header {
    // SAFETY: Blocks passed here always start with a header written by this module.
    unsafe { Header::decode(block.as_bytes()).assume_some() }
}

/// Decodes just the count of the header packed at the start of `block`.
pub fn read_count(block: &RawBlock) -> u64 {
    read_header(block).count()
}

/// Returns the kind of slots described by the header packed at the start of `block`.
pub fn type_of(block: &RawBlock) -> SlotKind {
    read_header(block).kind()
}

/// Overwrites the header packed at the start of `block` in place.
///
/// # Panics
/// Panics if `header` is wider than the header currently stored, which would overwrite the first
/// slot. Wider headers go through [`rebuild`].
pub fn write_header(block: &mut RawBlock, header: &Header) {
    let stored = read_header(block);
    assert_eq!(
        stored.width(),
        header.width(),
        "header width can only change through a rebuild"
    );
    header.encode_into(block.as_bytes_mut());
}

/// Moves the contents of `block` into a fresh block of `new_size` bytes, with `header` packed at the
/// front. The first `data_len` bytes of slot data are copied across; everything after them is
/// zero.
///
/// This is how a header promotion happens: the slots have to shift to make room for the wider
/// count, so the old block is discarded and the returned one takes its place.
///
/// # Errors
/// Returns [`OutOfMemory`] if the new block can't be allocated. `block` is untouched in that case.
///
/// # Panics
/// Panics if `new_size` can't hold the header and `data_len` bytes of data.
pub fn rebuild(
    block: &RawBlock,
    header: &Header,
    data_len: usize,
    new_size: usize,
) -> Result<RawBlock, OutOfMemory> {
    let old_offset = read_header(block).encoded_len();
    let new_offset = header.encoded_len();
    assert!(new_size >= new_offset + data_len, "rebuilt block too small for its contents");

    let mut fresh = RawBlock::allocate(new_size)?;
    let bytes = fresh.as_bytes_mut();
    header.encode_into(bytes);
    bytes[new_offset..new_offset + data_len]
        .copy_from_slice(&block.as_bytes()[old_offset..old_offset + data_len]);

    Ok(fresh)
}

/// Allocates a block holding a fresh, empty header of `kind` followed by `data_size` zeroed bytes.
///
/// # Errors
/// Returns [`OutOfMemory`] if the block can't be allocated.
pub fn allocate_with_header(
    kind: SlotKind,
    prealloc: bool,
    data_size: usize,
) -> Result<RawBlock, OutOfMemory> {
    let mut header = Header::new(kind);
    header.set_prealloc(prealloc);

    let size = data_size
        .checked_add(header.encoded_len())
        .ok_or(OutOfMemory { size: usize::MAX })?;
    let mut block = RawBlock::allocate(size)?;
    header.encode_into(block.as_bytes_mut());

    Ok(block)
}

