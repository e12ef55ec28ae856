//! Bit-exact layout constants and the SSTable metadata block.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::{Error, Result};

/// Unit of file I/O and in-file indexing.
pub const PAGE_SIZE: usize = 4096;

/// Size of the metadata block at the head of every SSTable.
pub const SST_METADATA_SIZE: u64 = 24;

/// Minimum degree `t` of the in-file B-tree. Nodes hold between `t - 1`
/// and `2t - 1` keys; with t = 128 a full internal node (255 keys, 256
/// child offsets) serialises to exactly one page.
pub const BTREE_DEGREE: usize = 128;

/// Bloom filter budget per entry, in bits.
pub const BITS_PER_ENTRY: usize = 12;

/// Bloom filter sizing target: expected entries per SSTable.
pub const NUM_ENTRIES: usize = 340;

/// Byte offset of page `index` within an SSTable (pages sit behind the
/// metadata block and the bloom page, at fixed 4096-byte slots).
#[must_use]
pub fn page_offset(index: usize) -> u64 {
    SST_METADATA_SIZE + PAGE_SIZE as u64 + (index as u64) * PAGE_SIZE as u64
}

/// First byte of the data-page region.
#[must_use]
pub fn page_region_start() -> u64 {
    SST_METADATA_SIZE + PAGE_SIZE as u64
}

/// One past the last byte of the data-page region.
#[must_use]
pub fn page_region_end(num_pages: usize) -> u64 {
    page_region_start() + (num_pages as u64) * PAGE_SIZE as u64
}

/// The 24-byte metadata block: entry and page counts plus the key range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SstMeta {
    pub num_entries: i32,
    pub num_pages: i32,
    pub starting_key: i64,
    pub ending_key: i64,
}

impl SstMeta {
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_i32::<LittleEndian>(self.num_entries)?;
        w.write_i32::<LittleEndian>(self.num_pages)?;
        w.write_i64::<LittleEndian>(self.starting_key)?;
        w.write_i64::<LittleEndian>(self.ending_key)?;
        Ok(())
    }

    /// Reads and validates a metadata block.
    ///
    /// # Errors
    ///
    /// [`Error::Corrupt`] on non-positive counts or an inverted key range.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let num_entries = r.read_i32::<LittleEndian>()?;
        let num_pages = r.read_i32::<LittleEndian>()?;
        let starting_key = r.read_i64::<LittleEndian>()?;
        let ending_key = r.read_i64::<LittleEndian>()?;

        if num_pages <= 0 {
            return Err(Error::Corrupt(format!(
                "sstable has no pages (numPages = {})",
                num_pages
            )));
        }
        if num_entries <= 0 {
            return Err(Error::Corrupt(format!(
                "sstable has no entries (numEntries = {})",
                num_entries
            )));
        }
        if starting_key > ending_key {
            return Err(Error::Corrupt(format!(
                "inverted key range: {} > {}",
                starting_key, ending_key
            )));
        }

        Ok(Self {
            num_entries,
            num_pages,
            starting_key,
            ending_key,
        })
    }
}
