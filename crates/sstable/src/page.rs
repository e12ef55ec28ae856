//! The 4096-byte data page: builder for the write path, view for reads.
//!
//! A page stores its directory of `(key, valueOffset)` slots right after
//! the 16-byte header, sorted ascending by key, while the 8-byte values
//! pack backward from the page tail — the i-th stored value occupies
//! `[PAGE_SIZE - 8*(i+1), PAGE_SIZE - 8*i)`. Directory and tail meet in
//! the middle; the free-space counter tracks the gap.

use byteorder::{ByteOrder, LittleEndian};

use crate::format::PAGE_SIZE;
use crate::{Error, Result};

/// Header: numEntries (i32) | startingKey (i64) | freeSpace (i32).
pub const PAGE_HEADER_SIZE: usize = 16;
/// Directory slot: key (i64) + valueOffset (i32).
const DIR_SLOT_SIZE: usize = 12;
/// Full cost of one entry: directory slot + tail value.
pub const ENTRY_SIZE: usize = 20;
/// Hard cap on entries per page: (4096 - 16) / 20.
pub const MAX_ENTRIES_PER_PAGE: usize = (PAGE_SIZE - PAGE_HEADER_SIZE) / ENTRY_SIZE;

/// A raw page buffer.
pub type PageBuf = [u8; PAGE_SIZE];

/// Builds one page from entries fed in ascending key order.
pub struct PageBuilder {
    buf: Box<PageBuf>,
    num_entries: usize,
    starting_key: i64,
    last_key: i64,
    free_space: usize,
}

impl Default for PageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PageBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Box::new([0u8; PAGE_SIZE]),
            num_entries: 0,
            starting_key: 0,
            last_key: 0,
            free_space: PAGE_SIZE - PAGE_HEADER_SIZE,
        }
    }

    /// Appends an entry if its 20 bytes fit, returning whether it was
    /// accepted. The first accepted entry fixes the page's starting key.
    ///
    /// Callers feed keys in ascending order (memtable drain and merge are
    /// both monotonic); the directory stays sorted by construction.
    pub fn add_entry(&mut self, key: i64, value: i64) -> bool {
        if ENTRY_SIZE > self.free_space {
            return false;
        }
        debug_assert!(
            self.num_entries == 0 || key > self.last_key,
            "page entries must arrive in ascending key order"
        );

        if self.num_entries == 0 {
            self.starting_key = key;
        }

        let dir_off = PAGE_HEADER_SIZE + self.num_entries * DIR_SLOT_SIZE;
        let value_off = PAGE_SIZE - 8 * (self.num_entries + 1);
        LittleEndian::write_i64(&mut self.buf[dir_off..dir_off + 8], key);
        LittleEndian::write_i32(&mut self.buf[dir_off + 8..dir_off + 12], value_off as i32);
        LittleEndian::write_i64(&mut self.buf[value_off..value_off + 8], value);

        self.num_entries += 1;
        self.last_key = key;
        self.free_space -= ENTRY_SIZE;
        true
    }

    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    #[must_use]
    pub fn starting_key(&self) -> i64 {
        self.starting_key
    }

    /// Largest key accepted so far — the page's B-tree index key.
    #[must_use]
    pub fn last_key(&self) -> Option<i64> {
        (self.num_entries > 0).then_some(self.last_key)
    }

    /// Seals the header and yields the raw 4096-byte page.
    #[must_use]
    pub fn finish(mut self) -> Box<PageBuf> {
        LittleEndian::write_i32(&mut self.buf[0..4], self.num_entries as i32);
        LittleEndian::write_i64(&mut self.buf[4..12], self.starting_key);
        LittleEndian::write_i32(&mut self.buf[12..16], self.free_space as i32);
        self.buf
    }
}

/// Read-only view over a 4096-byte page buffer.
pub struct PageView<'a> {
    buf: &'a [u8],
    num_entries: usize,
}

impl<'a> PageView<'a> {
    /// Wraps a buffer, validating the entry count up front.
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        if buf.len() != PAGE_SIZE {
            return Err(Error::Corrupt(format!(
                "page buffer is {} bytes, expected {}",
                buf.len(),
                PAGE_SIZE
            )));
        }
        let n = LittleEndian::read_i32(&buf[0..4]);
        if n <= 0 || n as usize > MAX_ENTRIES_PER_PAGE {
            return Err(Error::Corrupt(format!("invalid page entry count {}", n)));
        }
        Ok(Self {
            buf,
            num_entries: n as usize,
        })
    }

    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    #[must_use]
    pub fn starting_key(&self) -> i64 {
        LittleEndian::read_i64(&self.buf[4..12])
    }

    #[must_use]
    pub fn free_space(&self) -> i32 {
        LittleEndian::read_i32(&self.buf[12..16])
    }

    /// Key of directory slot `i`.
    #[must_use]
    pub fn key_at(&self, i: usize) -> i64 {
        let off = PAGE_HEADER_SIZE + i * DIR_SLOT_SIZE;
        LittleEndian::read_i64(&self.buf[off..off + 8])
    }

    /// Dereferences directory slot `i` into its tail value.
    ///
    /// # Errors
    ///
    /// [`Error::Corrupt`] if the slot's offset points outside the value
    /// tail region.
    pub fn value_at(&self, i: usize) -> Result<i64> {
        let off = PAGE_HEADER_SIZE + i * DIR_SLOT_SIZE;
        let value_off = LittleEndian::read_i32(&self.buf[off + 8..off + 12]);

        let tail_start = PAGE_SIZE - 8 * self.num_entries;
        if value_off < tail_start as i32 || value_off as usize + 8 > PAGE_SIZE {
            return Err(Error::Corrupt(format!(
                "directory slot {} has value offset {} outside tail region",
                i, value_off
            )));
        }
        let value_off = value_off as usize;
        Ok(LittleEndian::read_i64(&self.buf[value_off..value_off + 8]))
    }

    /// Binary search on the sorted directory.
    pub fn search(&self, key: i64) -> Result<Option<i64>> {
        let mut lo = 0usize;
        let mut hi = self.num_entries;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let k = self.key_at(mid);
            if k == key {
                return Ok(Some(self.value_at(mid)?));
            } else if k < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(None)
    }

    /// Appends all entries with `start <= key <= end` to `out`, in
    /// directory order. Returns `false` once a key above `end` is seen —
    /// the caller can stop walking subsequent pages.
    pub fn collect_range(
        &self,
        start: i64,
        end: i64,
        out: &mut Vec<(i64, i64)>,
    ) -> Result<bool> {
        for i in 0..self.num_entries {
            let k = self.key_at(i);
            if k > end {
                return Ok(false);
            }
            if k >= start {
                out.push((k, self.value_at(i)?));
            }
        }
        Ok(true)
    }

    /// Decodes every entry in the page (used by the compaction merge).
    pub fn entries(&self) -> Result<Vec<(i64, i64)>> {
        let mut out = Vec::with_capacity(self.num_entries);
        for i in 0..self.num_entries {
            out.push((self.key_at(i), self.value_at(i)?));
        }
        Ok(out)
    }
}
