//! Streaming 2-way merge of two SSTables, the compaction primitive.
//!
//! Both inputs are sorted, duplicate-free runs; the output is their
//! sorted union with the **newer** input winning on duplicate keys.
//! Callers pass the inputs in (older, newer) order — the level manager
//! guarantees it, because level lists append chronologically.
//!
//! When the output lands on the bottom level of the tree there is nothing
//! older left to shadow, so tombstones can be dropped; everywhere else
//! they are preserved to keep shadowing intact across further merges.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;

use memtable::TOMBSTONE;

use crate::format::{self, SstMeta, PAGE_SIZE, SST_METADATA_SIZE};
use crate::page::PageView;
use crate::writer::SstBuilder;
use crate::Result;

/// Sequentially decodes the entries of one SSTable, page by page.
///
/// Pages are read with plain `pread`, bypassing the buffer pool —
/// compaction touches every page exactly once, and spooling a dying
/// file's pages through the cache would only evict useful ones.
struct EntryCursor {
    file: File,
    num_pages: usize,
    next_page: usize,
    entries: Vec<(i64, i64)>,
    pos: usize,
}

impl EntryCursor {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut meta_buf = [0u8; SST_METADATA_SIZE as usize];
        file.read_exact_at(&mut meta_buf, 0)?;
        let meta = SstMeta::read_from(&mut &meta_buf[..])?;

        Ok(Self {
            file,
            num_pages: meta.num_pages as usize,
            next_page: 0,
            entries: Vec::new(),
            pos: 0,
        })
    }

    fn next(&mut self) -> Result<Option<(i64, i64)>> {
        while self.pos >= self.entries.len() {
            if self.next_page >= self.num_pages {
                return Ok(None);
            }
            self.load_page(self.next_page)?;
            self.next_page += 1;
        }
        let entry = self.entries[self.pos];
        self.pos += 1;
        Ok(Some(entry))
    }

    fn load_page(&mut self, index: usize) -> Result<()> {
        let mut buf = [0u8; PAGE_SIZE];
        self.file.read_exact_at(&mut buf, format::page_offset(index))?;
        self.entries = PageView::new(&buf)?.entries()?;
        self.pos = 0;
        Ok(())
    }
}

/// Merges `older` and `newer` into a new SSTable at `output`.
///
/// Returns `true` if the output file was written, `false` if every entry
/// was a dropped tombstone and no file was produced (the caller then
/// simply has nothing to register at the destination level).
///
/// # Errors
///
/// I/O or corruption errors from either input, or any write failure on
/// the output. Inputs are never modified here; the caller deletes them
/// only after a successful return.
pub fn merge_ssts(
    older: &Path,
    newer: &Path,
    output: &Path,
    drop_tombstones: bool,
) -> Result<bool> {
    let mut a = EntryCursor::open(older)?;
    let mut b = EntryCursor::open(newer)?;
    let mut builder = SstBuilder::new();

    let mut emit = |builder: &mut SstBuilder, key: i64, value: i64| {
        if drop_tombstones && value == TOMBSTONE {
            return;
        }
        builder.add(key, value);
    };

    let mut next_a = a.next()?;
    let mut next_b = b.next()?;
    loop {
        match (next_a, next_b) {
            (Some((ka, va)), Some((kb, vb))) => {
                if ka < kb {
                    emit(&mut builder, ka, va);
                    next_a = a.next()?;
                } else if kb < ka {
                    emit(&mut builder, kb, vb);
                    next_b = b.next()?;
                } else {
                    // Same key in both runs: the newer input wins.
                    emit(&mut builder, kb, vb);
                    next_a = a.next()?;
                    next_b = b.next()?;
                }
            }
            (Some((ka, va)), None) => {
                emit(&mut builder, ka, va);
                next_a = a.next()?;
            }
            (None, Some((kb, vb))) => {
                emit(&mut builder, kb, vb);
                next_b = b.next()?;
            }
            (None, None) => break,
        }
    }

    if builder.is_empty() {
        // Every surviving entry was a dropped tombstone. An SSTable with
        // zero pages is not representable, so report that no output
        // exists rather than writing a broken file.
        log::debug!(
            "merge of {} + {} produced no live entries",
            older.display(),
            newer.display()
        );
        return Ok(false);
    }

    builder.write_to(output)?;
    Ok(true)
}
