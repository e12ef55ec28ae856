//! Assembles an SSTable in memory and emits it atomically.

use std::fs::{rename, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use bloom::BloomFilter;

use crate::btree::BTree;
use crate::format::{self, SstMeta, BITS_PER_ENTRY, BTREE_DEGREE, NUM_ENTRIES};
use crate::page::{PageBuf, PageBuilder};
use crate::{Error, Result};

/// Accumulates entries (fed in ascending key order) into pages, a bloom
/// filter, and a page-index B-tree, then writes the whole file in one
/// pass: metadata, bloom page, data pages, post-order B-tree.
///
/// The write goes to a `.tmp` sibling which is fsynced and renamed into
/// place, so a file either exists completely or not at all.
pub struct SstBuilder {
    pages: Vec<Box<PageBuf>>,
    current: PageBuilder,
    bloom: BloomFilter,
    btree: BTree,
    num_entries: usize,
    starting_key: i64,
    ending_key: i64,
}

impl Default for SstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SstBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: PageBuilder::new(),
            bloom: BloomFilter::new(NUM_ENTRIES, BITS_PER_ENTRY),
            btree: BTree::new(BTREE_DEGREE),
            num_entries: 0,
            starting_key: 0,
            ending_key: 0,
        }
    }

    /// Appends one entry. Keys must arrive in strictly ascending order
    /// (the memtable drain and the compaction merge both guarantee this).
    pub fn add(&mut self, key: i64, value: i64) {
        debug_assert!(
            self.num_entries == 0 || key > self.ending_key,
            "sstable entries must arrive in ascending key order"
        );

        if self.num_entries == 0 {
            self.starting_key = key;
        }
        self.ending_key = key;
        self.num_entries += 1;
        self.bloom.insert(key);

        if !self.current.add_entry(key, value) {
            self.seal_current_page();
            let accepted = self.current.add_entry(key, value);
            debug_assert!(accepted, "an empty page accepts any entry");
        }
    }

    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    fn seal_current_page(&mut self) {
        let max_key = self
            .current
            .last_key()
            .expect("only non-empty pages are sealed");
        let offset = format::page_offset(self.pages.len());
        self.btree.insert(max_key, offset as i64);
        let page = std::mem::replace(&mut self.current, PageBuilder::new()).finish();
        self.pages.push(page);
    }

    /// Writes the finished SSTable to `path`.
    ///
    /// # Errors
    ///
    /// [`Error::Corrupt`] if no entries were added; [`Error::Io`] on any
    /// write, sync, or rename failure (the `.tmp` file may remain and is
    /// harmless — it is truncated on the next attempt).
    pub fn write_to(mut self, path: &Path) -> Result<()> {
        if !self.current.is_empty() {
            self.seal_current_page();
        }
        if self.pages.is_empty() {
            return Err(Error::Corrupt("refusing to write an empty sstable".into()));
        }

        let meta = SstMeta {
            num_entries: self.num_entries as i32,
            num_pages: self.pages.len() as i32,
            starting_key: self.starting_key,
            ending_key: self.ending_key,
        };

        let tmp_path = path.with_extension("sst.tmp");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut w = BufWriter::new(file);

        meta.write_to(&mut w)?;
        w.write_all(self.bloom.as_bytes())?;
        for page in &self.pages {
            w.write_all(&page[..])?;
        }
        let tree_start = format::page_region_end(self.pages.len());
        let tree_nodes = self.btree.write_post_order(&mut w, tree_start)?;

        w.flush()?;
        w.get_ref().sync_all()?;
        drop(w);

        rename(&tmp_path, path)?;

        log::debug!(
            "wrote sstable {} ({} entries, {} pages, {} tree nodes)",
            path.display(),
            self.num_entries,
            self.pages.len(),
            tree_nodes
        );
        Ok(())
    }
}
