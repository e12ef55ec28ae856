//! # Engine — the SiltKV storage engine facade
//!
//! Ties the [`memtable`], [`sstable`], and buffer-pool crates together
//! into a complete LSM-tree key-value store over `i64` keys and values.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → Memtable insert                    │
//! │              |                                │
//! │              |  (put count >= capacity?)      │
//! │              |            yes                 │
//! │              v                                │
//! │           flush → new level-0 SSTable         │
//! │              |                                │
//! │              |  (level reached ratio R?)      │
//! │              |            yes                 │
//! │              v                                │
//! │           compaction cascade (levels.rs)      │
//! │                                               │
//! │ read.rs → Memtable → level 0 → level 1 → …    │
//! │            (newest first, first match wins)   │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module        | Purpose                                            |
//! |---------------|----------------------------------------------------|
//! | `lib.rs`      | `Engine` struct, open/close, accessors, `Drop`     |
//! | [`levels`]    | Per-level SST lists, tiered compaction cascade     |
//! | [`metalog`]   | `lsmtree.log` replay and atomic rewrite            |
//! | `write.rs`    | `put()`, `del()`, `flush()`                        |
//! | `read.rs`     | `get()`, `scan()`                                  |
//!
//! ## Durability model
//!
//! SSTables are atomic (temp file + rename) and the metadata log is
//! rewritten atomically on close, so a database that was closed cleanly
//! always reopens to the exact same live contents. There is no
//! write-ahead log: writes still sitting in the memtable when the
//! process dies are gone.

pub mod levels;
pub mod metalog;

mod read;
mod write;

use anyhow::{ensure, Context, Result};
use std::path::{Path, PathBuf};

use levels::LsmTree;
use memtable::Memtable;

pub use memtable::{Key, Value, TOMBSTONE};

/// Memtable put-count threshold used when the caller does not specify one.
pub const DEFAULT_MEMTABLE_CAPACITY: usize = 1024;

/// Runs per level before compaction triggers.
pub const DEFAULT_LEVEL_SIZE_RATIO: usize = 2;

/// The storage engine: one memtable, one LSM tree, one directory.
///
/// Single-threaded: callers serialise access externally. Every operation
/// observes strict program order.
pub struct Engine {
    pub(crate) mem: Memtable,
    pub(crate) lsm: LsmTree,
    pub(crate) db_dir: PathBuf,
    /// Put-count threshold that triggers a memtable flush.
    pub(crate) memtable_capacity: usize,
    /// Monotonic suffix for flushed SST filenames; survives close/open
    /// via the metadata log.
    pub(crate) sst_counter: u64,
    /// Point-lookup strategy inside SSTables: B-tree descent when true,
    /// binary page search when false. Scans always use the B-tree.
    pub(crate) use_btree: bool,
    closed: bool,
}

impl Engine {
    /// Opens (or creates) the database directory at `db_dir`.
    ///
    /// A missing directory is created empty. An existing directory is
    /// replayed from its metadata log: the first line restores the SST
    /// suffix counter, the rest re-register every live SST at its level.
    /// A directory without a log opens empty — its SSTs, if any, were
    /// never published by a clean close.
    ///
    /// # Errors
    ///
    /// Directory creation failure, or a present-but-corrupt metadata log.
    pub fn open<P: AsRef<Path>>(db_dir: P, memtable_capacity: usize) -> Result<Self> {
        ensure!(memtable_capacity > 0, "memtable capacity must be positive");
        let db_dir = db_dir.as_ref().to_path_buf();

        if !db_dir.exists() {
            std::fs::create_dir_all(&db_dir)
                .with_context(|| format!("creating database directory {}", db_dir.display()))?;
            log::info!("created database directory {}", db_dir.display());
        }

        let mut lsm = LsmTree::new(DEFAULT_LEVEL_SIZE_RATIO);
        let mut sst_counter = 0;
        match metalog::read(&db_dir)
            .with_context(|| format!("replaying metadata log in {}", db_dir.display()))?
        {
            Some(metalog::MetaLog { counter, entries }) => {
                sst_counter = counter;
                let count = entries.len();
                for (level, path) in entries {
                    lsm.add_sst_to_level(path, level);
                }
                log::info!(
                    "reconstructed lsm tree from metadata log: {} ssts, counter {}",
                    count,
                    sst_counter
                );
            }
            None => log::info!("no metadata log in {}, starting empty", db_dir.display()),
        }

        Ok(Self {
            mem: Memtable::new(),
            lsm,
            db_dir,
            memtable_capacity,
            sst_counter,
            use_btree: false,
            closed: false,
        })
    }

    /// Flushes any buffered writes, atomically rewrites the metadata log
    /// with the counter and every live `(level, filename)` pair, and
    /// clears the in-memory state. Files on disk remain.
    pub fn close(&mut self) -> Result<()> {
        if !self.mem.is_empty() {
            self.flush()?;
        }
        metalog::write(&self.db_dir, self.sst_counter, self.lsm.iter_files())?;
        self.mem.clear();
        self.lsm.clear();
        self.closed = true;
        Ok(())
    }

    /// Switches point lookups between B-tree descent (`true`) and binary
    /// page search (`false`).
    pub fn set_use_btree(&mut self, flag: bool) {
        self.use_btree = flag;
    }

    #[must_use]
    pub fn use_btree(&self) -> bool {
        self.use_btree
    }

    #[must_use]
    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    #[must_use]
    pub fn memtable_capacity(&self) -> usize {
        self.memtable_capacity
    }

    /// Adjusts the flush threshold (takes effect on the next put).
    pub fn set_memtable_capacity(&mut self, capacity: usize) {
        assert!(capacity > 0, "memtable capacity must be positive");
        self.memtable_capacity = capacity;
    }

    /// Adjusts the per-level compaction ratio for future flushes.
    pub fn set_level_size_ratio(&mut self, ratio: usize) {
        self.lsm.set_size_ratio(ratio);
    }

    /// Number of put calls buffered since the last flush.
    #[must_use]
    pub fn memtable_len(&self) -> usize {
        self.mem.len()
    }

    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.lsm.num_levels()
    }

    /// SST paths at `level`, oldest first.
    #[must_use]
    pub fn level_files(&self, level: usize) -> &[String] {
        self.lsm.level_files(level)
    }

    #[must_use]
    pub fn sstable_count(&self) -> usize {
        self.lsm.total_ssts()
    }

    #[must_use]
    pub fn sst_counter(&self) -> u64 {
        self.sst_counter
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("db_dir", &self.db_dir)
            .field("memtable_len", &self.mem.len())
            .field("memtable_capacity", &self.memtable_capacity)
            .field("num_levels", &self.lsm.num_levels())
            .field("sstable_count", &self.lsm.total_ssts())
            .field("sst_counter", &self.sst_counter)
            .field("use_btree", &self.use_btree)
            .finish()
    }
}

/// Best-effort close on drop.
///
/// Flushes buffered writes and publishes the metadata log so data is not
/// lost when the caller forgets to close. Errors are swallowed — Drop
/// cannot propagate them, and an explicit `close()` is the reliable path.
impl Drop for Engine {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests;
