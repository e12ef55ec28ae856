//! Read path: `get()` and `scan()`.
//!
//! Point lookups check the memtable first (freshest data, including
//! tombstones), then every level from 0 upward; **within a level the SSTs
//! are probed newest-first**, so a flush that overwrote a key before
//! compaction caught up still wins. The first SST that yields the key is
//! authoritative; a tombstone there hides every older value.
//!
//! Range scans merge the memtable and all levels in the same priority
//! order: the first occurrence of each key wins, tombstone occurrences
//! suppress the key entirely, and the result comes out ascending.

use anyhow::{ensure, Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use memtable::TOMBSTONE;
use sstable::SstReader;

use crate::Engine;

impl Engine {
    /// Looks up a key. `Ok(None)` means absent — never written, or
    /// shadowed by a tombstone.
    ///
    /// Per SST: bloom probe first, then B-tree descent or binary page
    /// search depending on the engine's mode flag.
    ///
    /// # Errors
    ///
    /// I/O failure or corruption in any probed SSTable.
    pub fn get(&self, key: i64) -> Result<Option<i64>> {
        if let Some(value) = self.mem.get(key) {
            return Ok((value != TOMBSTONE).then_some(value));
        }

        for level in 0..self.lsm.num_levels() {
            // Newest-first within the level: lists append chronologically.
            for path in self.lsm.level_files(level).iter().rev() {
                let reader = SstReader::open(Path::new(path))
                    .with_context(|| format!("opening {}", path))?;
                if !reader.might_contain(key) {
                    continue;
                }

                let hit = if self.use_btree {
                    reader.get_btree(key)
                } else {
                    reader.get_binary(key)
                }
                .with_context(|| format!("searching {}", path))?;

                if let Some(value) = hit {
                    return Ok((value != TOMBSTONE).then_some(value));
                }
            }
        }
        Ok(None)
    }

    /// Returns all live entries with `start <= key <= end`, ascending.
    ///
    /// # Errors
    ///
    /// Rejects `start > end` without side effects; otherwise I/O failure
    /// or corruption in any scanned SSTable.
    pub fn scan(&self, start: i64, end: i64) -> Result<Vec<(i64, i64)>> {
        ensure!(
            start <= end,
            "invalid scan range: start {} > end {}",
            start,
            end
        );

        // First occurrence of a key wins; tombstone occurrences claim the
        // key without producing output.
        let mut seen: HashSet<i64> = HashSet::new();
        let mut live: BTreeMap<i64, i64> = BTreeMap::new();

        for (key, value) in self.mem.scan(start, end) {
            seen.insert(key);
            if value != TOMBSTONE {
                live.insert(key, value);
            }
        }

        let mut entries = Vec::new();
        for level in 0..self.lsm.num_levels() {
            for path in self.lsm.level_files(level).iter().rev() {
                let reader = SstReader::open(Path::new(path))
                    .with_context(|| format!("opening {}", path))?;
                if reader.ending_key() < start || reader.starting_key() > end {
                    continue;
                }

                entries.clear();
                reader
                    .scan_range(start, end, &mut entries)
                    .with_context(|| format!("scanning {}", path))?;
                for &(key, value) in &entries {
                    if seen.insert(key) && value != TOMBSTONE {
                        live.insert(key, value);
                    }
                }
            }
        }

        Ok(live.into_iter().collect())
    }
}
