//! The LSM level manager: per-level SST file lists and tiered compaction.
//!
//! Each level is an append-ordered list of SST file paths — oldest first,
//! because flushes and merges push onto the back. Level 0 receives
//! memtable flushes; when a level's list reaches the size ratio R its two
//! runs are merged into a single SST one level down, which may cascade.
//!
//! ```text
//! level 0:  [sst_5]                <- newest flushes land here
//! level 1:  [sst_3_4]
//! level 2:  [sst_2_8]              <- bottom: may drop tombstones
//! ```
//!
//! File naming: flushes produce `sst_<counter>.sst`; a merge combines the
//! inputs' trailing numeric suffixes in ascending order, so merging
//! `sst_3.sst` and `sst_4.sst` yields `sst_3_4.sst`. The counter is
//! monotonic and a merge consumes the only live run ending in each of its
//! suffixes, so names never collide with live or future files.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

/// Per-level SST path lists plus the compaction trigger ratio.
#[derive(Debug)]
pub struct LsmTree {
    levels: Vec<Vec<String>>,
    size_ratio: usize,
}

impl LsmTree {
    /// An empty tree with just level 0 allocated.
    #[must_use]
    pub fn new(size_ratio: usize) -> Self {
        assert!(size_ratio >= 2, "level size ratio must be at least 2");
        Self {
            levels: vec![Vec::new()],
            size_ratio,
        }
    }

    #[must_use]
    pub fn size_ratio(&self) -> usize {
        self.size_ratio
    }

    /// Adjusts the compaction trigger for future flushes.
    pub fn set_size_ratio(&mut self, ratio: usize) {
        assert!(ratio >= 2, "level size ratio must be at least 2");
        self.size_ratio = ratio;
    }

    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// SST paths at `level`, oldest first. Empty for unallocated levels.
    #[must_use]
    pub fn level_files(&self, level: usize) -> &[String] {
        self.levels.get(level).map_or(&[], Vec::as_slice)
    }

    /// Every live SST as `(level, path)`, level by level.
    pub fn iter_files(&self) -> impl Iterator<Item = (usize, &str)> {
        self.levels
            .iter()
            .enumerate()
            .flat_map(|(level, files)| files.iter().map(move |f| (level, f.as_str())))
    }

    #[must_use]
    pub fn total_ssts(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Forgets all in-memory level state. Files on disk are untouched.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.levels.push(Vec::new());
    }

    /// Recovery path: re-registers a file at a level without triggering
    /// compaction. The metadata log is trusted as written.
    pub fn add_sst_to_level(&mut self, path: String, level: usize) {
        self.ensure_level(level);
        self.levels[level].push(path);
    }

    /// Registers a freshly flushed SST at level 0 and compacts if the
    /// level just filled.
    pub fn add_sst(&mut self, path: String) -> Result<()> {
        self.levels[0].push(path);
        if self.levels[0].len() == self.size_ratio {
            self.compact()?;
        }
        Ok(())
    }

    /// Runs the compaction cascade starting at level 0.
    pub fn compact(&mut self) -> Result<()> {
        self.merge_levels(0)
    }

    fn ensure_level(&mut self, level: usize) {
        while self.levels.len() <= level {
            self.levels.push(Vec::new());
        }
    }

    /// Merges the two runs of `level` into one SST at `level + 1`,
    /// recursing while destination levels keep filling.
    ///
    /// The first listed run is the older one; the merge resolves
    /// duplicate keys in favour of the second (newer). Tombstones are
    /// dropped only when the destination is the bottom level *and* holds
    /// no other run — if it did, dropping a tombstone would briefly
    /// un-shadow that run's older value for the same key.
    fn merge_levels(&mut self, level: usize) -> Result<()> {
        self.ensure_level(level + 1);
        if self.levels[level].len() != self.size_ratio {
            return Ok(());
        }

        let older = self.levels[level][0].clone();
        let newer = self.levels[level][1].clone();
        let target = level + 1;
        let drop_tombstones =
            target == self.levels.len() - 1 && self.levels[target].is_empty();

        let merged = self.merged_path(&older, &newer)?;
        log::debug!(
            "compacting level {}: {} + {} -> {} (drop_tombstones={})",
            level,
            older,
            newer,
            merged,
            drop_tombstones
        );

        let written = sstable::merge_ssts(
            Path::new(&older),
            Path::new(&newer),
            Path::new(&merged),
            drop_tombstones,
        )
        .with_context(|| format!("merging {} and {}", older, newer))?;

        // The output is fully on disk; only now do the inputs go away.
        fs::remove_file(&older).with_context(|| format!("deleting {}", older))?;
        fs::remove_file(&newer).with_context(|| format!("deleting {}", newer))?;
        self.levels[level].drain(..2);

        if written {
            self.levels[target].push(merged);
        }
        if self.levels[target].len() == self.size_ratio {
            self.merge_levels(target)?;
        }
        Ok(())
    }

    /// `<dir>/sst_<s1>_<s2>.sst` with the inputs' trailing numeric
    /// suffixes in ascending order.
    fn merged_path(&self, older: &str, newer: &str) -> Result<String> {
        let dir = Path::new(older)
            .parent()
            .ok_or_else(|| anyhow!("sst path {} has no parent directory", older))?;
        let s1 = trailing_suffix(older)?;
        let s2 = trailing_suffix(newer)?;
        let (lo, hi) = if s1 <= s2 { (s1, s2) } else { (s2, s1) };
        Ok(dir
            .join(format!("sst_{}_{}.sst", lo, hi))
            .to_string_lossy()
            .into_owned())
    }
}

/// Extracts the numeric component after the last underscore of an SST
/// file stem: `sst_7.sst` → 7, `sst_3_7.sst` → 7.
fn trailing_suffix(path: &str) -> Result<u64> {
    let stem = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("malformed sst path: {}", path))?;
    let last = stem
        .rsplit('_')
        .next()
        .ok_or_else(|| anyhow!("sst filename {} has no suffix", path))?;
    last.parse::<u64>()
        .with_context(|| format!("non-numeric sst suffix in {}", path))
}
