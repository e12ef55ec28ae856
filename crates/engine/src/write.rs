//! Write path: `put()`, `del()`, and the memtable flush.

use anyhow::{ensure, Context, Result};

use memtable::TOMBSTONE;
use sstable::SstBuilder;

use crate::Engine;

impl Engine {
    /// Inserts a key-value pair.
    ///
    /// The value [`TOMBSTONE`](memtable::TOMBSTONE) is reserved and
    /// rejected; deletes go through [`del`](Engine::del). When the
    /// memtable's put count reaches the configured capacity the memtable
    /// is flushed to a new level-0 SSTable, which may cascade
    /// compactions.
    pub fn put(&mut self, key: i64, value: i64) -> Result<()> {
        ensure!(
            value != TOMBSTONE,
            "value {} is reserved as the delete marker",
            TOMBSTONE
        );
        self.mem.put(key, value);
        if self.mem.len() >= self.memtable_capacity {
            self.flush_memtable()?;
        }
        Ok(())
    }

    /// Deletes a key by writing a tombstone.
    ///
    /// The tombstone shadows any older value of the key in the SSTables
    /// and counts toward the flush threshold like any other put.
    pub fn del(&mut self, key: i64) -> Result<()> {
        self.mem.put(key, TOMBSTONE);
        if self.mem.len() >= self.memtable_capacity {
            self.flush_memtable()?;
        }
        Ok(())
    }

    /// Forces a flush of the current memtable; a no-op when empty.
    pub fn flush(&mut self) -> Result<()> {
        if self.mem.is_empty() {
            return Ok(());
        }
        self.flush_memtable()
    }

    /// Drains the memtable, in ascending key order, into
    /// `sst_<counter>.sst` and registers it at level 0.
    fn flush_memtable(&mut self) -> Result<()> {
        self.sst_counter += 1;
        let name = format!("sst_{}.sst", self.sst_counter);
        let path = self.db_dir.join(&name);

        let mut builder = SstBuilder::new();
        for (key, value) in self.mem.iter() {
            builder.add(key, value);
        }
        let entries = builder.num_entries();
        builder
            .write_to(&path)
            .with_context(|| format!("flushing memtable to {}", path.display()))?;

        log::debug!("flushed {} entries to {}", entries, path.display());
        self.mem.clear();

        self.lsm
            .add_sst(path.to_string_lossy().into_owned())
            .context("registering flushed sstable")?;
        Ok(())
    }
}
