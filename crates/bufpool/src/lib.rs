//! # Buffer pool — fixed-capacity page cache
//!
//! A process-wide cache of 4096-byte pages read from SSTable files, with
//! CLOCK (second-chance) replacement. Every SSTable read path asks the
//! pool before touching the file, so hot pages — B-tree roots above all —
//! are served from memory.
//!
//! ## Page identity
//!
//! Pages are keyed by `"<sst-path>:<byte-offset>"`. SSTable files are
//! immutable and deleted files' names are never reused, so a cached page
//! can go stale only in the harmless sense of belonging to a file nobody
//! will ask about again; it ages out via the clock hand.
//!
//! ## Replacement
//!
//! Frames form a ring with a hand index (the flat-array equivalent of a
//! circular list). A hit or re-insert sets the frame's reference bit.
//! When the pool is full, the hand sweeps forward clearing set bits and
//! evicts the first frame whose bit is already clear, then the new page
//! takes that frame in place.
//!
//! ## Sharing
//!
//! One pool per process, behind a `Mutex` ([`global`]). The engine is
//! single-threaded, so the lock is uncontended; it exists to give the
//! read paths interior mutability through `&self`.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// Size of every cached payload.
pub const PAGE_SIZE: usize = 4096;

/// Number of frames in the process-wide pool.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A raw page payload.
pub type PageBuf = [u8; PAGE_SIZE];

struct Frame {
    page_id: String,
    payload: Box<PageBuf>,
    referenced: bool,
}

/// Fixed-capacity page cache with clock eviction.
pub struct BufferPool {
    frames: Vec<Frame>,
    /// page_id → frame index. Kept in lockstep with `frames`.
    map: HashMap<String, usize>,
    hand: usize,
    capacity: usize,
}

impl BufferPool {
    /// Creates an empty pool holding at most `capacity` pages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer pool capacity must be positive");
        Self {
            frames: Vec::with_capacity(capacity),
            map: HashMap::with_capacity(capacity),
            hand: 0,
            capacity,
        }
    }

    /// Looks up a cached page, marking it recently used on a hit.
    pub fn get(&mut self, page_id: &str) -> Option<&PageBuf> {
        let &idx = self.map.get(page_id)?;
        let frame = &mut self.frames[idx];
        frame.referenced = true;
        log::trace!("bufpool hit: {}", page_id);
        Some(&frame.payload)
    }

    /// Caches `payload` under `page_id`.
    ///
    /// If the page is already cached only its reference bit is refreshed.
    /// If the pool is full a victim frame is chosen by the clock sweep and
    /// replaced in place.
    pub fn insert(&mut self, page_id: &str, payload: &PageBuf) {
        if let Some(&idx) = self.map.get(page_id) {
            self.frames[idx].referenced = true;
            return;
        }

        if self.frames.len() < self.capacity {
            self.map.insert(page_id.to_string(), self.frames.len());
            self.frames.push(Frame {
                page_id: page_id.to_string(),
                payload: Box::new(*payload),
                referenced: true,
            });
            return;
        }

        let victim = self.sweep();
        log::trace!(
            "bufpool evict: {} for {}",
            self.frames[victim].page_id,
            page_id
        );
        self.map.remove(&self.frames[victim].page_id);
        self.map.insert(page_id.to_string(), victim);
        let frame = &mut self.frames[victim];
        frame.page_id = page_id.to_string();
        *frame.payload = *payload;
        frame.referenced = true;
        // Leave the hand on the slot after the victim.
        self.hand = (victim + 1) % self.frames.len();
    }

    /// Advances the hand, clearing reference bits, until it finds a frame
    /// whose bit is already clear. Terminates: a full sweep clears every
    /// bit.
    fn sweep(&mut self) -> usize {
        loop {
            let idx = self.hand;
            if self.frames[idx].referenced {
                self.frames[idx].referenced = false;
                self.hand = (idx + 1) % self.frames.len();
            } else {
                return idx;
            }
        }
    }

    /// Number of pages currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns whether `page_id` is cached, without touching its bit.
    #[must_use]
    pub fn contains(&self, page_id: &str) -> bool {
        self.map.contains_key(page_id)
    }

    /// Drops every cached page. Correctness never depends on pool
    /// contents, so this is always safe.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.map.clear();
        self.hand = 0;
    }
}

/// The process-wide pool shared by every SSTable read path.
pub fn global() -> &'static Mutex<BufferPool> {
    static POOL: OnceLock<Mutex<BufferPool>> = OnceLock::new();
    POOL.get_or_init(|| Mutex::new(BufferPool::new(DEFAULT_CAPACITY)))
}

#[cfg(test)]
mod tests;
