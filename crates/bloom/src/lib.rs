//! # Bloom Filter
//!
//! A space-efficient probabilistic data structure for set membership
//! testing over integer keys.
//!
//! A bloom filter can tell you with certainty that a key is **not** in the
//! set (no false negatives), but may occasionally report that a key **is**
//! in the set when it isn't (false positives).
//!
//! ## Usage in SiltKV
//!
//! Each SSTable embeds one filter, sized to exactly one 4096-byte page so
//! it occupies a fixed slot in the file right after the metadata block.
//! During point lookups the engine checks the filter first — a negative
//! result skips the SSTable entirely, avoiding page reads.
//!
//! The slot vector spends a whole byte per slot (nonzero = set): wasteful
//! as bloom filters go, but it makes the on-disk page trivially
//! inspectable and the serialisation a straight memcpy of the array.
//!
//! ## Example
//!
//! ```rust
//! use bloom::BloomFilter;
//!
//! let mut bf = BloomFilter::new(340, 12);
//! bf.insert(42);
//! assert!(bf.query(42));
//! ```

/// Serialized filter size: one page, one byte per slot.
pub const FILTER_BYTES: usize = 4096;

/// Number of one-byte slots in the filter.
const NUM_SLOTS: u64 = FILTER_BYTES as u64;

/// A page-sized bloom filter over `i64` keys with `k` derived hash
/// functions.
///
/// Uses double hashing: `slot(i) = (h1 + i * h2) mod NUM_SLOTS` where
/// `h1 = mix64(key)` and `h2 = mix64(h1)`.
pub struct BloomFilter {
    /// One byte per slot; nonzero = set.
    slots: Box<[u8; FILTER_BYTES]>,
    /// Number of hash functions (k).
    num_hashes: u32,
}

impl BloomFilter {
    /// Creates an empty filter for roughly `expected_entries` keys at
    /// `bits_per_entry` bits each.
    ///
    /// The slot vector is fixed at one page; `k = max(1, round(b * ln 2))`.
    /// With the engine defaults (340 entries, 12 bits) that is k = 8 and a
    /// comfortably under-full page.
    #[must_use]
    pub fn new(expected_entries: usize, bits_per_entry: usize) -> Self {
        debug_assert!(
            expected_entries * bits_per_entry <= FILTER_BYTES,
            "filter sized for at most {} entry-bits",
            FILTER_BYTES
        );
        let k = (bits_per_entry as f64 * std::f64::consts::LN_2).round() as u32;
        Self {
            slots: Box::new([0u8; FILTER_BYTES]),
            num_hashes: k.max(1),
        }
    }

    /// Rebuilds a filter from the raw page read out of an SSTable.
    #[must_use]
    pub fn from_bytes(bytes: [u8; FILTER_BYTES], bits_per_entry: usize) -> Self {
        let k = (bits_per_entry as f64 * std::f64::consts::LN_2).round() as u32;
        Self {
            slots: Box::new(bytes),
            num_hashes: k.max(1),
        }
    }

    /// Sets all k slots for `key`.
    pub fn insert(&mut self, key: i64) {
        let (h1, h2) = hash_pair(key);
        for i in 0..self.num_hashes {
            let slot = slot_index(h1, h2, i);
            self.slots[slot] = 1;
        }
    }

    /// Returns `false` if `key` is definitely absent, `true` if it might
    /// be present. Aborts on the first clear slot.
    #[must_use]
    pub fn query(&self, key: i64) -> bool {
        let (h1, h2) = hash_pair(key);
        for i in 0..self.num_hashes {
            if self.slots[slot_index(h1, h2, i)] == 0 {
                return false;
            }
        }
        true
    }

    /// The raw page written verbatim into the SSTable.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; FILTER_BYTES] {
        &self.slots
    }

    /// Number of hash functions.
    #[must_use]
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = self.slots.iter().filter(|&&b| b != 0).count();
        f.debug_struct("BloomFilter")
            .field("num_hashes", &self.num_hashes)
            .field("slots_set", &set)
            .finish()
    }
}

/// Primary and secondary hash for double hashing.
fn hash_pair(key: i64) -> (u64, u64) {
    let h1 = mix64(key as u64);
    let h2 = mix64(h1);
    (h1, h2)
}

fn slot_index(h1: u64, h2: u64, i: u32) -> usize {
    (h1.wrapping_add((i as u64).wrapping_mul(h2)) % NUM_SLOTS) as usize
}

/// 64-bit integer mixer (Wang-style shift/multiply avalanche).
fn mix64(mut key: u64) -> u64 {
    key = (!key).wrapping_add(key << 21);
    key ^= key >> 24;
    key = key.wrapping_add(key << 3).wrapping_add(key << 8);
    key ^= key >> 14;
    key = key.wrapping_add(key << 2).wrapping_add(key << 4);
    key ^= key >> 28;
    key = key.wrapping_add(key << 31);
    key
}
