//! # SSTable — sorted, page-structured run files
//!
//! Immutable on-disk storage for the SiltKV engine. When the memtable
//! reaches its threshold the engine drains it, in ascending key order,
//! into one of these files; compaction merges two of them into a new one.
//! SSTables are *write-once, read-many* — never modified, only replaced.
//!
//! ## File layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ METADATA (24 bytes)                                        │
//! │   numEntries (i32) | numPages (i32)                        │
//! │   startingKey (i64) | endingKey (i64)                      │
//! ├────────────────────────────────────────────────────────────┤
//! │ BLOOM FILTER (4096 bytes, one byte per slot)               │
//! ├────────────────────────────────────────────────────────────┤
//! │ DATA PAGES (numPages x 4096 bytes, ascending key order)    │
//! │                                                            │
//! │   numEntries (i32) | startingKey (i64) | freeSpace (i32)   │
//! │   directory: (key i64, valueOffset i32) per entry          │
//! │   ...free space...                                         │
//! │   values: 8 bytes each, packed backward from the tail      │
//! ├────────────────────────────────────────────────────────────┤
//! │ B-TREE NODES (4096 bytes each, post-order)                 │
//! │                                                            │
//! │   keyCount (i32) | childCount (i32)                        │
//! │   (childOffset i64, key i64) per key                       │
//! │   trailing childOffset when childCount > keyCount          │
//! │   ...zero padding to 4096...                               │
//! │                                                            │
//! │   The ROOT is always the last 4096 bytes of the file.      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian and packed. Because children are
//! emitted before their parent, every child offset points backward in the
//! file; a descent ends when an offset lands inside the data-page region.
//!
//! ## Modules
//!
//! | Module      | Purpose                                              |
//! |-------------|------------------------------------------------------|
//! | [`format`]  | Bit-exact constants and the 24-byte metadata block   |
//! | [`page`]    | 4096-byte page builder and reader                    |
//! | `btree`     | Static B-tree built over page max-keys               |
//! | [`writer`]  | [`SstBuilder`] — assembles and atomically emits a file |
//! | [`reader`]  | [`SstReader`] — bloom probe, point lookups, range scan |
//! | [`merge`]   | Streaming 2-way merge for compaction                 |

pub mod format;
pub mod merge;
pub mod page;
pub mod reader;
pub mod writer;

mod btree;

pub use merge::merge_ssts;
pub use reader::SstReader;
pub use writer::SstBuilder;

use thiserror::Error;

/// Errors surfaced by the SSTable layer.
///
/// Corruption covers structurally impossible on-disk states: non-positive
/// page or entry counts, offsets outside their regions, directory slots
/// pointing outside the value tail. I/O failures pass through untouched.
/// The layer never attempts repair; callers abort the current operation.
#[derive(Debug, Error)]
pub enum Error {
    /// An underlying read, write, seek, or rename failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents violate the SSTable format.
    #[error("corrupt sstable: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
