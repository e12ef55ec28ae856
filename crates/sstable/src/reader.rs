//! Point lookups and range scans over one SSTable file.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;

use bloom::BloomFilter;

use crate::btree::NodeView;
use crate::format::{self, SstMeta, BITS_PER_ENTRY, PAGE_SIZE, SST_METADATA_SIZE};
use crate::page::{PageBuf, PageView};
use crate::{Error, Result};

/// Reads an SSTable file.
///
/// [`open`](SstReader::open) validates the frame of the file and loads the
/// 24-byte metadata block plus the bloom page; everything else stays on
/// disk. All 4096-byte page and B-tree-node reads are positional
/// (`pread`) and routed through the process-wide buffer pool, keyed
/// `"<path>:<offset>"`, so repeated probes of the same file mostly hit
/// memory.
///
/// Two point-lookup strategies are offered; the engine picks one via its
/// mode flag:
///
/// * [`get_binary`](SstReader::get_binary) — binary search over the fixed
///   page slots by starting key, then binary search of the page
///   directory.
/// * [`get_btree`](SstReader::get_btree) — descend the in-file B-tree
///   from the root block at the file tail.
pub struct SstReader {
    /// Stringified path; buffer-pool key prefix and diagnostics.
    path: String,
    file: File,
    file_size: u64,
    meta: SstMeta,
    bloom: BloomFilter,
}

impl SstReader {
    /// Opens and validates an SSTable.
    ///
    /// # Errors
    ///
    /// [`Error::Corrupt`] if the file is too small for its own metadata,
    /// is not page-aligned, or claims more pages than it holds;
    /// [`Error::Io`] on open/read failure.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        // Smallest legal file: metadata + bloom + one page + root node.
        if file_size < SST_METADATA_SIZE + 3 * PAGE_SIZE as u64 {
            return Err(Error::Corrupt(format!(
                "sstable {} too small ({} bytes)",
                path.display(),
                file_size
            )));
        }
        if (file_size - SST_METADATA_SIZE) % PAGE_SIZE as u64 != 0 {
            return Err(Error::Corrupt(format!(
                "sstable {} is not page-aligned ({} bytes)",
                path.display(),
                file_size
            )));
        }

        let mut meta_buf = [0u8; SST_METADATA_SIZE as usize];
        file.read_exact_at(&mut meta_buf, 0)?;
        let meta = SstMeta::read_from(&mut &meta_buf[..])?;

        // Pages plus at least the root must fit behind the bloom page.
        if format::page_region_end(meta.num_pages as usize) + PAGE_SIZE as u64 > file_size {
            return Err(Error::Corrupt(format!(
                "sstable {} claims {} pages but holds {} bytes",
                path.display(),
                meta.num_pages,
                file_size
            )));
        }

        let mut bloom_buf = [0u8; PAGE_SIZE];
        file.read_exact_at(&mut bloom_buf, SST_METADATA_SIZE)?;
        let bloom = BloomFilter::from_bytes(bloom_buf, BITS_PER_ENTRY);

        Ok(Self {
            path: path.to_string_lossy().into_owned(),
            file,
            file_size,
            meta,
            bloom,
        })
    }

    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.meta.num_entries as usize
    }

    #[must_use]
    pub fn num_pages(&self) -> usize {
        self.meta.num_pages as usize
    }

    #[must_use]
    pub fn starting_key(&self) -> i64 {
        self.meta.starting_key
    }

    #[must_use]
    pub fn ending_key(&self) -> i64 {
        self.meta.ending_key
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bloom probe: `false` means the key is definitely not here.
    #[must_use]
    pub fn might_contain(&self, key: i64) -> bool {
        self.bloom.query(key)
    }

    /// Point lookup by binary search over the fixed page slots.
    ///
    /// Locates the last page whose starting key is `<= key`, then binary
    /// searches that page's directory. Tombstone values are returned as
    /// stored; interpretation is the engine's business.
    pub fn get_binary(&self, key: i64) -> Result<Option<i64>> {
        if key < self.meta.starting_key || key > self.meta.ending_key {
            return Ok(None);
        }

        let mut lo = 0i64;
        let mut hi = self.meta.num_pages as i64 - 1;
        let mut candidate: Option<Box<PageBuf>> = None;
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            let block = self.read_block(format::page_offset(mid as usize))?;
            let starting_key = PageView::new(&block[..])?.starting_key();
            if starting_key <= key {
                candidate = Some(block);
                lo = mid + 1;
            } else {
                hi = mid - 1;
            }
        }

        match candidate {
            Some(block) => PageView::new(&block[..])?.search(key),
            None => Ok(None),
        }
    }

    /// Point lookup by B-tree descent from the root at the file tail.
    pub fn get_btree(&self, key: i64) -> Result<Option<i64>> {
        self.descend(self.root_offset(), key)
    }

    /// Appends all entries with `start <= key <= end` to `out`.
    ///
    /// Uses the B-tree to find the first page whose key range can cover
    /// `start`, then walks pages linearly until a key passes `end`.
    pub fn scan_range(&self, start: i64, end: i64, out: &mut Vec<(i64, i64)>) -> Result<()> {
        if start > end || end < self.meta.starting_key || start > self.meta.ending_key {
            return Ok(());
        }

        let Some(mut index) = self.find_first_page(start)? else {
            return Ok(());
        };
        while index < self.meta.num_pages as usize {
            let block = self.read_block(format::page_offset(index))?;
            let view = PageView::new(&block[..])?;
            if view.starting_key() > end {
                break;
            }
            if !view.collect_range(start, end, out)? {
                break;
            }
            index += 1;
        }
        Ok(())
    }

    fn root_offset(&self) -> u64 {
        self.file_size - PAGE_SIZE as u64
    }

    fn in_page_region(&self, offset: u64) -> bool {
        offset >= format::page_region_start()
            && offset < format::page_region_end(self.meta.num_pages as usize)
    }

    fn page_index(&self, offset: u64) -> usize {
        ((offset - format::page_region_start()) / PAGE_SIZE as u64) as usize
    }

    /// Checks a child offset read out of a node block. Children are
    /// written before parents, so a legal offset always points backward;
    /// that property doubles as the descent's termination guarantee.
    fn child_offset(&self, raw: i64, parent_offset: u64) -> Result<u64> {
        let offset = raw as u64;
        if raw < format::page_region_start() as i64
            || (offset - SST_METADATA_SIZE) % PAGE_SIZE as u64 != 0
            || offset + PAGE_SIZE as u64 > self.file_size
            || offset >= parent_offset
        {
            return Err(Error::Corrupt(format!(
                "b-tree child offset {} out of range (node at {})",
                raw, parent_offset
            )));
        }
        Ok(offset)
    }

    fn descend(&self, offset: u64, key: i64) -> Result<Option<i64>> {
        let block = self.read_block(offset)?;
        if self.in_page_region(offset) {
            return PageView::new(&block[..])?.search(key);
        }

        let node = NodeView::parse(&block[..])?;
        for i in 0..node.key_count() {
            let (child, node_key) = node.entry(i);
            if key <= node_key {
                return self.descend(self.child_offset(child, offset)?, key);
            }
        }
        match node.trailing_offset() {
            Some(child) => self.descend(self.child_offset(child, offset)?, key),
            None => Ok(None),
        }
    }

    /// Descends for the first page whose max key is `>= start`; `None`
    /// when `start` lies beyond every key in the file.
    fn find_first_page(&self, start: i64) -> Result<Option<usize>> {
        let mut offset = self.root_offset();
        loop {
            if self.in_page_region(offset) {
                return Ok(Some(self.page_index(offset)));
            }
            let block = self.read_block(offset)?;
            let node = NodeView::parse(&block[..])?;

            let mut next = None;
            for i in 0..node.key_count() {
                let (child, node_key) = node.entry(i);
                if node_key >= start {
                    next = Some(child);
                    break;
                }
            }
            let Some(next) = next.or_else(|| node.trailing_offset()) else {
                return Ok(None);
            };
            offset = self.child_offset(next, offset)?;
        }
    }

    /// One 4096-byte block, buffer pool first, `pread` on a miss.
    fn read_block(&self, offset: u64) -> Result<Box<PageBuf>> {
        let page_id = format!("{}:{}", self.path, offset);
        {
            let mut pool = bufpool::global().lock().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = pool.get(&page_id) {
                return Ok(Box::new(*cached));
            }
        }

        let mut buf = Box::new([0u8; PAGE_SIZE]);
        self.file.read_exact_at(&mut buf[..], offset)?;

        bufpool::global()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(&page_id, &buf);
        Ok(buf)
    }
}

impl std::fmt::Debug for SstReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SstReader")
            .field("path", &self.path)
            .field("num_entries", &self.meta.num_entries)
            .field("num_pages", &self.meta.num_pages)
            .field("starting_key", &self.meta.starting_key)
            .field("ending_key", &self.meta.ending_key)
            .finish()
    }
}
