//! The metadata log: the only state that survives `close`.
//!
//! `<db>/lsmtree.log` is a UTF-8 text file written atomically on close
//! and replayed on open:
//!
//! ```text
//! counter,42
//! 0,/path/to/db/sst_42.sst
//! 1,/path/to/db/sst_40_41.sst
//! ```
//!
//! The first line carries the SST suffix counter; every further line is
//! one live SST as `<level>,<filename>`. Filenames are opaque strings to
//! the replay. A text format keeps the file inspectable with any editor;
//! it is one line per SST, so parsing cost is irrelevant.

use anyhow::{bail, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Name of the metadata log within the database directory.
pub const METALOG_FILENAME: &str = "lsmtree.log";

/// Parsed contents of a metadata log.
#[derive(Debug)]
pub struct MetaLog {
    pub counter: u64,
    /// `(level, path)` in file order.
    pub entries: Vec<(usize, String)>,
}

/// Reads `<db_dir>/lsmtree.log`, or `None` when no log exists (a fresh
/// or never-closed database).
///
/// # Errors
///
/// Any malformed line is fatal: a database with an unreadable log is
/// corrupt and not silently usable.
pub fn read(db_dir: &Path) -> Result<Option<MetaLog>> {
    let path = db_dir.join(METALOG_FILENAME);
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(&path)
        .with_context(|| format!("opening metadata log {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut counter = None;
    let mut entries = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading metadata log line {}", line_num + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some((first, second)) = trimmed.split_once(',') else {
            bail!(
                "metadata log line {}: expected '<field>,<value>', got '{}'",
                line_num + 1,
                trimmed
            );
        };

        if counter.is_none() {
            // The first line is always the counter.
            if first != "counter" {
                bail!(
                    "metadata log line {}: expected counter line, got '{}'",
                    line_num + 1,
                    trimmed
                );
            }
            let value = second
                .parse::<u64>()
                .with_context(|| format!("metadata log line {}: bad counter", line_num + 1))?;
            counter = Some(value);
            continue;
        }

        let level = first.parse::<usize>().with_context(|| {
            format!("metadata log line {}: bad level '{}'", line_num + 1, first)
        })?;
        if second.is_empty() {
            bail!("metadata log line {}: empty filename", line_num + 1);
        }
        entries.push((level, second.to_string()));
    }

    let Some(counter) = counter else {
        bail!("metadata log {} has no counter line", path.display());
    };
    Ok(Some(MetaLog { counter, entries }))
}

/// Writes a fresh metadata log atomically: the contents go to a `.tmp`
/// sibling, are fsynced, and the sibling is renamed over the log.
pub fn write<'a>(
    db_dir: &Path,
    counter: u64,
    entries: impl Iterator<Item = (usize, &'a str)>,
) -> Result<()> {
    let path = db_dir.join(METALOG_FILENAME);
    let tmp_path = db_dir.join(format!("{}.tmp", METALOG_FILENAME));

    {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;

        writeln!(f, "counter,{}", counter)?;
        for (level, filename) in entries {
            writeln!(f, "{},{}", level, filename)?;
        }
        f.flush()?;
        f.sync_all()?;
    }

    fs::rename(&tmp_path, &path)
        .with_context(|| format!("publishing metadata log {}", path.display()))?;
    Ok(())
}
