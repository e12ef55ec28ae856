use crate::Engine;
use std::fs;
use std::path::Path;

/// An engine over `<dir>/db` with the scenario threshold of 3 puts.
pub fn open_small(dir: &Path) -> Engine {
    Engine::open(dir.join("db"), 3).unwrap()
}

pub fn count_sst_files(db_dir: &Path) -> usize {
    fs::read_dir(db_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == "sst")
                .unwrap_or(false)
        })
        .count()
}

/// The shared end-to-end workload: three flushes, one compaction, one
/// tombstone, and a residue in the memtable.
pub fn run_scenario_a(engine: &mut Engine) {
    engine.put(10, 10010).unwrap();
    engine.put(20, 10020).unwrap();
    engine.put(25, 10025).unwrap(); // flush 1
    engine.put(30, 10030).unwrap();
    engine.put(10, 10011).unwrap();
    engine.put(15, 10015).unwrap(); // flush 2, then compaction
    engine.del(25).unwrap();
    engine.put(30, 10031).unwrap();
    engine.put(12, 10012).unwrap(); // flush 3
    engine.put(100, 10100).unwrap();
}
