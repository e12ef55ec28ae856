use super::*;

fn page(fill: u8) -> PageBuf {
    [fill; PAGE_SIZE]
}

// -------------------- Hit / miss --------------------

#[test]
fn miss_on_empty_pool() {
    let mut pool = BufferPool::new(4);
    assert!(pool.get("a.sst:4120").is_none());
}

#[test]
fn insert_then_get_returns_payload() {
    let mut pool = BufferPool::new(4);
    pool.insert("a.sst:4120", &page(7));
    let got = pool.get("a.sst:4120").expect("page should be cached");
    assert!(got.iter().all(|&b| b == 7));
}

#[test]
fn reinsert_does_not_duplicate() {
    let mut pool = BufferPool::new(4);
    pool.insert("a.sst:0", &page(1));
    pool.insert("a.sst:0", &page(2));
    assert_eq!(pool.len(), 1);
    // First payload is kept; re-insert only refreshes the bit.
    let got = pool.get("a.sst:0").unwrap();
    assert!(got.iter().all(|&b| b == 1));
}

// -------------------- Clock eviction --------------------

#[test]
fn fills_to_capacity_before_evicting() {
    let mut pool = BufferPool::new(3);
    pool.insert("p:0", &page(0));
    pool.insert("p:1", &page(1));
    pool.insert("p:2", &page(2));
    assert_eq!(pool.len(), 3);
    assert!(pool.contains("p:0") && pool.contains("p:1") && pool.contains("p:2"));
}

#[test]
fn eviction_keeps_len_at_capacity() {
    let mut pool = BufferPool::new(2);
    pool.insert("p:0", &page(0));
    pool.insert("p:1", &page(1));
    pool.insert("p:2", &page(2));
    assert_eq!(pool.len(), 2);
    assert!(pool.contains("p:2"));
}

#[test]
fn clock_gives_referenced_pages_a_second_chance() {
    let mut pool = BufferPool::new(3);
    pool.insert("p:a", &page(0));
    pool.insert("p:b", &page(1));
    pool.insert("p:c", &page(2));

    // All bits start set: the sweep clears a, b, c, wraps, and evicts a.
    pool.insert("p:d", &page(3));
    assert!(!pool.contains("p:a"));

    // b's bit is set again; the hand reaches b first, skips it, and
    // evicts c whose bit stayed clear.
    pool.get("p:b");
    pool.insert("p:e", &page(4));
    assert!(pool.contains("p:b"), "recently used page must survive");
    assert!(!pool.contains("p:c"));
    assert!(pool.contains("p:d") && pool.contains("p:e"));
}

#[test]
fn evicted_page_is_a_miss() {
    let mut pool = BufferPool::new(1);
    pool.insert("p:0", &page(0));
    pool.insert("p:1", &page(1));
    assert!(pool.get("p:0").is_none());
    assert!(pool.get("p:1").is_some());
}

// -------------------- Misc --------------------

#[test]
fn clear_empties_the_pool() {
    let mut pool = BufferPool::new(4);
    pool.insert("p:0", &page(0));
    pool.insert("p:1", &page(1));
    pool.clear();
    assert!(pool.is_empty());
    assert!(pool.get("p:0").is_none());

    // Pool is reusable after clear.
    pool.insert("p:2", &page(2));
    assert_eq!(pool.len(), 1);
}

#[test]
fn global_pool_is_shared_and_has_default_capacity() {
    let pool = global().lock().unwrap();
    assert_eq!(pool.capacity(), DEFAULT_CAPACITY);
}
