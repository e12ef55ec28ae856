use crate::format::PAGE_SIZE;
use crate::page::{PageBuilder, PageView, MAX_ENTRIES_PER_PAGE};
use byteorder::{ByteOrder, LittleEndian};

// -------------------- Builder --------------------

#[test]
fn page_holds_exactly_204_entries() {
    assert_eq!(MAX_ENTRIES_PER_PAGE, 204);

    let mut page = PageBuilder::new();
    for i in 0..MAX_ENTRIES_PER_PAGE as i64 {
        assert!(page.add_entry(i, i * 2), "entry {} should fit", i);
    }
    assert!(!page.add_entry(9999, 0), "entry 205 must be rejected");
    assert_eq!(page.num_entries(), MAX_ENTRIES_PER_PAGE);
}

#[test]
fn first_entry_sets_starting_key() {
    let mut page = PageBuilder::new();
    assert!(page.add_entry(42, 1));
    page.add_entry(50, 2);
    assert_eq!(page.starting_key(), 42);
    assert_eq!(page.last_key(), Some(50));
}

#[test]
fn finished_page_header_layout() {
    let mut page = PageBuilder::new();
    page.add_entry(-7, 100);
    page.add_entry(3, 200);
    let buf = page.finish();

    assert_eq!(LittleEndian::read_i32(&buf[0..4]), 2);
    assert_eq!(LittleEndian::read_i64(&buf[4..12]), -7);
    // 4080 free minus two 20-byte entries.
    assert_eq!(LittleEndian::read_i32(&buf[12..16]), 4040);
}

#[test]
fn values_pack_backward_from_the_tail() {
    let mut page = PageBuilder::new();
    page.add_entry(1, 111);
    page.add_entry(2, 222);
    let buf = page.finish();

    // First value in the last 8 bytes, second value right before it.
    assert_eq!(LittleEndian::read_i64(&buf[PAGE_SIZE - 8..]), 111);
    assert_eq!(
        LittleEndian::read_i64(&buf[PAGE_SIZE - 16..PAGE_SIZE - 8]),
        222
    );
    // Directory slot 0: key at 16, value offset at 24.
    assert_eq!(LittleEndian::read_i64(&buf[16..24]), 1);
    assert_eq!(
        LittleEndian::read_i32(&buf[24..28]) as usize,
        PAGE_SIZE - 8
    );
}

// -------------------- View --------------------

#[test]
fn view_round_trips_every_entry() {
    let mut page = PageBuilder::new();
    for i in 0..100i64 {
        page.add_entry(i * 3, i * 3 + 1);
    }
    let buf = page.finish();

    let view = PageView::new(&buf[..]).unwrap();
    assert_eq!(view.num_entries(), 100);
    for i in 0..100i64 {
        assert_eq!(view.search(i * 3).unwrap(), Some(i * 3 + 1));
    }
}

#[test]
fn view_search_misses_between_keys() {
    let mut page = PageBuilder::new();
    for i in 0..50i64 {
        page.add_entry(i * 10, i);
    }
    let buf = page.finish();
    let view = PageView::new(&buf[..]).unwrap();

    assert_eq!(view.search(5).unwrap(), None);
    assert_eq!(view.search(-1).unwrap(), None);
    assert_eq!(view.search(495).unwrap(), None);
}

#[test]
fn collect_range_is_inclusive_and_signals_cutoff() {
    let mut page = PageBuilder::new();
    for k in [10, 20, 30, 40] {
        page.add_entry(k, k * 100);
    }
    let buf = page.finish();
    let view = PageView::new(&buf[..]).unwrap();

    let mut out = Vec::new();
    let keep_going = view.collect_range(20, 30, &mut out).unwrap();
    assert_eq!(out, vec![(20, 2000), (30, 3000)]);
    assert!(!keep_going, "a key above end was seen, caller can stop");

    let mut out = Vec::new();
    let keep_going = view.collect_range(15, 100, &mut out).unwrap();
    assert_eq!(out, vec![(20, 2000), (30, 3000), (40, 4000)]);
    assert!(keep_going, "range extends past the page");
}

// -------------------- Corruption --------------------

#[test]
fn view_rejects_wrong_buffer_size() {
    let buf = [0u8; 100];
    assert!(PageView::new(&buf[..]).is_err());
}

#[test]
fn view_rejects_zero_entry_count() {
    let buf = [0u8; PAGE_SIZE];
    assert!(PageView::new(&buf[..]).is_err());
}

#[test]
fn view_rejects_oversized_entry_count() {
    let mut buf = [0u8; PAGE_SIZE];
    LittleEndian::write_i32(&mut buf[0..4], 205);
    assert!(PageView::new(&buf[..]).is_err());
}

#[test]
fn value_offset_outside_tail_is_corruption() {
    let mut page = PageBuilder::new();
    page.add_entry(1, 111);
    let mut buf = page.finish();

    // Point the single directory slot into the middle of the page.
    LittleEndian::write_i32(&mut buf[24..28], 100);
    let view = PageView::new(&buf[..]).unwrap();
    assert!(view.value_at(0).is_err());
    assert!(view.search(1).is_err());
}
