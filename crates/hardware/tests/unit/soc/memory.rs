//! Segment Table Tests.
//!
//! Chained lookup, permission checks, big-endian layout, write protection and opcode
//! accounting.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use runzpu_core::common::{AccessType, SegmentError, Trap, Width};
use runzpu_core::soc::memory::segment::Segment;
use runzpu_core::soc::{Permissions, SegmentId, SegmentTable};

const TEXT_SIZE: u32 = 0x8000;
const STACK_BASE: u32 = 0x1_F800;
const STACK_SIZE: u32 = 0x800;

fn segment(name: &str, base: u32, size: u32, perms: Permissions) -> Segment {
    Segment::new(name, vec![0; size as usize], base, size, perms).unwrap()
}

/// Text (r-x) at 0, then stack (rw-) just below 128 KiB.
fn platform() -> (SegmentTable, SegmentId, SegmentId) {
    let mut table = SegmentTable::new();
    let text = table.register(segment("text", 0, TEXT_SIZE, Permissions::RX));
    let stack = table.register(segment("stack", STACK_BASE, STACK_SIZE, Permissions::RW));
    (table, text, stack)
}

// ══════════════════════════════════════════════════════════
// Segment construction
// ══════════════════════════════════════════════════════════

#[test]
fn zero_sized_segment_is_rejected() {
    let err = Segment::new("empty", vec![0; 4], 0, 0, Permissions::RW).unwrap_err();
    assert_eq!(
        err,
        SegmentError::ZeroSize {
            name: "empty".into()
        }
    );
}

#[test]
fn short_buffer_is_rejected() {
    let err = Segment::new("short", vec![0; 8], 0x100, 16, Permissions::RW).unwrap_err();
    assert_eq!(
        err,
        SegmentError::BufferTooSmall {
            name: "short".into(),
            len: 8,
            size: 16
        }
    );
}

#[test]
fn range_past_the_address_space_is_rejected() {
    let err = Segment::new("top", vec![0; 0x200], 0xFFFF_FF00, 0x200, Permissions::RW)
        .unwrap_err();
    assert!(matches!(err, SegmentError::RangeOverflow { .. }));
}

#[test]
fn segment_ending_at_the_top_of_the_address_space_is_accepted() {
    let s = segment("top", 0xFFFF_FF00, 0x100, Permissions::RW);
    assert!(s.contains(0xFFFF_FFFF));
    assert!(!s.contains(0xFFFF_FEFF));
}

#[test]
fn oversized_buffer_is_truncated() {
    let s = Segment::new("big", vec![0; 64], 0, 16, Permissions::RW).unwrap();
    assert_eq!(s.bytes().len(), 16);
}

// ══════════════════════════════════════════════════════════
// Lookup and permissions
// ══════════════════════════════════════════════════════════

#[test]
fn lookup_order_is_newest_first() {
    let (table, _, _) = platform();
    let names: Vec<&str> = table.iter().map(Segment::name).collect();
    assert_eq!(names, vec!["stack", "text"]);
    assert_eq!(table.len(), 2);
}

#[test]
fn empty_table_faults_every_access() {
    let mut table = SegmentTable::new();
    assert!(table.is_empty());
    assert_eq!(
        table.read(0, Width::Word),
        Err(Trap::segv(0, AccessType::Read))
    );
    assert_eq!(
        table.write(4, Width::Byte, 1),
        Err(Trap::segv(4, AccessType::Write))
    );
    assert_eq!(table.fetch(8), Err(Trap::segv(8, AccessType::Fetch)));
}

#[rstest]
#[case::byte(Width::Byte, 0xAB)]
#[case::half(Width::Half, 0xBEEF)]
#[case::word(Width::Word, 0xDEAD_BEEF)]
fn stack_write_then_read_is_bit_exact(#[case] width: Width, #[case] value: u32) {
    let (mut table, _, _) = platform();
    table.write(STACK_BASE + 0x100, width, value).unwrap();
    assert_eq!(table.read(STACK_BASE + 0x100, width), Ok(value));
}

#[test]
fn word_store_is_big_endian() {
    let (mut table, _, _) = platform();
    table.write(STACK_BASE, Width::Word, 0x1122_3344).unwrap();
    let bytes: Vec<u8> = (0..4).map(|i| table.peek(STACK_BASE + i).unwrap()).collect();
    assert_eq!(bytes, vec![0x11, 0x22, 0x33, 0x44]);
    assert_eq!(table.read(STACK_BASE + 2, Width::Half), Ok(0x3344));
    assert_eq!(table.read(STACK_BASE + 1, Width::Byte), Ok(0x22));
}

#[test]
fn narrow_store_keeps_the_low_bits() {
    let (mut table, _, _) = platform();
    table.write(STACK_BASE, Width::Byte, 0x1234_5678).unwrap();
    assert_eq!(table.read(STACK_BASE, Width::Byte), Ok(0x78));
    assert_eq!(table.peek(STACK_BASE + 1), Some(0));
}

#[test]
fn text_is_not_writable_once_registered() {
    let (mut table, _, _) = platform();
    assert_eq!(
        table.write(0x10, Width::Word, 1),
        Err(Trap::segv(0x10, AccessType::Write))
    );
    assert_eq!(table.read(0x10, Width::Word), Ok(0));
}

#[test]
fn stack_is_not_executable() {
    let (mut table, _, _) = platform();
    assert_eq!(
        table.fetch(STACK_BASE),
        Err(Trap::segv(STACK_BASE, AccessType::Fetch))
    );
}

#[test]
fn access_straddling_a_segment_end_faults() {
    let (table, _, _) = platform();
    assert_eq!(
        table.read(TEXT_SIZE - 2, Width::Word),
        Err(Trap::segv(TEXT_SIZE - 2, AccessType::Read))
    );
    assert_eq!(table.read(TEXT_SIZE - 4, Width::Word), Ok(0));
}

#[test]
fn newer_segment_shadows_older_one() {
    let mut table = SegmentTable::new();
    let low = table.register(segment("low", 0, 0x100, Permissions::RW));
    table.write(0x90, Width::Byte, 0x11).unwrap();
    let _overlay = table.register(segment("overlay", 0x80, 0x80, Permissions::READ));

    assert_eq!(table.read(0x90, Width::Byte), Ok(0));
    // The overlay serves the address and denies the write; the older segment is not tried.
    assert_eq!(
        table.write(0x90, Width::Byte, 0x22),
        Err(Trap::segv(0x90, AccessType::Write))
    );
    assert_eq!(table.segment(low).unwrap().bytes()[0x90], 0x11);
    table.write(0x10, Width::Byte, 0x33).unwrap();
    assert_eq!(table.peek(0x10), Some(0x33));
}

// ══════════════════════════════════════════════════════════
// Protection
// ══════════════════════════════════════════════════════════

#[test]
fn unlock_then_lock_gates_writes_without_touching_data() {
    let (mut table, text, _) = platform();

    table.set_protection(text, false).unwrap();
    assert_eq!(
        table.segment(text).unwrap().permissions(),
        Permissions::RWX
    );
    table.write(0x20, Width::Word, 0xCAFE_F00D).unwrap();

    table.set_protection(text, true).unwrap();
    assert_eq!(table.segment(text).unwrap().permissions(), Permissions::RX);
    assert_eq!(
        table.write(0x20, Width::Word, 0),
        Err(Trap::segv(0x20, AccessType::Write))
    );
    assert_eq!(table.read(0x20, Width::Word), Ok(0xCAFE_F00D));

    table.set_protection(text, false).unwrap();
    assert_eq!(table.read(0x20, Width::Word), Ok(0xCAFE_F00D));
    table.write(0x20, Width::Word, 7).unwrap();
}

#[test]
fn locking_a_data_segment_drops_only_write() {
    let (mut table, _, stack) = platform();
    table.set_protection(stack, true).unwrap();
    assert_eq!(table.segment(stack).unwrap().permissions(), Permissions::READ);
    table.set_protection(stack, false).unwrap();
    assert_eq!(table.segment(stack).unwrap().permissions(), Permissions::RW);
}

#[test]
fn foreign_segment_handle_is_rejected() {
    let (_, _, stack) = platform();
    let mut other = SegmentTable::new();
    let _ = other.register(segment("only", 0, 0x10, Permissions::RW));
    assert_eq!(
        other.set_protection(stack, true),
        Err(SegmentError::UnknownSegment(1))
    );
}

// ══════════════════════════════════════════════════════════
// Opcode accounting
// ══════════════════════════════════════════════════════════

#[test]
fn fetches_from_code_are_counted() {
    let (mut table, text, _) = platform();
    table.set_protection(text, false).unwrap();
    table.write(0, Width::Word, 0x0B0C_0D0E).unwrap();
    table.set_protection(text, true).unwrap();

    assert_eq!(table.fetch(0), Ok(0x0B));
    assert_eq!(table.fetch(3), Ok(0x0E));
    assert_eq!(table.opcode_fetches(), 2);
}

#[test]
fn fetches_outside_code_are_not_counted() {
    let (mut table, _, _) = platform();
    let _ = table.fetch(STACK_BASE);
    let _ = table.fetch(0x9000);
    assert_eq!(table.opcode_fetches(), 0);
}

#[test]
fn fetch_is_counted_against_the_resolving_segment() {
    let mut table = SegmentTable::new();
    let code = table.register(segment("code", 0, 0x100, Permissions::EXEC));
    let _data = table.register(segment("data", 0x80, 0x80, Permissions::RW));
    assert!(table.segment(code).unwrap().is_code_bearing());

    assert_eq!(table.fetch(0x10), Ok(0));
    assert_eq!(
        table.fetch(0x90),
        Err(Trap::segv(0x90, AccessType::Fetch))
    );
    // 0x90 resolves to the data overlay, which is not code-bearing.
    assert_eq!(table.opcode_fetches(), 1);
}

// ══════════════════════════════════════════════════════════
// Properties
// ══════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn word_round_trip_anywhere_in_stack(
        offset in 0u32..=(STACK_SIZE - 4),
        value in any::<u32>(),
    ) {
        let (mut table, _, _) = platform();
        let addr = STACK_BASE + offset;
        table.write(addr, Width::Word, value).unwrap();
        prop_assert_eq!(table.read(addr, Width::Word), Ok(value));
    }

    #[test]
    fn unmapped_addresses_fault_with_the_exact_address(
        addr in prop_oneof![TEXT_SIZE..STACK_BASE, (STACK_BASE + STACK_SIZE)..=u32::MAX],
        value in any::<u32>(),
    ) {
        let (mut table, _, _) = platform();
        prop_assert_eq!(
            table.read(addr, Width::Byte),
            Err(Trap::segv(addr, AccessType::Read))
        );
        prop_assert_eq!(
            table.write(addr, Width::Word, value),
            Err(Trap::segv(addr, AccessType::Write))
        );
        prop_assert_eq!(table.fetch(addr), Err(Trap::segv(addr, AccessType::Fetch)));
        prop_assert_eq!(table.peek(addr), None);
    }
}
