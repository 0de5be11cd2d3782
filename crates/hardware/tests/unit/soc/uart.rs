//! UART Stub Tests.
//!
//! Word loads return the ready status, word stores emit one character, other widths fall
//! through to memory. The backing memory is never modified by the device.

use pretty_assertions::assert_eq;
use rstest::rstest;

use runzpu_core::common::{AccessType, Trap, Width};
use runzpu_core::soc::devices::Uart;
use runzpu_core::soc::memory::segment::Segment;
use runzpu_core::soc::{Bus, MmioOverride, Permissions, SegmentTable};

use crate::common::harness::TestContext;
use crate::common::mocks::writer::SharedBuffer;

const UART_A: u32 = 0x8000_0024;
const UART_B: u32 = 0x080A_000C;

fn uart(out: &SharedBuffer) -> Uart {
    Uart::new(&[UART_A, UART_B], 0x100, Box::new(out.clone()))
}

// ══════════════════════════════════════════════════════════
// Device in isolation
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(UART_A)]
#[case(UART_B)]
fn claims_both_aliases(#[case] addr: u32) {
    let out = SharedBuffer::new();
    let uart = uart(&out);
    assert!(uart.claims(addr));
    assert!(!uart.claims(addr + 4));
    assert_eq!(uart.name(), "UART");
}

#[test]
fn word_load_returns_ready_status() {
    let out = SharedBuffer::new();
    let mut uart = uart(&out);
    let table = SegmentTable::new();
    assert_eq!(uart.get(&table, UART_A, Width::Word), Some(0x100));
    assert_eq!(uart.get(&table, UART_B, Width::Word), Some(0x100));
}

#[rstest]
#[case::byte(Width::Byte)]
#[case::half(Width::Half)]
fn narrow_accesses_are_declined(#[case] width: Width) {
    let out = SharedBuffer::new();
    let mut uart = uart(&out);
    let table = SegmentTable::new();
    assert_eq!(uart.get(&table, UART_A, width), None);
    assert!(!uart.set(&table, UART_A, width, 0x41));
    assert!(out.is_empty());
    assert_eq!(uart.tx_count(), 0);
}

#[test]
fn word_store_emits_the_low_byte() {
    let out = SharedBuffer::new();
    let mut uart = uart(&out);
    let table = SegmentTable::new();
    assert!(uart.set(&table, UART_A, Width::Word, 0x1234_5648));
    assert!(uart.set(&table, UART_B, Width::Word, 0x69));
    assert_eq!(out.contents(), "Hi");
    assert_eq!(uart.tx_count(), 2);
}

// ══════════════════════════════════════════════════════════
// Device on the bus
// ══════════════════════════════════════════════════════════

#[test]
fn device_never_touches_backing_memory() {
    let out = SharedBuffer::new();
    let mut table = SegmentTable::new();
    let _ = table.register(
        Segment::new("mmio", vec![0; 0x100], 0x8000_0000, 0x100, Permissions::RW).unwrap(),
    );
    table.write(UART_A, Width::Word, 0xFFFF_FFFF).unwrap();

    let mut bus = Bus::new(table);
    bus.add_override(Box::new(uart(&out)));

    assert_eq!(bus.read_u32(UART_A), Ok(0x100));
    bus.write_u32(UART_A, 0x2A).unwrap();
    assert_eq!(out.contents(), "*");
    assert_eq!(bus.memory.read(UART_A, Width::Word), Ok(0xFFFF_FFFF));

    // A byte access is not the device's business.
    assert_eq!(bus.read_u8(UART_A), Ok(0xFF));
}

#[test]
fn platform_uart_answers_at_both_aliases() {
    let mut ctx = TestContext::scripted(Vec::new());
    let bus = &mut ctx.machine.bus;
    assert_eq!(bus.read_u32(UART_A), Ok(0x100));
    assert_eq!(bus.read_u32(UART_B), Ok(0x100));
    bus.write_u32(UART_B, u32::from(b'!')).unwrap();
    assert_eq!(ctx.uart.contents(), "!");
}

#[test]
fn platform_uart_byte_access_faults() {
    let mut ctx = TestContext::scripted(Vec::new());
    assert_eq!(
        ctx.machine.bus.read_u8(UART_A),
        Err(Trap::segv(UART_A, AccessType::Read))
    );
}
