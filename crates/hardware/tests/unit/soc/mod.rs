
/// Segment chain, permissions and protection.
pub mod memory;

/// UART register stub.
pub mod uart;
