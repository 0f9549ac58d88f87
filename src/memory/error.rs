//! Heap errors

use thiserror::Error;

use super::Address;

/// Failures surfaced by the heap core.
///
/// `RegionFull` and `ChunkFull` are recoverable by the allocator and
/// the array wrapper (roll to a fresh region / link a fresh chunk);
/// everything else propagates to the interpreter boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// Byte access, element index or slice bound past its limit
    #[error("offset {at} out of range (limit {limit})")]
    OutOfRange { at: u64, limit: u64 },
    /// Address decomposes to a region index past the pool
    #[error("address {0:#x} out of region range")]
    OutOfRegionRange(Address),
    #[error("region full: cannot place {0} bytes")]
    RegionFull(u32),
    #[error("chunk is full")]
    ChunkFull,
    #[error("heap is full: all {0} regions handed out")]
    HeapFull(usize),
    #[error("unknown kind: {0:#x}")]
    WrongKind(u8),
    /// Address arithmetic below a region's base
    #[error("address {address:#x} underflows region base {base:#x}")]
    Underflow { address: Address, base: Address },
    /// Heap exhausted and collection freed no capacity
    #[error("out of memory: collection could not free capacity")]
    OutOfMemory,
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
}
