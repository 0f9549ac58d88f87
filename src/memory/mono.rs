//! Monos: tagged byte records inside a region
//!
//! A mono is one value the guest language stores on the heap: a
//! single-byte kind tag followed by a fixed-size payload. Mono
//! descriptors are views materialized on demand, never storage.

use std::fmt::{self, Debug};

use super::error::HeapError;
use super::region::Region;
use super::{Address, Offset};

/// The kind tag stored in a mono's header byte.
///
/// Byte values and payload sizes are part of the on-heap format and
/// must not change.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MonoKind {
    Int32 = 1,
    Float64 = 2,
    ArrayS8 = 3,
    StringS8 = 4,
    ObjectS8 = 5,
    NamedPropertyS8 = 6,
    Address = 11,
    ChunkS8 = 31,
}

impl MonoKind {
    pub fn from_byte(byte: u8) -> Result<MonoKind, HeapError> {
        match byte {
            1 => Ok(MonoKind::Int32),
            2 => Ok(MonoKind::Float64),
            3 => Ok(MonoKind::ArrayS8),
            4 => Ok(MonoKind::StringS8),
            5 => Ok(MonoKind::ObjectS8),
            6 => Ok(MonoKind::NamedPropertyS8),
            11 => Ok(MonoKind::Address),
            31 => Ok(MonoKind::ChunkS8),
            other => Err(HeapError::WrongKind(other)),
        }
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Total size in bytes, header included
    pub fn size(self) -> Offset {
        match self {
            // 1 header + 4-byte value
            MonoKind::Int32 => 5,
            // 1 header + 4-byte stored address
            MonoKind::Address => 5,
            // 1 header + 8-byte IEEE-754 double
            MonoKind::Float64 => 9,
            // 1 header + 4 length + embedded default chunk
            MonoKind::ArrayS8 => 43,
            // 1 header + 1 length + 8 * 4 slots + 4 next
            MonoKind::ChunkS8 => 38,
            // 1 header + 8 * 8 slots + 4 next (reserved)
            MonoKind::StringS8 => 69,
            // 1 header + 8 * 8 slots + 4 property table + 4 next (reserved)
            MonoKind::ObjectS8 => 73,
            // 1 header + 8 * (4 name + 4 value) + 4 next (reserved)
            MonoKind::NamedPropertyS8 => 73,
        }
    }
}

/// A typed view over one record in a region.
///
/// Addresses are heap-absolute; offsets are region-local. `end` and
/// `end_offset` are inclusive:
///
/// ```text
/// heap address  [ #81| #82| #83| #84| #85| ...]
/// region        [ #0 | #1 | #2 | #3 | #4 | ...]
/// mono                     [ #0 | #1 | #2 ]
/// ```
///
/// gives `begin = 83`, `end = 85`, `begin_offset = 2`, `end_offset = 4`.
#[derive(Copy, Clone)]
pub struct Mono<'heap> {
    region: Region<'heap>,
    kind: MonoKind,
    /// Heap address of the header byte
    begin: Address,
    /// Heap address of the last payload byte
    end: Address,
    /// Heap address of the first payload byte (`begin + 1`)
    value: Address,
    begin_offset: Offset,
    end_offset: Offset,
    value_offset: Offset,
}

impl<'heap> Mono<'heap> {
    pub(crate) fn new(region: Region<'heap>, kind: MonoKind, begin_offset: Offset) -> Mono<'heap> {
        let size = kind.size();
        let begin = region.base() + Address::from(begin_offset);
        Mono {
            region,
            kind,
            begin,
            end: begin + Address::from(size) - 1,
            value: begin + 1,
            begin_offset,
            end_offset: begin_offset + size - 1,
            value_offset: begin_offset + 1,
        }
    }

    pub fn region(&self) -> Region<'heap> {
        self.region
    }

    pub fn kind(&self) -> MonoKind {
        self.kind
    }

    /// Heap address of the header byte; this is what pointer fields
    /// elsewhere on the heap store.
    pub fn address(&self) -> Address {
        self.begin
    }

    pub fn end_address(&self) -> Address {
        self.end
    }

    pub fn value_address(&self) -> Address {
        self.value
    }

    pub fn begin_offset(&self) -> Offset {
        self.begin_offset
    }

    pub fn end_offset(&self) -> Offset {
        self.end_offset
    }

    pub fn value_offset(&self) -> Offset {
        self.value_offset
    }

    pub fn size(&self) -> Offset {
        self.kind.size()
    }

    /// Write the kind tag into the region. Must be called exactly
    /// once, when the mono is first carved out of the region.
    pub fn write_header(&self) -> Result<(), HeapError> {
        self.region.write_byte(self.begin_offset, self.kind.byte())
    }
}

impl<'heap> PartialEq for Mono<'heap> {
    fn eq(&self, other: &Self) -> bool {
        self.region == other.region && self.kind == other.kind && self.begin == other.begin
    }
}

impl<'heap> Debug for Mono<'heap> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} @{:#x} ({} bytes)",
            self.kind,
            self.begin,
            self.size()
        )
    }
}

#[cfg(test)]
pub mod tests {

    use super::*;

    #[test]
    pub fn test_kind_bytes_round_trip() {
        for byte in [1u8, 2, 3, 4, 5, 6, 11, 31] {
            assert_eq!(MonoKind::from_byte(byte).unwrap().byte(), byte);
        }
    }

    #[test]
    pub fn test_unknown_kind() {
        assert_eq!(MonoKind::from_byte(0), Err(HeapError::WrongKind(0)));
        assert_eq!(MonoKind::from_byte(99), Err(HeapError::WrongKind(99)));
    }

    #[test]
    pub fn test_sizes() {
        assert_eq!(MonoKind::Int32.size(), 5);
        assert_eq!(MonoKind::Address.size(), 5);
        assert_eq!(MonoKind::Float64.size(), 9);
        assert_eq!(MonoKind::ArrayS8.size(), 43);
        assert_eq!(MonoKind::ChunkS8.size(), 38);
        assert_eq!(MonoKind::StringS8.size(), 69);
        assert_eq!(MonoKind::ObjectS8.size(), 73);
        assert_eq!(MonoKind::NamedPropertyS8.size(), 73);
    }
}
