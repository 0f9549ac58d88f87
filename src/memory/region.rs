//! Regions: the fixed-size unit of allocation and collection
//!
//! A region is a 1 MB byte buffer with a 5-byte header (4-byte
//! little-endian bump counter, 1-byte kind) followed by monos laid
//! out head-to-tail. The counter is the region offset of the next
//! unoccupied byte and always lives in the buffer itself, so any
//! number of simultaneous region views stay coherent.

use std::fmt::{self, Debug};
use std::ptr::NonNull;

use log::trace;

use super::error::HeapError;
use super::heap::Heap;
use super::mono::{Mono, MonoKind};
use super::{Address, Offset};

/// Region size in bytes
pub const REGION_SIZE: Offset = 1_024_000;

/// Bytes reserved at the front of a region: 4-byte counter + kind byte
pub const REGION_HEADER_SIZE: Offset = 5;

/// The kind byte stored at region offset 4.
///
/// Only EDEN regions are produced today; promotion through the
/// generations is not implemented.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionKind {
    Eden = 11,
    Survivor = 12,
    Tenured = 13,
    Humongous = 14,
}

impl RegionKind {
    pub fn from_byte(byte: u8) -> Result<RegionKind, HeapError> {
        match byte {
            11 => Ok(RegionKind::Eden),
            12 => Ok(RegionKind::Survivor),
            13 => Ok(RegionKind::Tenured),
            14 => Ok(RegionKind::Humongous),
            other => Err(HeapError::WrongKind(other)),
        }
    }

    pub fn byte(self) -> u8 {
        self as u8
    }
}

/// A view over one region buffer of the heap.
///
/// Copyable descriptor; the bytes belong to the heap's pool.
#[derive(Copy, Clone)]
pub struct Region<'heap> {
    heap: &'heap Heap,
    /// First byte of the backing buffer
    pub(crate) data: NonNull<u8>,
    /// Heap address of the first byte
    base: Address,
}

impl<'heap> Region<'heap> {
    pub(crate) fn new(heap: &'heap Heap, data: NonNull<u8>, base: Address) -> Region<'heap> {
        Region { heap, data, base }
    }

    pub fn heap(&self) -> &'heap Heap {
        self.heap
    }

    /// Heap address of the first byte; always a multiple of REGION_SIZE
    pub fn base(&self) -> Address {
        self.base
    }

    /// Heap address of the last byte
    pub fn end(&self) -> Address {
        self.base + Address::from(REGION_SIZE) - 1
    }

    pub fn size(&self) -> Offset {
        REGION_SIZE
    }

    /// The bump counter: region offset of the next unoccupied byte.
    ///
    /// A zero counter marks a buffer that has never been written; it
    /// elevates to the header size and persists, as the region header
    /// bytes are occupied from the start.
    pub fn counter(&self) -> Result<Offset, HeapError> {
        let counter = self.read_u32(0)?;
        if counter == 0 {
            self.set_counter(REGION_HEADER_SIZE)?;
            Ok(REGION_HEADER_SIZE)
        } else {
            Ok(counter)
        }
    }

    pub(crate) fn set_counter(&self, counter: Offset) -> Result<(), HeapError> {
        self.write_u32(0, counter)
    }

    /// Read the kind byte at offset 4. A zero byte marks a freshly
    /// handed-out buffer and elevates to EDEN, persisting.
    pub fn read_kind(&self) -> Result<RegionKind, HeapError> {
        let byte = self.read_byte(4)?;
        if byte == 0 {
            self.write_kind(RegionKind::Eden)?;
            Ok(RegionKind::Eden)
        } else {
            RegionKind::from_byte(byte)
        }
    }

    pub fn write_kind(&self, kind: RegionKind) -> Result<(), HeapError> {
        self.write_byte(4, kind.byte())
    }

    /// Generational promotion (EDEN to SURVIVOR and beyond) does not
    /// exist yet; all live regions are EDEN.
    pub fn promote(&self, _to: RegionKind) -> Result<(), HeapError> {
        Err(HeapError::Unimplemented("region kind transitions"))
    }

    /// Whether `n` more bytes fit under the bump counter
    pub fn capable(&self, n: Offset) -> Result<bool, HeapError> {
        Ok(self.counter()? + n <= REGION_SIZE)
    }

    /// Translate a heap address into an offset within this region
    pub fn offset_from_address(&self, address: Address) -> Result<Offset, HeapError> {
        if address < self.base {
            return Err(HeapError::Underflow {
                address,
                base: self.base,
            });
        }
        let offset = address - self.base;
        if offset >= Address::from(REGION_SIZE) {
            return Err(HeapError::OutOfRange {
                at: offset,
                limit: u64::from(REGION_SIZE),
            });
        }
        Ok(offset as Offset)
    }

    /// Form a mono descriptor at a region offset. No bytes move;
    /// monos are just tagged spans of the region.
    pub fn mono_at(&self, kind: MonoKind, begin: Offset) -> Result<Mono<'heap>, HeapError> {
        let size = kind.size();
        if begin < REGION_HEADER_SIZE || begin + size > REGION_SIZE {
            return Err(HeapError::OutOfRange {
                at: u64::from(begin),
                limit: u64::from(REGION_SIZE),
            });
        }
        Ok(Mono::new(*self, kind, begin))
    }

    /// Carve a fresh mono out of the unoccupied tail of the region:
    /// write its header byte at the counter and advance the counter
    /// by the mono's full size.
    pub fn create_mono(&self, kind: MonoKind) -> Result<Mono<'heap>, HeapError> {
        let size = kind.size();
        let counter = self.counter()?;
        if counter + size > REGION_SIZE {
            return Err(HeapError::RegionFull(size));
        }
        let mono = self.mono_at(kind, counter)?;
        mono.write_header()?;
        self.set_counter(counter + size)?;
        Ok(mono)
    }

    /// Visit every mono in the region in layout order.
    ///
    /// Jumps from header byte to header byte; a zero byte below the
    /// counter means unoccupied area and ends the walk.
    pub fn traverse<F>(&self, mut visit: F) -> Result<(), HeapError>
    where
        F: FnMut(Mono<'heap>) -> Result<(), HeapError>,
    {
        let counter = self.counter()?;
        let mut begin = REGION_HEADER_SIZE;
        while begin < counter {
            let byte = self.read_byte(begin)?;
            if byte == 0 {
                break;
            }
            let kind = MonoKind::from_byte(byte)?;
            let mono = self.mono_at(kind, begin)?;
            trace!("visiting {:?} at offset {}", kind, begin);
            visit(mono)?;
            begin = mono.end_offset() + 1;
        }
        Ok(())
    }

    /// Copy this region's mono payload `[5, counter)` into another
    /// region's buffer at `dest_offset`, leaving the destination
    /// header untouched. Returns the number of bytes copied.
    pub fn content_clone_to(
        &self,
        dest: &Region<'heap>,
        dest_offset: Offset,
    ) -> Result<Offset, HeapError> {
        let counter = self.counter()?;
        let payload = counter - REGION_HEADER_SIZE;
        if dest_offset < REGION_HEADER_SIZE || dest_offset + payload > REGION_SIZE {
            return Err(HeapError::OutOfRange {
                at: u64::from(dest_offset) + u64::from(payload),
                limit: u64::from(REGION_SIZE),
            });
        }
        unsafe {
            std::ptr::copy(
                self.data.as_ptr().add(REGION_HEADER_SIZE as usize),
                dest.data.as_ptr().add(dest_offset as usize),
                payload as usize,
            );
        }
        Ok(payload)
    }
}

impl<'heap> PartialEq for Region<'heap> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.data == other.data
    }
}

impl<'heap> Debug for Region<'heap> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counter = self.read_u32(0).unwrap_or(0);
        let kind = self.read_byte(4).unwrap_or(0);
        writeln!(
            f,
            "region @{:#x} kind={:#x} counter={}/{}",
            self.base, kind, counter, REGION_SIZE
        )?;
        let mut rows = Vec::new();
        let _ = self.traverse(|mono| {
            rows.push(format!("  {:5}  {:?}", mono.begin_offset(), mono));
            Ok(())
        });
        for row in rows {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
