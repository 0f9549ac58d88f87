//! Chunk wrapper: the fixed-capacity node of the array's linked list
//!
//! A chunk holds up to eight pointers to element monos and the
//! address of the next chunk. Because slots are addresses, one chunk
//! carries elements of any mix of kinds:
//!
//! ```text
//! [1, "foo", [3.14, "bar"], 199]
//! ```
//!
//! Payload layout, offsets relative to the mono's value:
//!
//! ```text
//! 0        1..33                33..37
//! length   8 x 4-byte slots     next chunk address (0 = end)
//! ```

use crate::memory::error::HeapError;
use crate::memory::mono::{Mono, MonoKind};
use crate::memory::{Address, Offset};

/// Elements per chunk
pub const CHUNK_CAPACITY: u8 = 8;

const AT_LENGTH: Offset = 0;
const AT_FIRST_SLOT: Offset = 1;
const SLOT_SIZE: Offset = 4;
const AT_NEXT: Offset = 33;

/// View over a CHUNK_S8 mono
#[derive(Copy, Clone, Debug)]
pub struct ChunkView<'heap> {
    mono: Mono<'heap>,
}

impl<'heap> ChunkView<'heap> {
    pub fn new(mono: Mono<'heap>) -> Result<Self, HeapError> {
        if mono.kind() != MonoKind::ChunkS8 {
            return Err(HeapError::WrongKind(mono.kind().byte()));
        }
        Ok(ChunkView { mono })
    }

    pub fn mono(&self) -> Mono<'heap> {
        self.mono
    }

    fn at_length(&self) -> Offset {
        self.mono.value_offset() + AT_LENGTH
    }

    fn at_slot(&self, index: u8) -> Offset {
        self.mono.value_offset() + AT_FIRST_SLOT + SLOT_SIZE * Offset::from(index)
    }

    fn at_next(&self) -> Offset {
        self.mono.value_offset() + AT_NEXT
    }

    /// Occupied slots, 0 to 8
    pub fn length(&self) -> Result<u8, HeapError> {
        self.mono.region().read_u8(self.at_length())
    }

    fn write_length(&self, length: u8) -> Result<(), HeapError> {
        self.mono.region().write_u8(self.at_length(), length)
    }

    pub fn is_full(&self) -> Result<bool, HeapError> {
        Ok(self.length()? >= CHUNK_CAPACITY)
    }

    /// Store an element's header address in the next free slot
    pub fn append(&self, element: &Mono<'heap>) -> Result<(), HeapError> {
        self.append_address(element.address())
    }

    pub(crate) fn append_address(&self, address: Address) -> Result<(), HeapError> {
        let length = self.length()?;
        if length >= CHUNK_CAPACITY {
            return Err(HeapError::ChunkFull);
        }
        self.mono
            .region()
            .write_address(self.at_slot(length), address)?;
        self.write_length(length + 1)
    }

    /// The stored pointer at a slot
    pub fn address_at(&self, index: u8) -> Result<Address, HeapError> {
        let length = self.length()?;
        if index >= length {
            return Err(HeapError::OutOfRange {
                at: u64::from(index),
                limit: u64::from(length),
            });
        }
        self.mono.region().read_address(self.at_slot(index))
    }

    /// Resolve the element at a slot through the heap. The caller
    /// dispatches the mono to a wrapper via its kind.
    pub fn index(&self, index: u8) -> Result<Mono<'heap>, HeapError> {
        let address = self.address_at(index)?;
        self.mono.region().heap().fetch_mono(address)
    }

    /// Visit each occupied slot as `(slot index, stored address)`
    pub fn traverse_addresses<F>(&self, mut visit: F) -> Result<(), HeapError>
    where
        F: FnMut(u8, Address) -> Result<(), HeapError>,
    {
        let length = self.length()?;
        for index in 0..length {
            let address = self.mono.region().read_address(self.at_slot(index))?;
            visit(index, address)?;
        }
        Ok(())
    }

    /// Point an occupied slot at a relocated element (collector only)
    pub(crate) fn rewrite_slot(&self, index: u8, address: Address) -> Result<(), HeapError> {
        let length = self.length()?;
        if index >= length {
            return Err(HeapError::OutOfRange {
                at: u64::from(index),
                limit: u64::from(length),
            });
        }
        self.mono.region().write_address(self.at_slot(index), address)
    }

    /// Chain management: a zero next pointer means end of list
    pub fn set_next(&self, address: Address) -> Result<(), HeapError> {
        self.mono.region().write_address(self.at_next(), address)
    }

    pub fn next_address(&self) -> Result<Address, HeapError> {
        self.mono.region().read_address(self.at_next())
    }

    pub fn fetch_next(&self) -> Result<Option<ChunkView<'heap>>, HeapError> {
        let address = self.next_address()?;
        if address == 0 {
            return Ok(None);
        }
        let mono = self.mono.region().heap().fetch_mono(address)?;
        Ok(Some(ChunkView::new(mono)?))
    }
}
