//! Array wrapper: a growable array as a linked list of chunks
//!
//! An array mono embeds its first chunk (the default chunk); further
//! chunks are standalone CHUNK_S8 monos linked by next pointers.
//! Payload layout, offsets relative to the mono's value:
//!
//! ```text
//! 0..4           4
//! total length   embedded default chunk mono (header byte onward)
//! ```
//!
//! Arrays are immutable to the guest once handed out: `clone`,
//! `slice`, `concat` and the removing operations produce new array
//! monos that share the element monos of their source. In-place
//! `append` is for construction only.
//!
//! Chunk growth under repeated appends:
//!
//! ```text
//! empty   --append-->   partial    (0 < length < 8)
//! partial --append-->   partial | full
//! full    --append-->   spill into a newly linked chunk
//! linked  --append-->   growth continues at the tail
//! ```

use crate::memory::alloc::Allocator;
use crate::memory::error::HeapError;
use crate::memory::mono::{Mono, MonoKind};
use crate::memory::wrapper::chunk::{ChunkView, CHUNK_CAPACITY};
use crate::memory::{Address, Offset};

const AT_LENGTH: Offset = 0;
const AT_DEFAULT_CHUNK: Offset = 4;

/// View over an ARRAY_S8 mono
#[derive(Debug)]
pub struct ArrayView<'heap> {
    mono: Mono<'heap>,
}

impl<'heap> ArrayView<'heap> {
    /// View a freshly reserved array mono, tagging the embedded
    /// default chunk's header byte. Called once per array, by the
    /// allocator.
    pub(crate) fn init(mono: Mono<'heap>) -> Result<Self, HeapError> {
        let view = ArrayView::new(mono)?;
        view.default_chunk_mono()?.write_header()?;
        Ok(view)
    }

    /// View an existing array mono
    pub fn new(mono: Mono<'heap>) -> Result<Self, HeapError> {
        if mono.kind() != MonoKind::ArrayS8 {
            return Err(HeapError::WrongKind(mono.kind().byte()));
        }
        Ok(ArrayView { mono })
    }

    pub fn mono(&self) -> Mono<'heap> {
        self.mono
    }

    fn allocator(&self) -> Allocator<'heap> {
        Allocator::new(self.mono.region().heap())
    }

    fn at_length(&self) -> Offset {
        self.mono.value_offset() + AT_LENGTH
    }

    fn default_chunk_mono(&self) -> Result<Mono<'heap>, HeapError> {
        self.mono
            .region()
            .mono_at(MonoKind::ChunkS8, self.mono.value_offset() + AT_DEFAULT_CHUNK)
    }

    /// The embedded first chunk of the list
    pub fn default_chunk(&self) -> Result<ChunkView<'heap>, HeapError> {
        ChunkView::new(self.default_chunk_mono()?)
    }

    /// Total element count across all chunks
    pub fn length(&self) -> Result<u32, HeapError> {
        self.mono.region().read_u32(self.at_length())
    }

    fn write_length(&self, length: u32) -> Result<(), HeapError> {
        self.mono.region().write_u32(self.at_length(), length)
    }

    /// Walk the chunk list to the chunk with this id; None when the
    /// list ends first.
    fn chunk_at(&self, chunk_id: u32) -> Result<Option<ChunkView<'heap>>, HeapError> {
        let mut chunk = self.default_chunk()?;
        for _ in 0..chunk_id {
            match chunk.fetch_next()? {
                Some(next) => chunk = next,
                None => return Ok(None),
            }
        }
        Ok(Some(chunk))
    }

    /// The chunk holding the highest occupied slot
    fn last_chunk(&self) -> Result<ChunkView<'heap>, HeapError> {
        let length = self.length()?;
        let last_id = if length == 0 {
            0
        } else {
            (length - 1) / u32::from(CHUNK_CAPACITY)
        };
        self.chunk_at(last_id)?.ok_or(HeapError::OutOfRange {
            at: u64::from(last_id),
            limit: u64::from(length),
        })
    }

    /// Resolve the element at an index. The caller dispatches the
    /// mono to a wrapper via its kind.
    pub fn index(&self, index: u32) -> Result<Mono<'heap>, HeapError> {
        let length = self.length()?;
        if index >= length {
            return Err(HeapError::OutOfRange {
                at: u64::from(index),
                limit: u64::from(length),
            });
        }
        let chunk = self
            .chunk_at(index / u32::from(CHUNK_CAPACITY))?
            .ok_or(HeapError::OutOfRange {
                at: u64::from(index),
                limit: u64::from(length),
            })?;
        chunk.index((index % u32::from(CHUNK_CAPACITY)) as u8)
    }

    /// Append an element mono during construction. Spills into a
    /// newly allocated chunk when the tail chunk is complete.
    pub fn append(&self, element: &Mono<'heap>) -> Result<(), HeapError> {
        self.append_address(element.address())
    }

    pub(crate) fn append_address(&self, address: Address) -> Result<(), HeapError> {
        let length = self.length()?;
        let last = self.last_chunk()?;
        if length > 0 && length % u32::from(CHUNK_CAPACITY) == 0 {
            // position `length` starts a chunk that does not exist yet
            let spill = self.allocator().chunk()?;
            last.set_next(spill.mono().address())?;
            spill.append_address(address)?;
        } else {
            last.append_address(address)?;
        }
        self.write_length(length + 1)
    }

    /// Visit each element as `(array index, stored address)`
    pub fn traverse_addresses<F>(&self, mut visit: F) -> Result<(), HeapError>
    where
        F: FnMut(u32, Address) -> Result<(), HeapError>,
    {
        let length = self.length()?;
        let mut base_index: u32 = 0;
        let mut chunk = Some(self.default_chunk()?);
        while let Some(current) = chunk {
            if base_index >= length {
                break;
            }
            current.traverse_addresses(|i, address| visit(base_index + u32::from(i), address))?;
            base_index += u32::from(current.length()?);
            chunk = current.fetch_next()?;
        }
        Ok(())
    }

    /// A new array sharing this array's element monos
    pub fn clone(&self) -> Result<ArrayView<'heap>, HeapError> {
        let out = self.allocator().array()?;
        self.traverse_addresses(|_, address| out.append_address(address))?;
        Ok(out)
    }

    /// A new array of the elements `[from, to]`, bounds inclusive
    pub fn slice(&self, from: u32, to: u32) -> Result<ArrayView<'heap>, HeapError> {
        let length = self.length()?;
        if from > to || to >= length {
            return Err(HeapError::OutOfRange {
                at: u64::from(to),
                limit: u64::from(length),
            });
        }
        let out = self.allocator().array()?;
        self.traverse_addresses(|i, address| {
            if i >= from && i <= to {
                out.append_address(address)
            } else {
                Ok(())
            }
        })?;
        Ok(out)
    }

    /// A new array of this array's elements followed by the other's
    pub fn concat(&self, other: &ArrayView<'heap>) -> Result<ArrayView<'heap>, HeapError> {
        let out = self.clone()?;
        other.traverse_addresses(|_, address| out.append_address(address))?;
        Ok(out)
    }

    /// A new array with the element appended
    pub fn push(&self, element: &Mono<'heap>) -> Result<ArrayView<'heap>, HeapError> {
        let out = self.clone()?;
        out.append(element)?;
        Ok(out)
    }

    /// A new array without the last element, and that element
    pub fn pop(&self) -> Result<(ArrayView<'heap>, Mono<'heap>), HeapError> {
        let length = self.length()?;
        if length == 0 {
            return Err(HeapError::OutOfRange { at: 0, limit: 0 });
        }
        let removed = self.index(length - 1)?;
        let rest = if length == 1 {
            self.allocator().array()?
        } else {
            self.slice(0, length - 2)?
        };
        Ok((rest, removed))
    }

    /// A new array without the first element, and that element
    pub fn shift(&self) -> Result<(ArrayView<'heap>, Mono<'heap>), HeapError> {
        let length = self.length()?;
        if length == 0 {
            return Err(HeapError::OutOfRange { at: 0, limit: 0 });
        }
        let removed = self.index(0)?;
        let rest = if length == 1 {
            self.allocator().array()?
        } else {
            self.slice(1, length - 1)?
        };
        Ok((rest, removed))
    }

    /// A new array without the element at `index`, and that element
    pub fn remove(&self, index: u32) -> Result<(ArrayView<'heap>, Mono<'heap>), HeapError> {
        let length = self.length()?;
        if index >= length {
            return Err(HeapError::OutOfRange {
                at: u64::from(index),
                limit: u64::from(length),
            });
        }
        if index == 0 {
            return self.shift();
        }
        if index == length - 1 {
            return self.pop();
        }
        let removed = self.index(index)?;
        let rest = self
            .slice(0, index - 1)?
            .concat(&self.slice(index + 1, length - 1)?)?;
        Ok((rest, removed))
    }
}
