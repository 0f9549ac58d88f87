//! Typed views over monos
//!
//! Wrappers give guest-language semantics to the raw bytes of a mono:
//! scalars read and write their payload in place, chunks and arrays
//! implement the chunked linked list. Views never own bytes and may
//! be re-materialized from a heap address at any time.

pub mod array;
pub mod chunk;
pub mod object;
pub mod scalar;

use super::error::HeapError;
use super::mono::{Mono, MonoKind};
use array::ArrayView;
use chunk::ChunkView;
use object::{AddressView, NamedPropertyView, ObjectView, StringView};
use scalar::{Float64View, Int32View};

/// A mono dispatched to its concrete wrapper.
///
/// The kind byte selects the variant; unknown kind bytes have already
/// failed at [`MonoKind::from_byte`] by the time a mono exists.
#[derive(Debug)]
pub enum MonoView<'heap> {
    Int32(Int32View<'heap>),
    Float64(Float64View<'heap>),
    Array(ArrayView<'heap>),
    Chunk(ChunkView<'heap>),
    Address(AddressView<'heap>),
    String(StringView<'heap>),
    Object(ObjectView<'heap>),
    NamedProperty(NamedPropertyView<'heap>),
}

impl<'heap> Mono<'heap> {
    /// Select the concrete wrapper for this mono's kind
    pub fn dispatch(self) -> Result<MonoView<'heap>, HeapError> {
        match self.kind() {
            MonoKind::Int32 => Ok(MonoView::Int32(Int32View::new(self)?)),
            MonoKind::Float64 => Ok(MonoView::Float64(Float64View::new(self)?)),
            MonoKind::ArrayS8 => Ok(MonoView::Array(ArrayView::new(self)?)),
            MonoKind::ChunkS8 => Ok(MonoView::Chunk(ChunkView::new(self)?)),
            MonoKind::Address => Ok(MonoView::Address(AddressView::new(self)?)),
            MonoKind::StringS8 => Ok(MonoView::String(StringView::new(self)?)),
            MonoKind::ObjectS8 => Ok(MonoView::Object(ObjectView::new(self)?)),
            MonoKind::NamedPropertyS8 => {
                Ok(MonoView::NamedProperty(NamedPropertyView::new(self)?))
            }
        }
    }
}

impl<'heap> MonoView<'heap> {
    pub fn mono(&self) -> Mono<'heap> {
        match self {
            MonoView::Int32(v) => v.mono(),
            MonoView::Float64(v) => v.mono(),
            MonoView::Array(v) => v.mono(),
            MonoView::Chunk(v) => v.mono(),
            MonoView::Address(v) => v.mono(),
            MonoView::String(v) => v.mono(),
            MonoView::Object(v) => v.mono(),
            MonoView::NamedProperty(v) => v.mono(),
        }
    }

    pub fn kind(&self) -> MonoKind {
        self.mono().kind()
    }
}
