//! Address, string, object and named-property wrappers
//!
//! ADDRESS monos carry one stored pointer and are fully functional
//! (the collector rewrites them like any other pointer field). The
//! string/object/property record shapes are reserved: their sizes are
//! part of the on-heap format, but their operations are not built
//! yet and fail as unimplemented.

use crate::memory::error::HeapError;
use crate::memory::mono::{Mono, MonoKind};
use crate::memory::Address;

/// View over an ADDRESS mono: one 4-byte stored pointer
#[derive(Copy, Clone, Debug)]
pub struct AddressView<'heap> {
    mono: Mono<'heap>,
}

impl<'heap> AddressView<'heap> {
    pub fn new(mono: Mono<'heap>) -> Result<Self, HeapError> {
        if mono.kind() != MonoKind::Address {
            return Err(HeapError::WrongKind(mono.kind().byte()));
        }
        Ok(AddressView { mono })
    }

    pub fn mono(&self) -> Mono<'heap> {
        self.mono
    }

    pub fn read(&self) -> Result<Address, HeapError> {
        self.mono.region().read_address(self.mono.value_offset())
    }

    pub fn write(&self, address: Address) -> Result<(), HeapError> {
        self.mono
            .region()
            .write_address(self.mono.value_offset(), address)
    }

    /// Resolve the stored pointer; fails on null
    pub fn fetch(&self) -> Result<Mono<'heap>, HeapError> {
        let address = self.read()?;
        self.mono.region().heap().fetch_mono(address)
    }
}

/// View over a STRING_S8 mono: 8 eight-byte character slots plus a
/// next-chunk continuation (reserved)
#[derive(Copy, Clone, Debug)]
pub struct StringView<'heap> {
    mono: Mono<'heap>,
}

impl<'heap> StringView<'heap> {
    pub fn new(mono: Mono<'heap>) -> Result<Self, HeapError> {
        if mono.kind() != MonoKind::StringS8 {
            return Err(HeapError::WrongKind(mono.kind().byte()));
        }
        Ok(StringView { mono })
    }

    pub fn mono(&self) -> Mono<'heap> {
        self.mono
    }

    pub fn read(&self) -> Result<String, HeapError> {
        Err(HeapError::Unimplemented("string reads"))
    }

    pub fn write(&self, _text: &str) -> Result<(), HeapError> {
        Err(HeapError::Unimplemented("string writes"))
    }
}

/// View over an OBJECT_S8 mono: 8 slots plus a pointer to a
/// named-property chain (reserved)
#[derive(Copy, Clone, Debug)]
pub struct ObjectView<'heap> {
    mono: Mono<'heap>,
}

impl<'heap> ObjectView<'heap> {
    pub fn new(mono: Mono<'heap>) -> Result<Self, HeapError> {
        if mono.kind() != MonoKind::ObjectS8 {
            return Err(HeapError::WrongKind(mono.kind().byte()));
        }
        Ok(ObjectView { mono })
    }

    pub fn mono(&self) -> Mono<'heap> {
        self.mono
    }

    pub fn get(&self, _slot: u8) -> Result<Mono<'heap>, HeapError> {
        Err(HeapError::Unimplemented("object slot reads"))
    }

    pub fn set(&self, _slot: u8, _value: &Mono<'heap>) -> Result<(), HeapError> {
        Err(HeapError::Unimplemented("object slot writes"))
    }

    pub fn properties(&self) -> Result<NamedPropertyView<'heap>, HeapError> {
        Err(HeapError::Unimplemented("object property tables"))
    }
}

/// View over a NAMED_PROPERTY_S8 mono: 8 (name pointer, value
/// pointer) pairs plus a next pointer (reserved)
#[derive(Copy, Clone, Debug)]
pub struct NamedPropertyView<'heap> {
    mono: Mono<'heap>,
}

impl<'heap> NamedPropertyView<'heap> {
    pub fn new(mono: Mono<'heap>) -> Result<Self, HeapError> {
        if mono.kind() != MonoKind::NamedPropertyS8 {
            return Err(HeapError::WrongKind(mono.kind().byte()));
        }
        Ok(NamedPropertyView { mono })
    }

    pub fn mono(&self) -> Mono<'heap> {
        self.mono
    }

    pub fn lookup(&self, _name: Address) -> Result<Mono<'heap>, HeapError> {
        Err(HeapError::Unimplemented("named property lookups"))
    }

    pub fn insert(&self, _name: Address, _value: Address) -> Result<(), HeapError> {
        Err(HeapError::Unimplemented("named property inserts"))
    }
}
