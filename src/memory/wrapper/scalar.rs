//! Scalar wrappers: INT32 and FLOAT64

use crate::memory::error::HeapError;
use crate::memory::mono::{Mono, MonoKind};

/// View over an INT32 mono: a 4-byte little-endian signed integer
#[derive(Copy, Clone, Debug)]
pub struct Int32View<'heap> {
    mono: Mono<'heap>,
}

impl<'heap> Int32View<'heap> {
    pub fn new(mono: Mono<'heap>) -> Result<Self, HeapError> {
        if mono.kind() != MonoKind::Int32 {
            return Err(HeapError::WrongKind(mono.kind().byte()));
        }
        Ok(Int32View { mono })
    }

    pub fn mono(&self) -> Mono<'heap> {
        self.mono
    }

    pub fn read(&self) -> Result<i32, HeapError> {
        self.mono.region().read_i32(self.mono.value_offset())
    }

    /// Overwrite the payload in place; the mono's bytes stay put
    pub fn write(&self, value: i32) -> Result<(), HeapError> {
        self.mono.region().write_i32(self.mono.value_offset(), value)
    }
}

/// View over a FLOAT64 mono: an 8-byte little-endian IEEE-754 double
#[derive(Copy, Clone, Debug)]
pub struct Float64View<'heap> {
    mono: Mono<'heap>,
}

impl<'heap> Float64View<'heap> {
    pub fn new(mono: Mono<'heap>) -> Result<Self, HeapError> {
        if mono.kind() != MonoKind::Float64 {
            return Err(HeapError::WrongKind(mono.kind().byte()));
        }
        Ok(Float64View { mono })
    }

    pub fn mono(&self) -> Mono<'heap> {
        self.mono
    }

    pub fn read(&self) -> Result<f64, HeapError> {
        self.mono.region().read_f64(self.mono.value_offset())
    }

    pub fn write(&self, value: f64) -> Result<(), HeapError> {
        self.mono.region().write_f64(self.mono.value_offset(), value)
    }
}
