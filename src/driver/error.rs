//! Overall high-level error type for the driver
use std::io;

use thiserror::Error;

use crate::memory::error::HeapError;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Heap(#[from] HeapError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("line {0}: {1}")]
    Script(usize, String),
}
