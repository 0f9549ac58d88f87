//! Loam: a region-based managed heap for a small dynamic guest language
//!
//! Guest values are tagged byte records ("monos") bump-allocated into
//! 1 MB regions carved from a pre-allocated pool. Growable arrays are
//! chunked linked lists of element pointers, and a minor relocating
//! collector compacts pairs of young regions and rewrites every
//! in-heap pointer to follow the move.
//!
//! The guest-language interpreter is an external client; it touches
//! the heap only through the allocator, the typed wrappers and
//! address re-materialization (`fetch_mono` + `dispatch`). The
//! `driver` module provides a stand-in client: a line-oriented script
//! runner behind the `loam` binary.

extern crate indexmap;
extern crate thiserror;

pub mod driver;
pub mod memory;
