//! The heap: a pre-allocated pool of region buffers
//!
//! The heap owns every byte the guest language can reach. Buffers are
//! reserved up front and handed out as regions in order; an address
//! resolves to (region, offset, mono) without consulting any side
//! table. Interior mutability keeps the whole API on `&self`: region
//! and mono descriptors are views that read and write pool bytes
//! directly, and the bookkeeping state is only ever borrowed briefly
//! inside a single method.

use std::cell::UnsafeCell;

use log::debug;

use super::alloc::Allocator;
use super::block::Block;
use super::error::HeapError;
use super::mono::{Mono, MonoKind};
use super::region::{Region, RegionKind, REGION_HEADER_SIZE, REGION_SIZE};
use super::{Address, Offset};

/// Number of region buffers in the pool (~256 MB)
pub const NUMBER_REGIONS: usize = 256;

/// A snapshot of heap occupancy
#[derive(Debug)]
pub struct HeapStats {
    /// Regions handed out so far (never returns to zero; relocated
    /// source regions stay spent)
    pub regions_in_use: usize,
    /// Regions never handed out
    pub regions_free: usize,
    /// Regions currently in the allocator's working set
    pub nursery_regions: usize,
    /// Minor collections run
    pub collections: u64,
}

struct HeapState {
    /// The pool: one zeroed buffer per region, allocated up front
    content: Vec<Block>,
    /// How many buffers have been handed out
    content_counter: usize,
    /// Base addresses of the allocator's working set, oldest first;
    /// the current allocation region is the last
    nursery: Vec<Address>,
    /// Minor collections run
    collections: u64,
}

/// The heap (with interior mutability)
pub struct Heap {
    state: UnsafeCell<HeapState>,
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}

impl Heap {
    /// Reserve the whole pool. Aborts if the OS refuses memory (see
    /// [`Block::new`]).
    pub fn new() -> Self {
        let content = (0..NUMBER_REGIONS)
            .map(|_| Block::new(REGION_SIZE as usize))
            .collect();
        Heap {
            state: UnsafeCell::new(HeapState {
                content,
                content_counter: 0,
                nursery: Vec::new(),
                collections: 0,
            }),
        }
    }

    /// A view granting allocation into this heap
    pub fn allocator(&self) -> Allocator<'_> {
        Allocator::new(self)
    }

    /// Hand out the next never-used buffer as a fresh EDEN region
    /// with its header initialized.
    pub fn new_region(&self) -> Result<Region<'_>, HeapError> {
        let (data, base) = {
            let state = unsafe { &mut *self.state.get() };
            if state.content_counter == NUMBER_REGIONS {
                return Err(HeapError::HeapFull(NUMBER_REGIONS));
            }
            let index = state.content_counter;
            state.content_counter += 1;
            (
                state.content[index].as_ptr(),
                index as Address * Address::from(REGION_SIZE),
            )
        };
        let region = Region::new(self, data, base);
        region.set_counter(REGION_HEADER_SIZE)?;
        region.write_kind(RegionKind::Eden)?;
        debug!("handing out region @{:#x}", base);
        Ok(region)
    }

    /// Form a region over an already-initialized buffer, reading its
    /// header (and elevating zero counter/kind bytes on the way).
    ///
    /// A buffer is just memory; none of the region operations apply
    /// until a region view is formed over it.
    pub fn region_from_content(&self, base: Address) -> Result<Region<'_>, HeapError> {
        let index = (base / Address::from(REGION_SIZE)) as usize;
        if index >= NUMBER_REGIONS {
            return Err(HeapError::OutOfRegionRange(base));
        }
        let data = {
            let state = unsafe { &mut *self.state.get() };
            state.content[index].as_ptr()
        };
        let region = Region::new(self, data, index as Address * Address::from(REGION_SIZE));
        region.counter()?;
        region.read_kind()?;
        Ok(region)
    }

    /// Resolve a heap address to the region containing it
    pub fn fetch_region(&self, address: Address) -> Result<Region<'_>, HeapError> {
        let base = address - address % Address::from(REGION_SIZE);
        self.region_from_content(base)
    }

    /// Resolve a heap address to a mono descriptor. The address must
    /// point at the header byte of a mono; the null address and
    /// addresses inside a region header never resolve.
    pub fn fetch_mono(&self, address: Address) -> Result<Mono<'_>, HeapError> {
        let index = (address / Address::from(REGION_SIZE)) as usize;
        if index >= NUMBER_REGIONS {
            return Err(HeapError::OutOfRegionRange(address));
        }
        let offset = (address % Address::from(REGION_SIZE)) as Offset;
        if offset < REGION_HEADER_SIZE {
            return Err(HeapError::OutOfRange {
                at: u64::from(offset),
                limit: u64::from(REGION_HEADER_SIZE),
            });
        }
        let region = self.region_from_content(index as Address * Address::from(REGION_SIZE))?;
        let kind = MonoKind::from_byte(region.read_byte(offset)?)?;
        region.mono_at(kind, offset)
    }

    /// Base addresses of the allocator's working set, oldest first
    pub(crate) fn nursery(&self) -> Vec<Address> {
        let state = unsafe { &mut *self.state.get() };
        state.nursery.clone()
    }

    /// Base address of the current allocation region
    pub(crate) fn nursery_last(&self) -> Option<Address> {
        let state = unsafe { &mut *self.state.get() };
        state.nursery.last().copied()
    }

    pub(crate) fn push_nursery(&self, base: Address) {
        let state = unsafe { &mut *self.state.get() };
        state.nursery.push(base);
    }

    /// Swap in a refreshed working set after a collection; relocated
    /// source regions are dead from here on.
    pub(crate) fn replace_nursery(&self, bases: Vec<Address>) {
        let state = unsafe { &mut *self.state.get() };
        state.nursery = bases;
    }

    pub(crate) fn record_collection(&self) {
        let state = unsafe { &mut *self.state.get() };
        state.collections += 1;
    }

    /// Statistics
    pub fn stats(&self) -> HeapStats {
        let state = unsafe { &mut *self.state.get() };
        HeapStats {
            regions_in_use: state.content_counter,
            regions_free: NUMBER_REGIONS - state.content_counter,
            nursery_regions: state.nursery.len(),
            collections: state.collections,
        }
    }
}
