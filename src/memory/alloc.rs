//! The bump allocator
//!
//! A copyable view over the heap granting allocation. The working set
//! of writable regions (the nursery) lives in heap state so that any
//! wrapper holding a heap reference can allocate — the array wrapper
//! needs this to link spill chunks mid-append. The current allocation
//! region is always the last of the working set.
//!
//! Bytes within a region are never reused; reclamation is entirely
//! the collector's job.

use log::debug;

use super::collect::collect_minor;
use super::error::HeapError;
use super::heap::Heap;
use super::mono::{Mono, MonoKind};
use super::region::Region;
use super::wrapper::array::ArrayView;
use super::wrapper::chunk::ChunkView;
use super::wrapper::scalar::{Float64View, Int32View};
use super::wrapper::MonoView;

/// Allocation view over a heap
#[derive(Copy, Clone)]
pub struct Allocator<'heap> {
    heap: &'heap Heap,
}

impl<'heap> Allocator<'heap> {
    pub fn new(heap: &'heap Heap) -> Self {
        Allocator { heap }
    }

    pub fn heap(&self) -> &'heap Heap {
        self.heap
    }

    fn current_region(&self) -> Result<Option<Region<'heap>>, HeapError> {
        match self.heap.nursery_last() {
            Some(base) => Ok(Some(self.heap.fetch_region(base)?)),
            None => Ok(None),
        }
    }

    fn roll_region(&self) -> Result<Region<'heap>, HeapError> {
        let region = self.heap.new_region()?;
        self.heap.push_nursery(region.base());
        debug!("rolled to fresh region @{:#x}", region.base());
        Ok(region)
    }

    /// Reserve a mono of the requested kind, rolling to a new region
    /// when the current one cannot fit it and falling back to a minor
    /// collection when the heap has no fresh regions left. A heap
    /// that stays exhausted after collection is out of memory.
    pub(crate) fn reserve(&self, kind: MonoKind) -> Result<Mono<'heap>, HeapError> {
        let size = kind.size();
        if let Some(region) = self.current_region()? {
            if region.capable(size)? {
                return region.create_mono(kind);
            }
        }
        match self.roll_region() {
            Ok(region) => region.create_mono(kind),
            Err(HeapError::HeapFull(_)) => {
                debug!("heap exhausted, attempting minor collection");
                match collect_minor(self.heap) {
                    Ok(stats) => {
                        debug!("collection compacted {} pairs", stats.pairs_compacted)
                    }
                    Err(HeapError::HeapFull(_)) => return Err(HeapError::OutOfMemory),
                    Err(e) => return Err(e),
                }
                if let Some(region) = self.current_region()? {
                    if region.capable(size)? {
                        return region.create_mono(kind);
                    }
                }
                match self.roll_region() {
                    Ok(region) => region.create_mono(kind),
                    Err(HeapError::HeapFull(_)) => Err(HeapError::OutOfMemory),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Allocate a mono of any kind and return its dispatched wrapper
    pub fn allocate(&self, kind: MonoKind) -> Result<MonoView<'heap>, HeapError> {
        self.reserve(kind)?.dispatch()
    }

    pub fn int32(&self, value: i32) -> Result<Int32View<'heap>, HeapError> {
        let view = Int32View::new(self.reserve(MonoKind::Int32)?)?;
        view.write(value)?;
        Ok(view)
    }

    pub fn float64(&self, value: f64) -> Result<Float64View<'heap>, HeapError> {
        let view = Float64View::new(self.reserve(MonoKind::Float64)?)?;
        view.write(value)?;
        Ok(view)
    }

    pub fn array(&self) -> Result<ArrayView<'heap>, HeapError> {
        ArrayView::init(self.reserve(MonoKind::ArrayS8)?)
    }

    pub fn chunk(&self) -> Result<ChunkView<'heap>, HeapError> {
        ChunkView::new(self.reserve(MonoKind::ChunkS8)?)
    }
}
