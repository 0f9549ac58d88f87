//! Capture and report statistics for a driver run

use std::{fmt::Display, time::Duration};

use indexmap::IndexMap;

use crate::memory::collect::CollectionStats;
use crate::memory::heap::HeapStats;

#[derive(Default, Debug)]
pub struct Timings {
    timings: IndexMap<String, Duration>,
}

impl Timings {
    pub fn record<T: AsRef<str>>(&mut self, name: T, elapsed: Duration) {
        self.timings.insert(name.as_ref().to_string(), elapsed);
    }
}

impl Display for Timings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.timings.keys().map(|k| k.len()).max().unwrap_or(0) + 1;
        for (k, v) in &self.timings {
            writeln!(f, "{:width$}: {:14.9}s", k, v.as_secs_f64(), width = width)?;
        }
        Ok(())
    }
}

/// The statistics captured during a run
#[derive(Default, Debug)]
pub struct Statistics {
    /// Monos allocated
    allocations: u64,
    /// Minor collections run
    collections: u64,
    /// Region pairs compacted across all collections
    pairs_compacted: usize,
    /// Mono payload bytes relocated
    bytes_copied: u64,
    /// Stored pointers updated by rewrite sweeps
    pointers_rewritten: u64,
    /// Regions handed out of the pool
    regions_in_use: usize,
    /// Regions in the allocator's working set at exit
    nursery_regions: usize,
    /// Elapsed timings
    timings: Timings,
}

impl Statistics {
    pub fn record_allocation(&mut self) {
        self.allocations += 1;
    }

    pub fn merge_collection(&mut self, stats: &CollectionStats) {
        self.collections += 1;
        self.pairs_compacted += stats.pairs_compacted;
        self.bytes_copied += stats.bytes_copied;
        self.pointers_rewritten += stats.pointers_rewritten;
    }

    pub fn capture_heap(&mut self, stats: &HeapStats) {
        self.regions_in_use = stats.regions_in_use;
        self.nursery_regions = stats.nursery_regions;
    }

    pub fn timings_mut(&mut self) -> &mut Timings {
        &mut self.timings
    }
}

impl Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "allocations        : {}", self.allocations)?;
        writeln!(f, "collections        : {}", self.collections)?;
        writeln!(f, "pairs compacted    : {}", self.pairs_compacted)?;
        writeln!(f, "bytes copied       : {}", self.bytes_copied)?;
        writeln!(f, "pointers rewritten : {}", self.pointers_rewritten)?;
        writeln!(f, "regions in use     : {}", self.regions_in_use)?;
        writeln!(f, "nursery regions    : {}", self.nursery_regions)?;
        write!(f, "{}", self.timings)
    }
}
