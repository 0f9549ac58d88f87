//! Minor collection: compacting young region pairs
//!
//! The collector reclaims the slack in young regions by merging pairs
//! of them into fresh regions and rewriting every stored pointer that
//! referenced a relocated mono. There is no root set: every mono of a
//! paired region survives the copy. Relocated source regions are dead
//! afterwards — the allocator's working set is refreshed to the
//! merged regions and any unpaired survivors.
//!
//! The compaction copy for all pairs completes before the rewrite
//! sweep begins, so every pointee referenced by a rewritten pointer
//! already exists at its new location.

use std::cmp::min;

use indexmap::IndexMap;
use log::{debug, trace};

use super::error::HeapError;
use super::heap::Heap;
use super::mono::MonoKind;
use super::region::{Region, REGION_HEADER_SIZE, REGION_SIZE};
use super::wrapper::array::ArrayView;
use super::wrapper::chunk::ChunkView;
use super::wrapper::object::AddressView;
use super::Address;

/// What one minor collection accomplished
#[derive(Debug, Default, Clone)]
pub struct CollectionStats {
    /// Region pairs merged into fresh regions
    pub pairs_compacted: usize,
    /// Source regions retired by the merge
    pub regions_retired: usize,
    /// Mono payload bytes copied
    pub bytes_copied: u64,
    /// Stored pointers updated by the rewrite sweep
    pub pointers_rewritten: u64,
}

/// File each young region by occupancy: at most 40%, or above that
/// and at most 60%. Fuller regions are left alone.
fn classify(heap: &Heap, nursery: &[Address]) -> Result<(Vec<Address>, Vec<Address>), HeapError> {
    let mut less_than_40 = Vec::new();
    let mut less_than_60 = Vec::new();
    for base in nursery {
        let region = heap.fetch_region(*base)?;
        let counter = region.counter()?;
        let percent = u64::from(counter) * 100 / u64::from(REGION_SIZE);
        if percent <= 40 {
            less_than_40.push(*base);
        } else if percent <= 60 {
            less_than_60.push(*base);
        }
    }
    Ok((less_than_40, less_than_60))
}

/// Run one minor collection over the allocator's working set.
///
/// Buckets pair index-wise; a surplus in either bucket waits for the
/// next cycle. Each source region is relocated at most once per
/// cycle.
pub fn collect_minor(heap: &Heap) -> Result<CollectionStats, HeapError> {
    let nursery = heap.nursery();
    let (less_than_40, less_than_60) = classify(heap, &nursery)?;
    debug!(
        "minor collection over {} regions: {} at <=40%, {} at <=60%, {} pairs",
        nursery.len(),
        less_than_40.len(),
        less_than_60.len(),
        min(less_than_40.len(), less_than_60.len())
    );

    let mut stats = CollectionStats::default();
    let mut rebase: IndexMap<Address, Address> = IndexMap::new();
    let mut fresh: Vec<Address> = Vec::new();

    for (a_base, b_base) in less_than_40.iter().zip(less_than_60.iter()) {
        let a = heap.fetch_region(*a_base)?;
        let b = heap.fetch_region(*b_base)?;
        let dest = heap.new_region()?;
        let payload_a = a.content_clone_to(&dest, REGION_HEADER_SIZE)?;
        let payload_b = b.content_clone_to(&dest, REGION_HEADER_SIZE + payload_a)?;
        dest.set_counter(REGION_HEADER_SIZE + payload_a + payload_b)?;
        rebase.insert(a.base(), dest.base());
        rebase.insert(b.base(), dest.base() + Address::from(payload_a));
        fresh.push(dest.base());
        stats.pairs_compacted += 1;
        stats.regions_retired += 2;
        stats.bytes_copied += u64::from(payload_a) + u64::from(payload_b);
        debug!(
            "compacted @{:#x} ({}) + @{:#x} ({}) into @{:#x}",
            a.base(),
            payload_a,
            b.base(),
            payload_b,
            dest.base()
        );
    }

    for base in &fresh {
        let region = heap.fetch_region(*base)?;
        stats.pointers_rewritten += rewrite_region(&region, &rebase)?;
    }

    let mut refreshed: Vec<Address> = nursery
        .into_iter()
        .filter(|base| !rebase.contains_key(base))
        .collect();
    refreshed.extend(fresh.iter().copied());
    heap.replace_nursery(refreshed);
    heap.record_collection();
    debug!(
        "collection done: {} bytes copied, {} pointers rewritten",
        stats.bytes_copied, stats.pointers_rewritten
    );
    Ok(stats)
}

/// Full collection of tenured and humongous regions does not exist
/// yet; only the minor cycle runs.
pub fn collect_full(_heap: &Heap) -> Result<CollectionStats, HeapError> {
    Err(HeapError::Unimplemented("full collection"))
}

/// The relocated address of a stored pointer, or None when its
/// pointee did not move. Null pointers never move.
///
/// The offset is taken within the pointer's source region — both
/// members of a pair share the scalar offset space — so the rebase
/// entry for the pair's second region already carries the shift past
/// the first region's payload.
fn rebase_address(pointer: Address, rebase: &IndexMap<Address, Address>) -> Option<Address> {
    if pointer == 0 {
        return None;
    }
    let old_base = pointer - pointer % Address::from(REGION_SIZE);
    rebase
        .get(&old_base)
        .map(|new_base| new_base + (pointer - old_base))
}

/// Sweep one merged region, rewriting every pointer field whose
/// pointee was relocated. Chunk next pointers are included.
fn rewrite_region(
    region: &Region<'_>,
    rebase: &IndexMap<Address, Address>,
) -> Result<u64, HeapError> {
    let mut rewritten: u64 = 0;
    region.traverse(|mono| {
        match mono.kind() {
            MonoKind::Address => {
                let pointer = AddressView::new(mono)?;
                if let Some(moved) = rebase_address(pointer.read()?, rebase) {
                    pointer.write(moved)?;
                    rewritten += 1;
                }
            }
            MonoKind::ChunkS8 => {
                rewritten += rewrite_chunk(&ChunkView::new(mono)?, rebase)?;
            }
            MonoKind::ArrayS8 => {
                let array = ArrayView::new(mono)?;
                rewritten += rewrite_chunk(&array.default_chunk()?, rebase)?;
            }
            // scalars carry no pointers; the reserved kinds cannot
            // hold non-null pointers until their writes exist
            _ => {}
        }
        Ok(())
    })?;
    Ok(rewritten)
}

fn rewrite_chunk(
    chunk: &ChunkView<'_>,
    rebase: &IndexMap<Address, Address>,
) -> Result<u64, HeapError> {
    let mut rewritten = 0;
    let length = chunk.length()?;
    for slot in 0..length {
        let pointer = chunk.address_at(slot)?;
        if let Some(moved) = rebase_address(pointer, rebase) {
            trace!("slot {}: @{:#x} -> @{:#x}", slot, pointer, moved);
            chunk.rewrite_slot(slot, moved)?;
            rewritten += 1;
        }
    }
    if let Some(moved) = rebase_address(chunk.next_address()?, rebase) {
        chunk.set_next(moved)?;
        rewritten += 1;
    }
    Ok(rewritten)
}

#[cfg(test)]
pub mod tests {

    use super::*;
    use crate::memory::wrapper::MonoView;

    #[test]
    pub fn test_rebase_address() {
        let mut rebase = IndexMap::new();
        let region_size = Address::from(REGION_SIZE);
        rebase.insert(0, 2 * region_size);
        rebase.insert(region_size, 2 * region_size + 36);

        // null never moves
        assert_eq!(rebase_address(0, &rebase), None);
        // pointee in the pair's first region: new base + same offset
        assert_eq!(rebase_address(5, &rebase), Some(2 * region_size + 5));
        // pointee in the pair's second region: shifted past payload_a
        assert_eq!(
            rebase_address(region_size + 48, &rebase),
            Some(2 * region_size + 36 + 48)
        );
        // pointee in an unrelated region: unchanged
        assert_eq!(rebase_address(5 * region_size + 9, &rebase), None);
    }

    #[test]
    pub fn test_no_pairs_without_a_fuller_partner() {
        let heap = Heap::new();
        let alloc = heap.allocator();
        // two nearly-empty regions: both file under <=40%
        alloc.int32(1).unwrap();
        let second = heap.new_region().unwrap();
        heap.push_nursery(second.base());
        alloc.int32(2).unwrap();

        let stats = collect_minor(&heap).unwrap();
        assert_eq!(stats.pairs_compacted, 0);
        assert_eq!(stats.bytes_copied, 0);
        assert_eq!(heap.nursery().len(), 2);
        assert_eq!(heap.stats().collections, 1);
    }

    #[test]
    pub fn test_compaction_merges_a_pair_and_rewrites_pointers() {
        let heap = Heap::new();
        let alloc = heap.allocator();
        let region_size = Address::from(REGION_SIZE);

        // region A: four floats, well under 40%
        let floats: Vec<_> = (0..4)
            .map(|i| alloc.float64(f64::from(i) + 0.91).unwrap())
            .collect();

        // region B: an array referencing the floats and four ints,
        // plus filler to push it past 40%
        let b = heap.new_region().unwrap();
        heap.push_nursery(b.base());
        let array = alloc.array().unwrap();
        for f in &floats {
            array.append(&f.mono()).unwrap();
        }
        for v in [-1, 0, 1, 2] {
            let n = alloc.int32(v).unwrap();
            array.append(&n.mono()).unwrap();
        }
        for _ in 0..50_000 {
            alloc.float64(0.0).unwrap();
        }
        assert!(b.counter().unwrap() > REGION_SIZE * 2 / 5);

        let payload_a = 4 * MonoKind::Float64.size();
        let old_array_address = array.mono().address();
        let stats = collect_minor(&heap).unwrap();
        assert_eq!(stats.pairs_compacted, 1);
        assert_eq!(stats.regions_retired, 2);

        // regions 0 and 1 merged into region 2
        let merged_base = 2 * region_size;
        assert_eq!(heap.nursery(), vec![merged_base]);

        // the array moved past region A's payload, keeping its offset
        let new_array_address =
            merged_base + Address::from(payload_a) + (old_array_address - b.base());
        let merged = match heap.fetch_mono(new_array_address).unwrap().dispatch().unwrap() {
            MonoView::Array(a) => a,
            other => panic!("dispatched to {:?}", other.kind()),
        };
        assert_eq!(merged.length().unwrap(), 8);

        // payloads survived the move
        let expect = [0.91, 1.91, 2.91, 3.91, -1.0, 0.0, 1.0, 2.0];
        for (i, want) in expect.iter().enumerate() {
            let got = match merged.index(i as u32).unwrap().dispatch().unwrap() {
                MonoView::Float64(v) => v.read().unwrap(),
                MonoView::Int32(v) => f64::from(v.read().unwrap()),
                other => panic!("dispatched to {:?}", other.kind()),
            };
            assert_eq!(got, *want);
        }

        // every chunk pointer now lands inside the merged region
        merged
            .default_chunk()
            .unwrap()
            .traverse_addresses(|_, address| {
                assert!(address >= merged_base && address < merged_base + region_size);
                Ok(())
            })
            .unwrap();

        // the floats kept their source-region offsets
        assert_eq!(
            merged.index(0).unwrap().address(),
            merged_base + floats[0].mono().address()
        );
    }

    #[test]
    pub fn test_pointers_to_unrelocated_regions_are_left_alone() {
        let heap = Heap::new();
        let alloc = heap.allocator();

        // region A: a few floats (<=40%)
        alloc.float64(1.5).unwrap();

        // region C: an int outside the working set entirely
        let c = heap.new_region().unwrap();
        let target = c.create_mono(MonoKind::Int32).unwrap();
        c.write_i32(target.value_offset(), 321).unwrap();

        // region B: an ADDRESS mono pointing into C, plus filler
        let b = heap.new_region().unwrap();
        heap.push_nursery(b.base());
        let pointer = AddressView::new(b.create_mono(MonoKind::Address).unwrap()).unwrap();
        pointer.write(target.address()).unwrap();
        for _ in 0..50_000 {
            alloc.float64(0.0).unwrap();
        }

        let pointer_offset = pointer.mono().begin_offset();
        let stats = collect_minor(&heap).unwrap();
        assert_eq!(stats.pairs_compacted, 1);

        // the relocated ADDRESS mono still points at the untouched int;
        // it sits behind region A's single-float payload, at its old
        // offset within B
        let merged_base = heap.nursery()[0];
        let payload_a = Address::from(MonoKind::Float64.size());
        let moved = heap
            .fetch_mono(merged_base + payload_a + Address::from(pointer_offset))
            .unwrap();
        let moved_pointer = AddressView::new(moved).unwrap();
        assert_eq!(moved_pointer.read().unwrap(), target.address());
        match moved_pointer.fetch().unwrap().dispatch().unwrap() {
            MonoView::Int32(v) => assert_eq!(v.read().unwrap(), 321),
            other => panic!("dispatched to {:?}", other.kind()),
        }
    }

    #[test]
    pub fn test_allocation_continues_in_the_merged_region() {
        let heap = Heap::new();
        let alloc = heap.allocator();
        alloc.float64(0.5).unwrap();
        let b = heap.new_region().unwrap();
        heap.push_nursery(b.base());
        for _ in 0..50_000 {
            alloc.float64(0.0).unwrap();
        }

        collect_minor(&heap).unwrap();
        let merged_base = heap.nursery()[0];
        let merged_counter = heap.fetch_region(merged_base).unwrap().counter().unwrap();
        let next = alloc.int32(9).unwrap();
        assert_eq!(
            next.mono().address(),
            merged_base + Address::from(merged_counter)
        );
    }

    #[test]
    pub fn test_full_collection_unimplemented() {
        let heap = Heap::new();
        assert!(matches!(
            collect_full(&heap),
            Err(HeapError::Unimplemented(_))
        ));
    }
}
