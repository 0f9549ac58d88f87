//! End-to-end scenarios over the public heap surface
//!
//! These drive the heap the way the interpreter does: allocate
//! through the allocator shortcuts, read through wrappers, and
//! re-materialize values from bare addresses with `fetch_mono` and
//! `dispatch`.

use loam::memory::error::HeapError;
use loam::memory::heap::Heap;
use loam::memory::mono::Mono;
use loam::memory::wrapper::array::ArrayView;
use loam::memory::wrapper::MonoView;

fn number(mono: Mono<'_>) -> f64 {
    match mono.dispatch().unwrap() {
        MonoView::Int32(v) => f64::from(v.read().unwrap()),
        MonoView::Float64(v) => v.read().unwrap(),
        other => panic!("not a scalar: {:?}", other.kind()),
    }
}

/// Alternating float i+1.9 / int -i for i in 0..count
fn alternating<'heap>(heap: &'heap Heap, count: i32) -> ArrayView<'heap> {
    let alloc = heap.allocator();
    let array = alloc.array().unwrap();
    for i in 0..count {
        let f = alloc.float64(f64::from(i) + 1.9).unwrap();
        array.append(&f.mono()).unwrap();
        let n = alloc.int32(-i).unwrap();
        array.append(&n.mono()).unwrap();
    }
    array
}

#[test]
pub fn test_int32_round_trip() {
    let heap = Heap::new();
    let n = heap.allocator().int32(-1025).unwrap();
    assert_eq!(n.read().unwrap(), -1025);
}

#[test]
pub fn test_rematerialize_from_address() {
    let heap = Heap::new();
    let f = heap.allocator().float64(6.9).unwrap();
    let address = f.mono().address();
    match heap.fetch_mono(address).unwrap().dispatch().unwrap() {
        MonoView::Float64(v) => assert_eq!(v.read().unwrap(), 6.9),
        other => panic!("dispatched to {:?}", other.kind()),
    }
}

#[test]
pub fn test_alternating_array_of_twelve() {
    let heap = Heap::new();
    let alloc = heap.allocator();
    let array = alloc.array().unwrap();
    for i in 0..6 {
        let f = alloc.float64(f64::from(i) + 0.9).unwrap();
        array.append(&f.mono()).unwrap();
        let n = alloc.int32(-i).unwrap();
        array.append(&n.mono()).unwrap();
    }
    assert_eq!(array.length().unwrap(), 12);
    assert_eq!(number(array.index(0).unwrap()), 0.9);
    assert_eq!(number(array.index(1).unwrap()), 0.0);
    assert_eq!(number(array.index(2).unwrap()), 1.9);
    assert_eq!(number(array.index(3).unwrap()), -1.0);
    assert_eq!(number(array.index(11).unwrap()), -5.0);
}

#[test]
pub fn test_twelve_appends_spill_into_a_second_chunk() {
    let heap = Heap::new();
    let array = alternating(&heap, 6);
    assert_eq!(array.length().unwrap(), 12);
    let first = array.default_chunk().unwrap();
    assert_eq!(first.length().unwrap(), 8);
    let second = first.fetch_next().unwrap().unwrap();
    assert_eq!(second.length().unwrap(), 4);
}

#[test]
pub fn test_slice_of_twenty_four() {
    let heap = Heap::new();
    let array = alternating(&heap, 12);
    assert_eq!(array.length().unwrap(), 24);
    let window = array.slice(10, 21).unwrap();
    assert_eq!(window.length().unwrap(), 12);
    assert_eq!(number(window.index(0).unwrap()), 6.9);
    assert_eq!(number(window.index(9).unwrap()), -9.0);
    assert_eq!(number(window.index(11).unwrap()), -10.0);
    assert_eq!(array.length().unwrap(), 24);
}

#[test]
pub fn test_pop_returns_the_element() {
    let heap = Heap::new();
    let window = alternating(&heap, 12).slice(10, 21).unwrap();
    let (rest, removed) = window.pop().unwrap();
    assert_eq!(rest.length().unwrap(), 11);
    assert_eq!(number(removed), -10.0);
    assert_eq!(window.length().unwrap(), 12);
}

#[test]
pub fn test_derived_arrays_leave_their_sources_alone() {
    let heap = Heap::new();
    let alloc = heap.allocator();
    let array = alternating(&heap, 6);
    let copy = array.clone().unwrap();
    let extra = alloc.int32(1).unwrap();
    copy.append(&extra.mono()).unwrap();
    assert_eq!(array.length().unwrap(), 12);
    assert_eq!(copy.length().unwrap(), 13);

    let joined = array.concat(&copy).unwrap();
    assert_eq!(joined.length().unwrap(), 25);
    assert_eq!(array.length().unwrap(), 12);
    assert_eq!(copy.length().unwrap(), 13);
}

#[test]
pub fn test_index_out_of_range() {
    let heap = Heap::new();
    let array = alternating(&heap, 2);
    assert!(matches!(
        array.index(4),
        Err(HeapError::OutOfRange { at: 4, limit: 4 })
    ));
}

#[test]
pub fn test_reserved_kinds_hold_their_sizes_but_not_their_ops() {
    let heap = Heap::new();
    let alloc = heap.allocator();
    let view = alloc
        .allocate(loam::memory::mono::MonoKind::StringS8)
        .unwrap();
    assert_eq!(view.mono().size(), 69);
    match view {
        MonoView::String(s) => {
            assert!(matches!(s.read(), Err(HeapError::Unimplemented(_))))
        }
        other => panic!("dispatched to {:?}", other.kind()),
    }
}
