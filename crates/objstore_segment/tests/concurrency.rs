//! Concurrent producers sharing one segment.

use objstore_segment::{Part, PartPolicy, Segment, SegmentErrorKind, SegmentState};
use std::sync::{Arc, Barrier};
use std::thread;

const PART_SIZE: u64 = 8;

fn shared_segment() -> Arc<Segment> {
    let segment = Segment::new("concurrent/object", PartPolicy::new().min_size(PART_SIZE));
    segment.initiate("upload").unwrap();
    Arc::new(segment)
}

#[test]
fn parallel_producers_fill_segment() {
    let segment = shared_segment();
    let threads = 8;
    let per_thread = 32;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let segment = Arc::clone(&segment);
            thread::spawn(move || {
                for n in 0..per_thread {
                    let index = 1 + t + n * threads;
                    segment.insert_part(Part::new(index, PART_SIZE)).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(segment.fulfilled().unwrap());
    let manifest = segment.manifest().unwrap();
    assert_eq!(manifest.len(), (threads * per_thread) as usize);
    assert_eq!(segment.total_size(), u64::from(threads * per_thread) * PART_SIZE);
    assert_eq!(segment.state(), SegmentState::Consumed);
}

#[test]
fn only_one_conflicting_insert_wins() {
    let segment = shared_segment();
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let segment = Arc::clone(&segment);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                segment.insert_part(Part::new(1, PART_SIZE + t as u64))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1);

    for err in results.into_iter().filter_map(Result::err) {
        assert_eq!(err.kind(), SegmentErrorKind::PartIntersected);
    }
    assert_eq!(segment.len(), 1);
}

#[test]
fn readers_see_consistent_snapshots() {
    let segment = shared_segment();
    let total = 200u32;

    let writer = {
        let segment = Arc::clone(&segment);
        thread::spawn(move || {
            for index in (1..=total).rev() {
                segment.insert_part(Part::new(index, PART_SIZE)).unwrap();
            }
        })
    };

    let reader = {
        let segment = Arc::clone(&segment);
        thread::spawn(move || loop {
            if segment.fulfilled().unwrap_or(false) {
                return;
            }
            let missing = segment.missing_indices(usize::MAX);
            assert!(missing.windows(2).all(|w| w[0] < w[1]));
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(segment.len(), total as usize);
}
