use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use parallelize::parallel::{until, Options};
use parallelize::CancelToken;

fn counts(pieces: usize, options: Options) -> Vec<usize> {
    let seen: Vec<AtomicUsize> = (0..pieces).map(|_| AtomicUsize::new(0)).collect();
    let token = CancelToken::new();
    until(
        Some(&token),
        pieces,
        |p| {
            seen[p].fetch_add(1, Ordering::SeqCst);
        },
        options,
    );
    seen.into_iter().map(AtomicUsize::into_inner).collect()
}

#[test]
fn test_every_piece_runs_exactly_once() {
    for (pieces, parallelism) in [(1000, 0), (1000, 20), (1, 16), (7, 3), (97, 1), (10_000, 64)] {
        let seen = counts(pieces, Options::default().with_parallelism(parallelism));
        assert_eq!(seen, vec![1; pieces], "pieces={} parallelism={}", pieces, parallelism);
    }
}

#[test]
fn test_absent_signal_never_cancels() {
    let hits = AtomicUsize::new(0);
    until(
        None,
        500,
        |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        },
        Options::default(),
    );
    assert_eq!(hits.into_inner(), 500);
}

#[test]
fn test_zero_pieces_invokes_nothing() {
    let hits = AtomicUsize::new(0);
    until(
        None,
        0,
        |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        },
        Options::default(),
    );
    assert_eq!(hits.into_inner(), 0);
}

#[test]
fn test_worker_threads_bounded_by_plan() {
    for (pieces, parallelism) in [(1000, 4), (5, 64), (100, 16)] {
        let options = Options::default().with_parallelism(parallelism);
        let plan = options.plan(pieces);
        let threads = Mutex::new(HashSet::new());

        until(
            None,
            pieces,
            |_| {
                threads.lock().unwrap().insert(thread::current().id());
                thread::sleep(Duration::from_micros(50));
            },
            options,
        );

        let used = threads.into_inner().unwrap().len();
        assert!(used >= 1);
        assert!(used <= parallelism.min(plan.chunks));
        assert_eq!(plan.workers, parallelism.min(plan.chunks));
    }
}

#[test]
fn test_caller_thread_does_not_run_pieces() {
    let caller = thread::current().id();
    until(
        None,
        64,
        |_| assert_ne!(thread::current().id(), caller),
        Options::default().with_parallelism(4),
    );
}

#[test]
fn test_single_worker_stops_right_after_cancel() {
    let token = CancelToken::new();
    let seen = Mutex::new(Vec::new());

    until(
        Some(&token),
        100,
        |p| {
            seen.lock().unwrap().push(p);
            if p == 10 {
                token.cancel();
            }
        },
        Options::default().with_parallelism(1),
    );

    assert_eq!(seen.into_inner().unwrap(), (0..=10).collect::<Vec<_>>());
}

#[test]
fn test_cancel_stops_other_workers() {
    let token = CancelToken::new();
    let hits = AtomicUsize::new(0);

    until(
        Some(&token),
        10_000,
        |p| {
            hits.fetch_add(1, Ordering::SeqCst);
            if p == 0 {
                token.cancel();
            }
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
        },
        Options::default().with_parallelism(4),
    );

    // every worker finishes the piece it had already started, then stops
    let hits = hits.into_inner();
    assert!(hits >= 1);
    assert!(hits <= 4, "{} pieces ran after cancellation", hits);
}

#[test]
fn test_cancelled_before_start_runs_nothing() {
    let token = CancelToken::new();
    token.cancel();
    let hits = AtomicUsize::new(0);

    until(
        Some(&token),
        1000,
        |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        },
        Options::default(),
    );
    assert_eq!(hits.into_inner(), 0);
}

#[test]
fn test_parent_cancellation_reaches_child_signal() {
    let parent = CancelToken::new();
    let child = parent.child();
    parent.cancel();
    let hits = AtomicUsize::new(0);

    until(
        Some(&child),
        100,
        |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        },
        Options::default(),
    );
    assert_eq!(hits.into_inner(), 0);
}

#[test]
fn test_pieces_within_worker_chunk_are_ascending() {
    let options = Options::default().with_parallelism(3);
    let plan = options.plan(400);
    let per_thread = Mutex::new(std::collections::HashMap::<_, Vec<usize>>::new());

    until(
        None,
        400,
        |p| {
            per_thread
                .lock()
                .unwrap()
                .entry(thread::current().id())
                .or_default()
                .push(p);
        },
        options,
    );

    for pieces in per_thread.into_inner().unwrap().into_values() {
        for pair in pieces.windows(2) {
            let same_chunk = pair[0] / plan.chunk_size == pair[1] / plan.chunk_size;
            if same_chunk {
                assert_eq!(pair[1], pair[0] + 1);
            }
        }
    }
}

#[test]
#[should_panic(expected = "piece 7 exploded")]
fn test_callback_panic_reaches_caller() {
    until(
        None,
        20,
        |p| {
            if p == 7 {
                panic!("piece 7 exploded");
            }
        },
        Options::default().with_parallelism(2),
    );
}
