//! Concurrent use of one registry.

use evio_core::{ErrorKind, Registry};
use evio_testkit::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn shared_reader_never_tears_events() {
    let written: Vec<_> = (0..2000).map(|i| flat_event(i, 40)).collect();
    let buffer = write_buffer(None, &written);
    let registry = Arc::new(Registry::new());
    let handle = registry.open(buffer, "rb").unwrap();

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(event) = registry.read_alloc(handle).unwrap() {
                    assert_eq!(event, flat_event(event[2], 40));
                    seen.push(event[2]);
                }
                seen
            })
        })
        .collect();

    let mut seen: Vec<u32> = readers.into_iter().flat_map(|t| t.join().unwrap()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..2000).collect::<Vec<_>>());
    registry.close(handle).unwrap();
}

#[test]
fn close_during_reads_is_clean() {
    let written: Vec<_> = (0..5000).map(|i| flat_event(i, 8)).collect();
    let buffer = write_buffer(None, &written);
    let registry = Arc::new(Registry::new());
    let handle = registry.open(buffer, "rb").unwrap();
    let start = Arc::new(Barrier::new(5));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                loop {
                    match registry.read_alloc(handle) {
                        Ok(Some(event)) => assert_eq!(event, flat_event(event[2], 8)),
                        Ok(None) => return,
                        Err(err) => {
                            assert_eq!(err.kind(), ErrorKind::BadHandle);
                            return;
                        }
                    }
                }
            })
        })
        .collect();

    start.wait();
    registry.close(handle).unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(
        registry.read_alloc(handle).unwrap_err().kind(),
        ErrorKind::BadHandle
    );
}

#[test]
fn racing_closes_succeed_once() {
    let registry = Arc::new(Registry::new());
    let handle = registry.open(write_buffer(None, &[flat_event(1, 1)]), "rb").unwrap();
    let start = Arc::new(Barrier::new(6));

    let closers: Vec<_> = (0..6)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                registry.close(handle).is_ok()
            })
        })
        .collect();

    let successes = closers
        .into_iter()
        .map(|t| t.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(registry.open_count(), 0);
}

#[test]
fn writers_on_separate_handles() {
    let registry = Arc::new(Registry::new());
    let dir = TestDir::new();

    let writers: Vec<_> = (0..6u32)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let path = dir.file(&format!("writer_{t}.evio"));
            thread::spawn(move || {
                let handle = registry.open(path.as_path(), "w").unwrap();
                for i in 0..500 {
                    registry.write(handle, &flat_event(t * 1000 + i, 6)).unwrap();
                }
                registry.close(handle).unwrap();
                path
            })
        })
        .collect();

    for (t, writer) in writers.into_iter().enumerate() {
        let path = writer.join().unwrap();
        let (_, events) = read_stream(path.as_path(), "r").unwrap();
        assert_eq!(events.len(), 500);
        assert_eq!(events[0], flat_event(t as u32 * 1000, 6));
    }
    assert_eq!(registry.open_count(), 0);
}
