//! Integration tests for writing and reading whole streams.

use evio_core::{
    Control, ControlReply, ErrorKind, InMemoryBackend, OpenOptions, Registry, SequencePolicy,
};
use evio_testkit::prelude::*;

fn events(n: u32) -> Vec<Vec<u32>> {
    (0..n).map(sample_event).collect()
}

#[test]
fn file_round_trip_sequential_and_random() {
    for n in [0, 1, 1000] {
        let dir = TestDir::new();
        let path = dir.file("round.evio");
        let written = events(n);
        write_stream(
            &Registry::new(),
            path.as_path(),
            "w",
            &OpenOptions::new().block_words(1024),
            None,
            &written,
        )
        .unwrap();

        let (dictionary, sequential) = read_stream(path.as_path(), "r").unwrap();
        assert!(dictionary.is_none());
        assert_eq!(sequential, written, "sequential read of {n} events");

        let random = read_random(path.as_path(), "ra").unwrap();
        assert_eq!(random, written, "random read of {n} events");
    }
}

#[test]
fn buffer_round_trip_with_dictionary() {
    for n in [0, 1, 1000] {
        let written = events(n);
        let buffer = write_buffer(Some(SAMPLE_DICTIONARY), &written);

        let (dictionary, sequential) = read_stream(buffer.clone(), "rb").unwrap();
        assert_eq!(dictionary.as_deref(), Some(SAMPLE_DICTIONARY));
        assert_eq!(sequential, written);

        let random = read_random(buffer, "rab").unwrap();
        assert_eq!(random, written);
    }
}

#[test]
fn random_count_matches_sequential_count() {
    for m in [0u32, 1, 50] {
        let buffer = write_buffer(Some(SAMPLE_DICTIONARY), &events(m));
        let registry = Registry::new();

        let sequential = registry.open(buffer.clone(), "rb").unwrap();
        let count = read_all(&registry, sequential).unwrap().len();
        registry.close(sequential).unwrap();

        let random = registry.open(buffer, "rab").unwrap();
        assert_eq!(registry.event_table(random).unwrap().len(), count);
        assert_eq!(
            registry.control(random, Control::EventCount).unwrap(),
            ControlReply::EventCount(u64::from(m))
        );
        assert_eq!(
            registry.dictionary(random).unwrap().as_deref(),
            Some(SAMPLE_DICTIONARY)
        );
        registry.close(random).unwrap();
    }
}

#[test]
fn buffer_ends_with_last_block_after_every_write() {
    let registry = Registry::new();
    let buffer = InMemoryBackend::new();
    let handle = registry
        .open_with(buffer.clone(), "wb", &OpenOptions::new().block_words(256))
        .unwrap();
    registry.write_dictionary(handle, SAMPLE_DICTIONARY).unwrap();

    for i in 0..300 {
        registry.write(handle, &flat_event(i, 5)).unwrap();
        let words = stream_words(&buffer.data());
        let tail = &words[words.len() - 8..];
        assert_eq!(tail[0], 8);
        assert_eq!(tail[3], 0);
        assert_eq!(tail[5] & 0x200, 0x200, "after write {i}");
        assert_eq!(tail[7], 0xc0da_0100);

        let (_, read) = read_stream(InMemoryBackend::with_data(buffer.data()), "rb").unwrap();
        assert_eq!(read.len(), i as usize + 1);
    }
    registry.close(handle).unwrap();
}

#[test]
fn read_into_caller_buffer() {
    let buffer = write_buffer(None, &[flat_event(1, 4), flat_event(2, 100)]);
    let registry = Registry::new();
    let handle = registry.open(buffer, "rb").unwrap();

    let mut small = [0u32; 16];
    assert_eq!(registry.read(handle, &mut small).unwrap(), Some(6));
    assert_eq!(&small[..6], flat_event(1, 4).as_slice());

    let err = registry.read(handle, &mut small).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Truncation);

    let mut large = vec![0u32; 128];
    assert_eq!(registry.read(handle, &mut large).unwrap(), Some(102));
    assert_eq!(registry.read(handle, &mut large).unwrap(), None);
    registry.close(handle).unwrap();
}

#[test]
fn read_without_copy() {
    let written = events(20);
    let buffer = write_buffer(None, &written);
    let registry = Registry::new();
    let handle = registry.open(buffer, "rb").unwrap();

    let mut lengths = Vec::new();
    while let Some(len) = registry.read_no_copy(handle, |event| event.len()).unwrap() {
        lengths.push(len);
    }
    let expected: Vec<usize> = written.iter().map(Vec::len).collect();
    assert_eq!(lengths, expected);
    registry.close(handle).unwrap();
}

#[test]
fn foreign_order_streams_read_as_local() {
    let written = events(200);
    let dir = TestDir::new();
    let path = dir.file("foreign.evio");
    let native = write_buffer(Some(SAMPLE_DICTIONARY), &written).data();
    std::fs::write(&path, to_foreign_order(&native).unwrap()).unwrap();

    let (dictionary, sequential) = read_stream(path.as_path(), "r").unwrap();
    assert_eq!(dictionary.as_deref(), Some(SAMPLE_DICTIONARY));
    assert_eq!(sequential, written);

    assert_eq!(read_random(path.as_path(), "ra").unwrap(), written);
    let on_disk = std::fs::read(&path).unwrap();
    assert_ne!(on_disk, native, "random access must not write back");
}

#[test]
fn append_to_file() {
    let dir = TestDir::new();
    let path = dir.file("append.evio");
    let registry = Registry::new();
    write_stream(
        &registry,
        path.as_path(),
        "w",
        &OpenOptions::new(),
        Some(SAMPLE_DICTIONARY),
        &events(10),
    )
    .unwrap();
    write_stream(&registry, path.as_path(), "a", &OpenOptions::new(), None, &events(15)[10..])
        .unwrap();

    let (dictionary, read) = read_stream(path.as_path(), "r").unwrap();
    assert_eq!(dictionary.as_deref(), Some(SAMPLE_DICTIONARY));
    assert_eq!(read, events(15));
    assert_eq!(registry.open_count(), 0);
}

#[test]
fn sequence_gaps_are_counted_or_rejected() {
    let buffer = InMemoryBackend::new();
    let written: Vec<_> = (0..30).map(|i| flat_event(i, 100)).collect();
    write_stream(
        &Registry::new(),
        buffer.clone(),
        "wb",
        &OpenOptions::new().block_words(256),
        None,
        &written,
    )
    .unwrap();
    let mut bytes = buffer.data();
    // Renumber the second block.
    let first_block = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize * 4;
    bytes[first_block + 4..first_block + 8].copy_from_slice(&7u32.to_ne_bytes());

    let registry = Registry::new();
    let handle = registry.open(InMemoryBackend::with_data(bytes.clone()), "rb").unwrap();
    assert_eq!(read_all(&registry, handle).unwrap().len(), 30);
    assert_eq!(
        registry.control(handle, Control::SequenceMismatches).unwrap(),
        ControlReply::SequenceMismatches(2)
    );
    registry.close(handle).unwrap();

    let strict = OpenOptions::new().sequence_policy(SequencePolicy::Abort);
    let handle = registry
        .open_with(InMemoryBackend::with_data(bytes), "rb", &strict)
        .unwrap();
    let err = read_all(&registry, handle).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadBlock);
}

#[test]
fn golden_layouts() {
    for golden in standard_streams() {
        let buffer = write_buffer(golden.dictionary, &golden.events);
        assert_golden(&golden, &stream_words(&buffer.data()));

        let dir = TestDir::new();
        let path = dir.file("golden.evio");
        write_stream(
            &Registry::new(),
            path.as_path(),
            "w",
            &OpenOptions::new(),
            golden.dictionary,
            &golden.events,
        )
        .unwrap();
        assert_golden(&golden, &stream_words(&std::fs::read(&path).unwrap()));
    }
}

#[test]
fn version_and_header_controls() {
    let buffer = write_buffer(None, &events(3));
    let registry = Registry::new();
    let handle = registry.open(buffer, "rb").unwrap();
    assert_eq!(
        registry.control(handle, Control::Version).unwrap(),
        ControlReply::Version(4)
    );
    match registry.control(handle, Control::Header).unwrap() {
        ControlReply::Header(words) => {
            assert_eq!(words[7], 0xc0da_0100);
            assert_eq!(words[1], 1);
        }
        other => panic!("unexpected reply {other:?}"),
    }
    let err = registry.control(handle, Control::BlockSize(1000)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadMode);
}
