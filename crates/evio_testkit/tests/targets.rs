//! Integration tests for split files and socket streams.

use evio_core::{ErrorKind, OpenOptions, Registry};
use evio_testkit::prelude::*;
use std::net::{TcpListener, TcpStream};
use std::thread;

#[test]
fn split_files_are_each_complete() {
    let dir = TestDir::new();
    let template = dir.template("run_%d_part_%02d.evio");
    let options = OpenOptions::new()
        .block_words(256)
        .split_bytes(3000)
        .run_number(42);
    let written: Vec<_> = (0..120).map(|i| flat_event(i, 20)).collect();
    write_stream(
        &Registry::new(),
        template.as_str(),
        "s",
        &options,
        Some(SAMPLE_DICTIONARY),
        &written,
    )
    .unwrap();

    let files = dir.files();
    assert!(files.len() > 2, "expected several split files, got {}", files.len());
    assert_eq!(files[0], dir.file("run_42_part_00.evio"));
    assert_eq!(files[1], dir.file("run_42_part_01.evio"));

    let mut read = Vec::new();
    for file in &files {
        assert!(std::fs::metadata(file).unwrap().len() <= 3000);
        let (dictionary, events) = read_stream(file.as_path(), "r").unwrap();
        assert_eq!(dictionary.as_deref(), Some(SAMPLE_DICTIONARY), "{}", file.display());
        assert!(!events.is_empty());
        read.extend(events);
    }
    assert_eq!(read, written);
}

#[test]
fn split_refuses_existing_files() {
    let dir = TestDir::new();
    let template = dir.template("again_%d_%d.evio");
    let options = OpenOptions::new().block_words(256).split_bytes(3000);
    let registry = Registry::new();
    write_stream(&registry, template.as_str(), "s", &options, None, &[flat_event(1, 4)]).unwrap();

    let err = write_stream(&registry, template.as_str(), "s", &options, None, &[flat_event(1, 4)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadArgument);
    assert_eq!(registry.open_count(), 0);
}

#[test]
fn split_bytes_written_spans_files() {
    let dir = TestDir::new();
    let template = dir.template("bytes_%d.%d");
    let registry = Registry::new();
    let handle = registry
        .open_with(
            template.as_str(),
            "s",
            &OpenOptions::new().block_words(256).split_bytes(2000),
        )
        .unwrap();
    for i in 0..80 {
        registry.write(handle, &flat_event(i, 10)).unwrap();
    }
    let reported = registry.bytes_written(handle).unwrap();
    registry.close(handle).unwrap();

    let on_disk: u64 = dir
        .files()
        .iter()
        .map(|f| std::fs::metadata(f).unwrap().len())
        .sum();
    assert!(dir.files().len() > 1);
    assert!(on_disk > 80 * 12 * 4);
    assert!(reported > 0 && reported <= on_disk);
}

#[test]
fn socket_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    let written: Vec<_> = (0..500).map(sample_event).collect();

    let receiver = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        read_stream(stream, "rs").unwrap()
    });

    let stream = TcpStream::connect(address).unwrap();
    write_stream(
        &Registry::new(),
        stream,
        "ws",
        &OpenOptions::new().block_words(2048),
        Some(SAMPLE_DICTIONARY),
        &written,
    )
    .unwrap();

    let (dictionary, read) = receiver.join().unwrap();
    assert_eq!(dictionary.as_deref(), Some(SAMPLE_DICTIONARY));
    assert_eq!(read, written);
}

#[test]
fn socket_rejects_append_and_random_access() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    let registry = Registry::new();

    let err = registry.open(TcpStream::connect(address).unwrap(), "ra").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadArgument);
    let err = registry.open(TcpStream::connect(address).unwrap(), "a").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadArgument);
    assert_eq!(registry.open_count(), 0);
}
