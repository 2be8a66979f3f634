//! Benchmark utilities.

use evio_codec::{encode_event, CompositeItem, Node, Payload};
use rand::Rng;

/// Random `uint32` words.
pub fn random_words(count: usize) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen()).collect()
}

/// A flat `uint32` bank holding `data_words` random words.
pub fn flat_bank(data_words: usize) -> Vec<u32> {
    let mut words = vec![data_words as u32 + 1, 0x0001_0100];
    words.extend(random_words(data_words));
    words
}

/// A bank of banks mixing 16-, 32- and 64-bit data, roughly
/// `data_words` words in total.
pub fn mixed_event(data_words: usize) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    let share = (data_words / 3).max(1);
    let tree = Node::bank(
        1,
        0,
        Payload::Banks(vec![
            Node::bank(2, 0, Payload::UInt32(random_words(share))),
            Node::bank(3, 0, Payload::Int16((0..share * 2).map(|_| rng.gen()).collect())),
            Node::bank(4, 0, Payload::Float64((0..share / 2).map(|_| rng.gen()).collect())),
        ]),
    );
    encode_event(&tree).unwrap_or_default()
}

/// A composite event in the `N(i,F)` format with `pairs` entries.
pub fn composite_event(pairs: usize) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    let mut data = (pairs as u32).to_ne_bytes().to_vec();
    for _ in 0..pairs {
        data.extend_from_slice(&rng.gen::<u32>().to_ne_bytes());
        data.extend_from_slice(&rng.gen::<f32>().to_ne_bytes());
    }
    let tree = Node::bank(5, 0, Payload::Composite(vec![CompositeItem::new("N(i,F)", data)]));
    encode_event(&tree).unwrap_or_default()
}

/// `count` events of `data_words` words each.
pub fn generate_events(count: usize, data_words: usize) -> Vec<Vec<u32>> {
    (0..count).map(|_| flat_bank(data_words)).collect()
}
