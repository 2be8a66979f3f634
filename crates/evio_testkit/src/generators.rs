//! Property-based test generators using proptest.
//!
//! Trees produced here always encode, and decode back to the same tree.
//! Tagsegments carry no padding count, so their leaves only hold
//! word-aligned data.

use evio_codec::{encode_event, CompositeItem, ContainerKind, Node, Payload};
use proptest::collection::vec;
use proptest::prelude::*;

/// Strategy for short string lists.
pub fn strings_strategy() -> impl Strategy<Value = Vec<String>> {
    vec("[a-zA-Z0-9 _]{1,12}", 1..4)
}

/// Strategy for primitive payloads whose length is a whole number of
/// words.
pub fn word_payload_strategy() -> impl Strategy<Value = Payload> {
    prop_oneof![
        vec(any::<u32>(), 0..16).prop_map(Payload::UInt32),
        vec(any::<i32>(), 0..16).prop_map(Payload::Int32),
        vec(-1.0e6f32..1.0e6f32, 0..16).prop_map(Payload::Float32),
        vec(-1.0e12f64..1.0e12f64, 0..8).prop_map(Payload::Float64),
        vec(any::<i64>(), 0..8).prop_map(Payload::Int64),
        vec(any::<u64>(), 0..8).prop_map(Payload::UInt64),
        strings_strategy().prop_map(Payload::Strings),
    ]
}

/// Strategy for every primitive payload, including padded 8- and 16-bit
/// arrays.
pub fn primitive_payload_strategy() -> impl Strategy<Value = Payload> {
    prop_oneof![
        3 => word_payload_strategy(),
        1 => vec(any::<i16>(), 0..16).prop_map(Payload::Int16),
        1 => vec(any::<u16>(), 0..16).prop_map(Payload::UInt16),
        1 => vec(any::<i8>(), 0..16).prop_map(Payload::Int8),
        1 => vec(any::<u8>(), 0..16).prop_map(Payload::UInt8),
    ]
}

/// Strategy for a composite payload in the `N(i,F)` format: a count
/// followed by that many integer/float pairs.
pub fn composite_payload_strategy() -> impl Strategy<Value = Payload> {
    vec((any::<u32>(), -1.0e6f32..1.0e6f32), 1..8).prop_map(|pairs| {
        let mut data = (pairs.len() as u32).to_ne_bytes().to_vec();
        for (i, f) in &pairs {
            data.extend_from_slice(&i.to_ne_bytes());
            data.extend_from_slice(&f.to_ne_bytes());
        }
        Payload::Composite(vec![CompositeItem::new("N(i,F)", data)])
    })
}

fn leaf_payload(kind: ContainerKind) -> BoxedStrategy<Payload> {
    match kind {
        ContainerKind::TagSegment => word_payload_strategy().boxed(),
        ContainerKind::Bank | ContainerKind::Segment => prop_oneof![
            5 => primitive_payload_strategy(),
            1 => composite_payload_strategy(),
        ]
        .boxed(),
    }
}

fn build(kind: ContainerKind, tag: u16, num: u8, payload: Payload) -> Node {
    match kind {
        ContainerKind::Bank => Node::bank(tag, num, payload),
        ContainerKind::Segment => Node::segment((tag & 0xff) as u8, payload),
        ContainerKind::TagSegment => Node::tagsegment(tag & 0xfff, payload),
    }
}

fn children(kind: ContainerKind, nodes: Vec<Node>) -> Payload {
    match kind {
        ContainerKind::Bank => Payload::Banks(nodes),
        ContainerKind::Segment => Payload::Segments(nodes),
        ContainerKind::TagSegment => Payload::TagSegments(nodes),
    }
}

fn kind_strategy() -> impl Strategy<Value = ContainerKind> {
    prop_oneof![
        Just(ContainerKind::Bank),
        Just(ContainerKind::Segment),
        Just(ContainerKind::TagSegment),
    ]
}

/// Strategy for a structure of the given kind, nested up to `depth`
/// levels below it.
pub fn structure_strategy(kind: ContainerKind, depth: u32) -> BoxedStrategy<Node> {
    let leaf = (any::<u16>(), any::<u8>(), leaf_payload(kind))
        .prop_map(move |(tag, num, payload)| build(kind, tag, num, payload));
    if depth == 0 {
        return leaf.boxed();
    }
    let container = (any::<u16>(), any::<u8>(), kind_strategy()).prop_flat_map(
        move |(tag, num, child_kind)| {
            vec(structure_strategy(child_kind, depth - 1), 0..4)
                .prop_map(move |nodes| build(kind, tag, num, children(child_kind, nodes)))
        },
    );
    prop_oneof![2 => leaf, 1 => container].boxed()
}

/// Strategy for event trees: a bank nested up to three levels deep.
pub fn node_strategy() -> BoxedStrategy<Node> {
    structure_strategy(ContainerKind::Bank, 3)
}

/// Strategy for encoded events in host order.
pub fn event_strategy() -> impl Strategy<Value = Vec<u32>> {
    node_strategy().prop_map(|node| encode_event(&node).expect("generated trees encode"))
}

/// Strategy for a sequence of encoded events.
pub fn event_sequence_strategy(
    min_events: usize,
    max_events: usize,
) -> impl Strategy<Value = Vec<Vec<u32>>> {
    vec(event_strategy(), min_events..max_events)
}

/// Strategy for dictionaries long enough to be accepted.
pub fn dictionary_strategy() -> impl Strategy<Value = String> {
    vec(("[a-z]{1,8}", any::<u16>()), 1..6).prop_map(|entries| {
        let mut xml = String::from("<xmlDict>");
        for (name, tag) in entries {
            xml.push_str(&format!("<bank name=\"{name}\" tag=\"{tag}\"/>"));
        }
        xml.push_str("</xmlDict>");
        xml
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 128,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Few cases, for tests that touch the file system.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 24,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
