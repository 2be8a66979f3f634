//! Dump command implementation.

use evio_codec::{decode_event, Node, Payload};
use evio_core::{EvioError, Registry};
use serde::Serialize;
use std::path::Path;

/// One dumped event.
#[derive(Debug, Serialize)]
pub struct DumpedEvent {
    /// Event number, starting at 1.
    pub number: usize,
    /// Event length in words.
    pub words: usize,
    /// Byte offset in the file.
    pub offset: usize,
    /// Decoded structure tree.
    pub tree: Node,
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    start: usize,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let events = dump(path, start, limit)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&events)?),
        _ => {
            for event in &events {
                println!(
                    "Event {} ({} words at byte {}):",
                    event.number, event.words, event.offset
                );
                print!("{}", render_tree(&event.tree));
            }
            if events.is_empty() {
                println!("No events in range");
            }
        }
    }
    Ok(())
}

/// Decodes events `start..start + limit` (1-based) through the
/// random-access index.
pub fn dump(
    path: &Path,
    start: usize,
    limit: Option<usize>,
) -> Result<Vec<DumpedEvent>, Box<dyn std::error::Error>> {
    let registry = Registry::new();
    let handle = registry.open(path, "ra")?;
    let table = registry.event_table(handle)?;
    let start = start.max(1);
    let end = limit.map_or(table.len(), |n| (start - 1 + n).min(table.len()));

    let mut events = Vec::new();
    for number in start..=end {
        let view = registry.read_random(handle, number)?;
        let tree = decode_event(&view.to_words()).map_err(EvioError::from)?;
        events.push(DumpedEvent {
            number,
            words: view.len(),
            offset: view.location().offset,
            tree,
        });
    }
    registry.close(handle)?;
    Ok(events)
}

/// Renders a tree as indented text, one structure per line.
pub fn render_tree(node: &Node) -> String {
    let mut out = String::new();
    render(node, 1, &mut out);
    out
}

fn render(node: &Node, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!(
        "{indent}{:?} tag={} num={} type={} len={}",
        node.kind,
        node.tag,
        node.num,
        node.data_type().name(),
        node.payload.len()
    ));
    match &node.payload {
        Payload::Strings(strings) => {
            out.push_str(&format!(" {strings:?}"));
        }
        Payload::UInt32(v) | Payload::Unknown32(v) => preview(out, v),
        Payload::Int32(v) => preview(out, v),
        Payload::Float32(v) => preview(out, v),
        Payload::Float64(v) => preview(out, v),
        Payload::Int16(v) => preview(out, v),
        Payload::UInt16(v) => preview(out, v),
        Payload::Int8(v) => preview(out, v),
        Payload::UInt8(v) => preview(out, v),
        Payload::Int64(v) => preview(out, v),
        Payload::UInt64(v) => preview(out, v),
        Payload::Composite(items) => {
            for item in items {
                out.push_str(&format!(" format={:?} bytes={}", item.format, item.data.len()));
            }
        }
        Payload::Raw { code, words } => {
            out.push_str(&format!(" code={code:#x} words={}", words.len()));
        }
        Payload::Banks(_) | Payload::Segments(_) | Payload::TagSegments(_) => {}
    }
    out.push('\n');
    if let Some(children) = node.payload.children() {
        for child in children {
            render(child, depth + 1, out);
        }
    }
}

fn preview<T: std::fmt::Debug>(out: &mut String, values: &[T]) {
    const SHOWN: usize = 8;
    out.push_str(&format!(" {:?}", &values[..values.len().min(SHOWN)]));
    if values.len() > SHOWN {
        out.push_str(" ...");
    }
}
