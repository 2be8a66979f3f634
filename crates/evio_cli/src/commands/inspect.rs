//! Inspect command implementation.

use evio_core::block::scan_blocks;
use evio_core::{Control, ControlReply, Registry};
use evio_storage::{FileBackend, StorageBackend};
use serde::Serialize;
use std::path::Path;

/// File inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// File path.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Format version of the first block.
    pub version: u32,
    /// Whether the file is in the opposite byte order to this host.
    pub swapped: bool,
    /// Number of blocks, the trailing empty block included.
    pub block_count: usize,
    /// Number of events, dictionary excluded.
    pub event_count: u64,
    /// Whether the last block carries the last-block flag.
    pub terminated: bool,
    /// Dictionary text, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<String>,
    /// Per-block details (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<BlockSummary>>,
}

/// Header summary of one block.
#[derive(Debug, Serialize)]
pub struct BlockSummary {
    /// Byte offset of the block header.
    pub offset: u64,
    /// Block sequence number.
    pub number: u32,
    /// Block size in words.
    pub words: u32,
    /// Header size in words.
    pub header_words: u32,
    /// Events in the block.
    pub events: u32,
    /// Whether the block holds the dictionary.
    pub dictionary: bool,
    /// Whether the block is flagged last.
    pub last: bool,
}

/// Runs the inspect command.
pub fn run(path: &Path, show_blocks: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path, show_blocks)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

/// Collects the inspection result for `path`.
pub fn inspect(path: &Path, show_blocks: bool) -> Result<InspectResult, Box<dyn std::error::Error>> {
    if !path.is_file() {
        return Err(format!("No EVIO file found at {}", path.display()).into());
    }
    let backend = FileBackend::open_read(path)?;
    let scan = scan_blocks(&backend)?;

    let registry = Registry::new();
    let handle = registry.open(path, "r")?;
    let dictionary = registry.dictionary(handle)?;
    let event_count = match registry.control(handle, Control::EventCount) {
        Ok(ControlReply::EventCount(n)) => n,
        _ => scan.event_count(),
    };
    registry.close(handle)?;

    let blocks = show_blocks.then(|| {
        scan.blocks
            .iter()
            .map(|b| BlockSummary {
                offset: b.offset,
                number: b.header.number(),
                words: b.header.size(),
                header_words: b.header.header_words(),
                events: b.header.count(),
                dictionary: b.header.has_dictionary(),
                last: b.header.is_last(),
            })
            .collect()
    });

    Ok(InspectResult {
        path: path.display().to_string(),
        size: backend.size()?,
        version: scan.version(),
        swapped: scan.swapped,
        block_count: scan.blocks.len(),
        event_count,
        terminated: scan.is_terminated(),
        dictionary,
        blocks,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("EVIO File Inspection");
    println!("====================");
    println!();
    println!("Path:    {}", result.path);
    println!("Size:    {}", format_size(result.size));
    println!("Version: {}", result.version);
    println!(
        "Order:   {}",
        if result.swapped { "swapped" } else { "native" }
    );
    println!();
    println!("Blocks:  {}", result.block_count);
    println!("Events:  {}", result.event_count);
    if !result.terminated {
        println!("Warning: no last-block flag found");
    }

    if let Some(dictionary) = &result.dictionary {
        println!();
        println!("Dictionary ({} chars):", dictionary.chars().count());
        println!("  {dictionary}");
    }

    if let Some(blocks) = &result.blocks {
        println!();
        println!("  {:>10}  {:>8}  {:>8}  {:>6}  flags", "offset", "number", "words", "events");
        for b in blocks {
            let mut flags = String::new();
            if b.dictionary {
                flags.push_str("dict ");
            }
            if b.last {
                flags.push_str("last");
            }
            println!(
                "  {:>10}  {:>8}  {:>8}  {:>6}  {}",
                b.offset, b.number, b.words, b.events, flags
            );
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn inspect_written_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.evio");
        let registry = Registry::new();
        let h = registry.open(path.as_path(), "w").unwrap();
        registry
            .write_dictionary(h, "<xmlDict><bank name=\"x\" tag=\"1\"/></xmlDict>")
            .unwrap();
        for i in 0..10 {
            registry.write(h, &[1, 0x0001_0100, i]).unwrap();
        }
        registry.close(h).unwrap();

        let result = inspect(&path, true).unwrap();
        assert_eq!(result.version, 4);
        assert_eq!(result.event_count, 10);
        assert!(result.terminated);
        assert!(result.dictionary.is_some());
        let blocks = result.blocks.unwrap();
        assert!(blocks[0].dictionary);
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(inspect(&dir.path().join("none.evio"), false).is_err());
    }
}
