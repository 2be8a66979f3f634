//! Verify command implementation.

use evio_codec::{decode_event, swapped_event, SwapDirection};
use evio_core::{Control, ControlReply, Registry};
use serde::Serialize;
use std::path::Path;

/// Verification result.
#[derive(Debug, Default, Serialize)]
pub struct VerifyResult {
    /// Number of events checked.
    pub events_checked: u64,
    /// Number of events that decoded and swapped cleanly.
    pub valid_events: u64,
    /// Block sequence mismatches seen while reading.
    pub sequence_mismatches: u64,
    /// Events found by the random-access index, for version 4 files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_events: Option<u64>,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    /// Returns true if nothing was wrong.
    pub fn is_ok(&self) -> bool {
        self.valid_events == self.events_checked
            && self.errors.is_empty()
            && self.indexed_events.map_or(true, |n| n == self.events_checked)
    }
}

/// Runs the verify command.
pub fn run(path: &Path, swap_check: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = verify(path, swap_check)?;
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Verifying {}", path.display());
        println!();
        println!("  Events checked:       {}", result.events_checked);
        println!("  Valid events:         {}", result.valid_events);
        println!("  Sequence mismatches:  {}", result.sequence_mismatches);
        if let Some(indexed) = result.indexed_events {
            println!("  Indexed events:       {indexed}");
        }
        for error in result.errors.iter().take(10) {
            println!("  - {error}");
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
        println!();
    }

    if result.is_ok() {
        if format != "json" {
            println!("✓ Verification passed");
        }
        Ok(())
    } else {
        if format != "json" {
            println!("✗ Verification failed");
        }
        Err("Verification failed".into())
    }
}

/// Reads every event of `path`, decoding each one and optionally checking
/// that a swap round trip restores it.
pub fn verify(path: &Path, swap_check: bool) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let registry = Registry::new();
    let handle = registry.open(path, "r")?;
    let mut result = VerifyResult::default();

    loop {
        let event = match registry.read_alloc(handle) {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(e) => {
                result
                    .errors
                    .push(format!("read failed after event {}: {e}", result.events_checked));
                break;
            }
        };
        result.events_checked += 1;
        let number = result.events_checked;

        if let Err(e) = decode_event(&event) {
            result.errors.push(format!("event {number}: {e}"));
            continue;
        }
        if swap_check {
            let restored = swapped_event(&event, SwapDirection::ToForeign)
                .and_then(|foreign| swapped_event(&foreign, SwapDirection::ToLocal));
            match restored {
                Ok(words) if words == event => {}
                Ok(_) => {
                    result
                        .errors
                        .push(format!("event {number}: swap round trip changed the event"));
                    continue;
                }
                Err(e) => {
                    result.errors.push(format!("event {number}: swap failed: {e}"));
                    continue;
                }
            }
        }
        result.valid_events += 1;
    }

    if let Ok(ControlReply::SequenceMismatches(n)) =
        registry.control(handle, Control::SequenceMismatches)
    {
        result.sequence_mismatches = n;
    }
    let version = match registry.control(handle, Control::Version)? {
        ControlReply::Version(v) => v,
        _ => 0,
    };
    registry.close(handle)?;

    if version >= 4 {
        match registry.open(path, "ra") {
            Ok(random) => {
                result.indexed_events = Some(registry.event_table(random)?.len() as u64);
                registry.close(random)?;
            }
            Err(e) => result.errors.push(format!("index build failed: {e}")),
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evio_codec::{encode_event, Node, Payload};
    use tempfile::tempdir;

    #[test]
    fn written_file_verifies() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ok.evio");
        let registry = Registry::new();
        let h = registry.open(path.as_path(), "w").unwrap();
        let event = Node::bank(
            1,
            0,
            Payload::Segments(vec![
                Node::segment(2, Payload::Int16(vec![1, -2, 3])),
                Node::segment(3, Payload::Float64(vec![0.5])),
            ]),
        );
        let words = encode_event(&event).unwrap();
        for _ in 0..20 {
            registry.write(h, &words).unwrap();
        }
        registry.close(h).unwrap();

        let result = verify(&path, true).unwrap();
        assert_eq!(result.events_checked, 20);
        assert_eq!(result.indexed_events, Some(20));
        assert!(result.is_ok());
    }

    #[test]
    fn garbage_fails_to_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.evio");
        std::fs::write(&path, [0u8; 64]).unwrap();
        assert!(verify(&path, false).is_err());
    }
}
