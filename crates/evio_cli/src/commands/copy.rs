//! Copy command implementation.

use evio_core::{Control, OpenOptions, Registry, HEADER_WORDS};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Output settings for a copy.
#[derive(Debug, Clone, Default)]
pub struct CopySettings {
    /// Target block size in words.
    pub block_words: Option<u32>,
    /// Maximum events per block.
    pub max_block_events: Option<u32>,
    /// Split threshold in bytes; enables splitting.
    pub split_bytes: Option<u64>,
    /// Run number for file names.
    pub run_number: Option<u32>,
    /// Run type for file names.
    pub run_type: Option<String>,
    /// Extra `tag=value` configuration requests.
    pub controls: Vec<String>,
}

impl CopySettings {
    fn options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        if let Some(words) = self.block_words {
            options = options
                .block_words(words)
                .buffer_words(words.saturating_add(HEADER_WORDS as u32));
        }
        if let Some(events) = self.max_block_events {
            options = options.max_block_events(events);
        }
        if let Some(bytes) = self.split_bytes {
            options = options.split_bytes(bytes);
        }
        if let Some(run) = self.run_number {
            options = options.run_number(run);
        }
        if let Some(run_type) = &self.run_type {
            options = options.run_type(run_type.clone());
        }
        options
    }
}

/// Copy result.
#[derive(Debug, Serialize)]
pub struct CopyResult {
    /// Events copied.
    pub events: u64,
    /// Bytes written to all outputs.
    pub bytes_written: u64,
    /// Whether the dictionary was carried over.
    pub dictionary: bool,
}

/// Runs the copy command.
pub fn run(
    input: &Path,
    output: &str,
    settings: &CopySettings,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = copy(input, output, settings)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            println!(
                "Copied {} events ({} bytes) to {output}",
                result.events, result.bytes_written
            );
            if result.dictionary {
                println!("Dictionary carried over");
            }
        }
    }
    Ok(())
}

/// Re-writes every event of `input` to files named by `output`.
pub fn copy(
    input: &Path,
    output: &str,
    settings: &CopySettings,
) -> Result<CopyResult, Box<dyn std::error::Error>> {
    let registry = Registry::new();
    let source = registry.open(input, "r")?;
    let mode = if settings.split_bytes.is_some() { "s" } else { "w" };
    let sink = registry.open_with(PathBuf::from(output), mode, &settings.options())?;

    for request in &settings.controls {
        let (tag, value) = match request.split_once('=') {
            Some((tag, value)) => (tag, Some(value)),
            None => (request.as_str(), None),
        };
        let reply = registry.control(sink, Control::parse(tag, value)?)?;
        tracing::debug!(request = %request, reply = ?reply, "applied control");
    }

    let dictionary = registry.dictionary(source)?;
    if let Some(xml) = &dictionary {
        registry.write_dictionary(sink, xml)?;
    }

    let mut events = 0u64;
    while let Some(event) = registry.read_alloc(source)? {
        registry.write(sink, &event)?;
        events += 1;
    }
    registry.close(source)?;

    let bytes_written = registry.bytes_written(sink)?;
    registry.close(sink)?;
    tracing::info!(events, bytes_written, "copy finished");

    Ok(CopyResult {
        events,
        bytes_written,
        dictionary: dictionary.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const XML: &str = "<xmlDict><bank name=\"copy\" tag=\"2\"/></xmlDict>";

    fn source(dir: &Path, events: u32) -> PathBuf {
        let path = dir.join("in.evio");
        let registry = Registry::new();
        let h = registry.open(path.as_path(), "w").unwrap();
        registry.write_dictionary(h, XML).unwrap();
        for i in 0..events {
            registry.write(h, &[3, 0x0002_0100, i, i, i]).unwrap();
        }
        registry.close(h).unwrap();
        path
    }

    #[test]
    fn copy_with_new_block_settings() {
        let dir = tempdir().unwrap();
        let input = source(dir.path(), 100);
        let output = dir.path().join("out.evio");
        let settings = CopySettings {
            block_words: Some(256),
            controls: vec!["n=10".into()],
            ..CopySettings::default()
        };
        let result = copy(&input, output.to_str().unwrap(), &settings).unwrap();
        assert_eq!(result.events, 100);
        assert!(result.dictionary);

        let registry = Registry::new();
        let h = registry.open(output.as_path(), "r").unwrap();
        assert_eq!(registry.dictionary(h).unwrap().as_deref(), Some(XML));
        let mut n = 0;
        while let Some(event) = registry.read_alloc(h).unwrap() {
            assert_eq!(event[2], n);
            n += 1;
        }
        assert_eq!(n, 100);
    }

    #[test]
    fn copy_with_split() {
        let dir = tempdir().unwrap();
        let input = source(dir.path(), 400);
        let template = format!("{}/part_%d_%02d.evio", dir.path().display());
        let settings = CopySettings {
            block_words: Some(256),
            split_bytes: Some(4 * 264),
            run_number: Some(9),
            ..CopySettings::default()
        };
        let result = copy(&input, &template, &settings).unwrap();
        assert_eq!(result.events, 400);
        assert!(dir.path().join("part_9_00.evio").is_file());
        assert!(dir.path().join("part_9_01.evio").is_file());
    }

    #[test]
    fn unknown_control_is_rejected() {
        let dir = tempdir().unwrap();
        let input = source(dir.path(), 1);
        let output = dir.path().join("out.evio");
        let settings = CopySettings {
            controls: vec!["z=1".into()],
            ..CopySettings::default()
        };
        assert!(copy(&input, output.to_str().unwrap(), &settings).is_err());
    }
}
