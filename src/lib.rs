//! Streaming reader and external sorter for delimited text tables
//!
//! This crate reads tab- or comma-delimited files (optionally gzip-compressed)
//! through a double-buffered reader, turns them into [`Record`]s with header
//! inference and comment detection, and sorts them by one or more columns
//! with bounded memory using temporary runs and a k-way merge.

#![warn(clippy::all)]

pub mod error;
pub mod config;

// Input pipeline
pub mod bufread;
pub mod parser;
pub mod record;

// Columns and ordering
pub mod column;
pub mod compare;

// Output
pub mod external_sort;
pub mod writer;
pub mod args;

// Re-export commonly used types
pub use error::{TablError, TablResult};
pub use config::{FileConfig, HeaderMode, SortConfig, UnparsablePolicy};
pub use external_sort::{ExternalSorter, SortStats};
pub use parser::RecordParser;
pub use record::{Header, Record};

use std::io::Write;

/// Process exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_IO_FAILURE: i32 = 2;

/// Sort the file `input` (`-` for stdin) according to `config`, writing to `out`
pub fn sort<W: Write>(
    input: &str,
    file_config: FileConfig,
    config: SortConfig,
    out: W,
) -> TablResult<SortStats> {
    let parser = RecordParser::open(input, file_config)?;
    ExternalSorter::new(config).sort(parser, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::parse_sort_key;
    use crate::config::SortConfigBuilder;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    #[test]
    fn test_sort_plain_and_gzip_files_alike() -> TablResult<()> {
        let dir = TempDir::new()?;
        let text = "name\tage\ncarol\t41\nann\t7\nbob\t19\n";

        let plain = dir.path().join("people.tsv");
        std::fs::write(&plain, text)?;

        let gzipped = dir.path().join("people.tsv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes())?;
        std::fs::write(&gzipped, encoder.finish()?)?;

        let config = SortConfigBuilder::new()
            .keys(parse_sort_key("age:n")?)
            .sort_buffer_size(2)
            .build()?;

        let mut outputs = Vec::new();
        for path in [&plain, &gzipped] {
            let mut out = Vec::new();
            let stats = sort(
                &path.to_string_lossy(),
                FileConfig::tab(),
                config.clone(),
                &mut out,
            )?;
            assert_eq!(stats, SortStats { records: 3, runs: 2 });
            outputs.push(String::from_utf8(out).expect("utf-8 output"));
        }

        assert_eq!(outputs[0], "name\tage\nann\t7\nbob\t19\ncarol\t41\n");
        assert_eq!(outputs[0], outputs[1]);
        Ok(())
    }

    #[test]
    fn test_sort_missing_file() {
        let result = sort(
            "/nonexistent/table.tsv",
            FileConfig::tab(),
            SortConfig::default(),
            Vec::new(),
        );
        assert!(matches!(result, Err(TablError::FileNotFound { .. })));
    }
}
