//! Configuration management for delimited files and sort operations

use crate::column::ColumnSelector;
use crate::error::{TablError, TablResult};
use std::path::PathBuf;
use std::str::FromStr;

/// Default capacity of each of the two reader buffers
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Default capacity of the parser's decode buffer
pub const DEFAULT_DECODE_BUFFER_SIZE: usize = 64 * 1024;

/// Default number of records held in memory per sorted run
pub const DEFAULT_SORT_BUFFER_SIZE: usize = 10_000;

/// Smallest accepted buffer: one full UTF-8 codepoint
const MIN_BUFFER_SIZE: usize = 4;

/// How the header of a file is found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// The first data row is the header
    #[default]
    FirstRow,
    /// There is no header; columns are named `col1`, `col2`, ...
    NoHeader,
    /// The header is the last comment line before the first data row
    Comment,
}

/// Dialect and buffering of a delimited text file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConfig {
    /// Field separator
    pub delimiter: char,
    /// Quote character, `None` disables quoting
    pub quote: Option<char>,
    /// First character of a comment line
    pub comment: char,
    /// Emit `\r\n` line endings on output
    pub crlf: bool,
    /// Header inference mode
    pub header_mode: HeaderMode,
    /// Capacity of each reader buffer
    pub buffer_size: usize,
    /// Capacity of the parser's decode buffer
    pub decode_buffer_size: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self::tab()
    }
}

impl FileConfig {
    /// Tab-delimited, unquoted, `#` comments
    pub fn tab() -> Self {
        Self {
            delimiter: '\t',
            quote: None,
            comment: '#',
            crlf: false,
            header_mode: HeaderMode::FirstRow,
            buffer_size: DEFAULT_BUFFER_SIZE,
            decode_buffer_size: DEFAULT_DECODE_BUFFER_SIZE,
        }
    }

    /// Comma-delimited, double-quoted, `#` comments, CRLF output
    pub fn csv() -> Self {
        Self {
            delimiter: ',',
            quote: Some('"'),
            crlf: true,
            ..Self::tab()
        }
    }

    /// Line terminator used on output
    pub fn line_ending(&self) -> &'static str {
        if self.crlf {
            "\r\n"
        } else {
            "\n"
        }
    }

    /// Same dialect, reading headerless rows (used for sort runs)
    pub fn headerless(&self) -> Self {
        Self {
            header_mode: HeaderMode::NoHeader,
            ..self.clone()
        }
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> TablResult<()> {
        for (name, ch) in [("delimiter", Some(self.delimiter)), ("quote", self.quote)] {
            if matches!(ch, Some('\r') | Some('\n')) {
                return Err(TablError::invalid_delimiter(&format!(
                    "{name} cannot be a line terminator"
                )));
            }
        }

        if matches!(self.comment, '\r' | '\n') {
            return Err(TablError::invalid_delimiter(
                "comment prefix cannot be a line terminator",
            ));
        }

        if self.quote == Some(self.delimiter) {
            return Err(TablError::invalid_delimiter(
                "delimiter and quote must differ",
            ));
        }

        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(TablError::invalid_buffer_size(&format!(
                "buffer size too small: {} (minimum {MIN_BUFFER_SIZE})",
                self.buffer_size
            )));
        }

        if self.decode_buffer_size < MIN_BUFFER_SIZE {
            return Err(TablError::invalid_buffer_size(&format!(
                "decode buffer size too small: {} (minimum {MIN_BUFFER_SIZE})",
                self.decode_buffer_size
            )));
        }

        Ok(())
    }
}

/// Builder for [`FileConfig`]
pub struct FileConfigBuilder {
    config: FileConfig,
}

impl FileConfigBuilder {
    /// Start from the tab-delimited preset
    pub fn new() -> Self {
        Self {
            config: FileConfig::tab(),
        }
    }

    /// Start from the CSV preset
    pub fn csv() -> Self {
        Self {
            config: FileConfig::csv(),
        }
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    pub fn quote(mut self, quote: Option<char>) -> Self {
        self.config.quote = quote;
        self
    }

    pub fn comment(mut self, comment: char) -> Self {
        self.config.comment = comment;
        self
    }

    pub fn crlf(mut self, crlf: bool) -> Self {
        self.config.crlf = crlf;
        self
    }

    pub fn header_mode(mut self, mode: HeaderMode) -> Self {
        self.config.header_mode = mode;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn decode_buffer_size(mut self, size: usize) -> Self {
        self.config.decode_buffer_size = size;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> TablResult<FileConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for FileConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Where values that do not parse as numbers land in a numeric key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnparsablePolicy {
    /// Before every number
    #[default]
    Low,
    /// After every number
    High,
    /// Abort the sort
    Error,
}

impl FromStr for UnparsablePolicy {
    type Err = TablError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(UnparsablePolicy::Low),
            "high" => Ok(UnparsablePolicy::High),
            "error" => Ok(UnparsablePolicy::Error),
            _ => Err(TablError::conflicting_options(&format!(
                "unknown unparsable policy: {s}"
            ))),
        }
    }
}

impl std::fmt::Display for UnparsablePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UnparsablePolicy::Low => "low",
            UnparsablePolicy::High => "high",
            UnparsablePolicy::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Configuration of an external sort
#[derive(Debug, Clone)]
pub struct SortConfig {
    /// Sort keys, in tie-break order
    pub keys: Vec<ColumnSelector>,
    /// Records held in memory per run
    pub sort_buffer_size: usize,
    /// Copy comment lines to the output
    pub show_comments: bool,
    /// Directory for temporary runs (system default when `None`)
    pub temp_dir: Option<PathBuf>,
    /// Handling of non-numeric values in numeric keys
    pub unparsable: UnparsablePolicy,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            sort_buffer_size: DEFAULT_SORT_BUFFER_SIZE,
            show_comments: false,
            temp_dir: None,
            unparsable: UnparsablePolicy::Low,
        }
    }
}

impl SortConfig {
    /// Validate configuration for consistency
    pub fn validate(&self) -> TablResult<()> {
        if self.keys.is_empty() {
            return Err(TablError::invalid_column_spec(
                "at least one column to sort by is required",
            ));
        }

        if self.sort_buffer_size == 0 {
            return Err(TablError::invalid_buffer_size(
                "sort buffer must hold at least one record",
            ));
        }

        Ok(())
    }
}

/// Builder pattern for creating sort configurations
pub struct SortConfigBuilder {
    config: SortConfig,
}

impl SortConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SortConfig::default(),
        }
    }

    /// Add sort keys
    pub fn keys(mut self, keys: impl IntoIterator<Item = ColumnSelector>) -> Self {
        self.config.keys.extend(keys);
        self
    }

    /// Set the number of records per run
    pub fn sort_buffer_size(mut self, size: usize) -> Self {
        self.config.sort_buffer_size = size;
        self
    }

    /// Copy comments to the output
    pub fn show_comments(mut self, show: bool) -> Self {
        self.config.show_comments = show;
        self
    }

    /// Place temporary runs under `dir`
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn unparsable(mut self, policy: UnparsablePolicy) -> Self {
        self.config.unparsable = policy;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> TablResult<SortConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SortConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let tab = FileConfig::tab();
        assert_eq!(tab.delimiter, '\t');
        assert_eq!(tab.quote, None);
        assert!(!tab.crlf);

        let csv = FileConfig::csv();
        assert_eq!(csv.delimiter, ',');
        assert_eq!(csv.quote, Some('"'));
        assert_eq!(csv.line_ending(), "\r\n");
    }

    #[test]
    fn test_builder_validates() {
        assert!(FileConfigBuilder::new().buffer_size(2).build().is_err());
        assert!(FileConfigBuilder::new().delimiter('\n').build().is_err());
        assert!(FileConfigBuilder::csv().quote(Some(',')).build().is_err());

        let config = FileConfigBuilder::new()
            .header_mode(HeaderMode::NoHeader)
            .buffer_size(4)
            .build()
            .expect("Failed to build test config");
        assert_eq!(config.header_mode, HeaderMode::NoHeader);
        assert_eq!(config.buffer_size, 4);
    }

    #[test]
    fn test_headerless_keeps_dialect() {
        let config = FileConfig::csv().headerless();
        assert_eq!(config.header_mode, HeaderMode::NoHeader);
        assert_eq!(config.delimiter, ',');
        assert!(config.crlf);
    }

    #[test]
    fn test_sort_config_requires_keys() {
        assert!(SortConfigBuilder::new().build().is_err());

        let config = SortConfigBuilder::new()
            .keys([ColumnSelector::by_index(0)])
            .sort_buffer_size(3)
            .build()
            .expect("Failed to build test config");
        assert_eq!(config.sort_buffer_size, 3);
        assert_eq!(config.unparsable, UnparsablePolicy::Low);
    }

    #[test]
    fn test_unparsable_policy_from_str() {
        assert_eq!(
            "HIGH".parse::<UnparsablePolicy>().expect("Failed to parse policy"),
            UnparsablePolicy::High
        );
        assert!("sideways".parse::<UnparsablePolicy>().is_err());
    }
}
