//! Parsed command line arguments and their translation into configurations

use crate::bufread::STDIN_NAME;
use crate::column::parse_sort_key;
use crate::config::{
    FileConfig, FileConfigBuilder, HeaderMode, SortConfig, SortConfigBuilder, UnparsablePolicy,
};
use crate::error::{TablError, TablResult};

/// Input options shared by every subcommand
#[derive(Debug, Clone)]
pub struct InputArgs {
    pub file: String,
    pub csv: bool,
    pub no_header: bool,
    pub header_comment: bool,
    pub show_comments: bool,
    pub buffer_size: Option<usize>,
}

impl Default for InputArgs {
    fn default() -> Self {
        Self {
            file: STDIN_NAME.to_string(),
            csv: false,
            no_header: false,
            header_comment: false,
            show_comments: false,
            buffer_size: None,
        }
    }
}

impl InputArgs {
    /// Build the file dialect selected by the flags
    pub fn file_config(&self) -> TablResult<FileConfig> {
        let header_mode = match (self.no_header, self.header_comment) {
            (true, true) => {
                return Err(TablError::conflicting_options(
                    "--no-header and --header-comment are mutually exclusive",
                ))
            }
            (true, false) => HeaderMode::NoHeader,
            (false, true) => HeaderMode::Comment,
            (false, false) => HeaderMode::FirstRow,
        };

        let mut builder = if self.csv {
            FileConfigBuilder::csv()
        } else {
            FileConfigBuilder::new()
        };
        builder = builder.header_mode(header_mode);
        if let Some(size) = self.buffer_size {
            builder = builder.buffer_size(size);
        }
        builder.build()
    }
}

/// Arguments of `tabl sort`
#[derive(Debug, Clone, Default)]
pub struct SortArgs {
    pub input: InputArgs,
    pub keys: Vec<String>,
    pub sort_buffer_size: Option<usize>,
    pub temp_dir: Option<String>,
    pub unparsable: UnparsablePolicy,
    pub output: Option<String>,
}

impl SortArgs {
    pub fn sort_config(&self) -> TablResult<SortConfig> {
        let mut keys = Vec::new();
        for key in &self.keys {
            keys.extend(parse_sort_key(key)?);
        }

        let mut builder = SortConfigBuilder::new()
            .keys(keys)
            .show_comments(self.input.show_comments)
            .unparsable(self.unparsable);
        if let Some(size) = self.sort_buffer_size {
            builder = builder.sort_buffer_size(size);
        }
        if let Some(dir) = &self.temp_dir {
            builder = builder.temp_dir(dir);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnSelector;

    #[test]
    fn test_file_config_from_flags() -> TablResult<()> {
        let args = InputArgs {
            csv: true,
            header_comment: true,
            buffer_size: Some(64),
            ..Default::default()
        };
        let config = args.file_config()?;
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.quote, Some('"'));
        assert_eq!(config.header_mode, HeaderMode::Comment);
        assert_eq!(config.buffer_size, 64);
        assert_eq!(args.file, "-");
        Ok(())
    }

    #[test]
    fn test_conflicting_header_flags() {
        let args = InputArgs {
            no_header: true,
            header_comment: true,
            ..Default::default()
        };
        assert!(matches!(
            args.file_config(),
            Err(TablError::ConflictingOptions { .. })
        ));
    }

    #[test]
    fn test_sort_config_keys_in_order() -> TablResult<()> {
        let args = SortArgs {
            keys: vec!["name:r".to_string(), "2:n".to_string()],
            sort_buffer_size: Some(5),
            ..Default::default()
        };
        let config = args.sort_config()?;
        assert_eq!(
            config.keys,
            vec![
                ColumnSelector::by_name("name").reverse(),
                ColumnSelector::by_index(1).numeric()
            ]
        );
        assert_eq!(config.sort_buffer_size, 5);
        Ok(())
    }

    #[test]
    fn test_sort_without_keys_is_rejected() {
        assert!(SortArgs::default().sort_config().is_err());
    }
}
