//! Error handling for tabl

use std::io;
use thiserror::Error;

/// Custom error type for tabl operations
#[derive(Error, Debug)]
pub enum TablError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Permission denied: {file}")]
    PermissionDenied { file: String },

    #[error("No such file or directory: {file}")]
    FileNotFound { file: String },

    #[error("Is a directory: {file}")]
    IsDirectory { file: String },

    #[error("Cannot create temporary run file: {source}")]
    TempFile {
        #[source]
        source: io::Error,
    },

    #[error("Bytes to peek ({requested}) is larger than buffer length ({capacity})")]
    PeekTooLong { requested: usize, capacity: usize },

    #[error("Invalid UTF-8 sequence at byte offset {offset}")]
    InvalidUtf8 { offset: u64 },

    #[error("Missing column: {name} (have: {header:?})")]
    MissingColumn { name: String, header: Vec<String> },

    #[error("Column index out of bounds: {column}")]
    ColumnOutOfBounds { column: usize },

    #[error("Value {value:?} on line {line} is not numeric")]
    NotNumeric { value: String, line: usize },

    #[error("Invalid column specification: {spec}")]
    InvalidColumnSpec { spec: String },

    #[error("Invalid buffer size: {size}")]
    InvalidBufferSize { size: String },

    #[error("Invalid delimiter configuration: {message}")]
    InvalidDelimiter { message: String },

    #[error("Conflicting options: {message}")]
    ConflictingOptions { message: String },
}

/// The broad failure classes a caller can react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A source, destination or temporary file could not be opened, read or written
    Resource,
    /// Invalid arguments or input bytes that cannot be decoded
    Format,
    /// A column reference does not match the file's header
    Schema,
}

impl TablError {
    /// Returns the failure class of this error
    pub fn class(&self) -> ErrorClass {
        match self {
            TablError::Io(_)
            | TablError::PermissionDenied { .. }
            | TablError::FileNotFound { .. }
            | TablError::IsDirectory { .. }
            | TablError::TempFile { .. } => ErrorClass::Resource,

            TablError::MissingColumn { .. } | TablError::ColumnOutOfBounds { .. } => {
                ErrorClass::Schema
            }

            _ => ErrorClass::Format,
        }
    }

    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.class() {
            ErrorClass::Resource => crate::EXIT_IO_FAILURE,
            ErrorClass::Format | ErrorClass::Schema => crate::EXIT_FAILURE,
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(file: &str) -> Self {
        TablError::PermissionDenied {
            file: file.to_string(),
        }
    }

    /// Create a file not found error
    pub fn file_not_found(file: &str) -> Self {
        TablError::FileNotFound {
            file: file.to_string(),
        }
    }

    /// Create an is directory error
    pub fn is_directory(file: &str) -> Self {
        TablError::IsDirectory {
            file: file.to_string(),
        }
    }

    /// Create a missing column error
    pub fn missing_column(name: &str, header: &[String]) -> Self {
        TablError::MissingColumn {
            name: name.to_string(),
            header: header.to_vec(),
        }
    }

    /// Create an invalid column spec error
    pub fn invalid_column_spec(spec: &str) -> Self {
        TablError::InvalidColumnSpec {
            spec: spec.to_string(),
        }
    }

    /// Create an invalid buffer size error
    pub fn invalid_buffer_size(size: &str) -> Self {
        TablError::InvalidBufferSize {
            size: size.to_string(),
        }
    }

    /// Create an invalid delimiter error
    pub fn invalid_delimiter(message: &str) -> Self {
        TablError::InvalidDelimiter {
            message: message.to_string(),
        }
    }

    /// Create a conflicting options error
    pub fn conflicting_options(message: &str) -> Self {
        TablError::ConflictingOptions {
            message: message.to_string(),
        }
    }
}

/// Result type for tabl operations
pub type TablResult<T> = Result<T, TablError>;

/// Context trait for adding context to errors
pub trait TablContext<T> {
    fn with_context<F>(self, f: F) -> TablResult<T>
    where
        F: FnOnce() -> String;

    fn with_file_context(self, filename: &str) -> TablResult<T>;
}

impl<T> TablContext<T> for Result<T, io::Error> {
    fn with_context<F>(self, f: F) -> TablResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|io_err| {
            TablError::Io(io::Error::new(
                io_err.kind(),
                format!("{}: {}", f(), io_err),
            ))
        })
    }

    fn with_file_context(self, filename: &str) -> TablResult<T> {
        self.map_err(|io_err| match io_err.kind() {
            io::ErrorKind::PermissionDenied => TablError::permission_denied(filename),
            io::ErrorKind::NotFound => TablError::file_not_found(filename),
            _ => TablError::Io(io::Error::new(
                io_err.kind(),
                format!("{}: {}", filename, io_err),
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            TablError::file_not_found("x.txt").class(),
            ErrorClass::Resource
        );
        assert_eq!(
            TablError::missing_column("gene", &["a".to_string()]).class(),
            ErrorClass::Schema
        );
        assert_eq!(
            TablError::PeekTooLong {
                requested: 5,
                capacity: 4
            }
            .class(),
            ErrorClass::Format
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            TablError::file_not_found("x.txt").exit_code(),
            crate::EXIT_IO_FAILURE
        );
        assert_eq!(
            TablError::invalid_column_spec("0").exit_code(),
            crate::EXIT_FAILURE
        );
    }

    #[test]
    fn test_file_context_maps_not_found() {
        let result: Result<(), io::Error> = Err(io::Error::from(io::ErrorKind::NotFound));
        match result.with_file_context("missing.txt") {
            Err(TablError::FileNotFound { file }) => assert_eq!(file, "missing.txt"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_column_message() {
        let err = TablError::missing_column("gene", &["id".to_string(), "name".to_string()]);
        assert!(err.to_string().starts_with("Missing column: gene"));
    }
}
