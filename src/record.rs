//! Parsed records and the header they are read against

use crate::error::{TablError, TablResult};

/// One logical line of a delimited file: a data row or a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Field values; `None` for a comment
    values: Option<Vec<String>>,
    /// Raw text consumed for this record, terminator included
    raw: String,
    /// 1-based count of lines read so far (comments, blank lines and header included)
    pub line_number: usize,
    /// 1-based count of data rows; `None` for comments
    pub data_line_number: Option<usize>,
    /// Bytes consumed producing this record
    pub byte_size: usize,
    /// Free for downstream consumers; never set by the parser
    pub flag: bool,
    /// Input ended before the quote opened in this record was closed
    open_quote: bool,
}

impl Record {
    pub fn data(
        values: Vec<String>,
        raw: String,
        line_number: usize,
        data_line_number: usize,
        byte_size: usize,
    ) -> Self {
        Self {
            values: Some(values),
            raw,
            line_number,
            data_line_number: Some(data_line_number),
            byte_size,
            flag: false,
            open_quote: false,
        }
    }

    /// Mark a record whose raw text stops inside a quoted field
    pub fn with_open_quote(mut self, open_quote: bool) -> Self {
        self.open_quote = open_quote;
        self
    }

    pub fn comment(raw: String, line_number: usize, byte_size: usize) -> Self {
        Self {
            values: None,
            raw,
            line_number,
            data_line_number: None,
            byte_size,
            flag: false,
            open_quote: false,
        }
    }

    pub fn is_comment(&self) -> bool {
        self.values.is_none()
    }

    /// Field values, empty for a comment
    pub fn values(&self) -> &[String] {
        self.values.as_deref().unwrap_or(&[])
    }

    /// Field at `index`, if the row is wide enough
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values().get(index).map(String::as_str)
    }

    /// Exact text this record was parsed from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn has_open_quote(&self) -> bool {
        self.open_quote
    }

    /// Comment text without its line terminator
    pub fn comment_text(&self) -> Option<&str> {
        if self.is_comment() {
            Some(self.raw.trim_end_matches(['\r', '\n']))
        } else {
            None
        }
    }

    /// Look up a field by column name
    pub fn value<'a>(&'a self, header: &Header, name: &str) -> TablResult<&'a str> {
        let index = header.require(name)?;
        Ok(self.get(index).unwrap_or(""))
    }
}

/// Ordered column names of a file.
///
/// Once populated the header only grows: rows wider than the header append
/// blank names (or `colN` names for synthesized headers).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    names: Vec<String>,
    synthesized: bool,
}

impl Header {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            synthesized: false,
        }
    }

    /// `col1` .. `colN`
    pub fn synthesized(width: usize) -> Self {
        let mut header = Self {
            names: Vec::with_capacity(width),
            synthesized: true,
        };
        header.grow(width);
        header
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Widen to `width` columns; never shrinks
    pub fn grow(&mut self, width: usize) {
        while self.names.len() < width {
            let name = if self.synthesized {
                format!("col{}", self.names.len() + 1)
            } else {
                String::new()
            };
            self.names.push(name);
        }
    }

    /// Index of the first column called `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Like [`Header::position`], failing with `MissingColumn`
    pub fn require(&self, name: &str) -> TablResult<usize> {
        self.position(name)
            .ok_or_else(|| TablError::missing_column(name, &self.names))
    }
}
