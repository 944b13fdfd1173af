//! Column selectors and the column-list syntax used by export and sort keys
//!
//! A list such as `1,3-5,name,"gene id"` selects columns by 1-based index, by
//! inclusive index range, or by header name. Names are looked up later, once the
//! header is known, by [`resolve_columns`].

use crate::error::{TablError, TablResult};
use crate::record::Header;
use std::fmt;

/// Reference to a single column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    /// 0-based column index
    Index(usize),
    /// Column name, resolved against the header before first use
    Name(String),
}

/// A column plus the ordering modifiers used when sorting by it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelector {
    pub column: ColumnRef,
    pub numeric: bool,
    pub reverse: bool,
}

impl ColumnSelector {
    pub fn by_index(index: usize) -> Self {
        Self {
            column: ColumnRef::Index(index),
            numeric: false,
            reverse: false,
        }
    }

    pub fn by_name(name: &str) -> Self {
        Self {
            column: ColumnRef::Name(name.to_string()),
            numeric: false,
            reverse: false,
        }
    }

    /// Compare as numbers
    pub fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }

    /// Sort in descending order
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Resolve against `header`
    pub fn resolve(&self, header: &Header) -> TablResult<ResolvedColumn> {
        let index = match &self.column {
            ColumnRef::Index(index) => *index,
            ColumnRef::Name(name) => header.require(name)?,
        };
        Ok(ResolvedColumn {
            index,
            numeric: self.numeric,
            reverse: self.reverse,
        })
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            ColumnRef::Index(index) => write!(f, "{}", index + 1)?,
            ColumnRef::Name(name) => write!(f, "{name:?}")?,
        }
        match (self.numeric, self.reverse) {
            (true, true) => write!(f, ":nr"),
            (true, false) => write!(f, ":n"),
            (false, true) => write!(f, ":r"),
            (false, false) => Ok(()),
        }
    }
}

/// A selector whose column is known by index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub index: usize,
    pub numeric: bool,
    pub reverse: bool,
}

/// Resolve every selector against `header`, failing on the first unknown name
pub fn resolve_columns(
    selectors: &[ColumnSelector],
    header: &Header,
) -> TablResult<Vec<ResolvedColumn>> {
    selectors.iter().map(|s| s.resolve(header)).collect()
}

/// Parse a comma separated column list such as `1,3-5,name,"a,b"`.
pub fn parse_column_list(spec: &str) -> TablResult<Vec<ColumnSelector>> {
    let mut selectors = Vec::new();
    for (item, quoted) in split_items(spec)? {
        if quoted {
            selectors.push(ColumnSelector::by_name(&item));
        } else if item.is_empty() {
            return Err(TablError::invalid_column_spec(spec));
        } else if item.chars().all(|c| c.is_ascii_digit() || c == '-') {
            push_indices(&mut selectors, &item)?;
        } else {
            selectors.push(ColumnSelector::by_name(&item));
        }
    }

    if selectors.is_empty() {
        return Err(TablError::invalid_column_spec(spec));
    }
    Ok(selectors)
}

/// Parse a sort key: a column list optionally suffixed with `:n`, `:r`, `:nr` or `:rn`
pub fn parse_sort_key(spec: &str) -> TablResult<Vec<ColumnSelector>> {
    let (list, numeric, reverse) = if let Some(list) = spec
        .strip_suffix(":nr")
        .or_else(|| spec.strip_suffix(":rn"))
    {
        (list, true, true)
    } else if let Some(list) = spec.strip_suffix(":n") {
        (list, true, false)
    } else if let Some(list) = spec.strip_suffix(":r") {
        (list, false, true)
    } else {
        (spec, false, false)
    };

    Ok(parse_column_list(list)?
        .into_iter()
        .map(|mut s| {
            s.numeric |= numeric;
            s.reverse |= reverse;
            s
        })
        .collect())
}

/// Split on commas outside single or double quotes; returns (item, was quoted)
fn split_items(spec: &str) -> TablResult<Vec<(String, bool)>> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut open_quote: Option<char> = None;

    for ch in spec.chars() {
        match open_quote {
            Some(q) if ch == q => open_quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                open_quote = Some(ch);
                quoted = true;
            }
            None if ch == ',' => {
                items.push((std::mem::take(&mut current), quoted));
                quoted = false;
            }
            None => current.push(ch),
        }
    }

    if open_quote.is_some() {
        return Err(TablError::invalid_column_spec(spec));
    }
    if !current.is_empty() || quoted {
        items.push((current, quoted));
    }
    Ok(items)
}

fn push_indices(selectors: &mut Vec<ColumnSelector>, item: &str) -> TablResult<()> {
    let parse = |s: &str| -> TablResult<usize> {
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(TablError::invalid_column_spec(item)),
        }
    };

    match item.split_once('-') {
        None => selectors.push(ColumnSelector::by_index(parse(item)? - 1)),
        Some((start, end)) => {
            let (start, end) = (parse(start)?, parse(end)?);
            if start > end {
                return Err(TablError::invalid_column_spec(item));
            }
            selectors.extend((start..=end).map(|n| ColumnSelector::by_index(n - 1)));
        }
    }
    Ok(())
}
