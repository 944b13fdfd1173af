//! Multi-key record comparison

use crate::column::ResolvedColumn;
use crate::config::UnparsablePolicy;
use crate::error::{TablError, TablResult};
use crate::record::Record;
use std::cmp::Ordering;

/// Orders records by a chain of columns; the first unequal column decides.
///
/// Numeric columns parse both values as `f64`. A value that does not parse is
/// placed by the [`UnparsablePolicy`] and that placement ignores the column's
/// reverse flag, so with `Low` unparsable values lead in either direction.
/// Two unparsable values tie on that column. Rows too short for a column
/// compare as if the field were empty. Records without values (comments)
/// sort after every data row.
#[derive(Debug, Clone)]
pub struct RecordComparator {
    columns: Vec<ResolvedColumn>,
    unparsable: UnparsablePolicy,
}

impl RecordComparator {
    pub fn new(columns: Vec<ResolvedColumn>, unparsable: UnparsablePolicy) -> Self {
        Self {
            columns,
            unparsable,
        }
    }

    pub fn columns(&self) -> &[ResolvedColumn] {
        &self.columns
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match (a.is_comment(), b.is_comment()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }

        for column in &self.columns {
            let x = a.get(column.index).unwrap_or("");
            let y = b.get(column.index).unwrap_or("");

            let ord = if column.numeric {
                self.compare_numeric(x, y, column.reverse)
            } else {
                directed(x.cmp(y), column.reverse)
            };

            if ord != Ordering::Equal {
                return ord;
            }
        }

        Ordering::Equal
    }

    fn compare_numeric(&self, x: &str, y: &str, reverse: bool) -> Ordering {
        match (x.parse::<f64>(), y.parse::<f64>()) {
            (Ok(a), Ok(b)) => directed(a.total_cmp(&b), reverse),
            (Err(_), Err(_)) => Ordering::Equal,
            (Err(_), Ok(_)) => self.unparsable_first(),
            (Ok(_), Err(_)) => self.unparsable_first().reverse(),
        }
    }

    /// Ordering of an unparsable value against a parsable one
    fn unparsable_first(&self) -> Ordering {
        match self.unparsable {
            UnparsablePolicy::High => Ordering::Greater,
            UnparsablePolicy::Low | UnparsablePolicy::Error => Ordering::Less,
        }
    }

    /// With [`UnparsablePolicy::Error`], fail on a numeric key that does not parse
    pub fn check_numeric(&self, record: &Record) -> TablResult<()> {
        if self.unparsable != UnparsablePolicy::Error {
            return Ok(());
        }

        for column in self.columns.iter().filter(|c| c.numeric) {
            let value = record.get(column.index).unwrap_or("");
            if value.parse::<f64>().is_err() {
                return Err(TablError::NotNumeric {
                    value: value.to_string(),
                    line: record.line_number,
                });
            }
        }
        Ok(())
    }
}

#[inline]
fn directed(ord: Ordering, reverse: bool) -> Ordering {
    if reverse {
        ord.reverse()
    } else {
        ord
    }
}
