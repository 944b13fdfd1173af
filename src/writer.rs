//! Record output: quoting rules, column projection and CSV to tab conversion

use crate::column::{resolve_columns, ColumnSelector, ResolvedColumn};
use crate::config::{FileConfig, HeaderMode};
use crate::error::{TablError, TablResult};
use crate::parser::RecordParser;
use crate::record::Record;
use itertools::Itertools;
use std::borrow::Cow;
use std::io::{self, BufWriter, Read, Write};

/// Quote `value` if the dialect quotes and the value holds the delimiter, the
/// quote character or a line break. Embedded quotes are doubled.
pub fn quote_value<'a>(value: &'a str, config: &FileConfig) -> Cow<'a, str> {
    let Some(quote) = config.quote else {
        return Cow::Borrowed(value);
    };

    let needs_quote = value
        .chars()
        .any(|c| c == config.delimiter || c == quote || c == '\r' || c == '\n');
    if !needs_quote {
        return Cow::Borrowed(value);
    }

    let doubled: String = [quote, quote].iter().collect();
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push(quote);
    quoted.push_str(&value.replace(quote, &doubled));
    quoted.push(quote);
    Cow::Owned(quoted)
}

/// Escape control characters so a value fits on one tab-delimited line
pub fn escape_tab(value: &str) -> Cow<'_, str> {
    if !value.chars().any(|c| matches!(c, '\x07' | '\x08' | '\x0C' | '\n' | '\r' | '\t' | '\x0B')) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0B' => out.push_str("\\v"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Buffered writer of delimited rows in a given dialect
pub struct RecordWriter<W: Write> {
    out: BufWriter<W>,
    config: FileConfig,
    delimiter: String,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W, config: &FileConfig) -> Self {
        Self {
            out: BufWriter::new(out),
            config: config.clone(),
            delimiter: config.delimiter.to_string(),
        }
    }

    /// Write one row, quoting values as needed
    pub fn write_row<S: AsRef<str>>(&mut self, values: &[S]) -> TablResult<()> {
        let line = values
            .iter()
            .map(|v| quote_value(v.as_ref(), &self.config))
            .join(&self.delimiter);
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(self.config.line_ending().as_bytes())?;
        Ok(())
    }

    /// Write text verbatim
    pub fn write_raw(&mut self, raw: &str) -> TablResult<()> {
        self.out.write_all(raw.as_bytes())?;
        Ok(())
    }

    /// Write a record's raw text, adding a line terminator if it has none
    pub fn write_line(&mut self, raw: &str) -> TablResult<()> {
        self.out.write_all(raw.as_bytes())?;
        if !raw.ends_with('\n') {
            self.out.write_all(self.config.line_ending().as_bytes())?;
        }
        Ok(())
    }

    /// Write a record's raw text as one complete line: a quote left open at
    /// end of input is closed and a missing terminator is added
    pub fn write_record(&mut self, record: &Record) -> TablResult<()> {
        match (record.has_open_quote(), self.config.quote) {
            (true, Some(quote)) => {
                self.out.write_all(record.raw().as_bytes())?;
                let mut closing = [0u8; 4];
                self.out.write_all(quote.encode_utf8(&mut closing).as_bytes())?;
                self.out.write_all(self.config.line_ending().as_bytes())?;
                Ok(())
            }
            _ => self.write_line(record.raw()),
        }
    }

    /// Copy `input` through unchanged
    pub fn copy_from<R: Read>(&mut self, input: &mut R) -> TablResult<u64> {
        Ok(io::copy(input, &mut self.out)?)
    }

    pub fn flush(&mut self) -> TablResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Copy the selected columns of every data row to `out`.
///
/// Named columns are resolved when the first data row arrives, before anything
/// but pass-through comments has been written. Returns the number of data rows.
pub fn export<W: Write>(
    parser: &mut RecordParser,
    columns: &[ColumnSelector],
    show_comments: bool,
    out: W,
) -> TablResult<u64> {
    let config = parser.config().clone();
    let mut writer = RecordWriter::new(out, &config);
    let mut resolved: Option<Vec<ResolvedColumn>> = None;
    let mut rows = 0u64;

    while let Some(record) = parser.next_record()? {
        if record.is_comment() {
            if show_comments {
                writer.write_raw(record.raw())?;
            }
            continue;
        }

        let header = parser
            .header()
            .ok_or_else(|| TablError::missing_column("", &[]))?;

        if resolved.is_none() {
            let cols = resolve_columns(columns, header)?;
            if config.header_mode != HeaderMode::NoHeader {
                check_bounds(&cols, header.len())?;
                let names: Vec<&str> = cols
                    .iter()
                    .map(|c| header.names()[c.index].as_str())
                    .collect();
                writer.write_row(&names)?;
            }
            resolved = Some(cols);
        }

        if let Some(cols) = &resolved {
            check_bounds(cols, header.len())?;
            let values: Vec<&str> = cols
                .iter()
                .map(|c| record.get(c.index).unwrap_or(""))
                .collect();
            writer.write_row(&values)?;
            rows += 1;
        }
    }

    writer.flush()?;
    Ok(rows)
}

fn check_bounds(columns: &[ResolvedColumn], width: usize) -> TablResult<()> {
    match columns.iter().find(|c| c.index >= width) {
        Some(c) => Err(TablError::ColumnOutOfBounds { column: c.index + 1 }),
        None => Ok(()),
    }
}

/// Rewrite a delimited file as tab-delimited text with escaped control characters.
/// Returns the number of data rows.
pub fn csv_to_tab<W: Write>(
    parser: &mut RecordParser,
    show_comments: bool,
    out: W,
) -> TablResult<u64> {
    let write_header = parser.config().header_mode != HeaderMode::NoHeader;
    let mut writer = RecordWriter::new(out, &FileConfig::tab());
    let mut wrote_header = false;
    let mut rows = 0u64;

    while let Some(record) = parser.next_record()? {
        if record.is_comment() {
            if show_comments {
                writer.write_raw(record.raw())?;
            }
            continue;
        }

        if !wrote_header {
            if let (true, Some(header)) = (write_header, parser.header()) {
                let names: Vec<_> = header.names().iter().map(|n| escape_tab(n)).collect();
                writer.write_row(&names)?;
            }
            wrote_header = true;
        }

        let values: Vec<_> = record.values().iter().map(|v| escape_tab(v)).collect();
        writer.write_row(&values)?;
        rows += 1;
    }

    writer.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::parse_column_list;
    use crate::config::FileConfigBuilder;
    use std::io::Cursor;

    fn parser(input: &str, config: FileConfig) -> RecordParser {
        RecordParser::from_reader(Box::new(Cursor::new(input.as_bytes().to_vec())), config)
            .expect("Failed to open test parser")
    }

    fn headerless(config: FileConfig) -> FileConfig {
        FileConfigBuilder::new()
            .delimiter(config.delimiter)
            .quote(config.quote)
            .crlf(config.crlf)
            .header_mode(HeaderMode::NoHeader)
            .build()
            .expect("Failed to build test config")
    }

    #[test]
    fn test_quote_value() {
        let csv = FileConfig::csv();
        assert_eq!(quote_value("plain", &csv), "plain");
        assert_eq!(quote_value("a,b", &csv), "\"a,b\"");
        assert_eq!(quote_value("say \"hi\"", &csv), "\"say \"\"hi\"\"\"");
        assert_eq!(quote_value("two\nlines", &csv), "\"two\nlines\"");

        // no quote character configured
        assert_eq!(quote_value("a\tb", &FileConfig::tab()), "a\tb");
    }

    #[test]
    fn test_escape_tab() {
        assert_eq!(escape_tab("plain"), "plain");
        assert_eq!(escape_tab("a\tb\nc\r"), "a\\tb\\nc\\r");
    }

    #[test]
    fn test_round_trip_plain() -> TablResult<()> {
        let config = headerless(FileConfig::tab());
        let values = ["alpha", "beta gamma", "42"];

        let mut out = Vec::new();
        let mut writer = RecordWriter::new(&mut out, &config);
        writer.write_row(&values)?;
        writer.flush()?;
        drop(writer);

        let text = String::from_utf8(out).expect("utf-8 output");
        let record = parser(&text, config).next_record()?.expect("one record");
        assert_eq!(record.values(), values);
        Ok(())
    }

    #[test]
    fn test_round_trip_quote_escaping() -> TablResult<()> {
        let config = headerless(FileConfig::csv());
        let tricky = "comma, newline\nand \"quote\"";

        let mut out = Vec::new();
        let mut writer = RecordWriter::new(&mut out, &config);
        writer.write_row(&[tricky, "next"])?;
        writer.flush()?;
        drop(writer);

        let text = String::from_utf8(out).expect("utf-8 output");
        assert!(text.ends_with("\r\n"));
        let record = parser(&text, config).next_record()?.expect("one record");
        assert_eq!(record.values(), [tricky, "next"]);
        Ok(())
    }

    #[test]
    fn test_write_line_adds_terminator() -> TablResult<()> {
        let mut out = Vec::new();
        let mut writer = RecordWriter::new(&mut out, &FileConfig::csv());
        writer.write_line("a,b")?;
        writer.write_line("c,d\n")?;
        writer.flush()?;
        drop(writer);
        assert_eq!(out, b"a,b\r\nc,d\n");
        Ok(())
    }

    #[test]
    fn test_write_record_closes_open_quote() -> TablResult<()> {
        let config = headerless(FileConfig::csv());
        let records: Vec<Record> = parser("a,1\r\n\"0,4", config.clone())
            .collect::<TablResult<_>>()?;
        assert!(records[1].has_open_quote());

        let mut out = Vec::new();
        let mut writer = RecordWriter::new(&mut out, &config);
        for record in &records {
            writer.write_record(record)?;
        }
        writer.flush()?;
        drop(writer);

        let text = String::from_utf8(out).expect("utf-8 output");
        assert_eq!(text, "a,1\r\n\"0,4\"\r\n");
        let reparsed: Vec<Record> = parser(&text, config).collect::<TablResult<_>>()?;
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[1].values(), ["0,4"]);
        Ok(())
    }

    #[test]
    fn test_export_by_name_and_index() -> TablResult<()> {
        let mut p = parser("# note\nid\tname\tscore\n1\tann\t9\n2\tbob\n", FileConfig::tab());
        let cols = parse_column_list("score,1")?;

        let mut out = Vec::new();
        let rows = export(&mut p, &cols, true, &mut out)?;
        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(out).expect("utf-8 output"),
            "# note\nscore\tid\n9\t1\n\t2\n"
        );
        Ok(())
    }

    #[test]
    fn test_export_hides_comments_by_default() -> TablResult<()> {
        let mut p = parser("# note\nid\n1\n", FileConfig::tab());
        let mut out = Vec::new();
        export(&mut p, &parse_column_list("1")?, false, &mut out)?;
        assert_eq!(out, b"id\n1\n");
        Ok(())
    }

    #[test]
    fn test_export_missing_column_writes_nothing() -> TablResult<()> {
        let mut p = parser("id\tname\n1\tann\n", FileConfig::tab());
        let mut out = Vec::new();
        let result = export(&mut p, &parse_column_list("zip")?, false, &mut out);

        assert!(matches!(result, Err(TablError::MissingColumn { .. })));
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn test_export_out_of_bounds() -> TablResult<()> {
        let mut p = parser("id\tname\n1\tann\n", FileConfig::tab());
        let mut out = Vec::new();
        let result = export(&mut p, &parse_column_list("3")?, false, &mut out);
        assert!(matches!(result, Err(TablError::ColumnOutOfBounds { column: 3 })));
        Ok(())
    }

    #[test]
    fn test_export_csv_quotes_output() -> TablResult<()> {
        let mut p = parser("a,b\r\n\"x,y\",2\r\n", FileConfig::csv());
        let mut out = Vec::new();
        export(&mut p, &parse_column_list("2,1")?, false, &mut out)?;
        assert_eq!(
            String::from_utf8(out).expect("utf-8 output"),
            "b,a\r\n2,\"x,y\"\r\n"
        );
        Ok(())
    }

    #[test]
    fn test_csv_to_tab() -> TablResult<()> {
        let mut p = parser(
            "name,notes\r\nann,\"tab\there\"\r\nbob,\"line\nbreak\"\r\n",
            FileConfig::csv(),
        );
        let mut out = Vec::new();
        let rows = csv_to_tab(&mut p, false, &mut out)?;

        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(out).expect("utf-8 output"),
            "name\tnotes\nann\ttab\\there\nbob\tline\\nbreak\n"
        );
        Ok(())
    }

    #[test]
    fn test_csv_to_tab_without_header() -> TablResult<()> {
        let mut p = parser("1,2\r\n3,4\r\n", headerless(FileConfig::csv()));
        let mut out = Vec::new();
        csv_to_tab(&mut p, false, &mut out)?;
        assert_eq!(out, b"1\t2\n3\t4\n");
        Ok(())
    }
}
