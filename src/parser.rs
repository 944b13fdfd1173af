//! Streaming record parser for delimited text
//!
//! Bytes come from a [`BufferedReader`] (transparently gunzipped when the stream
//! starts with the gzip magic number), are decoded one codepoint at a time and
//! tokenized into [`Record`]s. Quoting, comment lines and header inference are
//! handled here; the caller only ever sees complete records in input order.

use crate::bufread::BufferedReader;
use crate::config::{FileConfig, HeaderMode};
use crate::error::{TablError, TablResult};
use crate::record::{Header, Record};
use flate2::read::MultiGzDecoder;
use log::{debug, warn};
use std::io::{self, Read};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Incremental UTF-8 decoder with one codepoint of lookahead.
///
/// Sequences split across refills are stitched back together; bytes that are
/// not valid UTF-8 fail with `InvalidUtf8`.
pub struct CodepointReader<R> {
    source: R,
    buf: Vec<u8>,
    pos: usize,
    len: usize,
    eof: bool,
    offset: u64,
    peeked: Option<char>,
}

impl<R: Read> CodepointReader<R> {
    pub fn new(source: R, capacity: usize) -> Self {
        Self {
            source,
            buf: vec![0; capacity.max(4)],
            pos: 0,
            len: 0,
            eof: false,
            offset: 0,
            peeked: None,
        }
    }

    /// Consume and return the next codepoint, `None` at end of stream
    pub fn next_char(&mut self) -> TablResult<Option<char>> {
        match self.peeked.take() {
            Some(c) => Ok(Some(c)),
            None => self.decode(),
        }
    }

    /// Return the next codepoint without consuming it
    pub fn peek_char(&mut self) -> TablResult<Option<char>> {
        if self.peeked.is_none() {
            self.peeked = self.decode()?;
        }
        Ok(self.peeked)
    }

    /// Pull the first block of input so that source errors surface early
    fn prime(&mut self) -> TablResult<()> {
        if self.pos >= self.len && !self.eof {
            self.refill()?;
        }
        Ok(())
    }

    fn decode(&mut self) -> TablResult<Option<char>> {
        if self.pos >= self.len && !self.refill()? {
            return Ok(None);
        }

        let width = utf8_width(self.buf[self.pos]);
        if width == 0 {
            return Err(TablError::InvalidUtf8 {
                offset: self.offset,
            });
        }

        while self.len - self.pos < width {
            if self.eof {
                return Err(TablError::InvalidUtf8 {
                    offset: self.offset,
                });
            }
            self.refill()?;
        }

        let bytes = &self.buf[self.pos..self.pos + width];
        let ch = std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or(TablError::InvalidUtf8 {
                offset: self.offset,
            })?;

        self.pos += width;
        self.offset += width as u64;
        Ok(Some(ch))
    }

    /// Move unread bytes to the front and read more behind them.
    ///
    /// Returns whether any unread bytes are available afterwards.
    fn refill(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(self.pos < self.len);
        }

        self.buf.copy_within(self.pos..self.len, 0);
        self.len -= self.pos;
        self.pos = 0;

        loop {
            match self.source.read(&mut self.buf[self.len..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => {
                    self.len += n;
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(self.pos < self.len)
    }
}

/// Length of the UTF-8 sequence introduced by `lead`, 0 when invalid
fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

/// One tokenized line before header handling
#[derive(Debug, Default)]
struct RawLine {
    fields: Vec<String>,
    raw: String,
    byte_size: usize,
    is_comment: bool,
    /// The stream ended while reading this line
    ended: bool,
    /// The stream ended inside a quoted field
    open_quote: bool,
}

impl RawLine {
    fn consumed(&mut self, c: char) {
        self.raw.push(c);
        self.byte_size += c.len_utf8();
    }
}

/// Tokenize one line.
///
/// A final field is only kept when it is non-empty, so `a\tb\t\n` yields two
/// fields and a blank line yields none.
fn read_line<R: Read>(
    chars: &mut CodepointReader<R>,
    config: &FileConfig,
    detect_comments: bool,
) -> TablResult<RawLine> {
    let mut line = RawLine::default();
    let mut field = String::new();
    let mut in_quote = false;
    let mut first = true;

    loop {
        let Some(c) = chars.next_char()? else {
            line.ended = true;
            break;
        };
        line.consumed(c);

        if first {
            first = false;
            line.is_comment = detect_comments && c == config.comment;
        }

        if line.is_comment {
            match c {
                '\r' => {}
                '\n' => break,
                _ => field.push(c),
            }
        } else if in_quote {
            if Some(c) == config.quote {
                // "" inside quotes is a literal quote
                if chars.peek_char()? == Some(c) {
                    chars.next_char()?;
                    line.consumed(c);
                    field.push(c);
                } else {
                    in_quote = false;
                }
            } else {
                field.push(c);
            }
        } else if Some(c) == config.quote {
            in_quote = true;
        } else if c == '\r' {
        } else if c == '\n' {
            break;
        } else if c == config.delimiter {
            line.fields.push(std::mem::take(&mut field));
        } else {
            field.push(c);
        }
    }

    if !field.is_empty() {
        line.fields.push(field);
    }
    line.open_quote = in_quote;

    Ok(line)
}

/// Split `text` with the delimiter and quote rules of `config`, stopping at the
/// first newline. Comment prefixes have no special meaning here.
pub fn split_line(config: &FileConfig, text: &str) -> TablResult<Vec<String>> {
    let mut chars = CodepointReader::new(text.as_bytes(), text.len());
    Ok(read_line(&mut chars, config, false)?.fields)
}

#[derive(Debug)]
enum HeaderState {
    AwaitingFirstRow,
    Resolved(Header),
}

/// Pull-based reader of [`Record`]s from a delimited text stream.
pub struct RecordParser {
    config: FileConfig,
    chars: CodepointReader<Box<dyn Read>>,
    header: HeaderState,
    last_comment: Option<String>,
    raw_header_line: Option<String>,
    line_number: usize,
    data_line_number: usize,
    exhausted: bool,
}

impl RecordParser {
    /// Open a file (or stdin for `-`)
    pub fn open(name: &str, config: FileConfig) -> TablResult<Self> {
        config.validate()?;
        let reader = BufferedReader::open_with_capacity(name, config.buffer_size)?;
        Self::from_buffered(reader, config)
    }

    /// Parse an already open byte source
    pub fn from_reader(source: Box<dyn Read>, config: FileConfig) -> TablResult<Self> {
        config.validate()?;
        let reader = BufferedReader::from_reader(source, config.buffer_size);
        Self::from_buffered(reader, config)
    }

    fn from_buffered(mut reader: BufferedReader, config: FileConfig) -> TablResult<Self> {
        let mut magic = [0u8; 2];
        let source: Box<dyn Read> = if reader.peek(&mut magic)? == 2 && magic == GZIP_MAGIC {
            debug!("gzip magic found, decompressing input");
            Box::new(MultiGzDecoder::new(reader))
        } else {
            Box::new(reader)
        };

        let mut chars = CodepointReader::new(source, config.decode_buffer_size);
        chars.prime()?;

        Ok(Self {
            config,
            chars,
            header: HeaderState::AwaitingFirstRow,
            last_comment: None,
            raw_header_line: None,
            line_number: 0,
            data_line_number: 0,
            exhausted: false,
        })
    }

    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    /// The header, once the first data row has been seen
    pub fn header(&self) -> Option<&Header> {
        match &self.header {
            HeaderState::Resolved(header) => Some(header),
            HeaderState::AwaitingFirstRow => None,
        }
    }

    /// Raw text of the header row (first-row header mode only)
    pub fn raw_header_line(&self) -> Option<&str> {
        self.raw_header_line.as_deref()
    }

    /// Lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Look up a field of `record` by column name
    pub fn value<'a>(&self, record: &'a Record, name: &str) -> TablResult<&'a str> {
        match self.header() {
            Some(header) => record.value(header, name),
            None => Err(TablError::missing_column(name, &[])),
        }
    }

    /// Read the next data row or comment, `None` once the input is exhausted
    pub fn next_record(&mut self) -> TablResult<Option<Record>> {
        loop {
            if self.exhausted {
                return Ok(None);
            }

            let line = read_line(&mut self.chars, &self.config, true)?;
            self.line_number += 1;

            if line.ended {
                self.exhausted = true;
            }

            if line.fields.is_empty() {
                continue;
            }

            if line.is_comment {
                if matches!(self.header, HeaderState::AwaitingFirstRow) {
                    self.last_comment = Some(line.raw.clone());
                }
                return Ok(Some(Record::comment(
                    line.raw,
                    self.line_number,
                    line.byte_size,
                )));
            }

            if let HeaderState::AwaitingFirstRow = self.header {
                let header = match self.config.header_mode {
                    HeaderMode::NoHeader => Header::synthesized(line.fields.len()),
                    HeaderMode::Comment => self.header_from_comment()?,
                    HeaderMode::FirstRow => {
                        debug!("header row: {:?}", line.fields);
                        self.raw_header_line = Some(line.raw);
                        self.header = HeaderState::Resolved(Header::new(line.fields));
                        continue;
                    }
                };
                self.header = HeaderState::Resolved(header);
            }

            if let HeaderState::Resolved(header) = &mut self.header {
                header.grow(line.fields.len());
            }
            self.data_line_number += 1;

            let record = Record::data(
                line.fields,
                line.raw,
                self.line_number,
                self.data_line_number,
                line.byte_size,
            );
            return Ok(Some(record.with_open_quote(line.open_quote)));
        }
    }

    /// Header taken from the last comment before the first data row
    fn header_from_comment(&self) -> TablResult<Header> {
        let names = match &self.last_comment {
            Some(comment) => {
                let comment_char = self.config.comment;
                let text = comment.trim_start_matches(|c| c == comment_char || c == ' ');
                split_line(&self.config, text)?
            }
            None => {
                warn!("no comment line before the first data row, columns are unnamed");
                Vec::new()
            }
        };
        debug!("header from comment: {names:?}");
        Ok(Header::new(names))
    }
}

impl Iterator for RecordParser {
    type Item = TablResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}
