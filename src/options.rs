// Per-session parse configuration.
//
// Built once, validated once, then referenced immutably by every downstream
// component (reader, line extractor, row/field views).

use crate::encoding::Encoding;
use crate::error::{Error, Result};

/// Default read buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default maximum logical line length in bytes (DoS guard).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Immutable per-session parse options.
///
/// Delimiter, quote and comment characters must be ASCII: the decoded buffer
/// is UTF-8, and single-byte scanning for structural characters is only safe
/// when they can never collide with a multi-byte sequence.
#[derive(Debug, Clone)]
pub struct Options {
    pub(crate) delimiter: u8,
    pub(crate) quote: u8,
    pub(crate) has_header: bool,
    pub(crate) encoding: Option<Encoding>,
    pub(crate) buffer_size: usize,
    pub(crate) max_line_length: usize,
    pub(crate) trim_fields: bool,
    pub(crate) quoting: bool,
    pub(crate) expected_columns: Option<usize>,
    pub(crate) skip_empty_lines: bool,
    pub(crate) comment: Option<u8>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            delimiter: b',',
            quote: b'"',
            has_header: true,
            encoding: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            trim_fields: false,
            quoting: true,
            expected_columns: None,
            skip_empty_lines: true,
            comment: None,
        }
    }
}

impl Options {
    /// Options with all defaults: comma delimiter, double-quote, header row,
    /// auto-detected encoding falling back to UTF-8.
    pub fn new() -> Self {
        Self::default()
    }

    /// Field delimiter (default `,`).
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Quote character (default `"`).
    pub fn quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    /// Whether physical line 1 is a header row to skip (default true).
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Encoding override. When unset, a BOM probe runs on seekable streams
    /// and UTF-8 applies otherwise. A detected BOM always wins.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Raw read chunk size in bytes (default 4096).
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Maximum logical line length in bytes (default 64 KiB). Hard ceiling:
    /// exceeding it while a line accumulates across refills is fatal.
    pub fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Trim surrounding ASCII whitespace from fields (default false).
    pub fn trim_fields(mut self, trim: bool) -> Self {
        self.trim_fields = trim;
        self
    }

    /// Quoted-field support (default true). When disabled, quote characters
    /// are plain data and never suppress delimiters or line endings.
    pub fn quoting(mut self, quoting: bool) -> Self {
        self.quoting = quoting;
        self
    }

    /// Strict per-row column count check (default unchecked).
    pub fn expected_columns(mut self, count: usize) -> Self {
        self.expected_columns = Some(count);
        self
    }

    /// Skip rows whose line is empty (default true).
    pub fn skip_empty_lines(mut self, skip: bool) -> Self {
        self.skip_empty_lines = skip;
        self
    }

    /// Comment character: lines starting with it are skipped (default none).
    pub fn comment(mut self, comment: u8) -> Self {
        self.comment = Some(comment);
        self
    }

    /// Validate option invariants. Called by `Reader` construction.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.delimiter == self.quote {
            return Err(Error::Options(
                "delimiter and quote must be distinct".into(),
            ));
        }
        if !self.delimiter.is_ascii() || !self.quote.is_ascii() {
            return Err(Error::Options(
                "delimiter and quote must be ASCII".into(),
            ));
        }
        if let Some(c) = self.comment {
            if !c.is_ascii() {
                return Err(Error::Options("comment character must be ASCII".into()));
            }
        }
        if self.buffer_size == 0 {
            return Err(Error::Options("buffer_size must be > 0".into()));
        }
        if self.max_line_length == 0 {
            return Err(Error::Options("max_line_length must be > 0".into()));
        }
        Ok(())
    }
}
