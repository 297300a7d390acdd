// The parsing session: owns the pooled buffers, drives refills and the line
// extractor, and hands out zero-copy row views.
//
// Pull-based and synchronous: each `next_row` call may trigger zero or more
// stream reads, never spawns anything, and never suspends. A returned `Row`
// borrows the session's buffers, so the borrow checker pins its validity
// window to exactly "until the next advance", the central invariant of the
// zero-copy design.
//
// Buffers come from the process-wide pool at construction and go back when
// the reader drops, identically on normal completion, early break, and
// error propagation.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::ops::ControlFlow;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::lines::{LineExtractor, LineHome, Scan};
use crate::core::scanner;
use crate::encoding::{detect_bom, Encoding, StreamDecoder};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::pool::{self, PooledBytes, PooledText};
use crate::row::Row;

/// Streaming CSV reader over any byte stream.
pub struct Reader<R> {
    stream: R,
    opts: Options,
    decoder: StreamDecoder,
    /// Raw read target, sized to `buffer_size`.
    raw: PooledBytes,
    /// Decoded text (valid UTF-8). Unconsumed region is `text[pos..]`.
    text: PooledText,
    pos: usize,
    eof: bool,
    extractor: LineExtractor,
    /// The previous row lived in the carry-over buffer; clear it before the
    /// next pull (not earlier; the row borrowed it).
    clear_carry_next: bool,
    /// A fatal error was returned; the session stays dead.
    fatal: bool,
}

impl Reader<BufReader<File>> {
    /// Open a file for parsing. Runs the BOM probe.
    pub fn from_path<P: AsRef<Path>>(path: P, opts: Options) -> Result<Self> {
        Reader::new(BufReader::new(File::open(path)?), opts)
    }
}

impl<R: Read + Seek> Reader<R> {
    /// Create a session over a seekable stream. Probes for a byte-order
    /// mark; a detected mark wins over the configured encoding, otherwise
    /// the configured encoding (default UTF-8) applies.
    pub fn new(mut stream: R, opts: Options) -> Result<Self> {
        opts.validate()?;
        let detected = detect_bom(&mut stream)?;
        let encoding = match detected {
            Some(enc) => {
                debug!(encoding = enc.name(), "byte-order mark detected");
                enc
            }
            None => opts.encoding.clone().unwrap_or(Encoding::Utf8),
        };
        Ok(Self::build(stream, opts, encoding))
    }
}

impl<R: Read> Reader<R> {
    /// Create a session over a non-seekable stream. BOM detection is
    /// skipped entirely (it would otherwise consume bytes it cannot
    /// restore) and the configured encoding (default UTF-8) applies.
    pub fn from_reader(stream: R, opts: Options) -> Result<Self> {
        opts.validate()?;
        let encoding = opts.encoding.clone().unwrap_or(Encoding::Utf8);
        Ok(Self::build(stream, opts, encoding))
    }

    fn build(stream: R, opts: Options, encoding: Encoding) -> Self {
        debug!(
            encoding = encoding.name(),
            backend = ?scanner::backend(),
            buffer_size = opts.buffer_size,
            "csv session open"
        );
        let mut raw = pool::acquire_bytes(opts.buffer_size);
        raw.resize(opts.buffer_size, 0);
        let extractor = LineExtractor::new(opts.max_line_length);
        Reader {
            stream,
            decoder: StreamDecoder::new(encoding),
            raw,
            text: pool::acquire_text(),
            pos: 0,
            eof: false,
            extractor,
            clear_carry_next: false,
            fatal: false,
            opts,
        }
    }

    /// The session's options.
    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Pull the next row.
    ///
    /// Returns `Ok(None)` at end of input. The returned `Row` (and every
    /// `Field` derived from it) borrows the session's buffers and cannot
    /// outlive the next call that advances the session.
    pub fn next_row(&mut self) -> Result<Option<Row<'_>>> {
        loop {
            if self.clear_carry_next {
                self.extractor.clear_carry();
                self.clear_carry_next = false;
            }

            let home = match self.pull_line()? {
                Some(home) => home,
                None => return Ok(None),
            };
            let line_no = self.extractor.line_no();
            if home == LineHome::Carry {
                self.clear_carry_next = true;
            }

            // Post-extraction filtering: numbering already happened, so
            // skipped lines still advance the physical line counter.
            let skip = {
                let line = self.line_text(home);
                (line_no == 1 && self.opts.has_header)
                    || (line.is_empty() && self.opts.skip_empty_lines)
                    || self
                        .opts
                        .comment
                        .is_some_and(|c| line.as_bytes().first() == Some(&c))
            };
            if skip {
                continue;
            }

            if let Some(expected) = self.opts.expected_columns {
                let actual = Row::new(self.line_text(home), &self.opts, line_no).len();
                if actual != expected {
                    return Err(Error::ColumnCount {
                        line: line_no,
                        expected,
                        actual,
                    });
                }
            }

            return Ok(Some(Row::new(self.line_text(home), &self.opts, line_no)));
        }
    }

    /// Callback-style iteration with an early-stop signal.
    pub fn for_each<F>(&mut self, mut handler: F) -> Result<()>
    where
        F: FnMut(Row<'_>) -> ControlFlow<()>,
    {
        while let Some(row) = self.next_row()? {
            if let ControlFlow::Break(()) = handler(row) {
                break;
            }
        }
        Ok(())
    }

    fn line_text(&self, home: LineHome) -> &str {
        match home {
            LineHome::Buffer { start, len } => &self.text[start..start + len],
            LineHome::Carry => self.extractor.carry_line(),
        }
    }

    /// Extract the next physical line, refilling as needed.
    fn pull_line(&mut self) -> Result<Option<LineHome>> {
        if self.fatal || self.extractor.is_done() {
            return Ok(None);
        }

        loop {
            if self.pos < self.text.len() {
                let scan = self
                    .extractor
                    .scan(&self.text[self.pos..], &self.opts);
                let scan = match scan {
                    Ok(scan) => scan,
                    Err(e) => return Err(self.fail(e)),
                };
                match scan {
                    Scan::Terminated {
                        content_len,
                        term_len,
                    } => {
                        let home = self.extractor.finish_line(
                            &self.text[self.pos..],
                            self.pos,
                            content_len,
                        );
                        let home = match home {
                            Ok(home) => home,
                            Err(e) => return Err(self.fail(e)),
                        };
                        self.pos += content_len + term_len;
                        return Ok(Some(home));
                    }
                    Scan::Exhausted => {
                        self.pos = self.text.len();
                    }
                }
            }

            if self.eof {
                self.extractor.mark_draining();
                return Ok(self.extractor.drain());
            }
            // Zero bytes read flips `eof`; loop once more to drain.
            self.refill()?;
        }
    }

    /// One refill: slide unconsumed text to the buffer start, read one raw
    /// chunk, decode it appended after the retained text. Returns false at
    /// end of stream.
    fn refill(&mut self) -> Result<bool> {
        if self.pos > 0 {
            self.text.drain(..self.pos);
            self.pos = 0;
        }

        let n = match self.stream.read(&mut self.raw[..]) {
            Ok(n) => n,
            Err(e) => return Err(self.fail(e.into())),
        };
        if n == 0 {
            self.eof = true;
            if let Err(e) = self.decoder.finish() {
                return Err(self.fail(e));
            }
            return Ok(false);
        }

        let (raw, text) = (&self.raw[..n], &mut *self.text);
        if let Err(e) = self.decoder.feed(raw, text) {
            return Err(self.fail(e));
        }
        Ok(true)
    }

    fn fail(&mut self, e: Error) -> Error {
        warn!(error = %e, "csv session aborted");
        self.fatal = true;
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(input: &str, opts: Options) -> Vec<Vec<String>> {
        let mut reader = Reader::new(Cursor::new(input.as_bytes().to_vec()), opts).unwrap();
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row().unwrap() {
            rows.push(row.iter().map(|f| f.as_str().to_string()).collect());
        }
        rows
    }

    fn no_header() -> Options {
        Options::new().has_header(false)
    }

    #[test]
    fn test_basic_rows() {
        let rows = collect("a,b,c\n1,2,3\n", no_header());
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_header_skipped_by_default() {
        let rows = collect("name,age\nalice,30\n", Options::new());
        assert_eq!(rows, vec![vec!["alice", "30"]]);
    }

    #[test]
    fn test_final_line_without_terminator() {
        let rows = collect("a,b\nc,d", no_header());
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_mixed_crlf_quoting_disabled() {
        let rows = collect("a,b,c\r\nc,d,e", no_header().quoting(false));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["a", "b", "c"]);
        assert_eq!(rows[1], vec!["c", "d", "e"]);
    }

    #[test]
    fn test_empty_line_skipping_toggle() {
        let on = collect("a,b,c\n\n1,2,3\n", no_header());
        assert_eq!(on.len(), 2);

        let off = collect("a,b,c\n\n1,2,3\n", no_header().skip_empty_lines(false));
        assert_eq!(off.len(), 3);
        assert_eq!(off[1], Vec::<String>::new(), "empty row has field count 0");
    }

    #[test]
    fn test_comment_lines_skipped() {
        let rows = collect("# heading\na,b\n#tail\nc,d\n", no_header().comment(b'#'));
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_physical_line_numbers() {
        let input = "h1,h2\n\n# note\nx,y\n";
        let opts = Options::new().comment(b'#');
        let mut reader = Reader::new(Cursor::new(input.as_bytes().to_vec()), opts).unwrap();
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.line(), 4, "header, blank, comment all count");
        assert!(reader.next_row().unwrap().is_none());
    }

    #[test]
    fn test_quoted_field_with_newline_across_tiny_buffers() {
        let opts = no_header().buffer_size(2);
        let rows = collect("a,\"line one\nline two\",b\nnext,row,!\n", opts);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], "line one\nline two");
        assert_eq!(rows[1], vec!["next", "row", "!"]);
    }

    #[test]
    fn test_expected_columns_enforced() {
        let opts = no_header().expected_columns(3);
        let mut reader =
            Reader::new(Cursor::new(b"a,b,c\nx,y\n".to_vec()), opts).unwrap();
        assert!(reader.next_row().unwrap().is_some());
        let err = reader.next_row().unwrap_err();
        assert!(matches!(
            err,
            Error::ColumnCount {
                line: 2,
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_max_line_length_fatal_and_sticky() {
        let opts = no_header().max_line_length(8).buffer_size(4);
        let long = "x".repeat(64);
        let mut reader = Reader::new(Cursor::new(long.into_bytes()), opts).unwrap();
        let err = reader.next_row().unwrap_err();
        assert!(matches!(err, Error::LineTooLong { limit: 8, .. }));
        // The session stays dead after a fatal error.
        assert!(reader.next_row().unwrap().is_none());
    }

    #[test]
    fn test_bom_utf16le_stream() {
        // BOM + "a,b\nc,d" in UTF-16LE.
        let mut bytes = vec![0xFF, 0xFE];
        for ch in "a,b\nc,d".encode_utf16() {
            bytes.extend_from_slice(&ch.to_le_bytes());
        }
        let rows = {
            let mut reader = Reader::new(Cursor::new(bytes), no_header()).unwrap();
            let mut rows = Vec::new();
            while let Some(row) = reader.next_row().unwrap() {
                rows.push(
                    row.iter()
                        .map(|f| f.as_str().to_string())
                        .collect::<Vec<_>>(),
                );
            }
            rows
        };
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_bom_beats_configured_encoding() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"x,y\n");
        let opts = no_header().encoding(Encoding::Utf16Le);
        let mut reader = Reader::new(Cursor::new(bytes), opts).unwrap();
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.field(0).unwrap().as_str(), "x");
    }

    #[test]
    fn test_from_reader_skips_bom_probe() {
        // A non-seekable stream parses with the configured default; the
        // UTF-8 BOM bytes become data on line 1.
        struct NoSeek(Cursor<Vec<u8>>);
        impl Read for NoSeek {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                self.0.read(buf)
            }
        }
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("x\n".as_bytes());
        let mut reader =
            Reader::from_reader(NoSeek(Cursor::new(bytes)), no_header()).unwrap();
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.as_str(), "\u{feff}x");
    }

    #[test]
    fn test_for_each_early_stop() {
        let mut reader =
            Reader::new(Cursor::new(b"a\nb\nc\nd\n".to_vec()), no_header()).unwrap();
        let mut seen = Vec::new();
        reader
            .for_each(|row| {
                seen.push(row.as_str().to_string());
                if seen.len() == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(seen, vec!["a", "b"]);
        // Early stop abandons the rest; the next pull resumes where it left.
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.as_str(), "c");
    }

    #[test]
    fn test_decode_error_is_fatal() {
        let mut reader =
            Reader::new(Cursor::new(vec![b'a', 0xC3, 0x28, b'\n']), no_header()).unwrap();
        let err = reader.next_row().unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(reader.next_row().unwrap().is_none());
    }

    #[test]
    fn test_trailing_delimiter_and_quoted_empty() {
        let rows = collect("a,b,\n\"\",x\n", no_header());
        assert_eq!(rows, vec![vec!["a", "b", ""], vec!["", "x"]]);
    }

    #[test]
    fn test_carry_row_then_next_row() {
        // First line spans refills (lives in the carry-over); the second
        // must still come out intact after the carry is recycled.
        let opts = no_header().buffer_size(3);
        let rows = collect("first line,wide\nsecond,row\n", opts);
        assert_eq!(rows, vec![vec!["first line", "wide"], vec!["second", "row"]]);
    }
}
