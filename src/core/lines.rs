// Line extraction state machine.
//
// Pulls logical lines out of the decoded text buffer, respecting quote state
// so delimiters and newlines inside quoted fields never terminate a line.
// A line that spans a buffer refill accumulates in a growable carry-over
// buffer; the extractor owns that buffer and the quote state that must
// persist across refills.
//
// States:
//   Scanning     - normal; no partial line held
//   Accumulating - carry-over holds a partial line awaiting more data
//   Draining     - stream exhausted; flush whatever remains as a final line
//   Done         - no further lines
//
// Physical line numbering increments once per extracted line, including
// lines the caller later discards (empty/comment/header skipping), so the
// number always matches the physical line, not the emitted row.

use crate::core::scanner;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::pool::{self, PooledText};

/// Carry-over growth factor (geometric; the buffer is never shrunk within a
/// session).
const CARRY_GROWTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    Accumulating,
    Draining,
    Done,
}

/// Outcome of scanning the unconsumed decoded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// A complete line terminates within the available text.
    /// `content_len` bytes of line content, then `term_len` terminator bytes
    /// (2 only for `\r\n` fully inside the same buffer).
    Terminated {
        content_len: usize,
        term_len: usize,
    },
    /// No terminator in the available text; it was moved into the carry-over
    /// buffer and the caller should refill (or drain at end of stream).
    Exhausted,
}

/// Where the most recently completed line lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineHome {
    /// Directly in the decoded buffer: no copy was needed.
    Buffer { start: usize, len: usize },
    /// In the carry-over buffer (the line spanned at least one refill).
    Carry,
}

pub struct LineExtractor {
    state: State,
    /// Growable carry-over for lines spanning refills. Lazily taken from the
    /// pool on first use, grown geometrically, never shrunk.
    carry: Option<PooledText>,
    carry_active: bool,
    /// Quote state persisted across refills within a single line.
    in_quote: bool,
    /// Physical lines extracted so far (1-based after first extraction).
    line_no: u64,
    max_line_length: usize,
}

impl LineExtractor {
    pub fn new(max_line_length: usize) -> Self {
        LineExtractor {
            state: State::Scanning,
            carry: None,
            carry_active: false,
            in_quote: false,
            line_no: 0,
            max_line_length,
        }
    }

    /// Physical line number of the most recently extracted line (1-based).
    pub fn line_no(&self) -> u64 {
        self.line_no
    }

    /// Borrow the carry-over line content.
    pub fn carry_line(&self) -> &str {
        self.carry.as_deref().map(String::as_str).unwrap_or("")
    }

    fn carry_mut(&mut self) -> &mut PooledText {
        self.carry.get_or_insert_with(pool::acquire_text)
    }

    /// Scan the unconsumed decoded text (`text[pos..]`) for the next line
    /// terminator.
    ///
    /// On `Terminated`, the caller consumes `content_len + term_len` bytes
    /// and resolves the line via [`finish_line`]. On `Exhausted`, the whole
    /// region has been appended to the carry-over and consumed; the caller
    /// refills, or calls [`drain`] once the stream reports end.
    pub fn scan(&mut self, unread: &str, opts: &Options) -> Result<Scan> {
        debug_assert!(matches!(self.state, State::Scanning | State::Accumulating));

        let bytes = unread.as_bytes();
        let hit = if opts.quoting {
            // Quote tracking is sequential; this path is scalar by design.
            scanner::find_line_end_quoted(bytes, opts.quote, &mut self.in_quote)
        } else {
            scanner::find_line_end(bytes)
        };

        match hit {
            Some(end) => {
                // Consume \r\n together only when the \n is present in the
                // same buffer. A \r at the end of the available text is a
                // complete bare-\r terminator: no cross-refill peek-ahead.
                let term_len = if bytes[end] == b'\r' && bytes.get(end + 1) == Some(&b'\n') {
                    2
                } else {
                    1
                };
                Ok(Scan::Terminated {
                    content_len: end,
                    term_len,
                })
            }
            None => {
                self.accumulate(unread)?;
                self.state = State::Accumulating;
                Ok(Scan::Exhausted)
            }
        }
    }

    /// Append an unterminated fragment to the carry-over, enforcing the
    /// maximum-line-length ceiling.
    fn accumulate(&mut self, fragment: &str) -> Result<()> {
        let carried = self.carry.as_deref().map(String::len).unwrap_or(0);
        let total = carried + fragment.len();
        if total > self.max_line_length {
            return Err(Error::LineTooLong {
                line: self.line_no + 1,
                limit: self.max_line_length,
            });
        }
        if fragment.is_empty() {
            return Ok(());
        }
        let max_line_length = self.max_line_length;
        let carry = self.carry_mut();
        // Geometric growth, capped at the ceiling the guard enforces anyway.
        if carry.capacity() < total {
            let want = (carry.capacity().max(64) * CARRY_GROWTH)
                .max(total)
                .min(max_line_length);
            let len = carry.len();
            carry.reserve(want - len);
        }
        carry.push_str(fragment);
        self.carry_active = true;
        Ok(())
    }

    /// Resolve a `Terminated` scan into a line location, folding the final
    /// fragment into the carry-over when one is active. Advances the
    /// physical line number and resets per-line state.
    pub fn finish_line(
        &mut self,
        unread: &str,
        pos: usize,
        content_len: usize,
    ) -> Result<LineHome> {
        self.line_no += 1;
        self.in_quote = false;
        self.state = State::Scanning;

        if self.carry_active {
            self.accumulate(&unread[..content_len])?;
            self.carry_active = false;
            Ok(LineHome::Carry)
        } else {
            Ok(LineHome::Buffer {
                start: pos,
                len: content_len,
            })
        }
    }

    /// Clear the carry-over after the caller is finished with a
    /// `LineHome::Carry` line. Kept separate from `finish_line` so the
    /// borrow of the carry content stays valid while the row is in use.
    pub fn clear_carry(&mut self) {
        if let Some(carry) = self.carry.as_deref_mut() {
            carry.clear();
        }
    }

    /// Stream exhausted: emit whatever remains as one final unterminated
    /// line, or report completion.
    pub fn drain(&mut self) -> Option<LineHome> {
        match self.state {
            State::Done => None,
            _ if self.carry_active => {
                self.state = State::Done;
                self.carry_active = false;
                self.in_quote = false;
                self.line_no += 1;
                Some(LineHome::Carry)
            }
            _ => {
                self.state = State::Done;
                None
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Transition into draining once refill reports end of stream.
    pub fn mark_draining(&mut self) {
        if self.state != State::Done {
            self.state = State::Draining;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> Options {
        Options::new()
    }

    /// Drive the extractor over `chunks` as if each were one refill's worth
    /// of decoded text, returning the extracted lines.
    fn run(chunks: &[&str], opts: &Options, max: usize) -> Vec<String> {
        let mut ex = LineExtractor::new(max);
        let mut lines = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            let mut pos = 0;
            while pos < chunk.len() {
                let unread = &chunk[pos..];
                match ex.scan(unread, opts).unwrap() {
                    Scan::Terminated {
                        content_len,
                        term_len,
                    } => {
                        match ex.finish_line(unread, pos, content_len).unwrap() {
                            LineHome::Buffer { start, len } => {
                                lines.push(chunk[start..start + len].to_string());
                            }
                            LineHome::Carry => {
                                lines.push(ex.carry_line().to_string());
                                ex.clear_carry();
                            }
                        }
                        pos += content_len + term_len;
                    }
                    Scan::Exhausted => {
                        pos = chunk.len();
                    }
                }
            }
            if i == chunks.len() - 1 {
                ex.mark_draining();
                if let Some(home) = ex.drain() {
                    match home {
                        LineHome::Carry => {
                            lines.push(ex.carry_line().to_string());
                            ex.clear_carry();
                        }
                        LineHome::Buffer { .. } => unreachable!("drain always flushes carry"),
                    }
                }
            }
        }
        lines
    }

    #[test]
    fn test_single_chunk_lines() {
        let lines = run(&["a,b\nc,d\n"], &opts(), 1024);
        assert_eq!(lines, vec!["a,b", "c,d"]);
    }

    #[test]
    fn test_final_line_without_terminator() {
        let lines = run(&["a,b\nc,d"], &opts(), 1024);
        assert_eq!(lines, vec!["a,b", "c,d"]);
    }

    #[test]
    fn test_line_spanning_chunks() {
        let lines = run(&["hello ", "wor", "ld\nnext\n"], &opts(), 1024);
        assert_eq!(lines, vec!["hello world", "next"]);
    }

    #[test]
    fn test_crlf_same_buffer_consumed_together() {
        let lines = run(&["a\r\nb\n"], &opts(), 1024);
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_bare_cr_at_chunk_boundary_is_a_terminator() {
        // Documented limitation: no peek across the refill, so the \r ends
        // the line and the following \n terminates an empty physical line.
        let lines = run(&["a\r", "\nb\n"], &opts(), 1024);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn test_quoted_newline_does_not_terminate() {
        let lines = run(&["\"a\nb\",c\n"], &opts(), 1024);
        assert_eq!(lines, vec!["\"a\nb\",c"]);
    }

    #[test]
    fn test_quoted_field_spanning_chunks() {
        let lines = run(&["x,\"start ", "end\",y\nz\n"], &opts(), 1024);
        assert_eq!(lines, vec!["x,\"start end\",y", "z"]);
    }

    #[test]
    fn test_quoting_disabled_newline_always_terminates() {
        let o = opts().quoting(false);
        let lines = run(&["\"a\nb\"\n"], &o, 1024);
        assert_eq!(lines, vec!["\"a", "b\""]);
    }

    #[test]
    fn test_doubled_quote_keeps_line_together() {
        let lines = run(&["\"say \"\"hi\"\"\",x\n"], &opts(), 1024);
        assert_eq!(lines, vec!["\"say \"\"hi\"\"\",x"]);
    }

    #[test]
    fn test_max_line_length_guard_fires() {
        let mut ex = LineExtractor::new(8);
        let o = opts();
        // 6 bytes accumulate fine...
        assert_eq!(ex.scan("abcdef", &o).unwrap(), Scan::Exhausted);
        // ...3 more would cross the 8-byte ceiling.
        let err = ex.scan("ghi", &o).unwrap_err();
        assert!(matches!(err, Error::LineTooLong { limit: 8, .. }));
    }

    #[test]
    fn test_line_numbering_is_physical() {
        let mut ex = LineExtractor::new(1024);
        let o = opts();
        let chunk = "a\n\nb\n";
        let mut pos = 0;
        let mut numbers = Vec::new();
        while pos < chunk.len() {
            let unread = &chunk[pos..];
            match ex.scan(unread, &o).unwrap() {
                Scan::Terminated {
                    content_len,
                    term_len,
                } => {
                    ex.finish_line(unread, pos, content_len).unwrap();
                    numbers.push(ex.line_no());
                    pos += content_len + term_len;
                }
                Scan::Exhausted => break,
            }
        }
        assert_eq!(numbers, vec![1, 2, 3], "empty lines still count");
    }

    #[test]
    fn test_carry_grows_across_many_fragments() {
        // Many small fragments force repeated geometric growth of the
        // carry-over before the terminator finally arrives.
        let fragment = "0123456789abcdef";
        let mut chunks: Vec<&str> = vec![fragment; 40];
        chunks.push("tail\nnext\n");
        let lines = run(&chunks, &opts(), 1 << 20);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 40 * fragment.len() + 4);
        assert!(lines[0].starts_with(fragment));
        assert!(lines[0].ends_with("tail"));
        assert_eq!(lines[1], "next");
    }

    #[test]
    fn test_drain_without_content_emits_nothing() {
        let lines = run(&["a\n"], &opts(), 1024);
        assert_eq!(lines, vec!["a"]);
    }
}
