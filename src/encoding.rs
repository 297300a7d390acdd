// Encoding resolution and incremental byte → UTF-8 decoding.
//
// The BOM probe runs at most once per session, only on seekable streams, and
// never consumes bytes it cannot account for: on no match the stream position
// is restored exactly.
//
// `StreamDecoder` accepts raw byte chunks of arbitrary size and appends
// decoded text (as UTF-8) to the session's character buffer. Multi-byte
// sequences split across chunk boundaries are carried in a small pending
// buffer; malformed input is fatal, this engine does not attempt
// transcoding repair.
//
// Legacy single/double-byte code pages are supplied externally through the
// `LegacyDecoder` trait; the engine ships no code-page tables.

use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Character encoding for the input stream.
#[derive(Clone)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    /// Externally supplied legacy code page (e.g. Latin-1, Windows-125x).
    Legacy(Arc<dyn LegacyDecoder>),
}

impl Encoding {
    /// Stable name, used in error messages and logging.
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf32Le => "UTF-32LE",
            Encoding::Utf32Be => "UTF-32BE",
            Encoding::Legacy(_) => "legacy",
        }
    }
}

impl std::fmt::Debug for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Legacy(d) => write!(f, "Legacy({})", d.name()),
            other => f.write_str(other.name()),
        }
    }
}

impl PartialEq for Encoding {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Encoding::Legacy(a), Encoding::Legacy(b)) => a.name() == b.name(),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

/// Externally registered decoder for legacy code pages.
///
/// `decode` appends UTF-8 text to `out`. `pending` is scratch storage owned
/// by the session for bytes of an incomplete multi-byte sequence carried
/// between calls (single-byte code pages can ignore it). On malformed input,
/// return `Err(offset_within_input)`.
pub trait LegacyDecoder: Send + Sync {
    fn name(&self) -> &str;
    fn decode(
        &self,
        input: &[u8],
        pending: &mut Vec<u8>,
        out: &mut String,
    ) -> std::result::Result<(), usize>;
}

// ---------------------------------------------------------------------------
// BOM detection
// ---------------------------------------------------------------------------

/// Probe a seekable stream for a byte-order mark.
///
/// Reads up to 4 leading bytes and matches longest-prefix first, so that
/// UTF-32LE (`FF FE 00 00`) is never misread as UTF-16LE (`FF FE`). On a
/// match the stream is left positioned immediately after the mark; otherwise
/// the position is restored and `None` is returned.
pub fn detect_bom<R: Read + Seek>(stream: &mut R) -> Result<Option<Encoding>> {
    let origin = stream.stream_position()?;

    let mut head = [0u8; 4];
    let mut have = 0;
    while have < 4 {
        let n = stream.read(&mut head[have..])?;
        if n == 0 {
            break;
        }
        have += n;
    }

    // Longest signatures first.
    let hit = if have >= 4 && head[..4] == [0xFF, 0xFE, 0x00, 0x00] {
        Some((Encoding::Utf32Le, 4))
    } else if have >= 4 && head[..4] == [0x00, 0x00, 0xFE, 0xFF] {
        Some((Encoding::Utf32Be, 4))
    } else if have >= 3 && head[..3] == [0xEF, 0xBB, 0xBF] {
        Some((Encoding::Utf8, 3))
    } else if have >= 2 && head[..2] == [0xFF, 0xFE] {
        Some((Encoding::Utf16Le, 2))
    } else if have >= 2 && head[..2] == [0xFE, 0xFF] {
        Some((Encoding::Utf16Be, 2))
    } else {
        None
    };

    match hit {
        Some((encoding, mark_len)) => {
            stream.seek(SeekFrom::Start(origin + mark_len as u64))?;
            Ok(Some(encoding))
        }
        None => {
            stream.seek(SeekFrom::Start(origin))?;
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// Incremental decoder
// ---------------------------------------------------------------------------

/// Expected total length of a UTF-8 sequence from its lead byte, or None for
/// an invalid lead (continuation byte or 0xF8..).
#[inline]
fn utf8_seq_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

/// Stateful incremental decoder: raw bytes in, UTF-8 text out.
///
/// One per session. Chunks may split a multi-byte sequence at any point; the
/// incomplete tail is carried in `pending` until the next `feed`. `finish`
/// reports a dangling incomplete sequence at end of stream.
pub struct StreamDecoder {
    encoding: Encoding,
    /// Bytes of an incomplete sequence carried across feeds (≤ 3 for UTF-8,
    /// 1 for UTF-16, ≤ 3 for UTF-32; legacy decoders manage their own).
    pending: Vec<u8>,
    /// UTF-16 lead surrogate awaiting its trail unit.
    lead_surrogate: Option<u16>,
    /// Absolute input offset, for error reporting.
    offset: u64,
}

impl StreamDecoder {
    pub fn new(encoding: Encoding) -> Self {
        StreamDecoder {
            encoding,
            pending: Vec::new(),
            lead_surrogate: None,
            offset: 0,
        }
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    fn malformed(&self, at: usize) -> Error {
        Error::Decode {
            encoding: self.encoding.name(),
            offset: self.offset + at as u64,
        }
    }

    /// Decode one chunk, appending text to `out`.
    pub fn feed(&mut self, input: &[u8], out: &mut String) -> Result<()> {
        match self.encoding.clone() {
            Encoding::Utf8 => self.feed_utf8(input, out)?,
            Encoding::Utf16Le => self.feed_utf16(input, out, false)?,
            Encoding::Utf16Be => self.feed_utf16(input, out, true)?,
            Encoding::Utf32Le => self.feed_utf32(input, out, false)?,
            Encoding::Utf32Be => self.feed_utf32(input, out, true)?,
            Encoding::Legacy(dec) => {
                dec.decode(input, &mut self.pending, out)
                    .map_err(|at| self.malformed(at))?;
            }
        }
        self.offset += input.len() as u64;
        Ok(())
    }

    /// End of stream: a dangling incomplete sequence is a decode error.
    pub fn finish(&mut self) -> Result<()> {
        if !self.pending.is_empty() || self.lead_surrogate.is_some() {
            return Err(self.malformed(0));
        }
        Ok(())
    }

    fn feed_utf8(&mut self, mut input: &[u8], out: &mut String) -> Result<()> {
        let mut consumed = 0usize;

        // Complete a sequence carried over from the previous chunk.
        if !self.pending.is_empty() {
            let need = match utf8_seq_len(self.pending[0]) {
                Some(n) => n,
                // Unreachable: only valid leads are ever stashed.
                None => return Err(self.malformed(0)),
            };
            while self.pending.len() < need && !input.is_empty() {
                self.pending.push(input[0]);
                input = &input[1..];
                consumed += 1;
            }
            if self.pending.len() < need {
                return Ok(()); // still incomplete, wait for more
            }
            match std::str::from_utf8(&self.pending) {
                Ok(s) => out.push_str(s),
                Err(_) => return Err(self.malformed(consumed)),
            }
            self.pending.clear();
        }

        // Validate the rest in one pass; stash an incomplete tail.
        match std::str::from_utf8(input) {
            Ok(s) => {
                out.push_str(s);
                Ok(())
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(
                    std::str::from_utf8(&input[..valid]).map_err(|_| self.malformed(consumed))?,
                );
                match e.error_len() {
                    // Incomplete sequence at end of chunk: carry it.
                    None => {
                        self.pending.extend_from_slice(&input[valid..]);
                        Ok(())
                    }
                    Some(_) => Err(self.malformed(consumed + valid)),
                }
            }
        }
    }

    fn feed_utf16(&mut self, input: &[u8], out: &mut String, big_endian: bool) -> Result<()> {
        let mut i = 0usize;

        // A carried odd byte pairs with the first byte of this chunk.
        if self.pending.len() == 1 && !input.is_empty() {
            let unit = if big_endian {
                u16::from_be_bytes([self.pending[0], input[0]])
            } else {
                u16::from_le_bytes([self.pending[0], input[0]])
            };
            self.pending.clear();
            i = 1;
            self.push_utf16_unit(unit, 0, out)?;
        }

        while i + 2 <= input.len() {
            let unit = if big_endian {
                u16::from_be_bytes([input[i], input[i + 1]])
            } else {
                u16::from_le_bytes([input[i], input[i + 1]])
            };
            self.push_utf16_unit(unit, i, out)?;
            i += 2;
        }

        if i < input.len() {
            self.pending.push(input[i]);
        }
        Ok(())
    }

    fn push_utf16_unit(&mut self, unit: u16, at: usize, out: &mut String) -> Result<()> {
        match (self.lead_surrogate.take(), unit) {
            (None, 0xD800..=0xDBFF) => {
                self.lead_surrogate = Some(unit);
                Ok(())
            }
            (None, 0xDC00..=0xDFFF) => Err(self.malformed(at)),
            (None, _) => {
                // Non-surrogate BMP unit is always a valid scalar.
                match char::from_u32(unit as u32) {
                    Some(c) => {
                        out.push(c);
                        Ok(())
                    }
                    None => Err(self.malformed(at)),
                }
            }
            (Some(lead), 0xDC00..=0xDFFF) => {
                let cp =
                    0x10000 + (((lead as u32 - 0xD800) << 10) | (unit as u32 - 0xDC00));
                match char::from_u32(cp) {
                    Some(c) => {
                        out.push(c);
                        Ok(())
                    }
                    None => Err(self.malformed(at)),
                }
            }
            (Some(_), _) => Err(self.malformed(at)),
        }
    }

    fn feed_utf32(&mut self, input: &[u8], out: &mut String, big_endian: bool) -> Result<()> {
        let mut i = 0usize;

        // Complete a carried partial code unit.
        while self.pending.len() < 4 && !self.pending.is_empty() && i < input.len() {
            self.pending.push(input[i]);
            i += 1;
        }
        if self.pending.len() == 4 {
            let bytes = [
                self.pending[0],
                self.pending[1],
                self.pending[2],
                self.pending[3],
            ];
            self.pending.clear();
            self.push_utf32_unit(bytes, 0, big_endian, out)?;
        }

        while i + 4 <= input.len() {
            let bytes = [input[i], input[i + 1], input[i + 2], input[i + 3]];
            self.push_utf32_unit(bytes, i, big_endian, out)?;
            i += 4;
        }

        if i < input.len() {
            self.pending.extend_from_slice(&input[i..]);
        }
        Ok(())
    }

    fn push_utf32_unit(
        &self,
        bytes: [u8; 4],
        at: usize,
        big_endian: bool,
        out: &mut String,
    ) -> Result<()> {
        let cp = if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        };
        match char::from_u32(cp) {
            Some(c) => {
                out.push(c);
                Ok(())
            }
            None => Err(self.malformed(at)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
