// Zero-copy row view.
//
// A `Row` borrows one decoded line (from the session's decoded buffer or its
// carry-over buffer) and computes field boundaries on demand. There is no
// upfront split and no per-field index table: `len()` scans the line once,
// and `field(i)` scans until field `i`. O(n) per access by design; callers
// needing repeated random access should extract the values they need once.

use crate::core::scanner::{self, Structural};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::options::Options;

/// Borrowed view over one logical record.
///
/// Valid only until the next row is pulled; re-derived fresh for every row.
#[derive(Clone, Copy)]
pub struct Row<'a> {
    line: &'a str,
    opts: &'a Options,
    line_no: u64,
}

impl<'a> Row<'a> {
    pub(crate) fn new(line: &'a str, opts: &'a Options, line_no: u64) -> Self {
        Row {
            line,
            opts,
            line_no,
        }
    }

    /// The raw line, exactly as decoded (terminator excluded).
    pub fn as_str(&self) -> &'a str {
        self.line
    }

    /// 1-based physical line number of this record.
    pub fn line(&self) -> u64 {
        self.line_no
    }

    /// Number of fields: one more than the unquoted delimiters for a
    /// non-empty line, zero for an empty line. Scans the full line once.
    pub fn len(&self) -> usize {
        if self.line.is_empty() {
            return 0;
        }
        self.bounds().count()
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    /// Field by index. Scans from the line start, stopping at `index`.
    pub fn field(&self, index: usize) -> Result<Field<'a>> {
        self.get(index).ok_or_else(|| Error::FieldIndex {
            index,
            count: self.len(),
            line: self.line_no,
        })
    }

    /// Field by index, `None` when out of range.
    pub fn get(&self, index: usize) -> Option<Field<'a>> {
        let (start, end) = self.bounds().nth(index)?;
        Some(Field::new(&self.line[start..end], self.opts, self.line_no))
    }

    /// Iterate over all fields in order.
    pub fn iter(&self) -> RowIter<'a> {
        RowIter {
            bounds: self.bounds(),
            line: self.line,
            opts: self.opts,
            line_no: self.line_no,
        }
    }

    fn bounds(&self) -> FieldBounds<'a> {
        FieldBounds {
            line: self.line,
            pos: 0,
            done: self.line.is_empty(),
            delimiter: self.opts.delimiter,
            quote: self.opts.quote,
            quoting: self.opts.quoting,
        }
    }
}

impl<'a> IntoIterator for &Row<'a> {
    type Item = Field<'a>;
    type IntoIter = RowIter<'a>;

    fn into_iter(self) -> RowIter<'a> {
        self.iter()
    }
}

impl std::fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row")
            .field("line", &self.line_no)
            .field("text", &self.line)
            .finish()
    }
}

/// Iterator over `(start, end)` byte bounds of each raw field.
struct FieldBounds<'a> {
    line: &'a str,
    pos: usize,
    done: bool,
    delimiter: u8,
    quote: u8,
    quoting: bool,
}

impl FieldBounds<'_> {
    /// Next unquoted delimiter at or after `from`, quote-aware when quoting
    /// is enabled, vectorized otherwise.
    fn next_delimiter(&self, from: usize) -> Option<usize> {
        let bytes = &self.line.as_bytes()[from..];
        if !self.quoting {
            // Lines contain no terminators, so only Delimiter can match.
            return scanner::find_structural(bytes, self.delimiter).and_then(|(off, kind)| {
                (kind == Structural::Delimiter).then_some(from + off)
            });
        }

        let mut in_quote = false;
        for (i, &b) in bytes.iter().enumerate() {
            if b == self.quote {
                in_quote = !in_quote;
            } else if b == self.delimiter && !in_quote {
                return Some(from + i);
            }
        }
        None
    }
}

impl Iterator for FieldBounds<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        if self.done {
            return None;
        }
        match self.next_delimiter(self.pos) {
            Some(end) => {
                let start = self.pos;
                self.pos = end + 1;
                Some((start, end))
            }
            None => {
                self.done = true;
                Some((self.pos, self.line.len()))
            }
        }
    }
}

/// Iterator yielding `Field` views in order.
pub struct RowIter<'a> {
    bounds: FieldBounds<'a>,
    line: &'a str,
    opts: &'a Options,
    line_no: u64,
}

impl<'a> Iterator for RowIter<'a> {
    type Item = Field<'a>;

    fn next(&mut self) -> Option<Field<'a>> {
        let (start, end) = self.bounds.next()?;
        Some(Field::new(&self.line[start..end], self.opts, self.line_no))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row<'a>(line: &'a str, opts: &'a Options) -> Row<'a> {
        Row::new(line, opts, 1)
    }

    #[test]
    fn test_field_count() {
        let opts = Options::new();
        assert_eq!(row("a,b,c", &opts).len(), 3);
        assert_eq!(row("single", &opts).len(), 1);
        assert_eq!(row("", &opts).len(), 0);
        // Trailing delimiter means a trailing empty field.
        assert_eq!(row("a,b,", &opts).len(), 3);
        assert_eq!(row(",", &opts).len(), 2);
    }

    #[test]
    fn test_quoted_delimiter_not_a_boundary() {
        let opts = Options::new();
        let r = row("\"hello, world\",test", &opts);
        assert_eq!(r.len(), 2);
        assert_eq!(r.field(0).unwrap().as_str(), "hello, world");
        assert_eq!(r.field(1).unwrap().as_str(), "test");
    }

    #[test]
    fn test_quoting_disabled_quotes_are_data() {
        let opts = Options::new().quoting(false);
        let r = row("\"hello\",world", &opts);
        assert_eq!(r.len(), 2);
        assert_eq!(r.field(0).unwrap().as_str(), "\"hello\"");
        assert_eq!(r.field(1).unwrap().as_str(), "world");
    }

    #[test]
    fn test_field_index_out_of_range() {
        let opts = Options::new();
        let r = row("a,b", &opts);
        assert!(r.get(2).is_none());
        let err = r.field(5).unwrap_err();
        assert!(matches!(
            err,
            Error::FieldIndex {
                index: 5,
                count: 2,
                line: 1
            }
        ));
    }

    #[test]
    fn test_iteration_order() {
        let opts = Options::new();
        let r = row("a,\"b,c\",d", &opts);
        let fields: Vec<_> = r.iter().map(|f| f.as_str().to_string()).collect();
        assert_eq!(fields, vec!["a", "b,c", "d"]);
    }

    #[test]
    fn test_doubled_quote_stays_in_one_field() {
        let opts = Options::new();
        let r = row("\"say \"\"hi\"\"\",done", &opts);
        assert_eq!(r.len(), 2);
        assert_eq!(r.field(0).unwrap().to_string_owned(), "say \"hi\"");
        assert_eq!(r.field(1).unwrap().as_str(), "done");
    }

    #[test]
    fn test_alternate_delimiter() {
        let opts = Options::new().delimiter(b';');
        let r = row("a;b,c;d", &opts);
        let fields: Vec<_> = r.iter().map(|f| f.as_str().to_string()).collect();
        assert_eq!(fields, vec!["a", "b,c", "d"]);
    }

    #[test]
    fn test_empty_quoted_field() {
        let opts = Options::new();
        let r = row("a,\"\",c", &opts);
        assert_eq!(r.len(), 3);
        assert_eq!(r.field(1).unwrap().as_str(), "");
    }
}
