// Zero-copy field view.
//
// A `Field` borrows a sub-slice of its row's line and has no storage of its
// own. Surrounding whitespace (when trimming is on) and one layer of
// surrounding quotes are already resolved at construction; doubled quotes
// stay embedded until `to_string_owned`, because collapsing them needs an
// allocation.
//
// Every typed `to_*` accessor has a `try_*` counterpart returning `Option`
// for callers that want per-field fallback instead of an error.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::core::unquote;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::value::{Date, DateTime, Guid, Time};

/// Borrowed view over one field's characters.
///
/// Valid only until the next row is pulled from the reader; the borrow
/// checker enforces this window.
#[derive(Clone, Copy)]
pub struct Field<'a> {
    text: &'a str,
    opts: &'a Options,
    line: u64,
}

impl<'a> Field<'a> {
    /// Build a field from the raw slice between delimiters: trim first when
    /// enabled, then strip one surrounding quote pair when quoting is on.
    pub(crate) fn new(raw: &'a str, opts: &'a Options, line: u64) -> Self {
        let mut text = raw;
        if opts.trim_fields {
            text = unquote::trim(text);
        }
        if opts.quoting {
            text = unquote::strip_quotes(text, opts.quote);
        }
        Field { text, opts, line }
    }

    /// The field's characters as stored: unquoted, but with doubled quote
    /// characters still embedded.
    pub fn as_str(&self) -> &'a str {
        self.text
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Empty or all ASCII whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.bytes().all(|b| b.is_ascii_whitespace())
    }

    // -- zero-copy comparisons ---------------------------------------------

    pub fn eq_str(&self, other: &str) -> bool {
        self.text == other
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.text.starts_with(prefix)
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        self.text.ends_with(suffix)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    // -- owned extraction --------------------------------------------------

    /// Owned copy with doubled quotes collapsed (`""` → `"`). This is the
    /// only place escape resolution happens; it is skipped entirely when no
    /// doubled quote is present or quoting is disabled.
    pub fn to_string_owned(&self) -> String {
        if self.opts.quoting {
            unquote::unescape_owned(self.text, self.opts.quote)
        } else {
            self.text.to_string()
        }
    }

    /// Bounded copy of the stored characters into a caller-supplied buffer.
    /// Returns the number of bytes written; content past the buffer's end is
    /// not written (callers can compare against `len()` to detect that).
    pub fn copy_into(&self, out: &mut [u8]) -> usize {
        let n = self.text.len().min(out.len());
        out[..n].copy_from_slice(&self.text.as_bytes()[..n]);
        n
    }

    // -- typed parsing (invariant formats) ---------------------------------

    fn parse_failure(&self, target: &'static str) -> Error {
        Error::Parse {
            target,
            line: self.line,
        }
    }

    /// Numeric text with surrounding ASCII whitespace tolerated, matching
    /// invariant-culture numeric parsing.
    fn numeric_text(&self) -> &str {
        unquote::trim(self.text)
    }

    pub fn try_i32(&self) -> Option<i32> {
        i32::from_str(self.numeric_text()).ok()
    }

    pub fn to_i32(&self) -> Result<i32> {
        self.try_i32().ok_or_else(|| self.parse_failure("i32"))
    }

    pub fn try_i64(&self) -> Option<i64> {
        i64::from_str(self.numeric_text()).ok()
    }

    pub fn to_i64(&self) -> Result<i64> {
        self.try_i64().ok_or_else(|| self.parse_failure("i64"))
    }

    pub fn try_f64(&self) -> Option<f64> {
        f64::from_str(self.numeric_text()).ok()
    }

    pub fn to_f64(&self) -> Result<f64> {
        self.try_f64().ok_or_else(|| self.parse_failure("f64"))
    }

    pub fn try_decimal(&self) -> Option<Decimal> {
        Decimal::from_str(self.numeric_text()).ok()
    }

    pub fn to_decimal(&self) -> Result<Decimal> {
        self.try_decimal()
            .ok_or_else(|| self.parse_failure("decimal"))
    }

    /// Case-insensitive: `true/false`, `1/0`, `yes/no`, `y/n`.
    pub fn try_bool(&self) -> Option<bool> {
        let t = self.numeric_text();
        for truthy in ["true", "1", "yes", "y"] {
            if t.eq_ignore_ascii_case(truthy) {
                return Some(true);
            }
        }
        for falsy in ["false", "0", "no", "n"] {
            if t.eq_ignore_ascii_case(falsy) {
                return Some(false);
            }
        }
        None
    }

    pub fn to_bool(&self) -> Result<bool> {
        self.try_bool().ok_or_else(|| self.parse_failure("bool"))
    }

    pub fn try_date(&self) -> Option<Date> {
        Date::parse(self.numeric_text())
    }

    pub fn to_date(&self) -> Result<Date> {
        self.try_date().ok_or_else(|| self.parse_failure("date"))
    }

    pub fn try_time(&self) -> Option<Time> {
        Time::parse(self.numeric_text())
    }

    pub fn to_time(&self) -> Result<Time> {
        self.try_time().ok_or_else(|| self.parse_failure("time"))
    }

    pub fn try_datetime(&self) -> Option<DateTime> {
        DateTime::parse(self.numeric_text())
    }

    pub fn to_datetime(&self) -> Result<DateTime> {
        self.try_datetime()
            .ok_or_else(|| self.parse_failure("datetime"))
    }

    /// Parse against an explicit pattern (`yyyy`, `MM`, `dd`, `HH`, `mm`,
    /// `ss`, `fff` tokens; everything else literal).
    pub fn try_datetime_exact(&self, pattern: &str) -> Option<DateTime> {
        DateTime::parse_exact(self.numeric_text(), pattern)
    }

    pub fn to_datetime_exact(&self, pattern: &str) -> Result<DateTime> {
        self.try_datetime_exact(pattern)
            .ok_or_else(|| self.parse_failure("datetime"))
    }

    pub fn try_guid(&self) -> Option<Guid> {
        Guid::parse(self.numeric_text())
    }

    pub fn to_guid(&self) -> Result<Guid> {
        self.try_guid().ok_or_else(|| self.parse_failure("guid"))
    }
}

impl std::fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Field").field(&self.text).finish()
    }
}
