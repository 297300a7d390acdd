// Invariant (locale-independent) date, time, and GUID value types.
//
// Pure-Rust parsers, no external crate: parsing here is deliberately limited
// to the invariant formats typed field extraction promises (ISO-style dates,
// 24-hour times, hex GUID forms) plus an explicit exact-format pattern.

use std::fmt;

/// Calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

/// Time of day, 24-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Sub-second fraction in nanoseconds.
    pub nanosecond: u32,
}

/// Combined date and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    pub date: Date,
    pub time: Time,
}

/// 128-bit GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid([u8; 16]);

// ---------------------------------------------------------------------------
// Digit helpers
// ---------------------------------------------------------------------------

/// Parse exactly `width` ASCII digits at `pos`, advancing it.
fn fixed_digits(bytes: &[u8], pos: &mut usize, width: usize) -> Option<u32> {
    if *pos + width > bytes.len() {
        return None;
    }
    let mut value = 0u32;
    for &b in &bytes[*pos..*pos + width] {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + (b - b'0') as u32;
    }
    *pos += width;
    Some(value)
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Date
// ---------------------------------------------------------------------------

impl Date {
    pub fn new(year: i32, month: u8, day: u8) -> Option<Self> {
        if month == 0 || month > 12 || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Date { year, month, day })
    }

    /// Invariant date: `YYYY-MM-DD` or `YYYY/MM/DD`.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let mut pos = 0;
        let year = fixed_digits(bytes, &mut pos, 4)? as i32;
        let sep = *bytes.get(pos)?;
        if sep != b'-' && sep != b'/' {
            return None;
        }
        pos += 1;
        let month = fixed_digits(bytes, &mut pos, 2)? as u8;
        if *bytes.get(pos)? != sep {
            return None;
        }
        pos += 1;
        let day = fixed_digits(bytes, &mut pos, 2)? as u8;
        if pos != bytes.len() {
            return None;
        }
        Date::new(year, month, day)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

impl Time {
    pub const MIDNIGHT: Time = Time {
        hour: 0,
        minute: 0,
        second: 0,
        nanosecond: 0,
    };

    pub fn new(hour: u8, minute: u8, second: u8, nanosecond: u32) -> Option<Self> {
        if hour > 23 || minute > 59 || second > 59 || nanosecond >= 1_000_000_000 {
            return None;
        }
        Some(Time {
            hour,
            minute,
            second,
            nanosecond,
        })
    }

    /// Invariant time: `HH:MM`, `HH:MM:SS`, or `HH:MM:SS.fffffffff`
    /// (1 to 9 fraction digits).
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let mut pos = 0;
        let hour = fixed_digits(bytes, &mut pos, 2)? as u8;
        if *bytes.get(pos)? != b':' {
            return None;
        }
        pos += 1;
        let minute = fixed_digits(bytes, &mut pos, 2)? as u8;

        let mut second = 0u8;
        let mut nanosecond = 0u32;
        if pos < bytes.len() {
            if bytes[pos] != b':' {
                return None;
            }
            pos += 1;
            second = fixed_digits(bytes, &mut pos, 2)? as u8;

            if pos < bytes.len() {
                if bytes[pos] != b'.' {
                    return None;
                }
                pos += 1;
                let frac_start = pos;
                let mut frac = 0u32;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    if pos - frac_start < 9 {
                        frac = frac * 10 + (bytes[pos] - b'0') as u32;
                    }
                    pos += 1;
                }
                let digits = (pos - frac_start).min(9);
                if pos - frac_start == 0 || pos != bytes.len() {
                    return None;
                }
                // Scale to nanoseconds.
                for _ in digits..9 {
                    frac *= 10;
                }
                nanosecond = frac;
            }
        }
        Time::new(hour, minute, second, nanosecond)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
        if self.nanosecond != 0 {
            let mut frac = self.nanosecond;
            let mut digits = 9;
            while frac % 10 == 0 {
                frac /= 10;
                digits -= 1;
            }
            write!(f, ".{frac:0digits$}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DateTime
// ---------------------------------------------------------------------------

impl DateTime {
    /// Free-form invariant parse: a date, optionally followed by `T` or a
    /// single space and a time. A date alone is midnight.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(date) = Date::parse(text) {
            return Some(DateTime {
                date,
                time: Time::MIDNIGHT,
            });
        }
        // Date part is fixed-width (10 bytes) in both accepted formats.
        if text.len() < 11 {
            return None;
        }
        let (date_part, rest) = text.split_at(10);
        let date = Date::parse(date_part)?;
        let sep = rest.as_bytes()[0];
        if sep != b'T' && sep != b' ' {
            return None;
        }
        let time = Time::parse(&rest[1..])?;
        Some(DateTime { date, time })
    }

    /// Parse against an explicit pattern. Tokens: `yyyy`, `MM`, `dd`, `HH`,
    /// `mm`, `ss`, `fff` (milliseconds); every other pattern character must
    /// match literally. Omitted components default to zero/midnight; a
    /// pattern without date tokens defaults the date to 0001-01-01.
    pub fn parse_exact(text: &str, pattern: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let pat = pattern.as_bytes();
        let mut pos = 0;
        let mut p = 0;

        let mut year: i32 = 1;
        let mut month: u8 = 1;
        let mut day: u8 = 1;
        let mut hour: u8 = 0;
        let mut minute: u8 = 0;
        let mut second: u8 = 0;
        let mut nanosecond: u32 = 0;

        while p < pat.len() {
            if pat[p..].starts_with(b"yyyy") {
                year = fixed_digits(bytes, &mut pos, 4)? as i32;
                p += 4;
            } else if pat[p..].starts_with(b"MM") {
                month = fixed_digits(bytes, &mut pos, 2)? as u8;
                p += 2;
            } else if pat[p..].starts_with(b"dd") {
                day = fixed_digits(bytes, &mut pos, 2)? as u8;
                p += 2;
            } else if pat[p..].starts_with(b"HH") {
                hour = fixed_digits(bytes, &mut pos, 2)? as u8;
                p += 2;
            } else if pat[p..].starts_with(b"mm") {
                minute = fixed_digits(bytes, &mut pos, 2)? as u8;
                p += 2;
            } else if pat[p..].starts_with(b"ss") {
                second = fixed_digits(bytes, &mut pos, 2)? as u8;
                p += 2;
            } else if pat[p..].starts_with(b"fff") {
                nanosecond = fixed_digits(bytes, &mut pos, 3)? * 1_000_000;
                p += 3;
            } else {
                if *bytes.get(pos)? != pat[p] {
                    return None;
                }
                pos += 1;
                p += 1;
            }
        }
        if pos != bytes.len() {
            return None;
        }
        Some(DateTime {
            date: Date::new(year, month, day)?,
            time: Time::new(hour, minute, second, nanosecond)?,
        })
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.date, self.time)
    }
}

// ---------------------------------------------------------------------------
// Guid
// ---------------------------------------------------------------------------

impl Guid {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Guid(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Parse the standard hex forms:
    /// `N` (32 hex digits), `D` (8-4-4-4-12), `B` (`{D}`), `P` (`(D)`).
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let inner = if bytes.first() == Some(&b'{') && bytes.last() == Some(&b'}') {
            &text[1..text.len() - 1]
        } else if bytes.first() == Some(&b'(') && bytes.last() == Some(&b')') {
            &text[1..text.len() - 1]
        } else {
            text
        };

        let mut out = [0u8; 16];
        let mut nibble_count = 0usize;
        let mut dashes = [0usize; 4];
        let mut dash_count = 0usize;

        for (i, &b) in inner.as_bytes().iter().enumerate() {
            if b == b'-' {
                if dash_count == 4 {
                    return None;
                }
                dashes[dash_count] = i;
                dash_count += 1;
                continue;
            }
            let nibble = match b {
                b'0'..=b'9' => b - b'0',
                b'a'..=b'f' => b - b'a' + 10,
                b'A'..=b'F' => b - b'A' + 10,
                _ => return None,
            };
            if nibble_count >= 32 {
                return None;
            }
            out[nibble_count / 2] = (out[nibble_count / 2] << 4) | nibble;
            nibble_count += 1;
        }

        if nibble_count != 32 {
            return None;
        }
        // Dashes, when present, must form the 8-4-4-4-12 grouping.
        match dash_count {
            0 => {}
            4 if dashes == [8, 13, 18, 23] => {}
            _ => return None,
        }
        Some(Guid(out))
    }
}

impl fmt::Display for Guid {
    /// Lowercase `D` form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                write!(f, "-")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
