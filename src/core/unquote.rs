// Field unquoting and escape resolution.
//
// Extraction order: trim surrounding ASCII whitespace first (when enabled),
// then strip one layer of surrounding quotes when the trimmed text both
// starts and ends with the quote character. Doubled quotes stay embedded
// until the caller asks for an owned copy; resolving them earlier would
// force an allocation on every quoted field.

/// Trim surrounding ASCII whitespace.
#[inline]
pub fn trim(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_ascii_whitespace())
}

/// Strip one surrounding quote pair if present. No unescaping.
#[inline]
pub fn strip_quotes(text: &str, quote: u8) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && bytes[0] == quote && bytes[bytes.len() - 1] == quote {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// True when the text contains a doubled quote character (`""`).
#[inline]
pub fn has_doubled_quote(text: &str, quote: u8) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == quote {
            if bytes[i + 1] == quote {
                return true;
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    false
}

/// Owned copy with doubled quotes collapsed (`""` → `"`).
///
/// Fast path: no doubled quote present, plain copy.
pub fn unescape_owned(text: &str, quote: u8) -> String {
    if !has_doubled_quote(text, quote) {
        return text.to_string();
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == quote && i + 1 < bytes.len() && bytes[i + 1] == quote {
            out.push(quote);
            i += 2;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    // Collapsing ASCII pairs cannot break UTF-8 validity.
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim() {
        assert_eq!(trim("  a b  "), "a b");
        assert_eq!(trim("\t x \t"), "x");
        assert_eq!(trim(""), "");
        assert_eq!(trim("   "), "");
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"hello\"", b'"'), "hello");
        assert_eq!(strip_quotes("hello", b'"'), "hello");
        // Only one side quoted: untouched.
        assert_eq!(strip_quotes("\"hello", b'"'), "\"hello");
        assert_eq!(strip_quotes("hello\"", b'"'), "hello\"");
        // A lone quote is not a pair.
        assert_eq!(strip_quotes("\"", b'"'), "\"");
        assert_eq!(strip_quotes("\"\"", b'"'), "");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_owned("he said \"\"hello\"\"", b'"'), "he said \"hello\"");
        assert_eq!(unescape_owned("plain", b'"'), "plain");
        assert_eq!(unescape_owned("", b'"'), "");
    }

    #[test]
    fn test_unescape_is_idempotent_on_unescaped_content() {
        let once = unescape_owned("a\"\"b", b'"');
        assert_eq!(once, "a\"b");
        // No doubled quote remains, so a second pass changes nothing.
        assert_eq!(unescape_owned(&once, b'"'), once);
    }

    #[test]
    fn test_has_doubled_quote() {
        assert!(has_doubled_quote("a\"\"b", b'"'));
        assert!(!has_doubled_quote("a\"b\"c", b'"'));
        assert!(!has_doubled_quote("", b'"'));
        assert!(!has_doubled_quote("\"", b'"'));
    }
}
