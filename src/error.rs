// Crate-wide error taxonomy.
//
// Fatal, session-terminating: Io, Decode, LineTooLong. Once one of these is
// returned the session is dead; buffers are still returned to the pool on drop.
// Call-site errors: FieldIndex, Parse, ColumnCount, Options. These never
// affect session state; the next `next_row()` behaves normally.

use thiserror::Error;

/// Result alias for streamcsv operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Underlying stream read failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed byte sequence for the selected encoding. The engine does
    /// not attempt transcoding repair.
    #[error("malformed {encoding} sequence at byte offset {offset}")]
    Decode {
        /// Name of the encoding that rejected the input.
        encoding: &'static str,
        /// Absolute byte offset of the offending sequence.
        offset: u64,
    },

    /// A logical line exceeded `max_line_length` while accumulating across
    /// buffer refills. Denial-of-service guard; never silently truncates.
    #[error("line {line} exceeds maximum line length of {limit} bytes")]
    LineTooLong { line: u64, limit: usize },

    /// Field index out of range for the current row.
    #[error("field index {index} out of range for row with {count} fields (line {line})")]
    FieldIndex {
        index: usize,
        count: usize,
        line: u64,
    },

    /// Typed parse invoked on a value that does not match the target format.
    #[error("cannot parse field as {target} (line {line})")]
    Parse { target: &'static str, line: u64 },

    /// Row field count does not match `expected_columns`.
    #[error("line {line}: expected {expected} columns, found {actual}")]
    ColumnCount {
        line: u64,
        expected: usize,
        actual: usize,
    },

    /// Invalid option combination rejected at construction.
    #[error("invalid options: {0}")]
    Options(String),
}
