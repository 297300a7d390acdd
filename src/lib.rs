//! Streaming CSV parsing engine with zero-copy field access.
//!
//! Built for pulling rows out of arbitrarily large inputs with a bounded
//! memory footprint: one read buffer, one decoded-text buffer, and a
//! carry-over for lines that span refills, all recycled through a
//! process-wide pool. Rows and fields are borrowed views into those buffers;
//! nothing is copied until a caller explicitly asks for an owned value.
//!
//! The hot structural scan (delimiters and line endings) dispatches to AVX2
//! or SSE2 kernels on x86-64, selected once per process at runtime, with a
//! byte-wise fallback everywhere else. Quote-aware scanning stays scalar
//! because quote state is inherently sequential.
//!
//! ```no_run
//! use streamcsv::{Options, Reader};
//!
//! # fn main() -> streamcsv::Result<()> {
//! let mut reader = Reader::from_path("prices.csv", Options::new())?;
//! while let Some(row) = reader.next_row()? {
//!     let symbol = row.field(0)?;
//!     let price = row.field(1)?.to_decimal()?;
//!     println!("{} {}", symbol.as_str(), price);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Input encoding is resolved from a byte-order mark when the stream is
//! seekable (UTF-8, UTF-16 LE/BE, UTF-32 LE/BE), from [`Options::encoding`]
//! otherwise, defaulting to UTF-8. Legacy single-byte encodings plug in via
//! the [`LegacyDecoder`] trait.

pub mod core;
mod encoding;
mod error;
mod field;
mod options;
mod pool;
mod reader;
mod row;
pub mod value;

pub use crate::core::scanner::{backend, Backend};
pub use crate::encoding::{detect_bom, Encoding, LegacyDecoder};
pub use crate::error::{Error, Result};
pub use crate::field::Field;
pub use crate::options::{Options, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_LINE_LENGTH};
pub use crate::reader::Reader;
pub use crate::row::{Row, RowIter};
pub use crate::value::{Date, DateTime, Guid, Time};
