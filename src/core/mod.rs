// Core parsing primitives.

pub mod lines;
pub mod scanner;
pub mod unquote;

pub use lines::{LineExtractor, LineHome, Scan};
pub use scanner::{backend, Backend, Structural};
