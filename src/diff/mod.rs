//! Diff retrieval, parsing and sanitization.

pub mod parser;
pub mod sanitize;
pub mod source;

pub use parser::{ChangeType, ParsedDiff, parse, parse_bytes};
pub use sanitize::sanitize_line;
pub use source::{ChangedFile, DiffSource, FileStatus, GitDiffSource};
