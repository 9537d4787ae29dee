//! Lightweight newline-delimited JSON framer
//!
//! Provides a streaming line parser for event bodies that carry one JSON
//! object per line. The parser accumulates bytes and yields complete lines,
//! leaving JSON decoding to the caller.
//!
//! This crate has minimal dependencies (only `tracing` for warnings on
//! invalid UTF-8) so it can be shared without pulling in an HTTP stack.

mod parser;

pub use parser::LineParser;
