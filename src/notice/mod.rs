// src/notice/mod.rs
mod sink;

pub use sink::{DiagnosticRecord, MemorySink, Notice, NoticeSink, TracingSink};
