//! I/O utilities for QA-RS.
//!
//! Provides text file reading with memory mapping support for large
//! context passages.

pub mod reader;

pub use reader::{MMAP_THRESHOLD, TextFile, read_text};
