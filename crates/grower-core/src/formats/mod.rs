//! # Formats Module
//!
//! Byte-level encodings of a State. File I/O stays in the app layer.

mod snapshot;

pub use snapshot::*;
