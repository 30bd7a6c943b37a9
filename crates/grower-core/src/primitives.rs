//! # Innate Primitives
//!
//! Hardcoded constants for the Grower reducer and its reference driver.
//!
//! The reducer has fixed logic; these values are compiled into the binary and
//! are immutable at runtime. Drivers may choose tighter budgets.

/// Magic bytes for the Grower snapshot header.
///
/// - Snapshot = Magic Bytes ("GROW") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"GROW";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot encoding.
pub const FORMAT_VERSION: u8 = 1;

/// Length of the snapshot header in bytes.
pub const HEADER_LEN: usize = 5;

/// Default cap on successful ticks in one run.
///
/// A handler set that keeps re-triggering itself never reaches a fixed point;
/// this bounds the run.
pub const DEFAULT_MAX_TICKS: u64 = 10_000;

/// Default cap on consecutive failures of the same tick.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Maximum snapshot size accepted by the decoder (64 MB).
///
/// Checked BEFORE payload decoding to prevent allocation-based DoS.
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;
