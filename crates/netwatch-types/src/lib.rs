//! # NetWatch Types Crate
//!
//! Payload shapes carried by the NetWatch real-time feed.
//!
//! ## Design Principles
//!
//! - **Lenient decoding**: feed producers are loosely typed. Numeric fields
//!   may arrive as numbers or strings, ids and timestamps as either, counters
//!   as floats or `null`, and any field may be missing. Every
//!   payload struct defaults missing fields instead of rejecting the record.
//! - **Nothing is dropped**: fields this crate does not model are kept in an
//!   `extra` map so consumers can still render them.
//! - **No I/O**: this crate only describes data. Decoding raw frames lives in
//!   `feed-bus`.

pub mod entities;
mod lenient;
pub mod metrics;

pub use entities::*;
pub use metrics::PacketMetrics;
