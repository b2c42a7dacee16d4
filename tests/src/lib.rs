//! # NetWatch Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── distribution.rs  # Several dashboard consumers on one hub
//! │   └── end_to_end.rs    # Mock server -> FeedContext over loopback
//! └── benches/
//!     └── dispatch_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p netwatch-tests
//! cargo test -p netwatch-tests integration::end_to_end
//! cargo bench -p netwatch-tests
//! ```

pub mod integration;
