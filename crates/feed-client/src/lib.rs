//! # Feed Client
//!
//! WebSocket transport for the NetWatch feed and the [`FeedContext`] that
//! owns its lifecycle.
//!
//! ```rust,ignore
//! use feed_client::{FeedConfig, FeedContext};
//!
//! let ctx = FeedContext::new(FeedConfig::from_env());
//! let _sub = ctx.hub().subscribe("packet_update", |event| {
//!     println!("{}", event.summary());
//!     Ok(())
//! });
//! ctx.connect_default()?;
//! ```
//!
//! There is no automatic reconnection. After an error the caller decides
//! whether to `connect` again.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod context;
pub mod errors;
pub mod status;
mod transport;

pub use config::{validate_endpoint, FeedConfig};
pub use context::{ConnectionHandle, FeedContext, Outbound};
pub use errors::{ConnectionError, FeedError, SendOutcome, SendRejected};
pub use status::ConnectionStatus;
