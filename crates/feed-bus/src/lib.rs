//! # Feed Bus - Event Distribution Layer
//!
//! Decouples the single inbound real-time feed from any number of
//! independently attaching consumers.
//!
//! ## Flow
//!
//! ```text
//!   inbound frame
//!        │
//!        ▼
//! ┌──────────────┐  decode   ┌─────────────────┐
//! │   FeedHub    │ ────────► │ LatestValueCache│ ◄── latest()
//! │              │           └─────────────────┘
//! │              │  append   ┌─────────────────┐
//! │              │ ────────► │   MessageLog    │ ◄── messages()
//! │              │           └─────────────────┘
//! │              │  deliver  ┌─────────────────┐
//! │              │ ────────► │  subscribers    │ (registration order)
//! └──────────────┘           └─────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - A subscriber sees every envelope of its kind arriving after it
//!   registered, in arrival order, and none from before.
//! - `latest(kind)` is always the most recent envelope of that kind.
//! - A malformed frame degrades to an opaque or raw form; it never stops
//!   the next frame from being processed.
//! - A failing subscriber never prevents delivery to the others.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod cache;
pub mod decode;
pub mod errors;
pub mod events;
pub mod hub;
pub mod log;
pub mod subscriber;

// Re-export main types
pub use decode::{decode, RawMessage};
pub use errors::{DecodeError, DeliveryFailure, DeliveryReport, HandlerError};
pub use events::{EventKind, FeedEvent, OpaqueBody, OpaquePayload, PacketPayload};
pub use hub::{EnvelopeSink, FeedHub};
pub use log::LoggedEnvelope;
pub use subscriber::{EventStream, Subscription, SubscriptionId, Topic};
