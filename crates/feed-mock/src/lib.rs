//! # Feed Mock
//!
//! Sample-data generators and a WebSocket server that imitates the capture
//! backend, for local development and end-to-end tests.
//!
//! ```rust,ignore
//! let server = MockFeedServer::bind(MockServerConfig::default()).await?.spawn()?;
//! println!("feed at {}", server.url());
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod generators;
pub mod server;

pub use config::MockServerConfig;
pub use server::{MockFeedServer, MockServerHandle};

use std::net::SocketAddr;
use thiserror::Error;

/// Mock server errors
#[derive(Error, Debug)]
pub enum MockError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
