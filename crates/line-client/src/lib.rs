//! LINE Messaging API and LINE Login client library.
//!
//! This crate provides a Rust client for the parts of LINE the reservation
//! service talks to:
//!
//! - Pushing and replying with text and flex messages
//! - Parsing and verifying webhook deliveries
//! - The LINE Login authorization-code flow
//!
//! # Example
//!
//! ```no_run
//! use line_client::{LineClient, LineConfig, Message};
//!
//! # async fn example() -> Result<(), line_client::LineError> {
//! let config = LineConfig::new("channel-access-token", "channel-secret");
//! let client = LineClient::new(config)?;
//!
//! client.push("U4af4980629...", &[Message::text("Hello!")]).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod login;
pub mod signature;
pub mod types;

pub use client::LineClient;
pub use config::LineConfig;
pub use error::LineError;
pub use login::{AuthorizationRequest, LoginClient, LoginConfig, LoginProfile};
pub use signature::{verify_signature, SIGNATURE_HEADER};
pub use types::*;
