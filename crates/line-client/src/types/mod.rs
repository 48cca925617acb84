//! Wire types for the LINE Messaging API.

pub mod message;
pub mod webhook;

pub use message::*;
pub use webhook::*;
