//! Intent-detection client.
//!
//! The public surface is two operations: [`Client::connect`] and
//! [`Client::detect_intent`]. [`ClientBuilder`] is a convenience over
//! [`ClientConfig`](crate::ClientConfig).

pub mod builder;
pub mod core;

pub use builder::ClientBuilder;
pub use core::Client;
