//! Bluesky (AT Protocol) posting client
//!
//! Covers session creation, blob upload and post record creation against a
//! personal data server's XRPC endpoints.

pub mod client;
pub mod models;

pub use client::BlueskyClient;
pub use models::*;
