//! Glass timeline client library.
//!
//! Client-side state machine for the Glass backend: uploads with optimistic
//! placeholders, status polling with backoff, and daily report retrieval and
//! editing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
