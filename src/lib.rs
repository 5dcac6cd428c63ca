//! Seven-stage book-generation pipeline engine.
//!
//! The crate turns a structured outline into a composite document by driving
//! a fixed pipeline of drafting, enhancement, formatting, fact-checking,
//! validation and indexing stages over a priority task queue with bounded
//! concurrency and retry.

pub mod agents;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod errors;
pub mod utils;
