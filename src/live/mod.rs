//! # Live Meeting Engine
//!
//! In-memory engine behind the realtime meeting copilot: deduplication,
//! insight extraction, summary derivation, and the per-meeting state
//! manager that ties them together. Everything here is synchronous
//! in-memory computation; all I/O lives at the WebSocket boundary.

pub mod dedup;
pub mod extractor;
pub mod manager;
pub mod summary;

pub use manager::StateManager;
