//! # Mockchain Test Suite
//!
//! Unified test crate for behavior that spans crates.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── fixtures.rs   # In-process mockchain harness
//! │   ├── flows.rs      # Ledger → indexer → bus scenarios
//! │   └── streaming.rs  # Replay-then-live, SSE and WebSocket reconnects, message streams
//! └── benches/          # criterion benchmarks
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mc-tests
//! cargo test -p mc-tests integration::streaming::
//! cargo bench -p mc-tests
//! ```

pub mod integration;
