//! Integration test crate for the Turf conquest core.
//!
//! This crate has no library code — it only contains integration tests
//! that exercise end-to-end conquest flows across multiple workspace
//! crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p turf-integration-tests
//! ```
