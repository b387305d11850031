//! Shared helpers for the cvforge integration tests.
//!
//! `harness` owns the temporary workspace; `builders` produces source
//! documents and scripted collaborators.

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{ProgressLog, TestHarness};
