//! # gridkit parallel
//!
//! Execution strategies for grid runs.
//!
//! This crate provides:
//! - Row-parallel processing using Rayon (sequential fallback without the
//!   `parallel` feature)
//! - Cooperative cancellation polled between rows

pub mod cancel;
pub mod strategy;

pub use cancel::CancelToken;
pub use strategy::{num_threads, ParallelStrategy, ProcessingMode};
