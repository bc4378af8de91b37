//! Execution resources.
//!
//! This module contains the resources that bound execution concurrency:
//! the functional unit pool and the stream prefetch engine.

/// Functional unit pool.
pub mod fu_pool;

/// Stream prefetch engine.
pub mod stream;
