//! # Dalil Support
//!
//! Shared utilities and traits for the Dalil service locator.
//!
//! This crate provides:
//! - The [`Logger`](logging::Logger) contract the locator reports through
//! - Text rendering for error messages

pub mod logging;
pub mod rendering;

pub use logging::{Level, Logger, MemoryLogger, NullLogger, TracingLogger};
