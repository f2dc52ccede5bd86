//! Signalboard: prediction acquisition and signal orchestration
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod services;
pub mod engine;
pub mod dashboard;
