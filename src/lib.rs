//! HYPERION-VOLUME — alternating two-token swap loop on Aptos.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod chain;
pub mod config;
pub mod engine;
pub mod logging;
pub mod strategy;
pub mod types;
