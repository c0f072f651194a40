//! End-to-end tests for the external processor.
//!
//! Streams are driven in memory through `ExtProcService::open_stream`, so no
//! proxy or network listener is needed.

pub mod common;
pub mod config_test;
pub mod headers_test;
