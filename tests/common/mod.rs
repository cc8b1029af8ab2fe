//! Common test utilities for cfbridge.
//!
//! Fixture files are built in memory so the integration tests run without the
//! NetCDF library.

#![allow(dead_code)]

pub mod assertions;
pub mod test_data;
