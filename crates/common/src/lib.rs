//! Common utilities for usb-devctl
//!
//! This crate provides functionality shared by the host tools and the test
//! suites: logging setup, error handling, and in-memory interface fixtures
//! for exercising the device dispatcher without hardware.

pub mod error;
pub mod logging;
pub mod memory;
pub mod test_utils;

pub use error::{Error, Result};
pub use logging::{build_filter, setup_logging};
