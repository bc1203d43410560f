//! Errors raised by the shared host utilities

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad log filter or other user-supplied setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// Global subscriber could not be installed
    #[error("Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
