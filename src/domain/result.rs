//! Result type alias for Veil operations

use super::errors::VeilError;

/// Standard result type used throughout the library
pub type Result<T> = std::result::Result<T, VeilError>;
