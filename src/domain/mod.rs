//! Core domain types and models
//!
//! Error taxonomy, result alias and the closed data-type/mode enumerations
//! shared by every subsystem.

pub mod errors;
pub mod result;
pub mod types;

pub use errors::VeilError;
pub use result::Result;
pub use types::{DataType, MappingEntry, Mode};
