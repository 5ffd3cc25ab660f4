//! # Rules Development Tools
//!
//! Command-line tools for content authors:
//! - Manifest validation with quarantine reporting
//! - Tenant offset listing
//! - Single reference resolution

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod inspect;
pub mod report;
pub mod validate;

pub use error::{Result, ToolError};
