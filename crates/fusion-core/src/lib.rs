//! fusion-core - Core types and traits for hybrid result fusion
//!
//! This crate provides the domain types, configuration, provider traits and
//! error handling shared by the fusion engine and its front ends.

pub mod config;
pub mod error;
pub mod record;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{FusionError, Result};
pub use record::parse_records;
pub use traits::*;
pub use types::*;
