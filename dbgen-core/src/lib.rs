//! dbgen Core Library
//!
//! This crate provides the pieces shared by every stage of the dbgen
//! schema compiler: source positions, the resolved intermediate
//! representation (IR), generator configuration, and error handling.

pub mod config;
pub mod error;
pub mod ir;
pub mod position;

pub use error::{Error, Result};
pub use position::Position;

/// dbgen version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
