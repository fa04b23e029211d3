//! # Lingo Common Library
//!
//! Shared code for the sentence trainer:
//! - Supported languages and target selection
//! - Database initialization and row models
//! - Bootstrap configuration file loading
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod lang;

pub use error::{Error, Result};
pub use lang::Language;
