//! # toolpath-core
//!
//! Core crate for the toolpath generator. Contains the configuration
//! schemas and the unified error system shared by the generator plugin
//! and the command-line front end.
//!
//! This crate has **no** internal dependencies on other toolpath crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
