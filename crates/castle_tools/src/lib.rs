//! # Castle Tools
//!
//! Command-line support for the scheduler:
//! - RON catalog and scenario loading
//! - Catalog validation
//! - Schedule rendering

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod loader;
pub mod output;
pub mod validate;
