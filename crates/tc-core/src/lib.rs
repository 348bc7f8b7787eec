//! tc-core: shared error type and application configuration.
//!
//! Every other tc-* crate funnels failures into [`Error`] and reads its
//! settings from [`config::Config`].

pub mod config;
pub mod error;

pub use error::{Error, Result};
