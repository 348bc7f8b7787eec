//! Route handlers for the HTTP API.

pub mod catalog;
pub mod health;
pub mod labels;
pub mod streaming_helpers;
pub mod token;
pub mod video;
