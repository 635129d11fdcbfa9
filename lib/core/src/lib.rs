//! Core types shared across the KCLoft front end crates.
//!
//! This crate provides the `Result` alias used for layered error reporting
//! and the strongly-typed identifiers used to correlate log output for
//! outbound API requests and route transitions.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{NavigationId, ParseIdError, RequestId};
