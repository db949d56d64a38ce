//! Core types and trait definitions for the Quill blog engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod comment;
pub mod error;
pub mod identity;
pub mod post;
pub mod slug;
pub mod store;

pub use error::{Error, Result};
