//! Core types and trait definitions for rankwatch.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod entity;
pub mod error;
pub mod fact;
pub mod notification;
pub mod store;
pub mod validate;
pub mod view;

pub use error::{Error, ErrorKind, Resource, Result};
