//! HTTP API layer for campus-rs.
//!
//! This crate provides the REST API for community chat:
//!
//! - **Endpoints**: community feeds, direct conversations, member summaries
//! - **Extractors**: authentication
//! - **Middleware**: application state, token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

// Allow dead_code for API compatibility fields in request structs
#![allow(dead_code)]

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
