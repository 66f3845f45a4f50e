//! Core business logic for campus-rs.

pub mod services;

pub use services::*;

/// Generate a unique ID using ULID.
#[must_use]
pub fn generate_id() -> String {
    campus_common::IdGenerator::new().generate()
}
