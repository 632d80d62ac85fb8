//! Shared error plumbing used across the catalyst crates.

pub mod error;

pub use error::{Error, FromMessage, Result};
