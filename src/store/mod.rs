//! Shared Object Store Module
//!
//! The bucket that every client instance reads from and writes to is the system of record.
//! The coordination layer only ever talks to it through the `ObjectStore` trait.
//!
//! ## Adapters
//! - **`memory`**: In-process store with atomic conditional create and delete. Used by tests and demos.
//! - **`http`**: Google Cloud Storage JSON API over `reqwest`.
//!
//! "Not found" is modelled as `None` by every adapter, never as an error.

pub mod http;
pub mod memory;
pub mod types;

pub use types::{ObjectMetadata, ObjectStore};

#[cfg(test)]
mod tests;
