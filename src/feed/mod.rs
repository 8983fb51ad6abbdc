//! Change Feed Module
//!
//! Reads the shared record feed (a JSON document in the bucket) without downloading it when
//! nothing changed.
//!
//! ## Submodules
//! - **`types`**: `CandidateItem`, the document shape, fetch results and summary stats.
//! - **`client`**: `ChangeFeedClient`, the metadata-first conditional fetch.
//! - **`topics`**: The topic selection object the producer reads.

pub mod client;
pub mod topics;
pub mod types;

pub use client::ChangeFeedClient;
pub use topics::TopicsClient;
pub use types::{CandidateItem, ChangeFeedDocument, FeedFetch, ItemStats};

#[cfg(test)]
mod tests;
