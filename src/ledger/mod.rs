//! Idempotency Ledger Module
//!
//! Second line of defense behind the lease: even if two instances briefly process the same
//! batch, each one acts on a given item at most once, across restarts.
//!
//! The ledger is private to its instance. It is never shared through the bucket.

pub mod idempotency;

pub use idempotency::IdempotencyLedger;

#[cfg(test)]
mod tests;
