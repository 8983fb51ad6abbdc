//! Action Module
//!
//! The side effect a client performs for each new item (posting the reply). The coordination
//! layer only needs to know whether it worked; how it is done is up to the executor.

pub mod dry_run;
pub mod types;
pub mod webhook;

pub use dry_run::DryRunExecutor;
pub use types::{ActionExecutor, ActionReport};
pub use webhook::WebhookExecutor;
