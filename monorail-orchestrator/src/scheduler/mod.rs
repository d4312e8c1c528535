//! Scheduler Module
//!
//! Run queues and the change event dispatcher that feeds them.

pub mod dispatcher;
pub mod queue;

pub use dispatcher::Dispatcher;
pub use queue::{DEFAULT_QUEUE_CAPACITY, RunQueue};
