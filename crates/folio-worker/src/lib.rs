//! Background derivative generation.
//!
//! Handlers submit the relative path of a freshly stored original and return
//! immediately; a bounded worker pool runs generation through a
//! [`DerivativeJobContext`] supplied by the API.

pub mod context;
pub mod queue;

pub use context::DerivativeJobContext;
pub use queue::{DerivativeQueue, DerivativeQueueConfig, JobFinishedSender, JobOutcome};
