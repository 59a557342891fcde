//! Reasoning layer: the external-service seam, an explicit retry decorator,
//! and the sequential step executor.
//!
//! - [`service`]: the [`ReasoningService`] trait plus the HTTP
//!   implementation and [`FnService`] for closure-backed services.
//! - [`retry`]: [`RetryConfig`] and the [`Retrying`] decorator. Retry is
//!   never implicit; call sites wrap their service when they want it.
//! - [`executor`]: [`SequentialReasoner`], the sole mechanism other
//!   components use to obtain analysis text. Runs steps strictly in order
//!   against the service, recalling from and writing back to the context
//!   store between steps.

pub mod executor;
pub mod retry;
pub mod service;

pub use executor::{ReasoningRun, ReasoningStep, SequentialReasoner};
pub use retry::{RetryConfig, Retrying};
pub use service::{CompletionFuture, FnService, HttpReasoningService, ReasoningService};
