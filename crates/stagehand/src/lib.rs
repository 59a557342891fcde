//! Orchestration core for staged, LLM-assisted delivery pipelines.
//!
//! `stagehand` provides the machinery that sits between a caller and an
//! external reasoning service: a bounded short-term memory, a sequential
//! reasoning executor built on it, a five-stage pipeline state machine with
//! unconditional halt-on-failure, a test-gated feature acceptance loop, and
//! a multi-dimension artifact scorer. Everything outside that core
//! (transport, UI, content templates) is the embedder's concern.
//!
//! # Getting started
//!
//! ```ignore
//! use stagehand::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let service = HttpReasoningService::new("https://inference.example/v1/complete")?;
//!     let mut reasoner = SequentialReasoner::new(service, ContextStoreConfig::default());
//!
//!     let mut gate = FeatureGate::new("artifacts")?;
//!     let mut pipelines = PipelineExecutor::new();
//!     let id = pipelines.create_pipeline(
//!         "churn-model",
//!         default_stage_configs(),
//!         stage_expectations(),
//!         &mut gate,
//!     )?;
//!     pipelines.run(&id, &mut reasoner).await?;
//!
//!     let mut scorer = Scorer::new();
//!     scorer.evaluate(&mut reasoner, "Reliability", &artifact).await?;
//!     println!("{} ({:.0})", scorer.interpretation(), scorer.overall_score());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`context`] | [`ContextStore`](context::ContextStore): fixed set of prioritized windows, token caps, rebalancing, relevance lookup |
//! | [`reasoning`] | [`ReasoningService`](reasoning::ReasoningService) seam, retry decorator, [`SequentialReasoner`](reasoning::SequentialReasoner) |
//! | [`pipeline`] | Five-stage pipeline state machine driven through the reasoner |
//! | [`gate`] | Test-first feature acceptance and checked, bounded deployments |
//! | [`scoring`] | Five fixed rubric dimensions scored by a pluggable strategy |
//! | [`telemetry`] | Opt-in `tracing` subscriber bootstrap for embedders |
//!
//! # Design principles
//!
//! 1. **Sequential by construction.** Steps, stages, and evaluations run
//!    strictly in order; a step's context side effects are applied before
//!    the next step begins. Nothing in this crate spawns concurrent work.
//!
//! 2. **Nothing is retried implicitly.** External failures propagate to the
//!    immediate caller or land in a status field. Retry exists only as an
//!    explicit decorator ([`reasoning::Retrying`]) that call sites opt into.
//!
//! 3. **Owned lifecycles, no ambient state.** Every component is constructed
//!    with `new(config)` and passed by handle. There are no module-level
//!    registries.
//!
//! 4. **Context is a bounded resource.** The window set has a fixed size and
//!    a per-window token cap; pressure is relieved by compression and by a
//!    priority-ordered rebalance pass, never by growing the set.

pub mod context;
pub mod gate;
pub mod pipeline;
pub mod prelude;
pub mod reasoning;
pub mod scoring;
pub mod telemetry;

/// Milliseconds since the Unix epoch, used for window timestamps.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
