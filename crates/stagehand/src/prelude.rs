//! Convenience re-exports for the common surface.
//!
//! `use stagehand::prelude::*;` pulls in the types needed to stand up a
//! reasoner, run pipelines, gate features, and score the results.

pub use crate::context::{ContextReport, ContextSnapshot, ContextStore, ContextStoreConfig};
pub use crate::gate::{DeployConfig, DeployStatus, Deployer, FeatureGate, TestCase, TestStatus};
pub use crate::pipeline::{Pipeline, PipelineExecutor, PipelineStatus, StageStatus, StageType};
pub use crate::reasoning::{
    FnService, HttpReasoningService, ReasoningService, RetryConfig, Retrying, SequentialReasoner,
};
pub use crate::scoring::{Dimension, KeywordOverlap, Scorer, ScoringStrategy};
