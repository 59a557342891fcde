//! Five-stage pipeline state machine.
//!
//! A pipeline moves `paused → running → {completed | failed}`; its stages
//! move `pending → running → {completed | failed}`. Stage *i+1* only enters
//! `running` after stage *i* completes, and any stage failure fails the
//! whole pipeline unconditionally; later stages stay `pending` forever, no
//! retry, no rollback of completed stages.
//!
//! Each stage type executes a fixed five-substep script through the
//! [`SequentialReasoner`](crate::reasoning::SequentialReasoner); completed
//! stage outputs accumulate and travel into subsequent stages as extra
//! context. Creating a pipeline requires one expectation
//! [`TestCase`](crate::gate::TestCase) per stage, registered through the
//! [`FeatureGate`](crate::gate::FeatureGate) before the pipeline exists.

pub mod executor;
pub mod stage;

pub use executor::{Pipeline, PipelineExecutor, PipelineStatus};
pub use stage::{PipelineStage, STAGE_ORDER, StageStatus, StageType};
