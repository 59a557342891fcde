//! Multi-dimension artifact scoring.
//!
//! Exactly five fixed dimensions (Scoping, Training, Analysis, Reliability,
//! Excellence), each with five fixed textual criteria and a fixed
//! recommendation list. An evaluation runs a dimension-specific five-step
//! script through the reasoner and scores the resulting analysis text with
//! a pluggable [`ScoringStrategy`]. The default [`KeywordOverlap`] counts a
//! criterion as satisfied when more than half of its word tokens appear in
//! the analysis, so per-dimension scores are always multiples of 20.
//!
//! The scores, and the production-readiness interpretation built on them,
//! are a keyword-matching heuristic over free-form text, not a certified
//! quality measure. Treat "production ready" accordingly.

pub mod scorer;
pub mod strategy;

pub use scorer::{Dimension, DimensionStatus, Scorer};
pub use strategy::{KeywordOverlap, ScoringStrategy};
