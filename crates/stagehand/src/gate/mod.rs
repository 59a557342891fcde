//! Test-gated delivery: feature acceptance and deployment.
//!
//! - [`features`]: the test-first loop. A feature's test specification must
//!   exist **before** an implementation is accepted; acceptance is gated on
//!   a passing external test-suite run.
//! - [`deploy`]: pre-deployment checks (tests, lint, dependency audit), a
//!   deploy subprocess bounded by a hard timeout, an optional health check,
//!   optional rollback, and an append-only deployment history.
//!
//! Both halves invoke their collaborators as child processes and judge them
//! solely by exit code (the dependency audit uniquely also accepts exit 1).

pub mod deploy;
pub mod features;

pub use deploy::{DeployConfig, DeployStatus, Deployer, DeploymentRecord};
pub use features::{FeatureGate, TestCase, TestStatus};
