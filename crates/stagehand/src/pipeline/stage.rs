//! Stage types, statuses, and their fixed substep scripts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The five stage types, in execution order.
pub const STAGE_ORDER: [StageType; 5] = [
    StageType::Data,
    StageType::Feature,
    StageType::Training,
    StageType::Evaluation,
    StageType::Deployment,
];

/// Type of a pipeline stage. Each maps to a fixed five-substep script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageType {
    Data,
    Feature,
    Training,
    Evaluation,
    Deployment,
}

impl StageType {
    pub fn name(&self) -> &'static str {
        match self {
            StageType::Data => "data",
            StageType::Feature => "feature",
            StageType::Training => "training",
            StageType::Evaluation => "evaluation",
            StageType::Deployment => "deployment",
        }
    }

    /// The fixed substep script executed through the reasoner.
    pub fn script(&self) -> [&'static str; 5] {
        match self {
            StageType::Data => [
                "load the raw dataset from the configured source",
                "validate schema and value ranges",
                "handle missing and malformed records",
                "transform and normalize fields",
                "save the prepared dataset",
            ],
            StageType::Feature => [
                "select candidate input columns",
                "derive engineered features",
                "encode categorical values",
                "scale numeric features",
                "persist the feature matrix",
            ],
            StageType::Training => [
                "initialize the model from the stage config",
                "split data into train and holdout sets",
                "fit the model on the training split",
                "tune hyperparameters against the holdout",
                "checkpoint the trained model",
            ],
            StageType::Evaluation => [
                "load the trained model checkpoint",
                "generate predictions on the evaluation set",
                "compute accuracy and error metrics",
                "compare metrics against baseline thresholds",
                "write the evaluation report",
            ],
            StageType::Deployment => [
                "package the model artifact",
                "provision the target environment",
                "roll out the packaged artifact",
                "run post-rollout smoke checks",
                "enable monitoring and alerts",
            ],
        }
    }
}

/// Lifecycle of one stage. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One stage of a pipeline. Created with the pipeline, mutated only by the
/// executor driving it, never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStage {
    pub name: String,
    pub stage_type: StageType,
    pub config: Value,
    pub status: StageStatus,
    pub duration_ms: Option<u64>,
    pub output: Option<Value>,
}

impl PipelineStage {
    pub(crate) fn new(stage_type: StageType, config: Value) -> Self {
        Self {
            name: format!("{}-stage", stage_type.name()),
            stage_type,
            config,
            status: StageStatus::Pending,
            duration_ms: None,
            output: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_type_has_a_five_substep_script() {
        for stage_type in STAGE_ORDER {
            assert_eq!(stage_type.script().len(), 5);
        }
    }

    #[test]
    fn stage_order_is_data_to_deployment() {
        assert_eq!(STAGE_ORDER[0], StageType::Data);
        assert_eq!(STAGE_ORDER[4], StageType::Deployment);
    }

    #[test]
    fn new_stage_starts_pending() {
        let stage = PipelineStage::new(StageType::Training, serde_json::json!({"epochs": 3}));
        assert_eq!(stage.status, StageStatus::Pending);
        assert_eq!(stage.name, "training-stage");
        assert!(stage.output.is_none());
    }
}
