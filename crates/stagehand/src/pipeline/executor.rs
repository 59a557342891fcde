//! Pipeline creation and strictly ordered stage execution.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::gate::{FeatureGate, TestCase};
use crate::reasoning::{ReasoningService, SequentialReasoner};

use super::stage::{PipelineStage, STAGE_ORDER, StageStatus};

/// Lifecycle of a pipeline. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Paused,
    Running,
    Completed,
    Failed,
}

/// One training/evaluation run: five ordered stages and a cursor.
#[derive(Debug, Clone, Serialize)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    pub stages: Vec<PipelineStage>,
    pub current_stage_index: usize,
    pub status: PipelineStatus,
}

/// Owns every pipeline created through it for the process lifetime. There
/// is no garbage collection; completed and failed pipelines stay inspectable.
#[derive(Default)]
pub struct PipelineExecutor {
    pipelines: HashMap<String, Pipeline>,
    counter: u64,
}

impl PipelineExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline with all five stages pending.
    ///
    /// Requires one stage config and one expectation [`TestCase`] per stage;
    /// the expectations are registered through the gate's tests-first
    /// protocol (keyed by the pipeline name) before the pipeline exists.
    pub fn create_pipeline(
        &mut self,
        name: &str,
        stage_configs: Vec<Value>,
        stage_expectations: Vec<TestCase>,
        gate: &mut FeatureGate,
    ) -> Result<String, String> {
        let want = STAGE_ORDER.len();
        if stage_configs.len() != want {
            return Err(format!(
                "pipeline '{name}' needs {want} stage configs, got {}",
                stage_configs.len(),
            ));
        }
        if stage_expectations.len() != want {
            return Err(format!(
                "pipeline '{name}' needs one expectation test case per stage ({want}), got {}",
                stage_expectations.len(),
            ));
        }

        gate.create_tests_first(name, stage_expectations)?;

        self.counter += 1;
        let id = format!("pipeline-{}", self.counter);
        let stages = STAGE_ORDER
            .into_iter()
            .zip(stage_configs)
            .map(|(stage_type, config)| PipelineStage::new(stage_type, config))
            .collect();

        info!("pipeline {id} ('{name}') created with {want} stages");
        self.pipelines.insert(
            id.clone(),
            Pipeline {
                id: id.clone(),
                name: name.to_string(),
                stages,
                current_stage_index: 0,
                status: PipelineStatus::Paused,
            },
        );
        Ok(id)
    }

    /// Execute the pipeline's stages strictly in order.
    ///
    /// Stage *i+1* starts only after stage *i* completes. On any error the
    /// current stage and the pipeline transition to `Failed`, later stages
    /// stay `Pending` forever, and the error propagates. Completed stage
    /// outputs accumulate and are passed as extra context into subsequent
    /// stages.
    pub async fn run<S: ReasoningService>(
        &mut self,
        pipeline_id: &str,
        reasoner: &mut SequentialReasoner<S>,
    ) -> Result<(), String> {
        let pipeline = self
            .pipelines
            .get_mut(pipeline_id)
            .ok_or_else(|| format!("unknown pipeline id '{pipeline_id}'"))?;

        pipeline.status = PipelineStatus::Running;
        let mut results: Vec<Value> = Vec::new();

        for index in 0..pipeline.stages.len() {
            pipeline.current_stage_index = index;
            let (stage_name, problem, steps) = {
                let stage = &mut pipeline.stages[index];
                stage.status = StageStatus::Running;
                let problem = stage_problem(&pipeline.name, stage, &results);
                let steps: Vec<String> =
                    stage.stage_type.script().iter().map(|s| (*s).to_string()).collect();
                (stage.name.clone(), problem, steps)
            };

            debug!("pipeline {pipeline_id}: entering stage '{stage_name}'");
            let started = Instant::now();

            match reasoner.run(&problem, &steps).await {
                Ok(run) => {
                    let output = json!({
                        "stage": stage_name,
                        "steps": run
                            .steps
                            .iter()
                            .map(|s| json!({"description": s.description, "output": s.output}))
                            .collect::<Vec<Value>>(),
                    });
                    let stage = &mut pipeline.stages[index];
                    stage.duration_ms = Some(started.elapsed().as_millis() as u64);
                    stage.output = Some(output.clone());
                    stage.status = StageStatus::Completed;
                    results.push(output);
                }
                Err(e) => {
                    // Unconditional halt: no further stage is entered and
                    // completed stages are left as they are.
                    pipeline.stages[index].status = StageStatus::Failed;
                    pipeline.status = PipelineStatus::Failed;
                    warn!("pipeline {pipeline_id}: stage '{stage_name}' failed: {e}");
                    return Err(format!("stage '{stage_name}' failed: {e}"));
                }
            }
        }

        pipeline.status = PipelineStatus::Completed;
        info!("pipeline {pipeline_id}: all stages completed");
        Ok(())
    }

    pub fn pipeline(&self, pipeline_id: &str) -> Option<&Pipeline> {
        self.pipelines.get(pipeline_id)
    }

    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.values()
    }
}

/// The problem statement handed to the reasoner for one stage.
fn stage_problem(pipeline_name: &str, stage: &PipelineStage, results: &[Value]) -> String {
    let mut problem = format!(
        "Execute the {} stage of pipeline '{pipeline_name}'.\nStage config: {}",
        stage.stage_type.name(),
        stage.config,
    );
    if !results.is_empty() {
        problem.push_str(&format!(
            "\nCompleted stage outputs: {}",
            Value::Array(results.to_vec()),
        ));
    }
    problem
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextStoreConfig;
    use crate::gate::TestStatus;
    use crate::reasoning::FnService;
    use serde_json::json;

    fn expectations() -> Vec<TestCase> {
        STAGE_ORDER
            .iter()
            .map(|t| {
                TestCase::new(
                    format!("{}-done", t.name()),
                    format!("{} stage reports completed", t.name()),
                    json!({}),
                    json!({"status": "completed"}),
                )
            })
            .collect()
    }

    fn configs() -> Vec<Value> {
        STAGE_ORDER.iter().map(|t| json!({"stage": t.name()})).collect()
    }

    fn reasoner_ok() -> SequentialReasoner<FnService<impl Fn(&str) -> Result<String, String>>> {
        SequentialReasoner::new(
            FnService::new(|_: &str| Ok("substep completed".to_string())),
            ContextStoreConfig::default(),
        )
    }

    #[tokio::test]
    async fn full_run_completes_every_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = FeatureGate::new(dir.path()).unwrap();
        let mut executor = PipelineExecutor::new();
        let id = executor
            .create_pipeline("churn-model", configs(), expectations(), &mut gate)
            .unwrap();

        assert_eq!(executor.pipeline(&id).unwrap().status, PipelineStatus::Paused);

        let mut reasoner = reasoner_ok();
        executor.run(&id, &mut reasoner).await.unwrap();

        let pipeline = executor.pipeline(&id).unwrap();
        assert_eq!(pipeline.status, PipelineStatus::Completed);
        assert!(pipeline.stages.iter().all(|s| s.status == StageStatus::Completed));
        assert!(pipeline.stages.iter().all(|s| s.output.is_some()));
        assert_eq!(pipeline.current_stage_index, 4);
    }

    #[tokio::test]
    async fn stage_failure_halts_and_leaves_later_stages_pending() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = FeatureGate::new(dir.path()).unwrap();
        let mut executor = PipelineExecutor::new();
        let id = executor
            .create_pipeline("churn-model", configs(), expectations(), &mut gate)
            .unwrap();

        // Fails as soon as it is asked about the training stage.
        let service = FnService::new(|prompt: &str| {
            if prompt.contains("the training stage") {
                Err("reasoning service HTTP 500: boom".to_string())
            } else {
                Ok("substep completed".to_string())
            }
        });
        let mut reasoner = SequentialReasoner::new(service, ContextStoreConfig::default());

        let err = executor.run(&id, &mut reasoner).await.unwrap_err();
        assert!(err.contains("training-stage"));

        let pipeline = executor.pipeline(&id).unwrap();
        assert_eq!(pipeline.status, PipelineStatus::Failed);
        assert_eq!(pipeline.stages[0].status, StageStatus::Completed);
        assert_eq!(pipeline.stages[1].status, StageStatus::Completed);
        assert_eq!(pipeline.stages[2].status, StageStatus::Failed);
        // Everything after the failure stays pending forever.
        assert_eq!(pipeline.stages[3].status, StageStatus::Pending);
        assert_eq!(pipeline.stages[4].status, StageStatus::Pending);
    }

    #[tokio::test]
    async fn later_stages_see_earlier_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = FeatureGate::new(dir.path()).unwrap();
        let mut executor = PipelineExecutor::new();
        let id = executor
            .create_pipeline("churn-model", configs(), expectations(), &mut gate)
            .unwrap();

        let service = FnService::new(|prompt: &str| {
            if prompt.contains("the feature stage") && !prompt.contains("Completed stage outputs") {
                Err("missing upstream results".to_string())
            } else {
                Ok("substep completed".to_string())
            }
        });
        let mut reasoner = SequentialReasoner::new(service, ContextStoreConfig::default());

        executor.run(&id, &mut reasoner).await.unwrap();
    }

    #[test]
    fn creation_requires_one_expectation_per_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = FeatureGate::new(dir.path()).unwrap();
        let mut executor = PipelineExecutor::new();

        let err = executor
            .create_pipeline("p", configs(), expectations()[..3].to_vec(), &mut gate)
            .unwrap_err();
        assert!(err.contains("one expectation test case per stage"));
        assert!(executor.pipelines().next().is_none());
    }

    #[test]
    fn creation_registers_expectations_with_the_gate() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = FeatureGate::new(dir.path()).unwrap();
        let mut executor = PipelineExecutor::new();
        executor
            .create_pipeline("churn-model", configs(), expectations(), &mut gate)
            .unwrap();

        let cases = gate.cases("churn-model").unwrap();
        assert_eq!(cases.len(), 5);
        assert!(cases.iter().all(|c| c.status == TestStatus::Pending));
        assert!(gate.spec_path("churn-model").exists());
    }

    #[tokio::test]
    async fn unknown_pipeline_id_fails() {
        let mut executor = PipelineExecutor::new();
        let mut reasoner = reasoner_ok();
        assert!(executor.run("pipeline-404", &mut reasoner).await.is_err());
    }
}
