//! The five fixed dimensions and the scorer driving their evaluation.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::reasoning::{ReasoningService, SequentialReasoner};

use super::strategy::{KeywordOverlap, ScoringStrategy};

/// Score below which a dimension gets its recommendations attached.
const RECOMMENDATION_THRESHOLD: u32 = 70;

/// Evaluation state of one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DimensionStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// One scoring dimension: fixed criteria, current score, and the
/// recommendations attached when the score falls short.
#[derive(Debug, Clone, Serialize)]
pub struct Dimension {
    pub name: String,
    pub score: u32,
    pub criteria: Vec<String>,
    pub status: DimensionStatus,
    pub recommendations: Vec<String>,
}

impl Dimension {
    fn new(name: &str, criteria: [&str; 5]) -> Self {
        Self {
            name: name.to_string(),
            score: 0,
            criteria: criteria.iter().map(|c| (*c).to_string()).collect(),
            status: DimensionStatus::NotStarted,
            recommendations: Vec::new(),
        }
    }
}

/// Scores artifacts against the five fixed dimensions.
///
/// Evaluation is reasoner-driven: each dimension's criteria become a
/// five-step assessment script, the joined step outputs form the analysis
/// text, and the configured [`ScoringStrategy`] grades that text.
/// Re-evaluating a dimension overwrites its previous result.
pub struct Scorer {
    dimensions: Vec<Dimension>,
    strategy: Box<dyn ScoringStrategy>,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer {
    pub fn new() -> Self {
        Self::with_strategy(Box::new(KeywordOverlap))
    }

    pub fn with_strategy(strategy: Box<dyn ScoringStrategy>) -> Self {
        Self {
            dimensions: vec![
                Dimension::new(
                    "Scoping",
                    [
                        "problem statement defined with measurable success criteria",
                        "input data sources identified and documented",
                        "stakeholder requirements captured and prioritized",
                        "project constraints and risks assessed",
                        "delivery milestones planned with clear owners",
                    ],
                ),
                Dimension::new(
                    "Training",
                    [
                        "training data validated for quality and coverage",
                        "model architecture selected and justified",
                        "hyperparameters tuned against a holdout set",
                        "training metrics logged for every run",
                        "model checkpoints saved and versioned",
                    ],
                ),
                Dimension::new(
                    "Analysis",
                    [
                        "evaluation metrics computed on unseen data",
                        "error patterns analyzed and categorized",
                        "results compared against baseline benchmarks",
                        "findings documented with supporting evidence",
                        "limitations identified and reported",
                    ],
                ),
                Dimension::new(
                    "Reliability",
                    [
                        "failure modes identified and mitigated",
                        "monitoring and alerting configured",
                        "rollback procedures tested and documented",
                        "error handling covers external dependencies",
                        "recovery time objectives defined and met",
                    ],
                ),
                Dimension::new(
                    "Excellence",
                    [
                        "code reviewed and meets quality standards",
                        "documentation complete and current",
                        "performance optimized against targets",
                        "security practices applied and audited",
                        "continuous improvement process established",
                    ],
                ),
            ],
            strategy,
        }
    }

    /// Evaluate one dimension of an artifact and return its new score.
    ///
    /// The dimension's criteria become the reasoning script, so the analysis
    /// text naturally speaks to each criterion. Scores below
    /// `RECOMMENDATION_THRESHOLD` attach the dimension's fixed
    /// recommendations; a later passing re-evaluation clears them.
    pub async fn evaluate<S: ReasoningService>(
        &mut self,
        reasoner: &mut SequentialReasoner<S>,
        dimension_name: &str,
        artifact: &Value,
    ) -> Result<u32, String> {
        let index = self
            .dimensions
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(dimension_name))
            .ok_or_else(|| format!("unknown scoring dimension '{dimension_name}'"))?;

        self.dimensions[index].status = DimensionStatus::InProgress;
        let name = self.dimensions[index].name.clone();

        let problem = format!(
            "Evaluate the {name} dimension of this artifact.\nArtifact: {artifact}",
        );
        let steps: Vec<String> = self.dimensions[index]
            .criteria
            .iter()
            .map(|c| format!("assess whether {c}"))
            .collect();

        debug!("scoring dimension '{name}'");
        let run = reasoner.run(&problem, &steps).await?;
        let analysis = run
            .steps
            .iter()
            .map(|s| s.output.as_str())
            .collect::<Vec<&str>>()
            .join("\n");

        let dimension = &mut self.dimensions[index];
        dimension.score = self.strategy.score(&dimension.criteria, &analysis);
        dimension.recommendations = if dimension.score < RECOMMENDATION_THRESHOLD {
            recommendations_for(&name)
        } else {
            Vec::new()
        };
        dimension.status = DimensionStatus::Completed;

        info!("dimension '{name}' scored {}", dimension.score);
        Ok(dimension.score)
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name.eq_ignore_ascii_case(name))
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Mean of all five current scores. Unevaluated dimensions count as 0.
    pub fn overall_score(&self) -> f64 {
        let total: u32 = self.dimensions.iter().map(|d| d.score).sum();
        f64::from(total) / self.dimensions.len() as f64
    }

    /// Readiness bucket for the overall score.
    pub fn interpretation(&self) -> &'static str {
        let overall = self.overall_score();
        if overall >= 80.0 {
            "production ready"
        } else if overall >= 60.0 {
            "needs improvement"
        } else {
            "not ready"
        }
    }
}

fn recommendations_for(dimension: &str) -> Vec<String> {
    let items: [&str; 3] = match dimension {
        "Scoping" => [
            "write down the success criteria before any modeling work",
            "inventory every data source with an owner and refresh cadence",
            "review scope with stakeholders and record the agreed constraints",
        ],
        "Training" => [
            "add data quality checks ahead of every training run",
            "log hyperparameters and metrics for each experiment",
            "version model checkpoints alongside the data they were trained on",
        ],
        "Analysis" => [
            "hold out an untouched evaluation set and report against it",
            "categorize the worst errors and look for shared causes",
            "publish findings with the evidence that supports them",
        ],
        "Reliability" => [
            "enumerate failure modes and add a mitigation for each",
            "wire monitoring and alerting to the deployed artifact",
            "rehearse the rollback procedure and time it",
        ],
        "Excellence" => [
            "put every change through code review",
            "keep documentation in step with the code it describes",
            "schedule a recurring review of performance and security posture",
        ],
        _ => return Vec::new(),
    };
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextStoreConfig;
    use crate::reasoning::FnService;
    use serde_json::json;

    fn echo_reasoner() -> SequentialReasoner<FnService<impl Fn(&str) -> Result<String, String>>> {
        // Echoing the prompt puts every criterion's words into the analysis.
        SequentialReasoner::new(
            FnService::new(|prompt: &str| Ok(prompt.to_string())),
            ContextStoreConfig::default(),
        )
    }

    fn blank_reasoner() -> SequentialReasoner<FnService<impl Fn(&str) -> Result<String, String>>> {
        SequentialReasoner::new(
            FnService::new(|_: &str| Ok("no comment".to_string())),
            ContextStoreConfig::default(),
        )
    }

    #[tokio::test]
    async fn thorough_analysis_scores_high_without_recommendations() {
        let mut scorer = Scorer::new();
        let mut reasoner = echo_reasoner();

        let score = scorer
            .evaluate(&mut reasoner, "Training", &json!({"model": "churn-v2"}))
            .await
            .unwrap();

        assert_eq!(score, 100);
        let dim = scorer.dimension("Training").unwrap();
        assert_eq!(dim.status, DimensionStatus::Completed);
        assert!(dim.recommendations.is_empty());
    }

    #[tokio::test]
    async fn empty_analysis_scores_zero_and_attaches_recommendations() {
        let mut scorer = Scorer::new();
        let mut reasoner = blank_reasoner();

        let score = scorer
            .evaluate(&mut reasoner, "Reliability", &json!({}))
            .await
            .unwrap();

        assert_eq!(score, 0);
        let dim = scorer.dimension("Reliability").unwrap();
        assert_eq!(dim.recommendations.len(), 3);
    }

    #[tokio::test]
    async fn re_evaluation_overwrites_the_previous_result() {
        let mut scorer = Scorer::new();

        let mut poor = blank_reasoner();
        scorer.evaluate(&mut poor, "Analysis", &json!({})).await.unwrap();
        assert_eq!(scorer.dimension("Analysis").unwrap().score, 0);
        assert!(!scorer.dimension("Analysis").unwrap().recommendations.is_empty());

        let mut good = echo_reasoner();
        scorer.evaluate(&mut good, "Analysis", &json!({})).await.unwrap();
        let dim = scorer.dimension("Analysis").unwrap();
        assert_eq!(dim.score, 100);
        assert!(dim.recommendations.is_empty());
    }

    #[tokio::test]
    async fn overall_score_averages_all_five_dimensions() {
        let mut scorer = Scorer::new();
        assert_eq!(scorer.overall_score(), 0.0);
        assert_eq!(scorer.interpretation(), "not ready");

        let mut reasoner = echo_reasoner();
        for name in ["Scoping", "Training", "Analysis", "Reliability", "Excellence"] {
            scorer.evaluate(&mut reasoner, name, &json!({})).await.unwrap();
        }
        assert_eq!(scorer.overall_score(), 100.0);
        assert_eq!(scorer.interpretation(), "production ready");
    }

    #[tokio::test]
    async fn one_strong_dimension_alone_is_not_ready() {
        let mut scorer = Scorer::new();
        let mut reasoner = echo_reasoner();
        scorer.evaluate(&mut reasoner, "Scoping", &json!({})).await.unwrap();

        // 100 in one dimension, 0 in four: overall 20.
        assert_eq!(scorer.overall_score(), 20.0);
        assert_eq!(scorer.interpretation(), "not ready");
    }

    #[tokio::test]
    async fn unknown_dimension_is_an_error() {
        let mut scorer = Scorer::new();
        let mut reasoner = echo_reasoner();
        let err = scorer
            .evaluate(&mut reasoner, "Velocity", &json!({}))
            .await
            .unwrap_err();
        assert!(err.contains("unknown scoring dimension"));
    }

    struct Generous;
    impl ScoringStrategy for Generous {
        fn score(&self, _criteria: &[String], _analysis: &str) -> u32 {
            100
        }
    }

    #[tokio::test]
    async fn strategy_is_pluggable() {
        let mut scorer = Scorer::with_strategy(Box::new(Generous));
        let mut reasoner = blank_reasoner();
        let score = scorer
            .evaluate(&mut reasoner, "Excellence", &json!({}))
            .await
            .unwrap();
        assert_eq!(score, 100);
    }
}
