//! Sequential step execution against the reasoning service.
//!
//! [`SequentialReasoner::run`] executes an ordered list of steps. Each step
//! recalls up to three relevant context windows, builds an augmented prompt
//! from the problem, the step, the recalled context, and the last two prior
//! outputs (never the full history), calls the service, and writes its
//! result back into one window before the next step starts. A service error
//! abandons the run mid-step: no retry, no partial result.

use std::time::Instant;

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::context::{ContextReport, ContextStore, ContextStoreConfig, ContextWindow, WindowWrite};

use super::service::ReasoningService;

/// How many prior step outputs are carried into the next prompt.
const PRIOR_OUTPUT_WINDOW: usize = 2;

/// One executed step, sealed on creation and immutable afterward.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningStep {
    pub index: usize,
    pub description: String,
    /// The full augmented prompt sent to the service.
    pub input: String,
    pub output: String,
    /// The windows recalled for this step (at most 3).
    pub context_used: Vec<ContextWindow>,
    pub duration_ms: u64,
}

/// The ordered result of one `run()` call.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningRun {
    pub steps: Vec<ReasoningStep>,
    pub total_duration_ms: u64,
}

/// Sequential reasoning executor. Owns the context store and a per-run
/// history; the sole mechanism other components use to obtain analysis text.
pub struct SequentialReasoner<S> {
    service: S,
    store: ContextStore,
    history: Vec<ReasoningStep>,
}

impl<S: ReasoningService> SequentialReasoner<S> {
    pub fn new(service: S, store_config: ContextStoreConfig) -> Self {
        Self {
            service,
            store: ContextStore::new(store_config),
            history: Vec::new(),
        }
    }

    /// Execute `steps` strictly in order against `problem`.
    ///
    /// A step's window write is applied before the next step begins, so step
    /// *N*'s side effects are always visible to step *N+1*. On a service
    /// error the run is abandoned and the error propagates unchanged;
    /// already-sealed steps stay in the history.
    pub async fn run(&mut self, problem: &str, steps: &[String]) -> Result<ReasoningRun, String> {
        let run_start = Instant::now();
        let window_count = self.store.window_count();
        let mut results: Vec<ReasoningStep> = Vec::with_capacity(steps.len());

        for (index, description) in steps.iter().enumerate() {
            let snapshot = self.store.snapshot();
            let relevant: Vec<ContextWindow> = snapshot
                .relevant_to(description)
                .into_iter()
                .cloned()
                .collect();

            let prompt = build_step_prompt(problem, description, &relevant, &results);
            debug!("step {index}: '{description}' ({} context windows)", relevant.len());

            let started = Instant::now();
            let output = self.service.complete(&prompt).await?;
            let duration_ms = started.elapsed().as_millis() as u64;

            let step = ReasoningStep {
                index,
                description: description.clone(),
                input: prompt,
                output: output.clone(),
                context_used: relevant,
                duration_ms,
            };

            let delta = WindowWrite {
                window_id: (index % window_count) + 1,
                content: json!({
                    "step": description,
                    "output": output,
                    "duration_ms": duration_ms,
                }),
                priority: result_priority(&output),
            };
            self.store.apply(delta)?;

            self.history.push(step.clone());
            results.push(step);
        }

        Ok(ReasoningRun {
            steps: results,
            total_duration_ms: run_start.elapsed().as_millis() as u64,
        })
    }

    /// All steps sealed across every run of this reasoner.
    pub fn history(&self) -> &[ReasoningStep] {
        &self.history
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ContextStore {
        &mut self.store
    }

    /// Store state plus the mean step duration across the history.
    pub fn context_report(&self) -> ContextReport {
        let avg = if self.history.is_empty() {
            0.0
        } else {
            self.history.iter().map(|s| s.duration_ms as f64).sum::<f64>()
                / self.history.len() as f64
        };
        self.store.report(avg)
    }
}

/// Assemble the augmented prompt for one step.
fn build_step_prompt(
    problem: &str,
    step: &str,
    context: &[ContextWindow],
    prior: &[ReasoningStep],
) -> String {
    let mut prompt = format!("Problem: {problem}\n\nCurrent step: {step}\n");

    if !context.is_empty() {
        prompt.push_str("\nRelevant context:\n");
        for window in context {
            let content = window
                .content
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_default();
            prompt.push_str(&format!("- [{}] {content}\n", window.name));
        }
    }

    let recent: Vec<&ReasoningStep> = prior.iter().rev().take(PRIOR_OUTPUT_WINDOW).rev().collect();
    if !recent.is_empty() {
        prompt.push_str("\nPrevious step outputs:\n");
        for step in recent {
            prompt.push_str(&format!("- {}: {}\n", step.description, step.output));
        }
    }

    prompt
}

/// Priority of a step result for context retention.
///
/// Base 1; error indicators +3, metrics +2, recommendations +2, a completed
/// status +1; clamped to 0–5.
fn result_priority(output: &str) -> u8 {
    let lower = output.to_lowercase();
    let mut priority: i32 = 1;
    if lower.contains("error") {
        priority += 3;
    }
    if lower.contains("metrics") {
        priority += 2;
    }
    if lower.contains("recommendations") {
        priority += 2;
    }
    if lower.contains("completed") {
        priority += 1;
    }
    priority.clamp(0, 5) as u8
}
