//! Checked, bounded deployment with optional rollback.
//!
//! `rapid_deploy` runs three independent pre-deployment checks (test suite,
//! lint, dependency audit) before the environment deploy is attempted. The
//! deploy subprocess is the only operation in this crate with a hard
//! timeout: if it outlives `max_deploy_time_ms` it is killed and the attempt
//! fails. A reachable `health_check_url` is probed after a successful
//! deploy; non-2xx counts as failure. With `auto_rollback`, a failed deploy
//! or health check triggers the rollback command and the attempt is
//! recorded as rolled back instead of failed.
//!
//! Every attempt, whether aborted, failed, rolled back, or deployed, lands in an
//! append-only history. Nothing is ever retried automatically.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::features::run_exit_checked;

/// Exit codes the dependency audit treats as success. Audit tools
/// conventionally exit 1 for "advisories found", which is not a hard
/// failure here.
const AUDIT_LENIENT_EXIT_CODES: [i32; 1] = [1];

/// Terminal status of one deployment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployStatus {
    Deployed,
    Failed,
    RolledBack,
}

/// Configuration for one deployment attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    pub environment: String,
    /// Hard bound on the deploy subprocess, in milliseconds.
    pub max_deploy_time_ms: u64,
    /// Probed with a GET after a successful deploy; 2xx = healthy.
    pub health_check_url: Option<String>,
    /// Run the rollback command when the deploy or health check fails.
    pub auto_rollback: bool,
    pub test_command: String,
    pub lint_command: String,
    pub audit_command: String,
    pub deploy_command: String,
    pub rollback_command: String,
}

impl DeployConfig {
    pub fn new(environment: impl Into<String>) -> Self {
        let environment = environment.into();
        Self {
            max_deploy_time_ms: 300_000,
            health_check_url: None,
            auto_rollback: false,
            test_command: "cargo test".to_string(),
            lint_command: "cargo clippy -- -D warnings".to_string(),
            audit_command: "cargo audit".to_string(),
            deploy_command: format!("scripts/deploy.sh {environment}"),
            rollback_command: format!("scripts/rollback.sh {environment}"),
            environment,
        }
    }

    pub fn with_max_deploy_time_ms(mut self, ms: u64) -> Self {
        self.max_deploy_time_ms = ms;
        self
    }

    pub fn with_health_check_url(mut self, url: impl Into<String>) -> Self {
        self.health_check_url = Some(url.into());
        self
    }

    pub fn with_auto_rollback(mut self, enabled: bool) -> Self {
        self.auto_rollback = enabled;
        self
    }

    pub fn with_test_command(mut self, command: impl Into<String>) -> Self {
        self.test_command = command.into();
        self
    }

    pub fn with_lint_command(mut self, command: impl Into<String>) -> Self {
        self.lint_command = command.into();
        self
    }

    pub fn with_audit_command(mut self, command: impl Into<String>) -> Self {
        self.audit_command = command.into();
        self
    }

    pub fn with_deploy_command(mut self, command: impl Into<String>) -> Self {
        self.deploy_command = command.into();
        self
    }

    pub fn with_rollback_command(mut self, command: impl Into<String>) -> Self {
        self.rollback_command = command.into();
        self
    }
}

/// One entry in the append-only deployment history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: String,
    /// RFC 3339 timestamp of the attempt.
    pub timestamp: String,
    pub config: DeployConfig,
    pub status: DeployStatus,
    pub error: Option<String>,
}

/// Runs deployments and keeps their history for the process lifetime.
pub struct Deployer {
    history: Vec<DeploymentRecord>,
    counter: u64,
    http: reqwest::Client,
}

impl Default for Deployer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deployer {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            counter: 0,
            http: reqwest::Client::new(),
        }
    }

    /// Run one deployment attempt end to end.
    ///
    /// Always returns a terminal [`DeploymentRecord`]; failures are carried
    /// in its status and error fields rather than an `Err`, and the record
    /// is appended to the history either way.
    pub async fn rapid_deploy(&mut self, config: DeployConfig) -> DeploymentRecord {
        self.counter += 1;
        let id = format!("deploy-{}", self.counter);
        info!("deployment {id}: starting for environment '{}'", config.environment);

        // Pre-deployment checks, in order; any failure aborts before the
        // deploy command runs.
        let checks: [(&str, String, &[i32]); 3] = [
            ("test suite", config.test_command.clone(), &[]),
            ("lint", config.lint_command.clone(), &[]),
            ("dependency audit", config.audit_command.clone(), &AUDIT_LENIENT_EXIT_CODES),
        ];
        for (label, command, lenient) in checks {
            if let Err(e) = run_exit_checked(&command, lenient).await {
                warn!("deployment {id}: {label} check failed, aborting");
                return self.record(
                    id,
                    config,
                    DeployStatus::Failed,
                    Some(format!("pre-deployment {label} check failed: {e}")),
                );
            }
            debug!("deployment {id}: {label} check passed");
        }

        // Environment deploy, bounded by the hard timeout.
        let mut failure = run_bounded(
            &config.deploy_command,
            Duration::from_millis(config.max_deploy_time_ms),
        )
        .await
        .err();

        // Post-deploy health check.
        if failure.is_none()
            && let Some(ref url) = config.health_check_url
            && let Err(e) = self.health_check(url).await
        {
            failure = Some(e);
        }

        match failure {
            None => {
                info!("deployment {id}: deployed to '{}'", config.environment);
                self.record(id, config, DeployStatus::Deployed, None)
            }
            Some(error) => {
                if config.auto_rollback {
                    warn!("deployment {id}: {error}; rolling back");
                    let error = match run_exit_checked(&config.rollback_command, &[]).await {
                        Ok(()) => error,
                        Err(rb) => format!("{error}; rollback also failed: {rb}"),
                    };
                    self.record(id, config, DeployStatus::RolledBack, Some(error))
                } else {
                    warn!("deployment {id}: {error}");
                    self.record(id, config, DeployStatus::Failed, Some(error))
                }
            }
        }
    }

    /// Every attempt ever made through this deployer, oldest first.
    pub fn history(&self) -> &[DeploymentRecord] {
        &self.history
    }

    async fn health_check(&self, url: &str) -> Result<(), String> {
        let resp = self
            .http
            .get(url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| format!("health check request failed: {e}"))?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("health check returned HTTP {status}"))
        }
    }

    fn record(
        &mut self,
        id: String,
        config: DeployConfig,
        status: DeployStatus,
        error: Option<String>,
    ) -> DeploymentRecord {
        let record = DeploymentRecord {
            id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            config,
            status,
            error,
        };
        self.history.push(record.clone());
        record
    }
}

/// Run a shell command, killing it if it outlives `bound`.
///
/// The child is spawned with `kill_on_drop`, so when the timeout fires and
/// the wait future is dropped, the process goes with it.
async fn run_bounded(command: &str, bound: Duration) -> Result<(), String> {
    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .kill_on_drop(true)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to start '{command}': {e}"))?;

    match tokio::time::timeout(bound, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => Ok(()),
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!("'{command}' exited with {}: {}", output.status, stderr.trim()))
        }
        Ok(Err(e)) => Err(format!("failed to wait for '{command}': {e}")),
        Err(_) => Err(format!(
            "'{command}' exceeded the {}ms deploy bound and was killed",
            bound.as_millis(),
        )),
    }
}
