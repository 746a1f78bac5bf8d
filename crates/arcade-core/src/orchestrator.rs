//! Self-healing orchestrator
//!
//! Drives one workflow at a time through
//! `Idle -> Planning -> Generating -> Validating -> {Deployed | Generating | Failed}`:
//! - Asks the Generator for a first artifact
//! - Validates it on a blocking worker
//! - On failure hands the artifact and error text to the Fixer, bounded by
//!   the retry budget
//! - Records every step in the log trail

use crate::error::WorkflowError;
use crate::log::LogTrail;
use crate::ports::{Fixer, Generator};
use crate::state_machine::validate_transition;
use crate::types::{AgentTag, WorkflowConfig, WorkflowState};
use arcade_artifact::Artifact;
use arcade_sandbox::{ArtifactValidator, Verdict};
use std::sync::Arc;

/// Validation attempts counter for one workflow.
///
/// `attempts` never exceeds `max_retries + 1` and is only reset when a new
/// workflow starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    attempts: u32,
    max_retries: u32,
}

impl RetryBudget {
    #[inline]
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempts: 0,
            max_retries,
        }
    }

    /// Count one validation attempt, returning the new total
    pub fn record_attempt(&mut self) -> u32 {
        self.attempts = (self.attempts + 1).min(self.limit());
        self.attempts
    }

    /// Whether a failed attempt may still be repaired
    #[inline]
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.attempts <= self.max_retries
    }

    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[inline]
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Maximum validation attempts
    #[inline]
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// The generate / validate / repair loop
pub struct Orchestrator {
    generator: Arc<dyn Generator>,
    fixer: Arc<dyn Fixer>,
    validator: Arc<dyn ArtifactValidator>,
    config: WorkflowConfig,
    state: WorkflowState,
    budget: RetryBudget,
    artifact: Option<Artifact>,
    failure: Option<String>,
    log: LogTrail,
}

impl Orchestrator {
    /// Create an orchestrator with its collaborators
    #[must_use]
    pub fn new(
        generator: Arc<dyn Generator>,
        fixer: Arc<dyn Fixer>,
        validator: Arc<dyn ArtifactValidator>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            generator,
            fixer,
            validator,
            budget: RetryBudget::new(config.max_retries),
            config,
            state: WorkflowState::Idle,
            artifact: None,
            failure: None,
            log: LogTrail::new(),
        }
    }

    /// Run one complete workflow for `topic`.
    ///
    /// Starting from a terminal state first resets to `Idle`; nothing from
    /// the previous workflow carries over.
    ///
    /// # Errors
    /// - `WorkflowError::InvalidTopic` for a blank topic (state unchanged)
    /// - `WorkflowError::Upstream` if the Generator or Fixer fails
    /// - `WorkflowError::RetriesExhausted` if every validation fails
    pub async fn run(&mut self, topic: &str) -> Result<Artifact, WorkflowError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(WorkflowError::InvalidTopic("topic is empty".to_string()));
        }

        self.begin()?;
        self.log
            .append(AgentTag::Director, format!("Analyzing topic: \"{topic}\""));
        self.pace().await;

        self.transition(WorkflowState::Generating)?;
        self.log.append(AgentTag::Engineer, "Drafting artifact...");
        let mut artifact = match self.generator.generate(topic).await {
            Ok(artifact) => artifact,
            Err(err) => return Err(self.halt(err.into())),
        };
        self.log.append(
            AgentTag::Engineer,
            format!("Draft ready: \"{}\"", artifact.title()),
        );

        loop {
            self.artifact = Some(artifact.clone());
            self.transition(WorkflowState::Validating)?;
            let attempt = self.budget.record_attempt();
            self.log.append(
                AgentTag::Qa,
                format!(
                    "Running headless validation (attempt {attempt}/{})...",
                    self.budget.limit()
                ),
            );
            self.pace().await;

            let verdict = self.validate(&artifact).await;
            if verdict.passed {
                self.log.append(AgentTag::Qa, "TEST PASSED: no runtime errors or state corruption");
                self.transition(WorkflowState::Deployed)?;
                self.log.append(
                    AgentTag::Director,
                    format!("Deployed \"{}\"", artifact.title()),
                );
                return Ok(artifact);
            }

            let error = verdict
                .error
                .unwrap_or_else(|| "validation failed without a message".to_string());
            self.log.append(AgentTag::Qa, format!("TEST FAILED: {error}"));

            if !self.budget.can_retry() {
                return Err(self.halt(WorkflowError::RetriesExhausted {
                    attempts: self.budget.attempts(),
                    last_error: error,
                }));
            }

            self.transition(WorkflowState::Generating)?;
            self.log.append(
                AgentTag::Engineer,
                format!(
                    "Repairing artifact (fix {attempt}/{})...",
                    self.budget.max_retries()
                ),
            );
            self.pace().await;
            artifact = match self.fixer.fix(&artifact, &error).await {
                Ok(fixed) => fixed,
                Err(err) => return Err(self.halt(err.into())),
            };
            self.log.append(AgentTag::Engineer, "Patch applied");
        }
    }

    /// Report a crash of the deployed artifact in production.
    ///
    /// Withdraws the published artifact and moves to `Failed`.
    ///
    /// # Errors
    /// `WorkflowError::IllegalTransition` unless currently `Deployed`
    pub fn handle_crash(&mut self, error: &str) -> Result<(), WorkflowError> {
        self.transition(WorkflowState::Failed)?;
        self.log
            .append(AgentTag::Director, format!("Runtime crash reported: {error}"));
        self.artifact = None;
        self.failure = Some(error.to_string());
        Ok(())
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Current candidate, or the published artifact once `Deployed`
    #[inline]
    #[must_use]
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// Validation attempts in the current workflow
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.budget.attempts()
    }

    /// Terminal error message, when `Failed`
    #[inline]
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Log trail handle
    #[inline]
    #[must_use]
    pub fn log(&self) -> &LogTrail {
        &self.log
    }

    /// Workflow configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn begin(&mut self) -> Result<(), WorkflowError> {
        match self.state {
            WorkflowState::Idle => {}
            state if state.is_terminal() => self.transition(WorkflowState::Idle)?,
            state => {
                // Only reachable if a previous run future was dropped mid-flight.
                tracing::warn!(%state, "Abandoning interrupted workflow");
                self.state = WorkflowState::Idle;
            }
        }

        self.log.clear();
        self.budget = RetryBudget::new(self.config.max_retries);
        self.artifact = None;
        self.failure = None;
        self.transition(WorkflowState::Planning)
    }

    fn transition(&mut self, to: WorkflowState) -> Result<(), WorkflowError> {
        validate_transition(self.state, to)?;
        tracing::debug!(from = %self.state, %to, "Workflow transition");
        self.state = to;
        Ok(())
    }

    fn halt(&mut self, err: WorkflowError) -> WorkflowError {
        if let Err(illegal) = self.transition(WorkflowState::Failed) {
            tracing::error!("Cannot enter failed state: {}", illegal);
        }
        self.log
            .append(AgentTag::Director, format!("Workflow halted: {err}"));
        self.failure = Some(err.to_string());
        err
    }

    async fn validate(&self, artifact: &Artifact) -> Verdict {
        let validator = Arc::clone(&self.validator);
        let artifact = artifact.clone();
        match tokio::task::spawn_blocking(move || validator.validate(&artifact)).await {
            Ok(verdict) => verdict,
            Err(err) => Verdict::fail(format!("validator aborted: {err}")),
        }
    }

    async fn pace(&self) {
        let pacing = self.config.pacing();
        if !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("budget", &self.budget)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}
