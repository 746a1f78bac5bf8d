//! Validator
//!
//! Composes executor, fuzzer and detector into one pass/fail decision:
//! compile, run `init`, then for each frame in the budget produce input,
//! run `update` and check the watched fields. The first failure anywhere
//! ends the run; later frames never execute.

use crate::config::SandboxConfig;
use crate::detector::CorruptionDetector;
use crate::error::{PathParseError, SandboxError};
use crate::executor::{SandboxExecutor, ScratchMemory};
use crate::fuzzer::{InputFuzzer, InputSource};
use crate::surface::Surface;
use arcade_artifact::Artifact;
use serde::{Deserialize, Serialize};

/// Outcome of one validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether every frame completed cleanly
    pub passed: bool,
    /// Failure message when not passed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    /// A passing verdict
    #[inline]
    #[must_use]
    pub fn pass() -> Self {
        Self {
            passed: true,
            error: None,
        }
    }

    /// A failing verdict with message
    #[inline]
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            error: Some(message.into()),
        }
    }

    /// Failure message, if any
    #[inline]
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Detailed result of [`Validator::run`]
#[derive(Debug)]
pub struct ValidationReport {
    /// Pass/fail outcome
    pub verdict: Verdict,
    /// Number of `update` calls made
    pub frames_run: u32,
    /// Number of detector checks made
    pub detector_checks: u32,
    /// Typed failure behind a failing verdict
    pub failure: Option<SandboxError>,
}

/// Port consumed by the orchestrator
pub trait ArtifactValidator: Send + Sync {
    /// Validate one artifact
    fn validate(&self, artifact: &Artifact) -> Verdict;
}

/// Runs artifacts through the sandbox under synthetic input
#[derive(Debug, Clone)]
pub struct Validator {
    config: SandboxConfig,
    executor: SandboxExecutor,
    detector: CorruptionDetector,
}

#[derive(Debug, Default)]
struct Counters {
    frames_run: u32,
    detector_checks: u32,
}

impl Validator {
    /// Create a validator
    ///
    /// # Errors
    /// Returns an error if a configured watched path does not parse
    pub fn new(config: SandboxConfig) -> Result<Self, PathParseError> {
        let detector = CorruptionDetector::from_strings(&config.watched_paths)?;
        Ok(Self {
            executor: SandboxExecutor::from_config(&config),
            detector,
            config,
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Validate with a fresh fuzzer, returning the full report
    #[must_use]
    pub fn report(&self, artifact: &Artifact) -> ValidationReport {
        let mut fuzzer = InputFuzzer::from_sandbox_config(&self.config);
        tracing::debug!(seed = fuzzer.seed(), title = artifact.title(), "Fuzzing artifact");
        self.run(artifact, &mut fuzzer)
    }

    /// Validate against an explicit input source
    pub fn run(&self, artifact: &Artifact, input: &mut dyn InputSource) -> ValidationReport {
        let mut counters = Counters::default();
        let outcome = self.execute(artifact, input, &mut counters);

        let (verdict, failure) = match outcome {
            Ok(()) => (Verdict::pass(), None),
            Err(err) => {
                tracing::debug!(kind = ?err.kind(), frame = ?err.frame(), "Validation failure: {}", err);
                (Verdict::fail(err.to_string()), Some(err))
            }
        };
        tracing::info!(
            title = artifact.title(),
            passed = verdict.passed,
            frames = counters.frames_run,
            "Validation finished"
        );

        ValidationReport {
            verdict,
            frames_run: counters.frames_run,
            detector_checks: counters.detector_checks,
            failure,
        }
    }

    fn execute(
        &self,
        artifact: &Artifact,
        input: &mut dyn InputSource,
        counters: &mut Counters,
    ) -> Result<(), SandboxError> {
        let program = self.executor.compile(artifact)?;

        let mut surface = Surface::new(self.config.surface_width, self.config.surface_height);
        let mut scratch = ScratchMemory::new();
        program.setup(&mut surface, &mut scratch)?;

        let mut snapshot = input.initial();
        for frame in 0..self.config.total_frames {
            snapshot = input.produce(frame, &snapshot);

            counters.frames_run += 1;
            program
                .frame(&mut surface, &mut scratch, &snapshot)
                .map_err(|err| err.at_frame(frame))?;

            counters.detector_checks += 1;
            self.detector
                .check(&scratch)
                .map_err(|source| SandboxError::Corruption { frame, source })?;
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        let config = SandboxConfig::default();
        Self {
            executor: SandboxExecutor::from_config(&config),
            detector: CorruptionDetector::default(),
            config,
        }
    }
}

impl ArtifactValidator for Validator {
    fn validate(&self, artifact: &Artifact) -> Verdict {
        self.report(artifact).verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use pretty_assertions::assert_eq;

    fn validator(frames: u32) -> Validator {
        Validator::new(SandboxConfig::default().with_frames(frames).with_seed(1)).unwrap()
    }

    #[test]
    fn stable_artifact_passes() {
        let artifact = Artifact::new(
            "Counter",
            "",
            "scratch.score = 0; scratch.player = #{ x: 10.0, y: 10.0 };",
            "scratch.score += 1; scratch.player.x = input.x; surface.clear(); surface.fill_rect(scratch.player.x, scratch.player.y, 8, 8);",
        );
        let report = validator(300).report(&artifact);
        assert_eq!(report.verdict, Verdict::pass());
        assert_eq!(report.frames_run, 300);
        assert_eq!(report.detector_checks, 300);
        assert!(report.failure.is_none());
    }

    #[test]
    fn compile_failure_runs_no_frames() {
        let artifact = Artifact::new("Broken", "", "scratch.score = ;", "");
        let report = validator(300).report(&artifact);
        assert!(!report.verdict.passed);
        assert!(report
            .verdict
            .error_message()
            .unwrap()
            .starts_with("compile error in init"));
        assert_eq!(report.frames_run, 0);
    }

    #[test]
    fn init_failure_is_terminal() {
        let artifact = Artifact::new("Broken", "", "throw \"no canvas\";", "scratch.n = 1;");
        let report = validator(300).report(&artifact);
        assert_eq!(report.failure.as_ref().map(SandboxError::kind), Some(FailureKind::Runtime));
        assert_eq!(report.frames_run, 0);
    }

    #[test]
    fn nan_score_fails_on_first_frame() {
        let artifact = Artifact::new(
            "Divide",
            "",
            "scratch.score = 0.0;",
            "scratch.score = scratch.score / (input.x - input.x);",
        );
        let verdict = validator(300).validate(&artifact);
        assert_eq!(
            verdict.error_message(),
            Some("state corruption at frame 0: 'scratch.score' became NaN")
        );
    }

    #[test]
    fn runtime_failure_names_frame() {
        let artifact = Artifact::new(
            "Late",
            "",
            "scratch.t = 0;",
            "scratch.t += 1; if scratch.t == 13 { throw \"late failure\"; }",
        );
        let report = validator(300).report(&artifact);
        let message = report.verdict.error_message().unwrap();
        assert!(message.starts_with("runtime error in update at frame 12: "), "{message}");
        assert_eq!(report.frames_run, 13);
        assert_eq!(report.detector_checks, 12);
    }

    #[test]
    fn verdict_serializes_without_empty_error() {
        let json = serde_json::to_string(&Verdict::pass()).unwrap();
        assert_eq!(json, r#"{"passed":true}"#);
    }

    #[test]
    fn bad_watched_path_rejected() {
        let config = SandboxConfig::default().with_watched_paths(["player..x"]);
        assert!(Validator::new(config).is_err());
    }
}
