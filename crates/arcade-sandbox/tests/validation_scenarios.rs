use arcade_artifact::Artifact;
use arcade_sandbox::{
    ArtifactValidator, CompiledProgram, FailureKind, InputSnapshot, InputSource, SandboxConfig,
    SandboxError, SandboxExecutor, ScratchMemory, Surface, Validator,
};
use arcade_test_utils::{
    busy_loop_artifact, missing_method_artifact, nan_score_artifact, quick_config,
    quick_validator, stable_artifact, syntax_error_artifact, throws_at_frame,
    CountingInputSource,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::time::Duration;

#[test]
fn stable_artifact_passes_full_budget() {
    let validator = Validator::new(SandboxConfig::default().with_seed(11)).unwrap();
    let mut input = CountingInputSource::new();
    let report = validator.run(&stable_artifact(), &mut input);

    assert!(report.verdict.passed, "{:?}", report.verdict.error);
    assert_eq!(report.frames_run, 300);
    assert_eq!(input.produced.len(), 300);
}

#[test]
fn stable_artifact_passes_under_fuzzer() {
    let verdict = Validator::new(SandboxConfig::default().with_seed(3))
        .unwrap()
        .validate(&stable_artifact());
    assert!(verdict.passed, "{:?}", verdict.error);
}

#[test]
fn nan_score_is_reported_as_corruption() {
    let report = quick_validator(300).report(&nan_score_artifact());

    assert!(!report.verdict.passed);
    let message = report.verdict.error_message().unwrap();
    assert!(message.contains("score"), "{message}");
    assert!(matches!(
        report.failure,
        Some(SandboxError::Corruption { frame: 0, .. })
    ));
    assert_eq!(report.frames_run, 1);
}

#[test]
fn missing_method_fails_on_first_frame() {
    let mut input = CountingInputSource::new();
    let report = quick_validator(300).run(&missing_method_artifact(), &mut input);

    assert_eq!(report.failure.as_ref().map(SandboxError::kind), Some(FailureKind::Runtime));
    assert_eq!(report.failure.as_ref().and_then(SandboxError::frame), Some(0));
    assert_eq!(input.produced, vec![0]);
    assert_eq!(report.detector_checks, 0);
}

#[test]
fn later_frames_never_run_after_a_failure() {
    for k in [0u32, 1, 17, 299] {
        let mut input = CountingInputSource::new();
        let report = quick_validator(300).run(&throws_at_frame(k), &mut input);

        assert!(!report.verdict.passed);
        assert_eq!(report.frames_run, k + 1);
        assert_eq!(report.detector_checks, k);
        assert_eq!(input.produced.last(), Some(&k));
        assert!(report
            .verdict
            .error_message()
            .unwrap()
            .starts_with(&format!("runtime error in update at frame {k}: ")));
    }
}

#[test]
fn compile_error_runs_nothing() {
    let mut input = CountingInputSource::new();
    let report = quick_validator(300).run(&syntax_error_artifact(), &mut input);

    assert_eq!(report.failure.as_ref().map(SandboxError::kind), Some(FailureKind::Compile));
    assert!(input.produced.is_empty());
    assert_eq!(report.frames_run, 0);
}

#[test]
fn busy_loop_is_cut_off() {
    let config = quick_config(5)
        .with_max_operations(0)
        .with_frame_deadline(Some(Duration::from_millis(50)));
    let verdict = Validator::new(config).unwrap().validate(&busy_loop_artifact());

    let message = verdict.error_message().unwrap();
    assert!(message.contains("at frame 0"), "{message}");
    assert!(message.contains("wall-clock deadline"), "{message}");
}

#[test]
fn busy_loop_hits_operation_budget() {
    let config = quick_config(5).with_max_operations(50_000).with_frame_deadline(None);
    let verdict = Validator::new(config).unwrap().validate(&busy_loop_artifact());
    assert!(verdict.error_message().unwrap().contains("budget of 50000 operations"));
}

#[test]
fn compiling_twice_behaves_identically() {
    let executor = SandboxExecutor::default();
    let artifact = stable_artifact();
    let first = executor.compile(&artifact).unwrap();
    let second = executor.compile(&artifact).unwrap();

    let run = |program: &CompiledProgram| {
        let mut surface = Surface::new(800.0, 600.0);
        let mut scratch = ScratchMemory::new();
        let mut input = InputSnapshot::centered(800.0, 600.0);
        program.setup(&mut surface, &mut scratch).unwrap();
        for frame in 0..20u32 {
            input.is_down = frame % 3 == 0;
            input.x = f64::from(frame) * 10.0;
            program.frame(&mut surface, &mut scratch, &input).unwrap();
        }
        (format!("{:?}", scratch.fields()), surface.draw_calls())
    };

    assert_eq!(run(&first), run(&second));
}

#[test]
fn every_run_starts_from_empty_scratch() {
    let artifact = Artifact::new(
        "Once",
        "",
        "if \"seen\" in scratch { throw \"scratch leaked between runs\"; } scratch.seen = true;",
        "",
    );
    let validator = quick_validator(3);
    assert!(validator.validate(&artifact).passed);
    assert!(validator.validate(&artifact).passed);
}

struct Scripted(Vec<InputSnapshot>);

impl InputSource for Scripted {
    fn initial(&mut self) -> InputSnapshot {
        InputSnapshot::centered(800.0, 600.0)
    }

    fn produce(&mut self, frame: u32, previous: &InputSnapshot) -> InputSnapshot {
        self.0.get(frame as usize).cloned().unwrap_or_else(|| previous.clone())
    }
}

#[test]
fn corruption_only_when_watched_field_turns_invalid() {
    let artifact = Artifact::new(
        "Divide On Click",
        "",
        "scratch.player = #{ x: 1.0 };",
        "if input.is_down { scratch.player.x = scratch.player.x / 0.0; }",
    );
    let mut down = InputSnapshot::centered(800.0, 600.0);
    down.is_down = true;
    let up = InputSnapshot::centered(800.0, 600.0);

    let mut input = Scripted(vec![up.clone(), up, down]);
    let report = quick_validator(10).run(&artifact, &mut input);

    assert_eq!(
        report.verdict.error_message(),
        Some("state corruption at frame 2: 'scratch.player.x' became Infinity")
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn verdict_is_deterministic_for_a_seed(seed in any::<u64>()) {
        let validator = Validator::new(SandboxConfig::default().with_frames(60).with_seed(seed)).unwrap();
        let a = validator.validate(&stable_artifact());
        let b = validator.validate(&stable_artifact());
        prop_assert_eq!(a, b);
    }
}
