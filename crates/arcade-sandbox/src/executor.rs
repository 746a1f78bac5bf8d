//! Sandboxed executor
//!
//! Compiles an artifact's two fragments into script programs and runs them
//! against a [`Surface`], a [`ScratchMemory`] and (for `update`) an
//! [`InputSnapshot`]. Those three values are the whole environment a script
//! sees: there is no module loading, no `eval`, no clock, no filesystem or network.
//!
//! Every call is bounded twice: by an operation budget and by a wall-clock
//! deadline checked from the engine's progress hook. Exceeding either is a
//! runtime error for that call, so a runaway loop cannot stall validation.

use crate::config::SandboxConfig;
use crate::error::{Phase, SandboxError};
use crate::input::InputSnapshot;
use crate::surface::{self, Surface};
use arcade_artifact::Artifact;
use parking_lot::Mutex;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, EvalAltResult, Map, Scope, AST};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Operations between wall-clock checks
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Per-call resource limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Operation budget per call (0 = unlimited)
    pub max_operations: u64,
    /// Wall-clock deadline per call
    pub deadline: Option<Duration>,
    /// Maximum function call depth
    pub max_call_depth: usize,
    /// Maximum string, array or map length
    pub max_collection_size: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self::from(&SandboxConfig::default())
    }
}

impl From<&SandboxConfig> for ExecutionLimits {
    fn from(config: &SandboxConfig) -> Self {
        Self {
            max_operations: config.max_operations,
            deadline: config.frame_deadline(),
            max_call_depth: config.max_call_depth,
            max_collection_size: config.max_collection_size,
        }
    }
}

/// Artifact-private key/value state that persists across frames
#[derive(Debug, Clone, Default)]
pub struct ScratchMemory {
    fields: Map,
}

impl ScratchMemory {
    /// Empty scratch memory
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level field value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Dynamic> {
        self.fields.get(key).map(|value| value.clone().flatten())
    }

    /// Top-level field as a number, if it holds one
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        let value = self.get(key)?;
        value
            .as_float()
            .ok()
            .or_else(|| value.as_int().ok().map(|i| i as f64))
    }

    /// Set a top-level field
    pub fn set(&mut self, key: &str, value: Dynamic) {
        self.fields.insert(key.into(), value);
    }

    /// Number of top-level fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field has been written
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All top-level fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Map {
        &self.fields
    }

    pub(crate) fn take(&mut self) -> Map {
        std::mem::take(&mut self.fields)
    }

    pub(crate) fn restore(&mut self, fields: Map) {
        self.fields = fields;
    }
}

/// Compiles artifacts into runnable programs
#[derive(Debug, Clone, Default)]
pub struct SandboxExecutor {
    limits: ExecutionLimits,
}

impl SandboxExecutor {
    /// Create an executor with explicit limits
    #[inline]
    #[must_use]
    pub fn new(limits: ExecutionLimits) -> Self {
        Self { limits }
    }

    /// Create an executor from sandbox configuration
    #[inline]
    #[must_use]
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(ExecutionLimits::from(config))
    }

    /// Active limits
    #[inline]
    #[must_use]
    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    /// Compile both fragments. No artifact code runs here.
    ///
    /// # Errors
    /// Returns `SandboxError::Compile` naming the first fragment that fails
    pub fn compile(&self, artifact: &Artifact) -> Result<CompiledProgram, SandboxError> {
        let deadline = Arc::new(Mutex::new(None));
        let engine = build_engine(&self.limits, Arc::clone(&deadline));

        let init = compile_fragment(&engine, Phase::Init, artifact.init())?;
        let update = compile_fragment(&engine, Phase::Update, artifact.update())?;

        Ok(CompiledProgram {
            engine,
            init,
            update,
            deadline,
            limits: self.limits,
        })
    }
}

fn compile_fragment(engine: &Engine, phase: Phase, source: &str) -> Result<AST, SandboxError> {
    engine.compile(source).map_err(|err| SandboxError::Compile {
        phase,
        message: err.to_string(),
    })
}

fn build_engine(limits: &ExecutionLimits, deadline: Arc<Mutex<Option<Instant>>>) -> Engine {
    let mut engine = Engine::new();

    engine
        .set_max_operations(limits.max_operations)
        .set_max_call_levels(limits.max_call_depth)
        .set_max_expr_depths(limits.max_call_depth, limits.max_call_depth)
        .set_max_string_size(limits.max_collection_size)
        .set_max_array_size(limits.max_collection_size)
        .set_max_map_size(limits.max_collection_size)
        .set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");

    engine.on_print(|text| tracing::trace!(target: "arcade::script", "{text}"));
    engine.on_debug(|text, _source, pos| {
        tracing::trace!(target: "arcade::script", position = %pos, "{text}");
    });
    engine.on_progress(move |ops| {
        if ops % DEADLINE_CHECK_INTERVAL != 0 {
            return None;
        }
        match *deadline.lock() {
            Some(at) if Instant::now() >= at => Some(Dynamic::UNIT),
            _ => None,
        }
    });

    surface::register(&mut engine);
    engine
}

/// An artifact compiled and ready to run
pub struct CompiledProgram {
    engine: Engine,
    init: AST,
    update: AST,
    deadline: Arc<Mutex<Option<Instant>>>,
    limits: ExecutionLimits,
}

impl CompiledProgram {
    /// Run the initializer once
    ///
    /// # Errors
    /// Returns `SandboxError::Runtime` with phase `init` if anything escapes
    pub fn setup(&self, surface: &mut Surface, scratch: &mut ScratchMemory) -> Result<(), SandboxError> {
        self.call(Phase::Init, surface, scratch, None)
    }

    /// Run the updater for one frame
    ///
    /// # Errors
    /// Returns `SandboxError::Runtime` with phase `update`; the caller
    /// attaches the frame index
    pub fn frame(
        &self,
        surface: &mut Surface,
        scratch: &mut ScratchMemory,
        input: &InputSnapshot,
    ) -> Result<(), SandboxError> {
        self.call(Phase::Update, surface, scratch, Some(input))
    }

    fn call(
        &self,
        phase: Phase,
        surface: &mut Surface,
        scratch: &mut ScratchMemory,
        input: Option<&InputSnapshot>,
    ) -> Result<(), SandboxError> {
        let ast = match phase {
            Phase::Init => &self.init,
            Phase::Update => &self.update,
        };

        let mut scope = Scope::new();
        scope.push("surface", surface.clone());
        scope.push("scratch", scratch.take());
        if let Some(input) = input {
            scope.push_constant("input", input.to_map());
        }

        *self.deadline.lock() = self.limits.deadline.map(|limit| Instant::now() + limit);
        let outcome = self.engine.run_ast_with_scope(&mut scope, ast);
        *self.deadline.lock() = None;

        if let Some(drawn) = read_back::<Surface>(&scope, "surface") {
            *surface = drawn;
        }
        let fields = read_back::<Map>(&scope, "scratch");
        let rebound = fields.is_none();
        scratch.restore(fields.unwrap_or_default());

        outcome.map_err(|err| SandboxError::Runtime {
            phase,
            frame: None,
            message: self.describe(*err),
        })?;

        if rebound {
            return Err(SandboxError::Runtime {
                phase,
                frame: None,
                message: "`scratch` was rebound to a non-map value".to_string(),
            });
        }
        Ok(())
    }

    fn describe(&self, err: EvalAltResult) -> String {
        match err {
            EvalAltResult::ErrorTerminated(..) => {
                let millis = self.limits.deadline.map_or(0, |d| d.as_millis());
                format!("exceeded the {millis}ms wall-clock deadline")
            }
            EvalAltResult::ErrorTooManyOperations(..) => {
                format!("exceeded the budget of {} operations", self.limits.max_operations)
            }
            other => other.to_string(),
        }
    }
}

fn read_back<T: Clone + Send + Sync + 'static>(scope: &Scope<'_>, name: &str) -> Option<T> {
    scope.get(name).and_then(|value| value.clone().flatten().try_cast::<T>())
}

impl fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn program(init: &str, update: &str) -> CompiledProgram {
        SandboxExecutor::default()
            .compile(&Artifact::new("T", "", init, update))
            .unwrap()
    }

    fn surface() -> Surface {
        Surface::new(800.0, 600.0)
    }

    #[test]
    fn scratch_persists_across_calls() {
        let program = program("scratch.count = 0;", "scratch.count += 1;");
        let mut surface = surface();
        let mut scratch = ScratchMemory::new();
        let input = InputSnapshot::centered(800.0, 600.0);

        program.setup(&mut surface, &mut scratch).unwrap();
        for _ in 0..5 {
            program.frame(&mut surface, &mut scratch, &input).unwrap();
        }
        assert_eq!(scratch.get("count").unwrap().as_int().unwrap(), 5);
    }

    #[test]
    fn update_sees_input_and_draws() {
        let program = program(
            "scratch.x = 0.0;",
            "scratch.x = input.x; if input.keys[\"w\"] { scratch.up = true; } surface.fill_rect(input.x, input.y, 10, 10);",
        );
        let mut surface = surface();
        let mut scratch = ScratchMemory::new();
        let input = InputSnapshot::centered(800.0, 600.0);

        program.setup(&mut surface, &mut scratch).unwrap();
        program.frame(&mut surface, &mut scratch, &input).unwrap();

        assert_eq!(scratch.number("x"), Some(400.0));
        assert!(scratch.get("up").is_none());
        assert_eq!(surface.draw_calls(), 1);
    }

    #[test]
    fn compile_error_names_phase() {
        let err = SandboxExecutor::default()
            .compile(&Artifact::new("T", "", "scratch.a = 1;", "let = ;"))
            .unwrap_err();
        assert!(matches!(err, SandboxError::Compile { phase: Phase::Update, .. }));
    }

    #[test]
    fn undefined_name_is_runtime_error() {
        let program = program("canvas.width;", "");
        let err = program.setup(&mut surface(), &mut ScratchMemory::new()).unwrap_err();
        match err {
            SandboxError::Runtime { phase, message, .. } => {
                assert_eq!(phase, Phase::Init);
                assert!(message.contains("canvas"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn scratch_survives_a_failed_call() {
        let program = program("scratch.a = 1;", "scratch.b = 2; throw \"boom\";");
        let mut surface = surface();
        let mut scratch = ScratchMemory::new();
        program.setup(&mut surface, &mut scratch).unwrap();

        let err = program
            .frame(&mut surface, &mut scratch, &InputSnapshot::centered(800.0, 600.0))
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(scratch.number("a"), Some(1.0));
    }

    #[test]
    fn rebinding_scratch_is_an_error() {
        let program = program("scratch = 5;", "");
        let mut scratch = ScratchMemory::new();
        let err = program.setup(&mut surface(), &mut scratch).unwrap_err();
        assert!(err.to_string().contains("rebound"));
        assert!(scratch.is_empty());
    }

    #[test]
    fn operation_budget_stops_infinite_loop() {
        let executor = SandboxExecutor::new(ExecutionLimits {
            max_operations: 10_000,
            deadline: None,
            ..ExecutionLimits::default()
        });
        let program = executor.compile(&Artifact::new("T", "", "let n = 0; loop { n += 1; }", "")).unwrap();
        let err = program.setup(&mut surface(), &mut ScratchMemory::new()).unwrap_err();
        assert!(err.to_string().contains("budget of 10000 operations"));
    }

    #[test]
    fn deadline_stops_infinite_loop() {
        let executor = SandboxExecutor::new(ExecutionLimits {
            max_operations: 0,
            deadline: Some(Duration::from_millis(20)),
            ..ExecutionLimits::default()
        });
        let program = executor.compile(&Artifact::new("T", "", "let n = 0; loop { n += 1; }", "")).unwrap();
        let err = program.setup(&mut surface(), &mut ScratchMemory::new()).unwrap_err();
        assert!(err.to_string().contains("20ms wall-clock deadline"));
    }

    #[test]
    fn eval_is_unavailable() {
        let compiled = SandboxExecutor::default().compile(&Artifact::new("T", "", "eval(\"1\");", ""));
        let rejected = match compiled {
            Err(_) => true,
            Ok(program) => program.setup(&mut surface(), &mut ScratchMemory::new()).is_err(),
        };
        assert!(rejected);
    }

    #[test]
    fn modules_cannot_be_imported() {
        let program = program("import \"os\" as os;", "");
        assert!(program.setup(&mut surface(), &mut ScratchMemory::new()).is_err());
    }

    #[test]
    fn clock_is_unavailable() {
        let program = program("let t = timestamp(); scratch.elapsed = t.elapsed;", "");
        let mut scratch = ScratchMemory::new();
        let err = program.setup(&mut surface(), &mut scratch).unwrap_err();
        assert!(err.to_string().contains("timestamp"), "{err}");
        assert!(scratch.get("elapsed").is_none());
    }

    #[test]
    fn input_cannot_be_rebound() {
        let program = program("", "input = #{ x: 0.0, y: 0.0 };");
        let input = InputSnapshot::centered(800.0, 600.0);
        let err = program
            .frame(&mut surface(), &mut ScratchMemory::new(), &input)
            .unwrap_err();
        assert!(matches!(err, SandboxError::Runtime { phase: Phase::Update, .. }));
        assert_eq!(input, InputSnapshot::centered(800.0, 600.0));
    }
}
