//! Execution Driver.
//!
//! Owns every piece of interpreter state and exposes the host API
//! surface: `create`, `start`, `stop`, `pause`, `resume`, `step`, `tick`,
//! `on_command`, `handle_response`/`resume_with_value`.

use std::collections::HashMap;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::ast::{Ast, AstNode, NodeKind};
use crate::command::Command;
use crate::consts::{ARDUINO_CONSTANTS, DEFAULT_MAX_LOOP_ITERATIONS, MAX_CALL_DEPTH};
use crate::error::InterpreterError;
use crate::loader;
use crate::rng::Rng;
use crate::scope::{ScopeStack, Variable};
use crate::suspend::{PendingRequest, State, Unwind};
use crate::value::Value;

pub type Result<T> = std::result::Result<T, InterpreterError>;

/// Options accepted by `create`, plus `random_seed` (see DESIGN.md for
/// the seeding rationale) and `memory_budget_bytes` (a concrete number
/// for the memory budget enforced during allocation).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterOptions {
    pub verbose: bool,
    pub debug: bool,
    /// Advisory; not enforced by the core.
    pub step_delay: Option<u64>,
    pub max_loop_iterations: usize,
    /// Advisory; not enforced by the core.
    pub request_timeout: Option<u64>,
    pub enable_serial: bool,
    pub enable_pins: bool,
    pub random_seed: Option<u64>,
    pub memory_budget_bytes: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        InterpreterOptions {
            verbose: false,
            debug: false,
            step_delay: None,
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            request_timeout: None,
            enable_serial: true,
            enable_pins: true,
            random_seed: None,
            memory_budget_bytes: 2048,
        }
    }
}

/// Which top-level unit of work the driver is currently running or
/// suspended in the middle of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DriverPhase {
    NotStarted,
    Setup,
    Loop(i64),
    Finished,
}

/// The replay state for one unit of work (one `setup()` run, or one
/// `loop()` iteration). See the module doc on `suspend.rs`.
#[derive(Default)]
pub(crate) struct UnitState {
    pub response_tape: Vec<Value>,
    pub replay_cursor: usize,
    pub emit_watermark: usize,
    pub emit_count: usize,
    /// Interpreter-global mutable state as it stood the first time this
    /// unit started running, captured so every replay attempt (triggered
    /// by a resume) can be rewound back onto it before re-executing the
    /// body from the top. Without this, state that advances as a side
    /// effect of plain statement execution (the virtual clock, the PRNG,
    /// the memory budget counter, the allocator counters, and any variable
    /// write reaching outside the unit's own frame) would be applied twice
    /// for everything before the next unresolved request.
    pub snapshot: Option<UnitSnapshot>,
}

/// See [`UnitState::snapshot`].
#[derive(Clone)]
pub(crate) struct UnitSnapshot {
    pub clock_ms: i64,
    pub rng: Rng,
    pub memory_used: usize,
    pub new_alloc_counter: u64,
    pub malloc_counter: u64,
    /// Every frame below the unit's own (globals, enclosing function
    /// frames) plus the statics table, as they stood before the unit's
    /// first attempt. `run_unit` restores this ahead of the unit's own
    /// `scope.push()`, so a global or `static` write made by an
    /// already-replayed prefix doesn't get applied a second time.
    pub scope: ScopeStack,
}

/// Per-call-frame `switch` context: the discriminant and whether
/// fallthrough mode is currently active.
pub(crate) struct SwitchContext {
    pub value: Value,
    pub fallthrough: bool,
}

pub struct Interpreter {
    pub(crate) ast: Option<Ast>,
    pub(crate) functions: HashMap<String, AstNode>,
    pub(crate) scope: ScopeStack,
    pub(crate) options: InterpreterOptions,
    pub(crate) rng: Rng,

    pub(crate) state: State,
    pub(crate) driver_phase: DriverPhase,
    pub(crate) unit: Option<UnitState>,
    pub(crate) pending_request: PendingRequestSlot,
    pub(crate) queued_responses: HashMap<String, Value>,
    pub(crate) paused_requested: bool,

    pub(crate) commands: Vec<Command>,
    on_command: Option<Box<dyn FnMut(&Command)>>,

    /// Virtual monotonic clock, in milliseconds. Advanced explicitly by
    /// timing intrinsics rather than read from the OS clock, so that two
    /// runs given the same input AST and the same response sequence
    /// serialize identically; wall-clock time is inherently
    /// nondeterministic and would break that property.
    pub(crate) clock_ms: i64,
    pub(crate) request_nonce: u64,

    pub(crate) call_depth: usize,
    pub(crate) switch_stack: Vec<SwitchContext>,

    pub(crate) new_alloc_counter: u64,
    pub(crate) malloc_counter: u64,
    pub(crate) memory_used: usize,
    pub(crate) safe_mode: bool,
}

pub(crate) type PendingRequestSlot = Option<PendingRequest>;

impl Interpreter {
    /// Constructs an interpreter from a compact AST buffer. Pre-declares
    /// the Arduino constants and seeds the PRNG. Loader failures are
    /// returned, not panicked on.
    pub fn create(ast_bytes: &[u8], options: InterpreterOptions) -> Result<Self> {
        let ast = loader::load(ast_bytes)?;
        Ok(Self::from_ast(ast, options))
    }

    /// Constructs an interpreter from an already-decoded tree, for hosts
    /// that performed the loader step themselves.
    pub fn from_ast(ast: Ast, options: InterpreterOptions) -> Self {
        let rng = Rng::new(options.random_seed);
        let mut scope = ScopeStack::new();
        for (name, value) in ARDUINO_CONSTANTS {
            let mut var = Variable::new(*name, Value::Int(*value), "int");
            var.is_const = true;
            scope.declare(var);
        }
        Interpreter {
            ast: Some(ast),
            functions: HashMap::new(),
            scope,
            options,
            rng,
            state: State::Idle,
            driver_phase: DriverPhase::NotStarted,
            unit: None,
            pending_request: None,
            queued_responses: HashMap::new(),
            paused_requested: false,
            commands: Vec::new(),
            on_command: None,
            clock_ms: 0,
            request_nonce: 0,
            call_depth: 0,
            switch_stack: Vec::new(),
            new_alloc_counter: crate::consts::NEW_ALLOC_COUNTER_START,
            malloc_counter: crate::consts::MALLOC_COUNTER_START,
            memory_used: 0,
            safe_mode: false,
        }
    }

    /// Registers the sink that receives every emitted command.
    pub fn on_command(&mut self, cb: impl FnMut(&Command) + 'static) {
        self.on_command = Some(Box::new(cb));
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The request id the driver is currently waiting on, if any. Hosts
    /// read this to know which id to pass back to
    /// `resume_with_value`/`handle_response`.
    pub fn pending_request_id(&self) -> Option<&str> {
        self.pending_request.as_ref().map(|p| p.request_id.as_str())
    }

    /// `start()`: idempotent once running. Runs to completion or the
    /// first suspension point.
    pub fn start(&mut self) -> bool {
        if self.state != State::Idle {
            return true;
        }
        debug!("starting interpreter");
        self.state = State::Running;
        self.emit_now(Command::new("VERSION_INFO", self.clock_ms).with("component", "sketch_vm").with("version", "1.0.0").with("status", "ok"));
        self.emit_now(Command::new("PROGRAM_START", self.clock_ms).with("message", "Program execution started"));
        self.collect_functions();
        self.drive();
        true
    }

    pub fn stop(&mut self) {
        debug!("stopping interpreter, was {:?}", self.state);
        self.state = State::Idle;
        self.pending_request = None;
        self.queued_responses.clear();
        self.unit = None;
        self.driver_phase = DriverPhase::NotStarted;
        self.paused_requested = false;
        self.break_flag_reset();
    }

    pub fn pause(&mut self) {
        if matches!(self.state, State::Running) {
            self.paused_requested = true;
        }
    }

    /// Un-pauses and resumes automatic driving. The state-control
    /// overload, distinct from `resume_with_value`.
    pub fn resume(&mut self) {
        if self.state == State::Paused {
            self.paused_requested = false;
            self.state = State::Running;
            self.drive();
        }
    }

    /// Advances exactly one unit of work (one `setup()` run or one `loop()`
    /// iteration), regardless of the pause flag.
    pub fn step(&mut self) {
        if !matches!(self.state, State::Paused | State::Running) {
            return;
        }
        let was_paused = self.state == State::Paused;
        self.state = State::Stepping;
        self.drive_one_unit();
        if self.state == State::Stepping {
            self.state = if was_paused { State::Paused } else { State::Running };
        }
    }

    /// `tick()`: if a queued response matches the current wait, consume
    /// it and continue; if paused/stepping, advance one unit; otherwise
    /// a no-op.
    pub fn tick(&mut self) {
        match self.state {
            State::WaitingForResponse => self.try_consume_queued(),
            State::Paused | State::Stepping => self.step(),
            _ => {}
        }
    }

    /// Delivers an externally-sourced value for `request_id`. A
    /// mismatched id is queued for later delivery rather than applied
    /// immediately.
    pub fn resume_with_value(&mut self, request_id: &str, value: Value) {
        self.queued_responses.insert(request_id.to_string(), value);
        if self.state == State::WaitingForResponse {
            self.try_consume_queued();
        }
    }

    /// Alias for [`resume_with_value`](Self::resume_with_value); hosts
    /// may call either name for the same operation.
    pub fn handle_response(&mut self, request_id: &str, value: Value) {
        self.resume_with_value(request_id, value);
    }

    fn try_consume_queued(&mut self) {
        let Some(pending) = self.pending_request.clone() else {
            return;
        };
        if let Some(value) = self.queued_responses.remove(&pending.request_id) {
            trace!("resolved request {}", pending.request_id);
            if let Some(unit) = self.unit.as_mut() {
                unit.response_tape.push(value);
            }
            self.pending_request = None;
            self.state = pending.prior_state;
            self.drive();
        } else {
            // Responses for stale/unknown ids are silently dropped; nothing
            // queued for the current wait yet, so just return.
        }
    }

    fn break_flag_reset(&mut self) {
        self.switch_stack.clear();
    }

    fn collect_functions(&mut self) {
        let Some(ast) = self.ast.as_ref() else { return };
        for child in &ast.root.children {
            if child.kind == NodeKind::FuncDef {
                if let Some(name_node) = child.child(0) {
                    self.functions.insert(name_node.text().to_string(), child.clone());
                }
            }
        }
    }

    fn next_request_id(&mut self, operation: &str) -> String {
        let nonce = self.request_nonce;
        self.request_nonce += 1;
        crate::suspend::format_request_id(operation, self.clock_ms, nonce)
    }

    /// Advances the virtual clock (the timing intrinsics `delay`/
    /// `delayMicroseconds`/`millis`/`micros` all read/advance this).
    pub(crate) fn advance_clock_ms(&mut self, ms: i64) {
        self.clock_ms = self.clock_ms.saturating_add(ms.max(0));
    }

    /// Emits a command, honoring the current unit's replay watermark: the
    /// first `emit_watermark` calls during a replay are swallowed because
    /// they were already delivered to the host on an earlier attempt at
    /// this same unit, so replays never duplicate the visible command
    /// stream.
    pub(crate) fn emit(&mut self, cmd: Command) {
        if let Some(unit) = self.unit.as_mut() {
            let idx = unit.emit_count;
            unit.emit_count += 1;
            if idx < unit.emit_watermark {
                return;
            }
        }
        self.emit_now(cmd);
    }

    fn emit_now(&mut self, cmd: Command) {
        if let Some(cb) = self.on_command.as_mut() {
            cb(&cmd);
        }
        self.commands.push(cmd);
    }

    /// Requests an externally-sourced value from a request intrinsic.
    /// Returns the cached value immediately if the current unit's
    /// response tape already has one for this call site (i.e. this is a
    /// replay past an already-resolved request); otherwise emits `cmd`
    /// (with `requestId` expected to already be set by the caller) and
    /// signals `Unwind::Suspend`.
    pub(crate) fn request_value(
        &mut self,
        operation: &str,
        make_command: impl FnOnce(&mut Self, &str) -> Command,
    ) -> crate::suspend::EvalResult {
        let unit = self.unit.get_or_insert_with(UnitState::default);
        if unit.replay_cursor < unit.response_tape.len() {
            let value = unit.response_tape[unit.replay_cursor].clone();
            unit.replay_cursor += 1;
            return Ok(value);
        }
        let request_id = self.next_request_id(operation);
        let cmd = make_command(self, &request_id);
        self.emit(cmd);
        self.pending_request = Some(PendingRequest {
            request_id,
            operation: operation.to_string(),
            prior_state: self.state,
        });
        self.state = State::WaitingForResponse;
        Err(Unwind::Suspend)
    }

    /// Runs (or re-runs, on replay) the current unit's body. Resets the
    /// per-attempt replay cursor and emit counter, then executes `body`.
    ///
    /// The first time a unit runs, its starting clock/rng/memory/allocator
    /// state is snapshotted. Every subsequent attempt (a replay driven by a
    /// resume) restores that snapshot before re-executing, so re-running the
    /// already-resolved prefix reproduces exactly the same side effects as
    /// the first attempt instead of applying them a second time.
    fn run_unit(&mut self, body: impl FnOnce(&mut Self) -> crate::suspend::ExecResult) -> UnitOutcome {
        let is_fresh = self.unit.is_none();
        if is_fresh {
            let snapshot = self.capture_snapshot();
            self.unit.get_or_insert_with(UnitState::default).snapshot = Some(snapshot);
        } else {
            let snapshot = self.unit.as_ref().and_then(|u| u.snapshot.clone());
            if let Some(snapshot) = snapshot {
                self.restore_snapshot(snapshot);
            }
        }
        {
            let unit = self.unit.get_or_insert_with(UnitState::default);
            unit.replay_cursor = 0;
            unit.emit_count = 0;
        }
        self.scope.push();
        let result = body(self);
        self.scope.pop();
        match result {
            Ok(()) => {
                self.unit = None;
                UnitOutcome::Done
            }
            Err(Unwind::Suspend) => {
                if let Some(unit) = self.unit.as_mut() {
                    unit.emit_watermark = unit.emit_count;
                }
                UnitOutcome::Suspended
            }
            Err(Unwind::Fatal(msg)) => UnitOutcome::Fatal(msg),
            Err(Unwind::Return(_)) => {
                self.unit = None;
                UnitOutcome::Done
            }
            Err(Unwind::Break) | Err(Unwind::Continue) => {
                self.report_error(&crate::error::ErrorKind::RuntimeError(
                    "break/continue used outside a loop".to_string(),
                ));
                self.unit = None;
                UnitOutcome::Done
            }
        }
    }

    /// The automatic drive pump: advances through phases/iterations until
    /// the program completes, hits a fatal error, or suspends on a
    /// request. Stops early if a `pause()` request is pending.
    fn drive(&mut self) {
        loop {
            if self.state == State::WaitingForResponse || self.state == State::Complete || self.state == State::Error || self.state == State::Idle {
                return;
            }
            if self.paused_requested {
                self.state = State::Paused;
                return;
            }
            if !self.advance_one_step() {
                return;
            }
        }
    }

    fn drive_one_unit(&mut self) {
        self.advance_one_step();
    }

    /// Executes exactly one phase-advancing step (run/resume `setup()`, or
    /// run/resume one `loop()` iteration). Returns `false` when the
    /// program has reached a terminal state this call.
    fn advance_one_step(&mut self) -> bool {
        match self.driver_phase.clone() {
            DriverPhase::NotStarted => {
                if self.functions.contains_key("setup") {
                    self.driver_phase = DriverPhase::Setup;
                    self.emit(Command::new("SETUP_START", self.clock_ms).with("message", "Starting setup()"));
                    self.run_phase_setup()
                } else {
                    self.driver_phase = DriverPhase::Loop(0);
                    true
                }
            }
            DriverPhase::Setup => self.run_phase_setup(),
            DriverPhase::Loop(i) => self.run_phase_loop(i),
            DriverPhase::Finished => false,
        }
    }

    fn run_phase_setup(&mut self) -> bool {
        let func = self.functions.get("setup").cloned();
        let Some(func) = func else {
            self.driver_phase = DriverPhase::Loop(0);
            return true;
        };
        let body = func.children.last().cloned().unwrap_or_else(|| func.clone());
        let outcome = self.run_unit(|me| me.exec_block(&body.children));
        match outcome {
            UnitOutcome::Done => {
                self.emit(Command::new("SETUP_END", self.clock_ms).with("message", "setup() completed"));
                self.driver_phase = DriverPhase::Loop(0);
                true
            }
            UnitOutcome::Suspended => false,
            UnitOutcome::Fatal(msg) => {
                self.fail(msg);
                false
            }
        }
    }

    fn run_phase_loop(&mut self, i: i64) -> bool {
        if !self.functions.contains_key("loop") {
            self.emit(Command::new("PROGRAM_END", self.clock_ms).with("message", "Program completed: no loop() function defined"));
            self.state = State::Complete;
            self.driver_phase = DriverPhase::Finished;
            return false;
        }
        if i == 0 {
            self.emit(Command::new("LOOP_START", self.clock_ms).with("message", "Starting loop() execution"));
            self.driver_phase = DriverPhase::Loop(1);
            return true;
        }
        let max = self.options.max_loop_iterations as i64;
        if i > max {
            self.driver_phase = DriverPhase::Finished;
            self.state = State::Complete;
            return false;
        }
        // A suspended iteration re-enters this function on resume with the
        // same `i` (driver_phase stays `Loop(i)` across the wait, see the
        // `Suspended` arm below) and `self.unit` still holding that
        // iteration's in-progress replay state. Only emit LOOP_START the
        // first time this iteration is entered, not on every resume, or the
        // host sees two LOOP_START(i) events paired with one closing tag.
        let resuming = self.unit.is_some();
        if !resuming {
            self.emit(Command::new("LOOP_START", self.clock_ms).with("message", format!("Starting loop iteration {i}")));
        }
        let func = self.functions.get("loop").cloned().expect("checked above");
        let body = func.children.last().cloned().unwrap_or_else(|| func.clone());
        let outcome = self.run_unit(|me| me.exec_block(&body.children));
        match outcome {
            UnitOutcome::Suspended => {
                self.driver_phase = DriverPhase::Loop(i);
                false
            }
            UnitOutcome::Fatal(msg) => {
                self.fail(msg);
                false
            }
            UnitOutcome::Done => {
                let limit_reached = i == max;
                let message = if limit_reached {
                    format!("Maximum loop iterations ({max}) reached")
                } else {
                    format!("Loop iteration {i} completed")
                };
                self.emit(
                    Command::new("LOOP_END_COMPLETE", self.clock_ms)
                        .with("iterations", i as i32)
                        .with("limitReached", limit_reached)
                        .with("message", message),
                );
                if limit_reached {
                    self.emit(Command::new("PROGRAM_END", self.clock_ms).with(
                        "message",
                        format!("Program completed after {max} loop iterations (limit reached)"),
                    ));
                    self.emit(Command::new("PROGRAM_END", self.clock_ms).with("message", "Program execution stopped"));
                    self.state = State::Complete;
                    self.driver_phase = DriverPhase::Finished;
                    false
                } else {
                    self.driver_phase = DriverPhase::Loop(i + 1);
                    true
                }
            }
        }
    }

    fn fail(&mut self, message: String) {
        self.emit_now(Command::new("ERROR", self.clock_ms).with("errorType", "StackOverflowError").with("message", message));
        self.state = State::Error;
        self.driver_phase = DriverPhase::Finished;
        self.safe_mode = true;
    }

    fn capture_snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            clock_ms: self.clock_ms,
            rng: self.rng.clone(),
            memory_used: self.memory_used,
            new_alloc_counter: self.new_alloc_counter,
            malloc_counter: self.malloc_counter,
            scope: self.scope.clone(),
        }
    }

    fn restore_snapshot(&mut self, snapshot: UnitSnapshot) {
        self.clock_ms = snapshot.clock_ms;
        self.rng = snapshot.rng;
        self.memory_used = snapshot.memory_used;
        self.new_alloc_counter = snapshot.new_alloc_counter;
        self.malloc_counter = snapshot.malloc_counter;
        self.scope = snapshot.scope;
    }

    /// Enters a memory budget check before allocating `size` bytes.
    /// Returns `false` (and leaves `memory_used` unchanged) if the
    /// allocation would overrun the budget.
    pub(crate) fn try_reserve_memory(&mut self, size: usize) -> bool {
        if self.memory_used + size > self.options.memory_budget_bytes {
            return false;
        }
        self.memory_used += size;
        true
    }

    /// Checks and increments call depth for a user-function invocation.
    /// Returns `false` on breach of the recursion cap.
    pub(crate) fn enter_call(&mut self) -> bool {
        if self.call_depth >= MAX_CALL_DEPTH {
            return false;
        }
        self.call_depth += 1;
        true
    }

    pub(crate) fn exit_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    /// Emits an `ERROR` command for a recoverable runtime diagnostic
    /// without aborting execution.
    pub(crate) fn report_error(&mut self, kind: &crate::error::ErrorKind) {
        self.emit(
            Command::new("ERROR", self.clock_ms)
                .with("errorType", kind.tag())
                .with("message", kind.to_string()),
        );
    }
}

enum UnitOutcome {
    Done,
    Suspended,
    Fatal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NumberPayload, Payload};

    /// A `Program` node with no children, standing in for an empty sketch.
    fn empty_program() -> Ast {
        Ast {
            root: AstNode::new(NodeKind::Program, 0, Payload::None, Vec::new()),
            strings: Vec::new(),
        }
    }

    fn ident(name: &str) -> AstNode {
        AstNode::leaf(NodeKind::Identifier, Payload::Str(name.to_string()))
    }

    fn loop_with_global_mutation() -> Ast {
        let increment = AstNode::new(
            NodeKind::Assignment,
            0,
            Payload::Operator("=".to_string()),
            vec![
                ident("c"),
                AstNode::new(
                    NodeKind::BinaryExpr,
                    0,
                    Payload::Operator("+".to_string()),
                    vec![ident("c"), AstNode::leaf(NodeKind::NumberLiteral, Payload::Number(NumberPayload::Int(1)))],
                ),
            ],
        );
        let read = AstNode::new(NodeKind::FuncCall, 0, Payload::None, vec![ident("analogRead"), ident("A0")]);
        let body = vec![
            AstNode::new(NodeKind::ExpressionStatement, 0, Payload::None, vec![increment]),
            AstNode::new(NodeKind::ExpressionStatement, 0, Payload::None, vec![read]),
        ];
        let loop_fn = AstNode::new(
            NodeKind::FuncDef,
            0,
            Payload::None,
            vec![ident("loop"), AstNode::new(NodeKind::CompoundStatement, 0, Payload::None, body)],
        );
        Ast {
            root: AstNode::new(NodeKind::Program, 0, Payload::None, vec![loop_fn]),
            strings: Vec::new(),
        }
    }

    /// A write to a global (frame 0) variable made before a suspending
    /// request, when the iteration resumes and replays its prefix, must
    /// not be applied a second time.
    #[test]
    fn test_global_write_not_reapplied_across_suspend() {
        let mut options = InterpreterOptions::default();
        options.max_loop_iterations = 1;
        let mut interp = Interpreter::from_ast(loop_with_global_mutation(), options);
        interp.scope.declare(Variable::new("c", Value::Int(0), "int"));
        interp.start();

        assert_eq!(interp.state(), State::WaitingForResponse);
        let request_id = interp.pending_request_id().unwrap().to_string();
        interp.resume_with_value(&request_id, Value::Int(512));

        assert_eq!(interp.state(), State::Complete);
        assert!(matches!(interp.scope.lookup("c"), Some(v) if matches!(v.value, Value::Int(1))));
    }

    #[test]
    fn test_create_predeclares_constants() {
        let interp = Interpreter::from_ast(empty_program(), InterpreterOptions::default());
        assert!(interp.scope.exists("HIGH"));
        assert!(interp.scope.exists("LED_BUILTIN"));
    }

    #[test]
    fn test_start_emits_prelude_and_completes_with_no_functions() {
        let mut interp = Interpreter::from_ast(empty_program(), InterpreterOptions::default());
        interp.start();
        let tags: Vec<&str> = interp.commands().iter().map(|c| c.command_type()).collect();
        assert_eq!(tags[0], "VERSION_INFO");
        assert_eq!(tags[1], "PROGRAM_START");
        assert!(tags.contains(&"PROGRAM_END"));
    }
}
