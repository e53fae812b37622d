//! Interpreter-wide constants.

/// Default cap on `loop()` iterations before the driver forces termination.
/// Overridable via `InterpreterOptions::max_loop_iterations`.
pub const DEFAULT_MAX_LOOP_ITERATIONS: usize = 1000;

/// Maximum user-function call depth before a `StackOverflowError` is raised.
pub const MAX_CALL_DEPTH: usize = 100;

/// Cap on the number of iterations a range-for over an integer/double bound
/// will run.
pub const MAX_RANGE_FOR_ITERATIONS: i32 = 1000;

/// Pre-declared Arduino symbolic constants and their platform values.
/// Order doesn't matter; these are installed as const globals of type
/// `i32` at interpreter start.
pub const ARDUINO_CONSTANTS: &[(&str, i32)] = &[
    ("HIGH", 1),
    ("LOW", 0),
    ("INPUT", 0),
    ("OUTPUT", 1),
    ("INPUT_PULLUP", 2),
    ("LED_BUILTIN", 2),
    ("A0", 36),
    ("A1", 39),
    ("A2", 34),
    ("A3", 35),
    ("A4", 32),
    ("A5", 33),
];

/// First id handed out by `new T`.
pub const NEW_ALLOC_COUNTER_START: u64 = 1000;
/// First id handed out by `malloc(n)`.
pub const MALLOC_COUNTER_START: u64 = 2000;
