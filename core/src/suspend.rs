//! Suspend/Resume State Machine.
//!
//! Request intrinsics (`analogRead`, `millis`, `Serial.read`, ...) cannot
//! produce a value locally; evaluating one must hand control back to the
//! host and later resume with a supplied value. Rather than threading a
//! hand-rolled continuation through every visitor call, each *unit* of
//! driver work (the `setup()` body, or one `loop()` iteration body) is
//! replayed from its own start whenever it resumes: a per-unit *response
//! tape* records resolved values in call order, and a request intrinsic
//! consults the tape before ever allocating a new request id. Commands
//! emitted during an early, already-completed segment of a replay are
//! suppressed by an emission watermark, so the visible command stream
//! never duplicates anything. Side effects that aren't commands (the
//! virtual clock, the PRNG, the memory budget, the allocator counters,
//! and scope/variable state outside the unit's own frame) are rewound to
//! the unit's starting snapshot before each replay, so re-executing the
//! already-resolved prefix reproduces rather than compounds them. See
//! `Interpreter::run_unit` in `interpreter.rs`.

use crate::value::Value;

/// Driver/interpreter state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    Paused,
    Stepping,
    WaitingForResponse,
    Complete,
    Error,
}

/// A request intrinsic's call awaiting a host-supplied value.
#[derive(Clone, Debug)]
pub struct PendingRequest {
    pub request_id: String,
    pub operation: String,
    pub prior_state: State,
}

/// Non-local control signals threaded through `eval`/`exec` via `Result`'s
/// `Err` arm: every fallible step returns a result variant. Recoverable
/// language errors (`DivisionByZero`, `UnknownSymbol`, ...) are NOT
/// represented here; they're turned into an `ERROR` command and a
/// default value at the point of detection instead, so execution can
/// simply continue. `Unwind` only carries signals that must unwind past
/// multiple call frames.
#[derive(Clone, Debug)]
pub enum Unwind {
    Break,
    Continue,
    Return(Value),
    /// A request intrinsic was reached with no cached response; the
    /// current unit's execution must stop here.
    Suspend,
    /// A fatal error (stack overflow, or a would-be double fault) that
    /// aborts the whole program.
    Fatal(String),
}

pub type EvalResult = Result<Value, Unwind>;
pub type ExecResult = Result<(), Unwind>;

/// Formats a request id: `"{operation}_{monotonic_ms}_{nonce}"`.
pub fn format_request_id(operation: &str, monotonic_ms: i64, nonce: u64) -> String {
    format!("{operation}_{monotonic_ms}_{nonce}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_format() {
        let id = format_request_id("analogRead", 1234, 7);
        assert_eq!(id, "analogRead_1234_7");
    }
}
