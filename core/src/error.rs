//! Error types used throughout the interpreter.
//!
//! Two families exist, mirroring the teacher's split between compile-time
//! and runtime errors: [`AstFormatError`] covers failures while decoding
//! the compact AST (always fatal), and [`ErrorKind`] covers the
//! recoverable/fatal runtime diagnostics emitted as `ERROR` commands.
//! [`InterpreterError`] is the catch-all `Result` error for fallible
//! host-facing operations.

use thiserror::Error;

/// Failures while decoding a compact AST buffer. All of these are fatal:
/// the loader either produces a complete tree or none at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AstFormatError {
    #[error("bad magic number: expected 0x50545341, found {0:#010X}")]
    BadMagic(u32),
    #[error("unsupported AST version: {0:#06X}")]
    UnsupportedVersion(u16),
    #[error("AST declares zero nodes")]
    EmptyTree,
    #[error("string table offset {offset} is past the end of the buffer (len {len})")]
    StringTableOverrun { offset: usize, len: usize },
    #[error("node payload overruns the buffer at offset {offset}")]
    PayloadOverrun { offset: usize },
    #[error("unknown node kind tag {0:#04X}")]
    UnknownNodeKind(u8),
    #[error("unknown value type tag {0:#04X}")]
    UnknownValueType(u8),
    #[error("node tagged as a preprocessor directive; directives must be resolved upstream")]
    PreprocessorDirective,
    #[error("buffer truncated while reading {context}")]
    Truncated { context: &'static str },
}

/// Stable error-kind tags used by the `errorType` field of `ERROR`
/// commands. The `Display` impl is the human-readable `message` field.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("failed to parse AST: {0}")]
    ParseError(String),
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("type error: {0}")]
    TypeError(String),
    #[error("index out of bounds: {0}")]
    BoundsError(String),
    #[error("null pointer dereference: {0}")]
    NullPointerError(String),
    #[error("stack overflow: recursion depth exceeded {0}")]
    StackOverflowError(usize),
    #[error("memory budget exceeded: {0}")]
    MemoryError(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("preprocessor directive found in AST")]
    PreprocessorError,
    #[error("runtime error: {0}")]
    RuntimeError(String),
}

impl ErrorKind {
    /// The stable tag string used as the `errorType` field.
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::ParseError(_) => "ParseError",
            ErrorKind::UnknownSymbol(_) => "UnknownSymbol",
            ErrorKind::UnknownFunction(_) => "UnknownFunction",
            ErrorKind::TypeError(_) => "TypeError",
            ErrorKind::BoundsError(_) => "BoundsError",
            ErrorKind::NullPointerError(_) => "NullPointerError",
            ErrorKind::StackOverflowError(_) => "StackOverflowError",
            ErrorKind::MemoryError(_) => "MemoryError",
            ErrorKind::DivisionByZero => "DivisionByZero",
            ErrorKind::PreprocessorError => "PreprocessorError",
            ErrorKind::RuntimeError(_) => "RuntimeError",
        }
    }

    /// Whether this error kind is always fatal (stops the driver) rather
    /// than recoverable (continues execution with a default/void value).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorKind::StackOverflowError(_) | ErrorKind::PreprocessorError
        )
    }
}

/// Top-level error for fallible host-facing operations (loading a bad AST,
/// resuming an interpreter that isn't waiting, etc).
#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error(transparent)]
    Format(#[from] AstFormatError),
    #[error("no AST has been loaded")]
    NotLoaded,
    #[error("interpreter is not waiting for a response")]
    NotWaiting,
    #[error("request id {0} does not match the current wait")]
    RequestIdMismatch(String),
}

pub type Result<T> = std::result::Result<T, InterpreterError>;
