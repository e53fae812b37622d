//! Core implementation of the sketch VM. The main usage of this crate is to
//! load a pre-parsed, compact-binary AST of an Arduino-dialect sketch and
//! drive it to completion (or to the next suspension point), emitting a
//! deterministic stream of [Command]s for a host simulator to replay.
//!
//! ```
//! use sketch_vm::{Interpreter, InterpreterOptions};
//!
//! # fn example(ast_bytes: &[u8]) -> sketch_vm::Result<()> {
//! let mut interp = Interpreter::create(ast_bytes, InterpreterOptions::default())?;
//! interp.on_command(|cmd| println!("{}", cmd.to_json_string()));
//! interp.start();
//! # Ok(())
//! # }
//! ```

#![deny(unused_must_use, unused_imports)]

pub mod ast;
mod command;
mod consts;
mod error;
mod eval;
mod interpreter;
mod intrinsics;
mod loader;
mod rng;
mod scope;
mod stmt;
mod suspend;
mod value;

pub use ast::Ast;
pub use command::{Command, FieldValue};
pub use consts::{DEFAULT_MAX_LOOP_ITERATIONS, MAX_CALL_DEPTH};
pub use error::{AstFormatError, ErrorKind, InterpreterError};
pub use interpreter::{Interpreter, InterpreterOptions, Result};
pub use loader::load;
pub use suspend::State;
pub use value::Value;
