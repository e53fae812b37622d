#![deny(clippy::all)]

use anyhow::Context;
use sketch_vm::{Interpreter, InterpreterOptions, State, Value};
use std::{fs, path::PathBuf, process};
use structopt::StructOpt;

/// The sub-command to execute.
#[derive(Debug, StructOpt)]
enum Command {
    /// Load a compact-AST file and drive it to completion, printing each
    /// emitted command as one JSON line to stdout.
    #[structopt(name = "run")]
    Run {
        /// Path to the compact-AST binary file.
        #[structopt(parse(from_os_str), long = "ast", short = "a")]
        ast_path: PathBuf,
        /// Path to an `InterpreterOptions` JSON file. If not provided, the
        /// default options are used.
        #[structopt(parse(from_os_str), long = "options")]
        options_path: Option<PathBuf>,
        /// Path to a JSON array of canned values, delivered in order to
        /// every request intrinsic the sketch suspends on. Missing values
        /// default to `0`.
        #[structopt(parse(from_os_str), long = "responses")]
        responses_path: Option<PathBuf>,
    },
}

/// sketch_vm executable, for driving compact-AST sketches outside a host
/// simulator.
#[derive(Debug, StructOpt)]
#[structopt(name = "sketch_vm")]
struct Opt {
    #[structopt(subcommand)]
    cmd: Command,
}

fn read_file(path: &PathBuf) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read file {:?}", path))
}

fn load_options(path: &Option<PathBuf>) -> anyhow::Result<InterpreterOptions> {
    match path {
        None => Ok(InterpreterOptions::default()),
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read file {:?}", path))?;
            Ok(serde_json::from_str(&text)?)
        }
    }
}

fn load_responses(path: &Option<PathBuf>) -> anyhow::Result<Vec<Value>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read file {:?}", path))?;
    let raw: Vec<serde_json::Value> = serde_json::from_str(&text)?;
    Ok(raw.iter().map(json_to_value).collect())
}

/// Converts a JSON scalar from the canned-response file into a runtime
/// `Value`. Composite shapes (structs, arrays, pointers) aren't
/// representable as canned responses, since request intrinsics (`millis`,
/// `analogRead`, `Serial.read`, ...) only ever resolve to a scalar.
fn json_to_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Void,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i as i32)
            } else {
                Value::Double(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        _ => Value::Void,
    }
}

fn run(opt: Opt) -> anyhow::Result<()> {
    match opt.cmd {
        Command::Run {
            ast_path,
            options_path,
            responses_path,
        } => {
            let ast_bytes = read_file(&ast_path)?;
            let options = load_options(&options_path)?;
            let mut responses = load_responses(&responses_path)?.into_iter();

            let mut interp = Interpreter::create(&ast_bytes, options)
                .context("Failed to decode compact AST")?;
            interp.on_command(|cmd| println!("{}", cmd.to_json_string()));

            interp.start();
            while interp.state() == State::WaitingForResponse {
                let request_id = interp
                    .pending_request_id()
                    .expect("WaitingForResponse always carries a pending request")
                    .to_string();
                let value = responses.next().unwrap_or(Value::Int(0));
                interp.resume_with_value(&request_id, value);
            }

            if interp.state() == State::Error {
                anyhow::bail!("sketch execution ended in an error state");
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let exit_code = match run(Opt::from_args()) {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("{:#}", err);
            1
        }
    };
    process::exit(exit_code);
}
