//! Serial intrinsics (`Serial` and `Serial1..3`): `begin`, `print`/
//! `println`, `write`, `flush`, `setTimeout` emit immediate commands;
//! `available`, `read`, `peek`, `readString`, `readStringUntil`,
//! `parseInt`, `parseFloat` are request intrinsics that suspend.

use crate::command::Command;
use crate::interpreter::Interpreter;
use crate::suspend::Unwind;
use crate::value::{coerce_int, coerce_string, Value};

pub(crate) fn is_serial_object(name: &str) -> bool {
    matches!(name, "Serial" | "Serial1" | "Serial2" | "Serial3")
}

pub(crate) fn dispatch(
    interp: &mut Interpreter,
    object: &str,
    name: &str,
    args: &[Value],
) -> Result<Option<Value>, Unwind> {
    match name {
        "begin" => {
            let baud = args.first().map(coerce_int).unwrap_or(9600);
            interp.emit(
                Command::new("FUNCTION_CALL", interp.clock_ms)
                    .with("function", format!("{object}.begin"))
                    .with("arguments", vec![crate::command::FieldValue::Int(baud)])
                    .with("baudRate", baud)
                    .with("message", format!("{object}.begin({baud})")),
            );
            Ok(Some(Value::Void))
        }
        "print" | "println" => {
            let data = args.first().map(coerce_string).unwrap_or_default();
            interp.emit(
                Command::new("FUNCTION_CALL", interp.clock_ms)
                    .with("function", format!("{object}.{name}"))
                    .with("arguments", vec![crate::command::FieldValue::Str(data.clone())])
                    .with("data", data.clone())
                    .with("message", format!("{object}.{name}({data})")),
            );
            Ok(Some(Value::Void))
        }
        "write" | "flush" | "setTimeout" => {
            super::emit_function_call(interp, &format!("{object}.{name}"), args);
            Ok(Some(Value::Void))
        }
        "available" | "read" | "peek" | "readString" | "parseInt" | "parseFloat" => {
            let op = format!("{object}.{name}");
            let v = interp.request_value(&op, |me, id| {
                Command::new("SERIAL_REQUEST", me.clock_ms)
                    .with("operation", op.clone())
                    .with("requestId", id.to_string())
                    .with("message", format!("Waiting for {op}"))
            })?;
            Ok(Some(v))
        }
        "readStringUntil" => {
            let terminator = args.first().map(coerce_string).unwrap_or_default();
            let op = format!("{object}.{name}");
            let v = interp.request_value(&op, |me, id| {
                Command::new("SERIAL_REQUEST", me.clock_ms)
                    .with("operation", op.clone())
                    .with("terminator", terminator.clone())
                    .with("requestId", id.to_string())
                    .with("message", format!("Waiting for {op}"))
            })?;
            Ok(Some(v))
        }
        _ => Ok(None),
    }
}
