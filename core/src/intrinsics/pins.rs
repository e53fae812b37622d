//! Pin intrinsics: `pinMode`, `digitalWrite`, `analogWrite` emit
//! immediate commands; `digitalRead`/`analogRead` are request
//! intrinsics that suspend.

use crate::command::Command;
use crate::interpreter::Interpreter;
use crate::suspend::Unwind;
use crate::value::{coerce_int, Value};

pub(crate) fn dispatch(
    interp: &mut Interpreter,
    name: &str,
    args: &[Value],
) -> Result<Option<Value>, Unwind> {
    let pin = || args.first().map(coerce_int).unwrap_or(0);
    match name {
        "pinMode" => {
            let mode = args.get(1).map(coerce_int).unwrap_or(0);
            interp.emit(Command::new("PIN_MODE", interp.clock_ms).with("pin", pin()).with("mode", mode));
            Ok(Some(Value::Void))
        }
        "digitalWrite" => {
            let value = args.get(1).map(coerce_int).unwrap_or(0);
            interp.emit(Command::new("DIGITAL_WRITE", interp.clock_ms).with("pin", pin()).with("value", value));
            Ok(Some(Value::Void))
        }
        "analogWrite" => {
            let value = args.get(1).map(coerce_int).unwrap_or(0);
            interp.emit(Command::new("ANALOG_WRITE", interp.clock_ms).with("pin", pin()).with("value", value));
            Ok(Some(Value::Void))
        }
        "digitalRead" => {
            let p = pin();
            let v = interp.request_value("digitalRead", |me, id| {
                Command::new("DIGITAL_READ_REQUEST", me.clock_ms).with("pin", p).with("requestId", id.to_string())
            })?;
            Ok(Some(v))
        }
        "analogRead" => {
            let p = pin();
            let v = interp.request_value("analogRead", |me, id| {
                Command::new("ANALOG_READ_REQUEST", me.clock_ms).with("pin", p).with("requestId", id.to_string())
            })?;
            Ok(Some(v))
        }
        _ => Ok(None),
    }
}
