//! Timing intrinsics: `delay`/`delayMicroseconds` emit immediate
//! commands and advance the virtual clock; `millis`/`micros` are
//! request intrinsics that suspend.

use crate::command::Command;
use crate::interpreter::Interpreter;
use crate::suspend::Unwind;
use crate::value::{coerce_int, Value};

pub(crate) fn dispatch(
    interp: &mut Interpreter,
    name: &str,
    args: &[Value],
) -> Result<Option<Value>, Unwind> {
    match name {
        "delay" => {
            let ms = args.first().map(coerce_int).unwrap_or(0).max(0);
            interp.advance_clock_ms(ms as i64);
            interp.emit(Command::new("DELAY", interp.clock_ms).with("duration", ms).with("actualDelay", ms));
            Ok(Some(Value::Void))
        }
        "delayMicroseconds" => {
            let us = args.first().map(coerce_int).unwrap_or(0).max(0);
            interp.advance_clock_ms((us as i64) / 1000);
            interp.emit(Command::new("DELAY_MICROSECONDS", interp.clock_ms).with("duration", us));
            Ok(Some(Value::Void))
        }
        "millis" => {
            let v = interp.request_value("millis", |me, id| {
                Command::new("MILLIS_REQUEST", me.clock_ms).with("requestId", id.to_string())
            })?;
            Ok(Some(v))
        }
        "micros" => {
            let v = interp.request_value("micros", |me, id| {
                Command::new("MICROS_REQUEST", me.clock_ms).with("requestId", id.to_string())
            })?;
            Ok(Some(v))
        }
        _ => Ok(None),
    }
}
