//! Audio intrinsics: `tone`/`noTone` emit immediate commands via the
//! generic `FUNCTION_CALL` record, same as `Serial`'s non-request
//! methods.

use crate::value::Value;
use crate::interpreter::Interpreter;

pub(crate) fn dispatch(interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<Value> {
    match name {
        "tone" | "noTone" => {
            super::emit_function_call(interp, name, args);
            Some(Value::Void)
        }
        _ => None,
    }
}
