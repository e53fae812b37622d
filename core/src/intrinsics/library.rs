//! Library registry: a fixed catalogue of known Arduino library classes,
//! each exposing *internal* methods (computed locally, return a value,
//! emit no command, e.g. `Adafruit_NeoPixel::numPixels`/`getBrightness`/
//! `Color`), *external* methods (always emit a library command for the
//! host to handle), and *static* methods (callable via `Class::method`
//! without an instance).
//!
//! This module implements `Adafruit_NeoPixel` by name plus one more
//! instance-method class (`Servo`) to exercise the same routing rule
//! against library state that lives on the object rather than being
//! purely a function of its arguments.

use std::rc::Rc;

use crate::interpreter::Interpreter;
use crate::scope::Variable;
use crate::suspend::Unwind;
use crate::value::{coerce_int, strip_type_modifiers, StructHandle, Value};

const KNOWN_CLASSES: &[&str] = &["Adafruit_NeoPixel", "Servo"];

/// Resolves `object` (an identifier text, which may itself be a class name
/// for a `Class::method` static call, or a variable holding an instance)
/// to a known library class name.
fn resolve_class(interp: &Interpreter, object: &str) -> Option<&'static str> {
    if let Some(&class) = KNOWN_CLASSES.iter().find(|&&c| c == object) {
        return Some(class);
    }
    let declared = strip_type_modifiers(&interp.scope.lookup(object)?.declared_type);
    KNOWN_CLASSES.iter().find(|&&c| c == declared).copied()
}

fn instance_struct(interp: &Interpreter, object: &str) -> Option<StructHandle> {
    match interp.scope.resolve_value(object)? {
        Value::Struct(s) => Some(Rc::clone(s)),
        _ => None,
    }
}

pub(crate) fn dispatch(
    interp: &mut Interpreter,
    object: &str,
    method: &str,
    args: &[Value],
) -> Result<Option<Value>, Unwind> {
    let Some(class) = resolve_class(interp, object) else {
        return Ok(None);
    };
    match class {
        "Adafruit_NeoPixel" => neopixel(interp, object, method, args),
        "Servo" => servo(interp, object, method, args),
        _ => Ok(None),
    }
}

fn neopixel(
    interp: &mut Interpreter,
    object: &str,
    method: &str,
    args: &[Value],
) -> Result<Option<Value>, Unwind> {
    match method {
        // Static/internal: packs RGB into 0xRRGGBB, a pure function of
        // its arguments that returns a value and emits no command.
        "Color" => {
            let r = args.first().map(coerce_int).unwrap_or(0) & 0xFF;
            let g = args.get(1).map(coerce_int).unwrap_or(0) & 0xFF;
            let b = args.get(2).map(coerce_int).unwrap_or(0) & 0xFF;
            Ok(Some(Value::Int((r << 16) | (g << 8) | b)))
        }
        "numPixels" => {
            let count = instance_struct(interp, object)
                .and_then(|s| s.borrow().fields.get("arg0").map(coerce_int))
                .unwrap_or(0);
            Ok(Some(Value::Int(count)))
        }
        "getBrightness" => {
            let brightness = instance_struct(interp, object)
                .and_then(|s| s.borrow().fields.get("brightness").map(coerce_int))
                .unwrap_or(255);
            Ok(Some(Value::Int(brightness)))
        }
        "setBrightness" => {
            if let Some(s) = instance_struct(interp, object) {
                let value = args.first().cloned().unwrap_or(Value::Int(255));
                s.borrow_mut().fields.insert("brightness".to_string(), value);
            }
            emit_library_call(interp, object, method, args);
            Ok(Some(Value::Void))
        }
        "begin" | "show" | "clear" | "setPixelColor" | "fill" => {
            emit_library_call(interp, object, method, args);
            Ok(Some(Value::Void))
        }
        _ => Ok(None),
    }
}

fn servo(
    interp: &mut Interpreter,
    object: &str,
    method: &str,
    args: &[Value],
) -> Result<Option<Value>, Unwind> {
    match method {
        "read" => {
            let angle = instance_struct(interp, object)
                .and_then(|s| s.borrow().fields.get("angle").map(coerce_int))
                .unwrap_or(0);
            Ok(Some(Value::Int(angle)))
        }
        "write" | "writeMicroseconds" => {
            if let Some(s) = instance_struct(interp, object) {
                let value = args.first().cloned().unwrap_or(Value::Int(0));
                s.borrow_mut().fields.insert("angle".to_string(), value);
            } else {
                // The declared variable never ran through a constructor
                // call (e.g. `Servo myServo;` with no initializer); back
                // it with a fresh struct so state has somewhere to live.
                let mut fields = std::collections::HashMap::new();
                if let Some(v) = args.first() {
                    fields.insert("angle".to_string(), v.clone());
                }
                let value = Value::Struct(Rc::new(std::cell::RefCell::new(
                    crate::value::StructValue {
                        type_name: "Servo".to_string(),
                        fields,
                    },
                )));
                interp
                    .scope
                    .declare(Variable::new(object, value, "Servo"));
            }
            emit_library_call(interp, object, method, args);
            Ok(Some(Value::Void))
        }
        "attach" | "detach" | "attached" => {
            emit_library_call(interp, object, method, args);
            Ok(Some(Value::Void))
        }
        _ => Ok(None),
    }
}

fn emit_library_call(interp: &mut Interpreter, object: &str, method: &str, args: &[Value]) {
    super::emit_function_call(interp, &format!("{object}.{method}"), args);
}
