//! Intrinsic Dispatcher.
//!
//! Dispatch order for an evaluated call: user function, then core
//! intrinsic by bare name, then library registry (`Class::method`
//! static, or `object.method` instance), then `UnknownFunction`.

mod audio;
mod ctype;
mod library;
mod math;
mod memory;
mod pins;
mod serial;
mod timing;

use crate::ast::AstNode;
use crate::command::Command;
use crate::error::ErrorKind;
use crate::scope::Variable;
use crate::suspend::{EvalResult, Unwind};
use crate::value::{default_for, Value};
use crate::interpreter::Interpreter;

impl Interpreter {
    /// The single entry point expression evaluation calls into for any
    /// function-call-shaped node.
    pub(crate) fn dispatch_call(
        &mut self,
        name: &str,
        object: Option<String>,
        args: Vec<Value>,
    ) -> EvalResult {
        if object.is_none() {
            if let Some(func) = self.functions.get(name).cloned() {
                return self.call_user_function(&func, args);
            }
            if let Some(v) = self.try_core_intrinsic(name, None, &args)? {
                return Ok(v);
            }
        } else if let Some(obj) = object.as_deref() {
            if let Some(v) = self.try_core_intrinsic(name, Some(obj), &args)? {
                return Ok(v);
            }
            if let Some(v) = library::dispatch(self, obj, name, &args)? {
                return Ok(v);
            }
        }
        let qualified = match &object {
            Some(o) => format!("{o}.{name}"),
            None => name.to_string(),
        };
        self.report_error(&ErrorKind::UnknownFunction(qualified));
        Ok(Value::Void)
    }

    fn try_core_intrinsic(
        &mut self,
        name: &str,
        object: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>, Unwind> {
        if let Some(v) = pins::dispatch(self, name, args)? {
            return Ok(Some(v));
        }
        if let Some(v) = timing::dispatch(self, name, args)? {
            return Ok(Some(v));
        }
        if let Some(obj) = object {
            if serial::is_serial_object(obj) {
                if let Some(v) = serial::dispatch(self, obj, name, args)? {
                    return Ok(Some(v));
                }
            }
        }
        if let Some(v) = math::dispatch(self, name, args) {
            return Ok(Some(v));
        }
        if let Some(v) = ctype::dispatch(name, args) {
            return Ok(Some(v));
        }
        if let Some(v) = memory::dispatch(self, name, args) {
            return Ok(Some(v));
        }
        if let Some(v) = audio::dispatch(self, name, args) {
            return Ok(Some(v));
        }
        if let Some(v) = cast_constructor(name, args) {
            return Ok(Some(v));
        }
        Ok(None)
    }

    /// Invokes a user-defined function body with `args` bound to its
    /// declared parameters in a fresh scope frame, subject to the
    /// recursion depth cap.
    pub(crate) fn call_user_function(&mut self, func: &AstNode, args: Vec<Value>) -> EvalResult {
        if !self.enter_call() {
            self.report_error(&ErrorKind::StackOverflowError(self.call_depth));
            return Ok(Value::Void);
        }
        self.scope.push();
        let params = parameter_nodes(func);
        for (param, value) in params.iter().zip(args.into_iter()) {
            let name = param.child(0).map(|n| n.text().to_string()).unwrap_or_default();
            self.scope.declare(Variable::new(name, value, "auto"));
        }
        let body = func.children.last();
        let mut return_value = Value::Void;
        if let Some(body) = body {
            match self.exec_block(&body.children) {
                Ok(()) => {}
                Err(Unwind::Return(v)) => return_value = v,
                Err(Unwind::Suspend) => {
                    self.scope.pop();
                    self.exit_call();
                    return Err(Unwind::Suspend);
                }
                Err(Unwind::Fatal(m)) => {
                    self.scope.pop();
                    self.exit_call();
                    return Err(Unwind::Fatal(m));
                }
                Err(Unwind::Break) | Err(Unwind::Continue) => {
                    self.report_error(&ErrorKind::RuntimeError(
                        "break/continue used outside a loop".to_string(),
                    ));
                }
            }
        }
        self.scope.pop();
        self.exit_call();
        Ok(return_value)
    }
}

/// A `FuncDef`'s children between the name (index 0) and the body (the
/// last child) are its parameter declarations.
fn parameter_nodes(func: &AstNode) -> &[AstNode] {
    if func.children.len() <= 2 {
        &[]
    } else {
        &func.children[1..func.children.len() - 1]
    }
}

/// `int(x)`, `float(x)`, `bool(x)`, `char(x)`, `byte(x)`, `String(x)`
/// conversion constructors.
fn cast_constructor(name: &str, args: &[Value]) -> Option<Value> {
    let type_name = match name {
        "int" => "int",
        "float" | "double" => "float",
        "bool" | "boolean" => "bool",
        "char" | "byte" => "char",
        "String" => "String",
        _ => return None,
    };
    let arg = args.first()?;
    Some(crate::value::convert_to(arg, type_name))
}

pub(crate) fn emit_function_call(interp: &mut Interpreter, function: &str, args: &[Value]) {
    let arg_field: Vec<crate::command::FieldValue> = args.iter().map(value_to_field).collect();
    interp.emit(
        Command::new("FUNCTION_CALL", interp.clock_ms)
            .with("function", function.to_string())
            .with("arguments", arg_field)
            .with("message", format!("Called {function}")),
    );
}

pub(crate) fn value_to_field(v: &Value) -> crate::command::FieldValue {
    use crate::command::FieldValue;
    match v {
        Value::Void => FieldValue::Void,
        Value::Bool(b) => FieldValue::Bool(*b),
        Value::Int(i) => FieldValue::Int(*i),
        Value::Double(d) => FieldValue::Double(*d),
        Value::Str(s) => FieldValue::Str(s.clone()),
        Value::StringObject(s) => FieldValue::Str(s.borrow().clone()),
        other => FieldValue::Str(crate::value::coerce_string(other)),
    }
}

pub(crate) fn default_value_placeholder() -> Value {
    default_for("int")
}
