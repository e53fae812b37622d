//! Memory-simulation intrinsics. `new T` itself is handled inline in
//! `eval::eval_new` (it needs the AST type-name child, not just
//! evaluated arguments); this module covers the call-by-name intrinsics
//! `malloc`/`free`/`delete`.

use crate::interpreter::Interpreter;
use crate::value::{coerce_int, Value};

pub(crate) fn dispatch(interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<Value> {
    match name {
        "malloc" => {
            let size = args.first().map(coerce_int).unwrap_or(0).max(0);
            let id = interp.malloc_counter;
            interp.malloc_counter += 1;
            Some(Value::Str(format!("&malloc_{id}_size_{size}")))
        }
        "free" | "delete" => {
            log::trace!("{name}() simulated as a no-op");
            Some(Value::Void)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, AstNode, NodeKind, Payload};
    use crate::interpreter::InterpreterOptions;

    fn interp() -> Interpreter {
        let ast = Ast {
            root: AstNode::new(NodeKind::Program, 0, Payload::None, Vec::new()),
            strings: Vec::new(),
        };
        Interpreter::from_ast(ast, InterpreterOptions::default())
    }

    #[test]
    fn test_malloc_counter_starts_at_2000() {
        let mut i = interp();
        let v = dispatch(&mut i, "malloc", &[Value::Int(16)]);
        assert!(matches!(v, Some(Value::Str(s)) if s == "&malloc_2000_size_16"));
    }

    #[test]
    fn test_free_is_noop() {
        let mut i = interp();
        assert!(matches!(dispatch(&mut i, "free", &[]), Some(Value::Void)));
    }
}
