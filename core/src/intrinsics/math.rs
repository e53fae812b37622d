//! Math intrinsics. All are internally computed, no command is emitted,
//! matching the routing rule that only externally-observable actions
//! cross the command-stream boundary.

use crate::error::ErrorKind;
use crate::interpreter::Interpreter;
use crate::value::{coerce_double, coerce_int, Value};

pub(crate) fn dispatch(interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<Value> {
    match name {
        "map" => {
            let v = coerce_double(args.first()?);
            let from_low = coerce_double(args.get(1)?);
            let from_high = coerce_double(args.get(2)?);
            let to_low = coerce_int(args.get(3)?);
            let to_high = coerce_int(args.get(4)?);
            if from_low == from_high {
                // Safe `fromLow == fromHigh` policy: avoid a division by
                // zero and just return `toLow`.
                return Some(Value::Int(to_low));
            }
            let scaled = (v - from_low) * (to_high - to_low) as f64 / (from_high - from_low)
                + to_low as f64;
            Some(Value::Int(scaled as i32))
        }
        "constrain" => {
            let v = coerce_double(args.first()?);
            let lo = coerce_double(args.get(1)?);
            let hi = coerce_double(args.get(2)?);
            Some(Value::Double(v.clamp(lo.min(hi), lo.max(hi))))
        }
        "abs" => match args.first()? {
            Value::Double(d) => Some(Value::Double(d.abs())),
            other => Some(Value::Int(coerce_int(other).abs())),
        },
        "min" => {
            let a = coerce_double(args.first()?);
            let b = coerce_double(args.get(1)?);
            Some(numeric_result(args.first()?, args.get(1)?, a.min(b)))
        }
        "max" => {
            let a = coerce_double(args.first()?);
            let b = coerce_double(args.get(1)?);
            Some(numeric_result(args.first()?, args.get(1)?, a.max(b)))
        }
        "pow" => {
            let base = coerce_double(args.first()?);
            let exp = coerce_double(args.get(1)?);
            Some(Value::Double(base.powf(exp)))
        }
        "sqrt" => {
            let v = coerce_double(args.first()?);
            if v < 0.0 {
                interp.report_error(&ErrorKind::RuntimeError(
                    "sqrt of a negative number is undefined".to_string(),
                ));
                return Some(Value::Void);
            }
            Some(Value::Double(v.sqrt()))
        }
        "random" => Some(match (args.first(), args.get(1)) {
            (None, _) => Value::Int(interp.rng.random()),
            (Some(max), None) => Value::Int(interp.rng.random_max(coerce_int(max))),
            (Some(min), Some(max)) => {
                Value::Int(interp.rng.random_range(coerce_int(min), coerce_int(max)))
            }
        }),
        "randomSeed" => Some(Value::Void),
        _ => None,
    }
}

/// `min`/`max` preserve a `Double` tag if either input was a `Double`,
/// otherwise return `Int`, matching how Arduino's overloaded macros widen.
fn numeric_result(a: &Value, b: &Value, result: f64) -> Value {
    if matches!(a, Value::Double(_)) || matches!(b, Value::Double(_)) {
        Value::Double(result)
    } else {
        Value::Int(result as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::InterpreterOptions;
    use crate::ast::{Ast, AstNode, NodeKind, Payload};

    fn interp() -> Interpreter {
        let ast = Ast {
            root: AstNode::new(NodeKind::Program, 0, Payload::None, Vec::new()),
            strings: Vec::new(),
        };
        Interpreter::from_ast(ast, InterpreterOptions::default())
    }

    #[test]
    fn test_map_basic() {
        let mut i = interp();
        let v = dispatch(
            &mut i,
            "map",
            &[Value::Int(512), Value::Int(0), Value::Int(1023), Value::Int(0), Value::Int(255)],
        );
        assert!(matches!(v, Some(Value::Int(n)) if (126..=128).contains(&n)));
    }

    #[test]
    fn test_map_safe_from_low_equals_high() {
        let mut i = interp();
        let v = dispatch(
            &mut i,
            "map",
            &[Value::Int(5), Value::Int(3), Value::Int(3), Value::Int(10), Value::Int(20)],
        );
        assert!(matches!(v, Some(Value::Int(10))));
    }

    #[test]
    fn test_constrain() {
        let mut i = interp();
        let v = dispatch(&mut i, "constrain", &[Value::Int(42), Value::Int(0), Value::Int(10)]);
        assert!(matches!(v, Some(Value::Double(d)) if d == 10.0));
    }

    #[test]
    fn test_sqrt_negative_is_diagnosed() {
        let mut i = interp();
        let v = dispatch(&mut i, "sqrt", &[Value::Int(-4)]);
        assert!(matches!(v, Some(Value::Void)));
        assert_eq!(i.commands()[0].command_type(), "ERROR");
    }

    #[test]
    fn test_random_max_deterministic_with_seed() {
        let ast = Ast {
            root: AstNode::new(NodeKind::Program, 0, Payload::None, Vec::new()),
            strings: Vec::new(),
        };
        let mut options = InterpreterOptions::default();
        options.random_seed = Some(99);
        let mut i = Interpreter::from_ast(ast, options);
        let v = dispatch(&mut i, "random", &[Value::Int(100)]);
        match v {
            Some(Value::Int(n)) => assert!((0..100).contains(&n)),
            _ => panic!("expected Int"),
        }
    }
}
