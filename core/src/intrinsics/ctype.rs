//! `ctype`-like intrinsics: each takes the first argument's first
//! character (coerced through its `i32` codepoint) and returns 0/1.
//! Internally computed, no command emitted.

use crate::value::{coerce_int, Value};

pub(crate) fn dispatch(name: &str, args: &[Value]) -> Option<Value> {
    let predicate: fn(char) -> bool = match name {
        "isDigit" => |c| c.is_ascii_digit(),
        "isAlpha" => |c| c.is_ascii_alphabetic(),
        "isAlphaNumeric" => |c| c.is_ascii_alphanumeric(),
        "isSpace" => |c| c == ' ' || c == '\t' || c == '\n' || c == '\r' || c == '\x0b' || c == '\x0c',
        "isWhitespace" => |c| c.is_whitespace(),
        "isUpperCase" => |c| c.is_ascii_uppercase(),
        "isLowerCase" => |c| c.is_ascii_lowercase(),
        "isHexadecimalDigit" => |c| c.is_ascii_hexdigit(),
        "isAscii" => |c| c.is_ascii(),
        "isControl" => |c| c.is_ascii_control(),
        "isGraph" => |c| c.is_ascii_graphic(),
        "isPrintable" => |c| !c.is_ascii_control(),
        "isPunct" => |c| c.is_ascii_punctuation(),
        _ => return None,
    };
    let code = coerce_int(args.first()?);
    let c = char::from_u32(code as u32).unwrap_or('\0');
    Some(Value::Int(predicate(c) as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_digit() {
        assert!(matches!(dispatch("isDigit", &[Value::Int('5' as i32)]), Some(Value::Int(1))));
        assert!(matches!(dispatch("isDigit", &[Value::Int('a' as i32)]), Some(Value::Int(0))));
    }

    #[test]
    fn test_is_alpha_numeric() {
        assert!(matches!(
            dispatch("isAlphaNumeric", &[Value::Int('Z' as i32)]),
            Some(Value::Int(1))
        ));
    }

    #[test]
    fn test_unknown_name_returns_none() {
        assert!(dispatch("isBanana", &[Value::Int(0)]).is_none());
    }
}
