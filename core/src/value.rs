//! Value & Type Model.
//!
//! The runtime value is a tagged sum with owned scalars and
//! reference-counted handles for the composite variants (struct, array,
//! string-object, pointer), so that assignment-through-reference and
//! pointer aliasing behave the way a shared-owner model does without
//! requiring unsafe code or a borrow-checked arena.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A mutable Arduino `String`-class object.
pub type StringHandle = Rc<RefCell<String>>;
/// A mutable, named-field struct/class instance.
pub type StructHandle = Rc<RefCell<StructValue>>;
/// A mutable, typed, N-dimensional array.
pub type ArrayHandle = Rc<RefCell<ArrayValue>>;

/// The runtime value model.
#[derive(Clone, Debug)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i32),
    Double(f64),
    /// An immutable string literal/slice.
    Str(String),
    /// A mutable Arduino `String` object.
    StringObject(StringHandle),
    Struct(StructHandle),
    Array(ArrayHandle),
    Pointer(PointerValue),
}

impl Default for Value {
    fn default() -> Self {
        Value::Void
    }
}

/// A named-field aggregate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructValue {
    pub type_name: String,
    pub fields: HashMap<String, Value>,
}

/// A typed, 1..N dimensional array with a row-major flat store.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayValue {
    pub element_type: String,
    pub dimensions: Vec<usize>,
    pub elements: Vec<Value>,
}

impl ArrayValue {
    pub fn new(element_type: impl Into<String>, dimensions: Vec<usize>) -> Self {
        let len = dimensions.iter().product();
        let default = default_for(&element_type.into());
        // reuse the type name after the move above by recomputing it
        let element_type = default_type_name(&default);
        ArrayValue {
            element_type,
            dimensions,
            elements: vec![default; len],
        }
    }

    /// Total element count across all dimensions.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Converts an N-dimensional index into a flat row-major offset.
    pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.dimensions.len() {
            return None;
        }
        let mut offset = 0usize;
        for (i, &idx) in indices.iter().enumerate() {
            if idx >= self.dimensions[i] {
                return None;
            }
            offset = offset * self.dimensions[i] + idx;
        }
        Some(offset)
    }

    pub fn get(&self, indices: &[usize]) -> Option<&Value> {
        self.flat_index(indices).and_then(|i| self.elements.get(i))
    }

    pub fn get_mut(&mut self, indices: &[usize]) -> Option<&mut Value> {
        let idx = self.flat_index(indices)?;
        self.elements.get_mut(idx)
    }
}

fn default_type_name(v: &Value) -> String {
    match v {
        Value::Bool(_) => "bool".into(),
        Value::Double(_) => "double".into(),
        Value::Str(_) | Value::StringObject(_) => "String".into(),
        _ => "int".into(),
    }
}

/// A pointer value: optionally refers to another storage cell, carries a
/// target-type tag and an indirection level.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerValue {
    pub target: Option<PointerTarget>,
    pub target_type: String,
    pub indirection: u8,
}

impl PointerValue {
    pub fn null(target_type: impl Into<String>, indirection: u8) -> Self {
        PointerValue {
            target: None,
            target_type: target_type.into(),
            indirection,
        }
    }
}

/// What a pointer refers to. Resolved by name through the scope stack (or
/// the composite-key fallback table) at dereference time, avoiding a raw
/// pointer or borrow-checked arena index that would outlive its frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PointerTarget {
    /// Refers to a declared variable (or a composite shadow key like
    /// `*p`/`obj_field`/`arr_0_1`) resolved through the current scope stack.
    Named(String),
    /// A synthetic id minted by `new`/`malloc`; never resolves to real
    /// storage, so dereferencing is a `NullPointerError`.
    Synthetic(String),
}

impl fmt::Display for PointerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            None => write!(f, "nullptr"),
            Some(PointerTarget::Named(name)) => write!(f, "&{name}"),
            Some(PointerTarget::Synthetic(id)) => write!(f, "{id}"),
        }
    }
}

/// Coerces a value to `bool`: numeric zero / empty string / void are
/// false, everything else is true.
pub fn coerce_bool(v: &Value) -> bool {
    match v {
        Value::Void => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Double(d) => *d != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::StringObject(s) => !s.borrow().is_empty(),
        Value::Struct(_) | Value::Array(_) => true,
        Value::Pointer(p) => p.target.is_some(),
    }
}

/// Coerces a value to `i32` following the widening/truncation rules used
/// throughout the evaluator.
pub fn coerce_int(v: &Value) -> i32 {
    match v {
        Value::Void => 0,
        Value::Bool(b) => *b as i32,
        Value::Int(i) => *i,
        Value::Double(d) => *d as i32,
        Value::Str(s) => s.trim().parse::<i32>().unwrap_or(0),
        Value::StringObject(s) => s.borrow().trim().parse::<i32>().unwrap_or(0),
        Value::Struct(_) | Value::Array(_) => 0,
        Value::Pointer(_) => 0,
    }
}

/// Coerces a value to `f64`.
pub fn coerce_double(v: &Value) -> f64 {
    match v {
        Value::Void => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Int(i) => *i as f64,
        Value::Double(d) => *d,
        Value::Str(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::StringObject(s) => s.borrow().trim().parse::<f64>().unwrap_or(0.0),
        Value::Struct(_) | Value::Array(_) => 0.0,
        Value::Pointer(_) => 0.0,
    }
}

/// Stringifies a value for concatenation, `print`/`println`, and casts.
pub fn coerce_string(v: &Value) -> String {
    match v {
        Value::Void => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Double(d) => format!("{d}"),
        Value::Str(s) => s.clone(),
        Value::StringObject(s) => s.borrow().clone(),
        Value::Struct(s) => format!("<struct {}>", s.borrow().type_name),
        Value::Array(_) => "<array>".to_string(),
        Value::Pointer(p) => p.to_string(),
    }
}

/// The default value for a declared type name. Only the recognizable
/// shape of the name is inspected; precise type parsing is left to the
/// upstream writer.
pub fn default_for(type_name: &str) -> Value {
    let base = strip_type_modifiers(type_name);
    match base.as_str() {
        "bool" | "boolean" => Value::Bool(false),
        "float" | "double" => Value::Double(0.0),
        "String" | "string" => Value::StringObject(Rc::new(RefCell::new(String::new()))),
        "void" => Value::Void,
        _ if base.ends_with('*') => Value::Pointer(PointerValue::null(
            base.trim_end_matches('*').trim().to_string(),
            base.matches('*').count() as u8,
        )),
        _ => Value::Int(0),
    }
}

/// Strips `const`/`static`/`&`/template-spec noise from a declared type
/// string. The upstream AST writer is expected to carry these as
/// substrings anywhere in the type name.
pub fn strip_type_modifiers(type_name: &str) -> String {
    type_name
        .replace("const", "")
        .replace("static", "")
        .replace('&', "")
        .split('<')
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Converts a value to the given declared type: widening, narrowing with
/// well-defined truncation, string<->numeric parsing (invalid parse
/// yields 0), struct/pointer passthrough.
pub fn convert_to(v: &Value, type_name: &str) -> Value {
    let base = strip_type_modifiers(type_name);
    match base.as_str() {
        "bool" | "boolean" => Value::Bool(coerce_bool(v)),
        "float" | "double" => Value::Double(coerce_double(v)),
        "int" | "unsigned" | "unsigned int" | "byte" | "char" | "short" | "long" => {
            Value::Int(coerce_int(v))
        }
        "String" | "string" => Value::StringObject(Rc::new(RefCell::new(coerce_string(v)))),
        "void" => Value::Void,
        _ => v.clone(),
    }
}

/// Language-level `==` semantics: same tag compares structurally; numeric
/// tags promote to `f64`; otherwise `false`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    use Value::*;
    match (a, b) {
        (Void, Void) => true,
        (Bool(x), Bool(y)) => x == y,
        (Int(x), Int(y)) => x == y,
        (Double(x), Double(y)) => x == y,
        (Str(x), Str(y)) => x == y,
        (StringObject(x), StringObject(y)) => *x.borrow() == *y.borrow(),
        (Str(x), StringObject(y)) | (StringObject(y), Str(x)) => *x == *y.borrow(),
        (Pointer(x), Pointer(y)) => x == y,
        (Struct(x), Struct(y)) => Rc::ptr_eq(x, y) || *x.borrow() == *y.borrow(),
        (Array(x), Array(y)) => Rc::ptr_eq(x, y) || *x.borrow() == *y.borrow(),
        _ if is_numeric(a) && is_numeric(b) => coerce_double(a) == coerce_double(b),
        _ => false,
    }
}

fn is_numeric(v: &Value) -> bool {
    matches!(v, Value::Int(_) | Value::Double(_) | Value::Bool(_))
}

/// `sizeof`/`typeof` read the runtime tag, not the declared type. Byte
/// count is used for strings.
pub fn size_of(v: &Value) -> i32 {
    match v {
        Value::Void => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 4,
        Value::Double(_) => 8,
        Value::Str(s) => (s.len() + 1) as i32,
        Value::StringObject(s) => (s.borrow().len() + 1) as i32,
        Value::Struct(s) => (s.borrow().fields.len() * 4) as i32,
        Value::Array(a) => (a.borrow().len() * 4) as i32,
        Value::Pointer(_) => 4,
    }
}

/// The runtime type tag name, as returned by `typeof`.
pub fn type_of(v: &Value) -> &'static str {
    match v {
        Value::Void => "void",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Double(_) => "double",
        Value::Str(_) => "string",
        Value::StringObject(_) => "String",
        Value::Struct(_) => "struct",
        Value::Array(_) => "array",
        Value::Pointer(_) => "pointer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_bool() {
        assert!(!coerce_bool(&Value::Int(0)));
        assert!(coerce_bool(&Value::Int(1)));
        assert!(!coerce_bool(&Value::Str(String::new())));
        assert!(coerce_bool(&Value::Str("x".into())));
        assert!(!coerce_bool(&Value::Void));
    }

    #[test]
    fn test_values_equal_cross_tag_numeric() {
        assert!(values_equal(&Value::Int(2), &Value::Double(2.0)));
        assert!(!values_equal(&Value::Int(2), &Value::Str("2".into())));
    }

    #[test]
    fn test_convert_to_invalid_parse_yields_zero() {
        let v = convert_to(&Value::Str("not a number".into()), "int");
        assert!(matches!(v, Value::Int(0)));
    }

    #[test]
    fn test_array_flat_index_row_major() {
        let arr = ArrayValue::new("int", vec![2, 3]);
        assert_eq!(arr.flat_index(&[1, 2]), Some(5));
        assert_eq!(arr.flat_index(&[2, 0]), None);
    }

    #[test]
    fn test_default_for_strips_modifiers() {
        assert!(matches!(default_for("const int"), Value::Int(0)));
        assert!(matches!(default_for("static bool"), Value::Bool(false)));
    }
}
