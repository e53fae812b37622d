//! Expression Evaluator.
//!
//! `Interpreter::eval` is the single dispatch point: a tagged-enum AST
//! walked by one `eval` function that matches on the node kind.
//! Recoverable language errors are reported via `report_error` and
//! replaced with a default value right here, so the caller never sees
//! them; only `Unwind::Suspend` (a request intrinsic hit with no cached
//! answer yet) and `Unwind::Fatal` propagate past this function.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{AstNode, NodeKind, NumberPayload, Payload};
use crate::error::ErrorKind;
use crate::interpreter::Interpreter;
use crate::scope::Variable;
use crate::suspend::{EvalResult, Unwind};
use crate::value::{
    coerce_bool, coerce_double, coerce_int, coerce_string, convert_to, default_for, size_of,
    type_of, values_equal, ArrayValue, PointerTarget, PointerValue, StructValue, Value,
};

impl Interpreter {
    pub(crate) fn eval(&mut self, node: &AstNode) -> EvalResult {
        use NodeKind::*;
        match node.kind {
            NumberLiteral => Ok(number_literal_value(&node.payload)),
            StringLiteral | WideStringLiteral => Ok(Value::Str(node.text().to_string())),
            CharLiteral | WideCharLiteral => {
                Ok(Value::Int(node.text().chars().next().map(|c| c as i32).unwrap_or(0)))
            }
            ConstantSymbol | Identifier => self.eval_identifier(node.text()),
            BinaryExpr => self.eval_binary(node),
            UnaryExpr => self.eval_unary(node),
            PostfixExpr => self.eval_postfix(node),
            Ternary => self.eval_ternary(node),
            Comma => self.eval_comma(node),
            Assignment => self.eval_assignment(node),
            FuncCall => self.eval_call(node),
            ConstructorCall => self.eval_constructor_call(node),
            New => self.eval_new(node),
            MemberAccess => self.eval_member_access(node, false),
            ArrowAccess => self.eval_member_access(node, true),
            ArrayAccess => self.eval_array_access(node),
            NamespaceAccess => self.eval_namespace_access(node),
            CStyleCast | FunctionStyleCast | CppStyleCast => self.eval_cast(node),
            ArrayInitializer => self.eval_array_initializer(node),
            DesignatedInitializer => self.eval_designated_initializer(node),
            Range => Ok(Value::Void),
            Lambda => {
                self.report_error(&ErrorKind::RuntimeError("lambda expressions are not supported".into()));
                Ok(Value::Void)
            }
            Empty => Ok(Value::Void),
            _ => {
                self.report_error(&ErrorKind::RuntimeError(format!(
                    "node kind {:?} is not a valid expression",
                    node.kind
                )));
                Ok(Value::Void)
            }
        }
    }

    fn eval_identifier(&mut self, name: &str) -> EvalResult {
        match self.scope.resolve_value(name) {
            Some(v) => Ok(v.clone()),
            None => {
                self.report_error(&ErrorKind::UnknownSymbol(name.to_string()));
                Ok(Value::Void)
            }
        }
    }

    fn eval_binary(&mut self, node: &AstNode) -> EvalResult {
        let op = node.text();
        let lhs_node = node.child(0).ok_or_else(|| Unwind::Fatal("binary expr missing lhs".into()))?;
        // Logical operators short-circuit.
        if op == "&&" {
            let lhs = coerce_bool(&self.eval(lhs_node)?);
            if !lhs {
                return Ok(Value::Bool(false));
            }
            let rhs_node = node.child(1).ok_or_else(|| Unwind::Fatal("binary expr missing rhs".into()))?;
            let rhs = coerce_bool(&self.eval(rhs_node)?);
            return Ok(Value::Bool(rhs));
        }
        if op == "||" {
            let lhs = coerce_bool(&self.eval(lhs_node)?);
            if lhs {
                return Ok(Value::Bool(true));
            }
            let rhs_node = node.child(1).ok_or_else(|| Unwind::Fatal("binary expr missing rhs".into()))?;
            let rhs = coerce_bool(&self.eval(rhs_node)?);
            return Ok(Value::Bool(rhs));
        }
        let lhs = self.eval(lhs_node)?;
        let rhs_node = node.child(1).ok_or_else(|| Unwind::Fatal("binary expr missing rhs".into()))?;
        let rhs = self.eval(rhs_node)?;
        Ok(self.apply_binary_op(op, &lhs, &rhs))
    }

    /// Applies a binary operator. Shared with compound assignment
    /// (`x op= y` reduces to `x = x op y`).
    pub(crate) fn apply_binary_op(&mut self, op: &str, lhs: &Value, rhs: &Value) -> Value {
        match op {
            "+" => {
                if is_string_like(lhs) || is_string_like(rhs) {
                    Value::Str(format!("{}{}", coerce_string(lhs), coerce_string(rhs)))
                } else {
                    Value::Double(coerce_double(lhs) + coerce_double(rhs))
                }
            }
            "-" => Value::Double(coerce_double(lhs) - coerce_double(rhs)),
            "*" => Value::Double(coerce_double(lhs) * coerce_double(rhs)),
            "/" => {
                let divisor = coerce_double(rhs);
                if divisor == 0.0 {
                    self.report_error(&ErrorKind::DivisionByZero);
                    Value::Void
                } else {
                    Value::Double(coerce_double(lhs) / divisor)
                }
            }
            "%" => {
                let divisor = coerce_int(rhs);
                if divisor == 0 {
                    self.report_error(&ErrorKind::DivisionByZero);
                    Value::Void
                } else {
                    Value::Int(coerce_int(lhs).wrapping_rem(divisor))
                }
            }
            "&" => Value::Int(coerce_int(lhs) & coerce_int(rhs)),
            "|" => Value::Int(coerce_int(lhs) | coerce_int(rhs)),
            "^" => Value::Int(coerce_int(lhs) ^ coerce_int(rhs)),
            "<<" => Value::Int(coerce_int(lhs).wrapping_shl(coerce_int(rhs) as u32)),
            ">>" => Value::Int(coerce_int(lhs).wrapping_shr(coerce_int(rhs) as u32)),
            "==" => Value::Bool(values_equal(lhs, rhs)),
            "!=" => Value::Bool(!values_equal(lhs, rhs)),
            "<" => Value::Bool(coerce_double(lhs) < coerce_double(rhs)),
            "<=" => Value::Bool(coerce_double(lhs) <= coerce_double(rhs)),
            ">" => Value::Bool(coerce_double(lhs) > coerce_double(rhs)),
            ">=" => Value::Bool(coerce_double(lhs) >= coerce_double(rhs)),
            other => {
                self.report_error(&ErrorKind::RuntimeError(format!("unknown binary operator `{other}`")));
                Value::Void
            }
        }
    }

    fn eval_unary(&mut self, node: &AstNode) -> EvalResult {
        let op = node.text();
        let operand = node.child(0).ok_or_else(|| Unwind::Fatal("unary expr missing operand".into()))?;
        match op {
            "++" | "--" => self.eval_prefix_incdec(operand, op == "++"),
            "sizeof" => {
                let v = self.eval(operand)?;
                Ok(Value::Int(size_of(&v)))
            }
            "typeof" => {
                let v = self.eval(operand)?;
                Ok(Value::Str(type_of(&v).to_string()))
            }
            "&" => self.eval_address_of(operand),
            "*" => {
                let v = self.eval(operand)?;
                self.deref_pointer(&v)
            }
            "!" => Ok(Value::Bool(!coerce_bool(&self.eval(operand)?))),
            "~" => Ok(Value::Int(!coerce_int(&self.eval(operand)?))),
            "-" => Ok(Value::Double(-coerce_double(&self.eval(operand)?))),
            "+" => Ok(Value::Double(coerce_double(&self.eval(operand)?))),
            other => {
                self.report_error(&ErrorKind::RuntimeError(format!("unknown unary operator `{other}`")));
                Ok(Value::Void)
            }
        }
    }

    fn eval_postfix(&mut self, node: &AstNode) -> EvalResult {
        let op = node.text();
        let operand = node.child(0).ok_or_else(|| Unwind::Fatal("postfix expr missing operand".into()))?;
        match op {
            "++" | "--" => self.eval_postfix_incdec(operand, op == "++"),
            other => {
                self.report_error(&ErrorKind::RuntimeError(format!("unknown postfix operator `{other}`")));
                Ok(Value::Void)
            }
        }
    }

    fn eval_prefix_incdec(&mut self, lvalue: &AstNode, increment: bool) -> EvalResult {
        let old = self.eval(lvalue)?;
        let new = step_value(&old, increment);
        self.assign_to(lvalue, new.clone())?;
        Ok(new)
    }

    fn eval_postfix_incdec(&mut self, lvalue: &AstNode, increment: bool) -> EvalResult {
        let old = self.eval(lvalue)?;
        let new = step_value(&old, increment);
        self.assign_to(lvalue, new)?;
        Ok(old)
    }

    fn eval_address_of(&mut self, operand: &AstNode) -> EvalResult {
        match operand.kind {
            NodeKind::Identifier => Ok(Value::Pointer(PointerValue {
                target: Some(PointerTarget::Named(operand.text().to_string())),
                target_type: "void".to_string(),
                indirection: 1,
            })),
            _ => {
                self.report_error(&ErrorKind::RuntimeError("`&` requires an identifier operand".into()));
                Ok(Value::Void)
            }
        }
    }

    fn deref_pointer(&mut self, v: &Value) -> EvalResult {
        match v {
            Value::Pointer(p) => match &p.target {
                Some(PointerTarget::Named(name)) => match self.scope.resolve_value(name) {
                    Some(val) => Ok(val.clone()),
                    None => {
                        self.report_error(&ErrorKind::UnknownSymbol(name.clone()));
                        Ok(Value::Void)
                    }
                },
                Some(PointerTarget::Synthetic(id)) => {
                    self.report_error(&ErrorKind::NullPointerError(format!(
                        "cannot dereference simulated allocation {id}"
                    )));
                    Ok(Value::Void)
                }
                None => {
                    self.report_error(&ErrorKind::NullPointerError("dereferenced a null pointer".into()));
                    Ok(Value::Void)
                }
            },
            _ => {
                self.report_error(&ErrorKind::TypeError("`*` requires a pointer operand".into()));
                Ok(Value::Void)
            }
        }
    }

    fn eval_ternary(&mut self, node: &AstNode) -> EvalResult {
        let cond = node.child(0).ok_or_else(|| Unwind::Fatal("ternary missing condition".into()))?;
        let then_branch = node.child(1).ok_or_else(|| Unwind::Fatal("ternary missing then-branch".into()))?;
        let else_branch = node.child(2).ok_or_else(|| Unwind::Fatal("ternary missing else-branch".into()))?;
        if coerce_bool(&self.eval(cond)?) {
            self.eval(then_branch)
        } else {
            self.eval(else_branch)
        }
    }

    fn eval_comma(&mut self, node: &AstNode) -> EvalResult {
        let mut result = Value::Void;
        for child in &node.children {
            result = self.eval(child)?;
        }
        Ok(result)
    }

    fn eval_assignment(&mut self, node: &AstNode) -> EvalResult {
        let op = node.text();
        let target = node.child(0).ok_or_else(|| Unwind::Fatal("assignment missing target".into()))?;
        let value_node = node.child(1).ok_or_else(|| Unwind::Fatal("assignment missing value".into()))?;
        let rhs = self.eval(value_node)?;
        let new_value = if op.is_empty() || op == "=" {
            rhs
        } else {
            let op = op.trim_end_matches('=');
            let current = self.eval(target)?;
            self.apply_binary_op(op, &current, &rhs)
        };
        self.assign_to(target, new_value.clone())?;
        Ok(new_value)
    }

    fn eval_call(&mut self, node: &AstNode) -> EvalResult {
        let callee = node.child(0).ok_or_else(|| Unwind::Fatal("call missing callee".into()))?;
        let args_nodes = &node.children[1..];
        let mut args = Vec::with_capacity(args_nodes.len());
        for a in args_nodes {
            args.push(self.eval(a)?);
        }
        match callee.kind {
            NodeKind::Identifier => self.dispatch_call(callee.text(), None, args),
            NodeKind::MemberAccess => {
                let object_node = callee.child(0).ok_or_else(|| Unwind::Fatal("member call missing object".into()))?;
                let method = callee.child(1).map(|n| n.text().to_string()).unwrap_or_default();
                let object_name = identifier_name(object_node);
                self.dispatch_call(&method, object_name, args)
            }
            NodeKind::NamespaceAccess => {
                let ns = callee.child(0).map(|n| n.text().to_string()).unwrap_or_default();
                let method = callee.child(1).map(|n| n.text().to_string()).unwrap_or_default();
                self.dispatch_call(&method, Some(ns), args)
            }
            _ => {
                self.report_error(&ErrorKind::RuntimeError("unsupported call target".into()));
                Ok(Value::Void)
            }
        }
    }

    fn eval_constructor_call(&mut self, node: &AstNode) -> EvalResult {
        let type_name = node.child(0).map(|n| n.text().to_string()).unwrap_or_default();
        let mut fields = std::collections::HashMap::new();
        for (i, arg) in node.children.iter().skip(1).enumerate() {
            let v = self.eval(arg)?;
            fields.insert(format!("arg{i}"), v);
        }
        Ok(Value::Struct(Rc::new(RefCell::new(StructValue { type_name, fields }))))
    }

    fn eval_new(&mut self, node: &AstNode) -> EvalResult {
        let type_name = node.child(0).map(|n| n.text().to_string()).unwrap_or_else(|| "void".to_string());
        let id = self.new_alloc_counter;
        self.new_alloc_counter += 1;
        let pointer = format!("&allocated_{id}");
        crate::intrinsics::emit_function_call(self, "new", &[Value::Str(type_name.clone())]);
        Ok(Value::Pointer(PointerValue {
            target: Some(PointerTarget::Synthetic(pointer)),
            target_type: type_name,
            indirection: 1,
        }))
    }

    fn eval_member_access(&mut self, node: &AstNode, via_pointer: bool) -> EvalResult {
        let object_node = node.child(0).ok_or_else(|| Unwind::Fatal("member access missing object".into()))?;
        let field = node.child(1).map(|n| n.text().to_string()).unwrap_or_default();
        let mut object = self.eval(object_node)?;
        if via_pointer {
            object = self.deref_pointer(&object)?;
        }
        match &object {
            Value::Struct(s) => {
                let s = s.borrow();
                match s.fields.get(&field) {
                    Some(v) => Ok(v.clone()),
                    None => Ok(Value::Void),
                }
            }
            _ => {
                // Composite-key fallback for non-struct pseudo-objects.
                let key = composite_member_key(object_node, &field);
                match self.scope.resolve_value(&key) {
                    Some(v) => Ok(v.clone()),
                    None => Ok(Value::Void),
                }
            }
        }
    }

    fn eval_array_access(&mut self, node: &AstNode) -> EvalResult {
        let array_node = node.child(0).ok_or_else(|| Unwind::Fatal("array access missing array".into()))?;
        let index_node = node.child(1).ok_or_else(|| Unwind::Fatal("array access missing index".into()))?;
        let array = self.eval(array_node)?;
        let index = coerce_int(&self.eval(index_node)?);
        match &array {
            Value::Array(a) => {
                let a = a.borrow();
                if index < 0 || index as usize >= a.len() {
                    self.report_error(&ErrorKind::BoundsError(format!(
                        "index {index} out of bounds for array of length {}",
                        a.len()
                    )));
                    return Ok(default_for(&a.element_type));
                }
                Ok(a.elements[index as usize].clone())
            }
            Value::Str(s) => Ok(Value::Int(s.as_bytes().get(index as usize).copied().unwrap_or(0) as i32)),
            Value::StringObject(s) => {
                Ok(Value::Int(s.borrow().as_bytes().get(index as usize).copied().unwrap_or(0) as i32))
            }
            _ => {
                self.report_error(&ErrorKind::TypeError("array access on a non-array value".into()));
                Ok(Value::Void)
            }
        }
    }

    fn eval_namespace_access(&mut self, node: &AstNode) -> EvalResult {
        let ns = node.child(0).map(|n| n.text().to_string()).unwrap_or_default();
        let member = node.child(1).map(|n| n.text().to_string()).unwrap_or_default();
        let qualified = format!("{ns}::{member}");
        match self.scope.resolve_value(&qualified) {
            Some(v) => Ok(v.clone()),
            None => self.eval_identifier(&member),
        }
    }

    fn eval_cast(&mut self, node: &AstNode) -> EvalResult {
        let type_node = node.child(0).ok_or_else(|| Unwind::Fatal("cast missing type".into()))?;
        let expr_node = node.child(1).ok_or_else(|| Unwind::Fatal("cast missing expression".into()))?;
        let target_type = match &type_node.payload {
            Payload::TypeName(t) => t.clone(),
            _ => type_node.text().to_string(),
        };
        let v = self.eval(expr_node)?;
        Ok(convert_to(&v, &target_type))
    }

    fn eval_array_initializer(&mut self, node: &AstNode) -> EvalResult {
        let mut elements = Vec::with_capacity(node.children.len());
        for child in &node.children {
            elements.push(self.eval(child)?);
        }
        let element_type = elements.first().map(crate::value::type_of).unwrap_or("int").to_string();
        Ok(Value::Array(Rc::new(RefCell::new(ArrayValue {
            element_type,
            dimensions: vec![elements.len()],
            elements,
        }))))
    }

    fn eval_designated_initializer(&mut self, node: &AstNode) -> EvalResult {
        let mut fields = std::collections::HashMap::new();
        let mut iter = node.children.iter();
        while let (Some(name_node), Some(value_node)) = (iter.next(), iter.next()) {
            let v = self.eval(value_node)?;
            fields.insert(name_node.text().to_string(), v);
        }
        Ok(Value::Struct(Rc::new(RefCell::new(StructValue {
            type_name: String::new(),
            fields,
        }))))
    }

    /// Writes `value` to the storage cell named by the lvalue expression
    /// `target`: identifier, array element, member access (struct or
    /// composite fallback), or pointer deref.
    pub(crate) fn assign_to(&mut self, target: &AstNode, value: Value) -> Result<(), Unwind> {
        match target.kind {
            NodeKind::Identifier => {
                if self.scope.exists(target.text()) {
                    if let Err(e) = self.scope.set_value(target.text(), value) {
                        self.report_error(&e);
                    }
                } else {
                    self.scope.declare(Variable::new(target.text(), value, "auto"));
                }
                Ok(())
            }
            NodeKind::ArrayAccess => {
                let array_node = target.child(0).ok_or_else(|| Unwind::Fatal("array assign missing array".into()))?;
                let index_node = target.child(1).ok_or_else(|| Unwind::Fatal("array assign missing index".into()))?;
                let array = self.eval(array_node)?;
                let index = coerce_int(&self.eval(index_node)?);
                if let Value::Array(a) = &array {
                    let mut a = a.borrow_mut();
                    let len = a.len();
                    if index < 0 || index as usize >= len {
                        drop(a);
                        self.report_error(&ErrorKind::BoundsError(format!(
                            "index {index} out of bounds for array of length {len}"
                        )));
                    } else {
                        a.elements[index as usize] = value;
                    }
                } else {
                    self.report_error(&ErrorKind::TypeError("array assignment on a non-array value".into()));
                }
                Ok(())
            }
            NodeKind::MemberAccess | NodeKind::ArrowAccess => {
                let object_node = target.child(0).ok_or_else(|| Unwind::Fatal("member assign missing object".into()))?;
                let field = target.child(1).map(|n| n.text().to_string()).unwrap_or_default();
                let mut object = self.eval(object_node)?;
                if target.kind == NodeKind::ArrowAccess {
                    object = self.deref_pointer(&object)?;
                }
                if let Value::Struct(s) = &object {
                    s.borrow_mut().fields.insert(field, value);
                } else {
                    let key = composite_member_key(object_node, &field);
                    if self.scope.exists(&key) {
                        if let Err(e) = self.scope.set_value(&key, value) {
                            self.report_error(&e);
                        }
                    } else {
                        self.scope.declare(Variable::new(key, value, "auto"));
                    }
                }
                Ok(())
            }
            NodeKind::UnaryExpr if target.text() == "*" => {
                let operand = target.child(0).ok_or_else(|| Unwind::Fatal("deref assign missing operand".into()))?;
                let pointer = self.eval(operand)?;
                let key = match &pointer {
                    Value::Pointer(PointerValue { target: Some(PointerTarget::Named(name)), .. }) => {
                        name.clone()
                    }
                    Value::Pointer(PointerValue { target: Some(PointerTarget::Synthetic(id)), .. }) => {
                        format!("*{id}")
                    }
                    _ => {
                        self.report_error(&ErrorKind::NullPointerError("assignment through a null pointer".into()));
                        return Ok(());
                    }
                };
                if self.scope.exists(&key) {
                    if let Err(e) = self.scope.set_value(&key, value) {
                        self.report_error(&e);
                    }
                } else {
                    self.scope.declare(Variable::new(key, value, "auto"));
                }
                Ok(())
            }
            _ => {
                self.report_error(&ErrorKind::RuntimeError("invalid assignment target".into()));
                Ok(())
            }
        }
    }
}

fn number_literal_value(payload: &Payload) -> Value {
    match payload {
        Payload::Number(NumberPayload::Void) => Value::Void,
        Payload::Number(NumberPayload::Bool(b)) => Value::Bool(*b),
        Payload::Number(NumberPayload::Int(i)) => Value::Int(*i),
        Payload::Number(NumberPayload::Double(d)) => Value::Double(*d),
        _ => Value::Void,
    }
}

fn is_string_like(v: &Value) -> bool {
    matches!(v, Value::Str(_) | Value::StringObject(_))
}

/// `x++`/`x--` step a numeric value by one unit, preserving its tag.
fn step_value(v: &Value, increment: bool) -> Value {
    match v {
        Value::Double(d) => Value::Double(if increment { d + 1.0 } else { d - 1.0 }),
        _ => Value::Int(if increment {
            coerce_int(v).wrapping_add(1)
        } else {
            coerce_int(v).wrapping_sub(1)
        }),
    }
}

/// The synthetic composite key used to simulate a member write on a value
/// that isn't a real struct: `obj_field` when the object is a plain
/// identifier, otherwise a best-effort text rendering.
fn composite_member_key(object_node: &AstNode, field: &str) -> String {
    match object_node.kind {
        NodeKind::Identifier => format!("{}_{}", object_node.text(), field),
        _ => format!("expr_{field}"),
    }
}

fn identifier_name(node: &AstNode) -> Option<String> {
    match node.kind {
        NodeKind::Identifier => Some(node.text().to_string()),
        _ => None,
    }
}
