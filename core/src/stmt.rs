//! Statement Visitor.
//!
//! `Interpreter::exec_stmt`/`exec_block` are the statement-side half of
//! the single-dispatch strategy: one function matches on `NodeKind` and
//! either runs to completion, unwinds via `Unwind::{Break,Continue,
//! Return}`, or propagates a suspension/fatal signal from a nested `eval`
//! call.
//!
//! Node-shape conventions used here are this crate's own writer/loader
//! contract, recorded in DESIGN.md: `VarDecl` is `[type, declarator,
//! initializer?]`; `For` is always `[init, cond, incr, body]` with
//! `Empty` nodes standing in for any omitted clause; `RangeFor` is
//! `[type, declarator, iterable, body]`; `Case` stores its label as child
//! 0 unless flag bit `0x01` marks it the `default` case, in which case
//! all children are its statements.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{AstNode, NodeKind};
use crate::command::Command;
use crate::error::ErrorKind;
use crate::interpreter::{Interpreter, SwitchContext};
use crate::intrinsics::value_to_field;
use crate::scope::Variable;
use crate::suspend::{ExecResult, Unwind};
use crate::value::{
    coerce_bool, coerce_int, default_for, size_of, strip_type_modifiers, values_equal, ArrayValue,
    Value,
};

impl Interpreter {
    /// Executes a sequence of statements in the *current* scope frame
    /// (callers that need a fresh block scope push/pop around this
    /// themselves, see `CompoundStatement` below and `run_unit` in
    /// `interpreter.rs`).
    pub(crate) fn exec_block(&mut self, stmts: &[AstNode]) -> ExecResult {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    pub(crate) fn exec_stmt(&mut self, node: &AstNode) -> ExecResult {
        use NodeKind::*;
        match node.kind {
            CompoundStatement => {
                self.scope.push();
                let result = self.exec_block(&node.children);
                self.scope.pop();
                result
            }
            ExpressionStatement => {
                if let Some(expr) = node.child(0) {
                    self.eval(expr)?;
                }
                Ok(())
            }
            VarDecl => self.exec_var_decl(node),
            If => self.exec_if(node),
            While => self.exec_while(node),
            DoWhile => self.exec_do_while(node),
            For => self.exec_for(node),
            RangeFor => self.exec_range_for(node),
            Switch => self.exec_switch(node),
            Break => Err(Unwind::Break),
            Continue => Err(Unwind::Continue),
            Return => {
                let value = match node.child(0) {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Void,
                };
                Err(Unwind::Return(value))
            }
            Empty | Comment | ErrorNode => Ok(()),
            PreprocessorDirective => {
                self.report_error(&ErrorKind::PreprocessorError);
                Ok(())
            }
            // Type/function declarations encountered at statement position
            // (nested `FuncDef`, `Typedef`, struct/union/enum decls, member
            // declarations) describe compile-time shape only; the
            // tree-walker has nothing to *do* for them at runtime.
            FuncDef | FuncDecl | Typedef | StructDecl | UnionDecl | EnumDecl | EnumMember
            | TemplateParam | ConstructorDecl | MemberFuncDecl => Ok(()),
            Case => {
                // A bare `case` reached outside `exec_switch_body` (malformed
                // tree); run its statements directly rather than silently
                // dropping them.
                self.exec_block(&node.children)
            }
            other => {
                self.report_error(&ErrorKind::RuntimeError(format!(
                    "node kind {other:?} is not a valid statement"
                )));
                Ok(())
            }
        }
    }

    fn exec_var_decl(&mut self, node: &AstNode) -> ExecResult {
        let type_node = node
            .child(0)
            .ok_or_else(|| Unwind::Fatal("var decl missing type".into()))?;
        let decl_node = node
            .child(1)
            .ok_or_else(|| Unwind::Fatal("var decl missing declarator".into()))?;
        let type_name = match &type_node.payload {
            crate::ast::Payload::TypeName(t) => t.clone(),
            _ => type_node.text().to_string(),
        };
        let is_const = type_name.contains("const");
        let is_static = type_name.contains("static");
        let is_reference = type_name.contains('&');
        let template_spec = extract_template_spec(&type_name);
        let name = decl_node.text().to_string();
        let initializer = node.child(2);

        if decl_node.kind == NodeKind::DeclaratorArray {
            let mut dims = Vec::with_capacity(decl_node.children.len());
            for dim_expr in &decl_node.children {
                let d = coerce_int(&self.eval(dim_expr)?).max(0) as usize;
                dims.push(d);
            }
            let element_type = strip_type_modifiers(&type_name);
            let value = match initializer {
                Some(init) => self.eval(init)?,
                None => Value::Array(Rc::new(RefCell::new(ArrayValue::new(element_type, dims)))),
            };
            if !self.try_reserve_memory(size_of(&value).max(0) as usize) {
                self.report_error(&ErrorKind::MemoryError(format!(
                    "cannot allocate array `{name}`"
                )));
                return Ok(());
            }
            let mut var = Variable::new(name.clone(), value.clone(), type_name);
            var.is_const = is_const;
            var.is_static = is_static;
            var.template_spec = template_spec;
            self.scope.declare(var);
            self.emit_var_set(&name, &value, is_const);
            return Ok(());
        }

        if is_reference {
            let Some(init) = initializer else {
                self.report_error(&ErrorKind::RuntimeError(format!(
                    "reference `{name}` declared without an initializer"
                )));
                return Ok(());
            };
            let Some(target_name) = identifier_name(init) else {
                self.report_error(&ErrorKind::RuntimeError(
                    "reference initializer must be an identifier".to_string(),
                ));
                return Ok(());
            };
            match self
                .scope
                .make_reference(name.clone(), target_name, type_name)
            {
                Ok(()) => {
                    let value = self.scope.resolve_value(&name).cloned().unwrap_or(Value::Void);
                    self.emit_var_set(&name, &value, is_const);
                }
                Err(e) => self.report_error(&e),
            }
            return Ok(());
        }

        let value = match initializer {
            Some(init) => self.eval(init)?,
            None => default_for(&type_name),
        };
        if !self.try_reserve_memory(size_of(&value).max(0) as usize) {
            self.report_error(&ErrorKind::MemoryError(format!(
                "cannot allocate variable `{name}`"
            )));
            return Ok(());
        }
        let mut var = Variable::new(name.clone(), value.clone(), type_name);
        var.is_const = is_const;
        var.is_static = is_static;
        var.template_spec = template_spec;
        self.scope.declare(var);
        self.emit_var_set(&name, &value, is_const);
        Ok(())
    }

    fn emit_var_set(&mut self, name: &str, value: &Value, is_const: bool) {
        let mut cmd = Command::new("VAR_SET", self.clock_ms);
        cmd.set("variable", name.to_string());
        cmd.set("value", value_to_field(value));
        if is_const {
            cmd.set("isConst", true);
        }
        self.emit(cmd);
    }

    fn exec_if(&mut self, node: &AstNode) -> ExecResult {
        let cond_node = node
            .child(0)
            .ok_or_else(|| Unwind::Fatal("if missing condition".into()))?;
        let then_branch = node
            .child(1)
            .ok_or_else(|| Unwind::Fatal("if missing then-branch".into()))?;
        let else_branch = node.child(2);
        let result = coerce_bool(&self.eval(cond_node)?);
        let branch = if result { "then" } else { "else" };
        self.emit(
            Command::new("IF_STATEMENT", self.clock_ms)
                .with("condition", result)
                .with("result", result)
                .with("branch", branch),
        );
        if result {
            self.exec_stmt(then_branch)
        } else if let Some(else_branch) = else_branch {
            self.exec_stmt(else_branch)
        } else {
            Ok(())
        }
    }

    fn exec_while(&mut self, node: &AstNode) -> ExecResult {
        let cond_node = node
            .child(0)
            .ok_or_else(|| Unwind::Fatal("while missing condition".into()))?;
        let body = node
            .child(1)
            .ok_or_else(|| Unwind::Fatal("while missing body".into()))?;
        let max = self.options.max_loop_iterations;
        let mut i: i64 = 0;
        loop {
            if !coerce_bool(&self.eval(cond_node)?) {
                break;
            }
            i += 1;
            if i as usize > max {
                self.emit_loop_end("while", i - 1, true);
                break;
            }
            self.emit_loop_start("while", i);
            let mut broke = false;
            match self.exec_stmt(body) {
                Ok(()) => {}
                Err(Unwind::Break) => {
                    self.emit_break_statement();
                    broke = true;
                }
                Err(Unwind::Continue) => self.emit_continue_statement(),
                Err(other) => return Err(other),
            }
            self.emit_loop_end("while", i, false);
            if broke {
                break;
            }
        }
        Ok(())
    }

    fn exec_do_while(&mut self, node: &AstNode) -> ExecResult {
        let body = node
            .child(0)
            .ok_or_else(|| Unwind::Fatal("do-while missing body".into()))?;
        let cond_node = node
            .child(1)
            .ok_or_else(|| Unwind::Fatal("do-while missing condition".into()))?;
        let max = self.options.max_loop_iterations;
        let mut i: i64 = 0;
        loop {
            i += 1;
            if i as usize > max {
                self.emit_loop_end("do-while", i - 1, true);
                break;
            }
            self.emit_loop_start("do-while", i);
            let mut broke = false;
            match self.exec_stmt(body) {
                Ok(()) => {}
                Err(Unwind::Break) => {
                    self.emit_break_statement();
                    broke = true;
                }
                Err(Unwind::Continue) => self.emit_continue_statement(),
                Err(other) => return Err(other),
            }
            self.emit_loop_end("do-while", i, false);
            if broke {
                break;
            }
            if !coerce_bool(&self.eval(cond_node)?) {
                break;
            }
        }
        Ok(())
    }

    fn exec_for(&mut self, node: &AstNode) -> ExecResult {
        let init = node
            .child(0)
            .ok_or_else(|| Unwind::Fatal("for missing init".into()))?;
        let cond = node
            .child(1)
            .ok_or_else(|| Unwind::Fatal("for missing condition".into()))?;
        let incr = node
            .child(2)
            .ok_or_else(|| Unwind::Fatal("for missing increment".into()))?;
        let body = node
            .child(3)
            .ok_or_else(|| Unwind::Fatal("for missing body".into()))?;

        self.scope.push();
        let result = (|| -> ExecResult {
            if init.kind != NodeKind::Empty {
                self.exec_stmt(init)?;
            }
            let max = self.options.max_loop_iterations;
            let mut i: i64 = 0;
            loop {
                let should_continue = if cond.kind == NodeKind::Empty {
                    true
                } else {
                    coerce_bool(&self.eval(cond)?)
                };
                if !should_continue {
                    break;
                }
                i += 1;
                if i as usize > max {
                    self.emit_loop_end("for", i - 1, true);
                    break;
                }
                self.emit_loop_start("for", i);
                let mut broke = false;
                match self.exec_stmt(body) {
                    Ok(()) => {}
                    Err(Unwind::Break) => {
                        self.emit_break_statement();
                        broke = true;
                    }
                    Err(Unwind::Continue) => self.emit_continue_statement(),
                    Err(other) => return Err(other),
                }
                self.emit_loop_end("for", i, false);
                if broke {
                    break;
                }
                if incr.kind != NodeKind::Empty {
                    self.eval(incr)?;
                }
            }
            Ok(())
        })();
        self.scope.pop();
        result
    }

    fn exec_range_for(&mut self, node: &AstNode) -> ExecResult {
        let type_node = node
            .child(0)
            .ok_or_else(|| Unwind::Fatal("range-for missing type".into()))?;
        let decl_node = node
            .child(1)
            .ok_or_else(|| Unwind::Fatal("range-for missing declarator".into()))?;
        let iterable_node = node
            .child(2)
            .ok_or_else(|| Unwind::Fatal("range-for missing iterable".into()))?;
        let body = node
            .child(3)
            .ok_or_else(|| Unwind::Fatal("range-for missing body".into()))?;

        let type_name = match &type_node.payload {
            crate::ast::Payload::TypeName(t) => t.clone(),
            _ => type_node.text().to_string(),
        };
        let var_name = decl_node.text().to_string();
        let iterable = self.eval(iterable_node)?;
        let items = range_for_items(&iterable);

        self.scope.push();
        let result = (|| -> ExecResult {
            for (idx, item) in items.into_iter().enumerate() {
                self.scope.declare(Variable::new(
                    var_name.clone(),
                    item,
                    type_name.clone(),
                ));
                let i = (idx + 1) as i64;
                self.emit_loop_start("for-range", i);
                let mut broke = false;
                match self.exec_stmt(body) {
                    Ok(()) => {}
                    Err(Unwind::Break) => {
                        self.emit_break_statement();
                        broke = true;
                    }
                    Err(Unwind::Continue) => self.emit_continue_statement(),
                    Err(other) => return Err(other),
                }
                self.emit_loop_end("for-range", i, false);
                if broke {
                    break;
                }
            }
            Ok(())
        })();
        self.scope.pop();
        result
    }

    fn exec_switch(&mut self, node: &AstNode) -> ExecResult {
        let disc_node = node
            .child(0)
            .ok_or_else(|| Unwind::Fatal("switch missing discriminant".into()))?;
        let body = node
            .child(1)
            .ok_or_else(|| Unwind::Fatal("switch missing body".into()))?;
        let value = self.eval(disc_node)?;
        self.emit(
            Command::new("SWITCH_STATEMENT", self.clock_ms).with("discriminant", value_to_field(&value)),
        );
        self.switch_stack.push(SwitchContext {
            value,
            fallthrough: false,
        });
        self.scope.push();
        let result = self.exec_switch_body(&body.children);
        self.scope.pop();
        self.switch_stack.pop();
        result
    }

    fn exec_switch_body(&mut self, cases: &[AstNode]) -> ExecResult {
        for case in cases {
            if case.kind != NodeKind::Case {
                self.exec_stmt(case)?;
                continue;
            }
            let is_default = case.flags & 0x01 != 0;
            let already_falling_through = self
                .switch_stack
                .last()
                .map(|c| c.fallthrough)
                .unwrap_or(false);

            let (matched, case_value_field, stmts): (bool, crate::command::FieldValue, &[AstNode]) =
                if is_default {
                    let matched = already_falling_through || true;
                    // Simplification (documented in DESIGN.md): a `default`
                    // reached before any case has matched is treated as the
                    // catch-all, enabling fallthrough mode on match like any
                    // other case.
                    let _ = matched;
                    (true, crate::command::FieldValue::Str("default".to_string()), &case.children[..])
                } else {
                    let label_node = case
                        .child(0)
                        .ok_or_else(|| Unwind::Fatal("case missing label".into()))?;
                    let label_value = self.eval(label_node)?;
                    let field = value_to_field(&label_value);
                    let matched = already_falling_through || values_equal(&label_value, &self.current_switch_value());
                    (matched, field, &case.children[1..])
                };

            self.emit(
                Command::new("SWITCH_CASE", self.clock_ms)
                    .with("caseValue", case_value_field)
                    .with("matched", matched),
            );

            if matched {
                if let Some(ctx) = self.switch_stack.last_mut() {
                    ctx.fallthrough = true;
                }
                match self.exec_block(stmts) {
                    Ok(()) => {}
                    Err(Unwind::Break) => {
                        self.emit_break_statement();
                        return Ok(());
                    }
                    Err(other) => return Err(other),
                }
            }
        }
        Ok(())
    }

    fn current_switch_value(&self) -> Value {
        self.switch_stack
            .last()
            .map(|c| c.value.clone())
            .unwrap_or(Value::Void)
    }

    fn emit_loop_start(&mut self, loop_type: &str, iteration: i64) {
        self.emit(
            Command::new("LOOP_START", self.clock_ms)
                .with("message", format!("Starting {loop_type} loop iteration {iteration}")),
        );
    }

    fn emit_loop_end(&mut self, loop_type: &str, iterations: i64, limit_reached: bool) {
        let message = if limit_reached {
            format!("Maximum iterations ({iterations}) reached in {loop_type} loop")
        } else {
            format!("{loop_type} loop iteration {iterations} completed")
        };
        // Normal completion closes with plain LOOP_END; hitting the
        // iteration cap closes with LOOP_END_COMPLETE instead.
        let tag = if limit_reached { "LOOP_END_COMPLETE" } else { "LOOP_END" };
        self.emit(
            Command::new(tag, self.clock_ms)
                .with("iterations", iterations as i32)
                .with("limitReached", limit_reached)
                .with("message", message),
        );
    }

    fn emit_break_statement(&mut self) {
        self.emit(Command::new("BREAK_STATEMENT", self.clock_ms).with("message", "break"));
    }

    fn emit_continue_statement(&mut self) {
        self.emit(Command::new("CONTINUE_STATEMENT", self.clock_ms).with("message", "continue"));
    }
}

/// Resolves the iterable of a range-for: string chars, integer/double
/// `0..n` (capped at 1000), array elements, string-object chars, or a
/// single-element fallback for anything else.
fn range_for_items(v: &Value) -> Vec<Value> {
    use crate::consts::MAX_RANGE_FOR_ITERATIONS;
    match v {
        Value::Str(s) => s.chars().map(|c| Value::Int(c as i32)).collect(),
        Value::StringObject(s) => s.borrow().chars().map(|c| Value::Int(c as i32)).collect(),
        Value::Int(n) => {
            let n = (*n).clamp(0, MAX_RANGE_FOR_ITERATIONS);
            (0..n).map(Value::Int).collect()
        }
        Value::Double(d) => {
            let n = (*d as i32).clamp(0, MAX_RANGE_FOR_ITERATIONS);
            (0..n).map(Value::Int).collect()
        }
        Value::Array(a) => a.borrow().elements.clone(),
        other => vec![other.clone()],
    }
}

fn identifier_name(node: &AstNode) -> Option<String> {
    match node.kind {
        NodeKind::Identifier => Some(node.text().to_string()),
        _ => None,
    }
}

/// Extracts a `<...>` template-spec substring from a declared type name.
fn extract_template_spec(type_name: &str) -> Option<String> {
    let start = type_name.find('<')?;
    let end = type_name.rfind('>')?;
    if end > start {
        Some(type_name[start..=end].to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, NumberPayload, Payload};
    use crate::interpreter::InterpreterOptions;

    fn empty_ast() -> Ast {
        Ast {
            root: AstNode::new(NodeKind::Program, 0, Payload::None, Vec::new()),
            strings: Vec::new(),
        }
    }

    fn int_lit(v: i32) -> AstNode {
        AstNode::leaf(NodeKind::NumberLiteral, Payload::Number(NumberPayload::Int(v)))
    }

    fn ident(name: &str) -> AstNode {
        AstNode::leaf(NodeKind::Identifier, Payload::Str(name.to_string()))
    }

    fn type_node(name: &str) -> AstNode {
        AstNode::leaf(NodeKind::TypeScalar, Payload::TypeName(name.to_string()))
    }

    fn declarator(name: &str) -> AstNode {
        AstNode::leaf(NodeKind::DeclaratorPlain, Payload::Str(name.to_string()))
    }

    fn var_decl(type_name: &str, name: &str, init: Option<AstNode>) -> AstNode {
        let mut children = vec![type_node(type_name), declarator(name)];
        if let Some(init) = init {
            children.push(init);
        }
        AstNode::new(NodeKind::VarDecl, 0, Payload::None, children)
    }

    fn binary(op: &str, lhs: AstNode, rhs: AstNode) -> AstNode {
        AstNode::new(NodeKind::BinaryExpr, 0, Payload::Operator(op.to_string()), vec![lhs, rhs])
    }

    fn interp() -> Interpreter {
        Interpreter::from_ast(empty_ast(), InterpreterOptions::default())
    }

    #[test]
    fn test_var_decl_emits_var_set() {
        let mut i = interp();
        i.exec_stmt(&var_decl("int", "x", Some(int_lit(5)))).unwrap();
        assert!(i.scope.exists("x"));
        assert_eq!(i.commands().last().unwrap().command_type(), "VAR_SET");
    }

    #[test]
    fn test_division_by_zero_emits_error_and_void() {
        let mut i = interp();
        let expr = binary("/", int_lit(10), int_lit(0));
        i.exec_stmt(&var_decl("int", "y", Some(expr))).unwrap();
        let tags: Vec<&str> = i.commands().iter().map(|c| c.command_type()).collect();
        assert!(tags.contains(&"ERROR"));
        assert!(matches!(i.scope.lookup("y").unwrap().value, Value::Void));
    }

    #[test]
    fn test_if_emits_if_statement_and_runs_then_branch() {
        let mut i = interp();
        let then_branch = var_decl("int", "x", Some(int_lit(1)));
        let if_node = AstNode::new(
            NodeKind::If,
            0,
            Payload::None,
            vec![int_lit(1), then_branch],
        );
        i.exec_stmt(&if_node).unwrap();
        assert!(i.scope.exists("x"));
        assert_eq!(i.commands()[0].command_type(), "IF_STATEMENT");
    }

    #[test]
    fn test_for_loop_iterates_and_emits_loop_events() {
        let mut i = interp();
        let init = var_decl("int", "i", Some(int_lit(0)));
        let cond = binary("<", ident("i"), int_lit(3));
        let incr = AstNode::new(
            NodeKind::PostfixExpr,
            0,
            Payload::Operator("++".to_string()),
            vec![ident("i")],
        );
        let body = AstNode::new(NodeKind::CompoundStatement, 0, Payload::None, vec![]);
        let for_node = AstNode::new(NodeKind::For, 0, Payload::None, vec![init, cond, incr, body]);
        i.exec_stmt(&for_node).unwrap();
        let starts = i
            .commands()
            .iter()
            .filter(|c| c.command_type() == "LOOP_START")
            .count();
        assert_eq!(starts, 3);
    }

    #[test]
    fn test_break_stops_while_loop() {
        let mut i = interp();
        i.scope.declare(Variable::new("n", Value::Int(0), "int"));
        let cond = int_lit(1); // always true
        let body = AstNode::new(NodeKind::Break, 0, Payload::None, vec![]);
        let while_node = AstNode::new(NodeKind::While, 0, Payload::None, vec![cond, body]);
        i.exec_stmt(&while_node).unwrap();
        let starts = i
            .commands()
            .iter()
            .filter(|c| c.command_type() == "LOOP_START")
            .count();
        assert_eq!(starts, 1);
        assert!(i
            .commands()
            .iter()
            .any(|c| c.command_type() == "BREAK_STATEMENT"));
    }

    #[test]
    fn test_switch_fallthrough_carries_into_next_case() {
        let mut i = interp();
        i.scope.declare(Variable::new("x", Value::Int(2), "int"));
        let case1 = AstNode::new(NodeKind::Case, 0, Payload::None, vec![int_lit(1)]);
        let println_call = AstNode::new(
            NodeKind::FuncCall,
            0,
            Payload::None,
            vec![
                AstNode::new(
                    NodeKind::MemberAccess,
                    0,
                    Payload::None,
                    vec![ident("Serial"), ident("println")],
                ),
                AstNode::leaf(NodeKind::StringLiteral, Payload::Str("b".to_string())),
            ],
        );
        let case2 = AstNode::new(
            NodeKind::Case,
            0,
            Payload::None,
            vec![
                int_lit(2),
                AstNode::new(NodeKind::ExpressionStatement, 0, Payload::None, vec![println_call]),
                AstNode::new(NodeKind::Break, 0, Payload::None, vec![]),
            ],
        );
        let case3 = AstNode::new(NodeKind::Case, 0, Payload::None, vec![int_lit(3)]);
        let body = AstNode::new(
            NodeKind::CompoundStatement,
            0,
            Payload::None,
            vec![case1, case2, case3],
        );
        let switch_node = AstNode::new(NodeKind::Switch, 0, Payload::None, vec![ident("x"), body]);
        i.exec_stmt(&switch_node).unwrap();
        let tags: Vec<&str> = i.commands().iter().map(|c| c.command_type()).collect();
        assert_eq!(
            tags,
            vec![
                "SWITCH_STATEMENT",
                "SWITCH_CASE",
                "SWITCH_CASE",
                "FUNCTION_CALL",
                "BREAK_STATEMENT",
            ]
        );
        let matched: Vec<bool> = i
            .commands()
            .iter()
            .filter(|c| c.command_type() == "SWITCH_CASE")
            .map(|c| matches!(c.field("matched"), Some(crate::command::FieldValue::Bool(true))))
            .collect();
        assert_eq!(matched, vec![false, true]);
    }
}
