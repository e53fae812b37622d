//! Hand-built `Ast`/`AstNode` fixtures standing in for a `test_data/*.ast`
//! binary fixture directory (see DESIGN.md): building trees directly and
//! handing them to `Interpreter::from_ast` skips the loader's binary
//! decode step, which `loader.rs`'s own unit tests already cover with a
//! hand-encoded buffer.

#![allow(dead_code)]

use sketch_vm::ast::{Ast, AstNode, NodeKind, NumberPayload, Payload};

pub fn program(funcs: Vec<AstNode>) -> Ast {
    Ast {
        root: AstNode::new(NodeKind::Program, 0, Payload::None, funcs),
        strings: Vec::new(),
    }
}

pub fn func_def(name: &str, body: Vec<AstNode>) -> AstNode {
    AstNode::new(
        NodeKind::FuncDef,
        0,
        Payload::None,
        vec![
            ident(name),
            AstNode::new(NodeKind::CompoundStatement, 0, Payload::None, body),
        ],
    )
}

pub fn ident(name: &str) -> AstNode {
    AstNode::leaf(NodeKind::Identifier, Payload::Str(name.to_string()))
}

pub fn int_lit(v: i32) -> AstNode {
    AstNode::leaf(NodeKind::NumberLiteral, Payload::Number(NumberPayload::Int(v)))
}

pub fn type_node(name: &str) -> AstNode {
    AstNode::leaf(NodeKind::TypeScalar, Payload::TypeName(name.to_string()))
}

pub fn declarator(name: &str) -> AstNode {
    AstNode::leaf(NodeKind::DeclaratorPlain, Payload::Str(name.to_string()))
}

pub fn declarator_array(name: &str, dims: Vec<AstNode>) -> AstNode {
    AstNode::new(NodeKind::DeclaratorArray, 0, Payload::Str(name.to_string()), dims)
}

pub fn var_decl(type_name: &str, name: &str, init: Option<AstNode>) -> AstNode {
    let mut children = vec![type_node(type_name), declarator(name)];
    children.extend(init);
    AstNode::new(NodeKind::VarDecl, 0, Payload::None, children)
}

pub fn array_var_decl(type_name: &str, name: &str, dims: Vec<AstNode>, init: AstNode) -> AstNode {
    AstNode::new(
        NodeKind::VarDecl,
        0,
        Payload::None,
        vec![type_node(type_name), declarator_array(name, dims), init],
    )
}

pub fn array_initializer(items: Vec<AstNode>) -> AstNode {
    AstNode::new(NodeKind::ArrayInitializer, 0, Payload::None, items)
}

pub fn array_access(array: AstNode, index: AstNode) -> AstNode {
    AstNode::new(NodeKind::ArrayAccess, 0, Payload::None, vec![array, index])
}

pub fn binary(op: &str, lhs: AstNode, rhs: AstNode) -> AstNode {
    AstNode::new(NodeKind::BinaryExpr, 0, Payload::Operator(op.to_string()), vec![lhs, rhs])
}

pub fn expr_stmt(expr: AstNode) -> AstNode {
    AstNode::new(NodeKind::ExpressionStatement, 0, Payload::None, vec![expr])
}

pub fn call(callee: AstNode, args: Vec<AstNode>) -> AstNode {
    let mut children = vec![callee];
    children.extend(args);
    AstNode::new(NodeKind::FuncCall, 0, Payload::None, children)
}

pub fn member_call(object: &str, method: &str, args: Vec<AstNode>) -> AstNode {
    let callee = AstNode::new(
        NodeKind::MemberAccess,
        0,
        Payload::None,
        vec![ident(object), ident(method)],
    );
    call(callee, args)
}

pub fn case(label: Option<AstNode>, stmts: Vec<AstNode>) -> AstNode {
    match label {
        Some(label) => {
            let mut children = vec![label];
            children.extend(stmts);
            AstNode::new(NodeKind::Case, 0, Payload::None, children)
        }
        None => AstNode::new(NodeKind::Case, 0x01, Payload::None, stmts),
    }
}

pub fn switch(discriminant: AstNode, cases: Vec<AstNode>) -> AstNode {
    AstNode::new(
        NodeKind::Switch,
        0,
        Payload::None,
        vec![
            discriminant,
            AstNode::new(NodeKind::CompoundStatement, 0, Payload::None, cases),
        ],
    )
}

pub fn break_stmt() -> AstNode {
    AstNode::new(NodeKind::Break, 0, Payload::None, Vec::new())
}

pub fn string_lit(s: &str) -> AstNode {
    AstNode::leaf(NodeKind::StringLiteral, Payload::Str(s.to_string()))
}
