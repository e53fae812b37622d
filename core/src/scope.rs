//! Scope Stack.
//!
//! An ordered list of scope frames, each a `name -> Variable` mapping.
//! Frame 0 is global. `static` declarations instead write to a
//! process-lifetime (i.e. interpreter-lifetime) table keyed by qualified
//! name. Reference variables are modeled as a `(frame, name)` style lookup
//! key.

use std::collections::HashMap;

use crate::error::ErrorKind;
use crate::value::Value;

/// A declared variable.
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    pub value: Value,
    pub declared_type: String,
    pub is_const: bool,
    pub is_static: bool,
    pub is_reference: bool,
    pub is_global: bool,
    pub template_spec: Option<String>,
    /// For reference variables: the qualified name this one aliases.
    /// Reads/writes pass through to the target's cell.
    pub reference_target: Option<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: Value, declared_type: impl Into<String>) -> Self {
        Variable {
            name: name.into(),
            value,
            declared_type: declared_type.into(),
            is_const: false,
            is_static: false,
            is_reference: false,
            is_global: false,
            template_spec: None,
            reference_target: None,
        }
    }
}

/// One lexical frame: a block, function body, or the global scope.
#[derive(Clone, Default, Debug)]
struct Frame {
    vars: HashMap<String, Variable>,
}

/// The interpreter's scope stack. Frame 0 is always the global scope and
/// can never be popped.
#[derive(Clone)]
pub struct ScopeStack {
    frames: Vec<Frame>,
    /// A process-lifetime table keyed by qualified name, independent of
    /// frame pops. Qualification here is just the bare declared name,
    /// since this interpreter flattens function nesting into a single
    /// statics namespace, consistent with the Arduino `setup`/`loop`
    /// program shape it targets.
    statics: HashMap<String, Variable>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![Frame::default()],
            statics: HashMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pops the top frame. Refuses to pop frame 0.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Declares `var` in the current frame, in the statics table if
    /// `var.is_static`, or as a global if the current frame is frame 0.
    pub fn declare(&mut self, mut var: Variable) {
        if self.frames.len() == 1 {
            var.is_global = true;
        }
        if var.is_static {
            self.statics.insert(var.name.clone(), var);
            return;
        }
        let top = self.frames.last_mut().expect("frame 0 always present");
        top.vars.insert(var.name.clone(), var);
    }

    /// Looks up a variable by name: statics first, then frames top-to-bottom.
    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        if let Some(v) = self.statics.get(name) {
            return Some(v);
        }
        self.frames.iter().rev().find_map(|f| f.vars.get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Variable> {
        if self.statics.contains_key(name) {
            return self.statics.get_mut(name);
        }
        self.frames.iter_mut().rev().find_map(|f| f.vars.get_mut(name))
    }

    /// Resolves through reference indirection: if `name` names a reference
    /// variable, follows `reference_target` (recursively, bounded to avoid
    /// a pathological cycle) until hitting a concrete cell.
    pub fn resolve_value(&self, name: &str) -> Option<&Value> {
        let mut current = name.to_string();
        for _ in 0..64 {
            let var = self.lookup(&current)?;
            match &var.reference_target {
                Some(target) => current = target.clone(),
                None => return Some(&var.value),
            }
        }
        None
    }

    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), ErrorKind> {
        let mut current = name.to_string();
        for _ in 0..64 {
            let target_name = match self.lookup(&current) {
                Some(var) => var.reference_target.clone(),
                None => return Err(ErrorKind::UnknownSymbol(name.to_string())),
            };
            match target_name {
                Some(target) => current = target,
                None => {
                    let var = self.lookup_mut(&current).expect("just looked up");
                    var.value = value;
                    return Ok(());
                }
            }
        }
        Err(ErrorKind::RuntimeError(format!(
            "reference chain too deep resolving `{name}`"
        )))
    }

    /// Binds `alias` as a reference variable pointing at `target_name`.
    /// Fails if the target doesn't exist yet at bind time.
    pub fn make_reference(
        &mut self,
        alias: impl Into<String>,
        target_name: impl Into<String>,
        declared_type: impl Into<String>,
    ) -> Result<(), ErrorKind> {
        let target_name = target_name.into();
        if self.lookup(&target_name).is_none() {
            return Err(ErrorKind::UnknownSymbol(target_name));
        }
        let mut var = Variable::new(alias, Value::Void, declared_type);
        var.is_reference = true;
        var.reference_target = Some(target_name);
        self.declare(var);
        Ok(())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_lookup() {
        let mut scope = ScopeStack::new();
        scope.declare(Variable::new("x", Value::Int(5), "int"));
        assert!(matches!(scope.lookup("x"), Some(v) if matches!(v.value, Value::Int(5))));
    }

    #[test]
    fn test_pop_refuses_frame_zero() {
        let mut scope = ScopeStack::new();
        scope.pop();
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn test_block_scoping() {
        let mut scope = ScopeStack::new();
        scope.declare(Variable::new("x", Value::Int(1), "int"));
        scope.push();
        scope.declare(Variable::new("y", Value::Int(2), "int"));
        assert!(scope.exists("x"));
        assert!(scope.exists("y"));
        scope.pop();
        assert!(scope.exists("x"));
        assert!(!scope.exists("y"));
    }

    #[test]
    fn test_statics_survive_frame_pop() {
        let mut scope = ScopeStack::new();
        scope.push();
        let mut v = Variable::new("counter", Value::Int(0), "int");
        v.is_static = true;
        scope.declare(v);
        scope.set_value("counter", Value::Int(7)).unwrap();
        scope.pop();
        scope.push();
        assert!(matches!(
            scope.resolve_value("counter"),
            Some(Value::Int(7))
        ));
    }

    #[test]
    fn test_reference_passthrough() {
        let mut scope = ScopeStack::new();
        scope.declare(Variable::new("x", Value::Int(1), "int"));
        scope.make_reference("r", "x", "int&").unwrap();
        scope.set_value("r", Value::Int(42)).unwrap();
        assert!(matches!(scope.lookup("x"), Some(v) if matches!(v.value, Value::Int(42))));
    }

    #[test]
    fn test_reference_unknown_target_fails() {
        let mut scope = ScopeStack::new();
        assert!(scope.make_reference("r", "missing", "int&").is_err());
    }
}
