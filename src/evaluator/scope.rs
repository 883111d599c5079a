//! Lexical environments.
//!
//! Locks are only taken inside these synchronous methods, so no guard is
//! ever held across an `.await` in the interpreter.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::value::Value;
use crate::script::DeclKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    /// The name is not bound anywhere in the chain.
    Undeclared,
    /// Assignment to a `const` binding.
    Constant,
    /// `let`/`const` redeclared in the same block.
    Redeclared,
}

struct Binding {
    value: Value,
    mutable: bool,
}

struct Frame {
    bindings: Mutex<HashMap<String, Binding>>,
    parent: Option<Scope>,
    /// Function scopes receive `var` declarations.
    function_scope: bool,
    strict: bool,
}

#[derive(Clone)]
pub struct Scope(Arc<Frame>);

/// A scope reference that does not keep the frame alive.
#[derive(Clone)]
pub struct WeakScope(Weak<Frame>);

impl WeakScope {
    pub fn upgrade(&self) -> Option<Scope> {
        self.0.upgrade().map(Scope)
    }

    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Scope {
    /// A root scope, holding intrinsics and (in sloppy mode) implicit globals.
    pub fn root() -> Self {
        Scope(Arc::new(Frame {
            bindings: Mutex::new(HashMap::new()),
            parent: None,
            function_scope: true,
            strict: false,
        }))
    }

    /// Scope for a function body. Strictness is inherited.
    pub fn function(&self, strict: bool) -> Self {
        Scope(Arc::new(Frame {
            bindings: Mutex::new(HashMap::new()),
            parent: Some(self.clone()),
            function_scope: true,
            strict: strict || self.0.strict,
        }))
    }

    /// Scope for a block (`{}`, loop body, catch clause).
    pub fn block(&self) -> Self {
        Scope(Arc::new(Frame {
            bindings: Mutex::new(HashMap::new()),
            parent: Some(self.clone()),
            function_scope: false,
            strict: self.0.strict,
        }))
    }

    pub fn is_strict(&self) -> bool {
        self.0.strict
    }

    pub fn downgrade(&self) -> WeakScope {
        WeakScope(Arc::downgrade(&self.0))
    }

    /// Drop every binding in this frame and all of its ancestors.
    ///
    /// A closure stored in the frame it captured keeps that frame alive
    /// forever; clearing the chain is what lets such frames be freed.
    pub fn clear_chain(&self) {
        let mut current = Some(self);
        while let Some(scope) = current {
            // Values are dropped after the lock is released.
            let bindings = std::mem::take(&mut *scope.0.bindings.lock());
            drop(bindings);
            current = scope.0.parent.as_ref();
        }
    }

    /// Declare `name` in this scope (or the nearest function scope for `var`).
    pub fn declare(&self, name: &str, value: Value, kind: DeclKind) -> Result<(), ScopeError> {
        match kind {
            DeclKind::Var => {
                let target = self.var_scope();
                let mut bindings = target.0.bindings.lock();
                bindings.insert(
                    name.to_string(),
                    Binding {
                        value,
                        mutable: true,
                    },
                );
                Ok(())
            }
            DeclKind::Let | DeclKind::Const => {
                let mut bindings = self.0.bindings.lock();
                if bindings.contains_key(name) {
                    return Err(ScopeError::Redeclared);
                }
                bindings.insert(
                    name.to_string(),
                    Binding {
                        value,
                        mutable: kind == DeclKind::Let,
                    },
                );
                Ok(())
            }
        }
    }

    /// Bind a hoisted function declaration in this frame, replacing any
    /// earlier binding of the same name.
    pub fn declare_function(&self, name: &str, value: Value) {
        self.0.bindings.lock().insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
            },
        );
    }

    /// Hoist a `var` name: bind it to `undefined` unless already bound here.
    pub fn hoist_var(&self, name: &str) {
        let target = self.var_scope();
        let mut bindings = target.0.bindings.lock();
        bindings.entry(name.to_string()).or_insert(Binding {
            value: Value::Undefined,
            mutable: true,
        });
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(binding) = scope.0.bindings.lock().get(name) {
                return Some(binding.value.clone());
            }
            current = scope.0.parent.as_ref();
        }
        None
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), ScopeError> {
        let mut current = Some(self);
        while let Some(scope) = current {
            {
                let mut bindings = scope.0.bindings.lock();
                if let Some(binding) = bindings.get_mut(name) {
                    if !binding.mutable {
                        return Err(ScopeError::Constant);
                    }
                    binding.value = value;
                    return Ok(());
                }
            }
            current = scope.0.parent.as_ref();
        }
        if self.is_strict() {
            return Err(ScopeError::Undeclared);
        }
        self.global().hoist_var(name);
        self.global().assign(name, value)
    }

    fn var_scope(&self) -> &Scope {
        let mut current = self;
        while !current.0.function_scope {
            match &current.0.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    fn global(&self) -> &Scope {
        let mut current = self;
        while let Some(parent) = &current.0.parent {
            current = parent;
        }
        current
    }
}
