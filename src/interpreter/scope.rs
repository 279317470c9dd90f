//! Lexical scopes and variable bindings
//!
//! Scopes form a parent chain of `Rc<Scope>`. Each binding is an `Rc<Variable>`
//! cell, so closures and suspended frames that captured a scope observe later
//! writes to it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::ast::VariableKind;
use crate::error::JsError;
use crate::hoist::Hoisting;
use crate::prelude::*;
use crate::value::{CheapClone, JsString, JsValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

/// A named binding cell
pub struct Variable {
    kind: VariableKind,
    name: JsString,
    /// False while a `let`/`const` is in its temporal dead zone
    init: Cell<bool>,
    value: RefCell<JsValue>,
}

impl Variable {
    pub fn new(kind: VariableKind, name: JsString) -> Self {
        Variable {
            kind,
            name,
            init: Cell::new(kind == VariableKind::Var),
            value: RefCell::new(JsValue::Undefined),
        }
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn name(&self) -> &JsString {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.init.get()
    }

    /// Read the value; fails inside the temporal dead zone
    pub fn get(&self) -> Result<JsValue, JsError> {
        if !self.init.get() {
            return Err(JsError::reference_error(format!(
                "Cannot access '{}' before initialization",
                self.name
            )));
        }
        Ok(self.value.borrow().clone())
    }

    /// Assign; fails inside the dead zone and for a `const`
    pub fn set(&self, value: JsValue) -> Result<(), JsError> {
        if !self.init.get() {
            return Err(JsError::reference_error(format!(
                "Cannot access '{}' before initialization",
                self.name
            )));
        }
        if self.kind == VariableKind::Const {
            return Err(JsError::type_error(format!(
                "Assignment to constant variable '{}'",
                self.name
            )));
        }
        self.initialize(value);
        Ok(())
    }

    /// Store the declaration's value and leave the dead zone
    pub fn initialize(&self, value: JsValue) {
        *self.value.borrow_mut() = value;
        self.init.set(true);
    }

    fn duplicate(&self) -> Variable {
        Variable {
            kind: self.kind,
            name: self.name.cheap_clone(),
            init: Cell::new(self.init.get()),
            value: RefCell::new(self.value.borrow().clone()),
        }
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("init", &self.init.get())
            .finish()
    }
}

pub struct Scope {
    kind: ScopeKind,
    parent: Option<Rc<Scope>>,
    bindings: RefCell<FxHashMap<JsString, Rc<Variable>>>,
}

impl Scope {
    pub fn new(kind: ScopeKind, parent: Option<Rc<Scope>>) -> Rc<Scope> {
        Rc::new(Scope {
            kind,
            parent,
            bindings: RefCell::new(FxHashMap::default()),
        })
    }

    pub fn global() -> Rc<Scope> {
        Scope::new(ScopeKind::Global, None)
    }

    /// A child scope of `parent`
    pub fn child(kind: ScopeKind, parent: &Rc<Scope>) -> Rc<Scope> {
        Scope::new(kind, Some(parent.cheap_clone()))
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    /// Declare a binding. `var` lands in the nearest function or global scope,
    /// `let`/`const` in this one. Redeclaring a name in the target scope returns
    /// the existing variable.
    pub fn declare(&self, kind: VariableKind, name: &JsString) -> Rc<Variable> {
        if kind == VariableKind::Var {
            let mut target = self;
            while target.kind == ScopeKind::Block {
                match &target.parent {
                    Some(parent) => target = parent,
                    None => break,
                }
            }
            target.declare_local(kind, name)
        } else {
            self.declare_local(kind, name)
        }
    }

    /// Declare a binding in this scope regardless of kind
    pub fn declare_local(&self, kind: VariableKind, name: &JsString) -> Rc<Variable> {
        self.bindings
            .borrow_mut()
            .entry(name.cheap_clone())
            .or_insert_with(|| Rc::new(Variable::new(kind, name.cheap_clone())))
            .cheap_clone()
    }

    /// Declare an initialized binding in this scope
    pub fn define(&self, name: &str, value: JsValue) -> Rc<Variable> {
        let variable = self.declare_local(VariableKind::Var, &JsString::from(name));
        variable.initialize(value);
        variable
    }

    /// Resolve a name along the scope chain
    pub fn get(&self, name: &str) -> Option<Rc<Variable>> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(variable) = scope.bindings.borrow().get(name) {
                return Some(variable.cheap_clone());
            }
            current = scope.parent.as_deref();
        }
        None
    }

    /// Whether this scope itself (not a parent) binds `name`
    pub fn has_own(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// Create the bindings a hoisting record names
    pub fn apply_hoisting(&self, hoisting: &Hoisting) {
        for name in hoisting.vars.iter() {
            self.declare(VariableKind::Var, name);
        }
        for name in hoisting.lets.iter() {
            self.declare_local(VariableKind::Let, name);
        }
        for name in hoisting.consts.iter() {
            self.declare_local(VariableKind::Const, name);
        }
    }

    /// Sibling scope for the next loop iteration: same kind and parent, with
    /// every binding copied into a fresh cell. Closures created during the
    /// previous iteration keep the old cells.
    pub fn clone_for_iteration(&self) -> Rc<Scope> {
        let bindings = self
            .bindings
            .borrow()
            .iter()
            .map(|(name, variable)| (name.cheap_clone(), Rc::new(variable.duplicate())))
            .collect();
        Rc::new(Scope {
            kind: self.kind,
            parent: self.parent.clone(),
            bindings: RefCell::new(bindings),
        })
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.borrow();
        let mut names: Vec<&str> = bindings.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("Scope")
            .field("kind", &self.kind)
            .field("bindings", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
