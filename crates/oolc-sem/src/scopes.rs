//! The scope stack used for name resolution.

use oolc_util::{CompileError, CompileResult, FxHashMap, Pos};

use crate::decls::{ClassId, MethodId, VarId};

/// What a name is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclId {
    Class(ClassId),
    Var(VarId),
    Method(MethodId),
}

/// A stack of scopes with innermost-first lookup.
///
/// During body analysis the stack is, outermost first: the global class
/// scope, one scope per class of the inheritance chain (root first, so a
/// derived attribute shadows a base attribute), and the method scope
/// holding the synthetic variables, parameters and locals.
#[derive(Debug, Default)]
pub struct Scopes {
    stack: Vec<FxHashMap<String, DeclId>>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a fresh innermost scope.
    pub fn enter(&mut self) {
        self.stack.push(FxHashMap::default());
    }

    /// Pops the innermost scope.
    pub fn leave(&mut self) {
        let popped = self.stack.pop();
        debug_assert!(popped.is_some(), "leave without matching enter");
    }

    /// Binds `name` in the innermost scope. Binding a name twice in the
    /// same scope is a redeclaration error at `pos`.
    pub fn add(&mut self, name: &str, decl: DeclId, pos: Pos) -> CompileResult<()> {
        let scope = self
            .stack
            .last_mut()
            .expect("add requires at least one scope");
        if scope.insert(name.to_string(), decl).is_some() {
            return Err(CompileError::context(
                pos,
                format!("redeclaration of '{}'", name),
            ));
        }
        Ok(())
    }

    /// Innermost-first lookup.
    pub fn resolve(&self, name: &str) -> Option<DeclId> {
        self.stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }
}
