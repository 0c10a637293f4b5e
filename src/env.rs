use std::collections::HashMap;

use crate::ast::ProcedureDecl;

/// Index of a scope record inside the environment arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);
}

#[derive(Debug, Default)]
struct Scope {
    variables: HashMap<String, i64>,
    parent: Option<ScopeId>,
}

/// Chained mutable scopes stored as an arena; lookups walk parent indices
/// iteratively. Procedures live in a single root-level map, matching the
/// rule that declarations always register in the outermost environment.
#[derive(Debug, Default)]
pub struct Environment {
    scopes: Vec<Scope>,
    procedures: HashMap<String, ProcedureDecl>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            procedures: HashMap::new(),
        }
    }

    /// Creates a scope whose lookups fall through to `parent`.
    pub fn push_child(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            variables: HashMap::new(),
            parent: Some(parent),
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Reads a variable, walking the parent chain. Undeclared names read as 0.
    pub fn get(&self, scope: ScopeId, name: &str) -> i64 {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(&value) = scope.variables.get(name) {
                return value;
            }
            current = scope.parent;
        }
        0
    }

    /// Overwrites an existing binding somewhere in the chain. Returns false
    /// if the name is bound nowhere; the caller decides where to declare it.
    pub fn set(&mut self, scope: ScopeId, name: &str, value: i64) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.scopes[id.0].variables.contains_key(name) {
                self.scopes[id.0].variables.insert(name.to_string(), value);
                return true;
            }
            current = self.scopes[id.0].parent;
        }
        false
    }

    /// Binds `name` directly in `scope`, shadowing any outer binding.
    pub fn declare(&mut self, scope: ScopeId, name: &str, value: i64) {
        self.scopes[scope.0].variables.insert(name.to_string(), value);
    }

    /// Assignment rule: mutate the nearest existing binding, else declare
    /// fresh in the innermost scope.
    pub fn assign(&mut self, scope: ScopeId, name: &str, value: i64) {
        if !self.set(scope, name, value) {
            self.declare(scope, name, value);
        }
    }

    pub fn define_procedure(&mut self, decl: ProcedureDecl) {
        self.procedures.insert(decl.name.clone(), decl);
    }

    /// Procedure lookup always resolves at the root.
    pub fn procedure(&self, name: &str) -> Option<&ProcedureDecl> {
        self.procedures.get(name)
    }
}
