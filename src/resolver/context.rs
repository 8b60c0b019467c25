//! The resolution context and the module loader seam.
//!
//! One `Context` lives for exactly one validation pass over a module
//! forest. Its caches are mutated in place during the pass and must be
//! cleared wholesale before an independent pass over the same forest (for
//! example a re-validation after an edit), since a stale symbol string
//! silently produces a wrong symbol rather than an error.

use indexmap::IndexMap;
use tracing::{debug, error};

use crate::ast::ast::{Ast, NodeId};
use crate::ast::decl::{Dependency, Origin};
use crate::ast::types::{NameExpr, TypeExpr};
use crate::errors::errors::{Error, ErrorImpl};

/// One scope may appear this many times on the search guard stack before
/// resolution aborts with a "search too deep" diagnostic.
pub const SEARCH_DEPTH_LIMIT: usize = 8;

/// Resolves dependency descriptors to loaded modules.
///
/// The descriptor's origin tag picks the namespace; an `Unspecified` origin
/// falls back Local then Root, deterministically.
pub trait ModuleLoader {
    fn get_module(&self, dependency: &Dependency) -> Option<NodeId>;
}

/// The registry-backed loader used by the driver and the tests.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    local: IndexMap<String, NodeId>,
    root: IndexMap<String, NodeId>,
    packages: IndexMap<(String, String), NodeId>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        ModuleRegistry::default()
    }

    pub fn register_local(&mut self, name: &str, module: NodeId) {
        self.local.insert(String::from(name), module);
    }

    pub fn register_root(&mut self, name: &str, module: NodeId) {
        self.root.insert(String::from(name), module);
    }

    pub fn register_package(&mut self, package: &str, name: &str, module: NodeId) {
        self.packages
            .insert((String::from(package), String::from(name)), module);
    }
}

impl ModuleLoader for ModuleRegistry {
    fn get_module(&self, dependency: &Dependency) -> Option<NodeId> {
        match &dependency.origin {
            Origin::Local => self.local.get(&dependency.name).copied(),
            Origin::Root => self.root.get(&dependency.name).copied(),
            Origin::Package(package) => self
                .packages
                .get(&(package.clone(), dependency.name.clone()))
                .copied(),
            Origin::Unspecified => self
                .local
                .get(&dependency.name)
                .or_else(|| self.root.get(&dependency.name))
                .copied(),
        }
    }
}

/// Per-pass mutable resolution state.
///
/// The context observes the arena; it never owns nodes. Caches are keyed by
/// node identity and invalidated only by `clear()`.
#[derive(Debug, Default)]
pub struct Context {
    /// Memoized mangled symbols.
    pub symbols: IndexMap<NodeId, String>,
    /// Memoized dependency lookups, keyed by (importing module, dep name).
    pub module_cache: IndexMap<(NodeId, String), Option<NodeId>>,
    /// General name-search re-entrancy guard.
    pub search_guard: Vec<NodeId>,
    /// Alias-resolution re-entrancy guard.
    pub alias_guard: Vec<NodeId>,
    /// Ordered, append-only diagnostic sink. Never deduplicated here.
    pub diagnostics: Vec<Error>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// Drops every cache, guard entry and diagnostic. Must run between
    /// independent passes over the same forest.
    pub fn clear(&mut self) {
        self.symbols.clear();
        self.module_cache.clear();
        self.search_guard.clear();
        self.alias_guard.clear();
        self.diagnostics.clear();
    }

    pub fn report(&mut self, error: Error) {
        debug!(name = error.get_error_name(), "diagnostic");
        self.diagnostics.push(error);
    }
}

/// The semantic engine: one arena, one loader, one context.
pub struct Resolver<'a> {
    pub ast: &'a mut Ast,
    pub loader: &'a dyn ModuleLoader,
    pub ctx: Context,
}

impl<'a> Resolver<'a> {
    pub fn new(ast: &'a mut Ast, loader: &'a dyn ModuleLoader) -> Self {
        Resolver {
            ast,
            loader,
            ctx: Context::new(),
        }
    }

    /// Records an invariant violation caused by upstream components. Not a
    /// user diagnostic; visible in debug logging only.
    pub fn internal_violation(&mut self, message: &str) {
        error!(message, "internal consistency violation");
        debug_assert!(false, "internal consistency violation: {}", message);
    }

    /// Runs `body` with `scope` pushed on the general search guard stack.
    ///
    /// The push/pop pair lives entirely in this frame, so early returns
    /// inside `body` cannot leak a stale guard entry. Returns the empty set
    /// once the same scope appears `SEARCH_DEPTH_LIMIT` times in the
    /// active chain.
    pub fn with_search_guard(
        &mut self,
        scope: NodeId,
        name: &NameExpr,
        body: impl FnOnce(&mut Self) -> Vec<NodeId>,
    ) -> Vec<NodeId> {
        let depth = self
            .ctx
            .search_guard
            .iter()
            .filter(|entry| **entry == scope)
            .count();
        if depth >= SEARCH_DEPTH_LIMIT {
            self.ctx.report(Error::new(
                ErrorImpl::SearchTooDeep {
                    name: name.spelling(),
                },
                name.position.clone(),
            ));
            return vec![];
        }

        self.ctx.search_guard.push(scope);
        let result = body(self);
        self.ctx.search_guard.pop();
        result
    }

    /// Runs `body` with `node` held on the general search guard stack for
    /// the whole reduction, not just the name lookup inside it.
    ///
    /// A `reach` frame pops its own guard entry before returning its
    /// candidates, so an indirection that reduces further after the lookup
    /// (a template formal whose prototype names another formal, or itself)
    /// needs its own entry to accumulate depth across the recursion.
    pub fn with_reduction_guard(
        &mut self,
        node: NodeId,
        name: &NameExpr,
        body: impl FnOnce(&mut Self) -> Option<TypeExpr>,
    ) -> Option<TypeExpr> {
        let depth = self
            .ctx
            .search_guard
            .iter()
            .filter(|entry| **entry == node)
            .count();
        if depth >= SEARCH_DEPTH_LIMIT {
            self.ctx.report(Error::new(
                ErrorImpl::SearchTooDeep {
                    name: name.spelling(),
                },
                name.position.clone(),
            ));
            return None;
        }

        self.ctx.search_guard.push(node);
        let result = body(self);
        self.ctx.search_guard.pop();
        result
    }

    /// Runs `body` with `alias` pushed on the alias guard stack, or reports
    /// an alias cycle if it is already there.
    pub fn with_alias_guard(
        &mut self,
        alias: NodeId,
        name: &NameExpr,
        body: impl FnOnce(&mut Self) -> Vec<NodeId>,
    ) -> Vec<NodeId> {
        if self.ctx.alias_guard.contains(&alias) {
            self.ctx.report(Error::new(
                ErrorImpl::AliasCycle {
                    alias: name.spelling(),
                },
                name.position.clone(),
            ));
            return vec![];
        }

        self.ctx.alias_guard.push(alias);
        let result = body(self);
        self.ctx.alias_guard.pop();
        result
    }

    /// Resolves a dependency descriptor through the loader, memoized per
    /// (module, dependency name).
    pub fn dependency_module(&mut self, module: NodeId, dependency: &Dependency) -> Option<NodeId> {
        let key = (module, dependency.name.clone());
        if let Some(hit) = self.ctx.module_cache.get(&key) {
            return *hit;
        }
        let found = self.loader.get_module(dependency);
        self.ctx.module_cache.insert(key, found);
        found
    }
}
