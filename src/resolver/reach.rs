//! Name resolution ("reach").
//!
//! Resolves a possibly-qualified, possibly-templated name expression to
//! zero, one or many candidate declarations, starting from a scope and
//! driven by a search policy. Aliases are transparent (with cycle
//! protection), template arguments trigger instantiation, and empty results
//! fall back to supertype and enclosing-scope search.

use std::collections::HashSet;

use tracing::trace;

use crate::ast::ast::{Node, NodeId};
use crate::ast::types::NameExpr;
use crate::errors::errors::{Error, ErrorImpl};

use super::context::Resolver;

/// Which parts of a scope a search may consult.
#[derive(Debug, Clone, Copy)]
pub struct SearchPolicy {
    /// Follow the superclass chain.
    pub inherited: bool,
    /// Climb to the enclosing scope on an empty result.
    pub enclosing: bool,
    /// Consult value members (attributes, methods, operators).
    pub own_members: bool,
    /// Consult nested declarations (classes, enums, aliases).
    pub inner_decls: bool,
    /// Stop at the first candidate found.
    pub first_only: bool,
}

impl SearchPolicy {
    pub const FULL: SearchPolicy = SearchPolicy {
        inherited: true,
        enclosing: true,
        own_members: true,
        inner_decls: true,
        first_only: false,
    };

    /// The policy for searching a scope reached through a chain link or a
    /// superclass: the enclosing scope is no longer in play.
    pub fn narrowed(self) -> SearchPolicy {
        SearchPolicy {
            enclosing: false,
            ..self
        }
    }
}

fn dedup_preserve(mut candidates: Vec<NodeId>) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    candidates.retain(|id| seen.insert(*id));
    candidates
}

impl Resolver<'_> {
    /// Resolves `name` starting from `scope`. The returned candidate set is
    /// ordered and deterministic: same name, same scope, same policy, same
    /// answer, as long as the forest was not mutated in between.
    pub fn reach(&mut self, name: &NameExpr, policy: SearchPolicy, scope: NodeId) -> Vec<NodeId> {
        self.reach_link(name, 0, policy, scope, scope)
    }

    /// `query` is the original querying site, carried unchanged through
    /// supertype, enclosing and chain recursion: template arguments spell
    /// names of the query site, not of the scope the candidate was found in.
    fn reach_link(
        &mut self,
        name: &NameExpr,
        link: usize,
        policy: SearchPolicy,
        scope: NodeId,
        query: NodeId,
    ) -> Vec<NodeId> {
        let Some(scope) = self.ast.nearest_scope(scope) else {
            self.internal_violation("reach started from a node with no enclosing scope");
            return vec![];
        };
        trace!(name = %name.spelling(), link, ?scope, "reach");
        self.with_search_guard(scope, name, |resolver| {
            resolver.reach_in_scope(name, link, policy, scope, query)
        })
    }

    fn reach_in_scope(
        &mut self,
        name: &NameExpr,
        link: usize,
        policy: SearchPolicy,
        scope: NodeId,
        query: NodeId,
    ) -> Vec<NodeId> {
        let link_name = name.links[link].name.clone();

        let mut candidates = match self.ast.node(scope) {
            Node::Class(_) => self.collect_class(scope, &link_name, policy),
            Node::Module(_) => self.collect_module(scope, &link_name, policy),
            Node::Implementation(imp) => {
                let pool: Vec<NodeId> =
                    imp.params.iter().chain(imp.locals.iter()).copied().collect();
                self.collect_named(&pool, &link_name)
            }
            Node::Block(block) => self.collect_named(&block.locals.clone(), &link_name),
            Node::Loop(stmt) => {
                let mut pool = stmt.locals.clone();
                if stmt.label.as_deref() == Some(link_name.as_str()) {
                    pool.push(scope);
                }
                self.collect_named(&pool, &link_name)
            }
            Node::Assume(stmt) => self.collect_named(&stmt.locals.clone(), &link_name),
            Node::Lambda(lambda) => {
                let pool: Vec<NodeId> = lambda
                    .params
                    .iter()
                    .chain(lambda.locals.iter())
                    .copied()
                    .collect();
                self.collect_named(&pool, &link_name)
            }
            _ => {
                self.internal_violation("reach consulted a non-scope node");
                vec![]
            }
        };

        candidates = dedup_preserve(candidates);
        if policy.first_only && candidates.len() > 1 {
            candidates.truncate(1);
        }
        let found_any = !candidates.is_empty();

        candidates = self.expand_aliases(candidates);

        let template_args = name.links[link].template_args.clone();
        if !template_args.is_empty() && !candidates.is_empty() {
            if candidates.len() > 1 {
                self.ctx.report(Error::new(
                    ErrorImpl::AmbiguousName {
                        name: name.spelling(),
                        candidates: candidates.len(),
                    },
                    name.position.clone(),
                ));
                return vec![];
            }
            let single = candidates[0];
            if matches!(self.ast.node(single), Node::Class(_)) {
                // Arguments applied to a class without formal parameters
                // are erroneous user input, not an upstream invariant
                // breach.
                let is_generic = self.ast.class(single).is_some_and(|c| c.is_generic());
                if !is_generic {
                    let class_name = self
                        .ast
                        .name_of(single)
                        .map(String::from)
                        .unwrap_or_else(|| name.spelling());
                    self.ctx.report(Error::new(
                        ErrorImpl::TemplateArgumentCount {
                            class: class_name,
                            expected: 0,
                            received: template_args.len(),
                        },
                        name.position.clone(),
                    ));
                    return vec![];
                }
                candidates = match self.instantiate(single, &template_args, query) {
                    Some(usage) => vec![usage],
                    None => vec![],
                };
            }
        }

        if !candidates.is_empty() && link + 1 < name.links.len() {
            return self.deepen(name, link, policy, candidates, query);
        }

        if !found_any {
            // Supertype search, through a uniquely resolved superclass only.
            if policy.inherited {
                if let Some(superclass) = self.unique_superclass(scope) {
                    let inherited =
                        self.reach_link(name, link, policy.narrowed(), superclass, query);
                    if !inherited.is_empty() {
                        return inherited;
                    }
                }
            }
            if policy.enclosing {
                return self.escalate(name, link, policy, scope, query);
            }
        }

        candidates
    }

    fn collect_named(&self, pool: &[NodeId], link_name: &str) -> Vec<NodeId> {
        pool.iter()
            .copied()
            .filter(|id| self.ast.name_of(*id) == Some(link_name))
            .collect()
    }

    /// Members of a class, split between value members and nested
    /// declarations per the policy. Template formal parameters resolve
    /// directly (their binding carries the concrete argument on a usage).
    fn collect_class(&mut self, class: NodeId, link_name: &str, policy: SearchPolicy) -> Vec<NodeId> {
        let (template_params, members) = match self.ast.class(class) {
            Some(c) => (c.template_params.clone(), c.members.clone()),
            None => return vec![],
        };

        let mut out = vec![];
        for param in template_params {
            if self.ast.name_of(param) == Some(link_name) {
                out.push(param);
            }
        }
        for member in members {
            if self.ast.name_of(member) != Some(link_name) {
                continue;
            }
            let is_value_member = matches!(
                self.ast.node(member),
                Node::Attribute(_) | Node::Method(_) | Node::Operator(_)
            );
            if (is_value_member && policy.own_members) || (!is_value_member && policy.inner_decls)
            {
                out.push(member);
            }
        }
        out
    }

    /// Module lookup goes through the module's transparent class, then its
    /// dependencies: a `this`-aliased dependency merges transparently, any
    /// other dependency matches by alias or by declared name.
    fn collect_module(&mut self, module: NodeId, link_name: &str, policy: SearchPolicy) -> Vec<NodeId> {
        let (transparent, dependencies) = match self.ast.module(module) {
            Some(m) => (m.transparent, m.dependencies.clone()),
            None => return vec![],
        };

        let mut out = vec![];
        if let Some(transparent) = transparent {
            out.extend(self.collect_class(transparent, link_name, policy));
        }

        for dependency in dependencies {
            if dependency.alias.as_deref() == Some("this") {
                if let Some(dep_module) = self.dependency_module(module, &dependency) {
                    let dep_transparent =
                        self.ast.module(dep_module).and_then(|m| m.transparent);
                    if let Some(dep_transparent) = dep_transparent {
                        out.extend(self.collect_class(dep_transparent, link_name, policy));
                    }
                }
            } else if dependency.alias.as_deref() == Some(link_name)
                || dependency.name == link_name
            {
                if let Some(dep_module) = self.dependency_module(module, &dependency) {
                    out.push(dep_module);
                }
            }
        }
        out
    }

    /// Replaces alias candidates by the resolution of their target from the
    /// alias's own scope. Revisiting an alias already on the guard stack is
    /// a cycle error contributing no candidates.
    fn expand_aliases(&mut self, candidates: Vec<NodeId>) -> Vec<NodeId> {
        let mut out = vec![];
        for candidate in candidates {
            if let Node::Alias(alias) = self.ast.node(candidate) {
                let target = alias.target.clone();
                let Some(alias_scope) = self.ast.scope_of(candidate) else {
                    self.internal_violation("alias declaration has no enclosing scope");
                    continue;
                };
                let resolved = self.with_alias_guard(candidate, &target, |resolver| {
                    resolver.reach(&target, SearchPolicy::FULL, alias_scope)
                });
                out.extend(resolved);
            } else {
                out.push(candidate);
            }
        }
        dedup_preserve(out)
    }

    /// Follows a further chain link into the unique candidate, which must
    /// itself be a scope; the policy narrows so the inner search cannot
    /// escape back out.
    fn deepen(
        &mut self,
        name: &NameExpr,
        link: usize,
        policy: SearchPolicy,
        candidates: Vec<NodeId>,
        query: NodeId,
    ) -> Vec<NodeId> {
        if candidates.len() > 1 {
            self.ctx.report(Error::new(
                ErrorImpl::AmbiguousName {
                    name: name.spelling(),
                    candidates: candidates.len(),
                },
                name.position.clone(),
            ));
            return vec![];
        }
        let target = candidates[0];
        if !self.ast.is_scope(target) {
            self.ctx.report(Error::new(
                ErrorImpl::UnresolvedName {
                    name: name.spelling(),
                },
                name.position.clone(),
            ));
            return vec![];
        }
        self.reach_link(name, link + 1, policy.narrowed(), target, query)
    }

    /// The superclass of a class scope when it resolves to exactly one
    /// class; anything ambiguous or unresolved is diagnosed elsewhere and
    /// skipped here.
    fn unique_superclass(&mut self, scope: NodeId) -> Option<NodeId> {
        let class = self.ast.class(scope)?;
        if class.is_transparent {
            return None;
        }
        // Prefer the inheritance table once validation has built it.
        if class.inheritance.len() > 1 {
            let own_index = class.inheritance.len() - 1;
            return Some(class.inheritance[own_index - 1]);
        }
        let base = class.base.clone()?;
        match base {
            crate::ast::types::TypeExpr::Struct(id) => Some(id),
            crate::ast::types::TypeExpr::Named(base_name) => {
                let parent = self.ast.scope_of(scope)?;
                let resolved = self.reach(&base_name, SearchPolicy::FULL, parent);
                match resolved[..] {
                    [single] if matches!(self.ast.node(single), Node::Class(_)) => Some(single),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Enclosing-scope escalation. An implementation escalates into its
    /// host class and climbs from there, never through its own syntactic
    /// scope (the module the implementation happens to be written in);
    /// everything else climbs the scope chain.
    fn escalate(
        &mut self,
        name: &NameExpr,
        link: usize,
        policy: SearchPolicy,
        scope: NodeId,
        query: NodeId,
    ) -> Vec<NodeId> {
        if let Node::Implementation(imp) = self.ast.node(scope) {
            // An unresolved host was already diagnosed when the
            // implementation was validated; nothing left to climb.
            return match imp.host_class {
                Some(host) => self.reach_link(name, link, policy, host, query),
                None => vec![],
            };
        }
        match self.ast.scope_of(scope) {
            Some(parent) => self.reach_link(name, link, policy, parent, query),
            None => vec![],
        }
    }
}
