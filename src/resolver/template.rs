//! Template instantiation (monomorphization).
//!
//! Given a generic class and a concrete argument list, resolves an existing
//! usage (usages are canonical by argument structure, not call site) or
//! clones a new one: formal parameters are bound, predicates are evaluated
//! to an admitted premise set, and members gated on unsatisfied premises
//! are dropped before the usage is validated as an ordinary class.

use tracing::debug;

use crate::ast::ast::{Node, NodeId};
use crate::ast::decl::{ClassDecl, Predicate, PredicateRule};
use crate::ast::types::{ElementProto, TypeExpr};
use crate::errors::errors::{Error, ErrorImpl};

use super::context::Resolver;

impl Resolver<'_> {
    /// Resolves or creates the usage of `generic` for `args`, reducing the
    /// arguments against `scope` (the querying site).
    pub fn instantiate(
        &mut self,
        generic: NodeId,
        args: &[ElementProto],
        scope: NodeId,
    ) -> Option<NodeId> {
        let (class_name, param_count, position) = match self.ast.class(generic) {
            Some(class) => (
                class.name.clone(),
                class.template_params.len(),
                class.span.start.clone(),
            ),
            None => {
                self.internal_violation("instantiate called on a non-class node");
                return None;
            }
        };
        if param_count == 0 {
            self.internal_violation("instantiate called on a class without formal parameters");
            return None;
        }
        if args.is_empty() {
            self.internal_violation("instantiate called with an empty argument list");
            return None;
        }
        if self.ast.class(generic).is_some_and(|class| class.is_usage()) {
            self.internal_violation("instantiate called on a usage");
            return None;
        }

        if args.len() != param_count {
            self.ctx.report(Error::new(
                ErrorImpl::TemplateArgumentCount {
                    class: class_name,
                    expected: param_count,
                    received: args.len(),
                },
                position,
            ));
            return None;
        }

        let mut reduced = Vec::with_capacity(args.len());
        for arg in args {
            reduced.push(self.reduce_proto(arg, scope)?);
        }

        // Usages are canonical by argument structure: strict identity, no
        // unknown-type leniency.
        let usages = self.ast.class(generic).map(|c| c.usages.clone())?;
        for usage in usages {
            let usage_args = self.ast.class(usage).map(|c| c.template_args.clone())?;
            let identical = usage_args.len() == reduced.len()
                && usage_args
                    .iter()
                    .zip(reduced.iter())
                    .all(|(a, b)| a.is_identical(b, false));
            if identical {
                debug!(?generic, ?usage, "reusing existing template usage");
                return Some(usage);
            }
        }

        let predicates = self.ast.class(generic).map(|c| c.predicates.clone())?;
        let admitted = self.admitted_premises(generic, &predicates, &reduced);
        if !predicates.is_empty() && admitted.is_empty() {
            let first = self.mangle_type(&reduced[0].type_expr);
            let last = self.mangle_type(&reduced[reduced.len() - 1].type_expr);
            self.ctx.report(Error::new(
                ErrorImpl::TemplatePredicateUnsatisfied { first, last },
                position,
            ));
            return None;
        }

        let usage = self.clone_usage(generic, &reduced, &admitted);
        debug!(?generic, ?usage, "created template usage");

        // Registered before validation: a self-reference inside the body
        // (`Box<T>` within `Box`) must deduplicate to the in-progress usage
        // instead of re-instantiating. A usage that fails validation is
        // deregistered and never handed out again.
        if let Some(class) = self.ast.class_mut(generic) {
            class.usages.push(usage);
        }
        let diagnostics_before = self.ctx.diagnostics.len();
        self.validate_class(usage);
        if self.ctx.diagnostics.len() > diagnostics_before {
            if let Some(class) = self.ast.class_mut(generic) {
                class.usages.retain(|existing| *existing != usage);
            }
            return None;
        }
        Some(usage)
    }

    /// Every predicate index whose units all hold against the bound
    /// arguments. All satisfied indices are admitted, not only the first.
    fn admitted_premises(
        &mut self,
        generic: NodeId,
        predicates: &[Predicate],
        args: &[ElementProto],
    ) -> Vec<usize> {
        let param_names: Vec<String> = self
            .ast
            .class(generic)
            .map(|class| {
                class
                    .template_params
                    .iter()
                    .filter_map(|id| self.ast.name_of(*id).map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let mut admitted = vec![];
        for (index, predicate) in predicates.iter().enumerate() {
            let holds = predicate.units.iter().all(|unit| {
                let Some(param_index) = param_names.iter().position(|n| *n == unit.param) else {
                    return false;
                };
                self.predicate_unit_holds(generic, &unit.rule, &args[param_index])
            });
            if holds {
                admitted.push(index);
            }
        }
        admitted
    }

    fn predicate_unit_holds(
        &mut self,
        generic: NodeId,
        rule: &PredicateRule,
        bound: &ElementProto,
    ) -> bool {
        match rule {
            PredicateRule::KindIs(kind) => bound.kind == *kind,
            PredicateRule::KindIsNot(kind) => bound.kind != *kind,
            PredicateRule::IsPointer => bound.type_expr.is_pointer(),
            PredicateRule::IsNotPointer => !bound.type_expr.is_pointer(),
            PredicateRule::DescendsFrom(ancestor) => self.descends_from(generic, bound, ancestor),
            PredicateRule::NotDescendsFrom(ancestor) => {
                !self.descends_from(generic, bound, ancestor)
            }
        }
    }

    /// Whether the bound type appears under `ancestor` in its ordered
    /// inheritance table (root to leaf, self included).
    fn descends_from(&mut self, generic: NodeId, bound: &ElementProto, ancestor: &TypeExpr) -> bool {
        let TypeExpr::Struct(bound_class) = bound.type_expr else {
            return false;
        };
        let generic_scope = match self.ast.scope_of(generic) {
            Some(scope) => scope,
            None => return false,
        };
        let Some(TypeExpr::Struct(ancestor_class)) =
            self.reduce_type(ancestor, generic_scope, None)
        else {
            return false;
        };
        self.inheritance_table(bound_class).contains(&ancestor_class)
    }

    /// Clones the generic class body into a new usage: formals bound,
    /// members with a non-empty premise set disjoint from the admitted set
    /// removed.
    fn clone_usage(&mut self, generic: NodeId, args: &[ElementProto], admitted: &[usize]) -> NodeId {
        let source = self.ast.class(generic).cloned().unwrap_or_else(|| {
            // Unreachable after the preconditions; keeps the clone total.
            ClassDecl::new("")
        });

        let mut usage = ClassDecl::new(&source.name);
        usage.visibility = source.visibility;
        usage.span = source.span.clone();
        usage.is_abstract = source.is_abstract;
        usage.base = source.base.clone();
        usage.predicates = source.predicates.clone();
        usage.generic_origin = Some(generic);
        usage.template_args = args.to_vec();
        usage.premises = admitted.to_vec();

        let scope = self.ast.scope_of(generic);
        let usage_id = match scope {
            Some(scope) => self.ast.alloc_in(Node::Class(usage), scope),
            None => self.ast.alloc(Node::Class(usage)),
        };

        for (index, param) in source.template_params.iter().enumerate() {
            if let Node::TemplateParam(param) = self.ast.node(*param) {
                let mut bound = param.clone();
                bound.binding = Some(args[index].clone());
                let bound_id = self.ast.alloc(Node::TemplateParam(bound));
                self.ast.add_template_param(usage_id, bound_id);
            }
        }

        for member in &source.members {
            let premises = self.member_premises(*member);
            if !premises.is_empty() && !premises.iter().any(|p| admitted.contains(p)) {
                continue;
            }
            let cloned = self.clone_decl(*member);
            self.ast.add_member(usage_id, cloned);
        }

        usage_id
    }

    fn member_premises(&self, member: NodeId) -> Vec<usize> {
        match self.ast.node(member) {
            Node::Attribute(decl) => decl.premises.clone(),
            Node::Method(decl) => decl.premises.clone(),
            Node::Operator(decl) => decl.premises.clone(),
            _ => vec![],
        }
    }

    /// Deep-clones a declaration subtree into fresh arena nodes.
    fn clone_decl(&mut self, id: NodeId) -> NodeId {
        match self.ast.node(id).clone() {
            Node::Attribute(decl) => self.ast.alloc(Node::Attribute(decl)),
            Node::Alias(decl) => self.ast.alloc(Node::Alias(decl)),
            Node::Enumerator(decl) => self.ast.alloc(Node::Enumerator(decl)),
            Node::TemplateParam(decl) => self.ast.alloc(Node::TemplateParam(decl)),
            Node::Param(decl) => self.ast.alloc(Node::Param(decl)),
            Node::Local(decl) => self.ast.alloc(Node::Local(decl)),
            Node::Method(mut decl) => {
                let params = std::mem::take(&mut decl.params);
                let clone_id = self.ast.alloc(Node::Method(decl));
                for param in params {
                    let cloned = self.clone_decl(param);
                    self.ast.add_param(clone_id, cloned);
                }
                clone_id
            }
            Node::Operator(mut decl) => {
                let params = std::mem::take(&mut decl.params);
                let clone_id = self.ast.alloc(Node::Operator(decl));
                for param in params {
                    let cloned = self.clone_decl(param);
                    self.ast.add_param(clone_id, cloned);
                }
                clone_id
            }
            Node::Enum(mut decl) => {
                let enumerators = std::mem::take(&mut decl.enumerators);
                let clone_id = self.ast.alloc(Node::Enum(decl));
                for enumerator in enumerators {
                    let cloned = self.clone_decl(enumerator);
                    self.ast.adopt(cloned, clone_id);
                    if let Node::Enum(e) = self.ast.node_mut(clone_id) {
                        e.enumerators.push(cloned);
                    }
                }
                clone_id
            }
            Node::Class(mut decl) => {
                let members = std::mem::take(&mut decl.members);
                let template_params = std::mem::take(&mut decl.template_params);
                decl.usages = vec![];
                decl.inheritance = vec![];
                let clone_id = self.ast.alloc(Node::Class(decl));
                for param in template_params {
                    let cloned = self.clone_decl(param);
                    self.ast.add_template_param(clone_id, cloned);
                }
                for member in members {
                    let cloned = self.clone_decl(member);
                    self.ast.add_member(clone_id, cloned);
                }
                clone_id
            }
            other => {
                self.internal_violation("clone_decl on a non-declaration node");
                self.ast.alloc(other)
            }
        }
    }
}
