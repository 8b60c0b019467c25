//! The validation driver.
//!
//! Orders the whole pass over a module forest: associate every module's
//! top-level declarations into one transparent container, validate every
//! declaration (which recursively drives type resolution, name resolution,
//! template instantiation and conversion matching), then validate every
//! out-of-line implementation and resolve the entry method. A failed check
//! short-circuits itself only; sibling checks continue so one pass surfaces
//! every independent error.

use tracing::debug;

use crate::ast::ast::{Node, NodeId};
use crate::ast::decl::ClassDecl;
use crate::ast::types::{BasicType, ElementKind, ElementProto, TypeExpr};
use crate::errors::errors::{Error, ErrorImpl};
use crate::{Position, MK_PROTO};

use super::context::Resolver;
use super::reach::SearchPolicy;

impl Resolver<'_> {
    /// Runs the full pass over `modules`, in dependency-agnostic order.
    pub fn validate_forest(&mut self, modules: &[NodeId]) {
        for module in modules {
            self.associate(*module);
        }
        for module in modules {
            self.validate_module(*module);
        }
        for module in modules {
            self.validate_implementations(*module);
        }
        for module in modules {
            self.resolve_entry(*module);
        }
    }

    /// Wraps the module's top-level declarations in the synthesized
    /// transparent class, so module-level and class-level members share one
    /// lookup path. Idempotent.
    pub fn associate(&mut self, module: NodeId) {
        let (name, declarations, existing) = match self.ast.module(module) {
            Some(m) => (m.name.clone(), m.declarations.clone(), m.transparent),
            None => {
                self.internal_violation("associate called on a non-module node");
                return;
            }
        };
        if existing.is_some() {
            return;
        }

        let mut transparent = ClassDecl::new(&name);
        transparent.is_transparent = true;
        let transparent_id = self.ast.alloc_in(Node::Class(transparent), module);
        for declaration in declarations {
            self.ast.add_member(transparent_id, declaration);
        }
        if let Some(m) = self.ast.module_mut(module) {
            m.transparent = Some(transparent_id);
        }
        debug!(?module, ?transparent_id, "associated transparent class");
    }

    pub fn validate_module(&mut self, module: NodeId) {
        let transparent = match self.ast.module(module) {
            Some(m) => m.transparent,
            None => {
                self.internal_violation("validate_module called on a non-module node");
                return;
            }
        };
        let Some(transparent) = transparent else {
            self.internal_violation("validate_module before association");
            return;
        };
        self.validate_class(transparent);
    }

    /// Validates one class: superclass chain, duplicate definitions, every
    /// member's prototypes, then by-value containment cycles. Generic
    /// classes are skipped; their usages are validated at instantiation.
    pub fn validate_class(&mut self, class: NodeId) {
        let (is_generic, is_transparent, members) = match self.ast.class(class) {
            Some(c) => (c.is_generic(), c.is_transparent, c.members.clone()),
            None => {
                self.internal_violation("validate_class called on a non-class node");
                return;
            }
        };
        if is_generic {
            return;
        }

        if !is_transparent {
            self.inheritance_table(class);
        }

        // Prototypes must be reduced before duplicate detection, since the
        // mangled symbols it compares are memoized on first computation.
        for member in members {
            self.validate_member(member);
        }
        self.check_duplicates(class);

        if !is_transparent {
            let mut visited = vec![];
            self.check_containment(class, class, &mut visited);
        }
    }

    fn validate_member(&mut self, member: NodeId) {
        match self.ast.node(member) {
            Node::Attribute(attribute) => {
                let proto = attribute.proto.clone();
                if let Some(reduced) = self.reduce_proto(&proto, member) {
                    if let Node::Attribute(attribute) = self.ast.node_mut(member) {
                        attribute.proto = reduced;
                    }
                }
            }
            Node::Method(method) => {
                let params = method.params.clone();
                let return_proto = method.return_proto.clone();
                self.validate_params(member, &params);
                if let Some(return_proto) = return_proto {
                    if let Some(reduced) = self.reduce_proto(&return_proto, member) {
                        if let Node::Method(method) = self.ast.node_mut(member) {
                            method.return_proto = Some(reduced);
                        }
                    }
                }
            }
            Node::Operator(operator) => {
                let params = operator.params.clone();
                let return_proto = operator.return_proto.clone();
                self.validate_params(member, &params);
                if let Some(return_proto) = return_proto {
                    if let Some(reduced) = self.reduce_proto(&return_proto, member) {
                        if let Node::Operator(operator) = self.ast.node_mut(member) {
                            operator.return_proto = Some(reduced);
                        }
                    }
                }
            }
            Node::Class(_) => self.validate_class(member),
            Node::Alias(alias) => {
                let target = alias.target.clone();
                let scope = self.ast.scope_of(member);
                let Some(scope) = scope else {
                    self.internal_violation("alias declaration has no enclosing scope");
                    return;
                };
                let resolved = self.reach(&target, SearchPolicy::FULL, scope);
                match resolved.len() {
                    0 => self.ctx.report(Error::new(
                        ErrorImpl::UnresolvedName {
                            name: target.spelling(),
                        },
                        target.position.clone(),
                    )),
                    1 => {}
                    n => self.ctx.report(Error::new(
                        ErrorImpl::AmbiguousName {
                            name: target.spelling(),
                            candidates: n,
                        },
                        target.position.clone(),
                    )),
                }
            }
            Node::Enum(_) | Node::Enumerator(_) => {}
            _ => {}
        }
    }

    fn validate_params(&mut self, owner: NodeId, params: &[NodeId]) {
        for param in params {
            let proto = match self.ast.node(*param) {
                Node::Param(p) => p.proto.clone(),
                _ => continue,
            };
            if let Some(reduced) = self.reduce_proto(&proto, owner) {
                if let Node::Param(p) = self.ast.node_mut(*param) {
                    p.proto = reduced;
                }
            }
        }
    }

    /// The ordered inheritance table of `class`, root to leaf with the
    /// class itself last, built on first demand. Superclass type
    /// expressions are reduced in place; a chain revisiting a class is an
    /// inheritance-cycle error that truncates the table.
    pub fn inheritance_table(&mut self, class: NodeId) -> Vec<NodeId> {
        if let Some(c) = self.ast.class(class) {
            if !c.inheritance.is_empty() {
                return c.inheritance.clone();
            }
        }

        let mut chain = vec![class];
        let mut current = class;
        loop {
            let base = match self.ast.class(current) {
                Some(c) => c.base.clone(),
                None => break,
            };
            let Some(base) = base else { break };

            let superclass = match base {
                TypeExpr::Struct(id) => Some(id),
                other => {
                    let scope = self.ast.scope_of(current);
                    match scope {
                        Some(scope) => match self.reduce_type(&other, scope, None) {
                            Some(TypeExpr::Struct(id)) => {
                                if let Some(c) = self.ast.class_mut(current) {
                                    c.base = Some(TypeExpr::Struct(id));
                                }
                                Some(id)
                            }
                            _ => None,
                        },
                        None => None,
                    }
                }
            };
            let Some(superclass) = superclass else { break };

            if chain.contains(&superclass) {
                let (name, position) = self.decl_identity(class);
                self.ctx
                    .report(Error::new(ErrorImpl::InheritanceCycle { class: name }, position));
                break;
            }
            chain.insert(0, superclass);
            current = superclass;
        }

        if let Some(c) = self.ast.class_mut(class) {
            c.inheritance = chain.clone();
        }
        chain
    }

    /// Two declarations with equal simple name and equal mangled symbol in
    /// one owning scope collide, except that deleted operator overloads
    /// never collide with each other.
    fn check_duplicates(&mut self, class: NodeId) {
        let members = match self.ast.class(class) {
            Some(c) => c.members.clone(),
            None => return,
        };

        let mut entries: Vec<(String, String, bool)> = vec![];
        for member in members {
            let Some(name) = self.ast.name_of(member).map(String::from) else {
                continue;
            };
            let is_deleted_operator = matches!(
                self.ast.node(member),
                Node::Operator(operator) if operator.is_deleted
            );
            let symbol = self.mangle(member);

            let collides = entries.iter().any(|(prior_name, prior_symbol, prior_deleted)| {
                *prior_name == name
                    && *prior_symbol == symbol
                    && !(*prior_deleted && is_deleted_operator)
            });
            if collides {
                let (_, position) = self.decl_identity(member);
                self.ctx.report(Error::new(
                    ErrorImpl::DuplicateDefinition {
                        name: name.clone(),
                        symbol: symbol.clone(),
                    },
                    position,
                ));
            }
            entries.push((name, symbol, is_deleted_operator));
        }
    }

    /// Walks by-value struct members looking for a chain that embeds the
    /// origin class into itself.
    fn check_containment(&mut self, origin: NodeId, current: NodeId, visited: &mut Vec<NodeId>) {
        if visited.contains(&current) {
            return;
        }
        visited.push(current);

        let members = match self.ast.class(current) {
            Some(c) => c.members.clone(),
            None => return,
        };

        let mut embedded: Vec<(String, Position, NodeId)> = vec![];
        for member in &members {
            if let Node::Attribute(attribute) = self.ast.node(*member) {
                if attribute.proto.kind == ElementKind::Object {
                    if let TypeExpr::Struct(target) = attribute.proto.type_expr {
                        embedded.push((
                            attribute.name.clone(),
                            attribute.span.start.clone(),
                            target,
                        ));
                    }
                }
            }
        }

        for (member_name, position, target) in embedded {
            if target == origin {
                let (class_name, _) = self.decl_identity(origin);
                self.ctx.report(Error::new(
                    ErrorImpl::MemberContainmentCycle {
                        class: class_name,
                        member: member_name,
                    },
                    position,
                ));
            } else {
                self.check_containment(origin, target, visited);
            }
        }
    }

    /// Binds every out-of-line implementation of the module to its
    /// declaration; an implementation matching nothing is an error (its
    /// symbol falls back to a host-path spelling for the report).
    pub fn validate_implementations(&mut self, module: NodeId) {
        let implementations = match self.ast.module(module) {
            Some(m) => m.implementations.clone(),
            None => return,
        };

        for imp in implementations {
            let (host, name, params, return_proto) = match self.ast.node(imp) {
                Node::Implementation(i) => (
                    i.host.clone(),
                    i.name.clone(),
                    i.params.clone(),
                    i.return_proto.clone(),
                ),
                _ => continue,
            };

            let candidates = self.reach(&host, SearchPolicy::FULL, module);
            let host_class = match candidates[..] {
                [single] if matches!(self.ast.node(single), Node::Class(_)) => Some(single),
                [] | [_] => {
                    self.ctx.report(Error::new(
                        ErrorImpl::UnresolvedName {
                            name: host.spelling(),
                        },
                        host.position.clone(),
                    ));
                    None
                }
                _ => {
                    self.ctx.report(Error::new(
                        ErrorImpl::AmbiguousName {
                            name: host.spelling(),
                            candidates: candidates.len(),
                        },
                        host.position.clone(),
                    ));
                    None
                }
            };
            if let Node::Implementation(i) = self.ast.node_mut(imp) {
                i.host_class = host_class;
            }
            if host_class.is_none() {
                continue;
            }

            self.validate_params(imp, &params);
            if let Some(return_proto) = return_proto {
                if let Some(reduced) = self.reduce_proto(&return_proto, imp) {
                    if let Node::Implementation(i) = self.ast.node_mut(imp) {
                        i.return_proto = Some(reduced);
                    }
                }
            }

            match self.bind_implementation(imp) {
                Some(declaration) => {
                    if let Node::Implementation(i) = self.ast.node_mut(imp) {
                        i.declaration = Some(declaration);
                    }
                    let symbol = self.mangle(imp);
                    debug!(?imp, ?declaration, symbol, "bound implementation");
                }
                None => {
                    let (_, position) = self.decl_identity(imp);
                    self.ctx.report(Error::new(
                        ErrorImpl::UnmatchedImplementation { name },
                        position,
                    ));
                }
            }
        }
    }

    /// The designated entry method: named `main`, with the exact signature
    /// `(int32, int8***) => int32`.
    pub fn resolve_entry(&mut self, module: NodeId) {
        let transparent = match self.ast.module(module) {
            Some(m) => m.transparent,
            None => return,
        };
        let Some(transparent) = transparent else { return };
        let members = match self.ast.class(transparent) {
            Some(c) => c.members.clone(),
            None => return,
        };

        let argc = MK_PROTO!(ElementKind::Object, TypeExpr::Basic(BasicType::Int32));
        let argv = MK_PROTO!(
            ElementKind::Object,
            TypeExpr::PointerConstrained(Box::new(TypeExpr::PointerConstrained(Box::new(
                TypeExpr::PointerConstrained(Box::new(TypeExpr::Basic(BasicType::Int8)))
            ))))
        );
        let ret = MK_PROTO!(ElementKind::Object, TypeExpr::Basic(BasicType::Int32));

        for member in members {
            let Node::Method(method) = self.ast.node(member) else {
                continue;
            };
            if method.name != "main" {
                continue;
            }
            let params = method.params.clone();
            let return_proto = method.return_proto.clone();
            let position = method.span.start.clone();

            let protos: Vec<ElementProto> = params
                .iter()
                .filter_map(|id| match self.ast.node(*id) {
                    Node::Param(p) => Some(p.proto.clone()),
                    _ => None,
                })
                .collect();

            let signature_matches = protos.len() == 2
                && protos[0].is_identical(&argc, false)
                && protos[1].is_identical(&argv, false)
                && return_proto
                    .as_ref()
                    .is_some_and(|proto| proto.is_identical(&ret, false));

            if signature_matches {
                if let Some(m) = self.ast.module_mut(module) {
                    m.entry = Some(member);
                }
            } else {
                self.ctx.report(Error::new(
                    ErrorImpl::EntrySignatureMismatch {
                        name: String::from("main"),
                    },
                    position,
                ));
            }
            return;
        }
    }

    /// Name and position of a declaration, for diagnostics.
    fn decl_identity(&self, id: NodeId) -> (String, Position) {
        let name = self
            .ast
            .name_of(id)
            .map(String::from)
            .unwrap_or_else(|| String::from("<anonymous>"));
        let position = match self.ast.node(id) {
            Node::Class(d) => d.span.start.clone(),
            Node::Enum(d) => d.span.start.clone(),
            Node::Enumerator(d) => d.span.start.clone(),
            Node::Alias(d) => d.span.start.clone(),
            Node::Attribute(d) => d.span.start.clone(),
            Node::Method(d) => d.span.start.clone(),
            Node::Operator(d) => d.span.start.clone(),
            Node::TemplateParam(d) => d.span.start.clone(),
            Node::Param(d) => d.span.start.clone(),
            Node::Local(d) => d.span.start.clone(),
            Node::Implementation(d) => d.span.start.clone(),
            _ => Position::null(),
        };
        (name, position)
    }
}
