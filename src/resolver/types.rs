//! Type and prototype reduction.
//!
//! Reduces syntactic type expressions (`Named`, `ThisClass`, pointers and
//! callables over them) into canonical form by consulting name resolution.
//! Reduction is recursive and terminates through the general search guard;
//! no explicit cycle list is threaded through the template-parameter
//! indirection.

use crate::ast::ast::{Node, NodeId};
use crate::ast::types::{CallableType, ElementKind, ElementProto, TypeExpr};
use crate::errors::errors::{Error, ErrorImpl};

use super::context::Resolver;
use super::reach::SearchPolicy;

impl Resolver<'_> {
    /// Reduces a type expression against `scope`.
    ///
    /// `owner_kind`, when given, is the element kind of the prototype that
    /// holds this type; a template-formal-parameter indirection propagates
    /// the parameter's kind into it if it is still `Auto`.
    pub fn reduce_type(
        &mut self,
        type_expr: &TypeExpr,
        scope: NodeId,
        mut owner_kind: Option<&mut ElementKind>,
    ) -> Option<TypeExpr> {
        match type_expr {
            TypeExpr::Named(name) => {
                let candidates = self.reach(name, SearchPolicy::FULL, scope);
                match candidates[..] {
                    [] => {
                        self.ctx.report(Error::new(
                            ErrorImpl::UnresolvedName {
                                name: name.spelling(),
                            },
                            name.position.clone(),
                        ));
                        None
                    }
                    [single] => match self.ast.node(single) {
                        Node::Class(_) => Some(TypeExpr::Struct(single)),
                        Node::Enum(_) => Some(TypeExpr::Enum(single)),
                        Node::TemplateParam(param) => {
                            let proto = param.binding.clone().unwrap_or_else(|| param.proto.clone());
                            if let Some(kind) = owner_kind.as_deref_mut() {
                                if *kind == ElementKind::Auto && proto.kind != ElementKind::Auto {
                                    *kind = proto.kind;
                                }
                            }
                            let param_scope = self.ast.scope_of(single).unwrap_or(scope);
                            // The formal's prototype may name another formal
                            // (or itself); the guard entry must outlive the
                            // whole reduction for the depth to accumulate.
                            self.with_reduction_guard(single, name, |resolver| {
                                resolver.reduce_type(&proto.type_expr, param_scope, owner_kind)
                            })
                        }
                        _ => {
                            self.ctx.report(Error::new(
                                ErrorImpl::UnresolvedName {
                                    name: name.spelling(),
                                },
                                name.position.clone(),
                            ));
                            None
                        }
                    },
                    _ => {
                        self.ctx.report(Error::new(
                            ErrorImpl::AmbiguousName {
                                name: name.spelling(),
                                candidates: candidates.len(),
                            },
                            name.position.clone(),
                        ));
                        None
                    }
                }
            }
            TypeExpr::ThisClass => match self.ast.enclosing_class(scope) {
                Some(class) => Some(TypeExpr::Struct(class)),
                None => {
                    self.internal_violation("this-class type outside any class or implementation");
                    None
                }
            },
            TypeExpr::Unsolvable => None,
            TypeExpr::PointerConstrained(inner) => {
                let reduced = self.reduce_type(inner, scope, None)?;
                Some(TypeExpr::PointerConstrained(Box::new(reduced)))
            }
            TypeExpr::PointerUnconstrained(inner) => {
                let reduced = self.reduce_type(inner, scope, None)?;
                Some(TypeExpr::PointerUnconstrained(Box::new(reduced)))
            }
            TypeExpr::Callable(callable) => {
                let callable = callable.clone();
                let mut arguments = Vec::with_capacity(callable.arguments.len());
                for argument in &callable.arguments {
                    arguments.push(self.reduce_proto(argument, scope)?);
                }
                let return_proto = self.reduce_proto(&callable.return_proto, scope)?;
                Some(TypeExpr::Callable(CallableType {
                    arguments,
                    return_proto: Box::new(return_proto),
                    is_var_args: callable.is_var_args,
                }))
            }
            // Already canonical.
            other => Some(other.clone()),
        }
    }

    /// Reduces an element prototype: reduce the type, then narrow an `Auto`
    /// kind from the result. An object-kind prototype of a class that
    /// cannot be instantiated (abstract, or an un-instantiated template) is
    /// a terminal error for its owner.
    pub fn reduce_proto(&mut self, proto: &ElementProto, scope: NodeId) -> Option<ElementProto> {
        // The originating token, captured before reduction discards it.
        let position = match &proto.type_expr {
            TypeExpr::Named(name) => name.position.clone(),
            _ => crate::Position::null(),
        };
        let mut kind = proto.kind;
        let type_expr = self.reduce_type(&proto.type_expr, scope, Some(&mut kind))?;

        if kind == ElementKind::Auto {
            kind = match &type_expr {
                TypeExpr::Unknown => ElementKind::Auto,
                TypeExpr::PointerConstrained(_) => ElementKind::RefConstrained,
                TypeExpr::PointerUnconstrained(_) | TypeExpr::NullPointer => {
                    ElementKind::RefUnconstrained
                }
                _ => ElementKind::Object,
            };
        }

        if kind == ElementKind::Object {
            if let TypeExpr::Struct(class_id) = type_expr {
                if let Some(class) = self.ast.class(class_id) {
                    if class.is_abstract || class.is_generic() {
                        let type_name = class.name.clone();
                        self.ctx.report(Error::new(
                            ErrorImpl::UninstantiableType { type_: type_name },
                            position,
                        ));
                        return None;
                    }
                }
            }
        }

        Some(ElementProto {
            kind,
            type_expr,
            is_const: proto.is_const,
        })
    }
}
