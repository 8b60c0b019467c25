//! Symbol mangling.
//!
//! Produces the canonical, collision-detecting string identity of any
//! resolvable declaration. Symbols serve double duty: duplicate-definition
//! detection inside one owning scope, and binding out-of-line
//! implementations to their declarations. Memoized per pass in the
//! context's symbol cache; invalidated only by clearing the whole context.

use crate::ast::ast::{Node, NodeId};
use crate::ast::types::{ElementKind, ElementProto, TypeExpr};

use super::context::Resolver;

impl Resolver<'_> {
    /// The canonical symbol of `node`, memoized.
    pub fn mangle(&mut self, node: NodeId) -> String {
        if let Some(hit) = self.ctx.symbols.get(&node) {
            return hit.clone();
        }
        let symbol = self.mangle_uncached(node);
        self.ctx.symbols.insert(node, symbol.clone());
        symbol
    }

    fn mangle_uncached(&mut self, node: NodeId) -> String {
        match self.ast.node(node).clone() {
            Node::Class(_) => format!("struct.{}", self.qualified_name(node)),
            Node::Enum(_) => format!("enum.{}", self.qualified_name(node)),
            Node::Alias(_) => format!("alias.{}", self.qualified_name(node)),
            Node::Attribute(_) => format!("attr.{}", self.qualified_name(node)),
            Node::Method(method) => {
                let signature = self.mangle_signature(
                    &method.params,
                    method.return_proto.as_ref(),
                    method.is_var_args,
                );
                format!(
                    "{}method.{}{}",
                    qualifier_prefix(method.is_const, method.is_meta),
                    self.qualified_name(node),
                    signature
                )
            }
            Node::Operator(operator) => {
                let signature =
                    self.mangle_signature(&operator.params, operator.return_proto.as_ref(), false);
                format!(
                    "{}op.{}{}",
                    qualifier_prefix(operator.is_const, operator.is_meta),
                    self.qualified_name(node),
                    signature
                )
            }
            Node::Implementation(imp) => {
                // An implementation mangles as its declaration. The
                // host-path fallback only ever names an already-erroneous,
                // unmatched implementation in diagnostics.
                if let Some(declaration) = imp.declaration {
                    return self.mangle(declaration);
                }
                if let Some(declaration) = self.bind_implementation(node) {
                    return self.mangle(declaration);
                }
                let signature =
                    self.mangle_signature(&imp.params, imp.return_proto.as_ref(), false);
                format!(
                    "{}method.{}::{}{}",
                    qualifier_prefix(imp.is_const, imp.is_meta),
                    imp.host.spelling(),
                    imp.name,
                    signature
                )
            }
            _ => {
                // Parameters, locals and statements have no linkage; a
                // scope-qualified name is still useful for diagnostics.
                format!("decl.{}", self.qualified_name(node))
            }
        }
    }

    /// The `::`-joined path of a declaration through its enclosing classes.
    /// The module's transparent wrapper terminates the walk: symbols are
    /// per-module.
    fn qualified_name(&mut self, node: NodeId) -> String {
        enum Step {
            Push,
            Stop,
            Skip,
        }

        let mut parts = vec![self.simple_name(node)];
        let mut current = self.ast.scope_of(node);
        while let Some(id) = current {
            let step = match self.ast.node(id) {
                Node::Class(class) if !class.is_transparent => Step::Push,
                Node::Class(_) | Node::Module(_) => Step::Stop,
                _ => Step::Skip,
            };
            match step {
                Step::Push => parts.push(self.simple_name(id)),
                Step::Stop => break,
                Step::Skip => {}
            }
            current = self.ast.scope_of(id);
        }
        parts.reverse();
        parts.join("::")
    }

    /// A declaration's own name link, including template arguments for a
    /// usage: `Box<int32>`.
    fn simple_name(&mut self, node: NodeId) -> String {
        let name = self
            .ast
            .name_of(node)
            .map(String::from)
            .unwrap_or_else(|| String::from("<anonymous>"));
        let template_args = match self.ast.class(node) {
            Some(class) if class.is_usage() => class.template_args.clone(),
            _ => return name,
        };
        let args: Vec<String> = template_args
            .iter()
            .map(|arg| self.mangle_template_arg(arg))
            .collect();
        format!("{}<{}>", name, args.join(","))
    }

    /// A template argument mangles as its bare type when held as a plain
    /// object, and as its full prototype form otherwise.
    fn mangle_template_arg(&mut self, arg: &ElementProto) -> String {
        if arg.kind == ElementKind::Object && !arg.is_const {
            self.mangle_type(&arg.type_expr)
        } else {
            self.mangle_proto(arg)
        }
    }

    pub fn mangle_proto(&mut self, proto: &ElementProto) -> String {
        let kind = match proto.kind {
            ElementKind::Auto => "auto",
            ElementKind::Object => "obj",
            ElementKind::RefConstrained => "cref",
            ElementKind::RefUnconstrained => "uref",
            ElementKind::OverloadRef => "oref",
        };
        let constness = if proto.is_const { "const " } else { "" };
        format!("{}{} {}", constness, kind, self.mangle_type(&proto.type_expr))
    }

    pub fn mangle_type(&mut self, type_expr: &TypeExpr) -> String {
        match type_expr {
            TypeExpr::Unknown => String::from("?"),
            TypeExpr::Unsolvable => String::from("!"),
            TypeExpr::ThisClass => String::from("this"),
            TypeExpr::Named(name) => name.spelling(),
            TypeExpr::Struct(id) | TypeExpr::Enum(id) => self.qualified_name(*id),
            TypeExpr::Entity(id) => format!("entity {}", self.qualified_name(*id)),
            TypeExpr::PointerConstrained(inner) => format!("{}*", self.mangle_type(inner)),
            TypeExpr::PointerUnconstrained(inner) => format!("{}^", self.mangle_type(inner)),
            TypeExpr::NullPointer => String::from("null"),
            TypeExpr::Void => String::from("void"),
            TypeExpr::Basic(basic) => String::from(basic.name()),
            TypeExpr::Callable(callable) => {
                let args: Vec<String> = callable
                    .arguments
                    .iter()
                    .map(|arg| self.mangle_proto(arg))
                    .collect();
                let ret = self.mangle_proto(&callable.return_proto);
                format!("fn({})=>{}", args.join(","), ret)
            }
        }
    }

    /// `(p1,p2[,...])` plus `=>ret` when a return prototype is present.
    fn mangle_signature(
        &mut self,
        params: &[NodeId],
        return_proto: Option<&ElementProto>,
        is_var_args: bool,
    ) -> String {
        let protos = self.param_protos(params);
        let mut pieces: Vec<String> = Vec::with_capacity(protos.len() + 1);
        for proto in &protos {
            pieces.push(self.mangle_proto(proto));
        }
        if is_var_args {
            pieces.push(String::from("..."));
        }
        let mut out = format!("({})", pieces.join(","));
        if let Some(return_proto) = return_proto {
            let return_proto = return_proto.clone();
            out.push_str("=>");
            out.push_str(&self.mangle_proto(&return_proto));
        }
        out
    }

    /// Locates the declaration an out-of-line implementation belongs to:
    /// a method or operator with the same name, parameter count, const/meta
    /// flags, and structurally identical prototypes. Operators match by
    /// their operator name (`as`, `sctor`, ...).
    pub fn bind_implementation(&mut self, imp: NodeId) -> Option<NodeId> {
        let (name, host_class, params, return_proto, is_const, is_meta) =
            match self.ast.node(imp) {
                Node::Implementation(imp) => (
                    imp.name.clone(),
                    imp.host_class?,
                    imp.params.clone(),
                    imp.return_proto.clone(),
                    imp.is_const,
                    imp.is_meta,
                ),
                _ => return None,
            };

        let imp_protos = self.param_protos(&params);
        let members = self.ast.class(host_class)?.members.clone();

        for member in members {
            let (decl_name, decl_params, decl_return, decl_const, decl_meta) =
                match self.ast.node(member) {
                    Node::Method(method) => (
                        method.name.clone(),
                        method.params.clone(),
                        method.return_proto.clone(),
                        method.is_const,
                        method.is_meta,
                    ),
                    Node::Operator(operator) => (
                        String::from(operator.kind.name()),
                        operator.params.clone(),
                        operator.return_proto.clone(),
                        operator.is_const,
                        operator.is_meta,
                    ),
                    _ => continue,
                };
            if decl_name != name
                || decl_const != is_const
                || decl_meta != is_meta
                || decl_params.len() != params.len()
            {
                continue;
            }
            let decl_protos = self.param_protos(&decl_params);

            let params_match = imp_protos
                .iter()
                .zip(decl_protos.iter())
                .all(|(a, b)| a.is_identical(b, false));
            let returns_match = match (&return_proto, &decl_return) {
                (None, None) => true,
                (Some(a), Some(b)) => a.is_identical(b, false),
                _ => false,
            };
            if params_match && returns_match {
                return Some(member);
            }
        }
        None
    }

    fn param_protos(&self, params: &[NodeId]) -> Vec<ElementProto> {
        params
            .iter()
            .filter_map(|id| match self.ast.node(*id) {
                Node::Param(param) => Some(param.proto.clone()),
                _ => None,
            })
            .collect()
    }
}

fn qualifier_prefix(is_const: bool, is_meta: bool) -> &'static str {
    match (is_const, is_meta) {
        (true, true) => "const meta ",
        (true, false) => "const ",
        (false, true) => "meta ",
        (false, false) => "",
    }
}
