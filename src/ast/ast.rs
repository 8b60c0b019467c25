//! The node arena and the closed node sum type.
//!
//! Every AST node lives in one `Ast` arena and is addressed by a stable
//! `NodeId`. Scope relationships are indices, not owning references, so the
//! same declaration can be reached from module tables, inheritance chains
//! and template usage lists without ownership cycles. "Set scope exactly
//! once" is enforced by the adoption API: re-adopting a node into a
//! different scope is an internal-consistency violation, reported through
//! tracing rather than the user diagnostic sink.

use tracing::error;

use super::decl::{
    AliasDecl, AssumeStmt, AttributeDecl, BlockStmt, ClassDecl, EnumDecl, Enumerator,
    Implementation, LambdaExpr, LocalDecl, LoopStmt, MethodDecl, Module, OperatorDecl, ParamDecl,
    TemplateParam,
};

/// Stable index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// The closed set of node kinds.
///
/// Asking "is this a method?" is a single pattern match; there is no
/// runtime downcasting anywhere in the resolver.
#[derive(Debug, Clone)]
pub enum Node {
    Module(Module),
    Class(ClassDecl),
    Enum(EnumDecl),
    Enumerator(Enumerator),
    Alias(AliasDecl),
    Attribute(AttributeDecl),
    Method(MethodDecl),
    Operator(OperatorDecl),
    TemplateParam(TemplateParam),
    Param(ParamDecl),
    Local(LocalDecl),
    Implementation(Implementation),
    Block(BlockStmt),
    Loop(LoopStmt),
    Assume(AssumeStmt),
    Lambda(LambdaExpr),
}

#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    scopes: Vec<Option<NodeId>>,
}

impl Ast {
    pub fn new() -> Self {
        Ast {
            nodes: vec![],
            scopes: vec![],
        }
    }

    /// Inserts a node with no enclosing scope yet.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.scopes.push(None);
        id
    }

    /// Inserts a node directly under `scope`.
    pub fn alloc_in(&mut self, node: Node, scope: NodeId) -> NodeId {
        let id = self.alloc(node);
        self.scopes[id.0 as usize] = Some(scope);
        id
    }

    /// Sets a node's enclosing scope, exactly once.
    ///
    /// Adopting into the scope already set is a no-op; adopting into a
    /// different scope is rejected.
    pub fn adopt(&mut self, child: NodeId, scope: NodeId) -> bool {
        match self.scopes[child.0 as usize] {
            None => {
                self.scopes[child.0 as usize] = Some(scope);
                true
            }
            Some(existing) if existing == scope => true,
            Some(existing) => {
                error!(
                    ?child,
                    ?existing,
                    ?scope,
                    "attempted to re-adopt a node into a different scope"
                );
                false
            }
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn scope_of(&self, id: NodeId) -> Option<NodeId> {
        self.scopes[id.0 as usize]
    }

    pub fn class(&self, id: NodeId) -> Option<&ClassDecl> {
        match self.node(id) {
            Node::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn class_mut(&mut self, id: NodeId) -> Option<&mut ClassDecl> {
        match self.node_mut(id) {
            Node::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn module(&self, id: NodeId) -> Option<&Module> {
        match self.node(id) {
            Node::Module(module) => Some(module),
            _ => None,
        }
    }

    pub fn module_mut(&mut self, id: NodeId) -> Option<&mut Module> {
        match self.node_mut(id) {
            Node::Module(module) => Some(module),
            _ => None,
        }
    }

    /// The declared simple name of a node, if it has one.
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        match self.node(id) {
            Node::Module(module) => Some(&module.name),
            Node::Class(class) => Some(&class.name),
            Node::Enum(decl) => Some(&decl.name),
            Node::Enumerator(decl) => Some(&decl.name),
            Node::Alias(decl) => Some(&decl.name),
            Node::Attribute(decl) => Some(&decl.name),
            Node::Method(decl) => Some(&decl.name),
            Node::Operator(decl) => Some(decl.kind.name()),
            Node::TemplateParam(decl) => Some(&decl.name),
            Node::Param(decl) => Some(&decl.name),
            Node::Local(decl) => Some(&decl.name),
            Node::Implementation(decl) => Some(&decl.name),
            Node::Loop(stmt) => stmt.label.as_deref(),
            Node::Block(_) | Node::Assume(_) | Node::Lambda(_) => None,
        }
    }

    /// Whether this node can own named children and be a lookup target.
    pub fn is_scope(&self, id: NodeId) -> bool {
        matches!(
            self.node(id),
            Node::Module(_)
                | Node::Class(_)
                | Node::Implementation(_)
                | Node::Block(_)
                | Node::Loop(_)
                | Node::Assume(_)
                | Node::Lambda(_)
        )
    }

    /// Walks upward from `from` (inclusive) to the nearest true scope node,
    /// skipping pass-through nodes.
    pub fn nearest_scope(&self, from: NodeId) -> Option<NodeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            if self.is_scope(id) {
                return Some(id);
            }
            current = self.scope_of(id);
        }
        None
    }

    /// The class a `this`-class type refers to from `from`: the nearest
    /// implementation or class scope, an implementation resolving through
    /// its host class.
    pub fn enclosing_class(&self, from: NodeId) -> Option<NodeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            match self.node(id) {
                Node::Class(class) if !class.is_transparent => return Some(id),
                Node::Implementation(imp) => return imp.host_class,
                _ => {}
            }
            current = self.scope_of(id);
        }
        None
    }

    // Builder helpers. Tests and the upstream parser construct forests
    // through these so adoption happens in one place.

    pub fn new_module(&mut self, name: &str) -> NodeId {
        self.alloc(Node::Module(Module::new(name)))
    }

    /// Registers a top-level declaration; it stays unparented until
    /// association wraps it in the module's transparent class.
    pub fn add_module_decl(&mut self, module: NodeId, decl: NodeId) {
        if let Node::Module(m) = self.node_mut(module) {
            m.declarations.push(decl);
        } else {
            error!(?module, "add_module_decl target is not a module");
        }
    }

    pub fn add_module_implementation(&mut self, module: NodeId, imp: NodeId) {
        self.adopt(imp, module);
        if let Node::Module(m) = self.node_mut(module) {
            m.implementations.push(imp);
        } else {
            error!(?module, "add_module_implementation target is not a module");
        }
    }

    /// Adds a member declaration to a class, adopting it.
    pub fn add_member(&mut self, class: NodeId, member: NodeId) {
        self.adopt(member, class);
        if let Node::Class(c) = self.node_mut(class) {
            c.members.push(member);
        } else {
            error!(?class, "add_member target is not a class");
        }
    }

    pub fn add_template_param(&mut self, class: NodeId, param: NodeId) {
        self.adopt(param, class);
        if let Node::Class(c) = self.node_mut(class) {
            c.template_params.push(param);
        } else {
            error!(?class, "add_template_param target is not a class");
        }
    }

    pub fn add_param(&mut self, callable: NodeId, param: NodeId) {
        self.adopt(param, callable);
        match self.node_mut(callable) {
            Node::Method(m) => m.params.push(param),
            Node::Operator(o) => o.params.push(param),
            Node::Implementation(i) => i.params.push(param),
            Node::Lambda(l) => l.params.push(param),
            _ => error!(?callable, "add_param target is not callable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::decl::ClassDecl;

    #[test]
    fn test_adopt_exactly_once() {
        let mut ast = Ast::new();
        let module_a = ast.new_module("a");
        let module_b = ast.new_module("b");
        let class = ast.alloc(Node::Class(ClassDecl::new("C")));

        assert!(ast.adopt(class, module_a));
        // Same scope again is fine.
        assert!(ast.adopt(class, module_a));
        // A different scope is rejected and the original link survives.
        assert!(!ast.adopt(class, module_b));
        assert_eq!(ast.scope_of(class), Some(module_a));
    }

    #[test]
    fn test_nearest_scope_skips_pass_through_nodes() {
        let mut ast = Ast::new();
        let module = ast.new_module("m");
        let class = ast.alloc(Node::Class(ClassDecl::new("C")));
        ast.adopt(class, module);

        let attr = ast.alloc_in(
            Node::Attribute(crate::ast::decl::AttributeDecl::new(
                "value",
                crate::ast::types::ElementProto::object(crate::ast::types::TypeExpr::Void),
            )),
            class,
        );

        // An attribute is not itself a scope; lookup starts at its class.
        assert_eq!(ast.nearest_scope(attr), Some(class));
        assert_eq!(ast.nearest_scope(class), Some(class));
    }
}
