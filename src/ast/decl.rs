//! Payload structs for modules, declarations and scope-bearing statements.
//!
//! Every struct here is one `Node` variant's data. The parser (or a test)
//! builds these and hands them to the arena; the resolver then mutates the
//! embedded type expressions and prototypes in place as it reduces them.

use crate::Span;

use super::ast::NodeId;
use super::types::{ElementKind, ElementProto, NameExpr, TypeExpr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Where a dependency's module is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Local,
    Root,
    Package(String),
    /// No origin tag; the loader falls back Local then Root.
    Unspecified,
}

/// A module dependency descriptor.
///
/// An alias of `this` merges the dependency's declarations transparently
/// into the importing module's own lookup.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub name: String,
    pub alias: Option<String>,
    pub origin: Origin,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub dependencies: Vec<Dependency>,
    /// Top-level declarations, unparented until association wraps them in
    /// the transparent class.
    pub declarations: Vec<NodeId>,
    /// Out-of-line implementations declared at module level.
    pub implementations: Vec<NodeId>,
    /// The synthesized transparent class, set by association.
    pub transparent: Option<NodeId>,
    /// The designated entry method, set by entry-point resolution.
    pub entry: Option<NodeId>,
    /// Source document records, carried for the upstream reporter.
    pub documents: Vec<String>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Module {
            name: String::from(name),
            dependencies: vec![],
            declarations: vec![],
            implementations: vec![],
            transparent: None,
            entry: None,
            documents: vec![],
        }
    }
}

/// One boolean constraint unit over a named template formal parameter.
#[derive(Debug, Clone)]
pub struct PredicateUnit {
    pub param: String,
    pub rule: PredicateRule,
}

#[derive(Debug, Clone)]
pub enum PredicateRule {
    KindIs(ElementKind),
    KindIsNot(ElementKind),
    IsPointer,
    IsNotPointer,
    DescendsFrom(TypeExpr),
    NotDescendsFrom(TypeExpr),
}

/// A conjunction of predicate units; holds if every unit holds.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub units: Vec<PredicateUnit>,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub visibility: Visibility,
    pub span: Span,
    pub is_abstract: bool,
    /// Synthesized wrapper holding a module's top-level declarations.
    pub is_transparent: bool,
    /// Single superclass, as an unreduced type expression.
    pub base: Option<TypeExpr>,
    pub template_params: Vec<NodeId>,
    pub predicates: Vec<Predicate>,
    pub members: Vec<NodeId>,
    /// Monomorphized usages, canonical by argument structure.
    pub usages: Vec<NodeId>,
    /// On a usage: the generic class it was cloned from.
    pub generic_origin: Option<NodeId>,
    /// On a usage: the reduced argument list.
    pub template_args: Vec<ElementProto>,
    /// On a usage: every satisfied predicate index.
    pub premises: Vec<usize>,
    /// Ordered inheritance table, root to leaf (self last); filled by validation.
    pub inheritance: Vec<NodeId>,
}

impl ClassDecl {
    pub fn new(name: &str) -> Self {
        ClassDecl {
            name: String::from(name),
            visibility: Visibility::Public,
            span: Span::null(),
            is_abstract: false,
            is_transparent: false,
            base: None,
            template_params: vec![],
            predicates: vec![],
            members: vec![],
            usages: vec![],
            generic_origin: None,
            template_args: vec![],
            premises: vec![],
            inheritance: vec![],
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.template_params.is_empty() && self.generic_origin.is_none()
    }

    pub fn is_usage(&self) -> bool {
        self.generic_origin.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub visibility: Visibility,
    pub span: Span,
    pub enumerators: Vec<NodeId>,
}

impl EnumDecl {
    pub fn new(name: &str) -> Self {
        EnumDecl {
            name: String::from(name),
            visibility: Visibility::Public,
            span: Span::null(),
            enumerators: vec![],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Enumerator {
    pub name: String,
    pub span: Span,
    pub value: i64,
}

#[derive(Debug, Clone)]
pub struct AliasDecl {
    pub name: String,
    pub visibility: Visibility,
    pub span: Span,
    pub target: NameExpr,
}

impl AliasDecl {
    pub fn new(name: &str, target: NameExpr) -> Self {
        AliasDecl {
            name: String::from(name),
            visibility: Visibility::Public,
            span: Span::null(),
            target,
        }
    }
}

/// A data member of a class (or a module-level variable, via the
/// transparent class).
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    pub name: String,
    pub visibility: Visibility,
    pub span: Span,
    pub proto: ElementProto,
    /// Predicate indices this member depends on; empty = unconditional.
    pub premises: Vec<usize>,
}

impl AttributeDecl {
    pub fn new(name: &str, proto: ElementProto) -> Self {
        AttributeDecl {
            name: String::from(name),
            visibility: Visibility::Public,
            span: Span::null(),
            proto,
            premises: vec![],
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub visibility: Visibility,
    pub span: Span,
    pub params: Vec<NodeId>,
    pub return_proto: Option<ElementProto>,
    pub is_var_args: bool,
    pub is_const: bool,
    pub is_meta: bool,
    pub premises: Vec<usize>,
}

impl MethodDecl {
    pub fn new(name: &str) -> Self {
        MethodDecl {
            name: String::from(name),
            visibility: Visibility::Public,
            span: Span::null(),
            params: vec![],
            return_proto: None,
            is_var_args: false,
            is_const: false,
            is_meta: false,
            premises: vec![],
        }
    }
}

/// The operator families the resolver cares about.
///
/// `Convert` is the `as` conversion operator; `StructCtor`/`ListCtor` are
/// the construction operators explored by construction matching. Everything
/// else (arithmetic, comparison, ...) is `Custom` and only participates in
/// mangling and duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorKind {
    Convert,
    StructCtor,
    ListCtor,
    Custom(String),
}

impl OperatorKind {
    pub fn name(&self) -> &str {
        match self {
            OperatorKind::Convert => "as",
            OperatorKind::StructCtor => "sctor",
            OperatorKind::ListCtor => "lctor",
            OperatorKind::Custom(name) => name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperatorDecl {
    pub kind: OperatorKind,
    pub visibility: Visibility,
    pub span: Span,
    pub params: Vec<NodeId>,
    pub return_proto: Option<ElementProto>,
    pub is_const: bool,
    pub is_meta: bool,
    /// A deleted overload; never collides with another deleted overload.
    pub is_deleted: bool,
    pub premises: Vec<usize>,
}

impl OperatorDecl {
    pub fn new(kind: OperatorKind) -> Self {
        OperatorDecl {
            kind,
            visibility: Visibility::Public,
            span: Span::null(),
            params: vec![],
            return_proto: None,
            is_const: false,
            is_meta: false,
            is_deleted: false,
            premises: vec![],
        }
    }
}

/// A template formal parameter.
///
/// `proto` is the declared prototype (type `Unknown` in the generic class);
/// `binding` is the concrete argument on a usage's clone of the parameter.
#[derive(Debug, Clone)]
pub struct TemplateParam {
    pub name: String,
    pub span: Span,
    pub proto: ElementProto,
    pub binding: Option<ElementProto>,
}

impl TemplateParam {
    pub fn new(name: &str) -> Self {
        TemplateParam {
            name: String::from(name),
            span: Span::null(),
            proto: ElementProto::auto(TypeExpr::Unknown),
            binding: None,
        }
    }
}

/// A method, operator or lambda parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub span: Span,
    pub proto: ElementProto,
    pub has_default: bool,
}

impl ParamDecl {
    pub fn new(name: &str, proto: ElementProto) -> Self {
        ParamDecl {
            name: String::from(name),
            span: Span::null(),
            proto,
            has_default: false,
        }
    }
}

/// A local element (variable) declared inside a block-like scope.
#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub name: String,
    pub span: Span,
    pub proto: ElementProto,
}

/// An out-of-line implementation of a declared method or operator.
#[derive(Debug, Clone)]
pub struct Implementation {
    pub name: String,
    pub span: Span,
    /// The host class, as spelled at the definition site.
    pub host: NameExpr,
    /// The resolved host class, set by implementation validation.
    pub host_class: Option<NodeId>,
    pub params: Vec<NodeId>,
    pub return_proto: Option<ElementProto>,
    pub is_const: bool,
    pub is_meta: bool,
    pub locals: Vec<NodeId>,
    /// The declaration this implementation was bound to.
    pub declaration: Option<NodeId>,
}

impl Implementation {
    pub fn new(name: &str, host: NameExpr) -> Self {
        Implementation {
            name: String::from(name),
            span: Span::null(),
            host,
            host_class: None,
            params: vec![],
            return_proto: None,
            is_const: false,
            is_meta: false,
            locals: vec![],
            declaration: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockStmt {
    pub locals: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct LoopStmt {
    pub label: Option<String>,
    pub locals: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct AssumeStmt {
    pub locals: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct LambdaExpr {
    pub params: Vec<NodeId>,
    pub locals: Vec<NodeId>,
}
