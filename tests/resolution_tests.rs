//! End-to-end resolution scenarios over hand-built module forests, driving
//! the public validation entry points the way an upstream front end would.

use resolver::ast::ast::{Ast, Node, NodeId};
use resolver::ast::decl::{
    AttributeDecl, ClassDecl, Dependency, Implementation, MethodDecl, OperatorDecl, OperatorKind,
    Origin, ParamDecl, Predicate, PredicateRule, PredicateUnit, TemplateParam,
};
use resolver::ast::types::{BasicType, ElementKind, ElementProto, NameExpr, TypeExpr};
use resolver::resolver::context::{ModuleRegistry, Resolver};
use resolver::resolver::reach::SearchPolicy;
use resolver::MK_PROTO;

fn int32() -> TypeExpr {
    TypeExpr::Basic(BasicType::Int32)
}

fn diagnostic_names<'a>(resolver: &'a Resolver) -> Vec<&'a str> {
    resolver
        .ctx
        .diagnostics
        .iter()
        .map(|error| error.get_error_name())
        .collect()
}

/// A module holding `class Box<T> where T is not a pointer { value: T }`.
fn box_module(ast: &mut Ast) -> (NodeId, NodeId) {
    let module = ast.new_module("main");
    let generic = ast.alloc(Node::Class(ClassDecl::new("Box")));
    ast.add_module_decl(module, generic);
    let formal = ast.alloc(Node::TemplateParam(TemplateParam::new("T")));
    ast.add_template_param(generic, formal);
    if let Some(class) = ast.class_mut(generic) {
        class.predicates = vec![Predicate {
            units: vec![PredicateUnit {
                param: String::from("T"),
                rule: PredicateRule::IsNotPointer,
            }],
        }];
    }
    let value = ast.alloc(Node::Attribute(AttributeDecl::new(
        "value",
        ElementProto::auto(TypeExpr::Named(NameExpr::simple("T"))),
    )));
    ast.add_member(generic, value);
    (module, generic)
}

#[test]
fn test_template_usage_end_to_end() {
    let mut ast = Ast::new();
    let (module, generic) = box_module(&mut ast);
    let registry = ModuleRegistry::new();
    let mut resolver = Resolver::new(&mut ast, &registry);
    resolver.validate_forest(&[module]);
    assert!(resolver.ctx.diagnostics.is_empty());

    let name = NameExpr::templated("Box", vec![MK_PROTO!(ElementKind::Object, int32())]);
    let first = resolver.reach(&name, SearchPolicy::FULL, module);
    let second = resolver.reach(&name, SearchPolicy::FULL, module);
    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert!(resolver.ctx.diagnostics.is_empty());

    let usage = first[0];
    assert_eq!(
        resolver.ast.class(usage).unwrap().generic_origin,
        Some(generic)
    );
    assert_eq!(resolver.mangle(usage), "struct.Box<int32>");

    // The cloned attribute reduced to a by-value int32.
    let members = resolver.ast.class(usage).unwrap().members.clone();
    let Node::Attribute(value) = resolver.ast.node(members[0]) else {
        panic!("expected the cloned attribute");
    };
    assert_eq!(value.proto.kind, ElementKind::Object);
    assert!(value.proto.type_expr.is_identical(&int32(), false));
}

#[test]
fn test_pointer_argument_violates_box_predicate() {
    let mut ast = Ast::new();
    let (module, _) = box_module(&mut ast);
    let registry = ModuleRegistry::new();
    let mut resolver = Resolver::new(&mut ast, &registry);
    resolver.validate_forest(&[module]);

    let name = NameExpr::templated(
        "Box",
        vec![MK_PROTO!(
            ElementKind::RefConstrained,
            TypeExpr::PointerConstrained(Box::new(int32()))
        )],
    );
    let found = resolver.reach(&name, SearchPolicy::FULL, module);
    assert!(found.is_empty());
    assert_eq!(
        diagnostic_names(&resolver),
        vec!["TemplatePredicateUnsatisfied"]
    );
}

fn entry_method(ast: &mut Ast, module: NodeId, argc_type: TypeExpr) {
    let mut main = MethodDecl::new("main");
    main.return_proto = Some(MK_PROTO!(ElementKind::Object, int32()));
    let main = ast.alloc(Node::Method(main));
    ast.add_module_decl(module, main);
    let argc = ast.alloc(Node::Param(ParamDecl::new(
        "argc",
        MK_PROTO!(ElementKind::Object, argc_type),
    )));
    ast.add_param(main, argc);
    let argv_type = TypeExpr::PointerConstrained(Box::new(TypeExpr::PointerConstrained(
        Box::new(TypeExpr::PointerConstrained(Box::new(TypeExpr::Basic(
            BasicType::Int8,
        )))),
    )));
    let argv = ast.alloc(Node::Param(ParamDecl::new(
        "argv",
        MK_PROTO!(ElementKind::Object, argv_type),
    )));
    ast.add_param(main, argv);
}

#[test]
fn test_entry_point_resolution() {
    let mut ast = Ast::new();
    let module = ast.new_module("main");
    entry_method(&mut ast, module, int32());
    let registry = ModuleRegistry::new();
    let mut resolver = Resolver::new(&mut ast, &registry);
    resolver.validate_forest(&[module]);

    assert!(resolver.ctx.diagnostics.is_empty());
    assert!(resolver.ast.module(module).unwrap().entry.is_some());
}

#[test]
fn test_entry_point_signature_mismatch() {
    let mut ast = Ast::new();
    let module = ast.new_module("main");
    entry_method(&mut ast, module, TypeExpr::Basic(BasicType::Int64));
    let registry = ModuleRegistry::new();
    let mut resolver = Resolver::new(&mut ast, &registry);
    resolver.validate_forest(&[module]);

    assert_eq!(diagnostic_names(&resolver), vec!["EntrySignatureMismatch"]);
    assert!(resolver.ast.module(module).unwrap().entry.is_none());
}

fn class_with_foo(ast: &mut Ast) -> (NodeId, NodeId, NodeId) {
    let module = ast.new_module("main");
    let class = ast.alloc(Node::Class(ClassDecl::new("A")));
    ast.add_module_decl(module, class);
    let mut foo = MethodDecl::new("foo");
    foo.return_proto = Some(MK_PROTO!(ElementKind::Object, int32()));
    let foo = ast.alloc(Node::Method(foo));
    ast.add_member(class, foo);
    let param = ast.alloc(Node::Param(ParamDecl::new(
        "x",
        MK_PROTO!(ElementKind::Object, int32()),
    )));
    ast.add_param(foo, param);
    (module, class, foo)
}

#[test]
fn test_implementation_binds_to_declaration() {
    let mut ast = Ast::new();
    let (module, class, foo) = class_with_foo(&mut ast);

    let mut imp_decl = Implementation::new("foo", NameExpr::simple("A"));
    imp_decl.return_proto = Some(MK_PROTO!(ElementKind::Object, int32()));
    let imp = ast.alloc(Node::Implementation(imp_decl));
    let param = ast.alloc(Node::Param(ParamDecl::new(
        "x",
        MK_PROTO!(ElementKind::Object, int32()),
    )));
    ast.add_param(imp, param);
    ast.add_module_implementation(module, imp);

    let registry = ModuleRegistry::new();
    let mut resolver = Resolver::new(&mut ast, &registry);
    resolver.validate_forest(&[module]);

    assert!(resolver.ctx.diagnostics.is_empty());
    let Node::Implementation(bound) = resolver.ast.node(imp) else {
        panic!("expected the implementation node");
    };
    assert_eq!(bound.host_class, Some(class));
    assert_eq!(bound.declaration, Some(foo));
    // The implementation shares its declaration's symbol.
    assert_eq!(resolver.mangle(imp), resolver.mangle(foo));
}

#[test]
fn test_implementation_binds_to_operator_declaration() {
    let mut ast = Ast::new();
    let module = ast.new_module("main");
    let class = ast.alloc(Node::Class(ClassDecl::new("A")));
    ast.add_module_decl(module, class);
    let mut op = OperatorDecl::new(OperatorKind::Convert);
    op.return_proto = Some(MK_PROTO!(ElementKind::Object, int32()));
    let op = ast.alloc(Node::Operator(op));
    ast.add_member(class, op);

    // Out-of-line `as` operator body, spelled by the operator's name.
    let mut imp_decl = Implementation::new("as", NameExpr::simple("A"));
    imp_decl.return_proto = Some(MK_PROTO!(ElementKind::Object, int32()));
    let imp = ast.alloc(Node::Implementation(imp_decl));
    ast.add_module_implementation(module, imp);

    let registry = ModuleRegistry::new();
    let mut resolver = Resolver::new(&mut ast, &registry);
    resolver.validate_forest(&[module]);

    assert!(resolver.ctx.diagnostics.is_empty());
    let Node::Implementation(bound) = resolver.ast.node(imp) else {
        panic!("expected the implementation node");
    };
    assert_eq!(bound.host_class, Some(class));
    assert_eq!(bound.declaration, Some(op));
    assert_eq!(resolver.mangle(imp), resolver.mangle(op));
}

#[test]
fn test_unmatched_implementation_is_reported() {
    let mut ast = Ast::new();
    let (module, _, _) = class_with_foo(&mut ast);

    // `bar` matches nothing in `A`.
    let imp = ast.alloc(Node::Implementation(Implementation::new(
        "bar",
        NameExpr::simple("A"),
    )));
    ast.add_module_implementation(module, imp);

    let registry = ModuleRegistry::new();
    let mut resolver = Resolver::new(&mut ast, &registry);
    resolver.validate_forest(&[module]);

    assert_eq!(diagnostic_names(&resolver), vec!["UnmatchedImplementation"]);
}

#[test]
fn test_qualified_name_reaches_into_dependency() {
    let mut ast = Ast::new();
    let util = ast.new_module("util");
    let helper = ast.alloc(Node::Class(ClassDecl::new("Helper")));
    ast.add_module_decl(util, helper);

    let main = ast.new_module("main");
    ast.module_mut(main).unwrap().dependencies.push(Dependency {
        name: String::from("util"),
        alias: None,
        origin: Origin::Unspecified,
    });

    let mut registry = ModuleRegistry::new();
    registry.register_local("util", util);
    let mut resolver = Resolver::new(&mut ast, &registry);
    resolver.validate_forest(&[util, main]);

    let found = resolver.reach(&NameExpr::chain(&["util", "Helper"]), SearchPolicy::FULL, main);
    assert_eq!(found, vec![helper]);
    assert!(resolver.ctx.diagnostics.is_empty());
}

#[test]
fn test_this_aliased_dependency_merges_transparently() {
    let mut ast = Ast::new();
    let util = ast.new_module("util");
    let helper = ast.alloc(Node::Class(ClassDecl::new("Helper")));
    ast.add_module_decl(util, helper);

    let main = ast.new_module("main");
    ast.module_mut(main).unwrap().dependencies.push(Dependency {
        name: String::from("util"),
        alias: Some(String::from("this")),
        origin: Origin::Local,
    });

    let mut registry = ModuleRegistry::new();
    registry.register_local("util", util);
    let mut resolver = Resolver::new(&mut ast, &registry);
    resolver.validate_forest(&[util, main]);

    // No qualification needed: the dependency's declarations are merged.
    let found = resolver.reach(&NameExpr::simple("Helper"), SearchPolicy::FULL, main);
    assert_eq!(found, vec![helper]);
}

#[test]
fn test_context_clear_allows_an_independent_pass() {
    let mut ast = Ast::new();
    let (module, _) = box_module(&mut ast);
    let registry = ModuleRegistry::new();
    let mut resolver = Resolver::new(&mut ast, &registry);
    resolver.validate_forest(&[module]);

    let name = NameExpr::templated("Box", vec![MK_PROTO!(ElementKind::Object, int32())]);
    let before = resolver.reach(&name, SearchPolicy::FULL, module);

    resolver.ctx.clear();
    let after = resolver.reach(&name, SearchPolicy::FULL, module);
    assert_eq!(before, after);
    assert!(resolver.ctx.diagnostics.is_empty());
}
