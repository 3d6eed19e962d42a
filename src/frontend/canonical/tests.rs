use std::collections::BTreeSet;

use super::*;
use crate::frontend::ast::{Expr, QualifiedPath, TranslationUnit};
use crate::frontend::load;

fn unit(json: &str) -> TranslationUnit {
    load::from_json_str("test.json", json).unwrap()
}

fn with_resolver<R>(json: &str, f: impl FnOnce(Resolver<'_, '_>, &[Diagnostic]) -> R) -> R {
    let unit = unit(json);
    let tree = ModuleTree::build(&unit);
    let (cache, diagnostics) = canonicalize_all(&tree);
    f(Resolver::new(&tree, &cache), &diagnostics)
}

fn root_type(resolver: Resolver<'_, '_>, ty: TypeSpecifier) -> CanonicalType {
    resolver.type_of(&TypeScope::Module(ModuleId::ROOT), &ty)
}

fn vec3_f32() -> CanonicalType {
    CanonicalType::composite("vec3", vec![CanonicalArg::Type(CanonicalType::primitive("f32"))])
}

// ============================================================================
// Canonical forms
// ============================================================================

#[test]
fn test_predeclared_alias_expands() {
    with_resolver("{}", |resolver, _| {
        assert_eq!(root_type(resolver, TypeSpecifier::named("vec3f")), vec3_f32());
        assert_eq!(
            root_type(resolver, TypeSpecifier::generic("vec3", vec![TypeSpecifier::named("f32").into()])),
            vec3_f32()
        );
        assert_eq!(vec3_f32().to_string(), "vec3<f32>");
    });
}

#[test]
fn test_array_length_spellings_agree() {
    let json = r#"{"declarations": [
        {"kind": "const", "name": "N", "value": {"kind": "literal", "value": "4u"}}
    ]}"#;
    with_resolver(json, |resolver, _| {
        let by_literal = root_type(
            resolver,
            TypeSpecifier::generic("array", vec![TypeSpecifier::named("f32").into(), Expr::literal("0x4").into()]),
        );
        let by_const = root_type(
            resolver,
            TypeSpecifier::generic("array", vec![TypeSpecifier::named("f32").into(), TypeSpecifier::named("N").into()]),
        );
        assert_eq!(by_literal, by_const);
        assert_eq!(by_literal.to_string(), "array<f32, 4>");
    });
}

#[test]
fn test_enumerant_argument_is_a_value() {
    with_resolver("{}", |resolver, _| {
        let ty = root_type(
            resolver,
            TypeSpecifier::generic(
                "ptr",
                vec![
                    TypeSpecifier::named("storage").into(),
                    TypeSpecifier::named("f32").into(),
                    TypeSpecifier::named("read").into(),
                ],
            ),
        );
        assert_eq!(
            ty,
            CanonicalType::composite(
                "ptr",
                vec![
                    CanonicalArg::Value("storage".to_string()),
                    CanonicalArg::Type(CanonicalType::primitive("f32")),
                    CanonicalArg::Value("read".to_string()),
                ]
            )
        );
    });
}

#[test]
fn test_unknown_matches_anything() {
    let unknown_arg = CanonicalType::composite("vec3", vec![CanonicalArg::Type(CanonicalType::Unknown)]);
    assert!(CanonicalType::Unknown.matches(&vec3_f32()));
    assert!(unknown_arg.matches(&vec3_f32()));
    assert!(!vec3_f32().matches(&CanonicalType::primitive("f32")));
    assert_eq!(CanonicalType::Unknown.to_string(), "{unknown}");
}

#[test]
fn test_unknown_and_associated_parts_are_found() {
    let nested = CanonicalType::composite(
        "array",
        vec![
            CanonicalArg::Type(CanonicalType::composite(
                "vec3",
                vec![CanonicalArg::Type(CanonicalType::Associated("T".to_string()))],
            )),
            CanonicalArg::Value("4".to_string()),
        ],
    );
    assert!(!nested.contains_unknown());
    assert!(nested.substitute(&mut |_| Some(CanonicalType::Unknown)).contains_unknown());

    let mut names = BTreeSet::new();
    nested.collect_associated(&mut names);
    vec3_f32().collect_associated(&mut names);
    assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["T".to_string()]);
}

#[test]
fn test_substitute_binds_associated_types() {
    let ty = CanonicalType::composite(
        "array",
        vec![
            CanonicalArg::Type(CanonicalType::Associated("T".to_string())),
            CanonicalArg::Value("4".to_string()),
        ],
    );
    let bound = ty.substitute(&mut |name| (name == "T").then(|| CanonicalType::primitive("f32")));
    assert_eq!(bound.to_string(), "array<f32, 4>");
    let unbound = ty.substitute(&mut |_| None);
    assert_eq!(unbound, ty);
}

// ============================================================================
// Aliases
// ============================================================================

#[test]
fn test_alias_chain_resolves_to_terminal_type() {
    let json = r#"{"declarations": [
        {"kind": "alias", "name": "A", "target": "B"},
        {"kind": "alias", "name": "B", "target": "vec3f"}
    ]}"#;
    with_resolver(json, |resolver, diagnostics| {
        assert!(diagnostics.is_empty());
        assert_eq!(root_type(resolver, TypeSpecifier::named("A")), vec3_f32());
    });
}

#[test]
fn test_alias_cycle_reported_once() {
    let json = r#"{"declarations": [
        {"kind": "alias", "name": "A", "target": "B"},
        {"kind": "alias", "name": "B", "target": "A"},
        {"kind": "alias", "name": "C", "target": {"path": "array", "args": ["A", {"kind": "literal", "value": "2"}]}}
    ]}"#;
    with_resolver(json, |resolver, diagnostics| {
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line(), "A: alias cycle: A -> B -> A");
        for name in ["A", "B", "C"] {
            let decl = resolver.tree().member(ModuleId::ROOT, name).unwrap();
            assert_eq!(resolver.alias_target(decl), AliasTarget::Cycle, "{name}");
        }
        assert!(root_type(resolver, TypeSpecifier::named("C")).is_unknown());
    });
}

#[test]
fn test_self_alias_is_a_cycle() {
    let json = r#"{"declarations": [{"kind": "alias", "name": "T", "target": "T"}]}"#;
    with_resolver(json, |_, diagnostics| {
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line(), "T: alias cycle: T -> T");
    });
}

#[test]
fn test_module_alias_paths() {
    let json = r#"{"declarations": [
        {"kind": "module", "name": "Math", "declarations": [
            {"kind": "struct", "name": "Quat", "members": [{"name": "w", "ty": "f32"}]}
        ]},
        {"kind": "alias", "name": "M", "target": "Math"}
    ]}"#;
    with_resolver(json, |resolver, _| {
        let math = resolver.tree().child(ModuleId::ROOT, "Math").unwrap();
        let alias = resolver.tree().member(ModuleId::ROOT, "M").unwrap();
        assert_eq!(resolver.alias_target(alias), AliasTarget::Module(math));
        assert_eq!(resolver.module_behind(alias), Some(math));

        let quat = CanonicalType::Struct(vec!["Math".to_string(), "Quat".to_string()]);
        assert_eq!(root_type(resolver, TypeSpecifier::named("M::Quat")), quat);
        assert_eq!(root_type(resolver, TypeSpecifier::named("Math::Quat")), quat);
        assert_eq!(quat.to_string(), "Math::Quat");
    });
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn test_path_resolution_outcomes() {
    let json = r#"{"declarations": [
        {"kind": "module", "name": "Math", "declarations": [
            {"kind": "const", "name": "PI", "value": {"kind": "literal", "value": "3.14"}}
        ]}
    ]}"#;
    with_resolver(json, |resolver, _| {
        let segs = |s: &str| QualifiedPath::parse(s).segments;
        assert!(matches!(
            resolver.resolve_path(ModuleId::ROOT, &segs("Math::PI")),
            PathResolution::Found(PathTarget::Decl(_))
        ));
        assert_eq!(resolver.resolve_path(ModuleId::ROOT, &segs("std::io")), PathResolution::External);
        assert_eq!(
            resolver.resolve_path(ModuleId::ROOT, &segs("Math::TAU")),
            PathResolution::Failed {
                segment: 1,
                reason: AccessReason::NotFound
            }
        );
        assert_eq!(
            resolver.resolve_path(ModuleId::ROOT, &segs("Math::PI::x")),
            PathResolution::Failed {
                segment: 1,
                reason: AccessReason::NotAModule
            }
        );
        assert_eq!(
            resolver.resolve_path(ModuleId::ROOT, &segs("super::Math")),
            PathResolution::Failed {
                segment: 0,
                reason: AccessReason::SuperAtRoot
            }
        );
        assert_eq!(
            root_type(resolver, TypeSpecifier::named("std::Thing")),
            CanonicalType::External(vec!["std".to_string(), "Thing".to_string()])
        );
    });
}

#[test]
fn test_signature_scope_free_names_are_associated() {
    with_resolver("{}", |resolver, _| {
        let associated: BTreeSet<Ident> = ["Quat".to_string()].into_iter().collect();
        let scope = TypeScope::Signature {
            module: ModuleId::ROOT,
            associated: &associated,
        };
        assert_eq!(
            resolver.type_of(&scope, &TypeSpecifier::named("Quat")),
            CanonicalType::Associated("Quat".to_string())
        );
        assert_eq!(
            resolver.type_of(&scope, &TypeSpecifier::named("Elem")),
            CanonicalType::Associated("Elem".to_string())
        );
        assert_eq!(
            resolver.type_of(&TypeScope::Module(ModuleId::ROOT), &TypeSpecifier::named("Elem")),
            CanonicalType::External(vec!["Elem".to_string()])
        );
    });
}

// ============================================================================
// Inference and attributes
// ============================================================================

#[test]
fn test_value_type_inference() {
    let json = r#"{"declarations": [
        {"kind": "const", "name": "X", "value": {"kind": "literal", "value": "1.5"}},
        {"kind": "const", "name": "Y", "value": {"kind": "path", "path": "X"}},
        {"kind": "const", "name": "F", "ty": "f32", "value": {"kind": "literal", "value": "1.0"}},
        {"kind": "var", "address_space": "private", "name": "v",
         "value": {"kind": "call", "callee": {"path": "vec3", "args": ["f32"]}, "args": []}},
        {"kind": "var", "address_space": "private", "name": "w",
         "value": {"kind": "call", "callee": "vec3", "args": [{"kind": "literal", "value": "1.0"}]}},
        {"kind": "function", "name": "make", "return_type": "u32"},
        {"kind": "const", "name": "M", "value": {"kind": "call", "callee": "make"}},
        {"kind": "const", "name": "B", "value": {"kind": "unary", "op": "!", "operand": {"kind": "literal", "value": "true"}}}
    ]}"#;
    with_resolver(json, |resolver, _| {
        let ty = |name: &str| resolver.value_type(resolver.tree().member(ModuleId::ROOT, name).unwrap());
        assert_eq!(ty("X"), Some(CanonicalType::primitive("AbstractFloat")));
        assert_eq!(ty("Y"), Some(CanonicalType::primitive("AbstractFloat")));
        assert_eq!(ty("F"), Some(CanonicalType::primitive("f32")));
        assert_eq!(ty("v"), Some(vec3_f32()));
        assert_eq!(ty("w"), None);
        assert_eq!(ty("M"), Some(CanonicalType::primitive("u32")));
        assert_eq!(ty("B"), Some(CanonicalType::primitive("bool")));
        assert_eq!(ty("make"), None);
    });
}

#[test]
fn test_attribute_arguments_normalize() {
    let json = r#"{"declarations": [
        {"kind": "const", "name": "G", "value": {"kind": "literal", "value": "0u"}}
    ]}"#;
    with_resolver(json, |resolver, _| {
        let a = resolver.attributes(
            ModuleId::ROOT,
            &[Attribute::new("binding", vec![Expr::literal("0x1")]), Attribute::new("group", vec![Expr::path("G")])],
        );
        let b = resolver.attributes(
            ModuleId::ROOT,
            &[Attribute::new("group", vec![Expr::literal("0")]), Attribute::new("binding", vec![Expr::literal("1")])],
        );
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "@binding(1) @group(0)");
        assert_eq!(AttributeSet::default().to_string(), "(none)");
    });
}
