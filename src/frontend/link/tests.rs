use super::*;
use crate::frontend::ast::TranslationUnit;
use crate::frontend::canonical::{Resolver, canonicalize_all};
use crate::frontend::load;
use crate::frontend::printer::PrintConfig;
use crate::frontend::registry::SignatureRegistry;
use crate::frontend::tree::ModuleTree;

const MATH: &str = include_str!("../../../tests/fixtures/math.json");
const MATH_VIOLATIONS: &str = include_str!("../../../tests/fixtures/math_violations.json");
const MATH_REEXPORT: &str = include_str!("../../../tests/fixtures/math_reexport.json");

fn unit(json: &str) -> TranslationUnit {
    load::from_json_str("test.json", json).unwrap()
}

fn with_linker<R>(json: &str, f: impl FnOnce(Linker<'_, '_>) -> R) -> R {
    let unit = unit(json);
    let tree = ModuleTree::build(&unit);
    let (cache, _) = canonicalize_all(&tree);
    let resolver = Resolver::new(&tree, &cache);
    let registry = SignatureRegistry::build(resolver);
    f(Linker::new(Context::new(resolver, &registry)))
}

fn violations(json: &str) -> Vec<String> {
    with_linker(json, |linker| {
        linker
            .validate_accesses()
            .iter()
            .map(Diagnostic::line)
            .collect()
    })
}

fn linked_text(json: &str) -> String {
    with_linker(json, |linker| render(&linker.link(), PrintConfig::default()))
}

// ============================================================================
// Worked scenario
// ============================================================================

#[test]
fn test_worked_scenario_linked_output() {
    insta::assert_snapshot!(linked_text(MATH), @r"
    mod Math {
        mod Float {
            alias T = f32;

            const DEG_TO_RAD: f32 = 0.017453292;

            const PI: f32 = 3.14159265;

            type Quat;

            fn quat_from_euler(euler: vec3<T>) -> Quat {
                return Quat(vec4<T>(euler, private_function()));
            }
        }
    }

    @fragment fn main() -> @location(0) vec4<f32> {
        let q = Math::Float::quat_from_euler(vec3<f32>(Math::Float::DEG_TO_RAD));
        return q.v;
    }
    ");
}

#[test]
fn test_worked_scenario_accesses_are_allowed() {
    assert!(violations(MATH).is_empty());
}

#[test]
fn test_unexposed_paths_are_rejected() {
    assert_eq!(
        violations(MATH_VIOLATIONS),
        vec![
            "leak: access to `Math::FloatMath::quat_from_euler` rejected at `FloatMath`: not exposed",
            "leak: access to `Math::Float::private_function` rejected at `private_function`: not exposed",
        ]
    );
}

#[test]
fn test_worked_scenario_views() {
    with_linker(MATH, |linker| {
        let tree = linker.ctx.resolver.tree();
        let math = tree.child(ModuleId::ROOT, "Math").unwrap();
        let float_math = tree.child(math, "FloatMath").unwrap();

        match linker.view_of_module(ModuleId::ROOT, math) {
            View::Filtered {
                implementation,
                exposed,
                ..
            } => {
                assert_eq!(implementation, math);
                assert_eq!(exposed.names().collect::<Vec<_>>(), vec!["Float"]);
            }
            other => panic!("expected a filtered view, got {other:?}"),
        }
        assert_eq!(linker.view_of_module(float_math, math), View::Full(math));

        let float = tree.member(math, "Float").unwrap();
        match linker.view_of_decl(math, float) {
            Some(View::Filtered {
                implementation,
                exposed,
                ..
            }) => {
                assert_eq!(implementation, float_math);
                assert!(exposed.contains("quat_from_euler"));
                assert!(!exposed.contains("private_function"));
            }
            other => panic!("expected a filtered view, got {other:?}"),
        }
    });
}

#[test]
fn test_exposed_functions_keep_their_bodies() {
    let text = linked_text(MATH);
    assert!(text.contains("return Quat(vec4<T>(euler, private_function()));"), "{text}");
    assert!(!text.contains("fn private_function"), "{text}");
}

#[test]
fn test_linked_tree_hides_implementation_module() {
    with_linker(MATH, |linker| {
        let linked = linker.link();
        let Some(LinkedMember::Module(math)) = linked.root.member("Math") else {
            panic!("Math is emitted as a module block");
        };
        assert!(math.member("FloatMath").is_none());
        let Some(LinkedMember::Module(float)) = math.member("Float") else {
            panic!("Float is emitted as a module block");
        };
        assert_eq!(float.member("Quat"), Some(&LinkedMember::OpaqueType("Quat".to_string())));
        assert!(float.member("private_function").is_none());
        assert!(linked.root.member("MathImpl").is_none());
    });
}

// ============================================================================
// Access rules
// ============================================================================

#[test]
fn test_module_uses_its_own_private_members() {
    let json = r#"{"declarations": [
        {"kind": "module_sig", "name": "S", "members": [{"kind": "const", "name": "A", "ty": "i32"}]},
        {"kind": "module", "name": "Lib", "signatures": ["S"], "declarations": [
            {"kind": "const", "name": "A", "ty": "i32", "value": {"kind": "literal", "value": "1i"}},
            {"kind": "module", "name": "Detail", "declarations": [
                {"kind": "const", "name": "B", "ty": "i32", "value": {"kind": "literal", "value": "2i"}},
                {"kind": "const", "name": "C", "ty": "i32", "value": {"kind": "path", "path": "super::A"}}
            ]},
            {"kind": "const", "name": "D", "ty": "i32", "value": {"kind": "path", "path": "Detail::B"}},
            {"kind": "const", "name": "E", "ty": "i32", "value": {"kind": "path", "path": "package::Lib::Detail::B"}}
        ]},
        {"kind": "const", "name": "OK", "ty": "i32", "value": {"kind": "path", "path": "Lib::A"}},
        {"kind": "const", "name": "BAD", "ty": "i32", "value": {"kind": "path", "path": "Lib::Detail::B"}}
    ]}"#;
    assert_eq!(
        violations(json),
        vec!["BAD: access to `Lib::Detail::B` rejected at `Detail`: not exposed"]
    );
}

#[test]
fn test_access_failure_reasons() {
    let json = r#"{"declarations": [
        {"kind": "module", "name": "M", "declarations": [
            {"kind": "const", "name": "X", "ty": "i32", "value": {"kind": "literal", "value": "1i"}}
        ]},
        {"kind": "alias", "name": "Scalar", "target": "f32"},
        {"kind": "function", "name": "f", "body": [
            {"kind": "expr", "expr": {"kind": "path", "path": "M::Y"}},
            {"kind": "expr", "expr": {"kind": "path", "path": "M::X::z"}},
            {"kind": "expr", "expr": {"kind": "path", "path": "super::M"}},
            {"kind": "expr", "expr": {"kind": "path", "path": "Scalar::x"}},
            {"kind": "expr", "expr": {"kind": "path", "path": "std::thing"}}
        ]}
    ]}"#;
    assert_eq!(
        violations(json),
        vec![
            "f: access to `M::Y` rejected at `Y`: not found",
            "f: access to `M::X::z` rejected at `X`: not a module",
            "f: access to `super::M` rejected at `super`: super at package root",
            "f: access to `Scalar::x` rejected at `Scalar`: not a module",
        ]
    );
}

#[test]
fn test_check_access_reports_segment_index() {
    with_linker(MATH, |linker| {
        let segments = |s: &str| crate::frontend::ast::QualifiedPath::parse(s).segments;
        assert_eq!(
            linker.check_access(ModuleId::ROOT, &segments("Math::Float::private_function")),
            Some(AccessFailure {
                segment: 2,
                reason: AccessReason::NotExposed
            })
        );
        assert_eq!(linker.check_access(ModuleId::ROOT, &segments("Math::Float::PI")), None);
        assert_eq!(linker.check_access(ModuleId::ROOT, &segments("Math")), None);
    });
}

#[test]
fn test_signature_less_alias_forwards_view() {
    let json = r#"{"declarations": [
        {"kind": "module_sig", "name": "S", "members": [{"kind": "const", "name": "A", "ty": "i32"}]},
        {"kind": "module", "name": "Lib", "signatures": ["S"], "declarations": [
            {"kind": "const", "name": "A", "ty": "i32", "value": {"kind": "literal", "value": "1i"}},
            {"kind": "const", "name": "HIDDEN", "ty": "i32", "value": {"kind": "literal", "value": "2i"}}
        ]},
        {"kind": "alias", "name": "L", "target": "Lib"},
        {"kind": "const", "name": "X", "ty": "i32", "value": {"kind": "path", "path": "L::A"}},
        {"kind": "const", "name": "Y", "ty": "i32", "value": {"kind": "path", "path": "L::HIDDEN"}}
    ]}"#;
    assert_eq!(
        violations(json),
        vec!["Y: access to `L::HIDDEN` rejected at `HIDDEN`: not exposed"]
    );
    insta::assert_snapshot!(linked_text(json), @r"
    mod Lib {
        const A: i32 = 1i;
    }

    alias L = Lib;

    const X: i32 = L::A;

    const Y: i32 = L::HIDDEN;
    ");
}

#[test]
fn test_signature_less_alias_keeps_the_view_of_its_target_path() {
    assert_eq!(
        violations(MATH_REEXPORT),
        vec!["leak: access to `G::private_function` rejected at `private_function`: not exposed"]
    );
    with_linker(MATH_REEXPORT, |linker| {
        let tree = linker.ctx.resolver.tree();
        let float_math = tree.child(tree.child(ModuleId::ROOT, "Math").unwrap(), "FloatMath").unwrap();
        let alias = tree.member(ModuleId::ROOT, "G").unwrap();
        match linker.alias_view(alias) {
            View::Filtered {
                implementation,
                exposed,
                ..
            } => {
                assert_eq!(implementation, float_math);
                assert!(exposed.contains("PI"));
                assert!(!exposed.contains("private_function"));
            }
            other => panic!("expected the view of `Math::Float`, got {other:?}"),
        }
        assert_eq!(linker.view_of_decl(ModuleId::ROOT, alias), Some(linker.alias_view(alias)));
        let segments = |s: &str| crate::frontend::ast::QualifiedPath::parse(s).segments;
        assert_eq!(linker.check_access(ModuleId::ROOT, &segments("G::quat_from_euler")), None);
    });
}

#[test]
fn test_nested_alias_block_shows_only_what_its_target_path_exposes() {
    with_linker(MATH_REEXPORT, |linker| {
        let linked = linker.link();
        let Some(LinkedMember::Module(r)) = linked.root.member("R") else {
            panic!("R is emitted as a module block");
        };
        let Some(LinkedMember::Module(g)) = r.member("G") else {
            panic!("G is emitted as a module block");
        };
        assert!(g.members.is_empty(), "{g:?}");
        assert!(matches!(linked.root.member("G"), Some(LinkedMember::Declaration(_))));
    });
    assert!(!linked_text(MATH_REEXPORT).contains("fn private_function"));
}

#[test]
fn test_alias_cycle_poisons_access() {
    let json = r#"{"declarations": [
        {"kind": "alias", "name": "A", "target": "B"},
        {"kind": "alias", "name": "B", "target": "A"},
        {"kind": "function", "name": "f", "body": [
            {"kind": "expr", "expr": {"kind": "path", "path": "A::x::y"}}
        ]}
    ]}"#;
    assert!(violations(json).is_empty());
}

// ============================================================================
// Linked output
// ============================================================================

#[test]
fn test_opaque_type_never_reveals_target() {
    let json = r#"{"declarations": [
        {"kind": "module_sig", "name": "S", "members": [
            {"kind": "type", "name": "Handle"},
            {"kind": "function", "name": "make", "return_type": "Handle"}
        ]},
        {"kind": "module", "name": "M", "signatures": ["S"], "declarations": [
            {"kind": "alias", "name": "Handle", "target": "u32"},
            {"kind": "function", "name": "make", "return_type": "Handle", "body": [
                {"kind": "return", "value": {"kind": "literal", "value": "7u"}}
            ]}
        ]}
    ]}"#;
    let text = linked_text(json);
    assert!(!text.contains("u32"));
    insta::assert_snapshot!(text, @r"
    mod M {
        type Handle;

        fn make() -> Handle {
            return 7u;
        }
    }
    ");
}

#[test]
fn test_unconstrained_nested_module_is_emitted_in_full() {
    let json = r#"{"declarations": [
        {"kind": "module", "name": "Util", "declarations": [
            {"kind": "const_assert", "expr": {"kind": "literal", "value": "true"}},
            {"kind": "module_sig", "name": "Unused", "members": []},
            {"kind": "const", "name": "ONE", "value": {"kind": "literal", "value": "1"}}
        ]}
    ]}"#;
    insta::assert_snapshot!(linked_text(json), @r"
    mod Util {
        const_assert true;

        const ONE = 1;
    }
    ");
}

#[test]
fn test_unknown_declared_signature_links_empty_and_poisons_access() {
    let json = r#"{"declarations": [
        {"kind": "module", "name": "M", "signatures": ["Missing"], "declarations": [
            {"kind": "const", "name": "A", "value": {"kind": "literal", "value": "1"}}
        ]},
        {"kind": "const", "name": "B", "value": {"kind": "path", "path": "M::A"}}
    ]}"#;
    assert!(violations(json).is_empty());
    assert_eq!(linked_text(json), "mod M {\n}\n\nconst B = M::A;\n");
}

#[test]
fn test_nested_requirement_narrows_unconstrained_module() {
    let json = r#"{"declarations": [
        {"kind": "module_sig", "name": "Pi", "members": [{"kind": "const", "name": "PI", "ty": "f32"}]},
        {"kind": "module_sig", "name": "Outer", "members": [
            {"kind": "module", "name": "Inner", "signatures": ["Pi"]}
        ]},
        {"kind": "module", "name": "O", "signatures": ["Outer"], "declarations": [
            {"kind": "module", "name": "Inner", "declarations": [
                {"kind": "const", "name": "PI", "ty": "f32", "value": {"kind": "literal", "value": "3.14f"}},
                {"kind": "const", "name": "E", "ty": "f32", "value": {"kind": "literal", "value": "2.71f"}}
            ]}
        ]},
        {"kind": "const", "name": "X", "value": {"kind": "path", "path": "O::Inner::E"}}
    ]}"#;
    assert_eq!(
        violations(json),
        vec!["X: access to `O::Inner::E` rejected at `E`: not exposed"]
    );
    insta::assert_snapshot!(linked_text(json), @r"
    mod O {
        mod Inner {
            const PI: f32 = 3.14f;
        }
    }

    const X = O::Inner::E;
    ");
}

#[test]
fn test_run_collects_violations_and_output() {
    with_linker(MATH_VIOLATIONS, |linker| {
        let outcome = linker.run();
        assert_eq!(outcome.violations.len(), 2);
        assert!(outcome.linked.root.member("leak").is_some());
    });
}
