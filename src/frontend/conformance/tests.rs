use super::*;
use crate::frontend::ast::TranslationUnit;
use crate::frontend::canonical::canonicalize_all;
use crate::frontend::load;
use crate::frontend::tree::ModuleTree;

fn unit(json: &str) -> TranslationUnit {
    load::from_json_str("test.json", json).unwrap()
}

/// Run the declared check of the declaration at `path` (module names, then the declaration's name).
fn check_at(json: &str, path: &[&str]) -> ConformanceResult {
    let unit = unit(json);
    let tree = ModuleTree::build(&unit);
    let (cache, _) = canonicalize_all(&tree);
    let resolver = Resolver::new(&tree, &cache);
    let registry = SignatureRegistry::build(resolver);
    let ctx = Context::new(resolver, &registry);

    let (last, modules) = path.split_last().unwrap();
    let module = modules
        .iter()
        .fold(ModuleId::ROOT, |m, name| tree.child(m, name).unwrap());
    let decl = tree.member(module, last).unwrap();
    check_declaration(ctx, decl).expect("declaration declares signatures")
}

fn lines(result: &ConformanceResult) -> Vec<String> {
    result
        .diagnostics()
        .iter()
        .flat_map(Diagnostic::leaves)
        .map(Diagnostic::line)
        .collect()
}

fn with_module(sigs: &str, members: &str) -> String {
    format!(
        r#"{{"declarations": [
            {sigs},
            {{"kind": "module", "name": "M", "signatures": ["S"], "declarations": [{members}]}}
        ]}}"#
    )
}

const PI_SIG: &str = r#"{"kind": "module_sig", "name": "S", "members": [{"kind": "const", "name": "PI", "ty": "f32"}]}"#;

// ============================================================================
// Values
// ============================================================================

#[test]
fn test_exact_match_conforms() {
    let json = with_module(
        PI_SIG,
        r#"{"kind": "const", "name": "PI", "ty": "f32", "value": {"kind": "literal", "value": "3.14159"}}"#,
    );
    assert_eq!(check_at(&json, &["M"]), ConformanceResult::Conforms);
}

#[test]
fn test_extra_members_are_ignored() {
    let json = with_module(
        PI_SIG,
        r#"{"kind": "const", "name": "PI", "value": {"kind": "literal", "value": "3.14f"}},
           {"kind": "function", "name": "helper"},
           {"kind": "var", "address_space": "private", "name": "scratch", "ty": "u32"}"#,
    );
    assert!(check_at(&json, &["M"]).conforms());
}

#[test]
fn test_missing_member() {
    let json = with_module(PI_SIG, "");
    let result = check_at(&json, &["M"]);
    assert_eq!(lines(&result), vec!["PI: missing required constant"]);
}

#[test]
fn test_kind_mismatch() {
    let json = with_module(PI_SIG, r#"{"kind": "function", "name": "PI", "return_type": "f32"}"#);
    assert_eq!(
        lines(&check_at(&json, &["M"])),
        vec!["PI: kind mismatch: expected constant, found function"]
    );
}

#[test]
fn test_type_mismatch() {
    let json = with_module(
        PI_SIG,
        r#"{"kind": "const", "name": "PI", "ty": "u32", "value": {"kind": "literal", "value": "3u"}}"#,
    );
    assert_eq!(
        lines(&check_at(&json, &["M"])),
        vec!["PI: type mismatch: expected `f32`, found `u32`"]
    );
}

#[test]
fn test_abstract_literal_does_not_match_concrete_type() {
    let json = with_module(
        PI_SIG,
        r#"{"kind": "const", "name": "PI", "value": {"kind": "literal", "value": "3.14"}}"#,
    );
    assert_eq!(
        lines(&check_at(&json, &["M"])),
        vec!["PI: type mismatch: expected `f32`, found `AbstractFloat`"]
    );
}

#[test]
fn test_uninferred_value() {
    let json = with_module(
        PI_SIG,
        r#"{"kind": "const", "name": "PI", "value": {"kind": "member",
            "base": {"kind": "path", "path": "consts"}, "member": "pi"}}"#,
    );
    assert_eq!(
        lines(&check_at(&json, &["M"])),
        vec!["PI: type mismatch: expected `f32`, found `{uninferred}`"]
    );
}

#[test]
fn test_var_qualifiers_compared_when_required() {
    let sig = r#"{"kind": "module_sig", "name": "S", "members": [
        {"kind": "var", "address_space": "storage", "access_mode": "read_write", "name": "data",
         "ty": {"path": "array", "args": ["u32"]},
         "attributes": [{"name": "group", "args": [{"kind": "literal", "value": "0"}]},
                        {"name": "binding", "args": [{"kind": "literal", "value": "0"}]}]},
        {"kind": "var", "name": "counter", "ty": "u32"}
    ]}"#;
    let json = with_module(
        sig,
        r#"{"kind": "var", "address_space": "storage", "name": "data",
            "ty": {"path": "array", "args": ["u32"]},
            "attributes": [{"name": "binding", "args": [{"kind": "literal", "value": "0u"}]},
                           {"name": "group", "args": [{"kind": "literal", "value": "1"}]}]},
           {"kind": "var", "address_space": "workgroup", "name": "counter", "ty": "u32"}"#,
    );
    assert_eq!(
        lines(&check_at(&json, &["M"])),
        vec![
            "data: access mode mismatch: expected `read_write`, found `none`",
            "data: declaration attributes differ: expected @binding(0) @group(0), found @binding(0) @group(1)",
        ]
    );
}

#[test]
fn test_override_attributes() {
    let sig = r#"{"kind": "module_sig", "name": "S", "members": [
        {"kind": "override", "name": "WIDTH", "ty": "u32", "attributes": [{"name": "id", "args": [{"kind": "literal", "value": "0"}]}]}
    ]}"#;
    let good = with_module(
        sig,
        r#"{"kind": "override", "name": "WIDTH", "ty": "u32", "attributes": [{"name": "id", "args": [{"kind": "literal", "value": "0x0"}]}]}"#,
    );
    assert!(check_at(&good, &["M"]).conforms());
    let bad = with_module(sig, r#"{"kind": "override", "name": "WIDTH", "ty": "u32"}"#);
    assert_eq!(
        lines(&check_at(&bad, &["M"])),
        vec!["WIDTH: declaration attributes differ: expected @id(0), found (none)"]
    );
}

// ============================================================================
// Functions
// ============================================================================

const FN_SIG: &str = r#"{"kind": "module_sig", "name": "S", "members": [
    {"kind": "function", "name": "f",
     "params": [{"ty": "vec3f", "attributes": [{"name": "location", "args": [{"kind": "literal", "value": "0"}]}]},
                {"ty": "f32"}],
     "return_type": "f32"},
    {"kind": "function", "name": "g", "return_type": "f32"}
]}"#;

#[test]
fn test_function_shapes_match() {
    let json = with_module(
        FN_SIG,
        r#"{"kind": "function", "name": "f",
            "params": [{"name": "v", "ty": {"path": "vec3", "args": ["f32"]},
                        "attributes": [{"name": "location", "args": [{"kind": "literal", "value": "0u"}]}]},
                       {"name": "scale", "ty": "f32"}],
            "return_type": "f32"},
           {"kind": "function", "name": "g", "return_type": "f32"}"#,
    );
    assert!(check_at(&json, &["M"]).conforms());
}

#[test]
fn test_parameter_count_and_return_type() {
    let json = with_module(
        FN_SIG,
        r#"{"kind": "function", "name": "f", "params": [{"name": "v", "ty": "vec3f"}], "return_type": "u32"},
           {"kind": "function", "name": "g"}"#,
    );
    assert_eq!(
        lines(&check_at(&json, &["M"])),
        vec![
            "f: parameter count mismatch: expected `2`, found `1`",
            "f: return type mismatch: expected `f32`, found `u32`",
            "g: return type mismatch: expected `f32`, found `nothing`",
        ]
    );
}

#[test]
fn test_parameter_types_and_attributes() {
    let json = with_module(
        FN_SIG,
        r#"{"kind": "function", "name": "f",
            "params": [{"name": "v", "ty": "vec3f", "attributes": [{"name": "location", "args": [{"kind": "literal", "value": "1"}]}]},
                       {"name": "scale", "ty": "i32"}],
            "return_type": "f32"},
           {"kind": "function", "name": "g", "return_type": "f32", "attributes": [{"name": "must_use"}]}"#,
    );
    assert_eq!(
        lines(&check_at(&json, &["M"])),
        vec![
            "f: parameter 1 attributes differ: expected @location(0), found @location(1)",
            "f: parameter 2 type mismatch: expected `f32`, found `i32`",
            "g: function attributes differ: expected (none), found @must_use",
        ]
    );
}

// ============================================================================
// Types
// ============================================================================

#[test]
fn test_opaque_type_accepts_any_definition() {
    let sig = r#"{"kind": "module_sig", "name": "S", "members": [{"kind": "type", "name": "Quat"}]}"#;
    let as_struct = with_module(sig, r#"{"kind": "struct", "name": "Quat", "members": [{"name": "w", "ty": "f32"}]}"#);
    let as_alias = with_module(sig, r#"{"kind": "alias", "name": "Quat", "target": "vec4f"}"#);
    assert!(check_at(&as_struct, &["M"]).conforms());
    assert!(check_at(&as_alias, &["M"]).conforms());
}

#[test]
fn test_constrained_type() {
    let sig = r#"{"kind": "module_sig", "name": "S", "members": [{"kind": "type", "name": "T", "constraint": "f32"}]}"#;
    let good = with_module(sig, r#"{"kind": "alias", "name": "T", "target": "f32"}"#);
    let bad = with_module(sig, r#"{"kind": "alias", "name": "T", "target": "f16"}"#);
    assert!(check_at(&good, &["M"]).conforms());
    assert_eq!(
        lines(&check_at(&bad, &["M"])),
        vec!["T: type mismatch: expected `f32`, found `f16`"]
    );
}

#[test]
fn test_associated_types_bind_to_the_implementation() {
    let sig = r#"{"kind": "module_sig", "name": "S", "members": [
        {"kind": "type", "name": "Quat"},
        {"kind": "function", "name": "identity", "return_type": "Quat"},
        {"kind": "function", "name": "scale", "params": [{"ty": "T"}, {"ty": "Quat"}], "return_type": "Quat"},
        {"kind": "type", "name": "T", "constraint": "f32"}
    ]}"#;
    let json = with_module(
        sig,
        r#"{"kind": "alias", "name": "T", "target": "f32"},
           {"kind": "struct", "name": "Quat", "members": [{"name": "v", "ty": "vec4f"}]},
           {"kind": "function", "name": "identity", "return_type": "Quat"},
           {"kind": "function", "name": "scale", "params": [{"name": "s", "ty": "f32"}, {"name": "q", "ty": "Quat"}],
            "return_type": "vec4f"}"#,
    );
    assert_eq!(
        lines(&check_at(&json, &["M"])),
        vec!["scale: return type mismatch: expected `M::Quat`, found `vec4<f32>`"]
    );
}

#[test]
fn test_missing_associated_type_reports_only_the_type() {
    let sig = r#"{"kind": "module_sig", "name": "S", "members": [
        {"kind": "type", "name": "Quat"},
        {"kind": "function", "name": "identity", "return_type": "Quat"}
    ]}"#;
    let json = with_module(sig, r#"{"kind": "function", "name": "identity", "return_type": "vec4f"}"#);
    assert_eq!(lines(&check_at(&json, &["M"])), vec!["Quat: missing required type"]);
}

const QUAT_SIG: &str = r#"{"kind": "module_sig", "name": "S", "members": [
    {"kind": "type", "name": "Quat"},
    {"kind": "function", "name": "quat_from_euler", "params": [{"ty": {"path": "vec3", "args": ["T"]}}],
     "return_type": "Quat"}
]}"#;

fn quat_module(param: &str, extra: &str) -> String {
    with_module(
        QUAT_SIG,
        &format!(
            r#"{{"kind": "struct", "name": "Quat", "members": [{{"name": "w", "ty": "f32"}}]}},
               {{"kind": "function", "name": "quat_from_euler", "params": [{{"name": "e", "ty": {param}}}],
                "return_type": "Quat"}}{extra}"#
        ),
    )
}

#[test]
fn test_undeclared_signature_type_binds_to_the_module() {
    let json = quat_module(
        r#"{"path": "vec3", "args": ["T"]}"#,
        r#", {"kind": "alias", "name": "T", "target": "f32"}"#,
    );
    assert!(check_at(&json, &["M"]).conforms());

    let mismatched = quat_module(
        r#"{"path": "vec3", "args": ["bool"]}"#,
        r#", {"kind": "alias", "name": "T", "target": "f32"}"#,
    );
    assert_eq!(
        lines(&check_at(&mismatched, &["M"])),
        vec!["quat_from_euler: parameter 1 type mismatch: expected `vec3<f32>`, found `vec3<bool>`"]
    );
}

#[test]
fn test_undeclared_signature_type_missing_from_the_module() {
    let json = quat_module(r#"{"path": "vec3", "args": ["bool"]}"#, "");
    assert_eq!(lines(&check_at(&json, &["M"])), vec!["T: missing required type"]);

    let wrong_shape = quat_module(r#""f32""#, "");
    assert_eq!(
        lines(&check_at(&wrong_shape, &["M"])),
        vec![
            "T: missing required type",
            "quat_from_euler: parameter 1 type mismatch: expected `vec3<T>`, found `f32`",
        ]
    );
}

#[test]
fn test_undeclared_signature_type_of_the_wrong_kind() {
    let json = quat_module(
        r#"{"path": "vec3", "args": ["f32"]}"#,
        r#", {"kind": "const", "name": "T", "ty": "f32", "value": {"kind": "literal", "value": "1f"}}"#,
    );
    assert_eq!(
        lines(&check_at(&json, &["M"])),
        vec!["T: kind mismatch: expected type, found constant"]
    );
}

// ============================================================================
// Declarations, composition and nesting
// ============================================================================

#[test]
fn test_alias_of_a_type_cannot_declare_signatures() {
    let json = format!(
        r#"{{"declarations": [{PI_SIG}, {{"kind": "alias", "name": "A", "signatures": ["S"], "target": "f32"}}]}}"#
    );
    assert_eq!(
        lines(&check_at(&json, &["A"])),
        vec!["package: kind mismatch: expected module, found type `f32`"]
    );
}

#[test]
fn test_conflicting_composition_is_one_diagnostic() {
    let json = r#"{"declarations": [
        {"kind": "module_sig", "name": "A", "members": [{"kind": "const", "name": "PI", "ty": "f32"}]},
        {"kind": "module_sig", "name": "B", "members": [{"kind": "const", "name": "PI", "ty": "f16"}]},
        {"kind": "module", "name": "M", "signatures": ["A", "B"], "declarations": []}
    ]}"#;
    let result = check_at(json, &["M"]);
    assert_eq!(result.diagnostics().len(), 1);
    assert!(matches!(
        &result.diagnostics()[0].kind,
        DiagnosticKind::ConflictingSignatureComposition { member_name, .. } if member_name == "PI"
    ));
}

const NESTED: &str = r#"{"declarations": [
    {"kind": "module_sig", "name": "Pi", "members": [{"kind": "const", "name": "PI", "ty": "f32"}]},
    {"kind": "module_sig", "name": "Tau", "members": [{"kind": "const", "name": "TAU", "ty": "f32"}]},
    {"kind": "module_sig", "name": "Outer", "members": [{"kind": "module", "name": "Float", "signatures": ["Pi"]}]},
    {"kind": "module", "name": "M", "signatures": ["Outer"], "declarations": [
        {"kind": "module", "name": "Impl", "declarations": [
            {"kind": "const", "name": "PI", "ty": "f32", "value": {"kind": "literal", "value": "3.14f"}},
            {"kind": "const", "name": "TAU", "ty": "f32", "value": {"kind": "literal", "value": "6.28f"}}
        ]},
        FLOAT
    ]}
]}"#;

#[test]
fn test_nested_superset_declaration_satisfies_requirement() {
    let json = NESTED.replace(
        "FLOAT",
        r#"{"kind": "alias", "name": "Float", "signatures": ["Pi", "Tau"], "target": "Impl"}"#,
    );
    assert!(check_at(&json, &["M"]).conforms());
}

#[test]
fn test_nested_undeclared_module_uses_its_implementation() {
    let json = NESTED.replace("FLOAT", r#"{"kind": "alias", "name": "Float", "target": "Impl"}"#);
    assert!(check_at(&json, &["M"]).conforms());
}

#[test]
fn test_nested_declared_surface_must_cover_requirement() {
    let json = NESTED.replace(
        "FLOAT",
        r#"{"kind": "alias", "name": "Float", "signatures": ["Tau"], "target": "Impl"}"#,
    );
    let result = check_at(&json, &["M"]);
    assert_eq!(result.diagnostics().len(), 1);
    assert!(matches!(
        result.diagnostics()[0].kind,
        DiagnosticKind::NestedConformanceFailure { .. }
    ));
    assert_eq!(result.diagnostics()[0].path.to_string(), "Float");
    assert_eq!(lines(&result), vec!["Float.PI: missing required constant"]);
}

#[test]
fn test_nested_member_of_wrong_kind() {
    let json = NESTED.replace(
        "FLOAT",
        r#"{"kind": "const", "name": "Float", "ty": "f32", "value": {"kind": "literal", "value": "1f"}}"#,
    );
    assert_eq!(
        lines(&check_at(&json, &["M"])),
        vec!["Float: kind mismatch: expected module, found constant"]
    );
}

const MATH_REEXPORT: &str = include_str!("../../../tests/fixtures/math_reexport.json");

#[test]
fn test_nested_alias_is_compared_through_its_target_path() {
    let result = check_at(MATH_REEXPORT, &["R"]);
    assert_eq!(lines(&result), vec!["G.private_function: missing required function"]);
    assert_eq!(result.diagnostics()[0].path.to_string(), "G");
}

#[test]
fn test_declared_alias_is_checked_against_its_target_path() {
    let mut json: serde_json::Value = serde_json::from_str(MATH_REEXPORT).unwrap();
    let declarations = json["declarations"].as_array_mut().unwrap();
    declarations.push(serde_json::json!(
        {"kind": "alias", "name": "H", "signatures": ["Priv"], "target": "Math::Float"}
    ));
    declarations.push(serde_json::json!(
        {"kind": "alias", "name": "Direct", "signatures": ["Priv"], "target": "Math::FloatMath"}
    ));
    let json = json.to_string();
    assert_eq!(
        lines(&check_at(&json, &["H"])),
        vec!["private_function: missing required function"]
    );
    // The rejected access is the only report for a target the alias cannot reach.
    assert!(check_at(&json, &["Direct"]).conforms());
}

#[test]
fn test_self_referential_requirement_is_coinductive() {
    let json = r#"{"declarations": [
        {"kind": "module_sig", "name": "Node", "members": [
            {"kind": "const", "name": "ID", "ty": "u32"},
            {"kind": "module", "name": "Me", "signatures": ["Node"]}
        ]},
        {"kind": "module", "name": "M", "signatures": ["Node"], "declarations": [
            {"kind": "const", "name": "ID", "ty": "u32", "value": {"kind": "literal", "value": "1u"}},
            {"kind": "alias", "name": "Me", "target": "super::M"}
        ]}
    ]}"#;
    assert!(check_at(json, &["M"]).conforms());
}

#[test]
fn test_checks_are_repeatable() {
    let json = with_module(PI_SIG, r#"{"kind": "function", "name": "PI"}"#);
    assert_eq!(check_at(&json, &["M"]), check_at(&json, &["M"]));
}

#[test]
fn test_context_is_shareable_across_threads() {
    fn assert_sync<T: Sync + Send>() {}
    assert_sync::<Context<'static, 'static>>();
}
