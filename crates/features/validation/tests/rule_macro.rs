#[test]
fn validation_rule_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/validation_rule_pass.rs");
    t.compile_fail("tests/ui/validation_rule_unknown_category.rs");
    t.compile_fail("tests/ui/validation_rule_not_a_literal.rs");
}
