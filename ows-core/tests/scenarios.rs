use ows_core::ast::{BinaryOp, Node};
use ows_core::{CompileOptions, CoreError, SemanticError, compile, compile_with, minify, parse};

fn semantic_error(source: &str) -> SemanticError {
    match compile(source) {
        Err(CoreError::Semantic(err)) => err,
        other => panic!("expected semantic error, got {other:?}"),
    }
}

#[test]
fn increment_sets_the_slot_of_x() {
    let output =
        compile(r#"var x = 5; rule "R": Event.global() { x = x + 1; }"#).expect("compile");
    assert!(output.starts_with("rule(\"R\")"));
    let actions = output
        .split("actions")
        .nth(1)
        .expect("actions section");
    assert!(actions.contains(
        "Set Global Variable At Index(A, 0, Add(Value In Array(Global Variable(A), 0), 1));"
    ));
}

#[test]
fn duplicate_declaration_names_the_variable() {
    let err = semantic_error("var x = 1; var x = 2;");
    assert_eq!(err, SemanticError::Duplicate("x".to_string()));
    assert!(err.to_string().contains("'x'"));
}

#[test]
fn duplicate_in_rule_of_outer_variable() {
    let err = semantic_error(r#"var x = 1; rule "R": Event.global() { var x = 2; }"#);
    assert_eq!(err, SemanticError::Duplicate("x".to_string()));
}

#[test]
fn constant_reassignment_names_the_constant() {
    let err = semantic_error(r#"const PI = 5; rule "R": Event.global() { PI = 6; }"#);
    assert_eq!(err, SemanticError::ConstantReassignment("PI".to_string()));
    assert!(err.to_string().contains("PI"));
}

#[test]
fn usevar_switches_banks_with_independent_counters() {
    let output = compile(
        r#"usevar global B; var y = 1; usevar global C; var z = 1; var w = 2;
        rule "R": Event.global() { y = 2; z = 3; w = 4; }"#,
    )
    .expect("compile");
    assert!(output.contains("Set Global Variable At Index(B, 0, 2);"));
    assert!(output.contains("Set Global Variable At Index(C, 0, 3);"));
    assert!(output.contains("Set Global Variable At Index(C, 1, 4);"));
}

#[test]
fn player_bank_is_independent_of_global_bank() {
    let output = compile(
        r#"usevar player D; number player.hp = 100; var g = 0;
        rule "R": Event.player() { player.hp = 50; g = 1; }"#,
    )
    .expect("compile");
    assert!(output.contains("Set Player Variable At Index(Event Player, D, 0, 50);"));
    assert!(output.contains("Set Global Variable At Index(A, 0, 1);"));
}

#[test]
fn argument_type_mismatch_names_method_and_types() {
    let err = semantic_error(
        r#"rule "R": Event.player() { player.applyImpulse(5, 10, true, false); }"#,
    );
    assert_eq!(
        err,
        SemanticError::ArgumentType {
            method: "applyImpulse".to_string(),
            position: 2,
            expected: "vector".to_string(),
            found: "number".to_string(),
        }
    );
    let message = err.to_string();
    assert!(message.contains("applyImpulse"));
    assert!(message.contains("vector"));
    assert!(message.contains("number"));
}

#[test]
fn dynamic_arguments_are_accepted() {
    let output = compile(r#"var d; rule "R": Event.global() { wait(d); }"#).expect("compile");
    assert!(output.contains("Wait(Value In Array(Global Variable(A), 0), Ignore Condition);"));
}

#[test]
fn enum_arguments_are_checked() {
    let output = compile(
        r#"rule "R": Event.player() if (player.isButtonHeld(Button.jump)) { player.kill(); }"#,
    )
    .expect("compile");
    assert!(output.contains("Is Button Held(Event Player, Jump) == True;"));
    assert!(output.contains("Kill(Event Player, Null);"));

    let err = semantic_error(
        r#"rule "R": Event.player() if (player.isButtonHeld(Button.dance)) {}"#,
    );
    assert_eq!(
        err,
        SemanticError::UnknownEnumMember {
            enum_name: "Button".to_string(),
            member: "dance".to_string(),
        }
    );
}

#[test]
fn bare_condition_equals_comparison_with_true() {
    let bare = compile(r#"rule "R": Event.player() if (player.isOnGround()) {}"#)
        .expect("compile bare");
    let explicit = compile(r#"rule "R": Event.player() if (player.isOnGround() == true) {}"#)
        .expect("compile explicit");
    assert_eq!(bare, explicit);

    let ast = parse(r#"rule "R": Event.player() if (player.isOnGround()) {}"#).expect("parse");
    let Node::Block { statements } = ast else {
        panic!("expected block");
    };
    let Node::Rule(rule) = &statements[0] else {
        panic!("expected rule");
    };
    let conditions = rule.conditions.as_ref().expect("conditions");
    assert!(matches!(
        &conditions[0],
        Node::Binary { operator: BinaryOp::Eq, right, .. } if **right == Node::Boolean { value: true }
    ));
}

#[test]
fn minified_output_keeps_non_whitespace_in_order() {
    let source = r#"number player.speed = 1;
rule "Boost Jump": Event.player() if (player.isButtonHeld(Button.jump)) {
    player.speed = player.speed * 2;
    player.applyImpulse(Vector(0, 1, 0), player.speed, true, false);
}"#;
    let plain = compile(source).expect("compile");
    let minified = compile_with(source, &CompileOptions { minify: true }).expect("compile");
    let expected: String = plain
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    assert_eq!(minified, expected);
    assert_eq!(minify(&plain), minified);
    assert!(!minified.chars().any(char::is_whitespace));
}

#[test]
fn var_type_is_never_widened_back() {
    let err = semantic_error(
        r#"var flag; rule "R": Event.global() { flag = true; flag = 3; }"#,
    );
    assert_eq!(
        err,
        SemanticError::Conversion {
            from: "number".to_string(),
            to: "boolean".to_string(),
        }
    );
}

#[test]
fn lexical_and_syntax_errors_abort() {
    assert!(matches!(compile("var x = 1 # 2"), Err(CoreError::Lex { .. })));
    assert!(matches!(
        compile(r#"rule "R" Event.global() {}"#),
        Err(CoreError::Syntax { .. })
    ));
    assert!(matches!(
        compile(r#"rule "R": Event.global() {"#),
        Err(CoreError::UnexpectedEof { .. })
    ));
}

#[test]
fn comments_and_whitespace_are_ignored() {
    let output = compile(
        "// counter\nvar x = 0; // start at zero\nrule \"R\": Event.global() {\n\tx = x + 1; // bump\n}\n",
    )
    .expect("compile");
    assert!(output.contains("Set Global Variable At Index(A, 0, Add("));
}
