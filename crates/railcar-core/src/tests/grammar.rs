use crate::*;
use futures::executor::block_on;
use serde_json::json;

#[test]
fn parse_grammar_single_rule() {
    let engine = Engine::new();
    let text = r#"
%% a tiny fragment
select-stmt:
  seq("SELECT", opt("DISTINCT"), <result-column>)
"#;
    let parsed = block_on(engine.parse_grammar(text, ParseOptions::default()))
        .unwrap()
        .unwrap();
    assert!(parsed.issues.is_empty());
    assert_eq!(parsed.grammar.rules.len(), 1);
    let expr = &parsed.grammar.rules["select-stmt"];
    assert_eq!(
        *expr,
        Expr::sequence(vec![
            Expr::terminal("SELECT"),
            Expr::bypass(Expr::terminal("DISTINCT")),
            Expr::nonterminal("result-column"),
        ])
    );
}

#[test]
fn parse_grammar_title_and_multiple_rules() {
    let engine = Engine::new();
    let text = r#"
title: SQL expressions %% trailing comment stripped

expr:
  stack(<literal-value>, seq("(", expr, ")"))
literal-value:
  stack("NULL", "TRUE", "FALSE")
"#;
    let parsed = engine
        .parse_grammar_sync(text, ParseOptions::strict())
        .unwrap()
        .unwrap();
    assert_eq!(parsed.grammar.title.as_deref(), Some("SQL expressions"));
    assert_eq!(
        parsed.grammar.rules.keys().collect::<Vec<_>>(),
        vec!["expr", "literal-value"]
    );
    assert!(parsed.grammar.defines("expr"));
    assert!(!parsed.grammar.defines("select-stmt"));
}

#[test]
fn parse_grammar_bare_ident_is_nonterminal() {
    let engine = Engine::new();
    let parsed = engine
        .parse_grammar_sync("r: seq(expr, loop('+'))", ParseOptions::strict())
        .unwrap()
        .unwrap();
    assert_eq!(
        parsed.grammar.rules["r"],
        Expr::sequence(vec![
            Expr::nonterminal("expr"),
            Expr::repeat(Expr::terminal("+")),
        ])
    );
}

#[test]
fn parse_grammar_empty_input_is_none() {
    let engine = Engine::new();
    let parsed = engine
        .parse_grammar_sync("  \n%% nothing here\n", ParseOptions::strict())
        .unwrap();
    assert!(parsed.is_none());
}

#[test]
fn parse_grammar_model_json_shape() {
    let engine = Engine::new();
    let parsed = engine
        .parse_grammar_sync("r: opt(\"X\")", ParseOptions::strict())
        .unwrap()
        .unwrap();
    let value = serde_json::to_value(&parsed.grammar).unwrap();
    assert_eq!(
        value,
        json!({
            "title": null,
            "rules": {
                "r": {
                    "kind": "bypass",
                    "child": { "kind": "terminal", "text": "X" }
                }
            }
        })
    );
}

#[test]
fn parse_grammar_rejects_unknown_combinator() {
    let engine = Engine::new();
    let err = engine
        .parse_grammar_sync("r: maybe(\"X\")", ParseOptions::strict())
        .unwrap_err()
        .to_string();
    assert_eq!(
        err,
        "Grammar parse error (line 1): unknown combinator `maybe` (expected seq, stack, opt or loop)"
    );
}

#[test]
fn parse_grammar_rejects_zero_operand_combinators() {
    let engine = Engine::new();
    for bad in ["r: seq()", "r: stack()"] {
        let err = engine
            .parse_grammar_sync(bad, ParseOptions::strict())
            .unwrap_err()
            .to_string();
        assert!(err.contains("needs at least one operand"), "{err}");
    }
    let err = engine
        .parse_grammar_sync("r: opt(\"a\", \"b\")", ParseOptions::strict())
        .unwrap_err()
        .to_string();
    assert!(err.contains("takes exactly one operand"), "{err}");
}

#[test]
fn parse_grammar_rejects_duplicate_rules() {
    let engine = Engine::new();
    let err = engine
        .parse_grammar_sync("r: \"a\"\nr: \"b\"", ParseOptions::strict())
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateRule { ref name, line: 2 } if name == "r"));
}

#[test]
fn parse_grammar_unterminated_string() {
    let engine = Engine::new();
    let err = engine
        .parse_grammar_sync("r: seq(\"oops)", ParseOptions::strict())
        .unwrap_err()
        .to_string();
    assert_eq!(err, "Grammar parse error (line 1): unterminated string literal");
}

#[test]
fn parse_grammar_lenient_isolates_failed_rules() {
    let engine = Engine::new();
    let text = r#"
good: seq("A", "B")
bad: seq("A",
also-good: "C"
"#;
    let parsed = engine
        .parse_grammar_sync(text, ParseOptions::lenient())
        .unwrap()
        .unwrap();
    // the broken rule keeps its slot as an error placeholder
    assert_eq!(
        parsed.grammar.rules.keys().collect::<Vec<_>>(),
        vec!["good", "bad", "also-good"]
    );
    assert!(matches!(parsed.grammar.rules["bad"], Expr::Error { .. }));
    assert_eq!(parsed.issues.len(), 1);
    assert_eq!(parsed.issues[0].rule.as_deref(), Some("bad"));
    assert!(matches!(parsed.grammar.rules["good"], Expr::Sequence { .. }));
}

#[test]
fn parse_grammar_quoted_escapes_and_comment_chars() {
    let engine = Engine::new();
    let parsed = engine
        .parse_grammar_sync(r#"r: seq("10%%", "say \"hi\"")"#, ParseOptions::strict())
        .unwrap()
        .unwrap();
    assert_eq!(
        parsed.grammar.rules["r"],
        Expr::sequence(vec![
            Expr::terminal("10%%"),
            Expr::terminal("say \"hi\""),
        ])
    );
}

#[test]
fn parse_grammar_multiline_expression() {
    let engine = Engine::new();
    let text = "r:\n  stack(\n    \"A\",\n    seq(\"B\", \"C\")\n  )\n";
    let parsed = engine
        .parse_grammar_sync(text, ParseOptions::strict())
        .unwrap()
        .unwrap();
    assert_eq!(
        parsed.grammar.rules["r"],
        Expr::stack(vec![
            Expr::terminal("A"),
            Expr::sequence(vec![Expr::terminal("B"), Expr::terminal("C")]),
        ])
    );
}
