use logview::filter::{Filter, FilterNode, SyntaxError};
use logview::row::Row;
use serde_json::{Value, json};

fn row(value: Value) -> Row {
    Row::from_data(value.as_object().cloned().expect("object literal"))
}

fn matches(condition: &str, value: Value) -> bool {
    Filter::compile(condition)
        .unwrap_or_else(|err| panic!("'{condition}' should compile: {err}"))
        .matches(&row(value))
}

#[test]
fn test_empty_condition_matches_everything() {
    for condition in ["", "*"] {
        let filter = Filter::compile(condition).expect("compiles");
        assert!(matches!(filter.root(), FilterNode::All));
        assert!(filter.matches(&row(json!({"anything": 1}))));
        assert!(filter.matches(&Row::default()));
    }
}

#[test]
fn test_numbers_match_their_canonical_form() {
    assert!(matches("intField = 123", json!({"intField": 123})));
    assert!(matches("intField = 123", json!({"intField": "123"})));
    assert!(matches("intField = 123|456", json!({"intField": 456})));
    assert!(!matches("intField = 123|456", json!({"intField": 789})));
    assert!(matches("floatField = 56.78", json!({"floatField": 56.780})));
}

#[test]
fn test_string_match_ignores_case() {
    assert!(matches("strField = SomeString", json!({"strField": "somestring"})));
    assert!(matches("strField = somestring", json!({"strField": "SOMESTRING"})));
    assert!(matches("STRFIELD = somestring", json!({"strField": "SomeString"})));
}

#[test]
fn test_not_equal_on_absent_field_is_true() {
    assert!(matches("strField != x", json!({"other": "x"})));
    assert!(matches("strField != x", json!({"strField": "y"})));
    assert!(!matches("strField != x", json!({"strField": "X"})));
    assert!(!matches("strField = x", json!({"other": "x"})));
}

#[test]
fn test_contains_and_not_contains() {
    let value = json!({"message": "Connection reset by peer"});
    assert!(matches("message ~ reset", value.clone()));
    assert!(matches("message ~ 'by peer'", value.clone()));
    assert!(matches("message ~ timeout|reset", value.clone()));
    assert!(!matches("message !~ reset", value.clone()));
    assert!(matches("message !~ timeout", value));
}

#[test]
fn test_mixed_operators_need_brackets() {
    let err = Filter::compile("intField = 1 and floatField = 2 or intField = 3").unwrap_err();
    assert!(matches!(err, SyntaxError::MixedLogicOperators { .. }));

    let filter =
        Filter::compile("(intField = 1 and floatField = 2) or intField = 3").expect("compiles");
    assert!(filter.matches(&row(json!({"intField": 1, "floatField": 2}))));
    assert!(filter.matches(&row(json!({"intField": 3, "floatField": 9}))));
    assert!(!filter.matches(&row(json!({"intField": 1, "floatField": 9}))));
}

#[test]
fn test_nested_brackets() {
    let condition = "level = error and (module ~ billing or module ~ payments)";
    assert!(matches(condition, json!({"level": "ERROR", "module": "payments-api"})));
    assert!(!matches(condition, json!({"level": "info", "module": "billing"})));
    assert!(!matches(condition, json!({"level": "error", "module": "auth"})));
}

#[test]
fn test_wildcard_field_check() {
    assert!(matches("req_* : '*timeout*'", json!({"req_err": "read timeout"})));
    assert!(!matches("req_* : '*timeout*'", json!({"other": "read timeout"})));
    assert!(matches("level : '!debug'", json!({"level": "info"})));
    assert!(!matches("level : '!debug'", json!({"level": "DEBUG"})));
}

#[test]
fn test_evaluation_is_repeatable() {
    let filter = Filter::compile("a = 1 or (b ~ x and c != 2)").expect("compiles");
    let rows = [
        row(json!({"a": 1})),
        row(json!({"b": "xyz", "c": 3})),
        row(json!({"b": "xyz", "c": 2})),
        Row::default(),
    ];
    for r in &rows {
        assert_eq!(filter.matches(r), filter.matches(r));
    }
    let shared = filter.clone();
    let handle = std::thread::spawn(move || shared.matches(&row(json!({"a": 1}))));
    assert!(handle.join().expect("thread"));
}

#[test]
fn test_syntax_errors_are_positional() {
    let cases: &[(&str, fn(&SyntaxError) -> bool)] = &[
        ("a = 'open", |e| matches!(e, SyntaxError::UnterminatedString { offset: 4 })),
        ("(a = b", |e| matches!(e, SyntaxError::MissingCloseBracket { .. })),
        ("a = b)", |e| matches!(e, SyntaxError::UnmatchedCloseBracket { offset: 5 })),
        ("a = ", |e| matches!(e, SyntaxError::UnexpectedEnd { .. })),
        ("a b c", |e| matches!(e, SyntaxError::UnexpectedToken { .. })),
        ("a = b #", |e| matches!(e, SyntaxError::UnexpectedChar { ch: '#', .. })),
    ];
    for (condition, check) in cases {
        let err = Filter::compile(condition).unwrap_err();
        assert!(check(&err), "'{condition}' gave {err:?}");
        assert!(err.pointer(condition).contains('^'));
    }
}

#[test]
fn test_operator_chain_limit() {
    let within = vec!["a = 1"; 100].join(" or ");
    assert!(Filter::compile(&within).is_ok());

    let beyond = vec!["a = 1"; 102].join(" or ");
    let err = Filter::compile(&beyond).unwrap_err();
    assert!(matches!(err, SyntaxError::TooManyOperators { .. }));
}
