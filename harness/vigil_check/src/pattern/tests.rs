use super::*;
use pretty_assertions::assert_eq;

fn no_vars() -> FxHashMap<String, String> {
    FxHashMap::default()
}

#[test]
fn test_parse_plain_literal() {
    let pattern = Pattern::parse("__builtin_log_scope_exit").unwrap();
    assert_eq!(
        pattern.segments(),
        &[Segment::Literal("__builtin_log_scope_exit".into())]
    );
}

#[test]
fn test_parse_placeholder_and_literal() {
    let pattern = Pattern::parse("{{.*}} __builtin_log[lhs='3']").unwrap();
    assert_eq!(
        pattern.segments(),
        &[
            Segment::Regex(".*".into()),
            Segment::Literal(" __builtin_log[lhs='3']".into()),
        ]
    );
}

#[test]
fn test_parse_single_brackets_are_literal() {
    // `[lhs='3']` is a single bracket pair, not a variable block.
    let pattern = Pattern::parse("__builtin_log[='7']").unwrap();
    assert_eq!(pattern.segments().len(), 1);
}

#[test]
fn test_parse_variables() {
    let pattern = Pattern::parse("id=[[ID:[0-9]+]] next").unwrap();
    assert_eq!(pattern.defined_names().collect::<Vec<_>>(), vec!["ID"]);

    let pattern = Pattern::parse("again [[ID]]").unwrap();
    assert_eq!(
        pattern.segments(),
        &[Segment::Literal("again ".into()), Segment::Use("ID".into())]
    );
}

#[test]
fn test_parse_errors() {
    assert_eq!(
        Pattern::parse("abc {{.*"),
        Err(PatternError::UnterminatedRegex { column: 5 })
    );
    assert_eq!(
        Pattern::parse("{{}}"),
        Err(PatternError::EmptyRegex { column: 1 })
    );
    assert!(matches!(
        Pattern::parse("{{(}}"),
        Err(PatternError::InvalidRegex { .. })
    ));
    assert_eq!(
        Pattern::parse("[[X"),
        Err(PatternError::UnterminatedVariable { column: 1 })
    );
    assert_eq!(
        Pattern::parse("[[1X:a]]"),
        Err(PatternError::InvalidVariableName { name: "1X".into() })
    );
    assert_eq!(
        Pattern::parse("[[X:a]] [[X:b]]"),
        Err(PatternError::DuplicateVariable { name: "X".into() })
    );
    assert_eq!(
        Pattern::parse("[[X:a]] [[X]]"),
        Err(PatternError::SameLineUse { name: "X".into() })
    );
}

#[test]
fn test_literal_escapes_regex_metacharacters() {
    let pattern = Pattern::literal("a.b{{c}}");
    let regex = pattern.instantiate(&no_vars(), false).unwrap();
    assert!(regex.is_match("xx a.b{{c}} yy"));
    assert!(!regex.is_match("aXb{{c}}"));
}

#[test]
fn test_instantiate_matches_substring() {
    let pattern = Pattern::parse("{{.*}} __builtin_log[rhs='4']").unwrap();
    let regex = pattern.instantiate(&no_vars(), false).unwrap();
    assert!(regex.is_match("[19:1-19:10] __builtin_log[rhs='4']"));
    assert!(!regex.is_match("[19:1-19:10] __builtin_log[rhs='5']"));
}

#[test]
fn test_instantiate_whitespace_canonical() {
    let pattern = Pattern::parse("a   b").unwrap();
    let regex = pattern.instantiate(&no_vars(), false).unwrap();
    assert!(regex.is_match("a b"));

    let strict = pattern.instantiate(&no_vars(), true).unwrap();
    assert!(!strict.is_match("a b"));
    assert!(strict.is_match("a   b"));
}

#[test]
fn test_instantiate_uses_bound_value() {
    let pattern = Pattern::parse("value=[[V]]").unwrap();
    let mut vars = no_vars();
    vars.insert("V".into(), "1+2".into());
    let regex = pattern.instantiate(&vars, false).unwrap();
    assert!(regex.is_match("value=1+2"));
    assert!(!regex.is_match("value=12"));
}

#[test]
fn test_instantiate_undefined_variable() {
    let pattern = Pattern::parse("value=[[V]]").unwrap();
    assert_eq!(
        pattern.instantiate(&no_vars(), false).map(|_| ()),
        Err(InstantiateError::UndefinedVariable("V".into()))
    );
}

#[test]
fn test_canonicalize_whitespace() {
    assert_eq!(canonicalize_whitespace("a b"), "a b");
    assert_eq!(canonicalize_whitespace("a \t  b"), "a b");
    assert_eq!(canonicalize_whitespace("\ta"), " a");
    assert!(matches!(canonicalize_whitespace("plain"), Cow::Borrowed(_)));
}
