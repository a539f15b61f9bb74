//! Tests for Command parsing, values and replies
//!
//! These tests verify:
//! - Text-form parsing of every verb
//! - Usage errors for malformed lines
//! - Literal value parsing
//! - Reply rendering

use std::cmp::Ordering;

use nanostore::command::{Command, Reply, DEFAULT_TOP_LIMIT};
use nanostore::ranking::Ranked;
use nanostore::{Number, StoreError, Value};

// =============================================================================
// Parse Tests
// =============================================================================

#[test]
fn test_parse_get_with_and_without_default() {
    assert_eq!(
        Command::parse("GET bal.Steve").unwrap(),
        Command::Get {
            key: "bal.Steve".to_string(),
            default: None
        }
    );
    assert_eq!(
        Command::parse("get bal.Steve 1000").unwrap(),
        Command::Get {
            key: "bal.Steve".to_string(),
            default: Some(Value::from(1000))
        }
    );
}

#[test]
fn test_parse_set_keeps_rest_of_line() {
    assert_eq!(
        Command::parse("SET motd   hello  world").unwrap(),
        Command::Set {
            key: "motd".to_string(),
            value: Value::from("hello  world")
        }
    );
    assert_eq!(
        Command::parse("SET mod.words [\"a\", \"b\"]").unwrap(),
        Command::Set {
            key: "mod.words".to_string(),
            value: Value::from(vec!["a", "b"])
        }
    );
}

#[test]
fn test_parse_incr_decr_default_delta() {
    assert_eq!(
        Command::parse("INCR deaths.Steve").unwrap(),
        Command::Increment {
            key: "deaths.Steve".to_string(),
            delta: Number::Int(1)
        }
    );
    assert_eq!(
        Command::parse("DECR bal.Steve 2.5").unwrap(),
        Command::Decrement {
            key: "bal.Steve".to_string(),
            delta: Number::Float(2.5)
        }
    );
}

#[test]
fn test_parse_misc_verbs() {
    assert_eq!(
        Command::parse("KEYS").unwrap(),
        Command::Keys {
            prefix: String::new()
        }
    );
    assert_eq!(
        Command::parse("TOP bal.").unwrap(),
        Command::Top {
            prefix: "bal.".to_string(),
            limit: DEFAULT_TOP_LIMIT
        }
    );
    assert_eq!(
        Command::parse("TOP bal. 3").unwrap(),
        Command::Top {
            prefix: "bal.".to_string(),
            limit: 3
        }
    );
    assert_eq!(
        Command::parse("PUSH mod.words bad word").unwrap(),
        Command::Push {
            key: "mod.words".to_string(),
            item: "bad word".to_string()
        }
    );
    assert_eq!(Command::parse("dump").unwrap(), Command::Dump);
    assert_eq!(Command::parse("SAVE").unwrap(), Command::Save);
    assert!(Command::parse("DEL afk.Steve").unwrap().is_mutation());
    assert!(!Command::parse("HAS afk.Steve").unwrap().is_mutation());
}

#[test]
fn test_parse_errors() {
    let bad = [
        "",
        "   ",
        "FLY away",
        "GET",
        "SET onlykey",
        "HAS a b",
        "INCR k notanumber",
        "TOP bal. many",
        "PUSH k",
    ];

    for line in bad {
        let err = Command::parse(line).unwrap_err();
        assert!(matches!(err, StoreError::Command(_)), "line {:?}", line);
    }
}

// =============================================================================
// Value Literal Tests
// =============================================================================

#[test]
fn test_parse_literal() {
    assert_eq!(Value::parse_literal("true"), Value::Bool(true));
    assert_eq!(Value::parse_literal("false"), Value::Bool(false));
    assert_eq!(Value::parse_literal("-42"), Value::from(-42));
    assert_eq!(Value::parse_literal("3.25"), Value::from(3.25));
    assert_eq!(Value::parse_literal("nan"), Value::from("nan"));
    assert_eq!(Value::parse_literal("[\"x\"]"), Value::from(vec!["x"]));
    assert_eq!(Value::parse_literal("[1, 2]"), Value::from("[1, 2]"));
    assert_eq!(Value::parse_literal("Steve"), Value::from("Steve"));
}

#[test]
fn test_number_arithmetic_rules() {
    assert_eq!(Number::Int(2).checked_add(Number::Int(3)), Some(Number::Int(5)));
    assert_eq!(
        Number::Int(2).checked_add(Number::Float(0.5)),
        Some(Number::Float(2.5))
    );
    assert_eq!(Number::Int(i64::MIN).checked_sub(Number::Int(1)), None);
    assert_eq!(Number::Float(f64::MAX).checked_add(Number::Float(f64::MAX)), None);
    assert_eq!(Number::Int(3).total_cmp(&Number::Float(2.9)), Ordering::Greater);
}

#[test]
fn test_number_order_is_exact_across_int_and_float() {
    let two_53 = 1_i64 << 53;
    let above = Number::Int(two_53 + 1);
    let float = Number::Float(two_53 as f64);
    let exact = Number::Int(two_53);

    // 2^53 + 1 rounds to 2^53 as f64; the order must not
    assert_eq!(above.total_cmp(&float), Ordering::Greater);
    assert_eq!(float.total_cmp(&exact), Ordering::Equal);
    assert_eq!(above.total_cmp(&exact), Ordering::Greater);

    // Equal in order, distinct as stored values
    assert_eq!(Number::Int(5).total_cmp(&Number::Float(5.0)), Ordering::Equal);
    assert_ne!(Number::Int(5), Number::Float(5.0));

    assert_eq!(Number::Int(-2).total_cmp(&Number::Float(-2.5)), Ordering::Greater);
    assert_eq!(Number::Float(-2.5).total_cmp(&Number::Int(-2)), Ordering::Less);
    assert_eq!(Number::Int(2).total_cmp(&Number::Float(2.5)), Ordering::Less);
    assert_eq!(Number::Int(i64::MAX).total_cmp(&Number::Float(9.3e18)), Ordering::Less);
    assert_eq!(Number::Int(i64::MIN).total_cmp(&Number::Float(-9.3e18)), Ordering::Greater);
    assert_eq!(Number::Float(-0.0).total_cmp(&Number::Float(0.0)), Ordering::Equal);
    assert_eq!(Number::Int(0).total_cmp(&Number::Float(-0.0)), Ordering::Equal);
}

// =============================================================================
// Reply Rendering Tests
// =============================================================================

#[test]
fn test_reply_display() {
    assert_eq!(Reply::Ok.to_string(), "OK");
    assert_eq!(Reply::Value(None).to_string(), "(nil)");
    assert_eq!(Reply::Value(Some(Value::from(7))).to_string(), "7");
    assert_eq!(Reply::Value(Some(Value::from(vec!["a"]))).to_string(), "[\"a\"]");
    assert_eq!(Reply::Keys(Vec::new()).to_string(), "(empty)");
    assert_eq!(
        Reply::Keys(vec!["a".to_string(), "b".to_string()]).to_string(),
        "a\nb"
    );

    let ranking = Reply::Ranking(vec![
        Ranked {
            identity: "Steve".to_string(),
            value: Number::Int(500),
        },
        Ranked {
            identity: "Alex".to_string(),
            value: Number::Float(12.5),
        },
    ]);
    assert_eq!(ranking.to_string(), "#1 Steve 500\n#2 Alex 12.5");
}
