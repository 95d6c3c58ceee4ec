//! Transcoder between browser message text and backend messages.
//!
//! The accepted syntax is a lenient JSON dialect:
//!
//! - the top level must be a mapping; sequences may appear inside
//! - keys may be quoted or bare
//! - unquoted text that is not `true`, `false`, `null`, an integer or a
//!   plain decimal is kept as a string
//! - escape sequences inside quoted text are kept as written, while output
//!   escaping is applied on the way out; `\"` read in therefore comes back
//!   as `\\\"`
//! - trailing commas are accepted and the last duplicate key wins

mod lexer;
mod parser;
mod writer;

pub use lexer::{Lexer, Spanned, Token};
pub use parser::{classify_bare, parse_value, MAX_DEPTH};
pub use writer::{escape, response_to_text, to_text};

use crate::error::TranscodeError;
use campusgate_protocol::{Map, Request, Response, Value};

/// Parses message text into a mapping.
pub fn parse(input: &str) -> Result<Map, TranscodeError> {
    parser::parse_document(input)
}

/// Parses message text into a backend request.
///
/// `action` must be a string; `data` may be absent, null or a mapping.
pub fn decode_request(input: &str) -> Result<Request, TranscodeError> {
    let mut message = parse(input)?;

    let action = match message.remove("action") {
        None | Some(Value::Null) => return Err(TranscodeError::MissingField("action")),
        Some(Value::String(action)) => action,
        Some(other) => {
            return Err(TranscodeError::InvalidField {
                field: "action",
                expected: "string",
                found: other.kind(),
            })
        }
    };

    let data = match message.remove("data") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Mapping(data)) => data,
        Some(other) => {
            return Err(TranscodeError::InvalidField {
                field: "data",
                expected: "mapping",
                found: other.kind(),
            })
        }
    };

    Ok(Request::new(action).with_data(data))
}

/// Serializes a backend response to message text.
pub fn encode_response(response: &Response) -> String {
    response_to_text(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_request() {
        let request = decode_request(
            r#"{"action":"REGISTER_MODULE","data":{"studentId":"S001","moduleCode":"CS201"}}"#,
        )
        .unwrap();
        assert_eq!(request.action, "REGISTER_MODULE");
        assert_eq!(request.field("moduleCode"), Some(&Value::from("CS201")));
    }

    #[test]
    fn test_decode_request_without_data() {
        let request = decode_request(r#"{"action":"VIEW_MODULES"}"#).unwrap();
        assert!(request.data.is_empty());

        let request = decode_request(r#"{"action":"VIEW_MODULES","data":null}"#).unwrap();
        assert!(request.data.is_empty());
    }

    #[test]
    fn test_decode_request_field_errors() {
        assert_eq!(
            decode_request(r#"{"data":{}}"#),
            Err(TranscodeError::MissingField("action"))
        );
        assert!(matches!(
            decode_request(r#"{"action":42}"#),
            Err(TranscodeError::InvalidField { field: "action", .. })
        ));
        assert!(matches!(
            decode_request(r#"{"action":"X","data":[1]}"#),
            Err(TranscodeError::InvalidField { field: "data", .. })
        ));
    }

    #[test]
    fn test_unknown_action_passes_through() {
        // Action names are checked by the record store, not here.
        let request = decode_request(r#"{"action":"FOOBAR"}"#).unwrap();
        assert_eq!(request.action, "FOOBAR");
    }

    #[test]
    fn test_quote_escape_asymmetry() {
        let map = parse(r#"{"note":"say \"hi\""}"#).unwrap();
        assert_eq!(map["note"], Value::from(r#"say \"hi\""#));
        assert_eq!(
            to_text(&Value::Mapping(map)),
            r#"{"note":"say \\\"hi\\\""}"#
        );
    }

    #[test]
    fn test_extreme_decimals_parse_back() {
        for d in [1e20, 1e-7, 1e-5, -3.5e300, f64::MAX, f64::MIN_POSITIVE, 5e-324] {
            let mut map = Map::new();
            map.insert("x".to_string(), Value::Decimal(d));
            let text = to_text(&Value::Mapping(map.clone()));
            assert_eq!(parse(&text).unwrap(), map, "{}", text);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn scalar() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i64>().prop_map(Value::Integer),
                any::<f64>()
                    .prop_filter("finite", |d| d.is_finite())
                    .prop_map(Value::Decimal),
                "[a-zA-Z0-9 _.@-]{0,20}".prop_map(Value::String),
            ]
        }

        fn value() -> impl Strategy<Value = Value> {
            scalar().prop_recursive(3, 32, 6, |inner| {
                prop_oneof![
                    proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::Sequence),
                    proptest::collection::btree_map("[a-zA-Z][a-zA-Z0-9_]{0,10}", inner, 0..6)
                        .prop_map(Value::Mapping),
                ]
            })
        }

        proptest! {
            #[test]
            fn serialized_mappings_parse_back(
                map in proptest::collection::btree_map("[a-zA-Z][a-zA-Z0-9_]{0,10}", value(), 0..8)
            ) {
                let text = to_text(&Value::Mapping(map.clone()));
                prop_assert_eq!(parse(&text).unwrap(), map);
            }

            #[test]
            fn arbitrary_text_never_panics(input in "\\PC{0,64}") {
                let _ = parse(&input);
            }
        }
    }
}
