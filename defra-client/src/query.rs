/// GraphQL payload construction for document mutations
///
/// DefraDB's `create_<Type>` / `update_<Type>` mutations take the document as
/// a JSON string argument. That string is either bound as a GraphQL variable
/// (preferred) or embedded as an escaped string literal.
use crate::error::{ClientError, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// A caller-supplied document: field name to scalar or nested value.
pub type Document = Map<String, Value>;

/// A GraphQL request body as posted to the query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

impl GraphQLRequest {
    /// A request with no variables.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
        }
    }

    /// A request with variables bound separately from the query text.
    pub fn with_variables(query: impl Into<String>, variables: Value) -> Self {
        Self {
            query: query.into(),
            variables: Some(variables),
        }
    }
}

/// Which generated mutation a document is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
}

impl MutationKind {
    fn prefix(self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
        }
    }
}

/// How the document is carried inside the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadStyle {
    /// `data: $data`, with the JSON text in the `variables` object.
    #[default]
    Variables,
    /// `data: "<escaped JSON>"` inside the query text.
    Inline,
}

/// Build a `create_<type_name>` mutation with the document inlined.
pub fn build_create(type_name: &str, document: &Document) -> Result<GraphQLRequest> {
    build_mutation(MutationKind::Create, type_name, document, PayloadStyle::Inline)
}

/// Build an `update_<type_name>` mutation with the document inlined.
pub fn build_update(type_name: &str, document: &Document) -> Result<GraphQLRequest> {
    build_mutation(MutationKind::Update, type_name, document, PayloadStyle::Inline)
}

/// Build a `create_<type_name>` mutation with the document bound to `$data`.
pub fn build_create_with_variables(type_name: &str, document: &Document) -> Result<GraphQLRequest> {
    build_mutation(MutationKind::Create, type_name, document, PayloadStyle::Variables)
}

/// Build an `update_<type_name>` mutation with the document bound to `$data`.
pub fn build_update_with_variables(type_name: &str, document: &Document) -> Result<GraphQLRequest> {
    build_mutation(MutationKind::Update, type_name, document, PayloadStyle::Variables)
}

/// Build a document mutation requesting the assigned `_key` back.
///
/// Field names are not checked against any schema; an unknown type is
/// reported by the node. The type name must still be a GraphQL name, since
/// it is spliced into the operation text; anything else fails locally with
/// [`ClientError::InvalidRequest`].
pub fn build_mutation(
    kind: MutationKind,
    type_name: &str,
    document: &Document,
    style: PayloadStyle,
) -> Result<GraphQLRequest> {
    if !is_graphql_name(type_name) {
        return Err(ClientError::InvalidRequest(format!(
            "invalid type name: {:?}",
            type_name
        )));
    }

    let data = Value::Object(document.clone()).to_string();
    let field = format!("{}_{}", kind.prefix(), type_name);

    let request = match style {
        PayloadStyle::Inline => GraphQLRequest::new(format!(
            "mutation {{\n    {}(data: \"{}\") {{\n        _key\n    }}\n}}",
            field,
            escape_string_literal(&data)
        )),
        PayloadStyle::Variables => GraphQLRequest::with_variables(
            format!(
                "mutation($data: String) {{\n    {}(data: $data) {{\n        _key\n    }}\n}}",
                field
            ),
            json!({ "data": data }),
        ),
    };

    Ok(request)
}

/// Escape text for use inside a double-quoted GraphQL string literal.
///
/// Every path that embeds caller data in query text goes through here.
pub fn escape_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// `[_A-Za-z][_0-9A-Za-z]*`
fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Read a GraphQL string literal starting at the opening quote, the way
    /// a GraphQL lexer would. Returns the decoded value and the index just
    /// past the closing quote.
    fn read_string_literal(text: &str, open: usize) -> (String, usize) {
        assert_eq!(&text[open..open + 1], "\"");
        let mut out = String::new();
        let mut chars = text[open + 1..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => return (out, open + 1 + i + 1),
                '\n' => panic!("line terminator inside string literal"),
                '\\' => match chars.next().map(|(_, e)| e) {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('/') => out.push('/'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('b') => out.push('\u{08}'),
                    Some('f') => out.push('\u{0c}'),
                    Some('u') => {
                        let hex: String = (0..4).map(|_| chars.next().unwrap().1).collect();
                        let code = u32::from_str_radix(&hex, 16).unwrap();
                        out.push(char::from_u32(code).unwrap());
                    }
                    other => panic!("bad escape {:?}", other),
                },
                c => out.push(c),
            }
        }
        panic!("unterminated string literal");
    }

    /// Extract and decode the `data:` literal from an inline mutation,
    /// checking that the wrapper continues with `)` right after it.
    fn inline_data(request: &GraphQLRequest) -> Value {
        let open = request.query.find("(data: \"").unwrap() + "(data: ".len();
        let (literal, end) = read_string_literal(&request.query, open);
        assert!(request.query[end..].starts_with(") {"), "wrapper broken: {}", request.query);
        serde_json::from_str(&literal).unwrap()
    }

    fn doc(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_build_create_escapes_quotes() {
        let document = doc(json!({ "a": "x\"y" }));
        let request = build_create("Parameters", &document).unwrap();

        assert!(request.query.starts_with("mutation {"));
        assert!(request.query.contains("create_Parameters(data: \""));
        assert!(request.query.contains("_key"));
        assert!(request.variables.is_none());
        assert_eq!(inline_data(&request), json!({ "a": "x\"y" }));
    }

    #[test]
    fn test_backslashes_and_newlines_survive() {
        let document = doc(json!({
            "path": "C:\\temp\\",
            "text": "line one\nline \"two\"\r\n\ttabbed",
            "nested": { "list": [1, "two", null, true] }
        }));
        let request = build_update("Notes", &document).unwrap();

        assert!(request.query.contains("update_Notes(data: \""));
        assert_eq!(inline_data(&request), Value::Object(document));
    }

    #[test]
    fn test_empty_document() {
        let request = build_create("Parameters", &Document::new()).unwrap();
        assert!(request.query.contains("create_Parameters(data: \"{}\")"));

        let request = build_create_with_variables("Parameters", &Document::new()).unwrap();
        assert_eq!(request.variables, Some(json!({ "data": "{}" })));
    }

    #[test]
    fn test_variables_keep_data_out_of_query_text() {
        let document = doc(json!({ "a": "\") { __typename } #" }));
        let request = build_create_with_variables("Parameters", &document).unwrap();

        assert_eq!(
            request.query,
            "mutation($data: String) {\n    create_Parameters(data: $data) {\n        _key\n    }\n}"
        );
        assert!(!request.query.contains("__typename"));

        let data = request.variables.unwrap()["data"].as_str().unwrap().to_string();
        let parsed: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed, json!({ "a": "\") { __typename } #" }));
    }

    #[test]
    fn test_update_with_variables_uses_update_field() {
        let request = build_update_with_variables("Users", &doc(json!({ "age": 31 }))).unwrap();
        assert!(request.query.contains("update_Users(data: $data)"));
    }

    #[test]
    fn test_type_name_must_be_a_graphql_name() {
        for bad in ["", "1Users", "Users(data: \"x\")", "Us ers", "Users{"] {
            assert!(
                matches!(
                    build_create(bad, &Document::new()),
                    Err(ClientError::InvalidRequest(_))
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(build_create("_Private_2", &Document::new()).is_ok());
    }

    #[test]
    fn test_request_serializes_without_null_variables() {
        let body = serde_json::to_value(GraphQLRequest::new("query { Users { _key } }")).unwrap();
        assert_eq!(body, json!({ "query": "query { Users { _key } }" }));
    }

    #[test]
    fn test_escape_control_characters() {
        assert_eq!(escape_string_literal("a\u{01}b"), "a\\u0001b");
        assert_eq!(escape_string_literal("\u{08}\u{0c}"), "\\b\\f");
    }

    proptest! {
        #[test]
        fn prop_inline_literal_decodes_to_document(key in "[a-z]{1,8}", value in any::<String>()) {
            let mut document = Document::new();
            document.insert(key, Value::String(value));
            let request = build_create("Parameters", &document).unwrap();
            prop_assert_eq!(inline_data(&request), Value::Object(document));
        }

        #[test]
        fn prop_escaped_literal_round_trips(s in any::<String>()) {
            let quoted = format!("\"{}\"", escape_string_literal(&s));
            let (decoded, end) = read_string_literal(&quoted, 0);
            prop_assert_eq!(end, quoted.len());
            prop_assert_eq!(decoded, s);
        }
    }
}
