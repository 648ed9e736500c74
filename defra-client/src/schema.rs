/// Interpretation of `/schema/load` responses
use crate::error::{ClientError, Result};
use serde_json::Value;
use tracing::info;

/// Message fragment the node uses when a type in the submitted schema is
/// already defined.
pub const ALREADY_EXISTS_MESSAGE: &str = "schema type already exists";

/// Returns true if a single error object reports an already-defined type.
pub fn is_already_exists(error: &Value) -> bool {
    error
        .get("message")
        .and_then(Value::as_str)
        .is_some_and(|msg| msg.contains(ALREADY_EXISTS_MESSAGE))
}

/// Accept a schema-load response body, tolerating "already exists" errors.
///
/// Returns the parsed body unchanged on success. Fails with the first error
/// that is not an "already exists" report.
pub fn check_schema_response(body: Value) -> Result<Value> {
    let Some(errors) = body.get("errors") else {
        return Ok(body);
    };

    let errors: &[Value] = match errors {
        Value::Array(errors) => errors.as_slice(),
        Value::Null => &[],
        other => {
            return Err(ClientError::SchemaLoad {
                message: "errors field is not a list".to_string(),
                error: other.clone(),
            })
        }
    };

    for error in errors {
        if is_already_exists(error) {
            info!("Schema already exists");
            continue;
        }

        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("schema load failed without a message")
            .to_string();

        return Err(ClientError::SchemaLoad {
            message,
            error: error.clone(),
        });
    }

    Ok(body)
}
