/// Input Serializer - test-case arguments to stdin
///
/// Problems describe inputs as function-style arguments. Submitted programs
/// are plain `main()`s reading tokens with `cin >>`, so every argument is
/// flattened onto a single whitespace-separated line:
/// - Scalars print as-is
/// - Arrays print their length first, then each element, recursively
///
/// Line boundaries are irrelevant to a token reader, so no newlines are
/// ever emitted.

use algomaster_common::types::Value;

/// Serialize one test case's arguments into the stdin text fed to the program
pub fn serialize_input(args: &[Value]) -> String {
    let mut tokens = Vec::new();
    for arg in args {
        push_tokens(arg, &mut tokens);
    }
    tokens.join(" ")
}

fn push_tokens(value: &Value, tokens: &mut Vec<String>) {
    match value {
        Value::List(items) => {
            tokens.push(items.len().to_string());
            for item in items {
                push_tokens(item, tokens);
            }
        }
        scalar => tokens.push(scalar.to_string()),
    }
}
