//! Type-preserving substitution of resolved tokens into template text.

use serde_json::Value;

use crate::placeholder::resolver::ResolvedMap;

/// Rewrite a JSON template using a resolved token map.
///
/// For each entry, in resolution order:
/// 1. every quoted whole-value occurrence `"<token>"` is replaced with the
///    value's JSON serialization, so numbers stay numbers, null becomes JSON
///    null, and objects/arrays are spliced in structurally;
/// 2. any remaining bare occurrence (token embedded inside a longer string)
///    is replaced with the value's plain-text rendering.
///
/// Running the steps in the other order would leave step 1 with nothing to
/// match. A template without tokens comes back byte-identical.
pub fn substitute(map: &ResolvedMap, template: &str) -> String {
    let mut output = template.to_string();

    for (token, value) in map.iter() {
        let quoted = format!("\"{token}\"");
        output = output.replace(&quoted, &value.to_string());
        output = output.replace(token.as_str(), &plain_rendering(value));
    }

    output
}

/// Substitute bare token occurrences only, for plain-text targets such as
/// URLs and queue/topic names where the quoted JSON form never applies.
pub fn substitute_text(map: &ResolvedMap, template: &str) -> String {
    let mut output = template.to_string();

    for (token, value) in map.iter() {
        output = output.replace(token.as_str(), &plain_rendering(value));
    }

    output
}

/// Plain-text rendering of a resolved value when it lands inside a longer
/// string: strings lose their quotes, null renders as the text `null`, and
/// compound values fall back to their JSON text.
pub fn plain_rendering(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => value.to_string(),
    }
}
