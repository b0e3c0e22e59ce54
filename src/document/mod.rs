//! Dot/bracket path lookup over JSON documents.
//!
//! Supports:
//! - `a.b.c` (dot notation)
//! - `a.b[2].c` (array index)
//! - `items.0` (numeric segment treated as index)
//!
//! A missing path, an out-of-range index, or a type mismatch all resolve to
//! `Value::Null`. Lookup never fails: template resolution relies on the
//! "missing path is null" contract.

use serde_json::Value;

/// A parsed path segment
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Object field access: `.field`
    Field(String),
    /// Array index access: `[0]`
    Index(usize),
}

/// Parse a dot/bracket path into segments.
///
/// Malformed bracket syntax degrades to a field literal rather than erroring,
/// so `a.b[x` simply fails to match anything at lookup time.
pub fn parse(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();

    for part in path.split('.') {
        if part.is_empty() {
            continue;
        }

        let mut rest = part;
        // Field before the first bracket, then any number of [idx] suffixes
        loop {
            match rest.find('[') {
                Some(bracket_pos) => {
                    let field = &rest[..bracket_pos];
                    let after = &rest[bracket_pos + 1..];

                    let close = match after.find(']') {
                        Some(pos) => pos,
                        None => {
                            // Unterminated bracket: keep the whole part as a field
                            segments.push(Segment::Field(part.to_string()));
                            break;
                        }
                    };

                    let index: usize = match after[..close].parse() {
                        Ok(idx) => idx,
                        Err(_) => {
                            segments.push(Segment::Field(part.to_string()));
                            break;
                        }
                    };

                    if !field.is_empty() {
                        segments.push(Segment::Field(field.to_string()));
                    }
                    segments.push(Segment::Index(index));
                    rest = &after[close + 1..];
                    if rest.is_empty() {
                        break;
                    }
                }
                None => {
                    if let Ok(index) = rest.parse::<usize>() {
                        segments.push(Segment::Index(index));
                    } else {
                        segments.push(Segment::Field(rest.to_string()));
                    }
                    break;
                }
            }
        }
    }

    segments
}

/// Resolve a path against a document. Empty path returns the document itself.
pub fn lookup(doc: &Value, path: &str) -> Value {
    let mut current = doc;

    for segment in parse(path) {
        let next = match segment {
            Segment::Field(name) => current.get(&name),
            Segment::Index(idx) => current.get(idx),
        };
        match next {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }

    current.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_simple_path() {
        assert_eq!(
            parse("a.b.c"),
            vec![
                Segment::Field("a".to_string()),
                Segment::Field("b".to_string()),
                Segment::Field("c".to_string()),
            ]
        );
    }

    #[test]
    fn parse_with_array_index() {
        assert_eq!(
            parse("items[0].name"),
            vec![
                Segment::Field("items".to_string()),
                Segment::Index(0),
                Segment::Field("name".to_string()),
            ]
        );
    }

    #[test]
    fn parse_chained_indexes() {
        assert_eq!(
            parse("grid[1][2]"),
            vec![
                Segment::Field("grid".to_string()),
                Segment::Index(1),
                Segment::Index(2),
            ]
        );
    }

    #[test]
    fn lookup_nested() {
        let doc = json!({"a": {"b": {"c": 42}}});
        assert_eq!(lookup(&doc, "a.b.c"), json!(42));
    }

    #[test]
    fn lookup_array_element() {
        let doc = json!({"users": [{"name": "Alice"}, {"name": "Bob"}]});
        assert_eq!(lookup(&doc, "users[1].name"), json!("Bob"));
    }

    #[test]
    fn lookup_missing_is_null() {
        let doc = json!({"a": 1});
        assert_eq!(lookup(&doc, "b"), Value::Null);
        assert_eq!(lookup(&doc, "a.b.c"), Value::Null);
        assert_eq!(lookup(&doc, "a[3]"), Value::Null);
    }

    #[test]
    fn lookup_malformed_bracket_is_null() {
        let doc = json!({"a": [1, 2]});
        assert_eq!(lookup(&doc, "a[x]"), Value::Null);
        assert_eq!(lookup(&doc, "a[1"), Value::Null);
    }

    #[test]
    fn lookup_empty_path_returns_doc() {
        let doc = json!({"a": 1});
        assert_eq!(lookup(&doc, ""), doc);
    }

    #[test]
    fn lookup_numeric_segment_as_index() {
        let doc = json!({"items": ["first", "second"]});
        assert_eq!(lookup(&doc, "items.1"), json!("second"));
    }
}
