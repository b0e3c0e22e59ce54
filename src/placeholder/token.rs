//! Placeholder token scanner.
//!
//! Tokens match `$( ... )` non-greedily: a token ends at the first `)` after
//! its opening `$(`. The exact literal text (wrapper included) is the token's
//! identity — two tokens differing only by a disambiguator are distinct.

/// Parsed interpretation of a token's inner text
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Inner text is a document path expression, e.g. `$(order.items[0].sku)`
    Path(String),
    /// Inner text is `!Name` followed by arguments/disambiguator,
    /// e.g. `$(!Random[0,10])` gives name `Random`, rest `[0,10]`
    Keyword { name: String, rest: String },
}

/// A placeholder token found in a template
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Exact literal text including the `$(` `)` wrapper; dedup key
    pub text: String,
    pub kind: TokenKind,
}

/// Scan a template for placeholder tokens in first-occurrence order.
///
/// Duplicate token texts are reported once. An unterminated `$(` is not a
/// token and scanning stops there.
pub fn scan(template: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut offset = 0;

    while let Some(start) = template[offset..].find("$(") {
        let open = offset + start;
        let inner_start = open + 2;

        let close = match template[inner_start..].find(')') {
            Some(pos) => inner_start + pos,
            None => break,
        };

        let text = &template[open..=close];
        let inner = &template[inner_start..close];

        if !tokens.iter().any(|t| t.text == text) {
            tokens.push(Token {
                text: text.to_string(),
                kind: classify(inner),
            });
        }

        offset = close + 1;
    }

    tokens
}

fn classify(inner: &str) -> TokenKind {
    if let Some(keyword) = inner.strip_prefix('!') {
        let name_len = keyword
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(keyword.len());
        if name_len > 0 {
            return TokenKind::Keyword {
                name: keyword[..name_len].to_string(),
                rest: keyword[name_len..].to_string(),
            };
        }
    }
    TokenKind::Path(inner.to_string())
}
