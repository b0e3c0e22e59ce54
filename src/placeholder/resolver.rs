//! Token resolution: one memoized pass over a template.

use serde_json::Value;

use crate::document;
use crate::error::EngineResult;
use crate::placeholder::keywords::KeywordEvaluator;
use crate::placeholder::token::{self, TokenKind};

/// Token text → resolved value, in first-occurrence order.
///
/// Order matters downstream: the substitutor applies entries in resolution
/// order, and identical token texts must always map to a single value within
/// one pass.
#[derive(Debug, Default, Clone)]
pub struct ResolvedMap {
    entries: Vec<(String, Value)>,
}

impl ResolvedMap {
    pub fn insert(&mut self, token: String, value: Value) {
        if !self.entries.iter().any(|(t, _)| t == &token) {
            self.entries.push((token, value));
        }
    }

    pub fn get(&self, token: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves placeholder tokens against a source document and the keyword
/// generators.
pub struct PlaceholderResolver {
    keywords: KeywordEvaluator,
}

impl PlaceholderResolver {
    pub fn new() -> Self {
        Self {
            keywords: KeywordEvaluator::new(),
        }
    }

    pub fn with_keywords(keywords: KeywordEvaluator) -> Self {
        Self { keywords }
    }

    /// Scan `template` and resolve every distinct token.
    ///
    /// Keyword tokens resolve even without a source document; path tokens
    /// resolve to null when `source` is absent. A keyword evaluation failure
    /// aborts the whole pass — no partial map is returned.
    pub fn resolve(&self, template: &str, source: Option<&Value>) -> EngineResult<ResolvedMap> {
        let mut map = ResolvedMap::default();

        for token in token::scan(template) {
            let value = match &token.kind {
                TokenKind::Keyword { name, rest } => self.keywords.evaluate(name, rest)?,
                TokenKind::Path(path) => match source {
                    Some(doc) => document::lookup(doc, path),
                    None => Value::Null,
                },
            };
            map.insert(token.text, value);
        }

        Ok(map)
    }
}

impl Default for PlaceholderResolver {
    fn default() -> Self {
        Self::new()
    }
}
