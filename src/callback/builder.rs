//! Turns callback declarations into fully resolved definitions.

use serde_json::Value;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::metrics::CALLBACKS_SKIPPED_TOTAL;
use crate::placeholder::{plain_rendering, substitute, substitute_text, PlaceholderResolver,
    ResolvedMap};

use super::{CallbackDeclaration, ResolvedCallback};

/// Resolves a declaration's payload and destination against a source
/// document, producing an immutable [`ResolvedCallback`] — or nothing when
/// the destination resolves to null.
pub struct CallbackBuilder {
    resolver: PlaceholderResolver,
}

impl CallbackBuilder {
    pub fn new() -> Self {
        Self {
            resolver: PlaceholderResolver::new(),
        }
    }

    pub fn with_resolver(resolver: PlaceholderResolver) -> Self {
        Self { resolver }
    }

    /// Build a resolved definition.
    ///
    /// Fails with a configuration error unless exactly one destination field
    /// is populated; that failure aborts the whole serve-time dispatch. A
    /// destination whose resolved text is `null` skips the callback: logged,
    /// counted, no task created, no error surfaced.
    pub fn build(
        &self,
        declaration: &CallbackDeclaration,
        source: &Value,
    ) -> EngineResult<Option<ResolvedCallback>> {
        let destinations = [
            declaration.url.as_deref(),
            declaration.queue.as_deref(),
            declaration.topic.as_deref(),
        ];
        let populated = destinations
            .iter()
            .flatten()
            .filter(|d| !d.is_empty())
            .count();
        if populated == 0 {
            return Err(EngineError::Configuration(
                "Callback declaration has no url, queue, or topic destination".to_string(),
            ));
        }
        if populated > 1 {
            return Err(EngineError::Configuration(
                "Callback declaration has more than one destination".to_string(),
            ));
        }

        let data = self.resolve_data(&declaration.data, source)?;

        let url = match declaration.url.as_deref().filter(|d| !d.is_empty()) {
            Some(dest) => Some(self.resolve_url(dest, source)?),
            None => None,
        };
        let queue = match declaration.queue.as_deref().filter(|d| !d.is_empty()) {
            Some(dest) => Some(self.resolve_name(dest, source)?),
            None => None,
        };
        let topic = match declaration.topic.as_deref().filter(|d| !d.is_empty()) {
            Some(dest) => Some(self.resolve_name(dest, source)?),
            None => None,
        };

        let destination = url
            .as_deref()
            .or(queue.as_deref())
            .or(topic.as_deref())
            .unwrap_or_default();
        if destination == "null" {
            let declared = declaration
                .url
                .as_deref()
                .or(declaration.queue.as_deref())
                .or(declaration.topic.as_deref())
                .unwrap_or_default();
            tracing::warn!(
                destination = %declared,
                "Callback destination resolved to null, skipping"
            );
            CALLBACKS_SKIPPED_TOTAL.inc();
            return Ok(None);
        }

        let trace_id = declaration
            .trace_id
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Some(ResolvedCallback {
            delay_seconds: declaration.delay_seconds,
            url,
            queue,
            topic,
            data,
            auth: declaration.auth.clone(),
            trace_id,
            expected_status: declaration.expected_status,
        }))
    }

    /// Resolve tokens anywhere inside the payload, type-preserving.
    fn resolve_data(&self, data: &Value, source: &Value) -> EngineResult<Value> {
        let text = data.to_string();
        let map = self.resolver.resolve(&text, Some(source))?;
        if map.is_empty() {
            return Ok(data.clone());
        }
        let substituted = substitute(&map, &text);
        serde_json::from_str(&substituted).map_err(|err| {
            EngineError::Template(format!(
                "Substituted callback payload is not valid JSON: {err}"
            ))
        })
    }

    /// Resolve a queue/topic name (plain text, no encoding).
    fn resolve_name(&self, destination: &str, source: &Value) -> EngineResult<String> {
        let map = self.resolver.resolve(destination, Some(source))?;
        Ok(substitute_text(&map, destination))
    }

    /// Resolve a URL destination. Token values landing after the first `?`
    /// are percent-encoded; values in the path are substituted verbatim.
    fn resolve_url(&self, destination: &str, source: &Value) -> EngineResult<String> {
        let map = self.resolver.resolve(destination, Some(source))?;

        match destination.split_once('?') {
            Some((path, query)) => {
                let mut encoded = ResolvedMap::default();
                for (token, value) in map.iter() {
                    let rendered = plain_rendering(value);
                    encoded.insert(
                        token.clone(),
                        Value::String(urlencoding::encode(&rendered).into_owned()),
                    );
                }
                Ok(format!(
                    "{}?{}",
                    substitute_text(&map, path),
                    substitute_text(&encoded, query)
                ))
            }
            None => Ok(substitute_text(&map, destination)),
        }
    }
}

impl Default for CallbackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn declaration(value: Value) -> CallbackDeclaration {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn rejects_missing_destination() {
        let decl = declaration(json!({"data": {}}));
        let err = CallbackBuilder::new().build(&decl, &json!({})).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn rejects_multiple_destinations() {
        let decl = declaration(json!({
            "url": "http://h/cb",
            "queue": "orders",
            "data": {}
        }));
        assert!(CallbackBuilder::new().build(&decl, &json!({})).is_err());
    }

    #[test]
    fn resolves_payload_with_type_preservation() {
        let decl = declaration(json!({
            "url": "http://h/cb",
            "data": {"total": "$(request.total)", "note": "order $(request.id)"}
        }));
        let source = json!({"request": {"total": 42, "id": "A1"}});
        let resolved = CallbackBuilder::new()
            .build(&decl, &source)
            .unwrap()
            .unwrap();

        assert_eq!(resolved.data["total"], json!(42));
        assert_eq!(resolved.data["note"], json!("order A1"));
    }

    #[test]
    fn encodes_query_tokens_only() {
        let decl = declaration(json!({
            "url": "http://host/$(request.v)/cb?x=$(request.v)",
            "data": {}
        }));
        let source = json!({"request": {"v": "a b"}});
        let resolved = CallbackBuilder::new()
            .build(&decl, &source)
            .unwrap()
            .unwrap();

        assert_eq!(resolved.url.as_deref(), Some("http://host/a b/cb?x=a%20b"));
    }

    #[test]
    fn skips_null_destination() {
        let decl = declaration(json!({
            "url": "$(request.callback_url)",
            "data": {}
        }));
        let built = CallbackBuilder::new().build(&decl, &json!({})).unwrap();
        assert!(built.is_none());
    }

    #[test]
    fn assigns_trace_id_when_absent() {
        let decl = declaration(json!({"queue": "orders", "data": {}}));
        let resolved = CallbackBuilder::new()
            .build(&decl, &json!({}))
            .unwrap()
            .unwrap();
        assert!(Uuid::parse_str(&resolved.trace_id).is_ok());
    }

    #[test]
    fn keeps_declared_trace_id() {
        let decl = declaration(json!({
            "queue": "orders",
            "trace_id": "trace-9",
            "data": {}
        }));
        let resolved = CallbackBuilder::new()
            .build(&decl, &json!({}))
            .unwrap()
            .unwrap();
        assert_eq!(resolved.trace_id, "trace-9");
    }

    #[test]
    fn resolves_queue_name_tokens() {
        let decl = declaration(json!({
            "queue": "orders-$(request.region)",
            "data": {}
        }));
        let source = json!({"request": {"region": "eu"}});
        let resolved = CallbackBuilder::new()
            .build(&decl, &source)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.queue.as_deref(), Some("orders-eu"));
    }

    #[test]
    fn keyword_arguments_fail_the_build() {
        let decl = declaration(json!({
            "url": "http://h/cb",
            "data": {"n": "$(!Random[5,1])"}
        }));
        assert!(CallbackBuilder::new().build(&decl, &json!({})).is_err());
    }

    #[test]
    fn empty_string_destination_counts_as_missing() {
        let decl = declaration(json!({"url": "", "data": {}}));
        assert!(CallbackBuilder::new().build(&decl, &json!({})).is_err());
    }
}
