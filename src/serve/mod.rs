//! Inbound boundary for the mock-serving layer.
//!
//! Two operations cross this boundary per served request: rewriting a
//! templated response body, and dispatching the request's declared callbacks.
//! Both run synchronously relative to the caller — template resolution plus,
//! for callbacks, one spool write per task; the deliveries themselves happen
//! later on the scheduler's workers.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::callback::{CallbackBuilder, CallbackDeclaration};
use crate::channel::{select_handlers, ChannelHandler, HttpChannel, QueueChannel, TopicChannel,
    TopicNameCache};
use crate::config::Settings;
use crate::error::EngineResult;
use crate::placeholder::{substitute, PlaceholderResolver};
use crate::scheduler::Scheduler;
use crate::spool::SpoolStore;
use crate::transport::create_transports;

/// The engine facade: placeholder resolution on the serve path, spool +
/// scheduler + channel handlers behind it.
pub struct CallbackRelay {
    resolver: PlaceholderResolver,
    builder: CallbackBuilder,
    spool: Arc<SpoolStore>,
    scheduler: Scheduler,
    handlers: Vec<Arc<dyn ChannelHandler>>,
}

impl CallbackRelay {
    /// Build the full engine from configuration: spool directory, worker
    /// pool, HTTP channel, and messaging transports.
    pub async fn new(settings: &Settings) -> EngineResult<Self> {
        let (queue_transport, topic_transport) = create_transports(&settings.messaging)?;
        let handlers: Vec<Arc<dyn ChannelHandler>> = vec![
            Arc::new(HttpChannel::new(&settings.http)),
            Arc::new(QueueChannel::new(queue_transport)),
            Arc::new(TopicChannel::new(
                topic_transport,
                Arc::new(TopicNameCache::new()),
            )),
        ];
        Self::with_handlers(settings, handlers).await
    }

    /// Build the engine around an explicit handler list (test seam).
    pub async fn with_handlers(
        settings: &Settings,
        handlers: Vec<Arc<dyn ChannelHandler>>,
    ) -> EngineResult<Self> {
        let spool = Arc::new(SpoolStore::open(&settings.spool).await?);
        let scheduler = Scheduler::new(&settings.scheduler, spool.clone());

        Ok(Self {
            resolver: PlaceholderResolver::new(),
            builder: CallbackBuilder::new(),
            spool,
            scheduler,
            handlers,
        })
    }

    /// Rewrite a templated response body.
    ///
    /// The template comes back unchanged when it is empty or the response
    /// content type is not JSON; otherwise every placeholder token resolves
    /// against the triggering request and the produced response.
    pub fn resolve_response_body(
        &self,
        request_body: &str,
        response_body: &str,
        template: &str,
        content_type: Option<&str>,
    ) -> EngineResult<String> {
        if template.is_empty() || !is_json_content(content_type) {
            return Ok(template.to_string());
        }

        let source = compose_source(request_body, response_body, None);
        let map = self.resolver.resolve(template, Some(&source))?;
        Ok(substitute(&map, template))
    }

    /// Build, spool, and schedule every declared callback for one served
    /// request. Declarations are processed in order; a configuration error on
    /// any of them aborts the whole call and schedules nothing further.
    /// Returns the number of tasks scheduled.
    pub async fn dispatch_callbacks(
        &self,
        request_body: &str,
        response_body: &str,
        url_path: &str,
        declarations: &[CallbackDeclaration],
    ) -> EngineResult<usize> {
        if declarations.is_empty() {
            return Ok(0);
        }

        let source = compose_source(request_body, response_body, Some(url_path));
        let mut scheduled = 0;

        for declaration in declarations {
            let Some(resolved) = self.builder.build(declaration, &source)? else {
                continue;
            };

            for handler in select_handlers(&self.handlers, &resolved) {
                let handle = self.spool.persist(&resolved).await?;
                self.scheduler.schedule(handle, handler, resolved.delay());
                scheduled += 1;
            }
        }

        tracing::debug!(
            declared = declarations.len(),
            scheduled = scheduled,
            "Dispatched request callbacks"
        );
        Ok(scheduled)
    }

    /// The spool store backing this engine (startup sweeps, tests).
    pub fn spool(&self) -> &Arc<SpoolStore> {
        &self.spool
    }
}

fn is_json_content(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
}

/// Compose the source document placeholders resolve against:
/// `{"request": …, "response": …, "path": […]}`. Bodies that are not valid
/// JSON contribute null; the path entry appears only on the callback side.
fn compose_source(request_body: &str, response_body: &str, url_path: Option<&str>) -> Value {
    let mut source = json!({
        "request": parse_or_null(request_body),
        "response": parse_or_null(response_body),
    });

    if let Some(path) = url_path {
        let segments: Vec<Value> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| Value::String(segment.to_string()))
            .collect();
        source["path"] = Value::Array(segments);
    }

    source
}

fn parse_or_null(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or(Value::Null)
}
