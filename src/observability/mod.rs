//! Workflow tracing: observability callbacks injected around invocation.
//!
//! The [`Tracer`] wraps a compiled workflow's two entry points so every
//! invocation carries an observability callback, without changing the
//! invocation contract: inputs, outputs, and errors pass through the wrapper
//! unmodified, and caller-supplied callbacks are preserved, never replaced.
//!
//! Construction is deliberately failure-tolerant. If the backend cannot be
//! reached or authenticated, the tracer logs a warning and degrades to a
//! no-op pass-through. Telemetry must never block the primary workflow.
//!
//! The default backend speaks the Langfuse public API over HTTP; anything
//! implementing [`ObservabilityBackend`] can stand in for it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tower::BoxError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ObservabilityConfig;
use crate::graph::{CompiledWorkflow, InvokeConfig};
use crate::state::ConversationState;

/// Telemetry emitted by the workflow executor.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    WorkflowStart {
        workflow: String,
        run_id: String,
    },
    NodeStart {
        node: String,
    },
    NodeEnd {
        node: String,
    },
    Handoff {
        from: String,
        to: String,
    },
    WorkflowEnd {
        workflow: String,
        run_id: String,
        message_count: usize,
    },
}

/// Receives trace events from the executor. Implementations must not block.
pub trait TraceHandler: Send + Sync {
    fn on_event(&self, event: &TraceEvent);
}

/// Shared observability handle appended to per-call configurations.
pub type TraceCallback = Arc<dyn TraceHandler>;

/// External observability service contract.
#[async_trait]
pub trait ObservabilityBackend: Send + Sync {
    /// Liveness/auth probe performed once at tracer construction.
    async fn auth_check(&self) -> std::result::Result<bool, BoxError>;

    /// The callback handle that ships events to this backend.
    fn callback(&self) -> TraceCallback;
}

/// Langfuse-compatible HTTP backend.
pub struct LangfuseBackend {
    client: reqwest::Client,
    config: ObservabilityConfig,
}

impl LangfuseBackend {
    pub fn new(config: ObservabilityConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ObservabilityBackend for LangfuseBackend {
    async fn auth_check(&self) -> std::result::Result<bool, BoxError> {
        let url = format!("{}/api/public/projects", self.config.host);
        let resp = self
            .client
            .get(&url)
            .basic_auth(
                self.config.public_key.clone().unwrap_or_default(),
                self.config.secret_key.clone(),
            )
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    fn callback(&self) -> TraceCallback {
        Arc::new(LangfuseHandler {
            client: self.client.clone(),
            config: self.config.clone(),
        })
    }
}

/// Ships events to the Langfuse ingestion endpoint, fire-and-forget.
struct LangfuseHandler {
    client: reqwest::Client,
    config: ObservabilityConfig,
}

impl TraceHandler for LangfuseHandler {
    fn on_event(&self, event: &TraceEvent) {
        let body = match serde_json::to_value(event) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "failed to serialize trace event");
                return;
            }
        };
        let epoch_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let payload = serde_json::json!({
            "batch": [{
                "id": Uuid::new_v4().to_string(),
                "type": "event-create",
                "timestamp": epoch_ms,
                "body": body,
            }]
        });

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime; dropping trace event");
            return;
        };
        let client = self.client.clone();
        let url = format!("{}/api/public/ingestion", self.config.host);
        let public_key = self.config.public_key.clone().unwrap_or_default();
        let secret_key = self.config.secret_key.clone();
        handle.spawn(async move {
            let result = client
                .post(&url)
                .basic_auth(public_key, secret_key)
                .json(&payload)
                .send()
                .await;
            if let Err(e) = result {
                debug!(error = %e, "failed to ship trace event");
            }
        });
    }
}

/// Adds observability tracing to compiled supervisor workflows.
pub struct Tracer {
    callback: Option<TraceCallback>,
}

impl Tracer {
    /// Connect to a Langfuse-compatible backend described by `config`.
    /// Never fails: on any auth or connection problem the tracer degrades
    /// to a no-op.
    pub async fn connect(config: ObservabilityConfig) -> Self {
        Self::with_backend(Arc::new(LangfuseBackend::new(config))).await
    }

    /// Build a tracer over any backend, probing it once.
    pub async fn with_backend(backend: Arc<dyn ObservabilityBackend>) -> Self {
        match backend.auth_check().await {
            Ok(true) => {
                info!("observability backend authenticated and ready");
                Self {
                    callback: Some(backend.callback()),
                }
            }
            Ok(false) => {
                warn!("observability backend authentication failed; tracing disabled");
                Self { callback: None }
            }
            Err(e) => {
                warn!(error = %e, "error initializing observability backend; tracing disabled");
                Self { callback: None }
            }
        }
    }

    /// A tracer that never traces.
    pub fn disabled() -> Self {
        Self { callback: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.callback.is_some()
    }

    /// Wrap a workflow so its invocations carry this tracer's callback.
    ///
    /// Without a live backend handle this is a pass-through: the returned
    /// workflow is behaviorally identical to the input. Wrapping an already
    /// traced workflow appends exactly one more callback per wrap.
    pub fn trace_workflow(&self, workflow: impl Into<TracedWorkflow>) -> TracedWorkflow {
        let mut traced = workflow.into();
        match &self.callback {
            Some(cb) => traced.callbacks.push(cb.clone()),
            None => {
                warn!("observability callback not available; returning workflow without tracing")
            }
        }
        traced
    }
}

/// A workflow whose entry points inject trace callbacks into each call's
/// configuration before delegating. Composition, not mutation: the inner
/// workflow is untouched and remains invocable on its own.
#[derive(Clone)]
pub struct TracedWorkflow {
    inner: CompiledWorkflow,
    callbacks: Vec<TraceCallback>,
}

impl From<CompiledWorkflow> for TracedWorkflow {
    fn from(inner: CompiledWorkflow) -> Self {
        Self {
            inner,
            callbacks: Vec::new(),
        }
    }
}

impl TracedWorkflow {
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// The callbacks this wrapper appends to each invocation.
    pub fn callbacks(&self) -> &[TraceCallback] {
        &self.callbacks
    }

    /// Suspend-capable entry point; same contract as the inner workflow.
    pub async fn invoke(
        &self,
        state: ConversationState,
        config: Option<InvokeConfig>,
    ) -> std::result::Result<ConversationState, BoxError> {
        self.inner.invoke(state, Some(self.augment(config))).await
    }

    /// Blocking entry point; same contract as the inner workflow.
    pub fn invoke_blocking(
        &self,
        state: ConversationState,
        config: Option<InvokeConfig>,
    ) -> std::result::Result<ConversationState, BoxError> {
        self.inner.invoke_blocking(state, Some(self.augment(config)))
    }

    /// Append our callbacks to the caller's configuration, preserving any
    /// callbacks the caller supplied.
    fn augment(&self, config: Option<InvokeConfig>) -> InvokeConfig {
        let mut config = config.unwrap_or_default();
        config.callbacks.extend(self.callbacks.iter().cloned());
        config
    }
}

impl std::fmt::Debug for TracedWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedWorkflow")
            .field("inner", &self.inner)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
