//! Error types for the supervisor orchestration crate.
//!
//! Two kinds of failure exist here and they are deliberately kept apart:
//!
//! - [`SupervisorError::Configuration`] is raised at build time for invalid
//!   worker sets or an engine that cannot call tools. It is always fatal and
//!   never silently corrected.
//! - Runtime errors from the reasoning engine or the graph executor travel as
//!   [`tower::BoxError`] and propagate to the caller of the workflow entry
//!   points unmodified; this crate adds no retry layer and swallows nothing.
//!
//! Observability-init failures are not represented here at all: the tracer
//! degrades to a no-op with a logged warning instead of surfacing an error.

use thiserror::Error;

/// Result type alias for construction-time operations.
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Errors surfaced while assembling a supervisor workflow.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Invalid build-time configuration: duplicate worker names, an empty
    /// worker set, a name colliding with the reserved supervisor node, or an
    /// engine without tool-calling support.
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl SupervisorError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
