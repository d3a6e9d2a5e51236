//! Model and observability configuration.
//!
//! Both configs resolve from the process environment with explicit setters
//! taking precedence, so demos and deployments share one code path. Missing
//! model credentials are not an error here: the engine client falls back to
//! its own defaults, and gateways that need no key work with none at all.

use std::env;

/// Chat model settings for [`crate::engine::Engine::openai`].
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model identifier, e.g. `gpt-4o` or a gateway-routed name.
    pub model: String,
    /// Provider label, informational only (the wire protocol is always the
    /// OpenAI chat completions API).
    pub provider: String,
    /// Override API base URL for OpenAI-compatible gateways.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            provider: "openai".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.3,
        }
    }
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Resolve from `MODEL_ID`, `MODEL_PROVIDER`, `MODEL_BASE_URL`,
    /// `MODEL_API_KEY`, and `MODEL_TEMPERATURE`. Unset variables keep the
    /// defaults; a malformed temperature keeps the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = env::var("MODEL_ID") {
            config.model = model;
        }
        if let Ok(provider) = env::var("MODEL_PROVIDER") {
            config.provider = provider;
        }
        if let Ok(base_url) = env::var("MODEL_BASE_URL") {
            config.base_url = Some(base_url);
        }
        if let Ok(api_key) = env::var("MODEL_API_KEY") {
            config.api_key = Some(api_key);
        }
        if let Some(t) = env::var("MODEL_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
        {
            config.temperature = t;
        }
        config
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Langfuse-compatible backend settings for
/// [`crate::observability::Tracer::connect`].
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
    pub host: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            public_key: None,
            secret_key: None,
            host: "http://localhost:3000".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Resolve from `LANGFUSE_PUBLIC_KEY`, `LANGFUSE_SECRET_KEY`, and
    /// `LANGFUSE_HOST`. Missing keys are not an error: the tracer's auth
    /// probe will fail and tracing degrades to a no-op.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(public_key) = env::var("LANGFUSE_PUBLIC_KEY") {
            config.public_key = Some(public_key);
        }
        if let Ok(secret_key) = env::var("LANGFUSE_SECRET_KEY") {
            config.secret_key = Some(secret_key);
        }
        if let Ok(host) = env::var("LANGFUSE_HOST") {
            config.host = host;
        }
        config
    }

    pub fn keys(mut self, public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_config_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.temperature, 0.3);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn model_config_builder_setters() {
        let config = ModelConfig::new("gpt-4o-mini")
            .provider("gateway")
            .base_url("http://localhost:4000")
            .api_key("sk-test")
            .temperature(0.0);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.provider, "gateway");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:4000"));
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn observability_config_defaults_to_local_host() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.host, "http://localhost:3000");
        assert!(config.public_key.is_none());
        assert!(config.secret_key.is_none());
    }

    #[test]
    fn observability_config_setters() {
        let config = ObservabilityConfig::default()
            .keys("pk-lf-1", "sk-lf-1")
            .host("https://cloud.langfuse.com");
        assert_eq!(config.public_key.as_deref(), Some("pk-lf-1"));
        assert_eq!(config.secret_key.as_deref(), Some("sk-lf-1"));
        assert_eq!(config.host, "https://cloud.langfuse.com");
    }
}
