use std::time::Duration;

use crate::errors::HarnessError;

/// Agent used when none is configured.
pub const DEFAULT_AGENT_ID: &str = "customer_support_voice_agent";
/// Inference connector used when none is configured.
pub const DEFAULT_CONNECTOR_ID: &str = "groq";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the Agent Builder HTTP client.
#[derive(Clone, Debug)]
pub struct AgentBuilderConfig {
    /// Kibana base URL, without the API path.
    pub base_url: String,
    /// API key sent as `Authorization: ApiKey <key>`.
    pub api_key: String,
    /// Connect timeout, and total timeout for the one-shot `converse` call.
    pub timeout: Duration,
    pub agent_id: String,
    pub connector_id: String,
}

impl AgentBuilderConfig {
    /// Creates a config with default agent, connector and timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            agent_id: DEFAULT_AGENT_ID.to_string(),
            connector_id: DEFAULT_CONNECTOR_ID.to_string(),
        }
    }

    /// Builds a config from the process environment.
    ///
    /// Reads `KIBANA_BASE_URL` and `KIBANA_API_KEY` (both required) plus the
    /// optional `AGENT_BUILDER_AGENT_ID`, `AGENT_BUILDER_CONNECTOR_ID` and
    /// `AGENT_BUILDER_TIMEOUT_SECS` overrides.
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, HarnessError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| HarnessError::Config(format!("missing {key}")))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(required("KIBANA_BASE_URL")?, required("KIBANA_API_KEY")?);
        if let Some(agent_id) = optional("AGENT_BUILDER_AGENT_ID") {
            config.agent_id = agent_id;
        }
        if let Some(connector_id) = optional("AGENT_BUILDER_CONNECTOR_ID") {
            config.connector_id = connector_id;
        }
        if let Some(raw) = optional("AGENT_BUILDER_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                HarnessError::Config(format!("invalid AGENT_BUILDER_TIMEOUT_SECS {raw:?}: {e}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }

    pub fn connector_id(mut self, connector_id: impl Into<String>) -> Self {
        self.connector_id = connector_id.into();
        self
    }

    pub(crate) fn converse_url(&self) -> String {
        format!(
            "{}/api/agent_builder/converse/async",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_overrides_are_absent() {
        let config = AgentBuilderConfig::from_lookup(lookup(&[
            ("KIBANA_BASE_URL", "https://kb.example.com/"),
            ("KIBANA_API_KEY", "secret"),
        ]))
        .expect("config");
        assert_eq!(config.agent_id, DEFAULT_AGENT_ID);
        assert_eq!(config.connector_id, DEFAULT_CONNECTOR_ID);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(
            config.converse_url(),
            "https://kb.example.com/api/agent_builder/converse/async"
        );
    }

    #[test]
    fn overrides_are_read() {
        let config = AgentBuilderConfig::from_lookup(lookup(&[
            ("KIBANA_BASE_URL", "http://localhost:5601"),
            ("KIBANA_API_KEY", "secret"),
            ("AGENT_BUILDER_AGENT_ID", "orders_agent"),
            ("AGENT_BUILDER_CONNECTOR_ID", "openai"),
            ("AGENT_BUILDER_TIMEOUT_SECS", "90"),
        ]))
        .expect("config");
        assert_eq!(config.agent_id, "orders_agent");
        assert_eq!(config.connector_id, "openai");
        assert_eq!(config.timeout, Duration::from_secs(90));
    }

    #[test]
    fn missing_or_blank_api_key_is_a_config_error() {
        let err = AgentBuilderConfig::from_lookup(lookup(&[
            ("KIBANA_BASE_URL", "http://localhost:5601"),
            ("KIBANA_API_KEY", "  "),
        ]))
        .expect_err("blank key");
        assert!(matches!(err, HarnessError::Config(msg) if msg.contains("KIBANA_API_KEY")));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = AgentBuilderConfig::from_lookup(lookup(&[
            ("KIBANA_BASE_URL", "http://localhost:5601"),
            ("KIBANA_API_KEY", "secret"),
            ("AGENT_BUILDER_TIMEOUT_SECS", "soon"),
        ]))
        .expect_err("bad timeout");
        assert!(matches!(err, HarnessError::Config(msg) if msg.contains("TIMEOUT")));
    }
}
