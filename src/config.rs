//! `RuntimeConfig`: process-wide defaults layered from built-in defaults, an
//! optional config file, then environment variables (SPEC_FULL.md §10).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultOutputContext {
    Machine,
    Human,
    Developer,
}

impl From<DefaultOutputContext> for crate::context::OutputContext {
    fn from(v: DefaultOutputContext) -> Self {
        match v {
            DefaultOutputContext::Machine => crate::context::OutputContext::Machine,
            DefaultOutputContext::Human => crate::context::OutputContext::Human,
            DefaultOutputContext::Developer => crate::context::OutputContext::Developer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub default_output_context: DefaultOutputContext,
    pub execute_timeout_ms: u64,
    pub default_http_port: u16,
    pub default_socket_port: u16,
    pub warnings_are_errors: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_output_context: DefaultOutputContext::Machine,
            execute_timeout_ms: 30_000,
            default_http_port: 8080,
            default_socket_port: 9000,
            warnings_are_errors: false,
        }
    }
}

impl RuntimeConfig {
    /// Layers built-in defaults, an optional `ARO_RUNTIME_CONFIG` file
    /// (format inferred from extension), then `ARO__`-prefixed environment
    /// variables (SPEC_FULL.md §10).
    pub fn load() -> anyhow::Result<Self> {
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&RuntimeConfig::default())?,
        );
        if let Ok(path) = std::env::var("ARO_RUNTIME_CONFIG") {
            builder = builder.add_source(config::File::with_name(&path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("ARO")
                .separator("__")
                .try_parsing(true),
        );
        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = RuntimeConfig::default();
        assert_eq!(config.execute_timeout_ms, 30_000);
        assert_eq!(config.default_http_port, 8080);
        assert_eq!(config.default_socket_port, 9000);
        assert!(!config.warnings_are_errors);
    }
}
