//! Analyser configuration

use analyser_lib::EngineSettings;
use anyhow::Result;
use serde::Deserialize;

/// Analyser service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyserConfig {
    /// Service name used as the outbound event-id prefix
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// API server port for event ingest, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Monitoring window multiplier for worker capacity
    #[serde(default = "default_adaptation_delta")]
    pub adaptation_delta: u32,

    /// Usage fraction at which a worker counts as overloaded
    #[serde(default = "default_is_overloaded_percentage")]
    pub is_overloaded_percentage: f64,

    /// Debounce interval between same-typed requests, in seconds
    #[serde(default = "default_min_seconds")]
    pub min_seconds_to_ask_same_change_request_type: i64,

    /// Estimate usage with the fuzzy model instead of the crisp ratio
    #[serde(default = "default_use_fuzzy")]
    pub use_fuzzy_usage_analysis: bool,

    /// Run the load-shedding verifier on monitoring ticks
    #[serde(default)]
    pub enable_load_shedding_check: bool,

    /// Interval between engine state log lines, in seconds
    #[serde(default = "default_state_log_interval")]
    pub state_log_interval_secs: u64,
}

fn default_service_name() -> String {
    std::env::var("SERVICE_NAME").unwrap_or_else(|_| "adaptation-analyser".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_adaptation_delta() -> u32 {
    10
}

fn default_is_overloaded_percentage() -> f64 {
    0.7
}

fn default_min_seconds() -> i64 {
    3
}

fn default_use_fuzzy() -> bool {
    true
}

fn default_state_log_interval() -> u64 {
    30
}

impl AnalyserConfig {
    /// Load configuration from environment and config file
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ANALYSER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| AnalyserConfig {
            service_name: default_service_name(),
            api_port: default_api_port(),
            adaptation_delta: default_adaptation_delta(),
            is_overloaded_percentage: default_is_overloaded_percentage(),
            min_seconds_to_ask_same_change_request_type: default_min_seconds(),
            use_fuzzy_usage_analysis: default_use_fuzzy(),
            enable_load_shedding_check: false,
            state_log_interval_secs: default_state_log_interval(),
        }))
    }

    /// Engine settings derived from this configuration
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            service_name: self.service_name.clone(),
            adaptation_delta: self.adaptation_delta,
            is_overloaded_percentage: self.is_overloaded_percentage,
            min_seconds_to_ask_same_change_request_type: self
                .min_seconds_to_ask_same_change_request_type,
            use_fuzzy_usage_analysis: self.use_fuzzy_usage_analysis,
            enable_load_shedding_check: self.enable_load_shedding_check,
        }
    }
}
