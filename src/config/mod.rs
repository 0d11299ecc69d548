//! Environment-backed configuration for the query engine and its HTTP front door.
//!
//! Every option enumerated in the engine's external-interface contract is a typed field here;
//! unknown environment variables are ignored, but an optional TOML profile (loaded via
//! [`Config::merge_profile`]) rejects unknown keys at startup.

pub mod error;


pub use error::ConfigError;

use std::collections::HashMap;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::types::WebSearchMode;

/// Process-wide configuration, loaded once at startup and shared via `Arc`.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,

    /// Working directory for on-disk artifacts: calibration matrices, BM25 snapshots.
    pub storage_path: PathBuf,
    /// GGUF weights for the local embedder; `None` runs the deterministic stub embedder.
    pub local_model_path: Option<PathBuf>,
    pub qdrant_url: String,

    pub top_k_default: usize,

    pub semantic_cache_threshold: f32,
    pub semantic_cache_ttl_seconds: u64,
    pub semantic_cache_capacity: u64,

    pub web_search_mode: WebSearchMode,
    pub web_search_max_results: usize,
    pub web_search_trusted_domain_suffixes: Vec<String>,
    pub web_search_blocked_domains: Vec<String>,
    pub web_search_max_queries_per_minute: u32,

    pub web_kb_ttl_days: i64,
    pub web_kb_min_trust_score: f32,

    pub rrf_k: u32,
    pub tier_weights: (f32, f32, f32),

    pub per_tier_timeout_ms: u64,
    pub query_timeout_ms: u64,

    pub default_premium_embedder: Option<String>,
    /// Directory scanned for `calibration_<premium_name>.bin` matrix files.
    pub calibration_matrix_dir: PathBuf,

    pub generation_model: String,
    pub generation_temperature: f32,
    pub generation_max_response_tokens: u32,
    /// Token budget (approximated by whitespace word count) the fused retrieval list is
    /// truncated to before being handed to the generator.
    pub generation_context_token_budget: usize,

    pub evaluator_enabled: bool,
    /// Fraction of queries sampled for quality evaluation, in `[0, 1]`.
    pub evaluator_sample_rate: f32,
    pub evaluator_relevance_threshold: f32,
    pub evaluator_faithfulness_threshold: f32,
    pub evaluator_utilization_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            storage_path: PathBuf::from("./.data"),
            local_model_path: None,
            qdrant_url: "http://localhost:6334".to_string(),
            top_k_default: crate::constants::DEFAULT_TOP_K,
            semantic_cache_threshold: crate::constants::DEFAULT_CACHE_SIM_THRESHOLD,
            semantic_cache_ttl_seconds: crate::constants::DEFAULT_CACHE_TTL_SECS,
            semantic_cache_capacity: crate::constants::DEFAULT_CACHE_CAPACITY,
            web_search_mode: WebSearchMode::OnLowConfidence,
            web_search_max_results: crate::constants::DEFAULT_WEB_MAX_RESULTS,
            web_search_trusted_domain_suffixes: Vec::new(),
            web_search_blocked_domains: Vec::new(),
            web_search_max_queries_per_minute: crate::constants::DEFAULT_WEB_QPM,
            web_kb_ttl_days: crate::constants::DEFAULT_WEB_KB_TTL_DAYS,
            web_kb_min_trust_score: crate::constants::DEFAULT_WEB_KB_MIN_TRUST,
            rrf_k: crate::constants::DEFAULT_RRF_K,
            tier_weights: crate::constants::DEFAULT_TIER_WEIGHTS,
            per_tier_timeout_ms: crate::constants::DEFAULT_PER_TIER_TIMEOUT_MS,
            query_timeout_ms: crate::constants::DEFAULT_QUERY_TIMEOUT_MS,
            default_premium_embedder: None,
            calibration_matrix_dir: PathBuf::from("./.data/calibration"),
            generation_model: "gpt-4o-mini".to_string(),
            generation_temperature: 0.2,
            generation_max_response_tokens: 800,
            generation_context_token_budget: 3_000,
            evaluator_enabled: true,
            evaluator_sample_rate: 1.0,
            evaluator_relevance_threshold: crate::constants::DEFAULT_RELEVANCE_THRESHOLD,
            evaluator_faithfulness_threshold: crate::constants::DEFAULT_FAITHFULNESS_THRESHOLD,
            evaluator_utilization_threshold: crate::constants::DEFAULT_UTILIZATION_THRESHOLD,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "TRIARAG_PORT";
    const ENV_BIND_ADDR: &'static str = "TRIARAG_BIND_ADDR";
    const ENV_STORAGE_PATH: &'static str = "TRIARAG_STORAGE_PATH";
    const ENV_LOCAL_MODEL_PATH: &'static str = "TRIARAG_LOCAL_MODEL_PATH";
    const ENV_QDRANT_URL: &'static str = "TRIARAG_QDRANT_URL";
    const ENV_TOP_K_DEFAULT: &'static str = "TRIARAG_TOP_K_DEFAULT";
    const ENV_SEMANTIC_CACHE_THRESHOLD: &'static str = "TRIARAG_SEMANTIC_CACHE_THRESHOLD";
    const ENV_SEMANTIC_CACHE_TTL_SECONDS: &'static str = "TRIARAG_SEMANTIC_CACHE_TTL_SECONDS";
    const ENV_SEMANTIC_CACHE_CAPACITY: &'static str = "TRIARAG_SEMANTIC_CACHE_CAPACITY";
    const ENV_WEB_SEARCH_MODE: &'static str = "TRIARAG_WEB_SEARCH_MODE";
    const ENV_WEB_SEARCH_MAX_RESULTS: &'static str = "TRIARAG_WEB_SEARCH_MAX_RESULTS";
    const ENV_WEB_SEARCH_TRUSTED_DOMAIN_SUFFIXES: &'static str =
        "TRIARAG_WEB_SEARCH_TRUSTED_DOMAIN_SUFFIXES";
    const ENV_WEB_SEARCH_BLOCKED_DOMAINS: &'static str = "TRIARAG_WEB_SEARCH_BLOCKED_DOMAINS";
    const ENV_WEB_SEARCH_MAX_QUERIES_PER_MINUTE: &'static str =
        "TRIARAG_WEB_SEARCH_MAX_QUERIES_PER_MINUTE";
    const ENV_WEB_KB_TTL_DAYS: &'static str = "TRIARAG_WEB_KB_TTL_DAYS";
    const ENV_WEB_KB_MIN_TRUST_SCORE: &'static str = "TRIARAG_WEB_KB_MIN_TRUST_SCORE";
    const ENV_RRF_K: &'static str = "TRIARAG_RRF_K";
    const ENV_TIER_WEIGHTS: &'static str = "TRIARAG_TIER_WEIGHTS";
    const ENV_PER_TIER_TIMEOUT_MS: &'static str = "TRIARAG_PER_TIER_TIMEOUT_MS";
    const ENV_QUERY_TIMEOUT_MS: &'static str = "TRIARAG_QUERY_TIMEOUT_MS";
    const ENV_DEFAULT_PREMIUM_EMBEDDER: &'static str = "TRIARAG_DEFAULT_PREMIUM_EMBEDDER";
    const ENV_CALIBRATION_MATRIX_DIR: &'static str = "TRIARAG_CALIBRATION_MATRIX_DIR";
    const ENV_GENERATION_MODEL: &'static str = "TRIARAG_GENERATION_MODEL";
    const ENV_GENERATION_TEMPERATURE: &'static str = "TRIARAG_GENERATION_TEMPERATURE";
    const ENV_GENERATION_MAX_RESPONSE_TOKENS: &'static str = "TRIARAG_GENERATION_MAX_RESPONSE_TOKENS";
    const ENV_GENERATION_CONTEXT_TOKEN_BUDGET: &'static str = "TRIARAG_GENERATION_CONTEXT_TOKEN_BUDGET";
    const ENV_EVALUATOR_ENABLED: &'static str = "TRIARAG_EVALUATOR_ENABLED";
    const ENV_EVALUATOR_SAMPLE_RATE: &'static str = "TRIARAG_EVALUATOR_SAMPLE_RATE";
    const ENV_EVALUATOR_RELEVANCE_THRESHOLD: &'static str = "TRIARAG_EVALUATOR_RELEVANCE_THRESHOLD";
    const ENV_EVALUATOR_FAITHFULNESS_THRESHOLD: &'static str =
        "TRIARAG_EVALUATOR_FAITHFULNESS_THRESHOLD";
    const ENV_EVALUATOR_UTILIZATION_THRESHOLD: &'static str =
        "TRIARAG_EVALUATOR_UTILIZATION_THRESHOLD";

    /// Loads configuration from the environment, falling back to documented defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let storage_path = Self::parse_path_from_env(Self::ENV_STORAGE_PATH, defaults.storage_path);
        let local_model_path = Self::parse_optional_path_from_env(Self::ENV_LOCAL_MODEL_PATH);
        let qdrant_url = Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url);

        let top_k_default =
            Self::parse_usize_from_env(Self::ENV_TOP_K_DEFAULT, defaults.top_k_default);
        let semantic_cache_threshold = Self::parse_ratio_from_env(
            Self::ENV_SEMANTIC_CACHE_THRESHOLD,
            "semantic_cache_threshold",
            defaults.semantic_cache_threshold,
        )?;
        let semantic_cache_ttl_seconds = Self::parse_u64_from_env(
            Self::ENV_SEMANTIC_CACHE_TTL_SECONDS,
            defaults.semantic_cache_ttl_seconds,
        );
        let semantic_cache_capacity = Self::parse_u64_from_env(
            Self::ENV_SEMANTIC_CACHE_CAPACITY,
            defaults.semantic_cache_capacity,
        );

        let web_search_mode = Self::parse_web_search_mode_from_env(defaults.web_search_mode)?;
        let web_search_max_results = Self::parse_usize_from_env(
            Self::ENV_WEB_SEARCH_MAX_RESULTS,
            defaults.web_search_max_results,
        );
        let web_search_trusted_domain_suffixes =
            Self::parse_list_from_env(Self::ENV_WEB_SEARCH_TRUSTED_DOMAIN_SUFFIXES);
        let web_search_blocked_domains =
            Self::parse_list_from_env(Self::ENV_WEB_SEARCH_BLOCKED_DOMAINS);
        let web_search_max_queries_per_minute = Self::parse_u32_from_env(
            Self::ENV_WEB_SEARCH_MAX_QUERIES_PER_MINUTE,
            defaults.web_search_max_queries_per_minute,
        );

        let web_kb_ttl_days =
            Self::parse_i64_from_env(Self::ENV_WEB_KB_TTL_DAYS, defaults.web_kb_ttl_days);
        let web_kb_min_trust_score = Self::parse_ratio_from_env(
            Self::ENV_WEB_KB_MIN_TRUST_SCORE,
            "web_kb_min_trust_score",
            defaults.web_kb_min_trust_score,
        )?;

        let rrf_k = Self::parse_u32_from_env(Self::ENV_RRF_K, defaults.rrf_k);
        let tier_weights = Self::parse_tier_weights_from_env(defaults.tier_weights);

        let per_tier_timeout_ms =
            Self::parse_u64_from_env(Self::ENV_PER_TIER_TIMEOUT_MS, defaults.per_tier_timeout_ms);
        let query_timeout_ms =
            Self::parse_u64_from_env(Self::ENV_QUERY_TIMEOUT_MS, defaults.query_timeout_ms);

        let default_premium_embedder = env::var(Self::ENV_DEFAULT_PREMIUM_EMBEDDER)
            .ok()
            .filter(|v| !v.trim().is_empty());
        let calibration_matrix_dir = Self::parse_path_from_env(
            Self::ENV_CALIBRATION_MATRIX_DIR,
            defaults.calibration_matrix_dir,
        );

        let generation_model =
            Self::parse_string_from_env(Self::ENV_GENERATION_MODEL, defaults.generation_model);
        let generation_temperature = Self::parse_ratio_from_env(
            Self::ENV_GENERATION_TEMPERATURE,
            "generation_temperature",
            defaults.generation_temperature,
        )?;
        let generation_max_response_tokens = Self::parse_u32_from_env(
            Self::ENV_GENERATION_MAX_RESPONSE_TOKENS,
            defaults.generation_max_response_tokens,
        );
        let generation_context_token_budget = Self::parse_usize_from_env(
            Self::ENV_GENERATION_CONTEXT_TOKEN_BUDGET,
            defaults.generation_context_token_budget,
        );
        let evaluator_enabled = env::var(Self::ENV_EVALUATOR_ENABLED)
            .ok()
            .map(|v| v != "false" && v != "0")
            .unwrap_or(defaults.evaluator_enabled);
        let evaluator_sample_rate = Self::parse_ratio_from_env(
            Self::ENV_EVALUATOR_SAMPLE_RATE,
            "evaluator_sample_rate",
            defaults.evaluator_sample_rate,
        )?;
        let evaluator_relevance_threshold = Self::parse_ratio_from_env(
            Self::ENV_EVALUATOR_RELEVANCE_THRESHOLD,
            "evaluator_relevance_threshold",
            defaults.evaluator_relevance_threshold,
        )?;
        let evaluator_faithfulness_threshold = Self::parse_ratio_from_env(
            Self::ENV_EVALUATOR_FAITHFULNESS_THRESHOLD,
            "evaluator_faithfulness_threshold",
            defaults.evaluator_faithfulness_threshold,
        )?;
        let evaluator_utilization_threshold = Self::parse_ratio_from_env(
            Self::ENV_EVALUATOR_UTILIZATION_THRESHOLD,
            "evaluator_utilization_threshold",
            defaults.evaluator_utilization_threshold,
        )?;

        Ok(Self {
            port,
            bind_addr,
            storage_path,
            local_model_path,
            qdrant_url,
            top_k_default,
            semantic_cache_threshold,
            semantic_cache_ttl_seconds,
            semantic_cache_capacity,
            web_search_mode,
            web_search_max_results,
            web_search_trusted_domain_suffixes,
            web_search_blocked_domains,
            web_search_max_queries_per_minute,
            web_kb_ttl_days,
            web_kb_min_trust_score,
            rrf_k,
            tier_weights,
            per_tier_timeout_ms,
            query_timeout_ms,
            default_premium_embedder,
            calibration_matrix_dir,
            generation_model,
            generation_temperature,
            generation_max_response_tokens,
            generation_context_token_budget,
            evaluator_enabled,
            evaluator_sample_rate,
            evaluator_relevance_threshold,
            evaluator_faithfulness_threshold,
            evaluator_utilization_threshold,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_path.exists() && !self.storage_path.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.storage_path.clone(),
            });
        }

        if let Some(ref path) = self.local_model_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        if !(0.0..=1.0).contains(&self.semantic_cache_threshold) {
            return Err(ConfigError::OutOfRange {
                name: "semantic_cache_threshold",
                range: "(0, 1]",
                value: self.semantic_cache_threshold as f64,
            });
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Deterministic path for a premium embedder's calibration matrix, per §6.3's filename
    /// requirement that it encode `premium_name`.
    pub fn calibration_matrix_path_for(&self, premium_name: &str) -> PathBuf {
        self.calibration_matrix_dir
            .join(format!("calibration_{premium_name}.bin"))
    }

    /// Overlays a loaded configuration profile (e.g. parsed from a JSON file supplied at
    /// startup), rejecting unknown keys outright rather than silently ignoring them, unlike
    /// environment variables which are best-effort.
    pub fn merge_profile(
        &mut self,
        profile: &HashMap<String, serde_json::Value>,
    ) -> Result<(), ConfigError> {
        let known = Self::known_profile_keys();
        for key in profile.keys() {
            if !known.contains(&key.as_str()) {
                return Err(ConfigError::UnknownProfileKey { key: key.clone() });
            }
        }
        if let Some(v) = profile.get("top_k_default").and_then(|v| v.as_u64()) {
            self.top_k_default = v as usize;
        }
        if let Some(v) = profile.get("semantic_cache_threshold").and_then(|v| v.as_f64()) {
            self.semantic_cache_threshold = v as f32;
        }
        if let Some(v) = profile.get("semantic_cache_ttl_seconds").and_then(|v| v.as_u64()) {
            self.semantic_cache_ttl_seconds = v;
        }
        if let Some(v) = profile.get("web_search_mode").and_then(|v| v.as_str()) {
            self.web_search_mode = match v {
                "off" => WebSearchMode::Off,
                "parallel" => WebSearchMode::Parallel,
                "on_low_confidence" => WebSearchMode::OnLowConfidence,
                other => {
                    return Err(ConfigError::InvalidEnumValue {
                        name: "web_search_mode",
                        value: other.to_string(),
                    });
                }
            };
        }
        if let Some(v) = profile.get("web_search_max_results").and_then(|v| v.as_u64()) {
            self.web_search_max_results = v as usize;
        }
        if let Some(v) = profile.get("web_search_trusted_domain_suffixes").and_then(|v| v.as_array()) {
            self.web_search_trusted_domain_suffixes =
                v.iter().filter_map(|item| item.as_str().map(str::to_string)).collect();
        }
        if let Some(v) = profile.get("web_search_blocked_domains").and_then(|v| v.as_array()) {
            self.web_search_blocked_domains =
                v.iter().filter_map(|item| item.as_str().map(str::to_string)).collect();
        }
        if let Some(v) = profile.get("web_search_max_queries_per_minute").and_then(|v| v.as_u64()) {
            self.web_search_max_queries_per_minute = v as u32;
        }
        if let Some(v) = profile.get("web_kb_ttl_days").and_then(|v| v.as_i64()) {
            self.web_kb_ttl_days = v;
        }
        if let Some(v) = profile.get("web_kb_min_trust_score").and_then(|v| v.as_f64()) {
            self.web_kb_min_trust_score = v as f32;
        }
        if let Some(v) = profile.get("rrf_k").and_then(|v| v.as_u64()) {
            self.rrf_k = v as u32;
        }
        if let Some(v) = profile.get("tier_weights").and_then(|v| v.as_array()) {
            let parts: Vec<f32> = v.iter().filter_map(|item| item.as_f64()).map(|f| f as f32).collect();
            if parts.len() == 3 {
                self.tier_weights = (parts[0], parts[1], parts[2]);
            }
        }
        if let Some(v) = profile.get("per_tier_timeout_ms").and_then(|v| v.as_u64()) {
            self.per_tier_timeout_ms = v;
        }
        if let Some(v) = profile.get("query_timeout_ms").and_then(|v| v.as_u64()) {
            self.query_timeout_ms = v;
        }
        if let Some(v) = profile.get("default_premium_embedder") {
            self.default_premium_embedder = v.as_str().map(str::to_string);
        }
        if let Some(v) = profile.get("generation_model").and_then(|v| v.as_str()) {
            self.generation_model = v.to_string();
        }
        if let Some(v) = profile.get("generation_temperature").and_then(|v| v.as_f64()) {
            self.generation_temperature = v as f32;
        }
        if let Some(v) = profile.get("generation_max_response_tokens").and_then(|v| v.as_u64()) {
            self.generation_max_response_tokens = v as u32;
        }
        if let Some(v) = profile.get("generation_context_token_budget").and_then(|v| v.as_u64()) {
            self.generation_context_token_budget = v as usize;
        }
        if let Some(v) = profile.get("evaluator_enabled").and_then(|v| v.as_bool()) {
            self.evaluator_enabled = v;
        }
        if let Some(v) = profile.get("evaluator_sample_rate").and_then(|v| v.as_f64()) {
            self.evaluator_sample_rate = v as f32;
        }
        if let Some(v) = profile.get("evaluator_relevance_threshold").and_then(|v| v.as_f64()) {
            self.evaluator_relevance_threshold = v as f32;
        }
        if let Some(v) = profile.get("evaluator_faithfulness_threshold").and_then(|v| v.as_f64()) {
            self.evaluator_faithfulness_threshold = v as f32;
        }
        if let Some(v) = profile.get("evaluator_utilization_threshold").and_then(|v| v.as_f64()) {
            self.evaluator_utilization_threshold = v as f32;
        }
        Ok(())
    }

    fn known_profile_keys() -> &'static [&'static str] {
        &[
            "top_k_default",
            "semantic_cache_threshold",
            "semantic_cache_ttl_seconds",
            "web_search_mode",
            "web_search_max_results",
            "web_search_trusted_domain_suffixes",
            "web_search_blocked_domains",
            "web_search_max_queries_per_minute",
            "web_kb_ttl_days",
            "web_kb_min_trust_score",
            "rrf_k",
            "tier_weights",
            "per_tier_timeout_ms",
            "query_timeout_ms",
            "default_premium_embedder",
            "generation_model",
            "generation_temperature",
            "generation_max_response_tokens",
            "generation_context_token_budget",
            "evaluator_enabled",
            "evaluator_sample_rate",
            "evaluator_relevance_threshold",
            "evaluator_faithfulness_threshold",
            "evaluator_utilization_threshold",
        ]
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_web_search_mode_from_env(default: WebSearchMode) -> Result<WebSearchMode, ConfigError> {
        match env::var(Self::ENV_WEB_SEARCH_MODE) {
            Ok(value) => match value.as_str() {
                "off" => Ok(WebSearchMode::Off),
                "parallel" => Ok(WebSearchMode::Parallel),
                "on_low_confidence" => Ok(WebSearchMode::OnLowConfidence),
                other => Err(ConfigError::InvalidEnumValue {
                    name: "web_search_mode",
                    value: other.to_string(),
                }),
            },
            Err(_) => Ok(default),
        }
    }

    fn parse_tier_weights_from_env(default: (f32, f32, f32)) -> (f32, f32, f32) {
        match env::var(Self::ENV_TIER_WEIGHTS) {
            Ok(value) => {
                let parts: Vec<f32> = value.split(',').filter_map(|p| p.trim().parse().ok()).collect();
                if parts.len() == 3 {
                    (parts[0], parts[1], parts[2])
                } else {
                    default
                }
            }
            Err(_) => default,
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_list_from_env(var_name: &str) -> Vec<String> {
        env::var(var_name)
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn parse_u32_from_env(var_name: &str, default: u32) -> u32 {
        env::var(var_name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn parse_i64_from_env(var_name: &str, default: i64) -> i64 {
        env::var(var_name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn parse_usize_from_env(var_name: &str, default: usize) -> usize {
        env::var(var_name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn parse_ratio_from_env(var_name: &str, name: &'static str, default: f32) -> Result<f32, ConfigError> {
        match env::var(var_name) {
            Ok(value) => {
                let parsed: f32 = value.parse().map_err(|_| ConfigError::InvalidEnumValue {
                    name,
                    value: value.clone(),
                })?;
                if !(0.0..=1.0).contains(&parsed) {
                    return Err(ConfigError::OutOfRange {
                        name,
                        range: "(0, 1]",
                        value: parsed as f64,
                    });
                }
                Ok(parsed)
            }
            Err(_) => Ok(default),
        }
    }
}
