//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use super::plan::PlanFormat;
use crate::error::AgentError;

/// Default model for both the planning and synthesis calls.
const DEFAULT_MODEL: &str = "gpt-4o";
/// Planning favors determinism.
const DEFAULT_PLANNER_TEMPERATURE: f32 = 0.05;
/// Plans are short: a tool declaration or a brief direct reply.
const DEFAULT_PLANNER_MAX_TOKENS: u32 = 300;
/// Synthesis allows more natural phrasing.
const DEFAULT_SYNTHESIZER_TEMPERATURE: f32 = 0.3;
/// Synthesized answers are full responses.
const DEFAULT_SYNTHESIZER_MAX_TOKENS: u32 = 700;
/// Default per-call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default number of document excerpts requested per search.
const DEFAULT_MAX_NUM_RESULTS: usize = 3;
/// Default subject name used in fixed user-facing messages.
const DEFAULT_SUBJECT: &str = "the candidate";
/// Excerpts scoring below this are treated as irrelevant.
const DEFAULT_SCORE_THRESHOLD: f64 = 0.3;

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider and the retrieval service.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Document collection identifiers searched by the retrieval tool.
    pub vector_store_ids: Vec<String>,
    /// Model for the planning call.
    pub planner_model: String,
    /// Model for the synthesis call.
    pub synthesizer_model: String,
    /// Sampling temperature for planning.
    pub planner_temperature: f32,
    /// Maximum tokens for the plan.
    pub planner_max_tokens: u32,
    /// Sampling temperature for synthesis.
    pub synthesizer_temperature: f32,
    /// Maximum tokens for the synthesized answer.
    pub synthesizer_max_tokens: u32,
    /// Maximum excerpts returned per document search.
    pub max_num_results: usize,
    /// Minimum relevance score (0.0-1.0) for a search hit to count.
    pub score_threshold: f64,
    /// Timeout applied to every remote call.
    pub timeout: Duration,
    /// Path to the persona/behavior instructions file.
    ///
    /// When unset, [`PromptSet::load`](super::prompt::PromptSet::load)
    /// falls back to the user config directory, then to the compiled-in
    /// default.
    pub instructions_path: Option<PathBuf>,
    /// Name of the person the assistant answers about.
    pub subject: String,
    /// How the planner signals a tool call.
    pub plan_format: PlanFormat,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Returns `true` if at least one document collection is configured.
    #[must_use]
    pub fn has_document_collection(&self) -> bool {
        self.vector_store_ids.iter().any(|id| !id.trim().is_empty())
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    vector_store_ids: Option<Vec<String>>,
    planner_model: Option<String>,
    synthesizer_model: Option<String>,
    planner_temperature: Option<f32>,
    planner_max_tokens: Option<u32>,
    synthesizer_temperature: Option<f32>,
    synthesizer_max_tokens: Option<u32>,
    max_num_results: Option<usize>,
    score_threshold: Option<f64>,
    timeout: Option<Duration>,
    instructions_path: Option<PathBuf>,
    subject: Option<String>,
    plan_format: Option<PlanFormat>,
    /// Unparsed `PROFILE_AGENT_PLAN_FORMAT`, validated in `build`.
    plan_format_env: Option<String>,
}

/// Splits a comma-separated list, dropping empty entries.
fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(self) -> Self {
        self.from_vars(|key| std::env::var(key).ok())
    }

    /// Populates unset fields from `var`, a lookup by variable name.
    #[must_use]
    pub fn from_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if self.provider.is_none() {
            self.provider = var("PROFILE_AGENT_PROVIDER");
        }
        if self.api_key.is_none() {
            self.api_key = var("OPENAI_API_KEY")
                .filter(|k| !k.is_empty())
                .or_else(|| var("PROFILE_AGENT_API_KEY"))
                .filter(|k| !k.is_empty());
        }
        if self.base_url.is_none() {
            self.base_url = var("OPENAI_BASE_URL");
        }
        if self.vector_store_ids.is_none() {
            self.vector_store_ids = var("VECTOR_STORE_ID")
                .map(|v| split_ids(&v))
                .filter(|ids| !ids.is_empty());
        }
        if self.planner_model.is_none() {
            self.planner_model = var("PROFILE_AGENT_PLANNER_MODEL");
        }
        if self.synthesizer_model.is_none() {
            self.synthesizer_model = var("PROFILE_AGENT_SYNTHESIZER_MODEL");
        }
        if self.timeout.is_none() {
            self.timeout = var("PROFILE_AGENT_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.score_threshold.is_none() {
            self.score_threshold = var("PROFILE_AGENT_SCORE_THRESHOLD").and_then(|v| v.parse().ok());
        }
        if self.instructions_path.is_none() {
            self.instructions_path = var("PROFILE_AGENT_INSTRUCTIONS").map(PathBuf::from);
        }
        if self.subject.is_none() {
            self.subject = var("PROFILE_AGENT_SUBJECT");
        }
        if self.plan_format.is_none() {
            self.plan_format_env = var("PROFILE_AGENT_PLAN_FORMAT");
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the document collection identifiers.
    #[must_use]
    pub fn vector_store_ids(mut self, ids: Vec<String>) -> Self {
        self.vector_store_ids = Some(ids);
        self
    }

    /// Sets the planning model.
    #[must_use]
    pub fn planner_model(mut self, model: impl Into<String>) -> Self {
        self.planner_model = Some(model.into());
        self
    }

    /// Sets the synthesis model.
    #[must_use]
    pub fn synthesizer_model(mut self, model: impl Into<String>) -> Self {
        self.synthesizer_model = Some(model.into());
        self
    }

    /// Sets the planning temperature.
    #[must_use]
    pub const fn planner_temperature(mut self, t: f32) -> Self {
        self.planner_temperature = Some(t);
        self
    }

    /// Sets the planning max tokens.
    #[must_use]
    pub const fn planner_max_tokens(mut self, n: u32) -> Self {
        self.planner_max_tokens = Some(n);
        self
    }

    /// Sets the synthesis temperature.
    #[must_use]
    pub const fn synthesizer_temperature(mut self, t: f32) -> Self {
        self.synthesizer_temperature = Some(t);
        self
    }

    /// Sets the synthesis max tokens.
    #[must_use]
    pub const fn synthesizer_max_tokens(mut self, n: u32) -> Self {
        self.synthesizer_max_tokens = Some(n);
        self
    }

    /// Sets the number of excerpts requested per search.
    #[must_use]
    pub const fn max_num_results(mut self, n: usize) -> Self {
        self.max_num_results = Some(n);
        self
    }

    /// Sets the minimum relevance score for search hits.
    #[must_use]
    pub const fn score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the persona instructions file.
    #[must_use]
    pub fn instructions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.instructions_path = Some(path.into());
        self
    }

    /// Sets the subject name.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the plan format.
    #[must_use]
    pub const fn plan_format(mut self, format: PlanFormat) -> Self {
        self.plan_format = Some(format);
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set, or
    /// [`AgentError::Configuration`] if the timeout is zero, the score
    /// threshold is outside 0.0-1.0, or the plan format is unknown.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if timeout.is_zero() {
            return Err(AgentError::Configuration {
                message: "timeout must be greater than zero".to_string(),
            });
        }

        let score_threshold = self.score_threshold.unwrap_or(DEFAULT_SCORE_THRESHOLD);
        if !(0.0..=1.0).contains(&score_threshold) {
            return Err(AgentError::Configuration {
                message: format!("score threshold must be within 0.0-1.0, got {score_threshold}"),
            });
        }

        let plan_format = match (self.plan_format, self.plan_format_env) {
            (Some(format), _) => format,
            (None, Some(raw)) => raw.parse()?,
            (None, None) => PlanFormat::default(),
        };

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            vector_store_ids: self.vector_store_ids.unwrap_or_default(),
            planner_model: self
                .planner_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            synthesizer_model: self
                .synthesizer_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            planner_temperature: self
                .planner_temperature
                .unwrap_or(DEFAULT_PLANNER_TEMPERATURE),
            planner_max_tokens: self
                .planner_max_tokens
                .unwrap_or(DEFAULT_PLANNER_MAX_TOKENS),
            synthesizer_temperature: self
                .synthesizer_temperature
                .unwrap_or(DEFAULT_SYNTHESIZER_TEMPERATURE),
            synthesizer_max_tokens: self
                .synthesizer_max_tokens
                .unwrap_or(DEFAULT_SYNTHESIZER_MAX_TOKENS),
            max_num_results: self
                .max_num_results
                .unwrap_or(DEFAULT_MAX_NUM_RESULTS)
                .max(1),
            score_threshold,
            timeout,
            instructions_path: self.instructions_path,
            subject: self
                .subject
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            plan_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.planner_model, DEFAULT_MODEL);
        assert_eq!(config.planner_max_tokens, 300);
        assert_eq!(config.synthesizer_max_tokens, 700);
        assert!(config.planner_temperature < config.synthesizer_temperature);
        assert_eq!(config.max_num_results, DEFAULT_MAX_NUM_RESULTS);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.subject, DEFAULT_SUBJECT);
        assert_eq!(config.plan_format, PlanFormat::Marker);
        assert!((config.score_threshold - DEFAULT_SCORE_THRESHOLD).abs() < f64::EPSILON);
        assert!(!config.has_document_collection());
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let result = AgentConfig::builder()
            .api_key("k")
            .timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(AgentError::Configuration { .. })));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .vector_store_ids(vec!["vs_123".to_string()])
            .planner_model("gpt-4o-mini")
            .synthesizer_max_tokens(1024)
            .timeout(Duration::from_secs(30))
            .subject("Minaya")
            .plan_format(PlanFormat::Structured)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.planner_model, "gpt-4o-mini");
        assert_eq!(config.synthesizer_model, DEFAULT_MODEL);
        assert_eq!(config.synthesizer_max_tokens, 1024);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.subject, "Minaya");
        assert_eq!(config.plan_format, PlanFormat::Structured);
        assert!(config.has_document_collection());
    }

    #[test]
    fn test_blank_collection_id_is_not_a_collection() {
        let config = AgentConfig::builder()
            .api_key("key")
            .vector_store_ids(vec!["  ".to_string()])
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(!config.has_document_collection());
    }

    fn vars(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|v| (*v).to_string())
    }

    #[test]
    fn test_from_vars_reads_environment_names() {
        let config = AgentConfig::builder()
            .from_vars(vars(&[
                ("OPENAI_API_KEY", "sk-env"),
                ("VECTOR_STORE_ID", "vs_a,vs_b"),
                ("PROFILE_AGENT_SUBJECT", "Minaya"),
                ("PROFILE_AGENT_SCORE_THRESHOLD", "0.5"),
                ("PROFILE_AGENT_PLAN_FORMAT", "structured"),
            ]))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.api_key, "sk-env");
        assert_eq!(config.vector_store_ids, vec!["vs_a", "vs_b"]);
        assert_eq!(config.subject, "Minaya");
        assert!((config.score_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.plan_format, PlanFormat::Structured);
    }

    #[test]
    fn test_explicit_values_win_over_environment() {
        let config = AgentConfig::builder()
            .api_key("sk-explicit")
            .plan_format(PlanFormat::Marker)
            .from_vars(vars(&[
                ("OPENAI_API_KEY", "sk-env"),
                ("PROFILE_AGENT_PLAN_FORMAT", "xml"),
            ]))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.api_key, "sk-explicit");
        assert_eq!(config.plan_format, PlanFormat::Marker);
    }

    #[test]
    fn test_unknown_plan_format_in_environment_is_error() {
        let result = AgentConfig::builder()
            .from_vars(vars(&[
                ("OPENAI_API_KEY", "sk-env"),
                ("PROFILE_AGENT_PLAN_FORMAT", "xml"),
            ]))
            .build();
        assert!(matches!(
            result,
            Err(AgentError::Configuration { ref message }) if message.contains("xml")
        ));
    }

    #[test]
    fn test_score_threshold_out_of_range_is_error() {
        let result = AgentConfig::builder()
            .api_key("k")
            .score_threshold(1.5)
            .build();
        assert!(matches!(result, Err(AgentError::Configuration { .. })));
    }

    #[test]
    fn test_split_ids() {
        assert_eq!(split_ids("vs_a, vs_b,,"), vec!["vs_a", "vs_b"]);
        assert!(split_ids(" , ").is_empty());
    }
}
