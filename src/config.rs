use std::time::Duration;

/// Hard upper bound on ideas requested per exploration.
pub const MAX_IDEAS: usize = 10;

/// Clamp a requested idea count into `1..=MAX_IDEAS`.
pub fn clamp_idea_count(count: usize) -> usize {
    count.clamp(1, MAX_IDEAS)
}

/// Configuration for the Gemini REST client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API base URL (default: "https://generativelanguage.googleapis.com")
    pub endpoint: String,
    /// API key sent as `x-goog-api-key`
    pub api_key: String,
    /// Model used for structured analysis (default: "gemini-2.5-pro")
    pub analysis_model: String,
    /// Model used for idea exploration (default: "gemini-2.5-flash")
    pub idea_model: String,
    /// Image-output model (default: "gemini-2.5-flash-image")
    pub image_model: String,
    /// Per-request timeout (default: 120s)
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            api_key: String::new(),
            analysis_model: "gemini-2.5-pro".to_string(),
            idea_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl GeminiConfig {
    /// Create a config with the given API key and default models.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Read `GEMINI_API_KEY` (or `API_KEY`) and an optional `GEMINI_ENDPOINT`.
    ///
    /// Returns `None` when no key is set.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let mut config = Self::new(key);
        if let Ok(endpoint) = std::env::var("GEMINI_ENDPOINT") {
            config = config.endpoint(endpoint);
        }
        Some(config)
    }

    /// Set the API base URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn analysis_model(mut self, model: impl Into<String>) -> Self {
        self.analysis_model = model.into();
        self
    }

    pub fn idea_model(mut self, model: impl Into<String>) -> Self {
        self.idea_model = model.into();
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Limits and defaults for explorer sessions.
///
/// Use [`ExplorerConfig::builder()`] or [`ExplorerConfig::default()`]
/// (5 ideas per exploration, auto-explore depth 2, at most depth 5).
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Ideas requested when the caller does not say otherwise.
    pub default_ideas: usize,
    /// Upper bound for any idea request (never above [`MAX_IDEAS`]).
    pub max_ideas: usize,
    /// Auto-explore depth when the caller does not say otherwise.
    pub default_depth: usize,
    /// Upper bound for auto-explore depth.
    pub max_depth: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            default_ideas: 5,
            max_ideas: MAX_IDEAS,
            default_depth: 2,
            max_depth: 5,
        }
    }
}

impl ExplorerConfig {
    pub fn builder() -> ExplorerConfigBuilder {
        ExplorerConfigBuilder::default()
    }

    /// Clamp an idea count into `1..=max_ideas`.
    pub fn idea_count(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_ideas.clamp(1, MAX_IDEAS))
    }

    /// Clamp a depth to `max_depth`. Zero stays zero.
    pub fn depth(&self, requested: usize) -> usize {
        requested.min(self.max_depth)
    }
}

/// Builder for [`ExplorerConfig`].
#[derive(Default)]
pub struct ExplorerConfigBuilder {
    config: ExplorerConfig,
}

impl ExplorerConfigBuilder {
    pub fn with_default_ideas(mut self, count: usize) -> Self {
        self.config.default_ideas = count;
        self
    }

    pub fn with_max_ideas(mut self, count: usize) -> Self {
        self.config.max_ideas = count;
        self
    }

    pub fn with_default_depth(mut self, depth: usize) -> Self {
        self.config.default_depth = depth;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    pub fn build(self) -> ExplorerConfig {
        self.config
    }
}
