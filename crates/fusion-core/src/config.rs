//! Configuration types for hybrid result fusion.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FusionError, Result};

/// Tolerance for `semantic_weight + keyword_weight == 1.0`.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// How per-source scores are combined into one ranking signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FusionMethod {
    /// Weighted sum of normalized keyword and semantic scores.
    #[default]
    #[serde(rename = "weighted")]
    Weighted,

    /// Reciprocal Rank Fusion over provider order.
    #[serde(rename = "rrf", alias = "reciprocal_rank_fusion")]
    ReciprocalRankFusion,
}

impl std::fmt::Display for FusionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Weighted => "weighted",
            Self::ReciprocalRankFusion => "rrf",
        };
        write!(f, "{}", s)
    }
}

/// Normalization applied to raw scores before weighted fusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalizeMethod {
    /// Linear rescale by observed min and max.
    #[default]
    #[serde(rename = "minmax")]
    MinMax,

    /// Population z-score squashed through the logistic function.
    #[serde(rename = "zscore_sigmoid", alias = "standard")]
    ZScoreSigmoid,
}

impl std::fmt::Display for NormalizeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MinMax => "minmax",
            Self::ZScoreSigmoid => "zscore_sigmoid",
        };
        write!(f, "{}", s)
    }
}

/// Which source's attributes win when an id is found in both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributePrecedence {
    /// Vector-source fields overwrite keyword-source fields.
    #[default]
    Semantic,

    /// Keyword-source fields overwrite vector-source fields.
    Keyword,
}

/// Validated, immutable fusion configuration.
///
/// Obtained from [`FusionConfig::default`], [`FusionConfig::builder`] or
/// deserialization. Every path runs the same validation, so a value of this
/// type always satisfies its invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FusionSettings", into = "FusionSettings")]
pub struct FusionConfig {
    semantic_weight: f64,
    keyword_weight: f64,
    method: FusionMethod,
    rrf_k: u32,
    normalize_method: NormalizeMethod,
    min_score_threshold: f64,
    max_results: Option<usize>,
    attribute_precedence: AttributePrecedence,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.7,
            keyword_weight: 0.3,
            method: FusionMethod::Weighted,
            rrf_k: 60,
            normalize_method: NormalizeMethod::MinMax,
            min_score_threshold: 0.0,
            max_results: None,
            attribute_precedence: AttributePrecedence::Semantic,
        }
    }
}

impl FusionConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> FusionConfigBuilder {
        FusionConfigBuilder::default()
    }

    /// Start building a configuration from this one.
    pub fn to_builder(&self) -> FusionConfigBuilder {
        FusionConfigBuilder {
            settings: FusionSettings::from(self.clone()),
        }
    }

    /// Weight for normalized semantic scores.
    pub fn semantic_weight(&self) -> f64 {
        self.semantic_weight
    }

    /// Weight for normalized keyword scores.
    pub fn keyword_weight(&self) -> f64 {
        self.keyword_weight
    }

    /// Fusion method.
    pub fn method(&self) -> FusionMethod {
        self.method
    }

    /// RRF rank-damping constant.
    pub fn rrf_k(&self) -> u32 {
        self.rrf_k
    }

    /// Normalization used by weighted fusion.
    pub fn normalize_method(&self) -> NormalizeMethod {
        self.normalize_method
    }

    /// Inclusion floor for weighted fusion. Not applied to RRF.
    pub fn min_score_threshold(&self) -> f64 {
        self.min_score_threshold
    }

    /// Result cap. `Some(0)` is reported as `None` (no cap).
    pub fn max_results(&self) -> Option<usize> {
        self.max_results.filter(|&n| n > 0)
    }

    /// Attribute merge precedence.
    pub fn attribute_precedence(&self) -> AttributePrecedence {
        self.attribute_precedence
    }
}

/// Unvalidated fusion settings, as written in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionSettings {
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,

    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    #[serde(default)]
    pub method: FusionMethod,

    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,

    #[serde(default)]
    pub normalize_method: NormalizeMethod,

    #[serde(default)]
    pub min_score_threshold: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,

    #[serde(default)]
    pub attribute_precedence: AttributePrecedence,
}

impl Default for FusionSettings {
    fn default() -> Self {
        FusionConfig::default().into()
    }
}

impl From<FusionConfig> for FusionSettings {
    fn from(config: FusionConfig) -> Self {
        Self {
            semantic_weight: config.semantic_weight,
            keyword_weight: config.keyword_weight,
            method: config.method,
            rrf_k: config.rrf_k,
            normalize_method: config.normalize_method,
            min_score_threshold: config.min_score_threshold,
            max_results: config.max_results,
            attribute_precedence: config.attribute_precedence,
        }
    }
}

impl TryFrom<FusionSettings> for FusionConfig {
    type Error = FusionError;

    fn try_from(settings: FusionSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            semantic_weight: settings.semantic_weight,
            keyword_weight: settings.keyword_weight,
            method: settings.method,
            rrf_k: settings.rrf_k,
            normalize_method: settings.normalize_method,
            min_score_threshold: settings.min_score_threshold,
            max_results: settings.max_results,
            attribute_precedence: settings.attribute_precedence,
        })
    }
}

impl FusionSettings {
    /// Check every invariant; the first violation is reported.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("semantic_weight", self.semantic_weight),
            ("keyword_weight", self.keyword_weight),
            ("min_score_threshold", self.min_score_threshold),
        ] {
            if !value.is_finite() {
                return Err(FusionError::config(format!("{} must be a finite number", name)));
            }
        }

        if !(0.0..=1.0).contains(&self.semantic_weight) {
            return Err(FusionError::config("semantic_weight must be between 0 and 1"));
        }
        if !(0.0..=1.0).contains(&self.keyword_weight) {
            return Err(FusionError::config("keyword_weight must be between 0 and 1"));
        }
        if ((self.semantic_weight + self.keyword_weight) - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(FusionError::config(format!(
                "semantic_weight + keyword_weight must equal 1.0 (got {} + {})",
                self.semantic_weight, self.keyword_weight
            )));
        }
        if self.rrf_k < 1 {
            return Err(FusionError::config("rrf_k must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.min_score_threshold) {
            return Err(FusionError::config("min_score_threshold must be between 0 and 1"));
        }

        Ok(())
    }
}

/// Builder for [`FusionConfig`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct FusionConfigBuilder {
    settings: FusionSettings,
}

impl FusionConfigBuilder {
    /// Set both weights explicitly.
    pub fn weights(mut self, semantic: f64, keyword: f64) -> Self {
        self.settings.semantic_weight = semantic;
        self.settings.keyword_weight = keyword;
        self
    }

    /// Set the semantic weight; the keyword weight becomes `1 - semantic`.
    pub fn semantic_weight(self, semantic: f64) -> Self {
        self.weights(semantic, 1.0 - semantic)
    }

    pub fn method(mut self, method: FusionMethod) -> Self {
        self.settings.method = method;
        self
    }

    pub fn rrf_k(mut self, k: u32) -> Self {
        self.settings.rrf_k = k;
        self
    }

    pub fn normalize_method(mut self, method: NormalizeMethod) -> Self {
        self.settings.normalize_method = method;
        self
    }

    pub fn min_score_threshold(mut self, threshold: f64) -> Self {
        self.settings.min_score_threshold = threshold;
        self
    }

    pub fn max_results(mut self, max_results: Option<usize>) -> Self {
        self.settings.max_results = max_results;
        self
    }

    pub fn attribute_precedence(mut self, precedence: AttributePrecedence) -> Self {
        self.settings.attribute_precedence = precedence;
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<FusionConfig> {
        FusionConfig::try_from(self.settings)
    }
}

/// Provider fan-out configuration for the search orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of results returned when the fusion config has no cap.
    /// Zero means uncapped, the same as `max_results = 0`.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Each provider is asked for `top_k * fetch_multiplier` results.
    #[serde(default = "default_fetch_multiplier")]
    pub fetch_multiplier: usize,

    /// Lower bound on the per-provider fetch size.
    #[serde(default = "default_min_fetch")]
    pub min_fetch: usize,

    /// Per-provider timeout in milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            fetch_multiplier: 2,
            min_fetch: 20,
            provider_timeout_ms: 5000,
        }
    }
}

impl SearchConfig {
    /// How many results to request from each provider.
    pub fn fetch_limit(&self) -> usize {
        self.top_k
            .saturating_mul(self.fetch_multiplier)
            .max(self.min_fetch)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridConfig {
    /// Fusion configuration.
    #[serde(default)]
    pub fusion: FusionConfig,

    /// Provider fan-out configuration.
    #[serde(default)]
    pub search: SearchConfig,
}

// Default value functions

fn default_semantic_weight() -> f64 {
    0.7
}

fn default_keyword_weight() -> f64 {
    0.3
}

fn default_rrf_k() -> u32 {
    60
}

fn default_top_k() -> usize {
    10
}

fn default_fetch_multiplier() -> usize {
    2
}

fn default_min_fetch() -> usize {
    20
}

fn default_provider_timeout_ms() -> u64 {
    5000
}

impl HybridConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FusionError::config(format!("Failed to parse config: {}", e)))
    }

    /// Render configuration as TOML text.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FusionError::config(format!("Failed to render config: {}", e)))
    }

    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("hybrid-fusion").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        let local_config = PathBuf::from("hybrid-fusion.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }
}
