//! Matcher configuration and strategy factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gradescan_core::engine::AnalysisConfig;
use gradescan_core::traits::RubricMatcher;

use crate::keyword::KeywordMatcher;
use crate::semantic::SemanticMatcher;

/// Configuration for the rubric-matching strategy.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure
/// in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MatcherSettings {
    /// AI-backed matcher talking to an inference service over HTTP.
    Semantic {
        #[serde(default = "default_endpoint")]
        endpoint: String,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Deterministic keyword scanning, no network.
    Keyword,
}

impl std::fmt::Debug for MatcherSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatcherSettings::Semantic {
                api_key,
                endpoint,
                model,
                timeout_secs,
            } => f
                .debug_struct("Semantic")
                .field("endpoint", endpoint)
                .field("model", model)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
            MatcherSettings::Keyword => f.debug_struct("Keyword").finish(),
        }
    }
}

impl Default for MatcherSettings {
    fn default() -> Self {
        MatcherSettings::Semantic {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.1:8b".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("./gradescan-results")
}

/// Top-level gradescan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradescanConfig {
    /// Matching strategy settings.
    #[serde(default)]
    pub matcher: MatcherSettings,
    /// Engine thresholds and switches.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Directory for persisted sheet results.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

impl Default for GradescanConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherSettings::default(),
            analysis: AnalysisConfig::default(),
            results_dir: default_results_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in the matcher settings.
fn resolve_matcher_settings(settings: &MatcherSettings) -> MatcherSettings {
    match settings {
        MatcherSettings::Semantic {
            endpoint,
            model,
            api_key,
            timeout_secs,
        } => MatcherSettings::Semantic {
            endpoint: resolve_env_vars(endpoint),
            model: resolve_env_vars(model),
            api_key: api_key.as_ref().map(|k| resolve_env_vars(k)),
            timeout_secs: *timeout_secs,
        },
        MatcherSettings::Keyword => MatcherSettings::Keyword,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `gradescan.toml` in the current directory
/// 2. `~/.config/gradescan/config.toml`
///
/// Environment variable override: `GRADESCAN_API_KEY` supplies the semantic
/// matcher's API key.
pub fn load_config() -> Result<GradescanConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<GradescanConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("gradescan.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<GradescanConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => GradescanConfig::default(),
    };

    // Env var override for the API key
    if let Ok(key) = std::env::var("GRADESCAN_API_KEY") {
        if let MatcherSettings::Semantic { api_key, .. } = &mut config.matcher {
            *api_key = Some(key);
        }
    }

    config.matcher = resolve_matcher_settings(&config.matcher);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("gradescan"))
}

/// Create the matching strategy an analysis run should use.
///
/// With AI analysis disabled the keyword strategy is used regardless of the
/// configured kind. The semantic strategy requires a non-empty endpoint.
pub fn create_matcher(config: &GradescanConfig) -> Result<Arc<dyn RubricMatcher>> {
    if !config.analysis.enable_ai_analysis {
        return Ok(Arc::new(keyword_matcher(config)));
    }

    match &config.matcher {
        MatcherSettings::Semantic {
            endpoint,
            model,
            api_key,
            timeout_secs,
        } => {
            if endpoint.trim().is_empty() {
                anyhow::bail!("semantic matcher requires an endpoint");
            }
            let mut matcher = SemanticMatcher::new(endpoint, model)
                .with_timeout(Duration::from_secs(*timeout_secs))
                .with_confidence_threshold(config.analysis.confidence_threshold);
            // An unresolved ${VAR} placeholder leaves an empty key; treat
            // that as no auth rather than sending a blank bearer token.
            if let Some(key) = api_key {
                if !key.is_empty() {
                    matcher = matcher.with_api_key(key);
                }
            }
            Ok(Arc::new(matcher))
        }
        MatcherSettings::Keyword => Ok(Arc::new(keyword_matcher(config))),
    }
}

/// Create the keyword fallback matcher with the run's threshold.
pub fn create_fallback(config: &GradescanConfig) -> Arc<dyn RubricMatcher> {
    Arc::new(keyword_matcher(config))
}

fn keyword_matcher(config: &GradescanConfig) -> KeywordMatcher {
    KeywordMatcher::new().with_confidence_threshold(config.analysis.confidence_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_GRADESCAN_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_GRADESCAN_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_GRADESCAN_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_GRADESCAN_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = GradescanConfig::default();
        assert!((config.analysis.confidence_threshold - 0.7).abs() < f64::EPSILON);
        assert!(config.analysis.enable_ai_analysis);
        match config.matcher {
            MatcherSettings::Semantic { endpoint, timeout_secs, .. } => {
                assert_eq!(endpoint, "http://localhost:11434");
                assert_eq!(timeout_secs, 30);
            }
            MatcherSettings::Keyword => panic!("default matcher should be semantic"),
        }
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
results_dir = "/tmp/results"

[matcher]
kind = "semantic"
endpoint = "http://inference:11434"
model = "llama3.1:70b"
api_key = "sk-test"
timeout_secs = 60

[analysis]
confidence_threshold = 0.8
fallback_on_error = true
"#;
        let config: GradescanConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.results_dir, PathBuf::from("/tmp/results"));
        assert!((config.analysis.confidence_threshold - 0.8).abs() < f64::EPSILON);
        assert!(config.analysis.fallback_on_error);
        // Unlisted analysis switches keep their defaults.
        assert_eq!(config.analysis.max_questions_per_sheet, 20);
        assert!(matches!(
            config.matcher,
            MatcherSettings::Semantic { .. }
        ));
    }

    #[test]
    fn parse_keyword_matcher() {
        let toml_str = r#"
[matcher]
kind = "keyword"
"#;
        let config: GradescanConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(config.matcher, MatcherSettings::Keyword));
    }

    #[test]
    fn debug_masks_api_key() {
        let settings = MatcherSettings::Semantic {
            endpoint: "http://localhost:11434".into(),
            model: "llama3.1:8b".into(),
            api_key: Some("sk-very-secret".into()),
            timeout_secs: 30,
        };
        let debugged = format!("{settings:?}");
        assert!(!debugged.contains("sk-very-secret"));
        assert!(debugged.contains("***"));
    }

    #[test]
    fn factory_uses_keyword_when_ai_disabled() {
        let config = GradescanConfig {
            analysis: AnalysisConfig {
                enable_ai_analysis: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let matcher = create_matcher(&config).unwrap();
        assert_eq!(matcher.name(), "keyword");
    }

    #[test]
    fn factory_builds_semantic_matcher() {
        let config = GradescanConfig::default();
        let matcher = create_matcher(&config).unwrap();
        assert_eq!(matcher.name(), "semantic");
    }

    #[test]
    fn semantic_requires_endpoint() {
        let config = GradescanConfig {
            matcher: MatcherSettings::Semantic {
                endpoint: "   ".into(),
                model: default_model(),
                api_key: None,
                timeout_secs: 30,
            },
            ..Default::default()
        };
        let err = create_matcher(&config).err().unwrap();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn missing_explicit_config_path_fails() {
        let err = load_config_from(Some(Path::new("/nonexistent/gradescan.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn load_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradescan.toml");
        std::fs::write(
            &path,
            r#"
[matcher]
kind = "keyword"

[analysis]
confidence_threshold = 0.75
"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert!(matches!(config.matcher, MatcherSettings::Keyword));
        assert!((config.analysis.confidence_threshold - 0.75).abs() < f64::EPSILON);
    }
}
