use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use switchboard_core::{MlpClassifier, RoutingEngine, RoutingPolicy};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwitchboardConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub routing: RoutingPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub enabled: bool,
    /// JSON weights file; `~/` is expanded
    #[serde(default)]
    pub model_path: Option<String>,
}

impl ClassifierConfig {
    pub fn resolved_model_path(&self) -> Option<PathBuf> {
        self.model_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(expand_home)
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".switchboard")
}

impl SwitchboardConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `switchboard init` first.",
                path.display()
            )
        })?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        if config.classifier.enabled && config.classifier.resolved_model_path().is_none() {
            warn!("Classifier is enabled but no model_path is set; running without it");
        }

        Ok(config)
    }

    /// Parse config text after env var expansion
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)?;
        config.routing.validate()?;
        Ok(config)
    }

    /// Build the engine, attaching the classifier when one is configured and
    /// loads. A model that fails to load only disables classification.
    pub fn build_engine(&self) -> Result<RoutingEngine> {
        let engine = RoutingEngine::new(self.routing.clone()).context("Invalid routing policy")?;

        if !self.classifier.enabled {
            return Ok(engine);
        }
        let Some(path) = self.classifier.resolved_model_path() else {
            return Ok(engine);
        };

        match MlpClassifier::load(&path) {
            Ok(classifier) => {
                info!("Advisory classifier loaded from {}", path.display());
                Ok(engine.with_classifier(Arc::new(classifier)))
            }
            Err(e) => {
                warn!("Classifier unavailable ({}); tickets will carry no advisory", e);
                Ok(engine)
            }
        }
    }
}

fn expand_home(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    Path::new(s).to_path_buf()
}

/// Allowlist of environment variable names that may be expanded in config files.
const ALLOWED_ENV_VARS: &[&str] = &["SWITCHBOARD_MODEL_PATH", "HOME", "USER"];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            pos = abs_start + end + 1;
            continue;
        }

        let value = std::env::var(&var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = SwitchboardConfig::parse("").unwrap();
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.classifier.enabled);
        assert_eq!(cfg.routing, RoutingPolicy::default());
    }

    #[test]
    fn test_shipped_default_config_parses() {
        let cfg = SwitchboardConfig::parse(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(cfg.routing.capacity, 5);
        assert_eq!(cfg.routing.agents.len(), 3);
        assert_eq!(cfg.routing.fallbacks, RoutingPolicy::default().fallbacks);
    }

    #[test]
    fn test_routing_section() {
        let cfg = SwitchboardConfig::parse(
            r#"
            [logging]
            level = "debug"

            [routing]
            capacity = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.routing.capacity, 3);
        assert_eq!(cfg.routing.agents.len(), 3);
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let err = SwitchboardConfig::parse("[routing]\ncapacity = 0\n").unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_unknown_env_var_left_alone() {
        let out = expand_env_vars("path = \"${SWITCHBOARD_NOT_ALLOWED}\"");
        assert_eq!(out, "path = \"${SWITCHBOARD_NOT_ALLOWED}\"");
    }

    #[test]
    fn test_allowed_env_var_expanded() {
        let home = std::env::var("HOME").unwrap_or_default();
        let out = expand_env_vars("model_path = \"${HOME}/model.json\"");
        assert_eq!(out, format!("model_path = \"{}/model.json\"", home));
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert_eq!(expand_env_vars("x = \"${HOME\""), "x = \"${HOME\"");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[routing]\ncapacity = 2").unwrap();
        let cfg = SwitchboardConfig::load(&Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.routing.capacity, 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SwitchboardConfig::load(&Some(PathBuf::from("/nonexistent/switchboard.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("switchboard init"));
    }

    #[test]
    fn test_engine_without_model_when_load_fails() {
        let cfg = SwitchboardConfig::parse(
            "[classifier]\nenabled = true\nmodel_path = \"/nonexistent/model.json\"\n",
        )
        .unwrap();
        let engine = cfg.build_engine().unwrap();
        assert!(!engine.has_classifier());
    }

    #[test]
    fn test_engine_with_model() {
        let model = serde_json::json!({
            "input_size": 2, "hidden1_size": 1, "hidden2_size": 1, "output_size": 3,
            "labels": ["Agent 1", "Agent 2", "Agent 3"],
            "weights_input_hidden1": [[0.0], [0.0]], "bias_hidden1": [0.0],
            "weights_hidden1_hidden2": [[0.0]], "bias_hidden2": [0.0],
            "weights_hidden2_output": [[0.0, 0.0, 0.0]], "bias_output": [0.0, 0.0, 0.0]
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(model.to_string().as_bytes()).unwrap();

        let cfg = SwitchboardConfig {
            classifier: ClassifierConfig {
                enabled: true,
                model_path: Some(file.path().display().to_string()),
            },
            ..Default::default()
        };
        assert!(cfg.build_engine().unwrap().has_classifier());
    }

    #[test]
    fn test_disabled_classifier_is_not_loaded() {
        let cfg = SwitchboardConfig {
            classifier: ClassifierConfig {
                enabled: false,
                model_path: Some("/anything.json".into()),
            },
            ..Default::default()
        };
        assert!(!cfg.build_engine().unwrap().has_classifier());
    }
}
