//! Planframe configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main Planframe configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Geometry and stacking defaults
    pub layout: LayoutConfig,

    /// Font fallback chain
    pub fonts: FontsConfig,

    /// Prompt template overrides
    pub prompts: PromptsConfig,

    /// Credential storage
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .planframe.yml
        let local_config = PathBuf::from(".planframe.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/planframe/planframe.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("planframe").join("planframe.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "openai" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable consulted when no key has been stored
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in milliseconds; no timeout when unset
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// System message sent with every section request
    #[serde(rename = "system-prompt")]
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout_ms: None,
            system_prompt: "You are a UI/UX designer. Create simple, mobile-friendly UI components.".to_string(),
        }
    }
}

/// Geometry and stacking defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Vertical gap after every node
    #[serde(rename = "node-gap")]
    pub node_gap: f64,

    /// Vertical gap between sections
    #[serde(rename = "section-gap")]
    pub section_gap: f64,

    /// Width of the page root
    #[serde(rename = "page-width")]
    pub page_width: f64,

    /// Space below the last section
    #[serde(rename = "page-bottom-margin")]
    pub page_bottom_margin: f64,

    /// Deepest nesting accepted from generated content
    #[serde(rename = "max-depth")]
    pub max_depth: usize,

    /// Auto-layout item spacing when a frame doesn't give one
    #[serde(rename = "item-spacing")]
    pub item_spacing: f64,

    /// Auto-layout padding on each side when a frame doesn't give one
    pub padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_gap: 10.0,
            section_gap: 20.0,
            page_width: 375.0,
            page_bottom_margin: 50.0,
            max_depth: 20,
            item_spacing: 16.0,
            padding: 16.0,
        }
    }
}

/// Font fallback chain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
    /// Families tried in order; the first with Regular and Bold faces wins
    pub families: Vec<String>,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            families: vec![
                "Inter".to_string(),
                "Roboto".to_string(),
                "Segoe UI".to_string(),
                "Arial".to_string(),
            ],
        }
    }
}

/// Prompt template overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory searched for `<name>.pmt` before the embedded templates
    pub dir: Option<PathBuf>,
}

/// Credential storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Credentials file; defaults to the keystore's data-dir location
    pub credentials: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve `~/` in the configured credentials path
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.credentials.as_ref().map(|p| match p.strip_prefix("~") {
            Ok(rest) => dirs::home_dir().map(|home| home.join(rest)).unwrap_or_else(|| p.clone()),
            Err(_) => p.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.layout.node_gap, 10.0);
        assert_eq!(config.layout.max_depth, 20);
        assert_eq!(config.fonts.families[0], "Inter");
        assert!(config.prompts.dir.is_none());
    }

    #[test]
    fn test_llm_config_defaults() {
        let config = LlmConfig::default();

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.max_tokens, 1000);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.timeout_ms.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  model: gpt-4o-mini
  api-key-env: MY_KEY
  base-url: http://localhost:8080
  max-tokens: 500
  temperature: 0.2
  timeout-ms: 30000

layout:
  node-gap: 12
  section-gap: 24
  max-depth: 8

fonts:
  families: [Roboto, Arial]

prompts:
  dir: /tmp/prompts
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key_env, "MY_KEY");
        assert_eq!(config.llm.timeout_ms, Some(30000));
        assert_eq!(config.layout.node_gap, 12.0);
        assert_eq!(config.layout.section_gap, 24.0);
        assert_eq!(config.layout.max_depth, 8);
        assert_eq!(config.layout.page_width, 375.0);
        assert_eq!(config.fonts.families, vec!["Roboto", "Arial"]);
        assert_eq!(config.prompts.dir, Some(PathBuf::from("/tmp/prompts")));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  model: gpt-4.1
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.llm.model, "gpt-4.1");

        // Defaults for unspecified
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.fonts.families.len(), 4);
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("planframe.yml");
        fs::write(&path, "layout:\n  page-width: 414\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.layout.page_width, 414.0);
    }

    #[test]
    fn test_load_explicit_path_missing_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_credentials_path_expands_home() {
        let storage = StorageConfig {
            credentials: Some(PathBuf::from("/var/lib/pf/creds.json")),
        };
        assert_eq!(storage.credentials_path(), Some(PathBuf::from("/var/lib/pf/creds.json")));
        assert!(StorageConfig::default().credentials_path().is_none());

        if let Some(home) = dirs::home_dir() {
            let storage = StorageConfig {
                credentials: Some(PathBuf::from("~/creds.json")),
            };
            assert_eq!(storage.credentials_path(), Some(home.join("creds.json")));
        }
    }
}
