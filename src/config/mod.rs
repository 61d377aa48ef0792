mod file_config;

pub use file_config::{FileConfig, GenerationConfig, LlmConfig, StoreConfig, UserConfig};

use crate::concert_store::DEFAULT_STORE_TIMEOUT;
use crate::generation::{
    GeneratorSettings, DEFAULT_GENERATION_TIMEOUT, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
use crate::llm::{ApiKeySource, LlmProvider, OpenAIProvider, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::user::{ConfiguredUser, UserRole};
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    /// Usually taken from `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    pub max_concurrency: Option<usize>,
    pub generation_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub llm: LlmSettings,
    pub generation: GenerationSettings,
    pub store_timeout: Duration,
    pub users: Vec<ConfiguredUser>,
    pub admin_email: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        // LLM settings - merge file config with CLI and defaults
        let llm_file = file.llm.unwrap_or_default();
        let llm_defaults = LlmSettings::default();
        let provider = llm_file.provider.unwrap_or(llm_defaults.provider);
        if provider != "openai" {
            bail!("Unsupported LLM provider '{}' (expected \"openai\")", provider);
        }
        let temperature = llm_file.temperature.unwrap_or(llm_defaults.temperature);
        if !(0.0..=2.0).contains(&temperature) {
            bail!("llm.temperature must be between 0.0 and 2.0, got {}", temperature);
        }
        let llm = LlmSettings {
            provider,
            base_url: llm_file
                .base_url
                .or_else(|| cli.llm_base_url.clone())
                .unwrap_or(llm_defaults.base_url),
            model: llm_file
                .model
                .or_else(|| cli.llm_model.clone())
                .unwrap_or(llm_defaults.model),
            api_key: llm_file.api_key.or_else(|| cli.api_key.clone()),
            api_key_command: llm_file.api_key_command,
            temperature,
            max_tokens: llm_file.max_tokens.unwrap_or(llm_defaults.max_tokens),
            timeout_secs: llm_file
                .timeout_secs
                .or(cli.generation_timeout_secs)
                .unwrap_or(llm_defaults.timeout_secs),
        };

        let generation_file = file.generation.unwrap_or_default();
        let generation = GenerationSettings {
            parallel: generation_file.parallel.unwrap_or(true),
            max_concurrency: generation_file
                .max_concurrency
                .or(cli.max_concurrency)
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
        };
        if generation.max_concurrency == 0 {
            bail!("generation.max_concurrency must be at least 1");
        }

        let store_timeout = file
            .store
            .and_then(|s| s.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_STORE_TIMEOUT);

        let users = file
            .users
            .into_iter()
            .map(|u| -> Result<ConfiguredUser> {
                let role = match u.role.as_deref() {
                    None => None,
                    Some(value) => match UserRole::from_str(value) {
                        Some(role) => Some(role),
                        None => bail!("Unknown role '{}' for user {}", value, u.email),
                    },
                };
                Ok(ConfiguredUser {
                    email: u.email,
                    password_hash: u.password_hash,
                    role,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            db_path,
            llm,
            generation,
            store_timeout,
            users,
            admin_email: file.admin_email,
        })
    }
}

/// Settings for the LLM provider.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_key_command: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_GENERATION_TIMEOUT.as_secs(),
        }
    }
}

impl LlmSettings {
    pub fn api_key_source(&self) -> ApiKeySource {
        match (&self.api_key_command, &self.api_key) {
            (Some(command), _) => ApiKeySource::Command(command.clone()),
            (None, Some(key)) => ApiKeySource::Static(key.clone()),
            (None, None) => ApiKeySource::None,
        }
    }

    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn create_provider(&self) -> Arc<dyn LlmProvider> {
        Arc::new(OpenAIProvider::new(
            self.base_url.clone(),
            self.model.clone(),
            self.api_key_source(),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub parallel: bool,
    pub max_concurrency: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_with_db(temp_dir: &TempDir) -> CliConfig {
        CliConfig {
            db_path: Some(temp_dir.path().join("concerts.db")),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: Some(temp_dir.path().join("concerts.db")),
            llm_base_url: Some("http://localhost:8080/v1".to_string()),
            llm_model: Some("gpt-4o".to_string()),
            api_key: Some("sk-cli".to_string()),
            max_concurrency: Some(6),
            generation_timeout_secs: Some(45),
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_path, temp_dir.path().join("concerts.db"));
        assert_eq!(config.llm.base_url, "http://localhost:8080/v1");
        assert_eq!(config.llm.model, "gpt-4o");
        assert!(matches!(config.llm.api_key_source(), ApiKeySource::Static(k) if k == "sk-cli"));
        assert_eq!(config.llm.timeout_secs, 45);
        assert_eq!(config.generation.max_concurrency, 6);
        assert!(config.generation.parallel);
        assert_eq!(config.store_timeout, DEFAULT_STORE_TIMEOUT);
    }

    #[test]
    fn test_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::resolve(&cli_with_db(&temp_dir), None).unwrap();

        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.llm.max_tokens, 800);
        assert_eq!(config.generation.max_concurrency, 3);
        assert!(matches!(config.llm.api_key_source(), ApiKeySource::None));
        let settings = config.llm.generator_settings();
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: Some(PathBuf::from("/should/be/overridden.db")),
            llm_model: Some("cli-model".to_string()),
            api_key: Some("sk-cli".to_string()),
            max_concurrency: Some(2),
            ..Default::default()
        };
        let file_config = FileConfig {
            db_path: Some(temp_dir.path().join("toml.db").to_string_lossy().to_string()),
            llm: Some(LlmConfig {
                model: Some("toml-model".to_string()),
                api_key_command: Some("echo sk-cmd".to_string()),
                ..Default::default()
            }),
            generation: Some(GenerationConfig {
                parallel: Some(false),
                max_concurrency: None,
            }),
            store: Some(StoreConfig {
                timeout_secs: Some(5),
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        assert_eq!(config.db_path, temp_dir.path().join("toml.db"));
        assert_eq!(config.llm.model, "toml-model");
        // Key command wins over a static key
        assert!(matches!(config.llm.api_key_source(), ApiKeySource::Command(_)));
        assert!(!config.generation.parallel);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.generation.max_concurrency, 2);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_resolve_missing_db_path_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_path must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = CliConfig {
            db_path: Some(PathBuf::from("/nonexistent/dir/concerts.db")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let cli = cli_with_db(&temp_dir);

        let bad_provider = FileConfig {
            llm: Some(LlmConfig {
                provider: Some("carrier-pigeon".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, Some(bad_provider)).is_err());

        let zero_workers = FileConfig {
            generation: Some(GenerationConfig {
                parallel: None,
                max_concurrency: Some(0),
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, Some(zero_workers)).is_err());

        let bad_role = FileConfig {
            users: vec![UserConfig {
                email: "x@example.com".to_string(),
                password_hash: "h".to_string(),
                role: Some("superuser".to_string()),
            }],
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli, Some(bad_role)).unwrap_err();
        assert!(err.to_string().contains("superuser"));
    }

    #[test]
    fn test_users_and_admin_email() {
        let temp_dir = TempDir::new().unwrap();
        let file_config = FileConfig {
            admin_email: Some("boss@example.com".to_string()),
            users: vec![
                UserConfig {
                    email: "boss@example.com".to_string(),
                    password_hash: "h1".to_string(),
                    role: None,
                },
                UserConfig {
                    email: "fan@example.com".to_string(),
                    password_hash: "h2".to_string(),
                    role: Some("Regular".to_string()),
                },
            ],
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli_with_db(&temp_dir), Some(file_config)).unwrap();
        assert_eq!(config.admin_email.as_deref(), Some("boss@example.com"));
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.users[0].role, None);
        assert_eq!(config.users[1].role, Some(UserRole::Regular));
    }
}
