//! Configuration loading.
//!
//! `{data_dir}/config.toml` is parsed into [`AppConfig`]; a missing or
//! malformed file yields the defaults. Environment variables then override
//! individual fields. API keys are not read here (see
//! [`ProviderCredentials`](crate::llm::registry::ProviderCredentials)).

use std::path::{Path, PathBuf};

use grandma_types::config::AppConfig;

pub const DATA_DIR_ENV: &str = "GRANDMA_DATA_DIR";
const DATABASE_FILE: &str = "grandma.db";

/// `GRANDMA_DATA_DIR`, else `~/.grandma`, else `./.grandma`.
pub fn resolve_data_dir() -> PathBuf {
    resolve_data_dir_with(|key| std::env::var(key).ok())
}

fn resolve_data_dir_with(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".grandma")
}

/// Load `{data_dir}/config.toml` and apply environment overrides.
pub async fn load_app_config(data_dir: &Path) -> AppConfig {
    let mut config = read_config_file(data_dir).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

async fn read_config_file(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            AppConfig::default()
        }
    }
}

/// Overlay non-empty environment values onto `config`.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = var("OPENAI_BASE_URL") {
        config.openai.base_url = v;
    }
    if let Some(v) = var("OPENAI_MODEL") {
        config.openai.model = v;
    }
    if let Some(v) = var("ANTHROPIC_BASE_URL") {
        config.anthropic.base_url = v;
    }
    if let Some(v) = var("ANTHROPIC_MODEL") {
        config.anthropic.model = v;
    }
    if let Some(v) = var("GRANDMA_DATABASE_PATH") {
        config.database.path = Some(v);
    }
    if let Some(v) = var("GRANDMA_TITLE_MODEL") {
        config.chat.title_model = v;
    }
}

/// The configured database file, or `{data_dir}/grandma.db`.
pub fn database_path(config: &AppConfig, data_dir: &Path) -> PathBuf {
    config
        .database
        .path
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join(DATABASE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = read_config_file(tmp.path()).await;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.chat.flush_threshold_bytes, 100);
    }

    #[tokio::test]
    async fn test_valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[server]
port = 9191

[chat]
history_limit = 5
abort_on_client_disconnect = true

[anthropic]
max_tokens = 1024
"#,
        )
        .await
        .unwrap();

        let config = read_config_file(tmp.path()).await;
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.chat.history_limit, 5);
        assert!(config.chat.abort_on_client_disconnect);
        assert_eq!(config.anthropic.max_tokens, 1024);
        assert_eq!(config.openai.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();
        let config = read_config_file(tmp.path()).await;
        assert_eq!(config.chat.history_limit, 20);
    }

    #[test]
    fn test_env_overrides_skip_blank_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_BASE_URL", "http://127.0.0.1:9000/v1"),
            ("ANTHROPIC_MODEL", "claude-3-haiku-20240307"),
            ("GRANDMA_TITLE_MODEL", "claude"),
            ("OPENAI_MODEL", "   "),
        ]);
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.openai.base_url, "http://127.0.0.1:9000/v1");
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.anthropic.model, "claude-3-haiku-20240307");
        assert_eq!(config.chat.title_model, "claude");
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_database_path() {
        let mut config = AppConfig::default();
        assert_eq!(
            database_path(&config, Path::new("/data")),
            PathBuf::from("/data/grandma.db")
        );
        config.database.path = Some("/elsewhere/chat.db".into());
        assert_eq!(
            database_path(&config, Path::new("/data")),
            PathBuf::from("/elsewhere/chat.db")
        );
    }

    #[test]
    fn test_data_dir_env_wins() {
        let dir = resolve_data_dir_with(|key| (key == DATA_DIR_ENV).then(|| "/srv/grandma".to_string()));
        assert_eq!(dir, PathBuf::from("/srv/grandma"));
        let fallback = resolve_data_dir_with(|_| None);
        assert!(fallback.ends_with(".grandma"));
    }
}
