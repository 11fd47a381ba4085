//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换与覆盖功能

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    ///
    /// # 参数
    /// * `content` - 配置文件内容
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用 `${VAR}` 环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 加载最终生效的配置
    ///
    /// 配置文件存在时先读取文件，否则从默认值开始；然后应用环境变量覆盖并验证。
    /// 显式指定的路径不存在时返回错误。
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    /// * `explicit` - 路径是否由用户显式指定
    pub async fn load_effective(&self, path: &Path, explicit: bool) -> Result<Config> {
        let mut config = if path.exists() {
            self.parse_file(path).await?
        } else if explicit {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        } else {
            tracing::debug!("配置文件不存在，使用默认配置: {}", path.display());
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        self.validate(&config)?;
        Ok(config)
    }

    /// 替换字符串中的环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        // 匹配 ${VAR_NAME} 格式的环境变量
        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {e}")))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    /// 解析TOML内容
    fn parse_toml(&self, content: &str) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let config: Config = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {e}")))?;

        Ok(config)
    }

    async fn parse_file(&self, path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {e}")))?;

        let config = self.parse_toml(&content)?;
        tracing::info!("成功加载配置文件: {}", path.display());
        Ok(config)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let config = self.parse_file(path).await?;
        self.validate(&config)?;

        tracing::debug!("配置内容: {:?}", config);
        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse_toml(content)?;
        self.validate(&config)?;

        tracing::debug!("成功解析配置字符串");
        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 使用进程环境变量覆盖配置
///
/// 支持 `SOURCE_URL`、`TTL`、`TIMEOUT_MS`、`CONCURRENCY_LIMIT`、`WHITELIST`
/// 和 `FAILURE_WEBHOOK_URL`。
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    apply_overrides_from(config, |name| std::env::var(name).ok())
}

/// 使用给定的查找函数覆盖配置
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("SOURCE_URL") {
        config.source_url = url.trim().to_string();
    }
    if let Some(value) = lookup("TTL") {
        config.ttl_seconds = parse_env("TTL", &value)?;
    }
    if let Some(value) = lookup("TIMEOUT_MS") {
        config.timeout_ms = parse_env("TIMEOUT_MS", &value)?;
    }
    if let Some(value) = lookup("CONCURRENCY_LIMIT") {
        config.concurrency_limit = parse_env("CONCURRENCY_LIMIT", &value)?;
    }
    if let Some(value) = lookup("WHITELIST") {
        config.whitelist = parse_whitelist(&value);
    }
    if let Some(url) = lookup("FAILURE_WEBHOOK_URL") {
        let url = url.trim();
        config.failure_webhook_url = (!url.is_empty()).then(|| url.to_string());
    }
    Ok(())
}

/// 解析逗号分隔的白名单，忽略空项
pub fn parse_whitelist(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env<T: FromStr>(var: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidEnvValue {
            var: var.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

/// 获取默认配置文件路径
///
/// 当前目录存在 `config.toml` 时使用它，否则使用用户配置目录下的
/// `instance-vitals/config.toml`。
pub fn get_default_config_path() -> PathBuf {
    if Path::new("config.toml").exists() {
        PathBuf::from("config.toml")
    } else {
        dirs::config_dir()
            .map(|config_dir| config_dir.join(crate::APP_NAME).join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::env;
    use std::io::Write;

    const TEST_CONFIG_TOML: &str = r#"
source_url = "https://registry.example/instances.json"
ttl_seconds = 90000
timeout_ms = 1500
concurrency_limit = 8
whitelist = ["https://a.example"]
refresh_single_flight = true

[web]
port = 8080
"#;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[tokio::test]
    async fn test_toml_parsing() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(TEST_CONFIG_TOML).await.unwrap();

        assert_eq!(config.ttl_seconds, 90000);
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.concurrency_limit, 8);
        assert_eq!(config.whitelist, vec!["https://a.example"]);
        assert!(config.refresh_single_flight);
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.web.bind_address, "0.0.0.0");
    }

    #[tokio::test]
    async fn test_minimal_toml_uses_defaults() {
        let loader = TomlConfigLoader::new(false);
        let config = loader
            .load_from_string(r#"source_url = "https://registry.example/""#)
            .await
            .unwrap();

        assert_eq!(config.ttl_seconds, 300);
        assert_eq!(config.timeout_ms, 2000);
        assert_eq!(config.concurrency_limit, 5);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_rejected() {
        let loader = TomlConfigLoader::new(false);
        let err = loader
            .load_from_string("source_url = [")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("TOML解析失败"));
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution() {
        env::set_var("VITALS_TEST_REGISTRY", "https://registry.example/list");

        let loader = TomlConfigLoader::new(true);
        let config = loader
            .load_from_string(r#"source_url = "${VITALS_TEST_REGISTRY}""#)
            .await
            .unwrap();
        assert_eq!(config.source_url, "https://registry.example/list");

        env::remove_var("VITALS_TEST_REGISTRY");
    }

    #[tokio::test]
    async fn test_env_var_substitution_missing_var() {
        let loader = TomlConfigLoader::new(true);
        let result = loader
            .load_from_string(r#"source_url = "${VITALS_MISSING_VAR}""#)
            .await;

        assert!(result.unwrap_err().to_string().contains("VITALS_MISSING_VAR"));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let mut config = Config::default();
        let lookup = lookup_from(&[
            ("SOURCE_URL", " https://registry.example/ "),
            ("TTL", "86400"),
            ("TIMEOUT_MS", "50"),
            ("CONCURRENCY_LIMIT", "2"),
            ("WHITELIST", "https://a.example, ,https://b.example ,"),
        ]);

        apply_overrides_from(&mut config, lookup).unwrap();

        assert_eq!(config.source_url, "https://registry.example/");
        assert_eq!(config.ttl_seconds, 86400);
        assert_eq!(config.timeout_ms, 50);
        assert_eq!(config.concurrency_limit, 2);
        assert_eq!(config.whitelist, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_invalid_override_value() {
        let mut config = Config::default();
        let err = apply_overrides_from(&mut config, lookup_from(&[("TIMEOUT_MS", "fast")]))
            .unwrap_err();
        assert!(err.to_string().contains("TIMEOUT_MS"));
    }

    #[tokio::test]
    #[serial]
    async fn test_load_effective_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_CONFIG_TOML.as_bytes()).unwrap();

        env::set_var("CONCURRENCY_LIMIT", "3");
        let loader = TomlConfigLoader::new(false);
        let result = loader.load_effective(file.path(), true).await;
        env::remove_var("CONCURRENCY_LIMIT");

        let config = result.unwrap();
        assert_eq!(config.concurrency_limit, 3);
        assert_eq!(config.timeout_ms, 1500);
    }

    #[tokio::test]
    #[serial]
    async fn test_load_effective_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.toml");
        let loader = TomlConfigLoader::new(false);

        let err = loader.load_effective(&missing, true).await.unwrap_err();
        assert!(err.to_string().contains("配置文件不存在"));

        env::set_var("SOURCE_URL", "https://registry.example/");
        let result = loader.load_effective(&missing, false).await;
        env::remove_var("SOURCE_URL");

        assert_eq!(result.unwrap().source_url, "https://registry.example/");
    }

    #[test]
    fn test_get_default_config_path() {
        let path = get_default_config_path();
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
