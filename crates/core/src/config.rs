use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// 应用配置
///
/// 支持从 TOML 配置文件加载，环境变量（`LIFELINE__` 前缀）可覆盖任意配置项。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub maps: MapsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub bind_address: String,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    /// Google Maps API Key，缺省时地址解析与距离计算自动降级
    pub api_key: Option<String>,
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://lifeline.db?mode=rwc".to_string(),
                max_connections: 5,
                connection_timeout_seconds: 30,
            },
            api: ApiConfig {
                bind_address: "0.0.0.0:4000".to_string(),
                cors_enabled: true,
                cors_origins: vec!["*".to_string()],
                request_timeout_seconds: 30,
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                jwt_expiration_hours: 24,
            },
            maps: MapsConfig {
                api_key: None,
                base_url: "https://maps.googleapis.com/maps/api".to_string(),
                request_timeout_seconds: 5,
            },
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/lifeline.toml", "lifeline.toml"];
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        // 环境变量覆盖，例如 LIFELINE__DATABASE__URL
        builder = builder.add_source(
            Environment::with_prefix("LIFELINE")
                .separator("__")
                .try_parsing(true),
        );

        let defaults = Self::default();
        let config = builder
            .set_default("database.url", defaults.database.url.clone())?
            .set_default(
                "database.max_connections",
                i64::from(defaults.database.max_connections),
            )?
            .set_default(
                "database.connection_timeout_seconds",
                defaults.database.connection_timeout_seconds as i64,
            )?
            .set_default("api.bind_address", defaults.api.bind_address.clone())?
            .set_default("api.cors_enabled", defaults.api.cors_enabled)?
            .set_default("api.cors_origins", defaults.api.cors_origins.clone())?
            .set_default(
                "api.request_timeout_seconds",
                defaults.api.request_timeout_seconds as i64,
            )?
            .set_default("auth.jwt_secret", defaults.auth.jwt_secret.clone())?
            .set_default(
                "auth.jwt_expiration_hours",
                defaults.auth.jwt_expiration_hours,
            )?
            .set_default("maps.base_url", defaults.maps.base_url.clone())?
            .set_default(
                "maps.request_timeout_seconds",
                defaults.maps.request_timeout_seconds as i64,
            )?
            .build()
            .context("构建配置失败")?;

        let app_config: AppConfig = config.try_deserialize().context("解析配置失败")?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// 校验配置项的合法性
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(anyhow::anyhow!("数据库连接地址不能为空"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("数据库最大连接数必须大于0"));
        }
        self.api
            .bind_address
            .parse::<SocketAddr>()
            .with_context(|| format!("无效的监听地址: {}", self.api.bind_address))?;
        if self.auth.jwt_secret.len() < 16 {
            return Err(anyhow::anyhow!("JWT密钥长度至少16个字符"));
        }
        if self.auth.jwt_expiration_hours <= 0 {
            return Err(anyhow::anyhow!("JWT过期时间必须大于0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_bind_address() {
        let mut config = AppConfig::default();
        config.api.bind_address = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[database]
url = "sqlite::memory:"

[api]
bind_address = "127.0.0.1:9000"

[auth]
jwt_secret = "integration-test-secret"
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.api.bind_address, "127.0.0.1:9000");
        // 未显式配置的段落落回默认值
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.maps.api_key, None);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load(Some("/no/such/lifeline.toml")).is_err());
    }
}
