use std::{env, path::Path};

use serde::Deserialize;
use tracing::debug;

use crate::proxy::ProxyConfig;

mod error;
pub mod logging;
mod server;

pub use error::SettingsError;
pub use logging::LogSettings;
pub use server::ServerSettings;

pub type Result<T> = std::result::Result<T, SettingsError>;
pub use server::parse_env_var;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    // 서버 설정
    #[serde(default)]
    pub server: ServerSettings,

    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,

    /// 프록시 설정 (`[proxy]` 테이블)
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Settings {
    /// `PROXY_CONFIG_FILE`이 있으면 TOML 파일에서, 없으면 환경 변수에서 읽습니다.
    pub async fn load() -> Result<Self> {
        if let Ok(config_path) = env::var("PROXY_CONFIG_FILE") {
            Self::from_toml_file(&config_path).await
        } else {
            Self::from_env().await
        }
    }

    pub async fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SettingsError::FileError {
                path: path.as_ref().to_string_lossy().to_string(),
                error: e,
            })?;

        let settings: Self =
            toml::from_str(&content).map_err(|e| SettingsError::ParseError { source: e })?;
        debug!(path = %path.as_ref().display(), "설정 파일 로드");

        settings.validate()?;
        Ok(settings)
    }

    pub async fn from_env() -> Result<Self> {
        let mut proxy = ProxyConfig::default();
        if let Ok(target) = env::var("PROXY_DEFAULT_TARGET") {
            proxy.default_target = target;
        }

        let settings = Self {
            server: ServerSettings::from_env()?,
            logging: LogSettings::from_env()?,
            proxy,
        };

        // 설정 생성 시점에 바로 검증
        settings.validate()?;
        Ok(settings)
    }

    /// 설정 유효성 검증
    ///
    /// 프록시 설정 자체는 적용 시점에 검증됩니다.
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;

        if self.proxy.default_target.trim().is_empty() {
            return Err(SettingsError::InvalidConfig {
                key: "proxy.DefaultTarget".to_string(),
                reason: "비어 있습니다".to_string(),
            });
        }

        Ok(())
    }
}
