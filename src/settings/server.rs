use std::env;

use serde::Deserialize;

use super::SettingsError;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    /// 수신 주소 목록 (기본값: `0.0.0.0:80`)
    #[serde(default = "default_listen")]
    pub listen: Vec<String>,
}

fn default_listen() -> Vec<String> {
    vec!["0.0.0.0:80".to_string()]
}

pub fn parse_env_var<T: std::str::FromStr, F: FnOnce() -> T>(
    name: &str,
    default: F,
) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: val,
            reason: e.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default()),
        Err(e) => Err(SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: "".to_string(),
            reason: e.to_string(),
        }),
    }
}

impl ServerSettings {
    /// `PROXY_LISTEN`은 쉼표로 구분된 주소 목록입니다.
    pub fn from_env() -> Result<Self, SettingsError> {
        let listen = match env::var("PROXY_LISTEN") {
            Ok(value) => value
                .split(',')
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
                .map(str::to_string)
                .collect(),
            Err(env::VarError::NotPresent) => default_listen(),
            Err(e) => {
                return Err(SettingsError::EnvVarInvalid {
                    var_name: "PROXY_LISTEN".to_string(),
                    value: "".to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let settings = Self { listen };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.listen.is_empty() {
            return Err(SettingsError::EnvVarMissing {
                var_name: "PROXY_LISTEN".to_string(),
            });
        }

        // 호스트가 비어 있는 주소(`:80`)는 리스너가 모든 인터페이스로 해석
        for addr in &self.listen {
            crate::addr::split_host_port(addr).map_err(|e| SettingsError::EnvVarInvalid {
                var_name: "PROXY_LISTEN".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}
