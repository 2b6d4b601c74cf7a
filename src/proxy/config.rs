use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info};

use super::{HttpProxy, Transport};
use crate::addr::{resolve_ip_addr, resolve_tcp_addr, AddrError, TcpTarget};
use crate::director::{
    Director, DirectorChain, DirectorError, DestinationMap, HttpHeader, SameIp, SetHeaders,
    SetHeadersByNetwork, SetScheme, StaticHost,
};
use crate::rate_limit::{AdmissionControl, RateLimitError, RateLimitParams, RateLimiter};

/// 기본 대상에 포트가 없을 때 쓰는 포트
const DEFAULT_HTTP_PORT: u16 = 80;

/// `HeadersByIP`에서 현재 네트워크를 바꾸는 줄의 키
const IPNET_MARKER: &str = "IPNET";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("기본 대상이 비어 있음")]
    EmptyDefaultTarget,

    #[error("기본 대상 {target} 해석 실패: {source}")]
    DefaultTarget {
        target: String,
        #[source]
        source: AddrError,
    },

    #[error("대상 맵 줄을 두 주소로 나눌 수 없음: {line}")]
    TargetMapFormat { line: String },

    #[error("대상 맵 줄 {line}의 주소 해석 실패: {source}")]
    TargetMapAddress {
        line: String,
        #[source]
        source: AddrError,
    },

    #[error("대상 맵 줄 {line}의 주소 {addr}에 IP가 없음")]
    TargetMapNoIp { line: String, addr: String },

    #[error("헤더 줄을 이름과 값으로 나눌 수 없음: {line}")]
    HeaderLine { line: String },

    #[error(transparent)]
    Director(#[from] DirectorError),

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}

/// 프록시 설정
///
/// 설정 파일의 키 이름을 그대로 따릅니다.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// 기본 대상. 호스트가 비어 있으면(`:8080`) 연결을 받은 로컬 IP로 보냅니다.
    #[serde(rename = "DefaultTarget")]
    pub default_target: String,

    /// `로컬주소-대상주소` 줄 목록
    #[serde(rename = "TargetMap")]
    pub target_map: Vec<String>,

    /// `이름:값` 줄 목록
    ///
    /// 이름과 값은 앞뒤 공백을 제거한 뒤 예약 토큰과 비교하므로
    /// `X-A: {{SOURCE_IP}}`도 토큰으로 해석됩니다.
    #[serde(rename = "Headers")]
    pub headers: Vec<String>,

    /// `IPNET=<cidr>` 줄 뒤에 그 네트워크의 `이름:값` 줄이 오는 목록
    #[serde(rename = "HeadersByIP")]
    pub headers_by_ip: Vec<String>,

    #[serde(rename = "KeepAliveTimeoutSeconds")]
    pub keep_alive_timeout_seconds: u64,

    #[serde(rename = "HTTPSBackend")]
    pub https_backend: bool,

    #[serde(rename = "HTTPSBackendIgnoreCert")]
    pub https_backend_ignore_cert: bool,

    #[serde(rename = "EnableAccessLog")]
    pub enable_access_log: bool,

    /// 시간 창마다 허용되는 요청 수 (0이면 제한 없음)
    #[serde(rename = "RateLimit")]
    pub rate_limit: u32,

    #[serde(rename = "RateLimitTimeWindowMs")]
    pub rate_limit_time_window_ms: u64,

    #[serde(rename = "RateLimitBurst")]
    pub rate_limit_burst: u32,

    #[serde(rename = "RateLimitCacheSize")]
    pub rate_limit_cache_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            default_target: ":80".to_string(),
            target_map: Vec::new(),
            headers: Vec::new(),
            headers_by_ip: Vec::new(),
            keep_alive_timeout_seconds: 900,
            https_backend: false,
            https_backend_ignore_cert: false,
            enable_access_log: false,
            rate_limit: 0,
            rate_limit_time_window_ms: 1000,
            rate_limit_burst: 0,
            rate_limit_cache_size: 10000,
        }
    }
}

impl ProxyConfig {
    /// 설정을 프록시에 적용합니다.
    ///
    /// 트랜스포트와 접근 로그 플래그는 이후 단계의 성공 여부와 관계없이 먼저
    /// 설정됩니다. 에러가 나면 프록시는 일부만 바뀐 상태이므로 쓰지 말아야 합니다.
    pub fn apply(&self, proxy: &mut HttpProxy) -> Result<(), ConfigError> {
        let limiter = RateLimiter::new(self.rate_limit_params());

        proxy.transport = Transport {
            https_backend: self.https_backend,
            ignore_https_certificate: self.https_backend_ignore_cert,
            rate_limiter: limiter
                .as_ref()
                .ok()
                .filter(|limiter| limiter.is_enabled())
                .map(|limiter| Arc::new(limiter.clone()) as Arc<dyn AdmissionControl>),
        };
        proxy.enable_access_log = self.enable_access_log;

        if let Err(e) = limiter {
            error!(error = %e, "Can't create rate limiter");
            return Err(e.into());
        }

        let chain = self.build_director_chain().map_err(|e| {
            error!(error = %e, "Can't parse proxy config");
            e
        })?;

        info!(directors = chain.len(), "프록시 설정 적용");
        proxy.set_director(chain);
        proxy.idle_timeout = Duration::from_secs(self.keep_alive_timeout_seconds);
        Ok(())
    }

    pub fn rate_limit_params(&self) -> RateLimitParams {
        RateLimitParams {
            rate_limit: self.rate_limit,
            time_window: Duration::from_millis(self.rate_limit_time_window_ms),
            burst: self.rate_limit_burst,
            cache_size: self.rate_limit_cache_size,
        }
    }

    /// 디렉터 체인을 고정된 순서로 만듭니다. 첫 번째 에러에서 멈춥니다.
    pub fn build_director_chain(&self) -> Result<DirectorChain, ConfigError> {
        Ok(DirectorChain::new([
            Some(self.default_target_director()?),
            self.target_map_director()?,
            self.headers_director()?,
            Some(self.scheme_director()),
            self.headers_by_ip_director()?,
        ]))
    }

    pub fn default_target_director(&self) -> Result<Box<dyn Director>, ConfigError> {
        let target = self.default_target.trim();
        if target.is_empty() {
            return Err(ConfigError::EmptyDefaultTarget);
        }

        let addr = match resolve_tcp_addr(target) {
            Ok(addr) => addr,
            Err(e) => {
                debug!(default_target = %target, error = %e, "Parse default target as tcp address");
                let ip = resolve_ip_addr(target).map_err(|source| {
                    error!(default_target = %target, "Error parse default target address");
                    ConfigError::DefaultTarget {
                        target: target.to_string(),
                        source,
                    }
                })?;
                TcpTarget {
                    ip: Some(ip),
                    port: DEFAULT_HTTP_PORT,
                }
            }
        };

        if addr.ip.is_none() {
            info!(port = addr.port, "Create same ip director");
            return Ok(Box::new(SameIp::new(addr.port)));
        }

        info!(target = %addr, "Create host ip director");
        Ok(Box::new(StaticHost::new(addr.to_string())))
    }

    /// 목록이 비어 있으면 `None`
    pub fn target_map_director(&self) -> Result<Option<Box<dyn Director>>, ConfigError> {
        if self.target_map.is_empty() {
            return Ok(None);
        }

        let map = self
            .target_map
            .iter()
            .map(|line| {
                let (from, to) = parse_tcp_map_pair(line)?;
                debug!(line = %line, from = %from, to = %to, "Parse target map");
                Ok((from, to))
            })
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;

        info!(map = ?map, "Add target-map director");
        Ok(Some(Box::new(DestinationMap::new(map))))
    }

    /// 목록이 비어 있으면 `None`
    pub fn headers_director(&self) -> Result<Option<Box<dyn Director>>, ConfigError> {
        if self.headers.is_empty() {
            return Ok(None);
        }

        let headers = self
            .headers
            .iter()
            .map(|line| split_header_line(line))
            .collect::<Result<Vec<_>, _>>()?;

        info!(headers = ?headers, "Create headers director");
        Ok(Some(Box::new(SetHeaders::new(headers)?)))
    }

    pub fn scheme_director(&self) -> Box<dyn Director> {
        if self.https_backend {
            Box::new(SetScheme::https())
        } else {
            Box::new(SetScheme::http())
        }
    }

    /// `IPNET=` 줄로 네트워크를 나누고 이어지는 헤더 줄을 그 네트워크에 묶습니다.
    /// 첫 `IPNET=` 줄 앞의 헤더는 빈 네트워크에 묶여 에러가 됩니다.
    pub fn headers_by_ip_director(&self) -> Result<Option<Box<dyn Director>>, ConfigError> {
        if self.headers_by_ip.is_empty() {
            return Ok(None);
        }

        let mut groups: Vec<(String, Vec<HttpHeader>)> = Vec::new();
        let mut network = String::new();

        for line in &self.headers_by_ip {
            let line = line.trim();
            if let Some((key, value)) = line.split_once('=') {
                if key.trim() == IPNET_MARKER {
                    network = value.trim().to_string();
                    continue;
                }
            }

            let (name, value) = split_header_line(line)?;
            let header = HttpHeader::new(name, value)?;

            let index = match groups.iter().position(|(net, _)| *net == network) {
                Some(index) => index,
                None => {
                    groups.push((network.clone(), Vec::new()));
                    groups.len() - 1
                }
            };
            let headers = &mut groups[index].1;
            match headers.iter_mut().find(|h| h.name == header.name) {
                Some(existing) => *existing = header,
                None => headers.push(header),
            }
        }

        info!(networks = groups.len(), "Create headers by ip director");
        Ok(Some(Box::new(SetHeadersByNetwork::new(groups)?)))
    }
}

/// `이름:값`을 첫 번째 콜론에서 나눕니다.
fn split_header_line(line: &str) -> Result<(&str, &str), ConfigError> {
    let line = line.trim();
    match line.split_once(':') {
        Some((name, value)) => Ok((name.trim(), value.trim())),
        None => {
            error!(line = %line, "Can't split header line to parts");
            Err(ConfigError::HeaderLine {
                line: line.to_string(),
            })
        }
    }
}

/// `from-to` 줄을 정규화된 두 소켓 주소 문자열로 바꿉니다.
fn parse_tcp_map_pair(line: &str) -> Result<(String, String), ConfigError> {
    let trimmed = line.trim();
    let parts: Vec<&str> = trimmed.split('-').collect();
    let [from, to] = parts.as_slice() else {
        return Err(ConfigError::TargetMapFormat {
            line: line.to_string(),
        });
    };

    let resolve = |addr: &str| -> Result<String, ConfigError> {
        let target = resolve_tcp_addr(addr).map_err(|source| ConfigError::TargetMapAddress {
            line: line.to_string(),
            source,
        })?;
        if target.ip.is_none() {
            return Err(ConfigError::TargetMapNoIp {
                line: line.to_string(),
                addr: addr.to_string(),
            });
        }
        Ok(target.to_string())
    };

    Ok((resolve(*from)?, resolve(*to)?))
}
