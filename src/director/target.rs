use std::collections::HashMap;

use hyper::http::request::Parts;
use hyper::http::uri::Scheme;
use tracing::debug;

use super::{ConnectionInfo, Destination, Director, DirectorError};

/// 연결을 수락한 로컬 IP와 고정 포트로 목적지를 설정합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SameIp {
    port: u16,
}

impl SameIp {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Director for SameIp {
    fn direct(&self, parts: &mut Parts) -> Result<(), DirectorError> {
        let local_ip = ConnectionInfo::from_parts(parts)
            .ok_or(DirectorError::MissingConnectionInfo)?
            .local_addr
            .ip()
            .to_canonical();

        let host = std::net::SocketAddr::new(local_ip, self.port).to_string();
        debug!(local_ip = %local_ip, dest_host = %host, "Set target as same ip");
        Destination::from_parts_mut(parts).host = Some(host);
        Ok(())
    }
}

/// 로컬 소켓 주소별 목적지 맵
///
/// 키는 정규화된 로컬 주소 문자열입니다. 일치하는 키가 없으면 목적지를
/// 건드리지 않으므로 다른 디렉터와 앞뒤로 조합할 수 있습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationMap {
    map: HashMap<String, String>,
}

impl DestinationMap {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }
}

impl Director for DestinationMap {
    fn direct(&self, parts: &mut Parts) -> Result<(), DirectorError> {
        let local_addr = ConnectionInfo::from_parts(parts)
            .ok_or(DirectorError::MissingConnectionInfo)?
            .local_addr_key();

        match self.map.get(&local_addr) {
            Some(dest) => {
                debug!(local_addr = %local_addr, host = %dest, "Map director set dest");
                Destination::from_parts_mut(parts).host = Some(dest.clone());
            }
            None => debug!(local_addr = %local_addr, "Map director no matches, skip"),
        }
        Ok(())
    }
}

/// 고정 호스트로 목적지를 설정합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticHost {
    host: String,
}

impl StaticHost {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl Director for StaticHost {
    fn direct(&self, parts: &mut Parts) -> Result<(), DirectorError> {
        Destination::from_parts_mut(parts).host = Some(self.host.clone());
        Ok(())
    }
}

/// 수신 연결과 무관하게 백엔드 스킴을 고정합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetScheme {
    scheme: Scheme,
}

impl SetScheme {
    pub fn new(scheme: Scheme) -> Self {
        Self { scheme }
    }

    pub fn http() -> Self {
        Self::new(Scheme::HTTP)
    }

    pub fn https() -> Self {
        Self::new(Scheme::HTTPS)
    }
}

impl Director for SetScheme {
    fn direct(&self, parts: &mut Parts) -> Result<(), DirectorError> {
        Destination::from_parts_mut(parts).scheme = Some(self.scheme.clone());
        Ok(())
    }
}
