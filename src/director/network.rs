use std::net::IpAddr;

use hyper::header::{HeaderName, HeaderValue};
use hyper::http::request::Parts;
use ipnet::IpNet;
use tracing::debug;

use super::{ConnectionInfo, Director, DirectorError, NetworkMatcher};
use crate::addr::split_host_port;

/// 이름과 값이 검증된 헤더
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeader {
    pub name: HeaderName,
    pub value: HeaderValue,
}

impl HttpHeader {
    pub fn new(name: &str, value: &str) -> Result<Self, DirectorError> {
        Ok(Self {
            name: HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
                DirectorError::InvalidHeaderName {
                    name: name.to_string(),
                    source,
                }
            })?,
            value: HeaderValue::from_str(value).map_err(|source| DirectorError::InvalidHeaderValue {
                name: name.to_string(),
                value: value.to_string(),
                source,
            })?,
        })
    }
}

/// 네트워크별 헤더 적용 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMatch {
    /// 일치한 네트워크 수 (0이면 아무것도 바꾸지 않음)
    Applied(usize),
    /// 원격 주소에서 IP 호스트를 얻을 수 없어 건너뜀
    UnparsableRemoteAddr,
}

/// 클라이언트 IP가 속한 네트워크에 따라 헤더를 설정합니다.
#[derive(Debug, Clone)]
pub struct SetHeadersByNetwork {
    rules: NetworkMatcher<Vec<HttpHeader>>,
}

impl SetHeadersByNetwork {
    /// CIDR 문자열을 키로 하는 규칙들로 생성합니다.
    ///
    /// 입력 순서와 무관하게 구체성 순서로 정렬되며 CIDR 하나라도 해석에
    /// 실패하면 에러를 돌려줍니다.
    pub fn new<I, K>(rules: I) -> Result<Self, DirectorError>
    where
        I: IntoIterator<Item = (K, Vec<HttpHeader>)>,
        K: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|(network, headers)| {
                let network = network.as_ref().trim();
                let net = network.parse::<IpNet>().map_err(|source| DirectorError::InvalidNetwork {
                    network: network.to_string(),
                    source,
                })?;
                Ok((net, headers))
            })
            .collect::<Result<Vec<_>, DirectorError>>()?;

        Ok(Self {
            rules: NetworkMatcher::new(rules),
        })
    }

    /// `ip`를 포함하는 네트워크마다 `f`를 구체성 순서로 호출합니다.
    pub fn iter_by_incoming_networks<F, E>(&self, ip: IpAddr, mut f: F) -> Result<(), E>
    where
        F: FnMut(&IpNet, &[HttpHeader]) -> Result<(), E>,
    {
        for (network, headers) in self.rules.matching(ip) {
            f(network, headers)?;
        }
        Ok(())
    }

    /// 헤더를 적용하고 결과를 돌려줍니다.
    ///
    /// 연결 정보가 없으면 에러입니다. 원격 주소가 잘못된 형식이면 에러가
    /// 아니라 [`NetworkMatch::UnparsableRemoteAddr`]입니다.
    pub fn apply(&self, parts: &mut Parts) -> Result<NetworkMatch, DirectorError> {
        let info = ConnectionInfo::from_parts(parts).ok_or(DirectorError::MissingConnectionInfo)?;

        // 포트는 보지 않음
        let host = match split_host_port(&info.remote_addr) {
            Ok((host, _)) => host,
            Err(e) => {
                debug!(error = %e, remote_addr = %info.remote_addr, "Split host port error");
                return Ok(NetworkMatch::UnparsableRemoteAddr);
            }
        };
        let ip = match host.parse::<IpAddr>() {
            Ok(ip) => ip,
            Err(e) => {
                debug!(error = %e, host = %host, "Parse remote ip error");
                return Ok(NetworkMatch::UnparsableRemoteAddr);
            }
        };

        let mut matched = 0;
        for (network, headers) in self.rules.matching(ip) {
            debug!(network = %network, ip = %ip, "Set headers by network");
            for header in headers {
                parts.headers.insert(header.name.clone(), header.value.clone());
            }
            matched += 1;
        }
        Ok(NetworkMatch::Applied(matched))
    }
}

impl Director for SetHeadersByNetwork {
    fn direct(&self, parts: &mut Parts) -> Result<(), DirectorError> {
        self.apply(parts).map(|_| ())
    }
}
