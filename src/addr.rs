//! 소켓 주소 문자열 처리
//!
//! 설정 라인과 요청의 원격 주소는 `host:port` 텍스트로 들어옵니다.
//! 호스트 부분은 비어 있거나(와일드카드), IP 리터럴이거나, 이름일 수 있습니다.

use std::fmt;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddrError {
    #[error("{0}: 포트 누락")]
    MissingPort(String),

    #[error("{0}: 콜론이 너무 많음")]
    TooManyColons(String),

    #[error("{0}: ']' 누락")]
    MissingBracket(String),

    #[error("{addr}: 유효하지 않은 포트 {port}")]
    InvalidPort { addr: String, port: String },

    #[error("{host}: 주소 조회 실패: {reason}")]
    Lookup { host: String, reason: String },
}

/// `host:port`를 호스트와 포트로 나눕니다.
///
/// IPv6 호스트는 `[::1]:80`처럼 대괄호로 감싸야 하며 반환되는 호스트에는
/// 대괄호가 포함되지 않습니다.
pub fn split_host_port(addr: &str) -> Result<(&str, &str), AddrError> {
    if let Some(rest) = addr.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| AddrError::MissingBracket(addr.to_string()))?;
        let host = &rest[..end];
        let port = rest[end + 1..]
            .strip_prefix(':')
            .ok_or_else(|| AddrError::MissingPort(addr.to_string()))?;
        if port.contains(':') {
            return Err(AddrError::TooManyColons(addr.to_string()));
        }
        return Ok((host, port));
    }

    let idx = addr
        .rfind(':')
        .ok_or_else(|| AddrError::MissingPort(addr.to_string()))?;
    let host = &addr[..idx];
    if host.contains(':') {
        return Err(AddrError::TooManyColons(addr.to_string()));
    }
    if host.contains(']') {
        return Err(AddrError::MissingBracket(addr.to_string()));
    }
    Ok((host, &addr[idx + 1..]))
}

/// IPv4-mapped IPv6 주소를 IPv4로 정규화합니다.
pub fn canonical_socket_addr(addr: SocketAddr) -> SocketAddr {
    SocketAddr::new(addr.ip().to_canonical(), addr.port())
}

/// 해석된 TCP 주소. 호스트가 비어 있으면 `ip`는 `None`입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpTarget {
    pub ip: Option<IpAddr>,
    pub port: u16,
}

impl fmt::Display for TcpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            Some(ip) => write!(f, "{}", SocketAddr::new(ip, self.port)),
            None => write!(f, ":{}", self.port),
        }
    }
}

/// `host:port`를 TCP 주소로 해석합니다. 이름은 DNS로 조회합니다.
pub fn resolve_tcp_addr(addr: &str) -> Result<TcpTarget, AddrError> {
    let (host, port) = split_host_port(addr)?;
    let port = parse_port(addr, port)?;
    if host.is_empty() {
        return Ok(TcpTarget { ip: None, port });
    }
    let ip = resolve_host(host)?;
    Ok(TcpTarget { ip: Some(ip), port })
}

/// 포트 없는 IP 또는 호스트 이름을 해석합니다.
pub fn resolve_ip_addr(host: &str) -> Result<IpAddr, AddrError> {
    resolve_host(host.trim_start_matches('[').trim_end_matches(']'))
}

fn parse_port(addr: &str, port: &str) -> Result<u16, AddrError> {
    if port.is_empty() {
        return Ok(0);
    }
    port.parse().map_err(|_| AddrError::InvalidPort {
        addr: addr.to_string(),
        port: port.to_string(),
    })
}

fn resolve_host(host: &str) -> Result<IpAddr, AddrError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip.to_canonical());
    }
    if host.is_empty() {
        return Err(AddrError::Lookup {
            host: host.to_string(),
            reason: "빈 호스트".to_string(),
        });
    }

    let addrs: Vec<SocketAddr> = (host, 0)
        .to_socket_addrs()
        .map_err(|e| AddrError::Lookup {
            host: host.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    // IPv4 우선
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(|a| a.ip().to_canonical())
        .ok_or_else(|| AddrError::Lookup {
            host: host.to_string(),
            reason: "주소 없음".to_string(),
        })
}
