use std::net::SocketAddr;

use hyper::http::request::Parts;
use hyper::http::uri::Scheme;

use crate::addr::canonical_socket_addr;

/// 요청 범위 연결 메타데이터
///
/// 리스너가 연결을 수락할 때 만들어 요청 extensions에 넣습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// 연결을 수락한 로컬 소켓 주소
    pub local_addr: SocketAddr,
    /// 원격 주소 텍스트 (`ip:port`, 잘못된 형식일 수 있음)
    pub remote_addr: String,
    /// 상위 계층에서 부여한 연결 식별자
    pub connection_id: String,
    /// TLS 연결 여부. `None`이면 판별 불가
    pub tls: Option<bool>,
}

impl ConnectionInfo {
    pub fn new(local_addr: SocketAddr, remote_addr: impl Into<String>) -> Self {
        Self {
            local_addr,
            remote_addr: remote_addr.into(),
            connection_id: String::new(),
            tls: None,
        }
    }

    pub fn with_connection_id(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = connection_id.into();
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn from_parts(parts: &Parts) -> Option<&Self> {
        parts.extensions.get::<Self>()
    }

    /// 목적지 맵 조회에 쓰이는 로컬 주소 문자열 (IPv4-mapped 주소는 IPv4로 표시)
    pub fn local_addr_key(&self) -> String {
        canonical_socket_addr(self.local_addr).to_string()
    }
}

/// 업스트림 목적지. 디렉터들이 채우고 트랜스포트가 읽습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destination {
    pub scheme: Option<Scheme>,
    /// `host:port`
    pub host: Option<String>,
}

impl Destination {
    pub fn from_parts(parts: &Parts) -> Option<&Self> {
        parts.extensions.get::<Self>()
    }

    pub(crate) fn from_parts_mut(parts: &mut Parts) -> &mut Self {
        parts.extensions.get_or_insert_default::<Self>()
    }
}
