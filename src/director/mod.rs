//! 디렉터 파이프라인
//!
//! 수신한 요청의 업스트림 목적지(스킴, 호스트)를 결정하고 헤더를 주입하는
//! 독립적인 재작성 단계들을 제공합니다. 각 단계는 [`Director`] 트레이트를
//! 구현하며 [`DirectorChain`]으로 순서대로 조합됩니다.

mod chain;
mod context;
mod error;
mod headers;
mod matcher;
mod network;
mod target;

pub use chain::DirectorChain;
pub use context::{ConnectionInfo, Destination};
pub use error::DirectorError;
pub use headers::{HeaderTemplate, SetHeaders};
pub use matcher::NetworkMatcher;
pub use network::{HttpHeader, NetworkMatch, SetHeadersByNetwork};
pub use target::{DestinationMap, SameIp, SetScheme, StaticHost};

use hyper::http::request::Parts;

/// 예약 토큰: 연결 식별자
pub const CONNECTION_ID: &str = "{{CONNECTION_ID}}";
/// 예약 토큰: 수신 연결의 프로토콜 (http/https)
pub const HTTP_PROTO: &str = "{{HTTP_PROTO}}";
/// 예약 토큰: 클라이언트 IP
pub const SOURCE_IP: &str = "{{SOURCE_IP}}";
/// 예약 토큰: 클라이언트 포트
pub const SOURCE_PORT: &str = "{{SOURCE_PORT}}";
/// 예약 토큰: 클라이언트 IP:포트
pub const SOURCE_IP_PORT: &str = "{{SOURCE_IP}}:{{SOURCE_PORT}}";

pub const PROTOCOL_HTTP: &str = "http";
pub const PROTOCOL_HTTPS: &str = "https";

/// TLS 여부를 알 수 없을 때 `{{HTTP_PROTO}}` 대신 설정되는 값
pub const PROTOCOL_DETECTION_ERROR: &str = "error protocol detection";

/// 요청 재작성 단계
///
/// 요청 헤드(`Parts`)의 목적지와 헤더만 수정합니다. 구현체는 생성 후
/// 불변이어야 하며 여러 요청에서 동시에 호출될 수 있습니다.
pub trait Director: Send + Sync {
    fn direct(&self, parts: &mut Parts) -> Result<(), DirectorError>;
}

impl<D: Director + ?Sized> Director for Box<D> {
    fn direct(&self, parts: &mut Parts) -> Result<(), DirectorError> {
        (**self).direct(parts)
    }
}

impl<D: Director + ?Sized> Director for std::sync::Arc<D> {
    fn direct(&self, parts: &mut Parts) -> Result<(), DirectorError> {
        (**self).direct(parts)
    }
}
