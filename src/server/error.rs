use crate::addr::AddrError;
use crate::proxy::{ConfigError, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("설정 오류: {0}")]
    Config(#[from] ConfigError),

    #[error("수신 주소 {addr} 오류: {source}")]
    ListenAddr {
        addr: String,
        #[source]
        source: AddrError,
    },

    #[error("포트 바인딩 실패 {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("업스트림 클라이언트 생성 실패: {0}")]
    Transport(#[from] TransportError),

    #[error("IO 오류: {0}")]
    Io(#[from] std::io::Error),

    #[error("리스너 태스크 실패: {0}")]
    Join(#[from] tokio::task::JoinError),
}
