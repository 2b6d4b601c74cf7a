//! 리버스 프록시 조립
//!
//! [`ProxyConfig`]를 적용해 디렉터 체인과 트랜스포트를 구성합니다.
//! 활성 체인은 `ArcSwap`으로 보관되어 재적용 시 원자적으로 교체됩니다.

mod config;
mod tls;
mod transport;

pub use config::{ConfigError, ProxyConfig};
pub use transport::{HttpClient, Transport, TransportError};

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tracing::info;

use crate::director::DirectorChain;

pub struct HttpProxy {
    director: ArcSwap<DirectorChain>,
    pub transport: Transport,
    pub enable_access_log: bool,
    /// keep-alive 연결의 유휴 제한 시간 (0이면 제한 없음)
    pub idle_timeout: Duration,
}

impl HttpProxy {
    pub fn new() -> Self {
        Self {
            director: ArcSwap::from_pointee(DirectorChain::default()),
            transport: Transport::default(),
            enable_access_log: false,
            idle_timeout: Duration::ZERO,
        }
    }

    /// 현재 활성 체인. 반환된 체인은 교체와 무관하게 끝까지 유효합니다.
    pub fn director(&self) -> Arc<DirectorChain> {
        self.director.load_full()
    }

    pub fn set_director(&self, chain: DirectorChain) {
        self.director.store(Arc::new(chain));
    }

    /// 디렉터 체인만 다시 구성해 교체합니다. 실패하면 기존 체인을 유지합니다.
    pub fn reload(&self, config: &ProxyConfig) -> Result<(), ConfigError> {
        let chain = config.build_director_chain()?;
        info!(directors = chain.len(), "디렉터 체인 교체");
        self.set_director(chain);
        Ok(())
    }
}

impl Default for HttpProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProxy")
            .field("directors", &self.director.load().len())
            .field("transport", &self.transport)
            .field("enable_access_log", &self.enable_access_log)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
