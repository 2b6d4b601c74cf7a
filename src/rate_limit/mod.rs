//! 요청 속도 제한
//!
//! 트랜스포트가 요청을 전달하기 전에 클라이언트별로 허용 여부를 묻는
//! 승인 제어 컴포넌트를 제공합니다.

mod config;
pub mod store;

pub use config::{RateLimitError, RateLimitParams};
pub use store::TokenBucketStore;

use async_trait::async_trait;
use tracing::debug;

/// 승인 제어 트레이트
///
/// 트랜스포트는 구현 방식을 모른 채 키(클라이언트 IP)별 허용 여부만 묻습니다.
#[async_trait]
pub trait AdmissionControl: Send + Sync {
    /// 요청을 허용하면 `true`
    async fn admit(&self, key: &str) -> bool;
}

/// 토큰 버킷 기반 속도 제한기
#[derive(Debug, Clone)]
pub struct RateLimiter {
    params: RateLimitParams,
    store: Option<TokenBucketStore>,
}

impl RateLimiter {
    /// 파라미터를 검증하고 제한기를 만듭니다. `rate_limit`이 0이면 제한하지 않습니다.
    pub fn new(params: RateLimitParams) -> Result<Self, RateLimitError> {
        params.validate()?;

        let store = if params.is_enabled() {
            Some(TokenBucketStore::new(params.cache_size))
        } else {
            None
        };

        Ok(Self { params, store })
    }

    pub fn params(&self) -> &RateLimitParams {
        &self.params
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }
}

#[async_trait]
impl AdmissionControl for RateLimiter {
    async fn admit(&self, key: &str) -> bool {
        let Some(store) = &self.store else {
            return true;
        };

        let allowed = store
            .check_rate(key, self.params.refill_per_sec(), self.params.capacity())
            .await;
        if !allowed {
            debug!(client = %key, "Rate limit exceeded");
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_disabled_limiter_admits_everything() {
        let limiter = RateLimiter::new(RateLimitParams::default()).unwrap();
        assert!(!limiter.is_enabled());
        for _ in 0..1000 {
            assert!(limiter.admit("1.2.3.4").await);
        }
    }

    #[tokio::test]
    async fn test_limiter_rejects_after_burst() {
        let limiter = RateLimiter::new(RateLimitParams {
            rate_limit: 1,
            time_window: Duration::from_secs(3600),
            burst: 2,
            cache_size: 10,
        })
        .unwrap();

        assert!(limiter.admit("1.2.3.4").await);
        assert!(limiter.admit("1.2.3.4").await);
        assert!(!limiter.admit("1.2.3.4").await);

        // 다른 클라이언트는 별도 버킷
        assert!(limiter.admit("5.6.7.8").await);
    }
}
