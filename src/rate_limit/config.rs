use std::time::Duration;

/// Rate Limit 파라미터
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RateLimitParams {
    /// 시간 창마다 허용되는 요청 수 (0이면 비활성)
    pub rate_limit: u32,

    /// 측정 기간
    pub time_window: Duration,

    /// 버스트 허용량
    pub burst: u32,

    /// 추적할 클라이언트 수 상한
    pub cache_size: usize,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limit 시간 창은 0보다 커야 합니다")]
    ZeroTimeWindow,

    #[error("rate limit 캐시 크기는 0보다 커야 합니다")]
    ZeroCacheSize,
}

impl RateLimitParams {
    pub fn is_enabled(&self) -> bool {
        self.rate_limit > 0
    }

    pub fn validate(&self) -> Result<(), RateLimitError> {
        if !self.is_enabled() {
            return Ok(());
        }
        if self.time_window.is_zero() {
            return Err(RateLimitError::ZeroTimeWindow);
        }
        if self.cache_size == 0 {
            return Err(RateLimitError::ZeroCacheSize);
        }
        Ok(())
    }

    /// 초당 보충되는 토큰 수
    pub(crate) fn refill_per_sec(&self) -> f64 {
        self.rate_limit as f64 / self.time_window.as_secs_f64()
    }

    /// 버킷 용량. 버스트가 0이면 요청 하나는 허용합니다.
    pub(crate) fn capacity(&self) -> f64 {
        self.burst.max(1) as f64
    }
}
