use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::debug;

/// 토큰 버킷 구현
#[derive(Debug)]
struct TokenBucket {
    /// 현재 사용 가능한 토큰 수
    tokens: f64,
    /// 마지막 업데이트 시간
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    /// 토큰을 소비하려고 시도합니다.
    fn try_consume(&mut self, rate: f64, capacity: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update);

        // 토큰 보충
        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// 토큰 버킷 저장소
///
/// 키 수가 `max_entries`에 도달하면 가장 오래 사용되지 않은 버킷을 버립니다.
#[derive(Debug, Clone)]
pub struct TokenBucketStore {
    buckets: Arc<RwLock<HashMap<String, TokenBucket>>>,
    max_entries: usize,
}

impl TokenBucketStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            max_entries: max_entries.max(1),
        }
    }

    /// 요청을 처리할 수 있는지 확인합니다.
    pub async fn check_rate(&self, key: &str, rate: f64, capacity: f64) -> bool {
        let mut buckets = self.buckets.write().await;

        if !buckets.contains_key(key) && buckets.len() >= self.max_entries {
            let oldest = buckets
                .iter()
                .min_by_key(|(_, bucket)| bucket.last_update)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!(evicted = %oldest, "토큰 버킷 캐시가 가득 차 제거");
                buckets.remove(&oldest);
            }
        }

        let bucket = buckets.entry(key.to_string()).or_insert_with(|| {
            debug!("새로운 토큰 버킷 생성: key={}, rate={}, capacity={}", key, rate, capacity);
            TokenBucket::new(capacity)
        });

        bucket.try_consume(rate, capacity)
    }


    pub async fn len(&self) -> usize {
        self.buckets.read().await.len()
    }
}
