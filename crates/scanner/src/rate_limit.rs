//! 업스트림 요청 간격 제한
//!
//! [`RateLimiter`]는 `governor` 토큰 버킷 위에서 최소 간격마다 한 번의 요청만
//! 허용합니다. 어댑터 인스턴스마다 하나씩 주입되며 서로 공유하지 않습니다.

use std::fmt;
use std::time::Duration;

use governor::{
    Quota, RateLimiter as GovernorRateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};

type DirectLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// 고정 최소 간격 제한기
///
/// 간격이 0이면 내부 제한기 없이 즉시 통과합니다.
pub struct RateLimiter {
    min_interval: Duration,
    inner: Option<DirectLimiter>,
}

impl RateLimiter {
    /// 최소 간격으로 제한기를 생성합니다.
    pub fn new(min_interval: Duration) -> Self {
        // burst 1: 간격마다 셀 하나만 보충
        let inner = Quota::with_period(min_interval).map(GovernorRateLimiter::direct);
        Self {
            min_interval: if inner.is_some() { min_interval } else { Duration::ZERO },
            inner,
        }
    }

    /// 제한 없는 제한기
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// 설정된 최소 간격
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// 다음 요청을 보내도 될 때까지 기다립니다.
    pub async fn acquire(&self) {
        if let Some(inner) = &self.inner {
            inner.until_ready().await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("min_interval", &self.min_interval)
            .field("limited", &self.inner.is_some())
            .finish()
    }
}
