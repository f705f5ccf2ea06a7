//! Provider Gate - 외부 서비스별 직렬화 + 최소 간격
//!
//! 한 라운드에서 여러 호출이 동시에 디스패치되므로, 같은 검색
//! 서비스(SearxNG, Kiwix)로의 요청이 한꺼번에 몰릴 수 있습니다.
//! 이 게이트는 서비스 이름별 비동기 뮤텍스로 요청을 줄 세우고,
//! 직전 요청으로부터 최소 간격이 지나기 전이면 대기합니다.

use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct GateSlot {
    lock: Arc<Mutex<Option<Instant>>>,
}

/// 외부 서비스 접근 게이트
#[derive(Clone)]
pub struct ProviderGate {
    slots: Arc<SyncMutex<HashMap<String, GateSlot>>>,
    min_interval: Duration,
}

impl Default for ProviderGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

impl ProviderGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            slots: Arc::new(SyncMutex::new(HashMap::new())),
            min_interval,
        }
    }

    /// 서비스 차례를 기다린 뒤 guard 반환
    ///
    /// guard가 살아있는 동안 같은 서비스의 다른 요청은 대기합니다.
    /// guard를 drop하는 시점이 "직전 요청 시각"이 됩니다.
    pub async fn acquire(&self, provider: &str) -> GateGuard {
        let lock = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(provider.to_string()).or_insert_with(|| GateSlot {
                lock: Arc::new(Mutex::new(None)),
            });
            Arc::clone(&slot.lock)
        };

        let guard = lock.lock_owned().await;
        if let Some(last) = *guard {
            let since = Instant::now().saturating_duration_since(last);
            if since < self.min_interval {
                tokio::time::sleep(self.min_interval - since).await;
            }
        }

        GateGuard { inner: guard }
    }
}

/// 획득된 차례
pub struct GateGuard {
    inner: tokio::sync::OwnedMutexGuard<Option<Instant>>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        *self.inner = Some(Instant::now());
    }
}
