//! Blocking Wrapper - 동기 컨텍스트용 실행기
//!
//! await할 수 없는 호출자(동기 CLI 유틸리티, FFI 경계 등)를 위해
//! 전용 워커 스레드에서 현재-스레드 런타임을 만들어 future를 끝까지
//! 실행합니다. 호출자의 이벤트 루프 안에서 또 다른 루프를 중첩하지
//! 않습니다.

use driftwood_foundation::{Error, Result};
use std::future::Future;

/// future를 전용 스레드에서 완료까지 실행
pub fn run_blocking<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let handle = std::thread::Builder::new()
        .name("driftwood-blocking".to_string())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| Error::Internal(format!("failed to build runtime: {}", e)))?;
            runtime.block_on(future)
        })
        .map_err(|e| Error::Internal(format!("failed to spawn worker thread: {}", e)))?;

    handle
        .join()
        .map_err(|_| Error::Internal("blocking worker thread panicked".to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_future_to_completion() {
        let result = run_blocking(async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            Ok(21 * 2)
        })
        .unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn test_propagates_error() {
        let err = run_blocking::<_, ()>(async { Err(Error::Internal("boom".into())) }).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
