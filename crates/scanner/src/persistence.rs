//! 메모리 기반 스캔 결과 저장소
//!
//! [`InMemoryPersistence`]는 [`PersistenceGateway`]의 로컬 구현입니다.
//! 스캔마다 `tokio::sync::Mutex`를 하나씩 두어 같은 `scan_id`에 대한 쓰기를
//! 직렬화하고, 서로 다른 스캔은 독립적으로 갱신됩니다.
//!
//! 상태 변경은 [`ScanResult::apply`]를 거치므로 종료 상태에서 되돌아가는
//! 갱신은 [`ScannerError::InvalidTransition`]으로 거부됩니다.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::error::ScannerError;
use crate::ports::{BoxFuture, PersistenceGateway};
use crate::types::{ScanProgress, ScanResult, ScanUpdate};

type Record = Arc<Mutex<ScanResult>>;

/// 메모리 기반 저장소
#[derive(Default)]
pub struct InMemoryPersistence {
    records: RwLock<HashMap<String, Record>>,
}

impl InMemoryPersistence {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 스캔 수
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// 저장소가 비어 있는지 확인합니다.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn record(&self, scan_id: &str) -> Result<Record, ScannerError> {
        self.records
            .read()
            .await
            .get(scan_id)
            .cloned()
            .ok_or_else(|| ScannerError::NotFound(scan_id.to_owned()))
    }
}

impl PersistenceGateway for InMemoryPersistence {
    fn create<'a>(&'a self, result: &'a ScanResult) -> BoxFuture<'a, Result<(), ScannerError>> {
        Box::pin(async move {
            let mut records = self.records.write().await;
            let scan_id = result.scan_id();
            if records.contains_key(scan_id) {
                return Err(ScannerError::AlreadyExists(scan_id.to_owned()));
            }
            records.insert(scan_id.to_owned(), Arc::new(Mutex::new(result.clone())));
            debug!(scan_id, status = %result.status, "scan record created");
            Ok(())
        })
    }

    fn update_by_scan_id<'a>(
        &'a self,
        scan_id: &'a str,
        update: ScanUpdate,
    ) -> BoxFuture<'a, Result<(), ScannerError>> {
        Box::pin(async move {
            let record = self.record(scan_id).await?;
            let mut result = record.lock().await;
            result.apply(update)?;
            debug!(scan_id, status = %result.status, "scan record updated");
            Ok(())
        })
    }

    fn update_progress<'a>(
        &'a self,
        scan_id: &'a str,
        progress: ScanProgress,
    ) -> BoxFuture<'a, Result<(), ScannerError>> {
        Box::pin(async move {
            let record = self.record(scan_id).await?;
            let mut result = record.lock().await;
            if result.status.is_terminal() || progress.percentage < result.progress.percentage {
                trace!(
                    scan_id,
                    status = %result.status,
                    percentage = progress.percentage,
                    "stale progress update ignored"
                );
                return Ok(());
            }
            result.progress = progress;
            Ok(())
        })
    }

    fn get<'a>(&'a self, scan_id: &'a str) -> BoxFuture<'a, Result<Option<ScanResult>, ScannerError>> {
        Box::pin(async move {
            let Some(record) = self.records.read().await.get(scan_id).cloned() else {
                return Ok(None);
            };
            let result = record.lock().await.clone();
            Ok(Some(result))
        })
    }
}
