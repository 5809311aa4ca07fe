//! 외부 경계 trait
//!
//! 오케스트레이터와 어댑터는 업스트림 서비스(GitHub, 레지스트리, OSV, 프록시
//! 엔드포인트, 결과 저장소)를 이 trait들로만 만납니다. 어댑터 목록을
//! `Vec<Box<dyn ...>>`처럼 동적으로 다뤄야 하므로 모든 메서드는 [`BoxFuture`]를
//! 반환합니다.
//!
//! 로컬 구현은 [`crate::local`], [`crate::vuln`], [`crate::persistence`]에 있습니다.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::ScannerError;
use crate::raw::{RegistryAuditReport, VulnDbQuery, VulnDbQueryResult};
use crate::types::{ProjectInfo, RepositoryRef, ScanProgress, ScanResult, ScanUpdate};

/// `Send` 가능한 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 저장소 구조 분석기
///
/// 실패하면 스캔 전체가 `failed`로 끝납니다.
pub trait ProjectAnalyzer: Send + Sync {
    /// 저장소를 분석하여 생태계, 의존성, 부가 파일 존재 여부를 반환합니다.
    fn analyze<'a>(
        &'a self,
        repository: &'a RepositoryRef,
    ) -> BoxFuture<'a, Result<ProjectInfo, ScannerError>>;
}

/// 패키지 레지스트리 감사 클라이언트 (npm audit)
pub trait DependencyRegistryClient: Send + Sync {
    /// 패키지명 -> 버전 맵 전체를 한 번에 감사합니다.
    fn audit<'a>(
        &'a self,
        dependencies: &'a BTreeMap<String, String>,
    ) -> BoxFuture<'a, Result<RegistryAuditReport, ScannerError>>;
}

/// 취약점 DB 배치 조회 클라이언트
pub trait VulnDbClient: Send + Sync {
    /// 쿼리 순서와 같은 순서로 결과를 반환합니다.
    ///
    /// 호출자가 배치 크기를 나누므로 구현은 받은 쿼리를 한 번에 처리합니다.
    fn query_batch<'a>(
        &'a self,
        queries: &'a [VulnDbQuery],
    ) -> BoxFuture<'a, Result<Vec<VulnDbQueryResult>, ScannerError>>;
}

/// 프록시 스캐너 엔드포인트 응답
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    /// HTTP 상태 코드
    pub status: u16,
    /// 응답 본문
    pub body: serde_json::Value,
}

impl ProxyResponse {
    /// 2xx 여부
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 서버 측 프록시 스캐너 엔드포인트
pub trait ProxyScanEndpoint: Send + Sync {
    /// `scan_path`로 저장소 스캔을 요청합니다.
    ///
    /// 전송 자체가 실패한 경우에만 `Err`를 반환하며, 2xx가 아닌 응답은
    /// `Ok(ProxyResponse)`로 돌려줍니다.
    fn invoke<'a>(
        &'a self,
        repository: &'a RepositoryRef,
        scan_path: &'a str,
    ) -> BoxFuture<'a, Result<ProxyResponse, ScannerError>>;
}

/// 디렉토리 항목 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// 파일
    File,
    /// 디렉토리
    Dir,
}

/// 디렉토리 항목
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// 파일 이름
    pub name: String,
    /// 저장소 루트 기준 경로
    pub path: String,
    /// 종류
    pub kind: EntryKind,
}

/// 저장소 파일 내용 조회
pub trait ContentClient: Send + Sync {
    /// 디렉토리 목록을 반환합니다. 디렉토리가 없으면 `None`입니다.
    fn list_directory<'a>(
        &'a self,
        repository: &'a RepositoryRef,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<DirectoryEntry>>, ScannerError>>;

    /// 파일 내용을 반환합니다. 파일이 없으면 `None`입니다.
    fn get_file<'a>(
        &'a self,
        repository: &'a RepositoryRef,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Option<Bytes>, ScannerError>>;
}

/// 스캔 결과 저장소
pub trait PersistenceGateway: Send + Sync {
    /// 새 스캔 레코드를 만듭니다.
    fn create<'a>(&'a self, result: &'a ScanResult) -> BoxFuture<'a, Result<(), ScannerError>>;

    /// 스캔 레코드를 부분 갱신합니다.
    fn update_by_scan_id<'a>(
        &'a self,
        scan_id: &'a str,
        update: ScanUpdate,
    ) -> BoxFuture<'a, Result<(), ScannerError>>;

    /// 진행률만 갱신합니다.
    fn update_progress<'a>(
        &'a self,
        scan_id: &'a str,
        progress: ScanProgress,
    ) -> BoxFuture<'a, Result<(), ScannerError>>;

    /// 스캔 레코드를 조회합니다.
    fn get<'a>(&'a self, scan_id: &'a str) -> BoxFuture<'a, Result<Option<ScanResult>, ScannerError>>;
}
