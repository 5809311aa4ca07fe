//! 스캐너 어댑터 -- 취약점 출처 하나당 하나
//!
//! 모든 어댑터는 같은 계약 [`ScannerAdapter`]를 구현합니다. 어댑터는 호출마다
//! 상태를 남기지 않으며, 업스트림 요청은 인스턴스마다 주입된 [`RateLimiter`]로
//! 간격을 맞춥니다.
//!
//! | 어댑터 | 출처 | 업스트림 |
//! |---|---|---|
//! | [`RegistryAuditAdapter`] | `registry-audit` | [`DependencyRegistryClient`](crate::ports::DependencyRegistryClient) |
//! | [`VulnDbAdapter`] | `vuln-db` | [`VulnDbClient`](crate::ports::VulnDbClient) |
//! | [`ProxyScannerAdapter`] | `snyk` / `trivy` | [`ProxyScanEndpoint`](crate::ports::ProxyScanEndpoint) |
//! | [`WorkflowAdapter`] | `workflow` | [`ContentClient`](crate::ports::ContentClient) |
//! | [`ContainerAdapter`] | `container` | [`ContentClient`](crate::ports::ContentClient) |
//! | [`CodePatternAdapter`] | `code-pattern` | [`ContentClient`](crate::ports::ContentClient) |
//!
//! [`RateLimiter`]: crate::rate_limit::RateLimiter

pub mod code_pattern;
pub mod container;
pub mod proxy;
pub mod registry_audit;
pub mod vuln_db;
pub mod workflow;

use std::sync::Arc;

use ironaudit_core::types::Severity;

use crate::config::ScannerConfig;
use crate::error::ScannerError;
use crate::ports::{BoxFuture, ContentClient, DependencyRegistryClient, VulnDbClient};
use crate::rate_limit::RateLimiter;
use crate::raw::{LocalFinding, RawFinding};
use crate::types::{AdapterKind, ProjectInfo, ScanOptions};

pub use code_pattern::CodePatternAdapter;
pub use container::ContainerAdapter;
pub use proxy::{ProxyFlavor, ProxyScannerAdapter};
pub use registry_audit::RegistryAuditAdapter;
pub use vuln_db::VulnDbAdapter;
pub use workflow::WorkflowAdapter;

/// 스캐너 어댑터 공통 계약
pub trait ScannerAdapter: Send + Sync {
    /// 어댑터 종류 (실행 단계와 출처 태그를 결정)
    fn kind(&self) -> AdapterKind;

    /// 프로젝트를 검사하여 원시 결과를 반환합니다.
    ///
    /// 실패는 오케스트레이터가 잡아 빈 결과로 대체합니다.
    fn run<'a>(
        &'a self,
        project: &'a ProjectInfo,
        options: &'a ScanOptions,
    ) -> BoxFuture<'a, Result<Vec<RawFinding>, ScannerError>>;
}

/// 프록시 스캐너를 제외한 기본 어댑터 묶음을 만듭니다.
///
/// 어댑터마다 설정 간격의 [`RateLimiter`]를 따로 가집니다. 프록시 엔드포인트는
/// 배포 환경마다 달라 [`ProxyScannerAdapter::new`]로 따로 등록합니다.
pub fn standard_adapters(
    content: Arc<dyn ContentClient>,
    registry: Arc<dyn DependencyRegistryClient>,
    vuln_db: Arc<dyn VulnDbClient>,
    config: &ScannerConfig,
) -> Result<Vec<Box<dyn ScannerAdapter>>, ScannerError> {
    let limiter = || RateLimiter::new(config.rate_limit());
    Ok(vec![
        Box::new(RegistryAuditAdapter::new(registry, limiter())),
        Box::new(VulnDbAdapter::from_config(vuln_db, config)),
        Box::new(WorkflowAdapter::new(Arc::clone(&content), limiter())),
        Box::new(ContainerAdapter::new(Arc::clone(&content), limiter())),
        Box::new(CodePatternAdapter::from_config(content, config)?),
    ])
}

/// 로컬 분석기 결과를 만듭니다.
pub(crate) fn local_finding(
    id: impl Into<String>,
    title: impl Into<String>,
    description: impl Into<String>,
    severity: Severity,
    package: impl Into<String>,
    version: impl Into<String>,
) -> LocalFinding {
    LocalFinding {
        id: id.into(),
        title: title.into(),
        description: description.into(),
        severity,
        package: package.into(),
        version: version.into(),
        references: Vec::new(),
    }
}

/// 파일 내용을 UTF-8 문자열로 읽습니다 (잘못된 바이트는 대체 문자).
pub(crate) fn text_of(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
