//! 패키지 레지스트리 감사 어댑터 (npm audit)

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::adapter::ScannerAdapter;
use crate::error::ScannerError;
use crate::ports::{BoxFuture, DependencyRegistryClient};
use crate::rate_limit::RateLimiter;
use crate::raw::{RawFinding, RegistryAuditFinding};
use crate::types::{AdapterKind, Ecosystem, ProjectInfo, ScanOptions};

/// npm 의존성 전체를 한 번의 감사 요청으로 검사합니다.
pub struct RegistryAuditAdapter {
    client: Arc<dyn DependencyRegistryClient>,
    limiter: RateLimiter,
}

impl RegistryAuditAdapter {
    /// 새 어댑터를 생성합니다.
    pub fn new(client: Arc<dyn DependencyRegistryClient>, limiter: RateLimiter) -> Self {
        Self { client, limiter }
    }

    async fn audit(&self, project: &ProjectInfo) -> Result<Vec<RawFinding>, ScannerError> {
        let dependencies: BTreeMap<String, String> = project
            .dependencies_in(Ecosystem::Npm)
            .map(|d| (d.name.clone(), d.version.clone()))
            .collect();

        if dependencies.is_empty() {
            debug!("no npm dependencies, skipping registry audit");
            return Ok(Vec::new());
        }

        self.limiter.acquire().await;
        let report = self.client.audit(&dependencies).await?;

        let findings = report
            .vulnerabilities
            .into_iter()
            .map(|(package, vulnerability)| {
                let installed_version = dependencies.get(&package).cloned();
                RawFinding::RegistryAudit(RegistryAuditFinding {
                    package,
                    installed_version,
                    vulnerability,
                })
            })
            .collect::<Vec<_>>();

        debug!(
            dependencies = dependencies.len(),
            findings = findings.len(),
            "registry audit finished"
        );
        Ok(findings)
    }
}

impl ScannerAdapter for RegistryAuditAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::DependencyAudit
    }

    fn run<'a>(
        &'a self,
        project: &'a ProjectInfo,
        _options: &'a ScanOptions,
    ) -> BoxFuture<'a, Result<Vec<RawFinding>, ScannerError>> {
        Box::pin(self.audit(project))
    }
}
