//! 프록시 스캐너 어댑터 (A: Snyk 형식, B: Trivy 형식)
//!
//! 서버 측 엔드포인트에 스캔을 위임합니다. 2xx가 아닌 응답은 에러 대신
//! 심각도 high의 진단 결과 한 건으로 바뀌고, 2xx인데 본문을 해석할 수 없으면
//! 어댑터 에러입니다.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::adapter::ScannerAdapter;
use crate::error::ScannerError;
use crate::ports::{BoxFuture, ProxyResponse, ProxyScanEndpoint};
use crate::rate_limit::RateLimiter;
use crate::raw::{RawFinding, SnykIssue, SnykReport, TrivyReport, TrivyVulnerability};
use crate::types::{AdapterKind, ProjectInfo, ScanOptions};

/// 프록시 스캐너 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyFlavor {
    /// Snyk issue 형식 응답
    A,
    /// Trivy 보고서 형식 응답
    B,
}

impl ProxyFlavor {
    fn kind(self) -> AdapterKind {
        match self {
            Self::A => AdapterKind::ProxyScannerA,
            Self::B => AdapterKind::ProxyScannerB,
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            Self::A => "SNYK",
            Self::B => "TRIVY",
        }
    }
}

/// 프록시 스캐너 어댑터
pub struct ProxyScannerAdapter {
    flavor: ProxyFlavor,
    endpoint: Arc<dyn ProxyScanEndpoint>,
    scan_path: String,
    limiter: RateLimiter,
}

impl ProxyScannerAdapter {
    /// 새 어댑터를 생성합니다.
    pub fn new(
        flavor: ProxyFlavor,
        endpoint: Arc<dyn ProxyScanEndpoint>,
        scan_path: impl Into<String>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            flavor,
            endpoint,
            scan_path: scan_path.into(),
            limiter,
        }
    }

    async fn scan(&self, project: &ProjectInfo) -> Result<Vec<RawFinding>, ScannerError> {
        let adapter = self.flavor.kind().as_str();

        self.limiter.acquire().await;
        let response = self
            .endpoint
            .invoke(&project.repository, &self.scan_path)
            .await?;

        if !response.is_success() {
            warn!(
                adapter,
                status = response.status,
                path = %self.scan_path,
                "proxy scanner returned non-success status"
            );
            return Ok(vec![self.diagnostic(project, &response)]);
        }

        let findings: Vec<RawFinding> = match self.flavor {
            ProxyFlavor::A => {
                let report: SnykReport = serde_json::from_value(response.body)
                    .map_err(|e| ScannerError::decode(adapter, e))?;
                report
                    .vulnerabilities
                    .into_iter()
                    .map(RawFinding::ProxyA)
                    .collect()
            }
            ProxyFlavor::B => {
                let report: TrivyReport = serde_json::from_value(response.body)
                    .map_err(|e| ScannerError::decode(adapter, e))?;
                report
                    .results
                    .into_iter()
                    .flat_map(|target| target.vulnerabilities)
                    .map(RawFinding::ProxyB)
                    .collect()
            }
        };

        debug!(adapter, findings = findings.len(), "proxy scan finished");
        Ok(findings)
    }

    /// 실패 응답을 진단 결과 한 건으로 바꿉니다.
    fn diagnostic(&self, project: &ProjectInfo, response: &ProxyResponse) -> RawFinding {
        let id = format!("{}-PROXY-HTTP-{}", self.flavor.id_prefix(), response.status);
        let title = format!(
            "{} request failed with HTTP {}",
            self.flavor.kind(),
            response.status
        );
        let description = match response.body.get("message").and_then(|m| m.as_str()) {
            Some(message) => format!("{title}: {message}"),
            None => title.clone(),
        };
        let package = project.repository.locator.clone();
        let version = project.revision.clone();

        match self.flavor {
            ProxyFlavor::A => RawFinding::ProxyA(SnykIssue {
                id: Some(id),
                title: Some(title),
                description: Some(description),
                severity: Some("high".to_owned()),
                package_name: Some(package),
                version: Some(version),
                ..Default::default()
            }),
            ProxyFlavor::B => RawFinding::ProxyB(TrivyVulnerability {
                vulnerability_id: Some(id),
                title: Some(title),
                description: Some(description),
                severity: Some("HIGH".to_owned()),
                pkg_name: Some(package),
                installed_version: Some(version),
                ..Default::default()
            }),
        }
    }
}

impl ScannerAdapter for ProxyScannerAdapter {
    fn kind(&self) -> AdapterKind {
        self.flavor.kind()
    }

    fn run<'a>(
        &'a self,
        project: &'a ProjectInfo,
        _options: &'a ScanOptions,
    ) -> BoxFuture<'a, Result<Vec<RawFinding>, ScannerError>> {
        Box::pin(self.scan(project))
    }
}
