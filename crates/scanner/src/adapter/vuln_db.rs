//! 취약점 DB 조회 어댑터 (OSV 형식)
//!
//! 의존성 앞쪽 최대 `max_dependencies`개만 조회하며, `chunk_size`개씩 나눠
//! 배치 요청을 보냅니다. 배치 하나가 실패하면 그 배치만 건너뜁니다.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::adapter::ScannerAdapter;
use crate::config::ScannerConfig;
use crate::error::ScannerError;
use crate::ports::{BoxFuture, VulnDbClient};
use crate::rate_limit::RateLimiter;
use crate::raw::{OsvPackage, RawFinding, VulnDbFinding, VulnDbQuery};
use crate::types::{AdapterKind, ProjectInfo, ScanOptions};

/// 취약점 DB 배치 조회 어댑터
pub struct VulnDbAdapter {
    client: Arc<dyn VulnDbClient>,
    chunk_size: usize,
    max_dependencies: usize,
    limiter: RateLimiter,
}

impl VulnDbAdapter {
    /// 새 어댑터를 생성합니다. `chunk_size`가 0이면 1로 취급합니다.
    pub fn new(
        client: Arc<dyn VulnDbClient>,
        chunk_size: usize,
        max_dependencies: usize,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            client,
            chunk_size: chunk_size.max(1),
            max_dependencies,
            limiter,
        }
    }

    /// 스캐너 설정의 한도로 어댑터를 생성합니다.
    pub fn from_config(client: Arc<dyn VulnDbClient>, config: &ScannerConfig) -> Self {
        Self::new(
            client,
            config.vuln_db_chunk_size,
            config.vuln_db_max_dependencies,
            RateLimiter::new(config.rate_limit()),
        )
    }

    async fn query(&self, project: &ProjectInfo) -> Result<Vec<RawFinding>, ScannerError> {
        let queries: Vec<VulnDbQuery> = project
            .dependencies
            .iter()
            .take(self.max_dependencies)
            .map(|d| VulnDbQuery {
                package: OsvPackage {
                    name: d.name.clone(),
                    ecosystem: d.ecosystem.osv_name().to_owned(),
                },
                version: d.version.clone(),
            })
            .collect();

        if project.dependencies.len() > self.max_dependencies {
            debug!(
                total = project.dependencies.len(),
                queried = self.max_dependencies,
                "dependency list truncated for vulnerability db query"
            );
        }

        let mut findings = Vec::new();
        for (chunk_index, chunk) in queries.chunks(self.chunk_size).enumerate() {
            self.limiter.acquire().await;
            let results = match self.client.query_batch(chunk).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(chunk = chunk_index, size = chunk.len(), error = %e, "vulnerability db chunk failed, skipping");
                    continue;
                }
            };

            if results.len() != chunk.len() {
                warn!(
                    chunk = chunk_index,
                    expected = chunk.len(),
                    actual = results.len(),
                    "vulnerability db returned mismatched result count"
                );
            }

            for (query, result) in chunk.iter().zip(results) {
                findings.extend(result.vulns.into_iter().map(|vulnerability| {
                    RawFinding::VulnDb(VulnDbFinding {
                        package: query.package.name.clone(),
                        version: query.version.clone(),
                        vulnerability,
                    })
                }));
            }
        }

        Ok(findings)
    }
}

impl ScannerAdapter for VulnDbAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::VulnDbQuery
    }

    fn run<'a>(
        &'a self,
        project: &'a ProjectInfo,
        _options: &'a ScanOptions,
    ) -> BoxFuture<'a, Result<Vec<RawFinding>, ScannerError>> {
        Box::pin(self.query(project))
    }
}
