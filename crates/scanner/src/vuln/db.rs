//! 로컬 취약점 데이터베이스
//!
//! [`LocalVulnDb`]는 디렉토리의 생태계별 JSON 파일을 읽어 메모리에 인덱싱하고,
//! 두 업스트림 포트를 오프라인으로 대신합니다.
//!
//! - [`VulnDbClient`]: OSV 형식 결과 (쿼리 순서 유지)
//! - [`DependencyRegistryClient`]: npm audit 형식 보고서
//!
//! # DB 디렉토리 구조
//!
//! ```text
//! vuln-db/
//!   cargo.json
//!   npm.json
//!   go.json
//!   pip.json
//! ```
//!
//! # JSON 형식
//!
//! ```json
//! [
//!   {
//!     "id": "GHSA-jf85-cpcp-j695",
//!     "package": "lodash",
//!     "ecosystem": "Npm",
//!     "title": "Prototype Pollution in lodash",
//!     "affected_ranges": [{ "introduced": "0.0.0", "fixed": "4.17.12" }],
//!     "fixed_version": "4.17.12",
//!     "severity": "critical",
//!     "cvss_score": 9.1,
//!     "description": "Versions of lodash before 4.17.12 are vulnerable to ...",
//!     "published": "2019-07-10"
//!   }
//! ]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use ironaudit_core::types::Severity;

use super::version;
use crate::error::ScannerError;
use crate::ports::{BoxFuture, DependencyRegistryClient, VulnDbClient};
use crate::raw::{
    NpmAdvisory, NpmCvss, NpmFixAvailable, NpmVia, NpmVulnerability, OsvAffected, OsvEvent,
    OsvPackage, OsvRange, OsvReference, OsvSeverity, OsvVulnerability, RegistryAuditReport,
    VulnDbQuery, VulnDbQueryResult,
};
use crate::types::Ecosystem;

/// 취약점 DB 파일 최대 크기 (50 MB)
const MAX_VULN_DB_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// 전체 취약점 DB 엔트리 최대 개수
const MAX_VULN_DB_ENTRIES: usize = 1_000_000;

/// 생태계별 DB 파일
const ECOSYSTEM_FILES: [(&str, Ecosystem); 4] = [
    ("cargo.json", Ecosystem::Cargo),
    ("npm.json", Ecosystem::Npm),
    ("go.json", Ecosystem::Go),
    ("pip.json", Ecosystem::Pip),
];

/// 권고 링크 기본 주소
const ADVISORY_BASE_URL: &str = "https://osv.dev/vulnerability";

/// 취약점 DB 엔트리
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnDbEntry {
    /// 권고 ID (GHSA, CVE, RUSTSEC 등)
    #[serde(alias = "cve_id")]
    pub id: String,
    /// 영향받는 패키지명
    pub package: String,
    /// 패키지 생태계
    pub ecosystem: Ecosystem,
    /// 한 줄 제목 (없으면 설명 첫 줄)
    #[serde(default)]
    pub title: Option<String>,
    /// 영향받는 버전 범위
    pub affected_ranges: Vec<VersionRange>,
    /// 수정된 버전
    #[serde(default)]
    pub fixed_version: Option<String>,
    /// 심각도
    pub severity: Severity,
    /// CVSS 점수
    #[serde(default)]
    pub cvss_score: Option<f64>,
    /// 별칭
    #[serde(default)]
    pub aliases: Vec<String>,
    /// 추가 참고 링크
    #[serde(default)]
    pub references: Vec<String>,
    /// 설명
    pub description: String,
    /// 공개 일자 (ISO 8601)
    #[serde(default)]
    pub published: Option<String>,
}

impl VulnDbEntry {
    fn title(&self) -> &str {
        self.title
            .as_deref()
            .or_else(|| self.description.lines().next())
            .unwrap_or(self.id.as_str())
    }

    fn advisory_url(&self) -> String {
        format!("{ADVISORY_BASE_URL}/{}", self.id)
    }

    /// 조회한 버전에 맞는 수정 버전 (해당 범위의 `fixed`가 우선)
    fn fixed_for(&self, version: &str) -> Option<String> {
        version::matching_range(version, &self.affected_ranges)
            .and_then(|r| r.fixed.clone())
            .or_else(|| self.fixed_version.clone())
    }

    /// OSV 형식으로 변환합니다.
    fn to_osv(&self, version: &str) -> OsvVulnerability {
        let events = version::matching_range(version, &self.affected_ranges)
            .map(|range| {
                vec![OsvEvent {
                    introduced: range.introduced.clone(),
                    fixed: self.fixed_for(version),
                }]
            })
            .unwrap_or_default();

        let mut references = vec![OsvReference {
            kind: Some("ADVISORY".to_owned()),
            url: Some(self.advisory_url()),
        }];
        references.extend(self.references.iter().map(|url| OsvReference {
            kind: Some("WEB".to_owned()),
            url: Some(url.clone()),
        }));

        OsvVulnerability {
            id: Some(self.id.clone()),
            summary: Some(self.title().to_owned()),
            details: Some(self.description.clone()),
            aliases: self.aliases.clone(),
            severity: self
                .cvss_score
                .map(|score| OsvSeverity {
                    kind: Some("CVSS_V3".to_owned()),
                    score: Some(score.to_string()),
                })
                .into_iter()
                .collect(),
            affected: vec![OsvAffected {
                package: Some(OsvPackage {
                    name: self.package.clone(),
                    ecosystem: self.ecosystem.osv_name().to_owned(),
                }),
                ranges: vec![OsvRange {
                    kind: Some("SEMVER".to_owned()),
                    events,
                }],
                versions: Vec::new(),
            }],
            references,
            database_specific: Some(json!({ "severity": self.severity.as_str() })),
        }
    }

    /// npm audit의 `via` 권고로 변환합니다.
    fn to_npm_advisory(&self) -> NpmAdvisory {
        NpmAdvisory {
            source: None,
            name: Some(self.package.clone()),
            dependency: Some(self.package.clone()),
            title: Some(self.title().to_owned()),
            url: Some(self.advisory_url()),
            severity: Some(self.severity.as_str().to_owned()),
            cwe: Vec::new(),
            cvss: self.cvss_score.map(|score| NpmCvss {
                score: Some(score),
                vector_string: None,
            }),
            range: Some(describe_ranges(&self.affected_ranges)),
        }
    }
}

/// 영향받는 버전 범위
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    /// 도입 버전 (이 버전부터 영향)
    pub introduced: Option<String>,
    /// 수정 버전 (None이면 미수정)
    pub fixed: Option<String>,
}

/// `>=1.0.0 <1.0.5 || >=2.0.0` 형식 (npm audit의 `range`)
fn describe_ranges(ranges: &[VersionRange]) -> String {
    ranges
        .iter()
        .map(|r| match (&r.introduced, &r.fixed) {
            (Some(i), Some(f)) => format!(">={i} <{f}"),
            (Some(i), None) => format!(">={i}"),
            (None, Some(f)) => format!("<{f}"),
            (None, None) => "*".to_owned(),
        })
        .collect::<Vec<_>>()
        .join(" || ")
}

/// 로컬 취약점 데이터베이스
///
/// `(package, ecosystem)` 인덱스로 조회합니다.
#[derive(Debug, Default)]
pub struct LocalVulnDb {
    entries: Vec<VulnDbEntry>,
    index: HashMap<(String, Ecosystem), Vec<usize>>,
}

impl LocalVulnDb {
    /// 빈 데이터베이스를 생성합니다.
    pub fn empty() -> Self {
        Self::default()
    }

    fn build_index(entries: &[VulnDbEntry]) -> HashMap<(String, Ecosystem), Vec<usize>> {
        let mut index: HashMap<(String, Ecosystem), Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            index
                .entry((entry.package.clone(), entry.ecosystem))
                .or_default()
                .push(idx);
        }
        index
    }

    /// 엔트리 목록으로 데이터베이스를 생성합니다.
    pub fn from_entries(entries: Vec<VulnDbEntry>) -> Self {
        let index = Self::build_index(&entries);
        Self { entries, index }
    }

    /// JSON 배열에서 데이터베이스를 파싱합니다.
    pub fn from_json(json: &str) -> Result<Self, ScannerError> {
        let entries: Vec<VulnDbEntry> = serde_json::from_str(json)
            .map_err(|e| ScannerError::VulnDbParse(format!("failed to parse vuln db JSON: {e}")))?;
        Ok(Self::from_entries(entries))
    }

    /// 디렉토리에서 생태계별 DB 파일을 모두 읽습니다. 없는 파일은 건너뜁니다.
    ///
    /// 동기 I/O입니다. async 컨텍스트에서는 [`LocalVulnDb::load`]를 쓰세요.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ScannerError> {
        let mut all_entries = Vec::new();

        for (filename, ecosystem) in &ECOSYSTEM_FILES {
            let file_path = dir.join(filename);
            let load_err = |reason: String| ScannerError::VulnDbLoad {
                path: file_path.display().to_string(),
                reason,
            };

            let metadata = match std::fs::metadata(&file_path) {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %file_path.display(), "vuln db file not found, skipping");
                    continue;
                }
                Err(e) => return Err(load_err(e.to_string())),
            };

            if metadata.len() > MAX_VULN_DB_FILE_SIZE {
                return Err(load_err(format!(
                    "file size {} bytes exceeds maximum {MAX_VULN_DB_FILE_SIZE} bytes",
                    metadata.len()
                )));
            }

            let content = std::fs::read_to_string(&file_path).map_err(|e| load_err(e.to_string()))?;
            let entries: Vec<VulnDbEntry> = serde_json::from_str(&content).map_err(|e| {
                ScannerError::VulnDbParse(format!("failed to parse {}: {e}", file_path.display()))
            })?;

            let mismatched = entries.iter().filter(|e| e.ecosystem != *ecosystem).count();
            if mismatched > 0 {
                warn!(
                    path = %file_path.display(),
                    expected = %ecosystem,
                    mismatched,
                    "entries with a different ecosystem than the file name"
                );
            }

            if all_entries.len() + entries.len() > MAX_VULN_DB_ENTRIES {
                warn!(
                    current = all_entries.len(),
                    new = entries.len(),
                    max = MAX_VULN_DB_ENTRIES,
                    "vulnerability database entry limit reached, truncating"
                );
                let remaining = MAX_VULN_DB_ENTRIES.saturating_sub(all_entries.len());
                all_entries.extend(entries.into_iter().take(remaining));
                break;
            }

            info!(path = %file_path.display(), entries = entries.len(), "loaded vuln db file");
            all_entries.extend(entries);
        }

        Ok(Self::from_entries(all_entries))
    }

    /// [`LocalVulnDb::load_from_dir`]를 blocking 스레드에서 실행합니다.
    pub async fn load(dir: impl Into<PathBuf>) -> Result<Self, ScannerError> {
        let dir = dir.into();
        let display = dir.display().to_string();
        tokio::task::spawn_blocking(move || Self::load_from_dir(&dir))
            .await
            .map_err(|e| ScannerError::VulnDbLoad {
                path: display,
                reason: format!("load task failed: {e}"),
            })?
    }

    /// 전체 엔트리 수
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// 패키지 이름과 생태계로 엔트리를 조회합니다.
    pub fn lookup(&self, package: &str, ecosystem: Ecosystem) -> Vec<&VulnDbEntry> {
        self.index
            .get(&(package.to_owned(), ecosystem))
            .map(|indices| indices.iter().filter_map(|&i| self.entries.get(i)).collect())
            .unwrap_or_default()
    }

    /// 주어진 버전에 영향을 주는 엔트리만 반환합니다.
    pub fn affecting(&self, package: &str, version: &str, ecosystem: Ecosystem) -> Vec<&VulnDbEntry> {
        self.lookup(package, ecosystem)
            .into_iter()
            .filter(|e| version::is_affected(version, &e.affected_ranges))
            .collect()
    }

    fn query_one(&self, query: &VulnDbQuery) -> VulnDbQueryResult {
        let Some(ecosystem) = Ecosystem::from_str_loose(&query.package.ecosystem) else {
            debug!(ecosystem = %query.package.ecosystem, "unknown ecosystem in query");
            return VulnDbQueryResult::default();
        };
        VulnDbQueryResult {
            vulns: self
                .affecting(&query.package.name, &query.version, ecosystem)
                .into_iter()
                .map(|e| e.to_osv(&query.version))
                .collect(),
        }
    }

    /// npm 의존성 맵을 감사하여 npm audit(v2) 형식 보고서를 만듭니다.
    pub fn audit_npm(&self, dependencies: &BTreeMap<String, String>) -> RegistryAuditReport {
        let mut vulnerabilities = BTreeMap::new();

        for (name, installed) in dependencies {
            let matches = self.affecting(name, installed, Ecosystem::Npm);
            let Some(worst) = matches.iter().map(|e| e.severity).max() else {
                continue;
            };

            // 가장 높은 수정 버전이 모든 권고를 해소
            let fix = matches
                .iter()
                .filter_map(|e| e.fixed_for(installed))
                .max_by(|a, b| compare_versions(a, b));
            let fix_available = fix.map(|version| NpmFixAvailable::Fix {
                name: name.clone(),
                is_semver_major: is_major_bump(installed, &version),
                version,
            });

            vulnerabilities.insert(
                name.clone(),
                NpmVulnerability {
                    name: Some(name.clone()),
                    severity: Some(worst.as_str().to_owned()),
                    is_direct: true,
                    via: matches
                        .iter()
                        .map(|e| NpmVia::Advisory(e.to_npm_advisory()))
                        .collect(),
                    range: Some(
                        matches
                            .iter()
                            .map(|e| describe_ranges(&e.affected_ranges))
                            .collect::<Vec<_>>()
                            .join(" || "),
                    ),
                    nodes: vec![format!("node_modules/{name}")],
                    fix_available: Some(fix_available.unwrap_or(NpmFixAvailable::Flag(false))),
                },
            );
        }

        RegistryAuditReport {
            audit_report_version: Some(2),
            vulnerabilities,
        }
    }
}

fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    match (version::parse_lenient(a), version::parse_lenient(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

fn is_major_bump(installed: &str, fixed: &str) -> bool {
    match (version::parse_lenient(installed), version::parse_lenient(fixed)) {
        (Some(i), Some(f)) => f.major > i.major,
        _ => false,
    }
}

impl VulnDbClient for LocalVulnDb {
    fn query_batch<'a>(
        &'a self,
        queries: &'a [VulnDbQuery],
    ) -> BoxFuture<'a, Result<Vec<VulnDbQueryResult>, ScannerError>> {
        Box::pin(async move { Ok(queries.iter().map(|q| self.query_one(q)).collect()) })
    }
}

impl DependencyRegistryClient for LocalVulnDb {
    fn audit<'a>(
        &'a self,
        dependencies: &'a BTreeMap<String, String>,
    ) -> BoxFuture<'a, Result<RegistryAuditReport, ScannerError>> {
        Box::pin(async move { Ok(self.audit_npm(dependencies)) })
    }
}
