//! 출처별 원시 결과 형식
//!
//! 각 업스트림이 돌려주는 JSON 모양을 그대로 옮긴 타입입니다. 필드는 대부분
//! `Option`이며, 모양이 조금씩 다른 응답도 역직렬화에 실패하지 않도록
//! `#[serde(default)]`를 넉넉하게 사용합니다.
//!
//! 정규화는 [`crate::normalize`]에서 [`RawFinding`]의 변형별로 수행됩니다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ironaudit_core::types::Severity;

/// 어댑터 한 번의 실행이 만들어내는 원시 결과 한 건
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "finding", rename_all = "kebab-case")]
pub enum RawFinding {
    /// 패키지 레지스트리 감사 (npm audit 형식)
    RegistryAudit(RegistryAuditFinding),
    /// 취약점 DB (OSV 형식)
    VulnDb(VulnDbFinding),
    /// 프록시 스캐너 A (Snyk issue 형식)
    ProxyA(SnykIssue),
    /// 프록시 스캐너 B (Trivy 형식)
    ProxyB(TrivyVulnerability),
    /// CI 워크플로 분석
    Workflow(LocalFinding),
    /// 컨테이너 설정 분석
    Container(LocalFinding),
    /// 코드 패턴 분석
    CodePattern(LocalFinding),
}

// ─── npm audit ───────────────────────────────────────────────────────

/// npm audit (v2) 보고서
///
/// ```json
/// { "auditReportVersion": 2, "vulnerabilities": { "lodash": { ... } } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryAuditReport {
    /// 보고서 버전
    #[serde(default)]
    pub audit_report_version: Option<u32>,
    /// 패키지명 -> 취약점 항목
    #[serde(default)]
    pub vulnerabilities: BTreeMap<String, NpmVulnerability>,
}

/// npm audit의 패키지별 항목
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpmVulnerability {
    /// 패키지 이름
    #[serde(default)]
    pub name: Option<String>,
    /// 심각도 문자열 (`low`, `moderate`, `high`, `critical`)
    #[serde(default)]
    pub severity: Option<String>,
    /// 직접 의존성 여부
    #[serde(default)]
    pub is_direct: bool,
    /// 원인: 권고 객체 또는 다른 패키지 이름
    #[serde(default)]
    pub via: Vec<NpmVia>,
    /// 영향받는 버전 범위
    #[serde(default)]
    pub range: Option<String>,
    /// 설치 경로
    #[serde(default)]
    pub nodes: Vec<String>,
    /// 수정 가능 여부
    #[serde(default)]
    pub fix_available: Option<NpmFixAvailable>,
}

/// `via` 배열의 원소
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NpmVia {
    /// 권고 객체
    Advisory(NpmAdvisory),
    /// 전이 원인 패키지 이름
    Package(String),
}

/// npm 보안 권고
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NpmAdvisory {
    /// 권고 번호
    #[serde(default)]
    pub source: Option<u64>,
    /// 패키지 이름
    #[serde(default)]
    pub name: Option<String>,
    /// 의존 패키지 이름
    #[serde(default)]
    pub dependency: Option<String>,
    /// 제목
    #[serde(default)]
    pub title: Option<String>,
    /// 권고 URL
    #[serde(default)]
    pub url: Option<String>,
    /// 심각도
    #[serde(default)]
    pub severity: Option<String>,
    /// CWE 목록
    #[serde(default)]
    pub cwe: Vec<String>,
    /// CVSS 정보
    #[serde(default)]
    pub cvss: Option<NpmCvss>,
    /// 영향 범위
    #[serde(default)]
    pub range: Option<String>,
}

/// npm 권고의 CVSS 정보
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpmCvss {
    /// 점수
    #[serde(default)]
    pub score: Option<f64>,
    /// 벡터 문자열
    #[serde(default)]
    pub vector_string: Option<String>,
}

/// `fixAvailable`: `true`/`false` 또는 수정 버전 정보
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NpmFixAvailable {
    /// 단순 플래그
    Flag(bool),
    /// 구체적인 수정 정보
    Fix {
        /// 수정 패키지 이름
        name: String,
        /// 수정 버전
        version: String,
        /// 메이저 업그레이드 필요 여부
        #[serde(default, rename = "isSemVerMajor")]
        is_semver_major: bool,
    },
}

/// 레지스트리 감사 결과 한 건 (설치 버전을 덧붙인 것)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryAuditFinding {
    /// 보고서의 키 (패키지 이름)
    pub package: String,
    /// 잠금 파일의 설치 버전
    pub installed_version: Option<String>,
    /// 원본 항목
    pub vulnerability: NpmVulnerability,
}

// ─── OSV ─────────────────────────────────────────────────────────────

/// OSV 배치 쿼리 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnDbQuery {
    /// 패키지
    pub package: OsvPackage,
    /// 버전
    pub version: String,
}

/// OSV 패키지 식별자
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsvPackage {
    /// 패키지 이름
    #[serde(default)]
    pub name: String,
    /// OSV 생태계 이름 (`crates.io`, `npm`, ...)
    #[serde(default)]
    pub ecosystem: String,
}

/// 쿼리 한 건에 대한 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VulnDbQueryResult {
    /// 일치한 취약점
    #[serde(default)]
    pub vulns: Vec<OsvVulnerability>,
}

/// OSV 취약점 레코드
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsvVulnerability {
    /// OSV ID (`GHSA-...`, `RUSTSEC-...`)
    #[serde(default)]
    pub id: Option<String>,
    /// 한 줄 요약
    #[serde(default)]
    pub summary: Option<String>,
    /// 상세 설명
    #[serde(default)]
    pub details: Option<String>,
    /// 별칭 (CVE 등)
    #[serde(default)]
    pub aliases: Vec<String>,
    /// 심각도 (CVSS 벡터 또는 점수)
    #[serde(default)]
    pub severity: Vec<OsvSeverity>,
    /// 영향받는 패키지와 범위
    #[serde(default)]
    pub affected: Vec<OsvAffected>,
    /// 참고 링크
    #[serde(default)]
    pub references: Vec<OsvReference>,
    /// DB별 부가 정보 (GHSA는 `severity` 문자열을 둠)
    #[serde(default)]
    pub database_specific: Option<serde_json::Value>,
}

/// OSV 심각도 항목
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsvSeverity {
    /// `CVSS_V3` 등
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// 벡터 문자열 또는 숫자 점수
    #[serde(default)]
    pub score: Option<String>,
}

/// OSV 영향 범위
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsvAffected {
    /// 패키지
    #[serde(default)]
    pub package: Option<OsvPackage>,
    /// 범위 목록
    #[serde(default)]
    pub ranges: Vec<OsvRange>,
    /// 명시적으로 영향받는 버전
    #[serde(default)]
    pub versions: Vec<String>,
}

/// OSV 범위
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsvRange {
    /// `SEMVER`, `ECOSYSTEM`, `GIT`
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// 이벤트 목록
    #[serde(default)]
    pub events: Vec<OsvEvent>,
}

/// OSV 범위 이벤트
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsvEvent {
    /// 도입 버전
    #[serde(default)]
    pub introduced: Option<String>,
    /// 수정 버전
    #[serde(default)]
    pub fixed: Option<String>,
}

/// OSV 참고 링크
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsvReference {
    /// `ADVISORY`, `WEB`, ...
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// URL
    #[serde(default)]
    pub url: Option<String>,
}

/// 취약점 DB 결과 한 건 (쿼리 정보를 덧붙인 것)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnDbFinding {
    /// 조회한 패키지
    pub package: String,
    /// 조회한 버전
    pub version: String,
    /// 일치한 취약점
    pub vulnerability: OsvVulnerability,
}

// ─── Snyk ────────────────────────────────────────────────────────────

/// 프록시 A 응답 본문
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnykReport {
    /// 발견 항목
    #[serde(default)]
    pub vulnerabilities: Vec<SnykIssue>,
}

/// Snyk issue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnykIssue {
    /// Snyk ID (`SNYK-JS-LODASH-567746`)
    #[serde(default)]
    pub id: Option<String>,
    /// 제목
    #[serde(default)]
    pub title: Option<String>,
    /// 설명
    #[serde(default)]
    pub description: Option<String>,
    /// 심각도
    #[serde(default)]
    pub severity: Option<String>,
    /// 패키지 이름
    #[serde(default)]
    pub package_name: Option<String>,
    /// 버전
    #[serde(default)]
    pub version: Option<String>,
    /// 버전 목록 (version이 없을 때)
    #[serde(default)]
    pub pkg_versions: Vec<String>,
    /// 의존 경로 (`["app@1.0.0", "lodash@4.17.15"]`)
    #[serde(default)]
    pub from: Vec<String>,
    /// 수정 버전 목록
    #[serde(default)]
    pub fixed_in: Vec<String>,
    /// CVSS 점수
    #[serde(default)]
    pub cvss_score: Option<f64>,
    /// 식별자 (`CVE`, `CWE` -> 목록)
    #[serde(default)]
    pub identifiers: BTreeMap<String, Vec<String>>,
    /// 참고 링크
    #[serde(default)]
    pub references: Vec<SnykReference>,
}

/// Snyk 참고 링크
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnykReference {
    /// 제목
    #[serde(default)]
    pub title: Option<String>,
    /// URL
    #[serde(default)]
    pub url: Option<String>,
}

// ─── Trivy ───────────────────────────────────────────────────────────

/// 프록시 B 응답 본문
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrivyReport {
    /// 대상별 결과
    #[serde(default, rename = "Results")]
    pub results: Vec<TrivyTargetResult>,
}

/// Trivy 대상별 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrivyTargetResult {
    /// 대상 (lockfile 경로 등)
    #[serde(default, rename = "Target")]
    pub target: Option<String>,
    /// 발견 항목
    #[serde(default, rename = "Vulnerabilities")]
    pub vulnerabilities: Vec<TrivyVulnerability>,
}

/// Trivy 취약점
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrivyVulnerability {
    /// 취약점 ID
    #[serde(default, rename = "VulnerabilityID")]
    pub vulnerability_id: Option<String>,
    /// 패키지 이름
    #[serde(default, rename = "PkgName")]
    pub pkg_name: Option<String>,
    /// 설치 버전
    #[serde(default, rename = "InstalledVersion")]
    pub installed_version: Option<String>,
    /// 수정 버전
    #[serde(default, rename = "FixedVersion")]
    pub fixed_version: Option<String>,
    /// 제목
    #[serde(default, rename = "Title")]
    pub title: Option<String>,
    /// 설명
    #[serde(default, rename = "Description")]
    pub description: Option<String>,
    /// 심각도 (`CRITICAL`, `HIGH`, `MEDIUM`, `LOW`, `UNKNOWN`)
    #[serde(default, rename = "Severity")]
    pub severity: Option<String>,
    /// 대표 URL
    #[serde(default, rename = "PrimaryURL")]
    pub primary_url: Option<String>,
    /// 참고 링크
    #[serde(default, rename = "References")]
    pub references: Vec<String>,
    /// 공급자별 CVSS
    #[serde(default, rename = "CVSS")]
    pub cvss: BTreeMap<String, TrivyCvss>,
}

/// Trivy CVSS 항목
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrivyCvss {
    /// CVSS v3 점수
    #[serde(default, rename = "V3Score")]
    pub v3_score: Option<f64>,
    /// CVSS v2 점수
    #[serde(default, rename = "V2Score")]
    pub v2_score: Option<f64>,
}

// ─── 로컬 분석기 ─────────────────────────────────────────────────────

/// 로컬 정적 분석기(워크플로, 컨테이너, 코드 패턴)가 만드는 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFinding {
    /// 규칙 기반 ID (`unpinned-action:ci.yml:actions/checkout`)
    pub id: String,
    /// 제목
    pub title: String,
    /// 설명
    pub description: String,
    /// 심각도
    pub severity: Severity,
    /// 대상 (액션, 이미지, 파일 이름)
    pub package: String,
    /// 대상 버전 (액션 ref, 이미지 태그, 리비전)
    pub version: String,
    /// 참고 링크
    #[serde(default)]
    pub references: Vec<String>,
}
