//! 도메인 타입 -- 스캔 요청, 프로젝트 정보, 정규화된 취약점, 스캔 결과
//!
//! 스캔 한 건의 수명은 [`ScanResult`] 하나로 표현됩니다. 상태는
//! `queued -> running -> {completed | failed | cancelled}` 방향으로만 이동하며
//! 종료 상태에서는 어떤 전이도 허용되지 않습니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use ironaudit_core::config::ScanDefaults;
use ironaudit_core::types::Severity;

use crate::error::ScannerError;

// ─── 요청 ────────────────────────────────────────────────────────────

/// 스캔 대상 저장소 식별자
///
/// `locator`는 원격 저장소 이름(`owner/name`)이거나 로컬 체크아웃 경로입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// 저장소 위치
    pub locator: String,
    /// 브랜치, 태그 또는 커밋 (없으면 기본 브랜치)
    #[serde(default)]
    pub revision: Option<String>,
}

impl RepositoryRef {
    /// 기본 브랜치를 가리키는 저장소 참조를 생성합니다.
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            revision: None,
        }
    }

    /// 리비전을 지정합니다.
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "{}@{}", self.locator, rev),
            None => f.write_str(&self.locator),
        }
    }
}

/// 어댑터 종류
///
/// 선언 순서가 곧 파이프라인 실행 순서입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    /// 패키지 레지스트리 감사 (npm)
    DependencyAudit,
    /// 취약점 DB 조회
    VulnDbQuery,
    /// 프록시 스캐너 A
    ProxyScannerA,
    /// 프록시 스캐너 B
    ProxyScannerB,
    /// CI 워크플로 분석
    WorkflowAnalysis,
    /// 컨테이너 설정 분석
    ContainerScan,
    /// 코드 패턴 분석
    CodePattern,
}

impl AdapterKind {
    /// 파이프라인 실행 순서대로 나열한 전체 목록
    pub const ALL: [AdapterKind; 7] = [
        AdapterKind::DependencyAudit,
        AdapterKind::VulnDbQuery,
        AdapterKind::ProxyScannerA,
        AdapterKind::ProxyScannerB,
        AdapterKind::WorkflowAnalysis,
        AdapterKind::ContainerScan,
        AdapterKind::CodePattern,
    ];

    /// 로그/메트릭 레이블에 쓰이는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DependencyAudit => "registry-audit",
            Self::VulnDbQuery => "vuln-db",
            Self::ProxyScannerA => "proxy-a",
            Self::ProxyScannerB => "proxy-b",
            Self::WorkflowAnalysis => "workflow",
            Self::ContainerScan => "container",
            Self::CodePattern => "code-pattern",
        }
    }

    /// 이 어댑터가 만들어내는 취약점의 출처 태그
    pub fn source(&self) -> VulnSource {
        match self {
            Self::DependencyAudit => VulnSource::RegistryAudit,
            Self::VulnDbQuery => VulnSource::VulnDb,
            Self::ProxyScannerA => VulnSource::ProxyA,
            Self::ProxyScannerB => VulnSource::ProxyB,
            Self::WorkflowAnalysis => VulnSource::Workflow,
            Self::ContainerScan => VulnSource::Container,
            Self::CodePattern => VulnSource::CodePattern,
        }
    }

    /// 이 어댑터가 실행되는 파이프라인 단계
    pub fn stage(&self) -> ScanStage {
        match self {
            Self::DependencyAudit => ScanStage::DependencyAudit,
            Self::VulnDbQuery => ScanStage::VulnDbQuery,
            Self::ProxyScannerA => ScanStage::ProxyScannerA,
            Self::ProxyScannerB => ScanStage::ProxyScannerB,
            Self::WorkflowAnalysis => ScanStage::WorkflowAnalysis,
            Self::ContainerScan => ScanStage::ContainerScan,
            Self::CodePattern => ScanStage::CodePattern,
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 스캔 옵션
///
/// 어댑터는 자기 플래그와 카테고리 게이트가 모두 `true`일 때만 실행됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// 의존성 레지스트리 감사
    pub enable_dependency_audit: bool,
    /// 취약점 DB 조회
    pub enable_vuln_db_query: bool,
    /// 프록시 스캐너 A
    pub enable_proxy_scanner_a: bool,
    /// 프록시 스캐너 B
    pub enable_proxy_scanner_b: bool,
    /// CI 워크플로 분석
    pub enable_workflow_analysis: bool,
    /// 컨테이너 설정 분석
    pub enable_container_scan: bool,
    /// 코드 패턴 분석
    pub enable_code_analysis: bool,
    /// 카테고리 게이트: 의존성 계열
    pub scan_dependencies: bool,
    /// 카테고리 게이트: 코드 계열
    pub scan_code: bool,
    /// 카테고리 게이트: 컨테이너 계열
    pub scan_containers: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from_core(&ScanDefaults::default())
    }
}

impl ScanOptions {
    /// core의 `[scan]` 섹션에서 옵션을 생성합니다.
    pub fn from_core(core: &ScanDefaults) -> Self {
        Self {
            enable_dependency_audit: core.enable_dependency_audit,
            enable_vuln_db_query: core.enable_vuln_db_query,
            enable_proxy_scanner_a: core.enable_proxy_scanner_a,
            enable_proxy_scanner_b: core.enable_proxy_scanner_b,
            enable_workflow_analysis: core.enable_workflow_analysis,
            enable_container_scan: core.enable_container_scan,
            enable_code_analysis: core.enable_code_analysis,
            scan_dependencies: core.scan_dependencies,
            scan_code: core.scan_code,
            scan_containers: core.scan_containers,
        }
    }

    /// 모든 어댑터를 끈 옵션 (테스트나 단일 어댑터 실행의 시작점)
    pub fn none() -> Self {
        Self {
            enable_dependency_audit: false,
            enable_vuln_db_query: false,
            enable_proxy_scanner_a: false,
            enable_proxy_scanner_b: false,
            enable_workflow_analysis: false,
            enable_container_scan: false,
            enable_code_analysis: false,
            scan_dependencies: true,
            scan_code: true,
            scan_containers: true,
        }
    }

    /// 어댑터 자체 플래그를 켜거나 끕니다.
    pub fn set_enabled(&mut self, kind: AdapterKind, enabled: bool) {
        let flag = match kind {
            AdapterKind::DependencyAudit => &mut self.enable_dependency_audit,
            AdapterKind::VulnDbQuery => &mut self.enable_vuln_db_query,
            AdapterKind::ProxyScannerA => &mut self.enable_proxy_scanner_a,
            AdapterKind::ProxyScannerB => &mut self.enable_proxy_scanner_b,
            AdapterKind::WorkflowAnalysis => &mut self.enable_workflow_analysis,
            AdapterKind::ContainerScan => &mut self.enable_container_scan,
            AdapterKind::CodePattern => &mut self.enable_code_analysis,
        };
        *flag = enabled;
    }

    /// 어댑터 플래그와 카테고리 게이트를 모두 확인합니다.
    pub fn is_enabled(&self, kind: AdapterKind) -> bool {
        match kind {
            AdapterKind::DependencyAudit => self.enable_dependency_audit && self.scan_dependencies,
            AdapterKind::VulnDbQuery => self.enable_vuln_db_query && self.scan_dependencies,
            AdapterKind::ProxyScannerA => self.enable_proxy_scanner_a && self.scan_dependencies,
            AdapterKind::ProxyScannerB => self.enable_proxy_scanner_b && self.scan_dependencies,
            AdapterKind::WorkflowAnalysis => self.enable_workflow_analysis && self.scan_code,
            AdapterKind::ContainerScan => self.enable_container_scan && self.scan_containers,
            AdapterKind::CodePattern => self.enable_code_analysis && self.scan_code,
        }
    }
}

/// 스캔 요청 (불변)
#[derive(Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    /// 스캔 ID (UUID)
    pub scan_id: String,
    /// 소속 프로젝트 ID
    pub project_id: String,
    /// 대상 저장소
    pub repository: RepositoryRef,
    /// 업스트림 인증 토큰 (직렬화되지 않음)
    #[serde(skip_serializing, default)]
    pub auth_token: Option<String>,
    /// 스캔 옵션
    pub options: ScanOptions,
}

impl ScanRequest {
    /// 새 스캔 ID를 발급하여 요청을 생성합니다.
    pub fn new(project_id: impl Into<String>, repository: RepositoryRef, options: ScanOptions) -> Self {
        Self {
            scan_id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            repository,
            auth_token: None,
            options,
        }
    }

    /// 인증 토큰을 지정합니다.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

impl fmt::Debug for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanRequest")
            .field("scan_id", &self.scan_id)
            .field("project_id", &self.project_id)
            .field("repository", &self.repository)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("options", &self.options)
            .finish()
    }
}

// ─── 프로젝트 정보 ───────────────────────────────────────────────────

/// 패키지 생태계 (언어/패키지 관리자)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ecosystem {
    /// Rust (Cargo.lock)
    Cargo,
    /// JavaScript/TypeScript (package-lock.json)
    Npm,
    /// Go (go.sum)
    Go,
    /// Python (Pipfile.lock, requirements.txt)
    Pip,
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cargo => write!(f, "cargo"),
            Self::Npm => write!(f, "npm"),
            Self::Go => write!(f, "go"),
            Self::Pip => write!(f, "pip"),
        }
    }
}

impl Ecosystem {
    /// OSV 스키마에서 쓰는 생태계 이름
    pub fn osv_name(&self) -> &'static str {
        match self {
            Self::Cargo => "crates.io",
            Self::Npm => "npm",
            Self::Go => "Go",
            Self::Pip => "PyPI",
        }
    }

    /// 문자열에서 생태계를 파싱합니다 (대소문자 구분 없음, OSV 이름 포함).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cargo" | "rust" | "crate" | "crates" | "crates.io" => Some(Self::Cargo),
            "npm" | "node" | "javascript" | "js" => Some(Self::Npm),
            "go" | "golang" => Some(Self::Go),
            "pip" | "python" | "pypi" => Some(Self::Pip),
            _ => None,
        }
    }
}

/// 잠금 파일에서 얻은 의존성 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// 패키지 이름
    pub name: String,
    /// 잠긴 버전
    pub version: String,
    /// 생태계
    pub ecosystem: Ecosystem,
    /// 개발 전용 의존성 여부
    #[serde(default)]
    pub dev: bool,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version, self.ecosystem)
    }
}

/// 프로젝트 분석 결과 (읽기 전용)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// 분석한 저장소
    pub repository: RepositoryRef,
    /// 분석 기준 리비전
    pub revision: String,
    /// 감지된 생태계
    pub ecosystems: Vec<Ecosystem>,
    /// 의존성 목록
    pub dependencies: Vec<Dependency>,
    /// `Dockerfile` 존재 여부
    pub has_dockerfile: bool,
    /// `.github/workflows` 존재 여부
    pub has_workflows: bool,
}

impl ProjectInfo {
    /// 비어 있는 프로젝트 정보를 생성합니다.
    pub fn new(repository: RepositoryRef) -> Self {
        let revision = repository
            .revision
            .clone()
            .unwrap_or_else(|| "HEAD".to_owned());
        Self {
            repository,
            revision,
            ecosystems: Vec::new(),
            dependencies: Vec::new(),
            has_dockerfile: false,
            has_workflows: false,
        }
    }

    /// 특정 생태계의 의존성만 순회합니다.
    pub fn dependencies_in(&self, ecosystem: Ecosystem) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(move |d| d.ecosystem == ecosystem)
    }
}

// ─── 취약점 ──────────────────────────────────────────────────────────

/// 취약점 출처 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VulnSource {
    /// 패키지 레지스트리 감사 결과
    #[serde(rename = "registry-audit")]
    RegistryAudit,
    /// 취약점 DB (OSV 형식)
    #[serde(rename = "vuln-db")]
    VulnDb,
    /// 프록시 스캐너 A
    #[serde(rename = "snyk")]
    ProxyA,
    /// 프록시 스캐너 B
    #[serde(rename = "trivy")]
    ProxyB,
    /// CI 워크플로 분석
    #[serde(rename = "workflow")]
    Workflow,
    /// 컨테이너 설정 분석
    #[serde(rename = "container")]
    Container,
    /// 코드 패턴 분석
    #[serde(rename = "code-pattern")]
    CodePattern,
}

impl VulnSource {
    /// 직렬화 표기와 동일한 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegistryAudit => "registry-audit",
            Self::VulnDb => "vuln-db",
            Self::ProxyA => "snyk",
            Self::ProxyB => "trivy",
            Self::Workflow => "workflow",
            Self::Container => "container",
            Self::CodePattern => "code-pattern",
        }
    }

    /// 업스트림이 "결과 없음"이나 오류를 표시할 때 ID에 섞어 보내는 표식
    ///
    /// 로컬 분석기는 이런 표식을 쓰지 않으므로 비어 있습니다.
    pub fn sentinel_markers(&self) -> &'static [&'static str] {
        match self {
            Self::RegistryAudit => &["error"],
            Self::VulnDb => &["error", "not-found"],
            Self::ProxyA | Self::ProxyB => &["error", "not-found", "clean"],
            Self::Workflow | Self::Container | Self::CodePattern => &[],
        }
    }
}

impl fmt::Display for VulnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 정규화된 취약점 레코드 (불변)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    /// 출처별 식별자 (CVE, GHSA, 규칙 ID 등)
    pub id: String,
    /// 제목
    pub title: String,
    /// 설명
    pub description: String,
    /// 심각도
    pub severity: Severity,
    /// 영향받는 패키지 (또는 파일/액션 이름)
    pub package_name: String,
    /// 영향받는 버전
    pub version: String,
    /// 수정된 버전
    pub fixed_in: Option<String>,
    /// 참고 링크
    pub references: Vec<String>,
    /// CVSS 점수
    pub cvss_score: Option<f64>,
    /// 출처
    pub source: VulnSource,
}

impl VulnerabilityRecord {
    /// 중복 판정 키 `(source, id, package_name)`
    pub fn dedup_key(&self) -> (VulnSource, &str, &str) {
        (self.source, self.id.as_str(), self.package_name.as_str())
    }

    /// 수정 버전이 알려져 있는지 여부
    pub fn is_fixable(&self) -> bool {
        self.fixed_in.as_deref().is_some_and(|v| !v.trim().is_empty())
    }
}

impl fmt::Display for VulnerabilityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} in {}@{} ({})",
            self.severity, self.id, self.package_name, self.version, self.source
        )
    }
}

// ─── 진행률 / 요약 ───────────────────────────────────────────────────

/// 파이프라인 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    /// 아직 시작하지 않음
    Queued,
    /// 프로젝트 분석
    Analyze,
    /// 의존성 레지스트리 감사
    DependencyAudit,
    /// 취약점 DB 조회
    VulnDbQuery,
    /// 프록시 스캐너 A
    ProxyScannerA,
    /// 프록시 스캐너 B
    ProxyScannerB,
    /// 워크플로 분석
    WorkflowAnalysis,
    /// 컨테이너 분석
    ContainerScan,
    /// 코드 패턴 분석
    CodePattern,
    /// 정규화 및 점수 산정
    Normalize,
    /// 모든 단계 완료
    Complete,
}

impl ScanStage {
    /// 진행률 가중치가 있는 단계를 실행 순서대로 나열한 목록
    pub const PIPELINE: [ScanStage; 9] = [
        ScanStage::Analyze,
        ScanStage::DependencyAudit,
        ScanStage::VulnDbQuery,
        ScanStage::ProxyScannerA,
        ScanStage::ProxyScannerB,
        ScanStage::WorkflowAnalysis,
        ScanStage::ContainerScan,
        ScanStage::CodePattern,
        ScanStage::Normalize,
    ];

    /// 진행률 가중치 (파이프라인 단계 합계 100)
    pub fn weight(&self) -> u8 {
        match self {
            Self::Queued | Self::Complete => 0,
            Self::Analyze => 10,
            Self::DependencyAudit => 15,
            Self::VulnDbQuery => 15,
            Self::ProxyScannerA => 10,
            Self::ProxyScannerB => 10,
            Self::WorkflowAnalysis => 10,
            Self::ContainerScan => 10,
            Self::CodePattern => 15,
            Self::Normalize => 5,
        }
    }

    /// 진행률 메시지
    pub fn message(&self) -> &'static str {
        match self {
            Self::Queued => "Waiting to start",
            Self::Analyze => "Analyzing project structure",
            Self::DependencyAudit => "Auditing dependencies against the package registry",
            Self::VulnDbQuery => "Querying the vulnerability database",
            Self::ProxyScannerA => "Running proxy scanner A",
            Self::ProxyScannerB => "Running proxy scanner B",
            Self::WorkflowAnalysis => "Analyzing CI workflows",
            Self::ContainerScan => "Analyzing container configuration",
            Self::CodePattern => "Analyzing code patterns",
            Self::Normalize => "Normalizing and scoring findings",
            Self::Complete => "Scan complete",
        }
    }
}

impl fmt::Display for ScanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Analyze => "analyze",
            Self::DependencyAudit => "dependency_audit",
            Self::VulnDbQuery => "vuln_db_query",
            Self::ProxyScannerA => "proxy_scanner_a",
            Self::ProxyScannerB => "proxy_scanner_b",
            Self::WorkflowAnalysis => "workflow_analysis",
            Self::ContainerScan => "container_scan",
            Self::CodePattern => "code_pattern",
            Self::Normalize => "normalize",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// 스캔 진행률 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    /// 현재 단계
    pub stage: ScanStage,
    /// 0-100
    pub percentage: u8,
    /// 사람이 읽는 메시지
    pub message: String,
    /// 실행 중인 어댑터 이름
    pub current_task: Option<String>,
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self {
            stage: ScanStage::Queued,
            percentage: 0,
            message: ScanStage::Queued.message().to_owned(),
            current_task: None,
        }
    }
}

/// 위험 등급
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// 낮음
    #[default]
    Low,
    /// 중간
    Medium,
    /// 높음
    High,
    /// 치명적
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// 심각도별 집계와 보안 점수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// 전체 취약점 수
    pub total_vulnerabilities: usize,
    /// critical 수
    pub critical_count: usize,
    /// high 수
    pub high_count: usize,
    /// medium 수
    pub medium_count: usize,
    /// low 수
    pub low_count: usize,
    /// 수정 버전이 있는 취약점 수
    pub fixable_count: usize,
    /// 0-100 보안 점수
    pub security_score: u8,
    /// 위험 등급
    pub risk_level: RiskLevel,
}

impl Default for ScanSummary {
    fn default() -> Self {
        Self {
            total_vulnerabilities: 0,
            critical_count: 0,
            high_count: 0,
            medium_count: 0,
            low_count: 0,
            fixable_count: 0,
            security_score: 100,
            risk_level: RiskLevel::Low,
        }
    }
}

impl ScanSummary {
    /// 특정 심각도의 개수를 반환합니다.
    pub fn count_of(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical_count,
            Severity::High => self.high_count,
            Severity::Medium => self.medium_count,
            Severity::Low => self.low_count,
        }
    }
}

// ─── 스캔 결과 (aggregate root) ──────────────────────────────────────

/// 스캔 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// 대기
    Queued,
    /// 실행 중
    Running,
    /// 완료
    Completed,
    /// 실패
    Failed,
    /// 취소됨
    Cancelled,
}

impl ScanStatus {
    /// 종료 상태 여부
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// 주어진 상태로 전이할 수 있는지 확인합니다.
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Cancelled)
        )
    }

    /// 소문자 표기
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 스캔 한 건의 전체 상태
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// 원본 요청
    pub request: ScanRequest,
    /// 현재 상태
    pub status: ScanStatus,
    /// 생성 시각
    pub started_at: SystemTime,
    /// 종료 시각
    pub completed_at: Option<SystemTime>,
    /// 진행률
    pub progress: ScanProgress,
    /// 요약
    pub summary: ScanSummary,
    /// 정규화 및 중복 제거된 취약점
    pub vulnerabilities: Vec<VulnerabilityRecord>,
    /// 실패 사유
    pub error: Option<String>,
}

impl ScanResult {
    /// `queued` 상태의 새 결과를 생성합니다.
    pub fn new(request: ScanRequest) -> Self {
        Self {
            request,
            status: ScanStatus::Queued,
            started_at: SystemTime::now(),
            completed_at: None,
            progress: ScanProgress::default(),
            summary: ScanSummary::default(),
            vulnerabilities: Vec::new(),
            error: None,
        }
    }

    /// 스캔 ID
    pub fn scan_id(&self) -> &str {
        &self.request.scan_id
    }

    /// 상태를 전이합니다. 허용되지 않는 전이는 거부합니다.
    pub fn transition(&mut self, next: ScanStatus) -> Result<(), ScannerError> {
        if !self.status.can_transition_to(next) {
            return Err(ScannerError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(SystemTime::now());
        }
        Ok(())
    }

    /// `queued -> running`
    pub fn mark_running(&mut self) -> Result<(), ScannerError> {
        self.transition(ScanStatus::Running)
    }

    /// `running -> completed`
    pub fn complete(
        &mut self,
        vulnerabilities: Vec<VulnerabilityRecord>,
        summary: ScanSummary,
    ) -> Result<(), ScannerError> {
        self.transition(ScanStatus::Completed)?;
        self.vulnerabilities = vulnerabilities;
        self.summary = summary;
        Ok(())
    }

    /// `running -> failed`
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), ScannerError> {
        self.transition(ScanStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// `running -> cancelled`
    pub fn cancel(&mut self) -> Result<(), ScannerError> {
        self.transition(ScanStatus::Cancelled)
    }

    /// 부분 갱신을 적용합니다. 상태 변경이 포함되면 전이 규칙을 검사합니다.
    pub fn apply(&mut self, update: ScanUpdate) -> Result<(), ScannerError> {
        if let Some(status) = update.status
            && status != self.status
        {
            if !self.status.can_transition_to(status) {
                return Err(ScannerError::InvalidTransition {
                    from: self.status,
                    to: status,
                });
            }
            self.status = status;
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(summary) = update.summary {
            self.summary = summary;
        }
        if let Some(vulnerabilities) = update.vulnerabilities {
            self.vulnerabilities = vulnerabilities;
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        Ok(())
    }
}

/// 저장소에 전달하는 부분 갱신
#[derive(Debug, Clone, Default)]
pub struct ScanUpdate {
    /// 새 상태
    pub status: Option<ScanStatus>,
    /// 종료 시각
    pub completed_at: Option<SystemTime>,
    /// 진행률
    pub progress: Option<ScanProgress>,
    /// 요약
    pub summary: Option<ScanSummary>,
    /// 취약점 목록
    pub vulnerabilities: Option<Vec<VulnerabilityRecord>>,
    /// 실패 사유
    pub error: Option<String>,
}

impl ScanUpdate {
    /// 종료된 결과 전체를 담은 갱신을 만듭니다.
    pub fn terminal(result: &ScanResult) -> Self {
        Self {
            status: Some(result.status),
            completed_at: result.completed_at,
            progress: Some(result.progress.clone()),
            summary: Some(result.summary.clone()),
            vulnerabilities: Some(result.vulnerabilities.clone()),
            error: result.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ScanRequest {
        ScanRequest::new(
            "project-1",
            RepositoryRef::new("acme/widgets"),
            ScanOptions::default(),
        )
    }

    #[test]
    fn options_default_matches_core_defaults() {
        let options = ScanOptions::default();
        assert!(options.is_enabled(AdapterKind::DependencyAudit));
        assert!(options.is_enabled(AdapterKind::VulnDbQuery));
        assert!(!options.is_enabled(AdapterKind::ProxyScannerA));
        assert!(!options.is_enabled(AdapterKind::ProxyScannerB));
        assert!(options.is_enabled(AdapterKind::WorkflowAnalysis));
        assert!(options.is_enabled(AdapterKind::ContainerScan));
        assert!(options.is_enabled(AdapterKind::CodePattern));
    }

    #[test]
    fn category_gate_disables_members() {
        let mut options = ScanOptions::default();
        options.scan_dependencies = false;
        assert!(!options.is_enabled(AdapterKind::DependencyAudit));
        assert!(!options.is_enabled(AdapterKind::VulnDbQuery));
        assert!(options.is_enabled(AdapterKind::WorkflowAnalysis));

        let mut options = ScanOptions::default();
        options.scan_code = false;
        assert!(!options.is_enabled(AdapterKind::WorkflowAnalysis));
        assert!(!options.is_enabled(AdapterKind::CodePattern));
        assert!(options.is_enabled(AdapterKind::ContainerScan));

        let mut options = ScanOptions::default();
        options.scan_containers = false;
        assert!(!options.is_enabled(AdapterKind::ContainerScan));
    }

    #[test]
    fn none_then_enable_single_adapter() {
        let mut options = ScanOptions::none();
        options.set_enabled(AdapterKind::DependencyAudit, true);
        let enabled: Vec<_> = AdapterKind::ALL
            .into_iter()
            .filter(|k| options.is_enabled(*k))
            .collect();
        assert_eq!(enabled, vec![AdapterKind::DependencyAudit]);
    }

    #[test]
    fn request_debug_redacts_token() {
        let req = request().with_auth_token("ghp_supersecret");
        let debug = format!("{req:?}");
        assert!(!debug.contains("ghp_supersecret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn request_serialization_skips_token() {
        let req = request().with_auth_token("ghp_supersecret");
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("ghp_supersecret"));
    }

    #[test]
    fn project_info_defaults_revision_to_head() {
        let info = ProjectInfo::new(RepositoryRef::new("acme/widgets"));
        assert_eq!(info.revision, "HEAD");
        let info = ProjectInfo::new(RepositoryRef::new("acme/widgets").with_revision("v1.2.0"));
        assert_eq!(info.revision, "v1.2.0");
    }

    #[test]
    fn ecosystem_osv_names_roundtrip() {
        for eco in [Ecosystem::Cargo, Ecosystem::Npm, Ecosystem::Go, Ecosystem::Pip] {
            assert_eq!(Ecosystem::from_str_loose(eco.osv_name()), Some(eco));
        }
    }

    #[test]
    fn source_serializes_to_display_tag() {
        let json = serde_json::to_string(&VulnSource::ProxyA).unwrap();
        assert_eq!(json, "\"snyk\"");
        assert_eq!(VulnSource::ProxyB.to_string(), "trivy");
    }

    #[test]
    fn stage_weights_sum_to_100() {
        let total: u32 = ScanStage::PIPELINE.iter().map(|s| u32::from(s.weight())).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn status_transitions_are_forward_only() {
        use ScanStatus::*;
        assert!(Queued.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));
        assert!(Running.can_transition_to(Cancelled));
        assert!(!Queued.can_transition_to(Completed));
        assert!(!Running.can_transition_to(Queued));
        for terminal in [Completed, Failed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [Queued, Running, Completed, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn result_lifecycle_sets_completed_at() {
        let mut result = ScanResult::new(request());
        assert_eq!(result.status, ScanStatus::Queued);
        result.mark_running().unwrap();
        assert!(result.completed_at.is_none());
        result.complete(Vec::new(), ScanSummary::default()).unwrap();
        assert_eq!(result.status, ScanStatus::Completed);
        assert!(result.completed_at.is_some());
    }

    #[test]
    fn result_rejects_transition_from_terminal() {
        let mut result = ScanResult::new(request());
        result.mark_running().unwrap();
        result.fail("boom").unwrap();
        let err = result.cancel().unwrap_err();
        assert!(matches!(
            err,
            ScannerError::InvalidTransition {
                from: ScanStatus::Failed,
                to: ScanStatus::Cancelled
            }
        ));
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn apply_update_validates_status() {
        let mut result = ScanResult::new(request());
        let err = result
            .apply(ScanUpdate {
                status: Some(ScanStatus::Completed),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ScannerError::InvalidTransition { .. }));
        assert_eq!(result.status, ScanStatus::Queued);
    }

    #[test]
    fn apply_update_with_same_status_is_allowed() {
        let mut result = ScanResult::new(request());
        result.mark_running().unwrap();
        result
            .apply(ScanUpdate {
                status: Some(ScanStatus::Running),
                error: Some("note".to_owned()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(result.status, ScanStatus::Running);
    }

    #[test]
    fn record_fixable_ignores_blank() {
        let mut record = VulnerabilityRecord {
            id: "CVE-2024-0001".to_owned(),
            title: "t".to_owned(),
            description: String::new(),
            severity: Severity::High,
            package_name: "lodash".to_owned(),
            version: "4.17.20".to_owned(),
            fixed_in: Some("  ".to_owned()),
            references: vec![],
            cvss_score: None,
            source: VulnSource::RegistryAudit,
        };
        assert!(!record.is_fixable());
        record.fixed_in = Some("4.17.21".to_owned());
        assert!(record.is_fixable());
    }
}
